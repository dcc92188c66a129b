//! Filtering and serialization of scanned candidate records.
//!
//! Two independent views are produced: the per-candidate table of every
//! discovered (live, non-seed) domain, and the blocklist of IPs behind
//! candidates scoring at or above the similarity threshold. Generation
//! order is preserved throughout; no ranking is imposed.

use crate::types::{Answer, Candidate, RecordType, Result};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Fixed column set of the per-candidate export.
const COLUMNS: [&str; 8] = [
    "fuzzer",
    "domain",
    "dns_a",
    "dns_aaaa",
    "dns_ns",
    "dns_mx",
    "ssim_score",
    "logo",
];

/// Candidates with a live A record, excluding the seed itself. The seed
/// stays in the underlying set; every consumer filters it by name.
pub fn live_candidates<'a>(candidates: &'a [Candidate], seed: &str) -> Vec<&'a Candidate> {
    candidates
        .iter()
        .filter(|c| c.domain != seed && c.has_live_a())
        .collect()
}

/// `(ip, domain)` pairs for candidates whose similarity score meets the
/// threshold: every A/AAAA/NS/MX value that parses as an IP address.
pub fn blocklist_entries(
    candidates: &[Candidate],
    seed: &str,
    threshold: f64,
) -> Vec<(IpAddr, String)> {
    let mut entries = Vec::new();

    for candidate in candidates {
        if candidate.domain == seed {
            continue;
        }
        let Some(score) = candidate.ssim_score else {
            continue;
        };
        if score < threshold {
            continue;
        }

        for record_type in RecordType::ALL {
            if let Some(Answer::Records(values)) = candidate.dns.get(&record_type) {
                for value in values {
                    if let Ok(ip) = value.parse::<IpAddr>() {
                        entries.push((ip, candidate.domain.clone()));
                    }
                }
            }
        }
    }

    entries
}

fn row(candidate: &Candidate) -> Vec<String> {
    let field = |rt: RecordType| {
        candidate
            .dns
            .get(&rt)
            .map(|a| a.to_string())
            .unwrap_or_default()
    };

    vec![
        candidate.fuzzer.clone(),
        candidate.domain.clone(),
        field(RecordType::A),
        field(RecordType::Aaaa),
        field(RecordType::Ns),
        field(RecordType::Mx),
        candidate
            .ssim_score
            .map(|s| format!("{s:.3}"))
            .unwrap_or_default(),
        candidate.logo.to_string(),
    ]
}

/// Human-readable aligned table of the given records.
pub fn format_table(candidates: &[&Candidate]) -> String {
    let rows: Vec<Vec<String>> = candidates.iter().map(|c| row(c)).collect();

    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.len()).collect();
    for r in &rows {
        for (i, cell) in r.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let render = |cells: Vec<String>, out: &mut String| {
        let line = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    };

    render(COLUMNS.iter().map(|c| c.to_string()).collect(), &mut out);
    for r in rows {
        render(r, &mut out);
    }
    out
}

/// Write the full candidate table (seed row included) as CSV.
pub fn write_csv(candidates: &[Candidate], path: &Path) -> Result<()> {
    let mut out = String::new();
    out.push_str(&COLUMNS.join(","));
    out.push('\n');
    for candidate in candidates {
        out.push_str(&row(candidate).join(","));
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}

/// Append blocklist entries as `ip,domain` rows.
pub fn write_blocklist(entries: &[(IpAddr, String)], path: &Path) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    for (ip, domain) in entries {
        writeln!(file, "{ip},{domain}")?;
    }
    Ok(())
}

/// Report directory layout created before any pipeline work starts.
pub fn create_folders(out_dir: &Path, nmap: bool, recon: bool, whois: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir.join("screenshots").join("originals"))?;
    if nmap {
        std::fs::create_dir_all(out_dir.join("nmap"))?;
    }
    if recon {
        std::fs::create_dir_all(out_dir.join("dnsrecon"))?;
    }
    if whois {
        std::fs::create_dir_all(out_dir.join("whois"))?;
    }
    Ok(out_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(domain: &str, score: Option<f64>, ips: &[&str]) -> Candidate {
        let mut c = Candidate::new("homoglyph", domain);
        if !ips.is_empty() {
            c.dns.insert(
                RecordType::A,
                Answer::Records(ips.iter().map(|s| s.to_string()).collect()),
            );
        }
        c.ssim_score = score;
        c
    }

    #[test]
    fn live_filter_excludes_seed_and_dead() {
        let mut servfail = Candidate::new("omission", "exampe.com");
        servfail.dns.insert(RecordType::A, Answer::ServFail);

        let candidates = vec![
            scored("example.com", None, &["192.0.2.1"]),
            scored("examp1e.com", None, &["192.0.2.2"]),
            servfail,
            Candidate::new("addition", "exampleq.com"),
        ];

        let live = live_candidates(&candidates, "example.com");
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].domain, "examp1e.com");
    }

    #[test]
    fn blocklist_respects_threshold() {
        let mut high = scored("examp1e.com", Some(0.95), &["203.0.113.1", "203.0.113.2"]);
        high.dns.insert(
            RecordType::Mx,
            Answer::Records(vec!["mail.examp1e.com".to_string()]),
        );
        let low = scored("exampleq.com", Some(0.5), &["203.0.113.9"]);

        let candidates = vec![scored("example.com", None, &["192.0.2.1"]), high, low];
        let entries = blocklist_entries(&candidates, "example.com", 0.9);

        // Only the high-similarity candidate's parseable IPs survive;
        // the MX hostname is not an IP and is skipped.
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|(_, domain)| domain == "examp1e.com"));
        assert_eq!(entries[0].0.to_string(), "203.0.113.1");
        assert_eq!(entries[1].0.to_string(), "203.0.113.2");
    }

    #[test]
    fn unscored_candidates_never_reach_blocklist() {
        let candidates = vec![scored("examp1e.com", None, &["203.0.113.1"])];
        assert!(blocklist_entries(&candidates, "example.com", 0.0).is_empty());
    }

    #[test]
    fn table_has_fixed_columns_and_all_rows() {
        let candidates = vec![
            scored("examp1e.com", Some(0.91), &["203.0.113.1"]),
            scored("exampleq.com", None, &[]),
        ];
        let refs: Vec<&Candidate> = candidates.iter().collect();
        let table = format_table(&refs);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("fuzzer"));
        assert!(lines[1].contains("examp1e.com"));
        assert!(lines[1].contains("0.910"));
        assert!(lines[2].contains("exampleq.com"));
    }

    #[test]
    fn csv_roundtrip_layout() {
        let dir = std::env::temp_dir().join(format!("squatscan-report-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("discovered-domains.csv");

        let candidates = vec![scored("examp1e.com", Some(0.5), &["203.0.113.1"])];
        write_csv(&candidates, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "fuzzer,domain,dns_a,dns_aaaa,dns_ns,dns_mx,ssim_score,logo"
        );
        assert_eq!(
            lines.next().unwrap(),
            "homoglyph,examp1e.com,203.0.113.1,,,,0.500,not-checked"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
