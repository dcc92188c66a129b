//! Configuration handling for the scanner.

use crate::types::{Result, ScanError};
use clap::Parser;
use std::path::PathBuf;

/// Typosquat and brand-impersonation domain scanner.
#[derive(Parser, Debug, Clone)]
#[command(name = "squatscan")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Target domain(s) to scan, comma separated
    #[arg(short, long, value_delimiter = ',', required_unless_present = "file")]
    pub domain: Vec<String>,

    /// File containing seed domains to scan (one per line)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Dictionary file of words to prepend/append to the seed label
    #[arg(short = 'D', long)]
    pub dictionary: Option<PathBuf>,

    /// File of extra top-level domains to swap in (one per line)
    #[arg(long)]
    pub tld: Option<PathBuf>,

    /// DNS nameservers to rotate across
    #[arg(short = 'N', long, value_delimiter = ',', default_value = "1.1.1.1")]
    pub nameservers: Vec<String>,

    /// Number of concurrent DNS resolution workers
    #[arg(short, long, default_value = "10")]
    pub threads: usize,

    /// Number of concurrent screenshot/comparison workers
    #[arg(long, default_value = "4")]
    pub screenshot_workers: usize,

    /// Output directory for reports and screenshots
    #[arg(short, long, default_value = "./squatscan-report")]
    pub out_dir: PathBuf,

    /// Only generate and print permutations, no scanning
    #[arg(short, long)]
    pub generate: bool,

    /// Write a blocklist of IPs behind high-similarity candidates
    #[arg(short, long)]
    pub blocklist: bool,

    /// Similarity threshold for blocklist inclusion (0.0 to 1.0)
    #[arg(short = 'B', long, default_value = "0.9")]
    pub blocklist_pct: f64,

    /// Run an nmap port scan against each discovered domain
    #[arg(short, long)]
    pub nmap: bool,

    /// Run dnsrecon enumeration against each discovered domain
    #[arg(short, long)]
    pub recon: bool,

    /// Record WHOIS data for each discovered domain
    #[arg(long)]
    pub whois: bool,

    /// DNS lookup timeout in seconds
    #[arg(long, default_value = "5")]
    pub dns_timeout: u64,

    /// Hard timeout per page capture in seconds
    #[arg(long, default_value = "15")]
    pub capture_timeout: u64,

    /// Path to Chrome/Chromium executable (overrides auto-detection)
    #[arg(long)]
    pub chrome_path: Option<PathBuf>,

    /// Custom image comparison command (two image paths are appended)
    #[arg(long)]
    pub compare_cmd: Option<String>,

    /// Logo detection command (exit 0 = detected, 1 = not detected)
    #[arg(long)]
    pub logo_cmd: Option<String>,

    /// Output the scan report as JSON
    #[arg(long)]
    pub json: bool,

    /// Quiet mode: only show output for seeds with discoveries
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Custom User-Agent string for page captures
    #[arg(short = 'u', long)]
    pub useragent: Option<String>,
}

impl Config {
    /// Seed domains from `--domain` plus the optional seed file,
    /// lowercased, blank lines and comments skipped.
    pub fn load_seeds(&self) -> Result<Vec<String>> {
        let mut seeds: Vec<String> = self
            .domain
            .iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        if let Some(ref path) = self.file {
            let content = std::fs::read_to_string(path).map_err(|e| {
                ScanError::ConfigError(format!("cannot read seed file {}: {e}", path.display()))
            })?;
            for line in content.lines() {
                let trimmed = line.trim();
                if !trimmed.is_empty() && !trimmed.starts_with('#') {
                    seeds.push(trimmed.to_lowercase());
                }
            }
        }

        if seeds.is_empty() {
            return Err(ScanError::ConfigError("no seed domains given".to_string()));
        }
        Ok(seeds)
    }

    /// Dictionary words for label variants; non-alphanumeric lines are
    /// dropped since they cannot form valid domain labels.
    pub fn load_dictionary(&self) -> Result<Vec<String>> {
        match self.dictionary {
            Some(ref path) => read_word_file(path, |w| {
                w.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Extra TLDs for suffix swaps; lines with anything but letters and
    /// dots are dropped.
    pub fn load_tlds(&self) -> Result<Vec<String>> {
        match self.tld {
            Some(ref path) => read_word_file(path, |w| {
                w.chars().all(|c| c.is_ascii_alphabetic() || c == '.')
            }),
            None => Ok(Vec::new()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.blocklist_pct) {
            return Err(ScanError::ConfigError(format!(
                "blocklist threshold {} is outside 0.0..=1.0",
                self.blocklist_pct
            )));
        }
        if self.nameservers.is_empty() {
            return Err(ScanError::ConfigError("no nameservers given".to_string()));
        }
        Ok(())
    }
}

fn read_word_file(path: &PathBuf, keep: impl Fn(&str) -> bool) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ScanError::ConfigError(format!("cannot read word file {}: {e}", path.display()))
    })?;

    Ok(content
        .lines()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty() && !l.starts_with('#') && keep(l))
        .collect())
}
