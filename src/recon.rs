//! External reconnaissance tooling around discovered domains.
//!
//! WHOIS queries, nmap port scans, and dnsrecon enumeration are all
//! invocations of external tools; their results are written to files
//! under the report directory and never parsed by the scanner.

use crate::resolve::NameserverPool;
use crate::types::{Result, ScanError};
use futures::stream::{self, StreamExt};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const WHOIS_TIMEOUT: Duration = Duration::from_secs(10);

/// Query the system `whois` client for one domain. The nameserver is
/// drawn from the shared rotator by the caller; it is recorded for
/// traceability even though the WHOIS protocol picks its own registry
/// servers.
pub async fn whois_query(domain: &str, nameserver: IpAddr) -> Result<String> {
    debug!("whois {domain} (resolver slot {nameserver})");

    let output = tokio::time::timeout(
        WHOIS_TIMEOUT,
        Command::new("whois").arg(domain).output(),
    )
    .await
    .map_err(|_| ScanError::ConfigError(format!("whois query for {domain} timed out")))?
    .map_err(|e| ScanError::ConfigError(format!("failed to run whois: {e}")))?;

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run WHOIS lookups for every given domain with bounded concurrency,
/// writing one output file per domain. Individual failures are logged
/// and skipped; the stage itself never fails mid-batch. Once the stop
/// signal is set, queued domains are skipped without spawning a query.
pub async fn whois_stage(
    domains: &[String],
    nameservers: &Arc<NameserverPool>,
    concurrency: usize,
    out_dir: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let whois_dir = out_dir.join("whois");
    tokio::fs::create_dir_all(&whois_dir).await?;

    stream::iter(domains)
        .map(|domain| {
            let nameserver = nameservers.next();
            let path = whois_dir.join(format!("{domain}.txt"));
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return;
                }
                match whois_query(domain, nameserver).await {
                    Ok(data) => {
                        if let Err(e) = tokio::fs::write(&path, data).await {
                            warn!("failed to write whois output for {domain}: {e}");
                        }
                    }
                    Err(e) => warn!("whois for {domain} failed: {e}"),
                }
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect::<Vec<()>>()
        .await;

    Ok(())
}

/// Fire-and-forget nmap scan; output lands in `<out_dir>/nmap/`.
pub fn spawn_portscan(domain: &str, out_dir: &Path) {
    let report = out_dir.join("nmap").join(format!("{domain}.txt"));
    let domain = domain.to_string();

    tokio::spawn(async move {
        let result = Command::new("nmap")
            .arg("-Pn")
            .arg(&domain)
            .arg("-oN")
            .arg(&report)
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {
                info!("nmap scan of {domain} written to {}", report.display());
            }
            Ok(output) => warn!(
                "nmap scan of {domain} exited with {:?}",
                output.status.code()
            ),
            Err(e) => warn!("failed to run nmap for {domain}: {e}"),
        }
    });
}

/// Fire-and-forget dnsrecon enumeration; output lands in
/// `<out_dir>/dnsrecon/`.
pub fn spawn_recon_scan(domain: &str, nameserver: IpAddr, out_dir: &Path, threads: usize) {
    let report = out_dir.join("dnsrecon").join(format!("{domain}.csv"));
    let domain = domain.to_string();

    tokio::spawn(async move {
        let result = Command::new("dnsrecon")
            .arg("-d")
            .arg(&domain)
            .arg("-n")
            .arg(nameserver.to_string())
            .arg("--threads")
            .arg(threads.to_string())
            .arg("-c")
            .arg(&report)
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {
                info!("dnsrecon report for {domain} written to {}", report.display());
            }
            Ok(output) => warn!(
                "dnsrecon for {domain} exited with {:?}",
                output.status.code()
            ),
            Err(e) => warn!("failed to run dnsrecon for {domain}: {e}"),
        }
    });
}
