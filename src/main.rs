//! squatscan - Typosquatting and brand-impersonation domain scanner.
//!
//! CLI entry point.

use clap::Parser;
use squatscan::{report, Config, Scanner};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Set up logging
    let filter = if config.verbose {
        EnvFilter::new("squatscan=debug,info")
    } else {
        EnvFilter::new("squatscan=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cancel = CancellationToken::new();

    // Spawn signal handler so an interrupted run stops dispatching new
    // work instead of leaving Chrome processes behind.
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        eprintln!("\nSignal received, finishing in-flight work...");
        signal_token.cancel();
    });

    run(config, cancel).await
}

async fn run(config: Config, cancel: CancellationToken) -> ExitCode {
    let seeds = match config.load_seeds() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load seed domains: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let scanner = match Scanner::new(config.clone(), cancel) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create scanner: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Dry-run mode: print the candidate set and exit.
    if config.generate {
        for seed in &seeds {
            for candidate in scanner.generate_only(seed) {
                println!("{}", candidate.domain);
            }
        }
        return ExitCode::SUCCESS;
    }

    if let Err(e) = report::create_folders(&config.out_dir, config.nmap, config.recon, config.whois)
    {
        error!("Failed to create report directories: {}", e);
        return ExitCode::FAILURE;
    }

    if !config.json {
        print_banner();
    }

    let reports = match scanner.scan_all(&seeds).await {
        Ok(r) => r,
        Err(e) => {
            error!("Scan failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let total_live: usize = reports.iter().map(|r| r.live).sum();
    if total_live > 0 && !config.json {
        eprintln!("\n{} registered lookalike domains found!", total_live);
    }

    ExitCode::SUCCESS
}

fn print_banner() {
    println!();
    println!("\x1b[36m╔══════════════════════════════════════════════════════════════╗\x1b[0m");
    println!("\x1b[36m║                    SQUATSCAN v0.1.0                          ║\x1b[0m");
    println!("\x1b[36m║           Typosquatting Domain Scanner                       ║\x1b[0m");
    println!("\x1b[36m╚══════════════════════════════════════════════════════════════╝\x1b[0m");
    println!();
}
