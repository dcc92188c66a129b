//! squatscan - Typosquatting and brand-impersonation domain scanner.
//!
//! This library finds registered lookalikes of a seed domain by:
//! - Generating typo, homoglyph, and dictionary permutations of the seed
//! - Resolving every candidate concurrently across a rotating nameserver pool
//! - Screenshotting live candidates with a headless browser
//! - Scoring each screenshot's structural similarity against the seed's page
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use squatscan::{Config, Scanner};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::parse_from(["squatscan", "-d", "example.com"]);
//!     let scanner = Scanner::new(config, CancellationToken::new()).unwrap();
//!     let report = scanner.scan("example.com").await.unwrap();
//!     println!("Found {} registered lookalikes", report.live);
//! }
//! ```

pub mod config;
pub mod notify;
pub mod permute;
pub mod recon;
pub mod report;
pub mod resolve;
pub mod scanner;
pub mod types;
pub mod vision;

pub use config::Config;
pub use permute::{Generator, ORIGINAL_TAG};
pub use scanner::Scanner;
pub use types::{
    Answer, Candidate, LogoDetection, RecordType, Result, ScanError, ScanReport,
};
