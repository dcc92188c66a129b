//! Core types and errors for the typosquatting scanner.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Browser error: {0}")]
    BrowserError(String),

    #[error("Screenshot capture failed for {domain}: {reason}")]
    CaptureError { domain: String, reason: String },

    #[error("Image comparison failed: {0}")]
    CompareError(String),

    #[error("Logo detection failed: {0}")]
    LogoError(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// DNS record types queried for each candidate domain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Ns,
    Mx,
}

impl RecordType {
    /// The record types resolved for every candidate, in query order.
    pub const ALL: [RecordType; 4] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Ns,
        RecordType::Mx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Ns => "NS",
            RecordType::Mx => "MX",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one record type for one candidate.
///
/// NXDOMAIN leaves no entry at all in the record map, matching the
/// "absent until resolved successfully" convention of the report format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Answer {
    /// Resolved values, in answer order.
    Records(Vec<String>),
    /// The resolver failed or timed out for this lookup.
    ServFail,
}

impl Answer {
    /// True when this answer carries at least one resolved value.
    pub fn is_live(&self) -> bool {
        matches!(self, Answer::Records(values) if !values.is_empty())
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Answer::Records(values) => f.write_str(&values.join(";")),
            Answer::ServFail => f.write_str("!ServFail"),
        }
    }
}

/// Result of running logo detection against a candidate screenshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogoDetection {
    /// No detector configured, or the candidate never reached detection.
    #[default]
    NotChecked,
    Detected,
    NotDetected,
    /// Detector invocation failed or the screenshot was missing. Kept
    /// distinct from NotDetected so a broken detector never reads as a
    /// clean result.
    Error,
}

impl std::fmt::Display for LogoDetection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogoDetection::NotChecked => "not-checked",
            LogoDetection::Detected => "detected",
            LogoDetection::NotDetected => "not-detected",
            LogoDetection::Error => "error",
        };
        f.write_str(s)
    }
}

/// One generated domain variant, enriched in place as it moves through
/// the pipeline: the generator fills `fuzzer` and `domain`, the resolution
/// pool fills `dns`, and the similarity pipeline fills the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Name of the mutation rule that produced this variant.
    pub fuzzer: String,
    /// Fully-qualified candidate domain.
    pub domain: String,
    /// Resolved records per type; empty until the resolution stage ran.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dns: BTreeMap<RecordType, Answer>,
    /// Structural similarity against the seed's baseline screenshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssim_score: Option<f64>,
    /// Path of the candidate screenshot, when capture succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
    #[serde(default)]
    pub logo: LogoDetection,
}

impl Candidate {
    pub fn new(fuzzer: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            fuzzer: fuzzer.into(),
            domain: domain.into(),
            dns: BTreeMap::new(),
            ssim_score: None,
            screenshot: None,
            logo: LogoDetection::default(),
        }
    }

    /// True when the candidate resolved to at least one A record.
    pub fn has_live_a(&self) -> bool {
        self.dns
            .get(&RecordType::A)
            .map(Answer::is_live)
            .unwrap_or(false)
    }
}

/// Complete scan result for one seed domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// The seed domain the scan was run against.
    pub seed: String,
    /// Total candidates after deduplication (seed included).
    pub generated: usize,
    /// Candidates that resolved with a live A record (seed excluded).
    pub live: usize,
    /// Candidates that received a similarity score.
    pub scored: usize,
    /// Resolver timeouts observed during the resolution stage.
    pub timeouts: usize,
    /// Scan duration in seconds.
    pub duration_secs: f64,
    /// Every candidate record, in generation order, seed first.
    pub candidates: Vec<Candidate>,
    /// Non-fatal errors absorbed during the scan.
    pub errors: Vec<String>,
}
