//! External image-comparison and logo-detection capabilities.
//!
//! The structural-similarity math itself lives outside this crate:
//! the comparer shells out to an external tool (ImageMagick's
//! `compare -metric SSIM` by default) and parses the reported score.
//! Logo detection follows the same pattern with a user-supplied
//! command, exit status encoding the verdict.

use crate::types::{Result, ScanError};
use crate::vision::{ImageComparer, LogoDetector};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// First float token in tool output; ImageMagick prints forms like
/// `0.987654 (0.987654)` or `1.2345e-03` on stderr.
static FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?(?:[eE][+-]?\d+)?").expect("valid float regex"));

/// Image comparison via an external command invoked as
/// `<program> <args..> <baseline> <candidate> <tail-args..>`.
pub struct CommandComparer {
    program: String,
    args: Vec<String>,
    tail_args: Vec<String>,
}

impl CommandComparer {
    /// ImageMagick structural-similarity invocation:
    /// `compare -metric SSIM <a> <b> null:`.
    pub fn imagemagick() -> Self {
        Self {
            program: "compare".to_string(),
            args: vec!["-metric".to_string(), "SSIM".to_string()],
            tail_args: vec!["null:".to_string()],
        }
    }

    /// Custom comparison command line; the two image paths are appended
    /// as the final arguments and the first float in the output is
    /// taken as the score.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            ScanError::ConfigError("empty image comparison command".to_string())
        })?;
        Ok(Self {
            program,
            args: parts.collect(),
            tail_args: vec![],
        })
    }
}

#[async_trait]
impl ImageComparer for CommandComparer {
    async fn compare(&self, baseline: &Path, candidate: &Path) -> Result<f64> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(baseline)
            .arg(candidate)
            .args(&self.tail_args)
            .output()
            .await
            .map_err(|e| {
                ScanError::CompareError(format!("failed to run {}: {e}", self.program))
            })?;

        // ImageMagick exits non-zero when the images differ, so the
        // score is parsed regardless of status.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{stdout} {stderr}");

        let score = FLOAT_RE
            .find(&combined)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or_else(|| {
                ScanError::CompareError(format!(
                    "{} produced no parseable score: {}",
                    self.program,
                    combined.trim()
                ))
            })?;

        debug!(
            "compared {} vs {}: {score}",
            baseline.display(),
            candidate.display()
        );
        Ok(score.clamp(0.0, 1.0))
    }
}

/// Logo detection via an external command invoked as
/// `<program> <args..> <image> --confidence <threshold>`.
/// Exit code 0 means detected, 1 means not detected, anything else is
/// a detector error.
pub struct CommandLogoDetector {
    program: String,
    args: Vec<String>,
}

impl CommandLogoDetector {
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            ScanError::ConfigError("empty logo detection command".to_string())
        })?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl LogoDetector for CommandLogoDetector {
    async fn detect(&self, image: &Path, confidence: f64) -> Result<bool> {
        if !image.exists() {
            return Err(ScanError::LogoError(format!(
                "image {} does not exist",
                image.display()
            )));
        }

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .arg("--confidence")
            .arg(confidence.to_string())
            .output()
            .await
            .map_err(|e| ScanError::LogoError(format!("failed to run {}: {e}", self.program)))?;

        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            status => Err(ScanError::LogoError(format!(
                "{} exited with {:?}: {}",
                self.program,
                status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_regex_matches_imagemagick_output() {
        assert_eq!(FLOAT_RE.find("0.987654 (0.987654)").unwrap().as_str(), "0.987654");
        assert_eq!(FLOAT_RE.find("1.2345e-03").unwrap().as_str(), "1.2345e-03");
        assert_eq!(FLOAT_RE.find("score: 1").unwrap().as_str(), "1");
        assert!(FLOAT_RE.find("no score here").is_none());
    }

    #[test]
    fn empty_command_lines_are_rejected() {
        assert!(CommandComparer::from_command_line("  ").is_err());
        assert!(CommandLogoDetector::from_command_line("").is_err());
    }

    #[tokio::test]
    async fn missing_image_is_an_explicit_error() {
        let detector = CommandLogoDetector::from_command_line("true").unwrap();
        let result = detector
            .detect(Path::new("/nonexistent/shot.png"), 0.85)
            .await;
        assert!(matches!(result, Err(ScanError::LogoError(_))));
    }
}
