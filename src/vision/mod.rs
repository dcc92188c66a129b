//! Visual similarity scoring of live candidates.
//!
//! The pipeline screenshots the seed domain once as the comparison
//! baseline, then processes every eligible candidate (live A record,
//! not the seed) with a small bounded worker count: capture, compare
//! against the baseline, optionally run logo detection. One candidate's
//! failure never aborts its siblings.

pub mod capture;
pub mod compare;

pub use capture::BrowserScreenshotter;
pub use compare::{CommandComparer, CommandLogoDetector};

use crate::types::{Candidate, LogoDetection, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 1x1 PNG substituted when the baseline capture fails, so downstream
/// comparisons degrade to low scores instead of erroring out.
const PLACEHOLDER_PNG: [u8; 70] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0xfc,
    0xcf, 0xc0, 0x50, 0x0f, 0x00, 0x04, 0x85, 0x01, 0x80, 0x84, 0xa9, 0x8c, 0x21, 0x00, 0x00,
    0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Screenshot capture capability.
#[async_trait]
pub trait Screenshotter: Send + Sync {
    /// Render `http://<domain>` and write a PNG to `out_path`.
    async fn capture(&self, domain: &str, out_path: &Path, timeout: Duration) -> Result<()>;
}

/// Structural image comparison capability. `1.0` denotes structural
/// identity; scores are advisory triage input, never correctness gates.
#[async_trait]
pub trait ImageComparer: Send + Sync {
    async fn compare(&self, baseline: &Path, candidate: &Path) -> Result<f64>;
}

/// Optional brand-logo detection capability.
#[async_trait]
pub trait LogoDetector: Send + Sync {
    async fn detect(&self, image: &Path, confidence: f64) -> Result<bool>;
}

/// Bounded-concurrency scoring pipeline over resolved candidates.
pub struct SimilarityPipeline {
    screenshotter: Arc<dyn Screenshotter>,
    comparer: Arc<dyn ImageComparer>,
    detector: Option<Arc<dyn LogoDetector>>,
    /// Deliberately small and independent of the DNS worker count;
    /// browser renders are far more expensive than lookups.
    workers: usize,
    capture_timeout: Duration,
    logo_confidence: f64,
    cancel: CancellationToken,
}

impl SimilarityPipeline {
    pub fn new(
        screenshotter: Arc<dyn Screenshotter>,
        comparer: Arc<dyn ImageComparer>,
        detector: Option<Arc<dyn LogoDetector>>,
        workers: usize,
        capture_timeout: Duration,
    ) -> Self {
        Self {
            screenshotter,
            comparer,
            detector,
            workers: workers.max(1),
            capture_timeout,
            logo_confidence: 0.85,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_logo_confidence(mut self, confidence: f64) -> Self {
        self.logo_confidence = confidence;
        self
    }

    /// Share a stop signal with the caller. Once cancelled, queued
    /// candidates are skipped at the job boundary instead of launching
    /// new captures.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Capture the seed baseline. On failure a placeholder image is
    /// written in its place so the batch can still run.
    pub async fn capture_baseline(&self, seed: &str, originals_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(originals_dir).await?;
        let baseline = originals_dir.join(format!("{seed}.png"));

        match self
            .screenshotter
            .capture(seed, &baseline, self.capture_timeout)
            .await
        {
            Ok(()) => Ok(baseline),
            Err(e) => {
                warn!("baseline capture for {seed} failed ({e}), using placeholder");
                tokio::fs::write(&baseline, PLACEHOLDER_PNG).await?;
                Ok(baseline)
            }
        }
    }

    /// Score every eligible candidate in `candidates` in place.
    /// Returns the list of per-candidate errors absorbed along the way.
    pub async fn run(
        &self,
        seed: &str,
        candidates: &mut [Candidate],
        out_dir: &Path,
    ) -> Result<Vec<String>> {
        if self.cancel.is_cancelled() {
            debug!("similarity stage skipped, stop signal already set");
            return Ok(Vec::new());
        }

        let shots_dir = out_dir.join("screenshots");
        let originals_dir = shots_dir.join("originals");
        tokio::fs::create_dir_all(&shots_dir).await?;

        let baseline = self.capture_baseline(seed, &originals_dir).await?;

        // The seed is retained in the set; eligibility filters it out
        // here by explicit name comparison.
        let eligible: Vec<(usize, String)> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.domain != seed && c.has_live_a())
            .map(|(i, c)| (i, c.domain.clone()))
            .collect();

        debug!("scoring {} eligible candidates", eligible.len());

        let outcomes: Vec<(usize, std::result::Result<Option<Scored>, String>)> =
            stream::iter(eligible)
                .map(|(index, domain)| {
                    let baseline = baseline.clone();
                    let shot = shots_dir.join(format!("{domain}.png"));
                    async move {
                        // Job-boundary stop: a queued candidate never
                        // launches a capture once the signal is set.
                        if self.cancel.is_cancelled() {
                            return (index, Ok(None));
                        }
                        let outcome = self.score_one(&domain, &baseline, &shot).await;
                        (index, outcome.map(Some).map_err(|e| format!("{domain}: {e}")))
                    }
                })
                .buffer_unordered(self.workers)
                .collect()
                .await;

        // Write phase: the concurrent captures are done, the similarity
        // stage owns the records again.
        let mut errors = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(Some(scored)) => {
                    let candidate = &mut candidates[index];
                    candidate.ssim_score = Some(scored.score);
                    candidate.screenshot = Some(scored.screenshot);
                    candidate.logo = scored.logo;
                }
                // Skipped after cancellation; the record stays unscored.
                Ok(None) => {}
                Err(reason) => {
                    warn!("similarity scoring failed: {reason}");
                    errors.push(reason);
                }
            }
        }

        Ok(errors)
    }

    async fn score_one(&self, domain: &str, baseline: &Path, shot: &Path) -> Result<Scored> {
        self.screenshotter
            .capture(domain, shot, self.capture_timeout)
            .await?;

        let score = self.comparer.compare(baseline, shot).await?;

        let logo = match &self.detector {
            None => LogoDetection::NotChecked,
            Some(detector) => {
                if !shot.exists() {
                    warn!("screenshot {} missing before logo detection", shot.display());
                    LogoDetection::Error
                } else {
                    match detector.detect(shot, self.logo_confidence).await {
                        Ok(true) => LogoDetection::Detected,
                        Ok(false) => LogoDetection::NotDetected,
                        Err(e) => {
                            warn!("logo detection for {domain} failed: {e}");
                            LogoDetection::Error
                        }
                    }
                }
            }
        };

        Ok(Scored {
            score: score.clamp(0.0, 1.0),
            screenshot: shot.to_path_buf(),
            logo,
        })
    }
}

struct Scored {
    score: f64,
    screenshot: PathBuf,
    logo: LogoDetection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Answer, RecordType, ScanError};
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FakeScreenshotter {
        fail_for: HashSet<String>,
        captured: Mutex<Vec<String>>,
    }

    impl FakeScreenshotter {
        fn new(fail_for: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                fail_for: fail_for.iter().map(|s| s.to_string()).collect(),
                captured: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Screenshotter for FakeScreenshotter {
        async fn capture(&self, domain: &str, out_path: &Path, _timeout: Duration) -> Result<()> {
            if self.fail_for.contains(domain) {
                return Err(ScanError::CaptureError {
                    domain: domain.to_string(),
                    reason: "render failed".to_string(),
                });
            }
            tokio::fs::write(out_path, b"fake-png").await?;
            self.captured.lock().unwrap().push(domain.to_string());
            Ok(())
        }
    }

    struct FixedComparer(f64);

    #[async_trait]
    impl ImageComparer for FixedComparer {
        async fn compare(&self, _baseline: &Path, _candidate: &Path) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FakeDetector {
        hit: bool,
        fail: bool,
    }

    #[async_trait]
    impl LogoDetector for FakeDetector {
        async fn detect(&self, _image: &Path, _confidence: f64) -> Result<bool> {
            if self.fail {
                Err(ScanError::LogoError("model unavailable".to_string()))
            } else {
                Ok(self.hit)
            }
        }
    }

    fn live(domain: &str) -> Candidate {
        let mut c = Candidate::new("addition", domain);
        c.dns
            .insert(RecordType::A, Answer::Records(vec!["203.0.113.5".into()]));
        c
    }

    fn temp_out_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "squatscan-test-{tag}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn partial_failure_does_not_abort_siblings() {
        let out_dir = temp_out_dir("partial");
        let shooter = FakeScreenshotter::new(&["examp1e.com"]);
        let pipeline = SimilarityPipeline::new(
            Arc::clone(&shooter) as Arc<dyn Screenshotter>,
            Arc::new(FixedComparer(0.75)),
            None,
            4,
            Duration::from_secs(1),
        );

        let mut candidates = vec![
            live("example.com"), // seed, skipped
            live("examp1e.com"), // capture forced to fail
            live("examplea.com"),
            live("www.example.com"),
        ];

        let errors = pipeline
            .run("example.com", &mut candidates, &out_dir)
            .await
            .unwrap();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("examp1e.com"));

        assert!(candidates[0].ssim_score.is_none(), "seed must not be scored");
        assert!(candidates[1].ssim_score.is_none());
        assert_eq!(candidates[2].ssim_score, Some(0.75));
        assert_eq!(candidates[3].ssim_score, Some(0.75));
        assert!(candidates[2].screenshot.is_some());

        let _ = std::fs::remove_dir_all(&out_dir);
    }

    #[tokio::test]
    async fn baseline_failure_substitutes_placeholder() {
        let out_dir = temp_out_dir("baseline");
        let shooter = FakeScreenshotter::new(&["example.com"]);
        let pipeline = SimilarityPipeline::new(
            shooter,
            Arc::new(FixedComparer(0.1)),
            None,
            2,
            Duration::from_secs(1),
        );

        let mut candidates = vec![live("example.com"), live("examplea.com")];
        pipeline
            .run("example.com", &mut candidates, &out_dir)
            .await
            .unwrap();

        let baseline = out_dir
            .join("screenshots")
            .join("originals")
            .join("example.com.png");
        let bytes = std::fs::read(&baseline).unwrap();
        assert_eq!(bytes, PLACEHOLDER_PNG);

        // Siblings were still compared against the placeholder.
        assert_eq!(candidates[1].ssim_score, Some(0.1));

        let _ = std::fs::remove_dir_all(&out_dir);
    }

    #[tokio::test]
    async fn only_live_non_seed_candidates_are_captured() {
        let out_dir = temp_out_dir("eligibility");
        let shooter = FakeScreenshotter::new(&[]);
        let pipeline = SimilarityPipeline::new(
            Arc::clone(&shooter) as Arc<dyn Screenshotter>,
            Arc::new(FixedComparer(0.5)),
            None,
            4,
            Duration::from_secs(1),
        );

        let mut dead = Candidate::new("omission", "exampl.com");
        dead.dns.insert(RecordType::A, Answer::ServFail);
        let unresolved = Candidate::new("addition", "exampleb.com");

        let mut candidates = vec![live("example.com"), dead, unresolved, live("examplea.com")];
        pipeline
            .run("example.com", &mut candidates, &out_dir)
            .await
            .unwrap();

        let captured = shooter.captured.lock().unwrap().clone();
        // Baseline plus the single eligible candidate.
        assert_eq!(captured.len(), 2);
        assert!(captured.contains(&"example.com".to_string()));
        assert!(captured.contains(&"examplea.com".to_string()));

        let _ = std::fs::remove_dir_all(&out_dir);
    }

    #[tokio::test]
    async fn logo_detection_categories() {
        let out_dir = temp_out_dir("logo");
        let shooter = FakeScreenshotter::new(&[]);

        let pipeline = SimilarityPipeline::new(
            Arc::clone(&shooter) as Arc<dyn Screenshotter>,
            Arc::new(FixedComparer(0.9)),
            Some(Arc::new(FakeDetector {
                hit: true,
                fail: false,
            })),
            2,
            Duration::from_secs(1),
        );
        let mut candidates = vec![live("example.com"), live("examplea.com")];
        pipeline
            .run("example.com", &mut candidates, &out_dir)
            .await
            .unwrap();
        assert_eq!(candidates[1].logo, LogoDetection::Detected);

        // Detector failure maps to the explicit Error category, never
        // to NotDetected.
        let pipeline = SimilarityPipeline::new(
            shooter,
            Arc::new(FixedComparer(0.9)),
            Some(Arc::new(FakeDetector {
                hit: false,
                fail: true,
            })),
            2,
            Duration::from_secs(1),
        );
        let mut candidates = vec![live("example.com"), live("examplea.com")];
        pipeline
            .run("example.com", &mut candidates, &out_dir)
            .await
            .unwrap();
        assert_eq!(candidates[1].logo, LogoDetection::Error);

        let _ = std::fs::remove_dir_all(&out_dir);
    }

    /// Writes the screenshot, then trips the shared stop signal.
    struct CancellingScreenshotter {
        token: CancellationToken,
        captured: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Screenshotter for CancellingScreenshotter {
        async fn capture(&self, domain: &str, out_path: &Path, _timeout: Duration) -> Result<()> {
            tokio::fs::write(out_path, b"fake-png").await?;
            self.captured.lock().unwrap().push(domain.to_string());
            self.token.cancel();
            Ok(())
        }
    }

    #[tokio::test]
    async fn pre_cancelled_pipeline_captures_nothing() {
        let out_dir = temp_out_dir("precancel");
        let shooter = FakeScreenshotter::new(&[]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let pipeline = SimilarityPipeline::new(
            Arc::clone(&shooter) as Arc<dyn Screenshotter>,
            Arc::new(FixedComparer(0.9)),
            None,
            4,
            Duration::from_secs(1),
        )
        .with_cancellation(cancel);

        let mut candidates = vec![
            live("example.com"),
            live("examplea.com"),
            live("exampleb.com"),
        ];
        let errors = pipeline
            .run("example.com", &mut candidates, &out_dir)
            .await
            .unwrap();

        // Not even the baseline is captured once the signal is set.
        assert!(errors.is_empty());
        assert!(shooter.captured.lock().unwrap().is_empty());
        assert!(candidates.iter().all(|c| c.ssim_score.is_none()));

        let _ = std::fs::remove_dir_all(&out_dir);
    }

    #[tokio::test]
    async fn cancellation_stops_new_captures_at_the_job_boundary() {
        let out_dir = temp_out_dir("midcancel");
        let cancel = CancellationToken::new();
        let shooter = Arc::new(CancellingScreenshotter {
            token: cancel.clone(),
            captured: Mutex::new(Vec::new()),
        });

        // One worker, so the baseline capture finishes (and cancels)
        // before any candidate job is dequeued.
        let pipeline = SimilarityPipeline::new(
            Arc::clone(&shooter) as Arc<dyn Screenshotter>,
            Arc::new(FixedComparer(0.9)),
            None,
            1,
            Duration::from_secs(1),
        )
        .with_cancellation(cancel);

        let mut candidates = vec![
            live("example.com"),
            live("examplea.com"),
            live("exampleb.com"),
            live("examplec.com"),
        ];
        let errors = pipeline
            .run("example.com", &mut candidates, &out_dir)
            .await
            .unwrap();

        let captured = shooter.captured.lock().unwrap().clone();
        assert_eq!(captured, vec!["example.com".to_string()]);
        assert!(errors.is_empty());
        assert!(candidates.iter().all(|c| c.ssim_score.is_none()));

        let _ = std::fs::remove_dir_all(&out_dir);
    }

    #[tokio::test]
    async fn no_detector_means_not_checked() {
        let out_dir = temp_out_dir("nodetector");
        let pipeline = SimilarityPipeline::new(
            FakeScreenshotter::new(&[]),
            Arc::new(FixedComparer(0.9)),
            None,
            2,
            Duration::from_secs(1),
        );
        let mut candidates = vec![live("example.com"), live("examplea.com")];
        pipeline
            .run("example.com", &mut candidates, &out_dir)
            .await
            .unwrap();
        assert_eq!(candidates[1].logo, LogoDetection::NotChecked);

        let _ = std::fs::remove_dir_all(&out_dir);
    }
}
