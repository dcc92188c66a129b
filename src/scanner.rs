//! Scan orchestration: permutation, resolution, similarity scoring,
//! reconnaissance, and report writing for one seed domain at a time.

use crate::config::Config;
use crate::notify::ConsoleOutput;
use crate::permute::Generator;
use crate::recon;
use crate::report;
use crate::resolve::{
    DnsLookup, HickoryLookup, NameserverPool, PoolOptions, ResolutionPool, TimeoutTracker,
};
use crate::types::{Candidate, Result, ScanReport};
use crate::vision::{
    BrowserScreenshotter, CommandComparer, CommandLogoDetector, ImageComparer, LogoDetector,
    Screenshotter, SimilarityPipeline,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Main scanner, holding the shared nameserver rotator and the
/// capability implementations used by every per-seed scan.
pub struct Scanner {
    config: Config,
    dictionary: Vec<String>,
    tld_list: Vec<String>,
    nameservers: Arc<NameserverPool>,
    dns: Arc<dyn DnsLookup>,
    screenshotter: Arc<dyn Screenshotter>,
    comparer: Arc<dyn ImageComparer>,
    detector: Option<Arc<dyn LogoDetector>>,
    output: ConsoleOutput,
    cancel: CancellationToken,
}

impl Scanner {
    /// Build a scanner with the production capability stack: hickory
    /// DNS, headless Chrome captures, and external comparison commands.
    pub fn new(config: Config, cancel: CancellationToken) -> Result<Self> {
        let screenshotter = BrowserScreenshotter::new()
            .with_chrome_executable(config.chrome_path.clone())
            .with_user_agent(config.useragent.clone());

        let comparer: Arc<dyn ImageComparer> = match config.compare_cmd {
            Some(ref cmd) => Arc::new(CommandComparer::from_command_line(cmd)?),
            None => Arc::new(CommandComparer::imagemagick()),
        };

        let detector: Option<Arc<dyn LogoDetector>> = match config.logo_cmd {
            Some(ref cmd) => Some(Arc::new(CommandLogoDetector::from_command_line(cmd)?)),
            None => None,
        };

        Self::with_capabilities(
            config,
            Arc::new(HickoryLookup::new()),
            Arc::new(screenshotter),
            comparer,
            detector,
            cancel,
        )
    }

    /// Build a scanner with explicit capability implementations.
    pub fn with_capabilities(
        config: Config,
        dns: Arc<dyn DnsLookup>,
        screenshotter: Arc<dyn Screenshotter>,
        comparer: Arc<dyn ImageComparer>,
        detector: Option<Arc<dyn LogoDetector>>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        config.validate()?;
        let nameservers = Arc::new(NameserverPool::parse(&config.nameservers)?);
        let dictionary = config.load_dictionary()?;
        let tld_list = config.load_tlds()?;
        let output = ConsoleOutput::new(config.verbose, config.json, config.quiet);

        Ok(Self {
            config,
            dictionary,
            tld_list,
            nameservers,
            dns,
            screenshotter,
            comparer,
            detector,
            output,
            cancel,
        })
    }

    pub fn output(&self) -> &ConsoleOutput {
        &self.output
    }

    /// Generate the candidate set for a seed without scanning.
    pub fn generate_only(&self, seed: &str) -> Vec<Candidate> {
        Generator::new(seed, self.dictionary.clone(), self.tld_list.clone()).generate()
    }

    /// Run the full pipeline for one seed domain.
    pub async fn scan(&self, seed: &str) -> Result<ScanReport> {
        let start = Instant::now();
        let generator = Generator::new(seed, self.dictionary.clone(), self.tld_list.clone());
        let seed = generator.seed().to_string();

        let candidates = generator.generate();
        let generated = candidates.len();
        self.output.print_scan_start(&seed, generated);

        let (candidates, timeouts) = self.resolve_all(candidates).await;
        let mut candidates = candidates;
        let mut errors = Vec::new();

        let live_domains: Vec<String> = report::live_candidates(&candidates, &seed)
            .iter()
            .map(|c| c.domain.clone())
            .collect();
        info!("{} of {} candidates are registered", live_domains.len(), generated);

        if self.config.whois && !live_domains.is_empty() {
            self.output.print_info("recording WHOIS data");
            if let Err(e) = recon::whois_stage(
                &live_domains,
                &self.nameservers,
                self.config.threads,
                &self.config.out_dir,
                &self.cancel,
            )
            .await
            {
                errors.push(format!("whois stage: {e}"));
            }
        }

        if !self.cancel.is_cancelled() && !live_domains.is_empty() {
            let pipeline = SimilarityPipeline::new(
                Arc::clone(&self.screenshotter),
                Arc::clone(&self.comparer),
                self.detector.clone(),
                self.config.screenshot_workers,
                Duration::from_secs(self.config.capture_timeout),
            )
            .with_cancellation(self.cancel.clone());
            errors.extend(
                pipeline
                    .run(&seed, &mut candidates, &self.config.out_dir)
                    .await?,
            );
        }

        for domain in &live_domains {
            if self.config.nmap {
                recon::spawn_portscan(domain, &self.config.out_dir);
            }
            if self.config.recon {
                recon::spawn_recon_scan(
                    domain,
                    self.nameservers.next(),
                    &self.config.out_dir,
                    self.config.threads,
                );
            }
        }

        self.write_reports(&candidates, &seed, &mut errors);

        let live = report::live_candidates(&candidates, &seed);
        for candidate in &live {
            self.output.print_discovery(candidate);
        }
        self.output.print_table(&live);

        Ok(ScanReport {
            seed,
            generated,
            live: live.len(),
            scored: candidates.iter().filter(|c| c.ssim_score.is_some()).count(),
            timeouts,
            duration_secs: start.elapsed().as_secs_f64(),
            candidates,
            errors,
        })
    }

    /// Scan every seed in order, stopping early on cancellation.
    pub async fn scan_all(&self, seeds: &[String]) -> Result<Vec<ScanReport>> {
        let mut reports = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if self.cancel.is_cancelled() {
                break;
            }
            let report = self.scan(seed).await?;
            self.output.print_summary(&report);
            reports.push(report);
        }
        Ok(reports)
    }

    /// Run the resolution stage, polling progress and timeout
    /// diagnostics while the workers drain the queue.
    async fn resolve_all(&self, candidates: Vec<Candidate>) -> (Vec<Candidate>, usize) {
        let (sink, mut tracker) = TimeoutTracker::channel();
        let pool = ResolutionPool::start(
            candidates,
            Arc::clone(&self.dns),
            Arc::clone(&self.nameservers),
            sink,
            self.cancel.clone(),
            PoolOptions {
                workers: self.config.threads,
                lookup_timeout: Duration::from_secs(self.config.dns_timeout),
            },
        );

        let progress = pool.progress();
        let bar = self
            .output
            .create_progress_bar(progress.jobs_max() as u64, "resolving");

        while progress.remaining() > 0 && !self.cancel.is_cancelled() {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let delta = self.sample_timeouts(&mut tracker);
            if let Some(ref bar) = bar {
                bar.set_position(progress.dispatched() as u64);
                if delta > 0 {
                    bar.set_message(format!("{} timeouts", tracker.total()));
                }
            }
        }

        let resolved = pool.await_completion().await;

        // Final drain picks up events emitted after the last poll.
        self.sample_timeouts(&mut tracker);
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        (resolved, tracker.total())
    }

    fn sample_timeouts(&self, tracker: &mut TimeoutTracker) -> usize {
        let delta = tracker.sample();
        if delta > 0 {
            debug!("{delta} resolver timeouts since last sample");
        }
        delta
    }

    fn write_reports(&self, candidates: &[Candidate], seed: &str, errors: &mut Vec<String>) {
        let csv_path = self.config.out_dir.join("discovered-domains.csv");
        if let Err(e) = report::write_csv(candidates, &csv_path) {
            errors.push(format!("csv export: {e}"));
        }

        if self.config.blocklist {
            let entries =
                report::blocklist_entries(candidates, seed, self.config.blocklist_pct);
            if entries.is_empty() {
                debug!("no candidates met the blocklist threshold");
            } else {
                let path = self.config.out_dir.join("blocklist.csv");
                match report::write_blocklist(&entries, &path) {
                    Ok(()) => info!("{} blocklist entries written", entries.len()),
                    Err(e) => errors.push(format!("blocklist export: {e}")),
                }
            }
        }
    }
}
