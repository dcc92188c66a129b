//! Colored console output for scan results.

use crate::report;
use crate::types::{Candidate, LogoDetection, ScanReport};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// Console output handler with colors and formatting.
pub struct ConsoleOutput {
    verbose: bool,
    json_mode: bool,
    quiet: bool,
}

impl ConsoleOutput {
    /// Create a new console output handler.
    pub fn new(verbose: bool, json_mode: bool, quiet: bool) -> Self {
        Self { verbose, json_mode, quiet }
    }

    /// Print scan start message.
    pub fn print_scan_start(&self, seed: &str, generated: usize) {
        if self.json_mode || self.quiet {
            return;
        }

        println!(
            "{} Scanning {} ({} permutations)",
            "[*]".bright_blue(),
            seed.bright_white(),
            generated
        );
    }

    /// Print scan progress (only in verbose mode).
    pub fn print_progress(&self, message: &str) {
        if self.json_mode || !self.verbose {
            return;
        }

        println!("{} {}", "[.]".dimmed(), message.dimmed());
    }

    /// Print info message.
    pub fn print_info(&self, message: &str) {
        if self.json_mode || self.quiet {
            return;
        }

        println!("{} {}", "[*]".bright_blue(), message);
    }

    /// Print error message.
    pub fn print_error(&self, message: &str) {
        if self.json_mode {
            return;
        }

        eprintln!("{} {}", "[!]".red().bold(), message);
    }

    /// Print one discovered (live) candidate.
    pub fn print_discovery(&self, candidate: &Candidate) {
        if self.json_mode || self.quiet {
            return;
        }

        let score = match candidate.ssim_score {
            Some(s) if s >= 0.9 => format!("{s:.3}").on_red().white().bold(),
            Some(s) if s >= 0.5 => format!("{s:.3}").yellow().bold(),
            Some(s) => format!("{s:.3}").green(),
            None => "-".dimmed(),
        };

        let logo = match candidate.logo {
            LogoDetection::Detected => " LOGO".red().bold(),
            LogoDetection::Error => " logo?".yellow(),
            LogoDetection::NotDetected | LogoDetection::NotChecked => "".normal(),
        };

        println!(
            "{} {:<14} {} [ssim {}]{}",
            "[+]".green(),
            candidate.fuzzer,
            candidate.domain.bright_white(),
            score,
            logo
        );
    }

    /// Print the aligned table of discovered domains.
    pub fn print_table(&self, candidates: &[&Candidate]) {
        if self.json_mode || self.quiet || candidates.is_empty() {
            return;
        }

        println!();
        print!("{}", report::format_table(candidates));
    }

    /// Print scan summary.
    pub fn print_summary(&self, result: &ScanReport) {
        if self.json_mode {
            if let Ok(json) = serde_json::to_string_pretty(result) {
                println!("{}", json);
            }
            return;
        }

        // In quiet mode, only print if something was discovered
        if self.quiet && result.live == 0 {
            return;
        }

        println!();
        println!("{}", "=== Scan Summary ===".bright_cyan());
        println!("  Seed:        {}", result.seed);
        println!("  Duration:    {:.2}s", result.duration_secs);
        println!("  Generated:   {}", result.generated);
        println!("  Timeouts:    {}", result.timeouts);
        println!("  Scored:      {}", result.scored);

        if result.live > 0 {
            println!(
                "  {}",
                format!("REGISTERED LOOKALIKES FOUND: {}", result.live)
                    .red()
                    .bold()
            );
        } else {
            println!("  {}", "No registered lookalike domains found.".green());
        }

        if !result.errors.is_empty() {
            println!();
            println!("{}", "Errors encountered:".yellow());
            for error in &result.errors {
                println!("  - {}", error.dimmed());
            }
        }

        println!();
    }

    /// Create a progress bar.
    pub fn create_progress_bar(&self, total: u64, message: &str) -> Option<ProgressBar> {
        if self.json_mode || self.quiet {
            return None;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message(message.to_string());
        Some(pb)
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(false, false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_output_creation() {
        let output = ConsoleOutput::new(true, false, false);
        assert!(output.verbose);
        assert!(!output.json_mode);
    }

    #[test]
    fn quiet_mode_suppresses_discoveries() {
        // Smoke test: quiet output paths must not panic.
        let output = ConsoleOutput::new(false, false, true);
        let candidate = Candidate::new("homoglyph", "examp1e.com");
        output.print_discovery(&candidate);
        output.print_scan_start("example.com", 100);
    }
}
