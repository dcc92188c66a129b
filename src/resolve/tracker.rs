//! Resolver diagnostic stream and timeout accounting.
//!
//! Workers report resolver-level events through a typed channel instead
//! of a shared error stream; the tracker drains it on demand to feed
//! operator-facing progress reporting. Events are diagnostics, not
//! per-candidate results, and have no effect on resolution outcomes.

use crate::types::RecordType;
use tokio::sync::mpsc;

/// A resolver-level event emitted by a resolution worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveEvent {
    Timeout {
        domain: String,
        record_type: RecordType,
    },
    ServFail {
        domain: String,
        record_type: RecordType,
    },
}

/// Write half of the diagnostic channel, cloned into every worker.
#[derive(Debug, Clone)]
pub struct DiagnosticSink {
    tx: mpsc::UnboundedSender<ResolveEvent>,
}

impl DiagnosticSink {
    pub fn emit(&self, event: ResolveEvent) {
        // The tracker being dropped just means nobody is sampling.
        let _ = self.tx.send(event);
    }
}

/// Read half: counts timeout diagnostics between samples.
#[derive(Debug)]
pub struct TimeoutTracker {
    rx: mpsc::UnboundedReceiver<ResolveEvent>,
    total: usize,
}

impl TimeoutTracker {
    /// Create a connected sink/tracker pair.
    pub fn channel() -> (DiagnosticSink, TimeoutTracker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (DiagnosticSink { tx }, TimeoutTracker { rx, total: 0 })
    }

    /// Count of timeout diagnostics accumulated since the last call,
    /// clearing the sampling buffer. Safe to call while workers are
    /// still writing; events arriving after the drain are counted by
    /// the next sample.
    pub fn sample(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.rx.try_recv() {
            if matches!(event, ResolveEvent::Timeout { .. }) {
                count += 1;
            }
        }
        self.total += count;
        count
    }

    /// Running total across all samples.
    pub fn total(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_counts_and_clears() {
        let (sink, mut tracker) = TimeoutTracker::channel();

        for i in 0..7 {
            sink.emit(ResolveEvent::Timeout {
                domain: format!("candidate-{i}.com"),
                record_type: RecordType::A,
            });
        }
        // ServFail events are diagnosed but not counted as timeouts.
        sink.emit(ResolveEvent::ServFail {
            domain: "other.com".to_string(),
            record_type: RecordType::Mx,
        });

        assert_eq!(tracker.sample(), 7);
        assert_eq!(tracker.sample(), 0);
        assert_eq!(tracker.total(), 7);

        sink.emit(ResolveEvent::Timeout {
            domain: "late.com".to_string(),
            record_type: RecordType::Ns,
        });
        assert_eq!(tracker.sample(), 1);
        assert_eq!(tracker.total(), 8);
    }

    #[test]
    fn sink_survives_dropped_tracker() {
        let (sink, tracker) = TimeoutTracker::channel();
        drop(tracker);
        sink.emit(ResolveEvent::Timeout {
            domain: "example.com".to_string(),
            record_type: RecordType::A,
        });
    }
}
