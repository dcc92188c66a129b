//! Concurrent DNS resolution of the candidate set.
//!
//! Candidates live in an arena owned by the pool; a shared FIFO index
//! queue is filled once before any worker starts, and exactly
//! `workers` tasks drain it. Workers never write the arena directly:
//! they send `(index, answers)` over a channel and the pool applies the
//! results when the stage completes, so the resolution stage owns each
//! record's write phase without per-record locks.

pub mod lookup;
pub mod rotator;
pub mod tracker;

pub use lookup::{DnsLookup, HickoryLookup, LookupError};
pub use rotator::NameserverPool;
pub use tracker::{DiagnosticSink, ResolveEvent, TimeoutTracker};

use crate::types::{Answer, Candidate, RecordType};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Tuning knobs for one resolution run.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub workers: usize,
    pub lookup_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: 10,
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

/// Shared FIFO over the candidate arena. The atomic cursor hands every
/// index out exactly once, so a crashed worker can never re-deliver or
/// starve jobs held by its siblings.
#[derive(Debug)]
struct JobQueue {
    domains: Vec<String>,
    cursor: AtomicUsize,
}

impl JobQueue {
    fn pop(&self) -> Option<(usize, String)> {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.domains.get(i).map(|d| (i, d.clone()))
    }

    fn remaining(&self) -> usize {
        let taken = self.cursor.load(Ordering::SeqCst).min(self.domains.len());
        self.domains.len() - taken
    }
}

/// Read-only progress view over a running pool, for operator reporting.
#[derive(Debug, Clone)]
pub struct PoolProgress {
    queue: Arc<JobQueue>,
}

impl PoolProgress {
    /// Jobs not yet dequeued by any worker.
    pub fn remaining(&self) -> usize {
        self.queue.remaining()
    }

    /// Total jobs enqueued, fixed at pool start.
    pub fn jobs_max(&self) -> usize {
        self.queue.domains.len()
    }

    /// Jobs dequeued so far.
    pub fn dispatched(&self) -> usize {
        self.jobs_max() - self.remaining()
    }
}

/// A running resolution stage over one candidate arena.
pub struct ResolutionPool {
    candidates: Vec<Candidate>,
    queue: Arc<JobQueue>,
    workers: Vec<JoinHandle<()>>,
    results: mpsc::UnboundedReceiver<(usize, BTreeMap<RecordType, Answer>)>,
}

impl ResolutionPool {
    /// Enqueue every candidate and spawn the workers. Each worker is
    /// pinned to one nameserver drawn from the shared rotator at spawn.
    pub fn start(
        candidates: Vec<Candidate>,
        dns: Arc<dyn DnsLookup>,
        nameservers: Arc<NameserverPool>,
        sink: DiagnosticSink,
        cancel: CancellationToken,
        options: PoolOptions,
    ) -> Self {
        let queue = Arc::new(JobQueue {
            domains: candidates.iter().map(|c| c.domain.clone()).collect(),
            cursor: AtomicUsize::new(0),
        });

        let (tx, results) = mpsc::unbounded_channel();
        let worker_count = options.workers.max(1);

        let workers = (0..worker_count)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let dns = Arc::clone(&dns);
                let nameserver = nameservers.next();
                let sink = sink.clone();
                let cancel = cancel.clone();
                let tx = tx.clone();
                let timeout = options.lookup_timeout;

                tokio::spawn(async move {
                    worker_loop(queue, dns, nameserver, timeout, sink, cancel, tx).await;
                })
            })
            .collect();

        Self {
            candidates,
            queue,
            workers,
            results,
        }
    }

    /// Handle for polling queue depth while the stage runs.
    pub fn progress(&self) -> PoolProgress {
        PoolProgress {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Join all workers, apply their results to the arena, and return
    /// the enriched candidates. Worker panics are isolated: the queue
    /// is shared, so surviving workers drain the remaining jobs and the
    /// crash is reported instead of silently dropping records.
    pub async fn await_completion(mut self) -> Vec<Candidate> {
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!("resolution worker crashed: {e}");
            }
        }

        // All senders are gone once the workers are joined.
        while let Some((index, answers)) = self.results.recv().await {
            if let Some(candidate) = self.candidates.get_mut(index) {
                candidate.dns = answers;
            }
        }

        self.candidates
    }
}

async fn worker_loop(
    queue: Arc<JobQueue>,
    dns: Arc<dyn DnsLookup>,
    nameserver: std::net::IpAddr,
    timeout: Duration,
    sink: DiagnosticSink,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<(usize, BTreeMap<RecordType, Answer>)>,
) {
    loop {
        // Cooperative stop at the job boundary: an in-flight candidate
        // is finished before the token is observed.
        if cancel.is_cancelled() {
            debug!("worker stopping on cancellation");
            break;
        }

        let Some((index, domain)) = queue.pop() else {
            break;
        };

        let mut answers = BTreeMap::new();
        for record_type in RecordType::ALL {
            match dns.lookup(&domain, record_type, nameserver, timeout).await {
                Ok(values) => {
                    if !values.is_empty() {
                        answers.insert(record_type, Answer::Records(values));
                    }
                }
                Err(LookupError::NxDomain) => {
                    // The name does not exist; the remaining record
                    // types cannot either.
                    if record_type == RecordType::A {
                        break;
                    }
                }
                Err(LookupError::Timeout) => {
                    sink.emit(ResolveEvent::Timeout {
                        domain: domain.clone(),
                        record_type,
                    });
                    answers.insert(record_type, Answer::ServFail);
                    // Timeouts are non-fatal; move on to the next
                    // candidate rather than burning the full timeout
                    // three more times.
                    break;
                }
                Err(LookupError::ServFail) => {
                    sink.emit(ResolveEvent::ServFail {
                        domain: domain.clone(),
                        record_type,
                    });
                    answers.insert(record_type, Answer::ServFail);
                }
                Err(LookupError::Other(reason)) => {
                    debug!("lookup {record_type} {domain} failed: {reason}");
                    answers.insert(record_type, Answer::ServFail);
                }
            }
        }

        let _ = tx.send((index, answers));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::sync::Mutex;

    type Behavior =
        Box<dyn Fn(&str, RecordType) -> lookup::LookupResult + Send + Sync>;

    struct ScriptedLookup {
        behavior: Behavior,
        a_queries: Mutex<HashMap<String, usize>>,
    }

    impl ScriptedLookup {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                a_queries: Mutex::new(HashMap::new()),
            })
        }
    }

    #[async_trait]
    impl DnsLookup for ScriptedLookup {
        async fn lookup(
            &self,
            name: &str,
            record_type: RecordType,
            _nameserver: IpAddr,
            _timeout: Duration,
        ) -> lookup::LookupResult {
            if record_type == RecordType::A {
                *self
                    .a_queries
                    .lock()
                    .unwrap()
                    .entry(name.to_string())
                    .or_default() += 1;
            }
            (self.behavior)(name, record_type)
        }
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate::new("addition", format!("candidate-{i}.com")))
            .collect()
    }

    fn pool(
        jobs: Vec<Candidate>,
        dns: Arc<ScriptedLookup>,
        workers: usize,
    ) -> (ResolutionPool, TimeoutTracker) {
        let (sink, tracker) = TimeoutTracker::channel();
        let nameservers =
            Arc::new(NameserverPool::parse(&["1.1.1.1".to_string()]).unwrap());
        let pool = ResolutionPool::start(
            jobs,
            dns,
            nameservers,
            sink,
            CancellationToken::new(),
            PoolOptions {
                workers,
                lookup_timeout: Duration::from_millis(10),
            },
        );
        (pool, tracker)
    }

    #[tokio::test]
    async fn every_job_is_processed_exactly_once() {
        for workers in [1usize, 3, 25] {
            let dns = ScriptedLookup::new(Box::new(|_, record_type| {
                match record_type {
                    RecordType::A => Ok(vec!["203.0.113.1".to_string()]),
                    _ => Ok(vec![]),
                }
            }));

            let (pool, _tracker) = pool(candidates(25), Arc::clone(&dns), workers);
            let progress = pool.progress();
            assert_eq!(progress.jobs_max(), 25);

            let resolved = pool.await_completion().await;

            assert_eq!(progress.remaining(), 0);
            assert_eq!(resolved.len(), 25);
            assert!(resolved.iter().all(Candidate::has_live_a));

            let counts = dns.a_queries.lock().unwrap();
            assert!(counts.values().all(|&c| c == 1), "a record visited twice");
        }
    }

    #[tokio::test]
    async fn nxdomain_leaves_records_absent() {
        let dns = ScriptedLookup::new(Box::new(|name, record_type| {
            if name == "candidate-0.com" && record_type == RecordType::A {
                Ok(vec!["198.51.100.7".to_string()])
            } else if name == "candidate-0.com" {
                Ok(vec![])
            } else {
                Err(LookupError::NxDomain)
            }
        }));

        let (pool, _tracker) = pool(candidates(5), dns, 2);
        let resolved = pool.await_completion().await;

        let live: Vec<&Candidate> = resolved.iter().filter(|c| c.has_live_a()).collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].domain, "candidate-0.com");
        assert!(resolved[1].dns.is_empty());
    }

    #[tokio::test]
    async fn timeout_records_sentinel_and_diagnostic() {
        let dns = ScriptedLookup::new(Box::new(|name, _| {
            if name == "candidate-2.com" {
                Err(LookupError::Timeout)
            } else {
                Ok(vec!["192.0.2.1".to_string()])
            }
        }));

        let (pool, mut tracker) = pool(candidates(4), dns, 2);
        let resolved = pool.await_completion().await;

        let timed_out = &resolved[2];
        assert_eq!(timed_out.dns.get(&RecordType::A), Some(&Answer::ServFail));
        assert!(!timed_out.has_live_a());

        // Exactly one timeout diagnostic: the worker moved to the next
        // candidate instead of retrying the remaining record types.
        assert_eq!(tracker.sample(), 1);
        assert_eq!(tracker.sample(), 0);
    }

    #[tokio::test]
    async fn cancellation_stops_new_jobs() {
        let dns = ScriptedLookup::new(Box::new(|_, _| Ok(vec!["192.0.2.1".to_string()])));

        let (sink, _tracker) = TimeoutTracker::channel();
        let nameservers =
            Arc::new(NameserverPool::parse(&["1.1.1.1".to_string()]).unwrap());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let pool = ResolutionPool::start(
            candidates(10),
            dns,
            nameservers,
            sink,
            cancel,
            PoolOptions::default(),
        );
        let progress = pool.progress();
        let resolved = pool.await_completion().await;

        assert_eq!(progress.remaining(), 10);
        assert!(resolved.iter().all(|c| c.dns.is_empty()));
    }
}
