//! Test doubles shared by the unit tests: a fake mastership oracle, a journal
//! that records what workers did, and a worker that ticks into the journal.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{Conn, ConnError, WorkerFactory, WorkerFn};

const EXPECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A replicated store shared by every replica in a test.
///
/// `master` names the replica whose connection points at the primary;
/// `0` means no primary (an election is in progress).
pub struct FakeOracle {
    master: AtomicUsize,
    ping_ok: AtomicBool,
    query_ok: AtomicBool,
}

impl FakeOracle {
    pub fn new(master: usize) -> Arc<Self> {
        Arc::new(Self {
            master: AtomicUsize::new(master),
            ping_ok: AtomicBool::new(true),
            query_ok: AtomicBool::new(true),
        })
    }

    pub fn set_master(&self, replica: usize) {
        self.master.store(replica, Ordering::SeqCst);
    }

    pub fn set_ping(&self, ok: bool) {
        self.ping_ok.store(ok, Ordering::SeqCst);
    }

    pub fn set_query(&self, ok: bool) {
        self.query_ok.store(ok, Ordering::SeqCst);
    }

    /// Connection of `replica` to this store.
    pub fn conn(self: &Arc<Self>, replica: usize) -> Arc<dyn Conn> {
        Arc::new(FakeConn {
            oracle: Arc::clone(self),
            replica,
        })
    }
}

struct FakeConn {
    oracle: Arc<FakeOracle>,
    replica: usize,
}

#[async_trait]
impl Conn for FakeConn {
    async fn ping(&self) -> Result<(), ConnError> {
        if self.oracle.ping_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConnError::unavailable("connection reset by peer"))
        }
    }

    async fn is_master(&self) -> Result<bool, ConnError> {
        if !self.oracle.query_ok.load(Ordering::SeqCst) {
            return Err(ConnError::query("no reachable primary"));
        }
        Ok(self.oracle.master.load(Ordering::SeqCst) == self.replica)
    }
}

/// What a journaled worker did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Start,
    Operation,
    Stop,
}

/// Ordered log of `(replica, step)` shared by every journaled worker.
#[derive(Clone, Default)]
pub struct Journal {
    log: Arc<Mutex<Vec<(usize, Step)>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: usize, step: Step) {
        self.log.lock().expect("journal lock").push((key, step));
    }

    pub fn log(&self) -> Vec<(usize, Step)> {
        self.log.lock().expect("journal lock").clone()
    }

    pub fn steps(&self, key: usize) -> Vec<Step> {
        self.log()
            .into_iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, step)| step)
            .collect()
    }

    pub fn count(&self, key: usize, step: Step) -> usize {
        self.steps(key).into_iter().filter(|s| *s == step).count()
    }

    pub fn last(&self, key: usize) -> Option<Step> {
        self.steps(key).last().copied()
    }

    /// Waits until `key` has recorded `step` at least once.
    pub async fn expect(&self, key: usize, step: Step) {
        self.expect_count(key, step, 1).await;
    }

    /// Waits until `key` has recorded `step` at least `n` times.
    pub async fn expect_count(&self, key: usize, step: Step, n: usize) {
        let journal = self.clone();
        eventually(move || {
            let journal = journal.clone();
            async move { journal.count(key, step) >= n }
        })
        .await;
    }

    /// Panics unless start/stop strictly alternate for `key`, starting with start.
    pub fn assert_alternates(&self, key: usize) {
        let transitions: Vec<Step> = self
            .steps(key)
            .into_iter()
            .filter(|s| *s != Step::Operation)
            .collect();
        for (i, step) in transitions.iter().enumerate() {
            let want = if i % 2 == 0 { Step::Start } else { Step::Stop };
            assert_eq!(*step, want, "replica {key}: transitions {transitions:?}");
        }
    }

    /// Panics if two keys were ever active at the same time.
    pub fn assert_single_active(&self) {
        let mut active: Option<usize> = None;
        for (key, step) in self.log() {
            match step {
                Step::Start => {
                    assert_eq!(active, None, "replica {key} started while {active:?} active");
                    active = Some(key);
                }
                Step::Operation => {
                    assert_eq!(active, Some(key), "mixed operations from different replicas");
                }
                Step::Stop => {
                    assert_eq!(active, Some(key), "replica {key} stopped while not active");
                    active = None;
                }
            }
        }
    }
}

/// Worker that records `Start`, an `Operation` every few milliseconds until
/// stopped, then `Stop`.
pub fn ticking_worker(journal: &Journal, key: usize) -> WorkerFactory {
    let journal = journal.clone();
    WorkerFn::factory(move |stop: CancellationToken| {
        let journal = journal.clone();
        async move {
            journal.record(key, Step::Start);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = tokio::time::sleep(Duration::from_millis(5)) => journal.record(key, Step::Operation),
                }
            }
            journal.record(key, Step::Stop);
            Ok(())
        }
    })
}

/// Polls `check` until it returns true; panics after a few seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let waited = tokio::time::timeout(EXPECT_TIMEOUT, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within {EXPECT_TIMEOUT:?}");
}

/// Routes `tracing` output to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
