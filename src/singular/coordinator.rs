//! # Singular: run workers only while this replica holds mastership.
//!
//! [`Singular`] wraps a [`Runner`] and a [`Conn`]. Callers register workers on
//! it exactly as they would on the runner itself; a poll loop decides once
//! per interval whether this replica is master and starts or stops the
//! registered workers in the underlying runner accordingly.
//!
//! ## Architecture
//! ```text
//! start_worker / stop_worker / snapshot
//!        │  Command + oneshot reply
//!        ▼
//!   ┌─────────────── poll loop (one task, owns CoordinatorState) ──────────────┐
//!   │ select! (biased)                                                          │
//!   │   kill token           → exit                                             │
//!   │   runner.wait()        → exit with its error (or SupervisorStopped)       │
//!   │   command              → register / deregister / snapshot                 │
//!   │   tick                 → ping ── Err → exit(ConnectionLost)               │
//!   │                          is_master ── Err → warn, keep state              │
//!   │                                     ├─ true,  not Master → start_all      │
//!   │                                     └─ false, not NotMaster → stop_all    │
//!   │ on exit: stop_all, terminated = true                                      │
//!   └───────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//! - Only the poll loop touches the state, so registrations apply in issue
//!   order and never interleave with a transition.
//! - Each stop returns only after the worker has exited; for any id starts and
//!   stops strictly alternate.
//! - Connection loss is fatal; a failed mastership query is not.
//! - A panic in the oracle or the runner ends the loop with
//!   [`RuntimeError::Panicked`]; the registered workers are still stopped.
//! - The wrapped runner is never killed by the coordinator. Its owner does that.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    core::panic_message,
    error::RuntimeError,
    runner::Runner,
    singular::{
        config::SingularConfig,
        conn::Conn,
        state::{CoordinatorState, Mastership},
    },
    workers::WorkerFactory,
};

enum Command {
    Start {
        id: String,
        factory: WorkerFactory,
        reply: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Stop {
        id: String,
        reply: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Snapshot {
        reply: oneshot::Sender<CoordinatorState>,
    },
}

/// Mastership-gated runner.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use fleetvisor::{
///     Conn, ConnError, ConnectionIsFatal, Runner, Singular, SingularConfig, Supervisor,
///     SupervisorConfig, WorkerError, WorkerFn,
/// };
///
/// struct AlwaysMaster;
///
/// #[async_trait]
/// impl Conn for AlwaysMaster {
///     async fn ping(&self) -> Result<(), ConnError> { Ok(()) }
///     async fn is_master(&self) -> Result<bool, ConnError> { Ok(true) }
/// }
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let conn: Arc<dyn Conn> = Arc::new(AlwaysMaster);
///     let sup = Supervisor::builder(SupervisorConfig::default())
///         .with_fatal_policy(Arc::new(ConnectionIsFatal::new(Arc::clone(&conn))))
///         .build();
///
///     let cfg = SingularConfig { poll_interval: Duration::from_millis(50), ..Default::default() };
///     let singular = Singular::new(sup.clone(), conn, cfg).await?;
///     singular.start_worker("janitor", WorkerFn::factory(|stop: CancellationToken| async move {
///         stop.cancelled().await;
///         Ok::<(), WorkerError>(())
///     })).await?;
///
///     singular.kill();
///     singular.wait().await?;
///     sup.kill();
///     sup.wait().await?;
///     Ok(())
/// }
/// ```
pub struct Singular {
    tx: mpsc::Sender<Command>,
    token: CancellationToken,
    done: CancellationToken,
    result: Arc<OnceLock<Result<(), RuntimeError>>>,
    final_state: Arc<OnceLock<CoordinatorState>>,
}

impl Singular {
    /// Binds to a running `supervisor` and a connected oracle, then starts polling.
    ///
    /// Fails with [`RuntimeError::Connect`] if the oracle does not answer `ping`.
    /// Must be called from within a tokio runtime.
    pub async fn new(
        supervisor: Arc<dyn Runner>,
        conn: Arc<dyn Conn>,
        cfg: SingularConfig,
    ) -> Result<Self, RuntimeError> {
        conn.ping()
            .await
            .map_err(|source| RuntimeError::Connect { source })?;

        let (tx, rx) = mpsc::channel(cfg.command_capacity_clamped());
        let token = CancellationToken::new();
        let done = CancellationToken::new();
        let result = Arc::new(OnceLock::new());
        let final_state = Arc::new(OnceLock::new());

        let poll = PollLoop {
            supervisor,
            conn,
            interval: cfg.poll_interval_clamped(),
            token: token.clone(),
            registered: BTreeMap::new(),
            state: CoordinatorState::new(),
        };
        {
            let done = done.clone();
            let result = Arc::clone(&result);
            let final_state = Arc::clone(&final_state);
            tokio::spawn(async move {
                let _done = done.drop_guard();
                let (res, state) = poll.run(rx).await;
                let _ = final_state.set(state);
                let _ = result.set(res);
            });
        }

        Ok(Self {
            tx,
            token,
            done,
            result,
            final_state,
        })
    }

    /// Copy of the coordinator state as the poll loop sees it.
    ///
    /// After termination, returns the final state.
    pub async fn snapshot(&self) -> CoordinatorState {
        if let Some(state) = self.request(|reply| Command::Snapshot { reply }).await {
            return state;
        }
        self.done.cancelled().await;
        self.final_state.get().cloned().unwrap_or_else(|| CoordinatorState {
            terminated: true,
            ..CoordinatorState::new()
        })
    }

    /// True once the poll loop has exited and every worker it started is stopped.
    pub fn is_terminated(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Sends a command to the poll loop. `None` if the loop is gone.
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.ok()?;
        rx.await.ok()
    }
}

#[async_trait]
impl Runner for Singular {
    async fn start_worker(&self, id: &str, factory: WorkerFactory) -> Result<(), RuntimeError> {
        self.request(|reply| Command::Start {
            id: id.to_string(),
            factory,
            reply,
        })
        .await
        .unwrap_or(Err(RuntimeError::Stopped))
    }

    async fn stop_worker(&self, id: &str) -> Result<(), RuntimeError> {
        match self
            .request(|reply| Command::Stop {
                id: id.to_string(),
                reply,
            })
            .await
        {
            Some(res) => res,
            None => {
                // the loop stops every worker before it exits
                self.done.cancelled().await;
                Ok(())
            }
        }
    }

    fn kill(&self) {
        self.token.cancel();
    }

    async fn wait(&self) -> Result<(), RuntimeError> {
        self.done.cancelled().await;
        self.result.get().cloned().unwrap_or(Err(RuntimeError::Stopped))
    }
}

/// State and collaborators owned by the poll-loop task.
struct PollLoop {
    supervisor: Arc<dyn Runner>,
    conn: Arc<dyn Conn>,
    interval: Duration,
    token: CancellationToken,
    registered: BTreeMap<String, WorkerFactory>,
    state: CoordinatorState,
}

impl PollLoop {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
    ) -> (Result<(), RuntimeError>, CoordinatorState) {
        let supervisor = Arc::clone(&self.supervisor);
        let supervisor_done = guarded(supervisor.wait());
        tokio::pin!(supervisor_done);
        let token = self.token.clone();

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let res = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break Ok(()),
                res = &mut supervisor_done => {
                    let res = res.and_then(|r| r);
                    break Err(res.err().unwrap_or(RuntimeError::SupervisorStopped));
                }
                cmd = commands.recv() => match cmd {
                    Some(cmd) => {
                        if let Err(e) = guarded(self.handle(cmd)).await {
                            break Err(e);
                        }
                    }
                    None => break Ok(()),
                },
                _ = ticker.tick() => {
                    let observed = tokio::select! {
                        _ = token.cancelled() => None,
                        observed = guarded(self.query()) => Some(observed.and_then(|o| o)),
                    };
                    match observed {
                        None => break Ok(()),
                        Some(Err(e)) => break Err(e),
                        Some(Ok(Some(master))) => {
                            if let Err(e) = guarded(self.apply(master)).await.and_then(|r| r) {
                                break Err(e);
                            }
                        }
                        Some(Ok(None)) => {}
                    }
                }
            }
        };

        commands.close();
        let mut res = res;
        if matches!(res, Err(RuntimeError::Panicked { .. })) {
            // the panic may have cut a start or a stop short
            let registered: Vec<String> = self.registered.keys().cloned().collect();
            self.state.running.extend(registered);
        }
        if let Err(e) = self.stop_all().await {
            res = res.and(Err(e));
        }
        self.state.terminated = true;

        match &res {
            Ok(()) => info!("singular coordinator stopped"),
            Err(e) => error!(error = %e, label = e.as_label(), "singular coordinator terminated"),
        }
        (res, self.state)
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start { id, factory, reply } => {
                let _ = reply.send(self.register(id, factory).await);
            }
            Command::Stop { id, reply } => {
                let _ = reply.send(self.deregister(&id).await);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.state.clone());
            }
        }
    }

    async fn register(&mut self, id: String, factory: WorkerFactory) -> Result<(), RuntimeError> {
        if self.registered.contains_key(&id) {
            return Err(RuntimeError::DuplicateId { id });
        }
        self.registered.insert(id.clone(), Arc::clone(&factory));

        if self.state.mastership == Mastership::Master {
            if let Err(e) = self.start(&id, factory).await {
                self.registered.remove(&id);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn deregister(&mut self, id: &str) -> Result<(), RuntimeError> {
        self.registered.remove(id);
        if self.state.running.remove(id) {
            info!(worker = %id, "stopping deregistered worker");
            self.supervisor.stop_worker(id).await?;
        }
        Ok(())
    }

    /// Pings the oracle and asks for mastership. `Ok(None)` if the query failed.
    async fn query(&self) -> Result<Option<bool>, RuntimeError> {
        if let Err(source) = self.conn.ping().await {
            error!(error = %source, "mastership oracle unreachable");
            return Err(RuntimeError::ConnectionLost { source });
        }
        match self.conn.is_master().await {
            Ok(master) => Ok(Some(master)),
            Err(e) => {
                warn!(
                    error = %e,
                    label = e.as_label(),
                    mastership = %self.state.mastership,
                    "cannot query mastership, keeping current state"
                );
                Ok(None)
            }
        }
    }

    /// Acts on one mastership answer. Errors only if a stop panicked.
    async fn apply(&mut self, master: bool) -> Result<(), RuntimeError> {
        let next = Mastership::from_query(master);
        if next == self.state.mastership {
            if next == Mastership::Master {
                // starts the runner rejected are retried while master
                self.start_all().await;
            }
            return Ok(());
        }
        info!(from = %self.state.mastership, to = %next, "mastership changed");

        match next {
            Mastership::Master => self.start_all().await,
            Mastership::NotMaster => self.stop_all().await?,
            Mastership::Unknown => {}
        }
        self.state.mastership = next;
        Ok(())
    }

    async fn start(&mut self, id: &str, factory: WorkerFactory) -> Result<(), RuntimeError> {
        self.supervisor.start_worker(id, factory).await?;
        self.state.running.insert(id.to_string());
        debug!(worker = %id, "singleton worker started");
        Ok(())
    }

    /// Starts every registered worker that is not running; stops early on kill.
    async fn start_all(&mut self) {
        let pending: Vec<(String, WorkerFactory)> = self
            .registered
            .iter()
            .filter(|(id, _)| !self.state.running.contains(*id))
            .map(|(id, factory)| (id.clone(), Arc::clone(factory)))
            .collect();

        for (id, factory) in pending {
            if self.token.is_cancelled() {
                return;
            }
            if let Err(e) = self.start(&id, factory).await {
                warn!(worker = %id, error = %e, "cannot start singleton worker");
            }
        }
    }

    /// Stops every running worker, each one to completion.
    ///
    /// A panicking stop does not skip the rest; the first panic is returned.
    async fn stop_all(&mut self) -> Result<(), RuntimeError> {
        let running = std::mem::take(&mut self.state.running);
        let mut panicked = None;
        for id in running {
            match guarded(self.supervisor.stop_worker(&id)).await {
                Ok(Ok(())) => debug!(worker = %id, "singleton worker stopped"),
                Ok(Err(e)) => warn!(worker = %id, error = %e, "cannot stop singleton worker"),
                Err(e) => {
                    panicked.get_or_insert(e);
                }
            }
        }
        panicked.map_or(Ok(()), Err)
    }
}

/// Awaits `fut`, turning a panic into [`RuntimeError::Panicked`].
async fn guarded<T>(fut: impl Future<Output = T>) -> Result<T, RuntimeError> {
    AssertUnwindSafe(fut).catch_unwind().await.map_err(|panic| {
        let reason = panic_message(&*panic);
        error!(%reason, "singular coordinator caught a panic");
        RuntimeError::Panicked { reason }
    })
}
