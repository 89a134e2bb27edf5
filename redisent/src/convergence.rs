//! Convergence polling.
//!
//! After a mutating request the control plane moves the database through
//! transient statuses. [`Poller::await_status`] re-fetches the database on
//! a fixed interval until it reaches a target status, leaves the expected
//! path, or the operation timeout elapses.
//!
//! Time is read and spent through a [`Clock`], so tests drive the loop with
//! a [`ManualClock`] instead of sleeping.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redisent_client::{Database, DatabaseStatus};
use tracing::{debug, info, warn};

use crate::error::{ResourceError, Result};

/// Source of elapsed time and sleeps for the poller.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    async fn sleep(&self, duration: Duration);
}

/// Clock backed by tokio's timer. Honours paused test time.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when slept on or advanced explicitly.
#[derive(Debug, Default)]
pub struct ManualClock {
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(|e| e.into_inner());
        *elapsed += duration;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Anything that reports a control-plane status.
pub trait HasStatus {
    fn status(&self) -> &DatabaseStatus;
}

impl HasStatus for Database {
    fn status(&self) -> &DatabaseStatus {
        &self.status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => f.write_str("creation"),
            OperationKind::Update => f.write_str("update"),
            OperationKind::Delete => f.write_str("deletion"),
        }
    }
}

/// The convergence wait of one in-flight mutating call.
///
/// An empty `target` means the database is expected to disappear.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub kind: OperationKind,
    pub uid: u32,
    pub pending: Vec<DatabaseStatus>,
    pub target: Vec<DatabaseStatus>,
    pub timeout: Duration,
}

impl PendingOperation {
    pub fn create(uid: u32, timeout: Duration) -> Self {
        Self {
            kind: OperationKind::Create,
            uid,
            pending: vec![DatabaseStatus::Pending],
            target: vec![DatabaseStatus::Active],
            timeout,
        }
    }

    pub fn update(uid: u32, timeout: Duration) -> Self {
        Self {
            kind: OperationKind::Update,
            uid,
            pending: vec![DatabaseStatus::ActiveChangePending],
            target: vec![DatabaseStatus::Active],
            timeout,
        }
    }

    pub fn delete(uid: u32, timeout: Duration) -> Self {
        Self {
            kind: OperationKind::Delete,
            uid,
            pending: vec![DatabaseStatus::DeletePending],
            target: Vec::new(),
            timeout,
        }
    }
}

/// Fixed-interval status poller.
#[derive(Clone)]
pub struct Poller {
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl Poller {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);
    const MIN_INTERVAL: Duration = Duration::from_millis(10);

    pub fn new(clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            clock,
            interval: interval.max(Self::MIN_INTERVAL),
        }
    }

    /// Poll `fetch` until the operation converges.
    ///
    /// `fetch` returns `Ok(None)` when the database does not exist. Fetch
    /// errors are returned as-is on the first occurrence; only pending
    /// statuses are retried. On success the last observation is returned
    /// (`None` for a converged deletion).
    pub async fn await_status<T, F, Fut>(
        &self,
        op: &PendingOperation,
        mut fetch: F,
    ) -> Result<Option<T>>
    where
        T: HasStatus,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let start = self.clock.now();
        let mut polls = 0u32;

        loop {
            polls += 1;
            let observed = fetch().await?;

            let status = match &observed {
                Some(obj) => obj.status().clone(),
                None if op.target.is_empty() => {
                    info!(
                        "Database {} {} converged: gone after {} polls",
                        op.uid, op.kind, polls
                    );
                    return Ok(None);
                }
                None => {
                    warn!("Database {} disappeared while awaiting {}", op.uid, op.kind);
                    return Err(ResourceError::UnexpectedState {
                        uid: op.uid,
                        status: "<absent>".to_string(),
                        target: op.target.clone(),
                    });
                }
            };

            if op.target.contains(&status) {
                info!(
                    "Database {} {} converged: {} after {} polls",
                    op.uid, op.kind, status, polls
                );
                return Ok(observed);
            }

            if !op.pending.contains(&status) {
                warn!(
                    "Database {} in unexpected state '{}' during {}",
                    op.uid, status, op.kind
                );
                return Err(ResourceError::UnexpectedState {
                    uid: op.uid,
                    status: status.to_string(),
                    target: op.target.clone(),
                });
            }

            let elapsed = self.clock.now().saturating_sub(start);
            if elapsed >= op.timeout {
                return Err(ResourceError::Timeout {
                    uid: op.uid,
                    last_status: status.to_string(),
                    target: op.target.clone(),
                    timeout: op.timeout,
                });
            }

            let wait = self.interval.min(op.timeout - elapsed);
            debug!(
                "Database {} still '{}' ({:?} elapsed), next poll in {:?}",
                op.uid, status, elapsed, wait
            );
            self.clock.sleep(wait).await;
        }
    }
}
