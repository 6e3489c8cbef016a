//! Probe manager: deduplicated background retry loops.
//!
//! The `Manager` accepts offers to probe a target. At most one loop runs
//! per key; a second offer for a key already in flight is rejected. Each
//! accepted offer gets a background task that probes immediately, then
//! every `interval`, until a probe passes, the `timeout` elapses, or its
//! cancellation token fires. The outcome is delivered to the callback
//! exactly once, after which the key is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ProbeError, ProbeResult};
use crate::options::Expectations;
use crate::probe::probe;
use crate::transport::{HttpTransport, Transport};

/// Callback invoked once per accepted offer with the offer's argument
/// and the terminal outcome.
pub type ProbeCallback<A> = Arc<dyn Fn(A, ProbeResult<()>) + Send + Sync>;

/// In-flight keys and the tokens that stop their loops.
type Registry = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// Retry cadence for one offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSchedule {
    /// Pause between the end of one attempt and the start of the next.
    pub interval: Duration,
    /// Total budget, measured from the first attempt.
    pub timeout: Duration,
}

impl ProbeSchedule {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Removes a key from the registry when its loop exits, however it exits.
struct EntryGuard {
    registry: Registry,
    key: String,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.remove(&self.key);
        }
    }
}

/// Runs deduplicated probe loops and reports their outcomes.
///
/// Dropping the manager cancels every loop still in flight; their
/// callbacks fire with [`ProbeError::Cancelled`].
pub struct Manager<A, T = HttpTransport> {
    transport: Arc<T>,
    callback: ProbeCallback<A>,
    registry: Registry,
}

impl<A, T> Manager<A, T>
where
    A: Send + 'static,
    T: Transport + 'static,
{
    /// Create a manager bound to one callback and one transport.
    pub fn new(callback: impl Fn(A, ProbeResult<()>) + Send + Sync + 'static, transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            callback: Arc::new(callback),
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start probing `target` unless a loop for it is already running.
    ///
    /// Returns `false` without side effects if `target` is in flight.
    /// Otherwise spawns the loop on the current tokio runtime and
    /// returns `true` immediately. The loop stops early when `cancel`
    /// (or any of its parents) is cancelled.
    pub fn offer(
        &self,
        cancel: &CancellationToken,
        target: &str,
        arg: A,
        schedule: ProbeSchedule,
        expectations: Expectations,
    ) -> bool {
        let token = {
            let mut registry = self.registry.lock().expect("registry lock");
            if registry.contains_key(target) {
                debug!(%target, "probe already in flight, offer rejected");
                return false;
            }
            let token = cancel.child_token();
            registry.insert(target.to_string(), token.clone());
            token
        };

        let guard = EntryGuard {
            registry: Arc::clone(&self.registry),
            key: target.to_string(),
        };
        let transport = Arc::clone(&self.transport);
        let callback = Arc::clone(&self.callback);
        let target = target.to_string();

        debug!(
            %target,
            interval = ?schedule.interval,
            timeout = ?schedule.timeout,
            "probe offer accepted"
        );

        tokio::spawn(async move {
            // Released only after the callback returns.
            let _guard = guard;
            let outcome =
                run_probe_loop(transport.as_ref(), &target, &expectations, schedule, &token).await;
            callback(arg, outcome);
        });

        true
    }
}

impl<A, T> Manager<A, T> {
    /// Cancel the loop for `key`. Returns `false` if nothing was in flight.
    ///
    /// The loop still releases its own entry and reports
    /// [`ProbeError::Cancelled`] to the callback.
    pub fn cancel(&self, key: &str) -> bool {
        let registry = self.registry.lock().expect("registry lock");
        match registry.get(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every loop in flight.
    pub fn cancel_all(&self) {
        let registry = self.registry.lock().expect("registry lock");
        for token in registry.values() {
            token.cancel();
        }
    }

    /// Number of keys with a loop in flight.
    pub fn len(&self) -> usize {
        self.registry.lock().expect("registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a loop for `key` is in flight.
    pub fn is_probing(&self, key: &str) -> bool {
        self.registry
            .lock()
            .expect("registry lock")
            .contains_key(key)
    }

    /// Keys with a loop in flight, sorted.
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .registry
            .lock()
            .expect("registry lock")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl<A, T> Drop for Manager<A, T> {
    fn drop(&mut self) {
        if let Ok(registry) = self.registry.lock() {
            for token in registry.values() {
                token.cancel();
            }
        }
    }
}

/// Probe `target` until it passes, the deadline elapses, or `cancel` fires.
async fn run_probe_loop<T: Transport>(
    transport: &T,
    target: &str,
    expectations: &Expectations,
    schedule: ProbeSchedule,
    cancel: &CancellationToken,
) -> ProbeResult<()> {
    // A timeout too large to represent never elapses.
    let deadline = Instant::now().checked_add(schedule.timeout);
    let mut attempts: u32 = 0;
    let mut last_error: Option<ProbeError> = None;

    loop {
        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(target, attempts)),
            result = probe(transport, target, expectations) => result,
            _ = expire(deadline) => {
                return Err(timed_out(target, schedule.timeout, attempts, last_error));
            }
        };
        attempts += 1;

        match attempt {
            Ok(()) => {
                debug!(%target, attempts, "probe target ready");
                return Ok(());
            }
            Err(e) => {
                debug!(%target, attempts, error = %e, "probe attempt failed, will retry");
                last_error = Some(e);
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled(target, attempts)),
            _ = expire(deadline) => {
                return Err(timed_out(target, schedule.timeout, attempts, last_error));
            }
            _ = sleep(schedule.interval) => {}
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn cancelled(target: &str, attempts: u32) -> ProbeError {
    debug!(%target, attempts, "probe loop cancelled");
    ProbeError::Cancelled { attempts }
}

fn timed_out(
    target: &str,
    timeout: Duration,
    attempts: u32,
    last_error: Option<ProbeError>,
) -> ProbeError {
    match &last_error {
        Some(e) => warn!(%target, attempts, ?timeout, error = %e, "probe timed out"),
        None => warn!(%target, attempts, ?timeout, "probe timed out"),
    }
    ProbeError::Timeout {
        timeout,
        attempts,
        last_error: last_error.map(Box::new),
    }
}
