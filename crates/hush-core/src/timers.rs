use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

/// Identifies a scheduled task within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Drops the typing flag once the quiet window passes. At most one.
    PresenceDecay,
    /// One scripted reply per simulated outgoing message.
    SimulatedReply(u64),
}

/// Delayed callbacks owned by one session.
///
/// Every task lives in a `JoinSet`, so `cancel_all` (or dropping the last
/// handle) aborts whatever is still pending. Scheduling under a key that is
/// already pending replaces the earlier task.
#[derive(Clone)]
pub struct TimerArena {
    inner: Arc<Mutex<ArenaInner>>,
}

struct ArenaInner {
    session_id: Uuid,
    tasks: JoinSet<()>,
    keyed: HashMap<TimerKey, AbortHandle>,
    next_seq: u64,
    cancelled: bool,
}

impl TimerArena {
    pub fn new(session_id: Uuid) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ArenaInner {
                session_id,
                tasks: JoinSet::new(),
                keyed: HashMap::new(),
                next_seq: 0,
                cancelled: false,
            })),
        }
    }

    /// Fresh sequence number for keys that must not collide.
    pub fn next_seq(&self) -> u64 {
        let mut inner = self.inner.lock().expect("timer arena lock poisoned");
        let seq = inner.next_seq;
        inner.next_seq += 1;
        seq
    }

    /// Run `f` once `delay` has elapsed, measured from this call.
    /// Returns false (and drops `f`) if the arena was already cancelled.
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, key: TimerKey, delay: Duration, f: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let mut inner = self.inner.lock().expect("timer arena lock poisoned");

        if inner.cancelled {
            debug!(
                "session {}: not scheduling {:?}, timers cancelled",
                inner.session_id, key
            );
            return false;
        }

        // Reap finished tasks so long sessions don't accumulate them
        while inner.tasks.try_join_next().is_some() {}
        inner.keyed.retain(|_, handle| !handle.is_finished());

        let handle = inner.tasks.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            f();
        });

        if let Some(previous) = inner.keyed.insert(key, handle) {
            previous.abort();
            trace!("session {}: rescheduled {:?}", inner.session_id, key);
        }
        true
    }

    /// Abort one pending task. Returns true if it was still pending.
    pub fn cancel(&self, key: TimerKey) -> bool {
        let mut inner = self.inner.lock().expect("timer arena lock poisoned");
        match inner.keyed.remove(&key) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    /// Abort everything and refuse new work.
    pub fn cancel_all(&self) {
        let mut inner = self.inner.lock().expect("timer arena lock poisoned");
        if inner.cancelled {
            return;
        }
        inner.cancelled = true;
        let pending = inner
            .keyed
            .values()
            .filter(|handle| !handle.is_finished())
            .count();
        inner.keyed.clear();
        inner.tasks.abort_all();
        debug!(
            "session {}: cancelled {} pending timer(s)",
            inner.session_id, pending
        );
    }

    /// Number of tasks that have not fired yet.
    pub fn pending(&self) -> usize {
        let inner = self.inner.lock().expect("timer arena lock poisoned");
        inner
            .keyed
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner
            .lock()
            .expect("timer arena lock poisoned")
            .cancelled
    }
}
