//! Host-driven timers
//!
//! Nothing in fieldkit spawns threads or sleeps. Components arm named
//! deadlines on a [`TimerQueue`] and the host drains whatever is due from its
//! own event loop. Arming a key that is already armed replaces its deadline,
//! which is exactly debounce semantics.
//!
//! Time comes from a [`Clock`] so tests can drive it by hand with
//! [`ManualClock`].

use smallvec::SmallVec;
use std::cell::Cell;
use std::fmt::Debug;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// A source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The real monotonic clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to the component under test.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Keyed one-shot deadlines
#[derive(Debug)]
pub struct TimerQueue<K> {
    deadlines: SmallVec<[(K, Instant); 4]>,
}

impl<K: Copy + Eq + Debug> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            deadlines: SmallVec::new(),
        }
    }

    /// Arm `key` to fire at `deadline`, replacing any earlier arming
    pub fn arm(&mut self, key: K, deadline: Instant) {
        self.cancel(key);
        self.deadlines.push((key, deadline));
        tracing::trace!(?key, "timer armed");
    }

    /// Disarm `key`. Returns whether it was armed.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.deadlines.len();
        self.deadlines.retain(|(k, _)| *k != key);
        before != self.deadlines.len()
    }

    pub fn is_armed(&self, key: K) -> bool {
        self.deadlines.iter().any(|(k, _)| *k == key)
    }

    /// The earliest armed deadline, so hosts know when to call back
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.iter().map(|(_, at)| *at).min()
    }

    /// Remove and return every key due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> SmallVec<[K; 4]> {
        let mut due: SmallVec<[(K, Instant); 4]> = SmallVec::new();
        self.deadlines.retain(|(key, at)| {
            if *at <= now {
                due.push((*key, *at));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(_, at)| *at);
        due.into_iter().map(|(key, _)| key).collect()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}

impl<K: Copy + Eq + Debug> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
