//! Per-learner mutual exclusion
//!
//! Every mutating operation holds its learner's guard across the whole
//! check-then-write sequence. Different learners never block each other.
//! An entry lives only while some task holds or waits for it, so ids that
//! are looked up once do not accumulate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::LearnerId;

type LockMap = HashMap<LearnerId, Arc<Mutex<()>>>;

#[derive(Clone, Default)]
pub struct LearnerLocks {
    // Only touched in short non-async sections
    locks: Arc<StdMutex<LockMap>>,
}

/// Exclusive access to one learner, released on drop
pub struct LearnerGuard {
    learner_id: LearnerId,
    locks: Arc<StdMutex<LockMap>>,
    _guard: OwnedMutexGuard<()>,
}

impl LearnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one learner
    pub async fn acquire(&self, learner_id: LearnerId) -> LearnerGuard {
        let lock = lock_map(&self.locks).entry(learner_id).or_default().clone();
        let guard = lock.lock_owned().await;

        LearnerGuard {
            learner_id,
            locks: Arc::clone(&self.locks),
            _guard: guard,
        }
    }

    /// Number of learners currently held or waited on
    pub fn tracked(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

impl Drop for LearnerGuard {
    fn drop(&mut self) {
        let mut locks = lock_map(&self.locks);
        // The map and this guard hold the only references: nobody is waiting.
        // Waiters clone under the map lock, so the count cannot rise meanwhile.
        let idle = locks
            .get(&self.learner_id)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2);
        if idle {
            locks.remove(&self.learner_id);
        }
    }
}

fn lock_map(locks: &StdMutex<LockMap>) -> MutexGuard<'_, LockMap> {
    // A panic while holding the map lock cannot leave the map inconsistent
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
