//! Progress and review state machine
//!
//! `Tracker` owns the stores, the notifier and the rank table. Operations
//! are split by concern:
//! - `assign`: handing out the next lesson or a chosen song
//! - `submit`: queueing the active task for review
//! - `review`: approve / reject decisions
//! - `learners`: registration, profile and reviewer bootstrap

use std::sync::Arc;

use fret_common::config::ProgressionConfig;
use tracing::warn;

use crate::error::{Result, TrackerError};
use crate::locks::LearnerLocks;
use crate::model::{Learner, LearnerId, TaskRef};
use crate::notify::Notifier;
use crate::ranks::RankTable;
use crate::store::{CatalogStore, ProgressStore};

mod assign;
mod learners;
mod review;
mod submit;

pub use assign::NextLesson;
pub use learners::{Profile, REVIEWER_REPUTATION};
pub use review::ReviewResult;

pub struct Tracker {
    catalog: Arc<dyn CatalogStore>,
    store: Arc<dyn ProgressStore>,
    notifier: Arc<dyn Notifier>,
    progression: ProgressionConfig,
    ranks: RankTable,
    locks: LearnerLocks,
}

impl Tracker {
    /// Build a tracker; fails if the configured rank table is unusable
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        store: Arc<dyn ProgressStore>,
        notifier: Arc<dyn Notifier>,
        progression: ProgressionConfig,
    ) -> fret_common::Result<Self> {
        progression.validate()?;
        let ranks = RankTable::from_tiers(&progression.ranks)?;

        Ok(Self {
            catalog,
            store,
            notifier,
            progression,
            ranks,
            locks: LearnerLocks::new(),
        })
    }

    pub fn ranks(&self) -> &RankTable {
        &self.ranks
    }

    pub fn progression(&self) -> &ProgressionConfig {
        &self.progression
    }

    pub fn catalog(&self) -> &dyn CatalogStore {
        self.catalog.as_ref()
    }

    async fn require_learner(&self, learner_id: LearnerId) -> Result<Learner> {
        self.store
            .load_learner(learner_id)
            .await?
            .ok_or(TrackerError::LearnerNotFound(learner_id))
    }

    /// Title of a lesson or song, empty when it cannot be looked up
    async fn item_title(&self, item: TaskRef) -> String {
        let title = match item {
            TaskRef::Lesson(id) => self
                .catalog
                .get_lesson(id)
                .await
                .map(|l| l.map(|l| l.title)),
            TaskRef::Song(id) => self.catalog.get_song(id).await.map(|s| s.map(|s| s.title)),
        };

        match title {
            Ok(Some(title)) => title,
            Ok(None) => {
                warn!("Catalog has no entry for {}", item);
                String::new()
            }
            Err(e) => {
                warn!("Catalog lookup for {} failed: {}", item, e);
                String::new()
            }
        }
    }
}

/// The learner must not hold any task
fn require_free_slot(learner: &Learner) -> Result<()> {
    match learner.active_task {
        Some(active) => Err(TrackerError::TaskConflict {
            learner_id: learner.id,
            active,
        }),
        None => Ok(()),
    }
}

/// The learner must hold a task; returns it
fn require_active_task(learner: &Learner) -> Result<TaskRef> {
    learner
        .active_task
        .ok_or(TrackerError::NoActiveTask(learner.id))
}
