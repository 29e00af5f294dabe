//! Learner registration and profile

use serde::Serialize;
use tracing::info;

use super::Tracker;
use crate::error::Result;
use crate::model::{CourseId, Learner, LearnerId, LearnerSummary, TaskRef};

/// Reputation the reviewer account is bootstrapped with
pub const REVIEWER_REPUTATION: u32 = 1000;

/// Learner state as shown by the profile view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub summary: LearnerSummary,
    pub course: CourseId,
    pub progress: f64,
    pub active_task: Option<TaskRef>,
    /// Title of the active lesson or song
    pub active_title: Option<String>,
    pub completed_lessons: usize,
    pub completed_songs: usize,
    pub course_lessons: u32,
    pub graduated: bool,
}

impl Tracker {
    /// Get-or-create on first contact
    ///
    /// An existing learner is returned unchanged.
    pub async fn register(
        &self,
        learner_id: LearnerId,
        username: Option<String>,
        display_name: &str,
    ) -> Result<Learner> {
        let _guard = self.locks.acquire(learner_id).await;

        if let Some(existing) = self.store.load_learner(learner_id).await? {
            return Ok(existing);
        }

        let learner = Learner::new(
            learner_id,
            username,
            display_name,
            self.ranks.default_rank(),
        );
        self.store.save_learner(&learner).await?;

        info!("Registered learner {} ({})", learner_id, learner.display_name);
        Ok(learner)
    }

    pub async fn profile(&self, learner_id: LearnerId) -> Result<Profile> {
        let learner = self.require_learner(learner_id).await?;

        let active_title = match learner.active_task {
            Some(item) => Some(self.item_title(item).await),
            None => None,
        };
        let course_lessons = self.catalog.count_lessons(learner.course).await?;

        Ok(Profile {
            summary: learner.summary(),
            course: learner.course,
            progress: learner.progress,
            active_task: learner.active_task,
            active_title,
            completed_lessons: learner.completed_lessons.len(),
            completed_songs: learner.completed_songs.len(),
            course_lessons,
            graduated: learner.graduated,
        })
    }

    /// Make sure the reviewer has a graduated account with full reputation
    ///
    /// Runs at startup. Reputation already above the floor is kept.
    pub async fn seed_reviewer(&self, reviewer_id: LearnerId, display_name: &str) -> Result<Learner> {
        let _guard = self.locks.acquire(reviewer_id).await;

        let mut reviewer = match self.store.load_learner(reviewer_id).await? {
            Some(existing) => existing,
            None => Learner::new(reviewer_id, None, display_name, self.ranks.default_rank()),
        };

        reviewer.reputation = reviewer.reputation.max(REVIEWER_REPUTATION);
        reviewer.rank = self.ranks.evaluate(reviewer.reputation).to_string();
        reviewer.graduated = true;
        self.store.save_learner(&reviewer).await?;

        info!(
            "Reviewer account {} ready ({}, {})",
            reviewer_id, reviewer.reputation, reviewer.rank
        );
        Ok(reviewer)
    }
}
