//! Review decisions
//!
//! Approval computes every effect on copies of the learner and assignment,
//! then hands both to the store in a single commit. A failure anywhere
//! before or during that commit leaves stored state untouched.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::Tracker;
use crate::error::{Missing, Result, TrackerError};
use crate::model::{Assignment, AssignmentId, AssignmentStatus, Learner, TaskRef};
use crate::notify::LearnerNotice;

/// What an approval did to the learner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewResult {
    pub assignment: Assignment,
    pub reward: u32,
    pub reputation: u32,
    pub rank: String,
    pub rank_changed: bool,
    pub progress: f64,
}

impl Tracker {
    pub async fn approve(&self, assignment_id: AssignmentId) -> Result<ReviewResult> {
        let learner_id = self.locate(assignment_id).await?.learner_id;
        let guard = self.locks.acquire(learner_id).await;

        // Re-read under the guard; a concurrent decision may have landed
        let assignment = self.require_pending(assignment_id).await?;
        let learner = self.require_learner(learner_id).await?;

        let reward = self.reward_for(assignment.item).await?;

        let mut updated = learner.clone();
        updated.record_completion(assignment.item);
        updated.reputation = updated.reputation.saturating_add(reward);
        updated.rank = self.ranks.evaluate(updated.reputation).to_string();
        updated.progress = self.course_progress(&updated).await?;
        let rank_changed = updated.rank != learner.rank;

        let decided = assignment.decided(AssignmentStatus::Approved, Utc::now());

        match self.store.commit_approval(&updated, &decided).await {
            Ok(()) => {}
            Err(fret_common::Error::Conflict(_)) => {
                return Err(self.decided_elsewhere(assignment_id).await)
            }
            Err(e) => return Err(e.into()),
        }
        drop(guard);

        info!(
            "Approved assignment {} for learner {}: +{} → {} ({})",
            assignment_id, learner_id, reward, updated.reputation, updated.rank
        );
        if rank_changed {
            info!(
                "Learner {} promoted from {} to {}",
                learner_id, learner.rank, updated.rank
            );
        }

        let result = ReviewResult {
            assignment: decided,
            reward,
            reputation: updated.reputation,
            rank: updated.rank,
            rank_changed,
            progress: updated.progress,
        };

        let notice = LearnerNotice::Approved {
            assignment_id,
            reward,
            reputation: result.reputation,
            rank: result.rank.clone(),
            rank_changed,
            progress: result.progress,
        };
        if let Err(e) = self.notifier.notify_learner(learner_id, &notice).await {
            warn!("Learner {} not notified of approval: {}", learner_id, e);
        }

        Ok(result)
    }

    /// Mark a pending assignment rejected
    ///
    /// The learner is left as is: the active task stays and may be
    /// resubmitted.
    pub async fn reject(&self, assignment_id: AssignmentId) -> Result<Assignment> {
        let learner_id = self.locate(assignment_id).await?.learner_id;
        let guard = self.locks.acquire(learner_id).await;

        let assignment = self.require_pending(assignment_id).await?;
        let now = Utc::now();
        let decided = assignment.decided(AssignmentStatus::Rejected, now);

        match self
            .store
            .record_decision(assignment_id, decided.status, now)
            .await
        {
            Ok(()) => {}
            Err(fret_common::Error::Conflict(_)) => {
                return Err(self.decided_elsewhere(assignment_id).await)
            }
            Err(e) => return Err(e.into()),
        }
        drop(guard);

        info!(
            "Rejected assignment {} for learner {}",
            assignment_id, learner_id
        );

        let notice = LearnerNotice::Rejected { assignment_id };
        if let Err(e) = self.notifier.notify_learner(learner_id, &notice).await {
            warn!("Learner {} not notified of rejection: {}", learner_id, e);
        }

        Ok(decided)
    }

    async fn locate(&self, assignment_id: AssignmentId) -> Result<Assignment> {
        self.store
            .load_assignment(assignment_id)
            .await?
            .ok_or(TrackerError::NotFound(Missing::Assignment(assignment_id)))
    }

    async fn require_pending(&self, assignment_id: AssignmentId) -> Result<Assignment> {
        let assignment = self.locate(assignment_id).await?;
        if !assignment.is_pending() {
            return Err(TrackerError::AlreadyDecided {
                assignment_id,
                status: assignment.status,
            });
        }
        Ok(assignment)
    }

    /// Error for a guarded write that found the assignment already decided
    async fn decided_elsewhere(&self, assignment_id: AssignmentId) -> TrackerError {
        match self.locate(assignment_id).await {
            Ok(assignment) => TrackerError::AlreadyDecided {
                assignment_id,
                status: assignment.status,
            },
            Err(e) => e,
        }
    }

    /// Reputation for completing an item
    ///
    /// A lesson whose title contains the final-lesson marker (any case) pays
    /// the final reward. A lesson missing from the catalog pays the standard
    /// lesson reward.
    async fn reward_for(&self, item: TaskRef) -> Result<u32> {
        let progression = &self.progression;
        match item {
            TaskRef::Song(_) => Ok(progression.song_reward),
            TaskRef::Lesson(id) => match self.catalog.get_lesson(id).await? {
                Some(lesson) => {
                    let marker = progression.final_lesson_marker.to_lowercase();
                    if lesson.title.to_lowercase().contains(&marker) {
                        Ok(progression.final_lesson_reward)
                    } else {
                        Ok(progression.lesson_reward)
                    }
                }
                None => {
                    warn!(
                        "Lesson {} missing from catalog; paying standard reward",
                        id
                    );
                    Ok(progression.lesson_reward)
                }
            },
        }
    }

    /// Percentage of the learner's current course completed
    async fn course_progress(&self, learner: &Learner) -> Result<f64> {
        let lessons = self.catalog.list_lessons(learner.course).await?;
        if lessons.is_empty() {
            return Ok(0.0);
        }

        let done = lessons
            .iter()
            .filter(|l| learner.completed_lessons.contains(&l.id))
            .count();

        Ok(done as f64 / lessons.len() as f64 * 100.0)
    }
}
