//! Outbound notifications to the reviewer and to learners
//!
//! Delivery is best-effort: the tracker logs failures and moves on.

use async_trait::async_trait;
use chrono::Utc;
use fret_common::events::{EventBus, TrackerEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Assignment, AssignmentId, LearnerId, LearnerSummary};

/// Message for a learner after a review decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum LearnerNotice {
    Approved {
        assignment_id: AssignmentId,
        reward: u32,
        reputation: u32,
        rank: String,
        rank_changed: bool,
        progress: f64,
    },
    Rejected {
        assignment_id: AssignmentId,
    },
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("no listeners connected")]
    NoListeners,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell the reviewer a submission is waiting
    async fn notify_reviewer(
        &self,
        assignment: &Assignment,
        learner: &LearnerSummary,
        item_title: &str,
    ) -> Result<(), NotifyError>;

    async fn notify_learner(
        &self,
        learner_id: LearnerId,
        notice: &LearnerNotice,
    ) -> Result<(), NotifyError>;
}

/// Publishes notifications as `TrackerEvent`s for SSE subscribers
#[derive(Clone)]
pub struct EventNotifier {
    bus: EventBus,
}

impl EventNotifier {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    fn publish(&self, event: TrackerEvent) -> Result<(), NotifyError> {
        self.bus
            .emit(event)
            .map(|_| ())
            .map_err(|_| NotifyError::NoListeners)
    }
}

#[async_trait]
impl Notifier for EventNotifier {
    async fn notify_reviewer(
        &self,
        assignment: &Assignment,
        learner: &LearnerSummary,
        item_title: &str,
    ) -> Result<(), NotifyError> {
        self.publish(TrackerEvent::ReviewRequested {
            assignment_id: assignment.id.0,
            learner_id: learner.id.0,
            username: learner.username.clone(),
            display_name: learner.display_name.clone(),
            kind: assignment.item.kind(),
            item_id: assignment.item.item_id(),
            item_title: item_title.to_string(),
            timestamp: Utc::now(),
        })
    }

    async fn notify_learner(
        &self,
        learner_id: LearnerId,
        notice: &LearnerNotice,
    ) -> Result<(), NotifyError> {
        let event = match notice {
            LearnerNotice::Approved {
                assignment_id,
                reward,
                reputation,
                rank,
                rank_changed,
                progress,
            } => TrackerEvent::SubmissionApproved {
                assignment_id: assignment_id.0,
                learner_id: learner_id.0,
                reward: *reward,
                reputation: *reputation,
                rank: rank.clone(),
                rank_changed: *rank_changed,
                progress: *progress,
                timestamp: Utc::now(),
            },
            LearnerNotice::Rejected { assignment_id } => TrackerEvent::SubmissionRejected {
                assignment_id: assignment_id.0,
                learner_id: learner_id.0,
                timestamp: Utc::now(),
            },
        };

        self.publish(event)
    }
}
