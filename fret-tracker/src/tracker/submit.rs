//! Submission and the reviewer queue

use tracing::{debug, info, warn};

use super::{require_active_task, Tracker};
use crate::error::{Result, TrackerError};
use crate::model::{Assignment, LearnerId};

impl Tracker {
    /// Queue the learner's active task for review
    ///
    /// The active task stays in place until the work is approved. A learner
    /// with a submission still awaiting review gets `TaskConflict`.
    pub async fn submit(&self, learner_id: LearnerId) -> Result<Assignment> {
        let guard = self.locks.acquire(learner_id).await;

        let learner = self.require_learner(learner_id).await?;
        let item = require_active_task(&learner)?;

        if let Some(pending) = self.store.pending_assignment_for(learner_id).await? {
            debug!(
                "Learner {} resubmitted while assignment {} is pending",
                learner_id, pending.id
            );
            return Err(TrackerError::TaskConflict {
                learner_id,
                active: item,
            });
        }

        let assignment = match self.store.create_assignment(learner_id, item).await {
            Ok(assignment) => assignment,
            Err(fret_common::Error::Conflict(_)) => {
                return Err(TrackerError::TaskConflict {
                    learner_id,
                    active: item,
                })
            }
            Err(e) => return Err(e.into()),
        };
        drop(guard);

        info!(
            "Learner {} submitted {} as assignment {}",
            learner_id, item, assignment.id
        );

        let title = self.item_title(item).await;
        if let Err(e) = self
            .notifier
            .notify_reviewer(&assignment, &learner.summary(), &title)
            .await
        {
            warn!(
                "Reviewer not notified about assignment {}: {}",
                assignment.id, e
            );
        }

        Ok(assignment)
    }

    /// Pending assignments, oldest first
    pub async fn pending_assignments(&self) -> Result<Vec<Assignment>> {
        Ok(self.store.list_pending_assignments().await?)
    }
}
