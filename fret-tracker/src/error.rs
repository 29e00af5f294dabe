//! Error types for the tracker core

use crate::model::{AssignmentId, AssignmentStatus, LearnerId, LessonId, SongId, TaskRef};
use thiserror::Error;

/// Catalog or queue entry that was looked up and not found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Lesson(LessonId),
    Song(SongId),
    Assignment(AssignmentId),
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Missing::Lesson(id) => write!(f, "lesson {}", id),
            Missing::Song(id) => write!(f, "song {}", id),
            Missing::Assignment(id) => write!(f, "assignment {}", id),
        }
    }
}

/// Tracker operation errors
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("learner {learner_id} already has an active task ({active})")]
    TaskConflict { learner_id: LearnerId, active: TaskRef },

    #[error("{0} not found")]
    NotFound(Missing),

    #[error("learner {0} not found")]
    LearnerNotFound(LearnerId),

    #[error("song {0} already completed")]
    AlreadyCompleted(SongId),

    #[error("assignment {assignment_id} already decided ({status})")]
    AlreadyDecided {
        assignment_id: AssignmentId,
        status: AssignmentStatus,
    },

    #[error("learner {0} has no active task")]
    NoActiveTask(LearnerId),

    #[error("storage error: {0}")]
    Storage(#[from] fret_common::Error),
}

impl TrackerError {
    /// Stable tag used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            TrackerError::TaskConflict { .. } => "task_conflict",
            TrackerError::NotFound(_) => "not_found",
            TrackerError::LearnerNotFound(_) => "learner_not_found",
            TrackerError::AlreadyCompleted(_) => "already_completed",
            TrackerError::AlreadyDecided { .. } => "already_decided",
            TrackerError::NoActiveTask(_) => "no_active_task",
            TrackerError::Storage(_) => "storage",
        }
    }

    /// Data-integrity failures as opposed to user-correctable ones
    ///
    /// Any missing lesson, song, assignment or learner counts, as does a
    /// storage failure. Conflicts and duplicate attempts are normal refusals.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            TrackerError::NotFound(_)
                | TrackerError::LearnerNotFound(_)
                | TrackerError::Storage(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
