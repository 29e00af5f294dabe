//! Storage seams for the tracker
//!
//! Two traits: the read-only catalog and the mutable progress store.
//! `SqliteStore` implements both against the shared database, `MemoryStore`
//! keeps everything in process for tests and tooling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fret_common::Result;

use crate::model::{
    Assignment, AssignmentId, AssignmentStatus, CourseId, Learner, LearnerId, LessonId,
    LessonItem, SongId, SongItem, TaskRef,
};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Read-only lesson and song catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_lesson(&self, id: LessonId) -> Result<Option<LessonItem>>;

    async fn get_song(&self, id: SongId) -> Result<Option<SongItem>>;

    /// Lessons of a course ordered by sequence index
    async fn list_lessons(&self, course: CourseId) -> Result<Vec<LessonItem>>;

    async fn count_lessons(&self, course: CourseId) -> Result<u32>;

    async fn list_songs(&self) -> Result<Vec<SongItem>>;
}

/// Learner and assignment persistence
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load_learner(&self, id: LearnerId) -> Result<Option<Learner>>;

    /// Insert or overwrite the learner, including completed sets
    async fn save_learner(&self, learner: &Learner) -> Result<()>;

    async fn load_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>>;

    /// Create a pending assignment
    ///
    /// Returns `Error::Conflict` if the learner already has one pending.
    async fn create_assignment(&self, learner_id: LearnerId, item: TaskRef) -> Result<Assignment>;

    async fn pending_assignment_for(&self, learner_id: LearnerId) -> Result<Option<Assignment>>;

    /// Every pending assignment, oldest first
    async fn list_pending_assignments(&self) -> Result<Vec<Assignment>>;

    /// Move a pending assignment to `status`
    ///
    /// Returns `Error::Conflict` if the assignment is no longer pending.
    async fn record_decision(
        &self,
        id: AssignmentId,
        status: AssignmentStatus,
        decided_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Persist an approved assignment together with the updated learner
    ///
    /// All or nothing. Returns `Error::Conflict` without writing anything if
    /// the stored assignment is no longer pending.
    async fn commit_approval(&self, learner: &Learner, assignment: &Assignment) -> Result<()>;
}
