//! Domain entities: learners, catalog items and assignments
//!
//! A learner's active task is an `Option<TaskRef>`, so "lesson and song
//! at the same time" cannot be represented.

use chrono::{DateTime, Utc};
use fret_common::events::TaskKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Chat user id of a learner
    LearnerId
);
id_type!(LessonId);
id_type!(SongId);
id_type!(CourseId);
id_type!(AssignmentId);

/// Course every new learner starts in
pub const DEFAULT_COURSE: CourseId = CourseId(1);

/// Reference to a unit of work: one lesson or one song breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TaskRef {
    Lesson(LessonId),
    Song(SongId),
}

impl TaskRef {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRef::Lesson(_) => TaskKind::Lesson,
            TaskRef::Song(_) => TaskKind::Song,
        }
    }

    /// Raw catalog id, regardless of kind
    pub fn item_id(&self) -> i64 {
        match self {
            TaskRef::Lesson(id) => id.0,
            TaskRef::Song(id) => id.0,
        }
    }

    pub fn from_parts(kind: TaskKind, item_id: i64) -> Self {
        match kind {
            TaskKind::Lesson => TaskRef::Lesson(LessonId(item_id)),
            TaskKind::Song => TaskRef::Song(SongId(item_id)),
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.item_id())
    }
}

/// Catalog lesson
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonItem {
    pub id: LessonId,
    pub course: CourseId,
    pub module: String,
    pub title: String,
    /// Position within the course, 0-based
    pub sequence: u32,
    pub is_bonus: bool,
    pub is_final: bool,
}

/// Catalog song breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongItem {
    pub id: SongId,
    pub title: String,
}

/// Review status of an assignment
///
/// `RevisionRequested` is a recognised stored value but nothing in the
/// current review flow produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Approved,
    Rejected,
    RevisionRequested,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Approved => "approved",
            AssignmentStatus::Rejected => "rejected",
            AssignmentStatus::RevisionRequested => "revision_requested",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AssignmentStatus::Pending),
            "approved" => Some(AssignmentStatus::Approved),
            "rejected" => Some(AssignmentStatus::Rejected),
            "revision_requested" => Some(AssignmentStatus::RevisionRequested),
            _ => None,
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted unit of work awaiting (or past) a reviewer decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub learner_id: LearnerId,
    pub item: TaskRef,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub fn is_pending(&self) -> bool {
        self.status == AssignmentStatus::Pending
    }

    /// Copy of this assignment moved to a terminal status
    pub fn decided(&self, status: AssignmentStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            decided_at: Some(at),
            ..self.clone()
        }
    }
}

/// Per-user progress record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Learner {
    pub id: LearnerId,
    pub username: Option<String>,
    pub display_name: String,
    pub reputation: u32,
    /// Cached label from the rank table
    pub rank: String,
    pub course: CourseId,
    /// Share of the current course completed, 0.0 to 100.0
    pub progress: f64,
    pub active_task: Option<TaskRef>,
    pub completed_lessons: BTreeSet<LessonId>,
    pub completed_songs: BTreeSet<SongId>,
    pub graduated: bool,
}

impl Learner {
    /// Fresh learner on first contact
    pub fn new(
        id: LearnerId,
        username: Option<String>,
        display_name: impl Into<String>,
        rank: impl Into<String>,
    ) -> Self {
        Self {
            id,
            username,
            display_name: display_name.into(),
            reputation: 0,
            rank: rank.into(),
            course: DEFAULT_COURSE,
            progress: 0.0,
            active_task: None,
            completed_lessons: BTreeSet::new(),
            completed_songs: BTreeSet::new(),
            graduated: false,
        }
    }

    pub fn has_completed(&self, item: TaskRef) -> bool {
        match item {
            TaskRef::Lesson(id) => self.completed_lessons.contains(&id),
            TaskRef::Song(id) => self.completed_songs.contains(&id),
        }
    }

    /// Add the item to the matching completed set and clear the active
    /// task slot of the same kind
    pub fn record_completion(&mut self, item: TaskRef) {
        match item {
            TaskRef::Lesson(id) => {
                self.completed_lessons.insert(id);
            }
            TaskRef::Song(id) => {
                self.completed_songs.insert(id);
            }
        }

        if self.active_task.map(|t| t.kind()) == Some(item.kind()) {
            self.active_task = None;
        }
    }

    pub fn summary(&self) -> LearnerSummary {
        LearnerSummary {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            rank: self.rank.clone(),
            reputation: self.reputation,
        }
    }
}

/// The part of a learner shown to the reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerSummary {
    pub id: LearnerId,
    pub username: Option<String>,
    pub display_name: String,
    pub rank: String,
    pub reputation: u32,
}
