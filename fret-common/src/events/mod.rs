//! Event types for the Fretwork event system
//!
//! Provides the shared event definitions and the EventBus that carries them
//! to the chat adapter (over SSE).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Kind of work a learner can hold or submit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Lesson,
    Song,
}

impl TaskKind {
    /// Stable storage/wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Lesson => "lesson",
            TaskKind::Song => "song",
        }
    }

    /// Parse the storage name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lesson" => Some(TaskKind::Lesson),
            "song" => Some(TaskKind::Song),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fretwork event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// The chat adapter turns them into reviewer and learner messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TrackerEvent {
    /// A learner submitted work; the reviewer should look at it
    ReviewRequested {
        assignment_id: i64,
        learner_id: i64,
        username: Option<String>,
        display_name: String,
        kind: TaskKind,
        item_id: i64,
        /// Lesson or song title (empty if the catalog lookup failed)
        item_title: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A submission was approved
    SubmissionApproved {
        assignment_id: i64,
        learner_id: i64,
        reward: u32,
        reputation: u32,
        rank: String,
        /// True when this approval moved the learner into a new rank
        rank_changed: bool,
        progress: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A submission was rejected; the learner keeps the task and may resubmit
    SubmissionRejected {
        assignment_id: i64,
        learner_id: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TrackerEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            TrackerEvent::ReviewRequested { .. } => "ReviewRequested",
            TrackerEvent::SubmissionApproved { .. } => "SubmissionApproved",
            TrackerEvent::SubmissionRejected { .. } => "SubmissionRejected",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use fret_common::events::{EventBus, TrackerEvent};
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
///
/// bus.emit(TrackerEvent::SubmissionRejected {
///     assignment_id: 1,
///     learner_id: 42,
///     timestamp: chrono::Utc::now(),
/// })
/// .unwrap();
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TrackerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    pub fn emit(
        &self,
        event: TrackerEvent,
    ) -> Result<usize, broadcast::error::SendError<TrackerEvent>> {
        self.tx.send(event)
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
