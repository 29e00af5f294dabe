//! Task assignment

use serde::Serialize;
use tracing::{debug, info};

use super::{require_free_slot, Tracker};
use crate::error::{Missing, Result, TrackerError};
use crate::model::{LearnerId, LessonItem, SongId, SongItem, TaskRef};

/// Outcome of asking for the next lesson
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextLesson {
    Assigned { lesson: LessonItem },
    /// Every lesson of the learner's course is done; nothing was changed
    CourseComplete,
}

impl Tracker {
    /// Give the learner the lowest-sequence lesson of their course they
    /// have not completed yet
    pub async fn assign_next_lesson(&self, learner_id: LearnerId) -> Result<NextLesson> {
        let _guard = self.locks.acquire(learner_id).await;

        let mut learner = self.require_learner(learner_id).await?;
        require_free_slot(&learner)?;

        let next = self
            .catalog
            .list_lessons(learner.course)
            .await?
            .into_iter()
            .find(|lesson| !learner.completed_lessons.contains(&lesson.id));

        let Some(lesson) = next else {
            debug!(
                "Learner {} has finished course {}",
                learner_id, learner.course
            );
            return Ok(NextLesson::CourseComplete);
        };

        learner.active_task = Some(TaskRef::Lesson(lesson.id));
        self.store.save_learner(&learner).await?;

        info!(
            "Assigned lesson {} ({}) to learner {}",
            lesson.id, lesson.title, learner_id
        );
        Ok(NextLesson::Assigned { lesson })
    }

    /// Give the learner a song breakdown of their choosing
    ///
    /// Checked in order: song exists, not already completed, slot free.
    pub async fn assign_song(&self, learner_id: LearnerId, song_id: SongId) -> Result<SongItem> {
        let _guard = self.locks.acquire(learner_id).await;

        let mut learner = self.require_learner(learner_id).await?;

        let song = self
            .catalog
            .get_song(song_id)
            .await?
            .ok_or(TrackerError::NotFound(Missing::Song(song_id)))?;

        if learner.completed_songs.contains(&song_id) {
            return Err(TrackerError::AlreadyCompleted(song_id));
        }

        require_free_slot(&learner)?;

        learner.active_task = Some(TaskRef::Song(song.id));
        self.store.save_learner(&learner).await?;

        info!(
            "Assigned song {} ({}) to learner {}",
            song.id, song.title, learner_id
        );
        Ok(song)
    }
}
