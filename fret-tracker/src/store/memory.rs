//! In-process store for tests and tooling
//!
//! Catalog is fixed at construction; progress lives behind one mutex so
//! every trait call is atomic on its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fret_common::db::catalog_seed::{LESSONS, SONGS};
use fret_common::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::{CatalogStore, ProgressStore};
use crate::model::{
    Assignment, AssignmentId, AssignmentStatus, CourseId, Learner, LearnerId, LessonId,
    LessonItem, SongId, SongItem, TaskRef,
};

#[derive(Default)]
struct Progress {
    learners: HashMap<LearnerId, Learner>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    last_assignment_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    lessons: BTreeMap<LessonId, LessonItem>,
    songs: BTreeMap<SongId, SongItem>,
    progress: Mutex<Progress>,
    failing_commits: AtomicUsize,
}

impl MemoryStore {
    /// Empty catalog, no learners
    pub fn new() -> Self {
        Self::default()
    }

    /// Same catalog the SQLite database is seeded with
    pub fn with_seed_catalog() -> Self {
        let mut store = Self::new();
        for (idx, seed) in LESSONS.iter().enumerate() {
            let id = LessonId(idx as i64 + 1);
            store.lessons.insert(
                id,
                LessonItem {
                    id,
                    course: CourseId(seed.course),
                    module: seed.module.to_string(),
                    title: seed.title.to_string(),
                    sequence: seed.order_index as u32,
                    is_bonus: seed.is_bonus,
                    is_final: seed.is_final,
                },
            );
        }
        for (id, title) in SONGS {
            store = store.with_song(SongId(*id), *title);
        }
        store
    }

    /// Append a course whose lessons get consecutive ids after the current max
    pub fn with_course(mut self, course: CourseId, titles: &[&str]) -> Self {
        let mut next_id = self.lessons.keys().next_back().map_or(1, |id| id.0 + 1);
        for (sequence, title) in titles.iter().enumerate() {
            let id = LessonId(next_id);
            next_id += 1;
            self.lessons.insert(
                id,
                LessonItem {
                    id,
                    course,
                    module: format!("Module {}", course),
                    title: title.to_string(),
                    sequence: sequence as u32,
                    is_bonus: false,
                    is_final: sequence + 1 == titles.len(),
                },
            );
        }
        self
    }

    pub fn with_song(mut self, id: SongId, title: &str) -> Self {
        self.songs.insert(
            id,
            SongItem {
                id,
                title: title.to_string(),
            },
        );
        self
    }

    /// Make the next `count` calls to `commit_approval` fail without writing
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Snapshot of every assignment ever created
    pub async fn assignments(&self) -> Vec<Assignment> {
        self.progress.lock().await.assignments.values().cloned().collect()
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn mark_decided(
    progress: &mut Progress,
    id: AssignmentId,
    status: AssignmentStatus,
    decided_at: DateTime<Utc>,
) -> Result<()> {
    let assignment = progress
        .assignments
        .get_mut(&id)
        .ok_or_else(|| Error::NotFound(format!("assignment {}", id)))?;

    if !assignment.is_pending() {
        return Err(Error::Conflict(format!("assignment {} is not pending", id)));
    }

    assignment.status = status;
    assignment.decided_at = Some(decided_at);
    Ok(())
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_lesson(&self, id: LessonId) -> Result<Option<LessonItem>> {
        Ok(self.lessons.get(&id).cloned())
    }

    async fn get_song(&self, id: SongId) -> Result<Option<SongItem>> {
        Ok(self.songs.get(&id).cloned())
    }

    async fn list_lessons(&self, course: CourseId) -> Result<Vec<LessonItem>> {
        let mut lessons: Vec<LessonItem> = self
            .lessons
            .values()
            .filter(|l| l.course == course)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.sequence);
        Ok(lessons)
    }

    async fn count_lessons(&self, course: CourseId) -> Result<u32> {
        Ok(self.lessons.values().filter(|l| l.course == course).count() as u32)
    }

    async fn list_songs(&self) -> Result<Vec<SongItem>> {
        Ok(self.songs.values().cloned().collect())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load_learner(&self, id: LearnerId) -> Result<Option<Learner>> {
        Ok(self.progress.lock().await.learners.get(&id).cloned())
    }

    async fn save_learner(&self, learner: &Learner) -> Result<()> {
        self.progress
            .lock()
            .await
            .learners
            .insert(learner.id, learner.clone());
        Ok(())
    }

    async fn load_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        Ok(self.progress.lock().await.assignments.get(&id).cloned())
    }

    async fn create_assignment(&self, learner_id: LearnerId, item: TaskRef) -> Result<Assignment> {
        let mut progress = self.progress.lock().await;

        if progress
            .assignments
            .values()
            .any(|a| a.learner_id == learner_id && a.is_pending())
        {
            return Err(Error::Conflict(format!(
                "learner {} already has a pending assignment",
                learner_id
            )));
        }

        progress.last_assignment_id += 1;
        let assignment = Assignment {
            id: AssignmentId(progress.last_assignment_id),
            learner_id,
            item,
            status: AssignmentStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
        };
        progress.assignments.insert(assignment.id, assignment.clone());

        Ok(assignment)
    }

    async fn pending_assignment_for(&self, learner_id: LearnerId) -> Result<Option<Assignment>> {
        Ok(self
            .progress
            .lock()
            .await
            .assignments
            .values()
            .find(|a| a.learner_id == learner_id && a.is_pending())
            .cloned())
    }

    async fn list_pending_assignments(&self) -> Result<Vec<Assignment>> {
        Ok(self
            .progress
            .lock()
            .await
            .assignments
            .values()
            .filter(|a| a.is_pending())
            .cloned()
            .collect())
    }

    async fn record_decision(
        &self,
        id: AssignmentId,
        status: AssignmentStatus,
        decided_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut progress = self.progress.lock().await;
        mark_decided(&mut progress, id, status, decided_at)
    }

    async fn commit_approval(&self, learner: &Learner, assignment: &Assignment) -> Result<()> {
        let mut progress = self.progress.lock().await;

        if self.take_injected_failure() {
            return Err(Error::Internal("injected commit failure".to_string()));
        }

        mark_decided(
            &mut progress,
            assignment.id,
            assignment.status,
            assignment.decided_at.unwrap_or_else(Utc::now),
        )?;
        progress.learners.insert(learner.id, learner.clone());

        Ok(())
    }
}
