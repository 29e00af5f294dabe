//! SQLite-backed catalog and progress store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fret_common::events::TaskKind;
use fret_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{CatalogStore, ProgressStore};
use crate::model::{
    Assignment, AssignmentId, AssignmentStatus, CourseId, Learner, LearnerId, LessonId,
    LessonItem, SongId, SongItem, TaskRef,
};

/// Store over the pool returned by `fret_common::db::init_database`
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

fn lesson_from_row(row: &SqliteRow) -> Result<LessonItem> {
    let sequence: i64 = row.try_get("order_index")?;
    Ok(LessonItem {
        id: LessonId(row.try_get("id")?),
        course: CourseId(row.try_get("course")?),
        module: row.try_get("module")?,
        title: row.try_get("title")?,
        sequence: u32::try_from(sequence)
            .map_err(|_| Error::Internal(format!("negative lesson order_index {}", sequence)))?,
        is_bonus: row.try_get("is_bonus")?,
        is_final: row.try_get("is_final")?,
    })
}

fn song_from_row(row: &SqliteRow) -> Result<SongItem> {
    Ok(SongItem {
        id: SongId(row.try_get("id")?),
        title: row.try_get("title")?,
    })
}

fn assignment_from_row(row: &SqliteRow) -> Result<Assignment> {
    let kind: String = row.try_get("kind")?;
    let kind = TaskKind::parse(&kind)
        .ok_or_else(|| Error::Internal(format!("unknown assignment kind '{}'", kind)))?;
    let status: String = row.try_get("status")?;
    let status = AssignmentStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("unknown assignment status '{}'", status)))?;

    Ok(Assignment {
        id: AssignmentId(row.try_get("id")?),
        learner_id: LearnerId(row.try_get("learner_id")?),
        item: TaskRef::from_parts(kind, row.try_get("item_id")?),
        status,
        created_at: row.try_get("created_at")?,
        decided_at: row.try_get("decided_at")?,
    })
}

fn unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Upsert the learner row and add any new completions
///
/// Completed sets only grow, so existing rows are left in place.
async fn write_learner(conn: &mut SqliteConnection, learner: &Learner) -> Result<()> {
    let (lesson_id, song_id) = match learner.active_task {
        Some(TaskRef::Lesson(id)) => (Some(id.0), None),
        Some(TaskRef::Song(id)) => (None, Some(id.0)),
        None => (None, None),
    };

    sqlx::query(
        r#"
        INSERT INTO learners (
            id, username, display_name, reputation, rank, current_course,
            progress, current_lesson_id, current_song_id, is_graduated
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            username = excluded.username,
            display_name = excluded.display_name,
            reputation = excluded.reputation,
            rank = excluded.rank,
            current_course = excluded.current_course,
            progress = excluded.progress,
            current_lesson_id = excluded.current_lesson_id,
            current_song_id = excluded.current_song_id,
            is_graduated = excluded.is_graduated,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(learner.id.0)
    .bind(&learner.username)
    .bind(&learner.display_name)
    .bind(i64::from(learner.reputation))
    .bind(&learner.rank)
    .bind(learner.course.0)
    .bind(learner.progress)
    .bind(lesson_id)
    .bind(song_id)
    .bind(learner.graduated)
    .execute(&mut *conn)
    .await?;

    for lesson in &learner.completed_lessons {
        sqlx::query("INSERT OR IGNORE INTO completed_lessons (learner_id, lesson_id) VALUES (?, ?)")
            .bind(learner.id.0)
            .bind(lesson.0)
            .execute(&mut *conn)
            .await?;
    }

    for song in &learner.completed_songs {
        sqlx::query("INSERT OR IGNORE INTO completed_songs (learner_id, song_id) VALUES (?, ?)")
            .bind(learner.id.0)
            .bind(song.0)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Guarded status change; zero affected rows means someone decided first
async fn decide(
    conn: &mut SqliteConnection,
    id: AssignmentId,
    status: AssignmentStatus,
    decided_at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE assignments SET status = ?, decided_at = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(status.as_str())
    .bind(decided_at)
    .bind(id.0)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict(format!(
            "assignment {} is not pending",
            id
        )));
    }

    Ok(())
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn get_lesson(&self, id: LessonId) -> Result<Option<LessonItem>> {
        let row = sqlx::query(
            "SELECT id, course, module, title, order_index, is_bonus, is_final FROM lessons WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(lesson_from_row).transpose()
    }

    async fn get_song(&self, id: SongId) -> Result<Option<SongItem>> {
        let row = sqlx::query("SELECT id, title FROM songs WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(song_from_row).transpose()
    }

    async fn list_lessons(&self, course: CourseId) -> Result<Vec<LessonItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, course, module, title, order_index, is_bonus, is_final
            FROM lessons
            WHERE course = ?
            ORDER BY order_index
            "#,
        )
        .bind(course.0)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(lesson_from_row).collect()
    }

    async fn count_lessons(&self, course: CourseId) -> Result<u32> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons WHERE course = ?")
            .bind(course.0)
            .fetch_one(&self.db)
            .await?;

        u32::try_from(count).map_err(|_| Error::Internal(format!("lesson count {}", count)))
    }

    async fn list_songs(&self) -> Result<Vec<SongItem>> {
        let rows = sqlx::query("SELECT id, title FROM songs ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        rows.iter().map(song_from_row).collect()
    }
}

#[async_trait]
impl ProgressStore for SqliteStore {
    async fn load_learner(&self, id: LearnerId) -> Result<Option<Learner>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, display_name, reputation, rank, current_course,
                   progress, current_lesson_id, current_song_id, is_graduated
            FROM learners
            WHERE id = ?
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lesson_id: Option<i64> = row.try_get("current_lesson_id")?;
        let song_id: Option<i64> = row.try_get("current_song_id")?;
        let active_task = match (lesson_id, song_id) {
            (Some(lesson), None) => Some(TaskRef::Lesson(LessonId(lesson))),
            (None, Some(song)) => Some(TaskRef::Song(SongId(song))),
            (None, None) => None,
            (Some(_), Some(_)) => {
                return Err(Error::Internal(format!(
                    "learner {} holds both a lesson and a song",
                    id
                )))
            }
        };

        let reputation: i64 = row.try_get("reputation")?;

        let completed_lessons: Vec<i64> =
            sqlx::query_scalar("SELECT lesson_id FROM completed_lessons WHERE learner_id = ?")
                .bind(id.0)
                .fetch_all(&self.db)
                .await?;
        let completed_songs: Vec<i64> =
            sqlx::query_scalar("SELECT song_id FROM completed_songs WHERE learner_id = ?")
                .bind(id.0)
                .fetch_all(&self.db)
                .await?;

        Ok(Some(Learner {
            id,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            reputation: u32::try_from(reputation)
                .map_err(|_| Error::Internal(format!("reputation {} out of range", reputation)))?,
            rank: row.try_get("rank")?,
            course: CourseId(row.try_get("current_course")?),
            progress: row.try_get("progress")?,
            active_task,
            completed_lessons: completed_lessons.into_iter().map(LessonId).collect(),
            completed_songs: completed_songs.into_iter().map(SongId).collect(),
            graduated: row.try_get("is_graduated")?,
        }))
    }

    async fn save_learner(&self, learner: &Learner) -> Result<()> {
        let mut tx = self.db.begin().await?;
        write_learner(&mut tx, learner).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>> {
        let row = sqlx::query(
            r#"
            SELECT id, learner_id, kind, item_id, status, created_at, decided_at
            FROM assignments
            WHERE id = ?
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(assignment_from_row).transpose()
    }

    async fn create_assignment(&self, learner_id: LearnerId, item: TaskRef) -> Result<Assignment> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO assignments (learner_id, kind, item_id, status, created_at) VALUES (?, ?, ?, 'pending', ?)",
        )
        .bind(learner_id.0)
        .bind(item.kind().as_str())
        .bind(item.item_id())
        .bind(created_at)
        .execute(&self.db)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(e) if unique_violation(&e) => {
                return Err(Error::Conflict(format!(
                    "learner {} already has a pending assignment",
                    learner_id
                )))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Assignment {
            id: AssignmentId(result.last_insert_rowid()),
            learner_id,
            item,
            status: AssignmentStatus::Pending,
            created_at,
            decided_at: None,
        })
    }

    async fn pending_assignment_for(&self, learner_id: LearnerId) -> Result<Option<Assignment>> {
        let row = sqlx::query(
            r#"
            SELECT id, learner_id, kind, item_id, status, created_at, decided_at
            FROM assignments
            WHERE learner_id = ? AND status = 'pending'
            "#,
        )
        .bind(learner_id.0)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(assignment_from_row).transpose()
    }

    async fn list_pending_assignments(&self) -> Result<Vec<Assignment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, learner_id, kind, item_id, status, created_at, decided_at
            FROM assignments
            WHERE status = 'pending'
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(assignment_from_row).collect()
    }

    async fn record_decision(
        &self,
        id: AssignmentId,
        status: AssignmentStatus,
        decided_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.db.acquire().await?;
        decide(&mut conn, id, status, decided_at).await
    }

    async fn commit_approval(&self, learner: &Learner, assignment: &Assignment) -> Result<()> {
        let decided_at = assignment.decided_at.unwrap_or_else(Utc::now);

        let mut tx = self.db.begin().await?;
        // Dropping tx without commit rolls back
        decide(&mut tx, assignment.id, assignment.status, decided_at).await?;
        write_learner(&mut tx, learner).await?;
        tx.commit().await?;

        Ok(())
    }
}
