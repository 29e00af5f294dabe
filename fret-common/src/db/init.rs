//! Database initialization
//!
//! Creates the database file on first run, applies the schema (idempotent)
//! and seeds the static lesson/song catalog when it is empty.

use crate::db::catalog_seed::{LESSONS, SONGS};
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets readers proceed while a review transaction holds the writer
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_lessons_table(&pool).await?;
    create_songs_table(&pool).await?;
    create_learners_table(&pool).await?;
    create_completed_lessons_table(&pool).await?;
    create_completed_songs_table(&pool).await?;
    create_assignments_table(&pool).await?;

    seed_catalog(&pool).await?;

    Ok(pool)
}

async fn create_lessons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY,
            course INTEGER NOT NULL,
            module TEXT NOT NULL,
            title TEXT NOT NULL,
            order_index INTEGER NOT NULL,
            is_bonus INTEGER NOT NULL DEFAULT 0,
            is_final INTEGER NOT NULL DEFAULT 0,
            UNIQUE (course, order_index)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Learners table
///
/// At most one of current_lesson_id / current_song_id may be set.
async fn create_learners_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS learners (
            id INTEGER PRIMARY KEY,
            username TEXT,
            display_name TEXT NOT NULL,
            reputation INTEGER NOT NULL DEFAULT 0 CHECK (reputation >= 0),
            rank TEXT NOT NULL,
            current_course INTEGER NOT NULL DEFAULT 1,
            progress REAL NOT NULL DEFAULT 0.0,
            current_lesson_id INTEGER REFERENCES lessons(id),
            current_song_id INTEGER REFERENCES songs(id),
            is_graduated INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (current_lesson_id IS NULL OR current_song_id IS NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_completed_lessons_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS completed_lessons (
            learner_id INTEGER NOT NULL REFERENCES learners(id),
            lesson_id INTEGER NOT NULL REFERENCES lessons(id),
            PRIMARY KEY (learner_id, lesson_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_completed_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS completed_songs (
            learner_id INTEGER NOT NULL REFERENCES learners(id),
            song_id INTEGER NOT NULL REFERENCES songs(id),
            PRIMARY KEY (learner_id, song_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Assignments (review requests)
///
/// The partial unique index allows a single pending row per learner.
async fn create_assignments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assignments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            learner_id INTEGER NOT NULL REFERENCES learners(id),
            kind TEXT NOT NULL CHECK (kind IN ('lesson', 'song')),
            item_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected', 'revision_requested')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            decided_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_assignments_one_pending
        ON assignments (learner_id) WHERE status = 'pending'
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_assignments_status ON assignments (status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Insert the built-in catalog if the lessons and songs tables are empty
pub async fn seed_catalog(pool: &SqlitePool) -> Result<()> {
    let lesson_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
        .fetch_one(pool)
        .await?;

    if lesson_count == 0 {
        let mut tx = pool.begin().await?;
        for (idx, lesson) in LESSONS.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO lessons (id, course, module, title, order_index, is_bonus, is_final)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(idx as i64 + 1)
            .bind(lesson.course)
            .bind(lesson.module)
            .bind(lesson.title)
            .bind(lesson.order_index)
            .bind(lesson.is_bonus)
            .bind(lesson.is_final)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        info!("Seeded {} lessons", LESSONS.len());
    }

    let song_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(pool)
        .await?;

    if song_count == 0 {
        let mut tx = pool.begin().await?;
        for (id, title) in SONGS {
            sqlx::query("INSERT INTO songs (id, title) VALUES (?, ?)")
                .bind(*id)
                .bind(*title)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        info!("Seeded {} songs", SONGS.len());
    }

    Ok(())
}
