use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: [&str; 12] = [
    r"
        CREATE TABLE IF NOT EXISTS profiles (
            user_id TEXT PRIMARY KEY,
            display_name TEXT,
            username TEXT,
            level INTEGER DEFAULT 1 CHECK (level >= 0),
            total_points INTEGER DEFAULT 0 CHECK (total_points >= 0),
            character_type TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS learning_modules (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            content TEXT,
            points_reward INTEGER CHECK (points_reward >= 0),
            order_index INTEGER NOT NULL,
            is_active INTEGER DEFAULT 1
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_progress (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            module_id TEXT NOT NULL,
            completed INTEGER DEFAULT 0,
            progress_percentage INTEGER DEFAULT 0
                CHECK (progress_percentage BETWEEN 0 AND 100),
            completed_at TEXT,
            UNIQUE (user_id, module_id),
            FOREIGN KEY (module_id) REFERENCES learning_modules(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quizzes (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            module_id TEXT,
            questions TEXT NOT NULL DEFAULT '[]',
            points_reward INTEGER CHECK (points_reward >= 0),
            is_active INTEGER DEFAULT 1,
            FOREIGN KEY (module_id) REFERENCES learning_modules(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            quiz_id TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
            answers TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            FOREIGN KEY (quiz_id) REFERENCES quizzes(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS badges (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            icon_url TEXT,
            points_required INTEGER,
            is_active INTEGER DEFAULT 1
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_badges (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            badge_id TEXT NOT NULL,
            earned_at TEXT NOT NULL,
            UNIQUE (user_id, badge_id),
            FOREIGN KEY (badge_id) REFERENCES badges(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS games (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            game_type TEXT NOT NULL,
            points_reward INTEGER CHECK (points_reward >= 0),
            is_active INTEGER DEFAULT 1
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS game_scores (
            id INTEGER PRIMARY KEY,
            game_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score >= 0),
            level_reached INTEGER,
            played_at TEXT NOT NULL,
            FOREIGN KEY (game_id) REFERENCES games(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_learning_modules_active_order
            ON learning_modules (is_active, order_index);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_attempts_user_completed
            ON quiz_attempts (user_id, completed_at);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_game_scores_user
            ON game_scores (user_id, played_at);
    ",
];

/// Runs the versioned migrations for the quest schema.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    // Version 2: track whether a completed module's reward was paid.
    // Rows completed before this column existed count as paid.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "ALTER TABLE user_progress ADD COLUMN points_awarded INTEGER NOT NULL DEFAULT 0",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE user_progress SET points_awarded = completed")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(2_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
