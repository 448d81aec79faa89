use chrono::{DateTime, Utc};
use quest_core::model::{
    Badge, CharacterType, DEFAULT_QUIZ_POINTS_REWARD, DEFAULT_LEVEL, Game, LearningModule,
    Profile, Question, Quiz, QuizAttempt, UserProgress,
};
use quest_core::scoring::score_from_persisted;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::str::FromStr;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Map driver errors onto the storage taxonomy.
///
/// Unique violations are conflicts; foreign key violations mean the referenced
/// row does not exist.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn parse_id<T>(field: &'static str, raw: &str) -> Result<T, StorageError>
where
    T: FromStr,
{
    raw.parse::<T>()
        .map_err(|_| StorageError::Serialization(format!("invalid {field}: {raw}")))
}

pub(crate) fn get_id<T: FromStr>(row: &SqliteRow, field: &'static str) -> Result<T, StorageError> {
    let raw: String = row.try_get(field).map_err(ser)?;
    parse_id(field, &raw)
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_from_u64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn bool_to_i64(v: bool) -> i64 {
    i64::from(v)
}

fn opt_u32(row: &SqliteRow, field: &'static str) -> Result<Option<u32>, StorageError> {
    row.try_get::<Option<i64>, _>(field)
        .map_err(ser)?
        .map(|v| u32_from_i64(field, v))
        .transpose()
}

fn flag(row: &SqliteRow, field: &'static str) -> Result<bool, StorageError> {
    Ok(row.try_get::<Option<i64>, _>(field).map_err(ser)?.unwrap_or(0) != 0)
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<Profile, StorageError> {
    let character: Option<String> = row.try_get("character_type").map_err(ser)?;
    let total_points = row
        .try_get::<Option<i64>, _>("total_points")
        .map_err(ser)?
        .map(|v| u64_from_i64("total_points", v))
        .transpose()?
        .unwrap_or(0);

    Ok(Profile {
        user_id: get_id(row, "user_id")?,
        display_name: row.try_get("display_name").map_err(ser)?,
        username: row.try_get("username").map_err(ser)?,
        level: opt_u32(row, "level")?.unwrap_or(DEFAULT_LEVEL),
        total_points,
        character_type: CharacterType::from_stored(character.as_deref()),
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<LearningModule, StorageError> {
    let order_index: i64 = row.try_get("order_index").map_err(ser)?;
    Ok(LearningModule {
        id: get_id(row, "id")?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        content: row
            .try_get::<Option<String>, _>("content")
            .map_err(ser)?
            .unwrap_or_default(),
        points_reward: opt_u32(row, "points_reward")?.unwrap_or(0),
        order_index: i32::try_from(order_index)
            .map_err(|_| StorageError::Serialization(format!("invalid order_index: {order_index}")))?,
        is_active: flag(row, "is_active")?,
    })
}

/// Module columns aliased with an `m_` prefix, as selected by joined queries.
pub(crate) fn map_joined_module_row(row: &SqliteRow) -> Result<LearningModule, StorageError> {
    let order_index: i64 = row.try_get("m_order_index").map_err(ser)?;
    Ok(LearningModule {
        id: get_id(row, "module_id")?,
        title: row.try_get("m_title").map_err(ser)?,
        description: row.try_get("m_description").map_err(ser)?,
        content: row
            .try_get::<Option<String>, _>("m_content")
            .map_err(ser)?
            .unwrap_or_default(),
        points_reward: opt_u32(row, "m_points_reward")?.unwrap_or(0),
        order_index: i32::try_from(order_index)
            .map_err(|_| StorageError::Serialization(format!("invalid order_index: {order_index}")))?,
        is_active: flag(row, "m_is_active")?,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<UserProgress, StorageError> {
    let percentage = row
        .try_get::<Option<i64>, _>("progress_percentage")
        .map_err(ser)?
        .unwrap_or(0);
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;
    UserProgress::from_persisted(
        get_id(row, "user_id")?,
        get_id(row, "module_id")?,
        flag(row, "completed")?,
        percentage,
        completed_at,
        flag(row, "points_awarded")?,
    )
    .map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let raw_questions: String = row.try_get("questions").map_err(ser)?;
    let questions: Vec<Question> = serde_json::from_str(&raw_questions).map_err(ser)?;
    for question in &questions {
        question.validate().map_err(ser)?;
    }
    let module_id: Option<String> = row.try_get("module_id").map_err(ser)?;

    Ok(Quiz {
        id: get_id(row, "id")?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        module_id: module_id.map(|raw| parse_id("module_id", &raw)).transpose()?,
        questions,
        points_reward: opt_u32(row, "points_reward")?.unwrap_or(DEFAULT_QUIZ_POINTS_REWARD),
        is_active: flag(row, "is_active")?,
    })
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    let raw_answers: String = row.try_get("answers").map_err(ser)?;
    Ok(QuizAttempt {
        id: get_id(row, "id")?,
        user_id: get_id(row, "user_id")?,
        quiz_id: get_id(row, "quiz_id")?,
        score: score_from_persisted(row.try_get::<i64, _>("score").map_err(ser)?).map_err(ser)?,
        answers: serde_json::from_str(&raw_answers).map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

pub(crate) fn map_badge_row(row: &SqliteRow) -> Result<Badge, StorageError> {
    Ok(Badge {
        id: get_id(row, "id")?,
        name: row.try_get("name").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        icon_url: row.try_get("icon_url").map_err(ser)?,
        points_required: row
            .try_get::<Option<i64>, _>("points_required")
            .map_err(ser)?
            .map(|v| u64_from_i64("points_required", v))
            .transpose()?,
        is_active: flag(row, "is_active")?,
    })
}

pub(crate) fn map_game_row(row: &SqliteRow) -> Result<Game, StorageError> {
    Ok(Game {
        id: get_id(row, "id")?,
        name: row.try_get("name").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        game_type: row.try_get("game_type").map_err(ser)?,
        points_reward: opt_u32(row, "points_reward")?.unwrap_or(0),
        is_active: flag(row, "is_active")?,
    })
}
