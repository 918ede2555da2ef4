//! Practice history
//!
//! Rows are always scoped to one user: lookups for another user's row behave
//! as if the row did not exist.

use chrono::{DateTime, Utc};
use mathmap_common::db::PracticeRecord;
use mathmap_common::{Error, Result};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_guid;
use super::progress::record_attempt;
use super::questions::get_question;

/// A submitted attempt
#[derive(Debug, Clone, Deserialize)]
pub struct NewPractice {
    #[serde(alias = "question")]
    pub question_id: Uuid,
    pub user_answer: String,
    pub is_correct: bool,
    #[serde(default)]
    pub time_spent: i64,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PracticeChanges {
    pub user_answer: Option<String>,
    pub is_correct: Option<bool>,
    pub time_spent: Option<i64>,
}

/// Practice row before its question is expanded
struct PracticeRow {
    id: Uuid,
    user: Uuid,
    question_id: Uuid,
    user_answer: String,
    is_correct: bool,
    time_spent: i64,
    created_at: DateTime<Utc>,
}

const PRACTICE_SELECT: &str = r#"
    SELECT guid, user_id, question_id, user_answer, is_correct, time_spent, created_at
    FROM practice_history
"#;

fn practice_from_row(row: &SqliteRow) -> Result<PracticeRow> {
    let guid: String = row.try_get("guid")?;
    let user: String = row.try_get("user_id")?;
    let question: String = row.try_get("question_id")?;
    Ok(PracticeRow {
        id: parse_guid(&guid)?,
        user: parse_guid(&user)?,
        question_id: parse_guid(&question)?,
        user_answer: row.try_get("user_answer")?,
        is_correct: row.try_get("is_correct")?,
        time_spent: row.try_get("time_spent")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

async fn expand(pool: &SqlitePool, row: PracticeRow) -> Result<PracticeRecord> {
    let question = get_question(pool, row.question_id).await?.ok_or_else(|| {
        Error::Internal(format!("Practice {} references missing question", row.id))
    })?;

    Ok(PracticeRecord {
        id: row.id,
        user: row.user,
        question,
        user_answer: row.user_answer,
        is_correct: row.is_correct,
        time_spent: row.time_spent,
        created_at: row.created_at,
    })
}

async fn get_practice_row(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<Option<PracticeRow>> {
    let row = sqlx::query(&format!("{} WHERE guid = ? AND user_id = ?", PRACTICE_SELECT))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(practice_from_row).transpose()
}

/// Store an attempt and fold it into the user's progress in one transaction
pub async fn record_practice(
    pool: &SqlitePool,
    user_id: Uuid,
    practice: &NewPractice,
) -> Result<PracticeRecord> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO practice_history (
            guid, user_id, question_id, user_answer, is_correct, time_spent, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(practice.question_id.to_string())
    .bind(&practice.user_answer)
    .bind(practice.is_correct)
    .bind(practice.time_spent)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    record_attempt(&mut tx, user_id, practice.is_correct, practice.time_spent, now).await?;
    tx.commit().await?;

    get_practice(pool, user_id, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Practice {} vanished after insert", id)))
}

/// The user's attempts, newest first
pub async fn list_practice(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<PracticeRecord>> {
    let rows = sqlx::query(&format!(
        "{} WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        PRACTICE_SELECT
    ))
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(expand(pool, practice_from_row(row)?).await?);
    }
    Ok(records)
}

/// Load one of the user's attempts
pub async fn get_practice(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<Option<PracticeRecord>> {
    match get_practice_row(pool, user_id, id).await? {
        Some(row) => expand(pool, row).await.map(Some),
        None => Ok(None),
    }
}

/// Edit one of the user's attempts (progress totals are left as recorded)
pub async fn update_practice(
    pool: &SqlitePool,
    user_id: Uuid,
    id: Uuid,
    changes: &PracticeChanges,
) -> Result<Option<PracticeRecord>> {
    let Some(mut row) = get_practice_row(pool, user_id, id).await? else {
        return Ok(None);
    };

    if let Some(answer) = &changes.user_answer {
        row.user_answer = answer.clone();
    }
    if let Some(is_correct) = changes.is_correct {
        row.is_correct = is_correct;
    }
    if let Some(time_spent) = changes.time_spent {
        row.time_spent = time_spent;
    }

    sqlx::query(
        "UPDATE practice_history SET user_answer = ?, is_correct = ?, time_spent = ? WHERE guid = ?",
    )
    .bind(&row.user_answer)
    .bind(row.is_correct)
    .bind(row.time_spent)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    expand(pool, row).await.map(Some)
}

/// Delete one of the user's attempts; `false` if it is not theirs or does not exist
pub async fn delete_practice(pool: &SqlitePool, user_id: Uuid, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM practice_history WHERE guid = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
