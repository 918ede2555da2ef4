//! Per-user progress rows
//!
//! Exactly one row per user, created lazily the first time it is read.

use chrono::{DateTime, Utc};
use mathmap_common::db::UserProgress;
use mathmap_common::{Error, Result};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::parse_guid;

/// Counter overrides; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressChanges {
    pub total_practices: Option<i64>,
    pub correct_practices: Option<i64>,
    pub total_time_spent: Option<i64>,
}

const PROGRESS_SELECT: &str = r#"
    SELECT guid, user_id, total_practices, correct_practices, total_time_spent,
           last_practice_at, created_at, updated_at
    FROM user_progress
"#;

fn progress_from_row(row: &SqliteRow) -> Result<UserProgress> {
    let guid: String = row.try_get("guid")?;
    let user: String = row.try_get("user_id")?;
    Ok(UserProgress {
        id: parse_guid(&guid)?,
        user: parse_guid(&user)?,
        total_practices: row.try_get("total_practices")?,
        correct_practices: row.try_get("correct_practices")?,
        total_time_spent: row.try_get("total_time_spent")?,
        last_practice_at: row.try_get::<Option<DateTime<Utc>>, _>("last_practice_at")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

/// Load the user's progress row, creating an empty one if missing
pub async fn get_or_create_progress(pool: &SqlitePool, user_id: Uuid) -> Result<UserProgress> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO user_progress (guid, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    let row = sqlx::query(&format!("{} WHERE user_id = ?", PROGRESS_SELECT))
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => progress_from_row(&row),
        None => Err(Error::NotFound(format!("Progress for user {}", user_id))),
    }
}

/// Fold one practice attempt into the user's totals
///
/// Runs inside the caller's transaction so the attempt and the totals commit together.
pub(crate) async fn record_attempt(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: Uuid,
    is_correct: bool,
    time_spent: i64,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_progress (
            guid, user_id, total_practices, correct_practices, total_time_spent,
            last_practice_at, created_at, updated_at
        ) VALUES (?, ?, 1, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            total_practices = total_practices + 1,
            correct_practices = correct_practices + excluded.correct_practices,
            total_time_spent = total_time_spent + excluded.total_time_spent,
            last_practice_at = excluded.last_practice_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id.to_string())
    .bind(i64::from(is_correct))
    .bind(time_spent)
    .bind(at)
    .bind(at)
    .bind(at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Overwrite counters on the user's row (created first if missing)
pub async fn update_progress(
    pool: &SqlitePool,
    user_id: Uuid,
    changes: &ProgressChanges,
) -> Result<UserProgress> {
    let mut progress = get_or_create_progress(pool, user_id).await?;

    if let Some(total) = changes.total_practices {
        progress.total_practices = total;
    }
    if let Some(correct) = changes.correct_practices {
        progress.correct_practices = correct;
    }
    if let Some(time) = changes.total_time_spent {
        progress.total_time_spent = time;
    }
    progress.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE user_progress
        SET total_practices = ?, correct_practices = ?, total_time_spent = ?, updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(progress.total_practices)
    .bind(progress.correct_practices)
    .bind(progress.total_time_spent)
    .bind(progress.updated_at)
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    Ok(progress)
}

/// Remove the user's row; the next read recreates it empty
pub async fn delete_progress(pool: &SqlitePool, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM user_progress WHERE user_id = ?")
        .bind(user_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::{create_user, NewUser};
    use mathmap_common::db::init_memory_database;

    async fn user(pool: &SqlitePool) -> Uuid {
        create_user(
            pool,
            &NewUser {
                username: "testuser".to_string(),
                email: "test@example.com".to_string(),
                password: "testpass123".to_string(),
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_lazy_creation_is_stable() {
        let pool = init_memory_database().await.unwrap();
        let user_id = user(&pool).await;

        let first = get_or_create_progress(&pool, user_id).await.unwrap();
        let second = get_or_create_progress(&pool, user_id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.total_practices, 0);
        assert_eq!(first.mastery_level(), 0.0);
        assert!(first.last_practice_at.is_none());
    }

    #[tokio::test]
    async fn test_record_attempt_accumulates() {
        let pool = init_memory_database().await.unwrap();
        let user_id = user(&pool).await;

        for (correct, secs) in [(true, 30), (false, 45), (true, 15)] {
            let mut tx = pool.begin().await.unwrap();
            record_attempt(&mut tx, user_id, correct, secs, Utc::now()).await.unwrap();
            tx.commit().await.unwrap();
        }

        let progress = get_or_create_progress(&pool, user_id).await.unwrap();
        assert_eq!(progress.total_practices, 3);
        assert_eq!(progress.correct_practices, 2);
        assert_eq!(progress.total_time_spent, 90);
        assert!(progress.last_practice_at.is_some());
        assert_eq!(progress.mastery_level(), 66.67);
    }

    #[tokio::test]
    async fn test_update_rejects_correct_above_total() {
        let pool = init_memory_database().await.unwrap();
        let user_id = user(&pool).await;

        let changes = ProgressChanges {
            total_practices: Some(2),
            correct_practices: Some(3),
            ..Default::default()
        };
        assert!(update_progress(&pool, user_id, &changes).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_then_recreate() {
        let pool = init_memory_database().await.unwrap();
        let user_id = user(&pool).await;
        let first = get_or_create_progress(&pool, user_id).await.unwrap();

        assert!(delete_progress(&pool, user_id).await.unwrap());
        let again = get_or_create_progress(&pool, user_id).await.unwrap();

        assert_ne!(first.id, again.id);
    }
}
