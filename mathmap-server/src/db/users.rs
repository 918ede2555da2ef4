//! User persistence
//!
//! Passwords are hashed here; plaintext never reaches the database.

use chrono::{DateTime, Utc};
use mathmap_common::api::auth::{hash_password, verify_password};
use mathmap_common::db::User;
use mathmap_common::{Error, Result};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_guid;

/// Registration / creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<String>,
}

const USER_COLUMNS: &str = "guid, username, email, avatar, date_joined";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let guid: String = row.try_get("guid")?;
    Ok(User {
        id: parse_guid(&guid)?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        avatar: row.try_get("avatar")?,
        date_joined: row.try_get::<DateTime<Utc>, _>("date_joined")?,
    })
}

/// Insert a user with a freshly hashed password
pub async fn create_user(pool: &SqlitePool, user: &NewUser) -> Result<User> {
    let password_hash = hash_password(&user.password).map_err(|e| Error::Internal(e.to_string()))?;
    let now = Utc::now();
    let created = User {
        id: Uuid::new_v4(),
        username: user.username.clone(),
        email: user.email.clone(),
        avatar: None,
        date_joined: now,
    };

    sqlx::query(
        r#"
        INSERT INTO users (
            guid, username, email, password_hash, avatar, date_joined, updated_at
        ) VALUES (?, ?, ?, ?, NULL, ?, ?)
        "#,
    )
    .bind(created.id.to_string())
    .bind(&created.username)
    .bind(&created.email)
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(created)
}

/// All users in registration order
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("SELECT {} FROM users ORDER BY rowid", USER_COLUMNS))
        .fetch_all(pool)
        .await?;

    rows.iter().map(user_from_row).collect()
}

/// Load user by id
pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE guid = ?", USER_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Load user by username
pub async fn find_user_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
        .bind(username)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Check username/password; returns the user on success
pub async fn authenticate(pool: &SqlitePool, username: &str, password: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!(
        "SELECT {}, password_hash FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let hash: String = row.try_get("password_hash")?;
    if verify_password(password, &hash) {
        user_from_row(&row).map(Some)
    } else {
        Ok(None)
    }
}

/// Apply a partial update; `Ok(None)` when the user does not exist
pub async fn update_user(pool: &SqlitePool, id: Uuid, changes: &UserChanges) -> Result<Option<User>> {
    let Some(mut user) = get_user(pool, id).await? else {
        return Ok(None);
    };

    if let Some(username) = &changes.username {
        user.username = username.clone();
    }
    if let Some(email) = &changes.email {
        user.email = email.clone();
    }
    if let Some(avatar) = &changes.avatar {
        user.avatar = Some(avatar.clone()).filter(|a| !a.is_empty());
    }

    sqlx::query("UPDATE users SET username = ?, email = ?, avatar = ?, updated_at = ? WHERE guid = ?")
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.avatar)
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if let Some(password) = &changes.password {
        let password_hash = hash_password(password).map_err(|e| Error::Internal(e.to_string()))?;
        sqlx::query("UPDATE users SET password_hash = ? WHERE guid = ?")
            .bind(&password_hash)
            .bind(id.to_string())
            .execute(pool)
            .await?;
    }

    Ok(Some(user))
}

/// Delete a user (practice rows and progress cascade); `false` if it did not exist
pub async fn delete_user(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathmap_common::db::init_memory_database;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password: "testpass123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_authenticate() {
        let pool = init_memory_database().await.unwrap();
        let created = create_user(&pool, &new_user("testuser")).await.unwrap();

        let found = authenticate(&pool, "testuser", "testpass123").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(created.id));

        assert!(authenticate(&pool, "testuser", "wrong").await.unwrap().is_none());
        assert!(authenticate(&pool, "nobody", "testpass123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_stored_as_argon2_phc() {
        let pool = init_memory_database().await.unwrap();
        create_user(&pool, &new_user("carol")).await.unwrap();

        let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE username = ?")
            .bind("carol")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("testpass123"));
    }

    #[tokio::test]
    async fn test_password_change() {
        let pool = init_memory_database().await.unwrap();
        let created = create_user(&pool, &new_user("alice")).await.unwrap();

        let changes = UserChanges {
            password: Some("newpass".to_string()),
            ..Default::default()
        };
        update_user(&pool, created.id, &changes).await.unwrap();

        assert!(authenticate(&pool, "alice", "testpass123").await.unwrap().is_none());
        assert!(authenticate(&pool, "alice", "newpass").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let pool = init_memory_database().await.unwrap();
        create_user(&pool, &new_user("bob")).await.unwrap();

        let mut dup = new_user("bob");
        dup.email = "other@example.com".to_string();
        assert!(create_user(&pool, &dup).await.is_err());
    }
}
