//! Knowledge node persistence

use chrono::{DateTime, Utc};
use mathmap_common::db::KnowledgeNode;
use mathmap_common::Result;
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_guid;

/// Fields for a new node
#[derive(Debug, Clone, Deserialize)]
pub struct NewNode {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default = "default_level")]
    pub level: i64,
    #[serde(default = "default_difficulty")]
    pub difficulty: i64,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub level: Option<i64>,
    pub difficulty: Option<i64>,
}

fn default_level() -> i64 {
    1
}

fn default_difficulty() -> i64 {
    1
}

const NODE_COLUMNS: &str =
    "guid, title, content, category, level, difficulty, created_at, updated_at";

/// Map a `knowledge_nodes` row (selected with [`NODE_COLUMNS`]) to a model
pub(crate) fn node_from_row(row: &SqliteRow) -> Result<KnowledgeNode> {
    let guid: String = row.try_get("guid")?;
    Ok(KnowledgeNode {
        id: parse_guid(&guid)?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        category: row.try_get("category")?,
        level: row.try_get("level")?,
        difficulty: row.try_get("difficulty")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

/// All nodes in insertion order
pub async fn list_nodes(pool: &SqlitePool) -> Result<Vec<KnowledgeNode>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM knowledge_nodes ORDER BY rowid",
        NODE_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(node_from_row).collect()
}

/// Load node by id
pub async fn get_node(pool: &SqlitePool, id: Uuid) -> Result<Option<KnowledgeNode>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM knowledge_nodes WHERE guid = ?",
        NODE_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(node_from_row).transpose()
}

/// Load node by its (unique) title
pub async fn find_node_by_title(pool: &SqlitePool, title: &str) -> Result<Option<KnowledgeNode>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM knowledge_nodes WHERE title = ?",
        NODE_COLUMNS
    ))
    .bind(title)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(node_from_row).transpose()
}

/// Insert a node
pub async fn create_node(pool: &SqlitePool, node: &NewNode) -> Result<KnowledgeNode> {
    let now = Utc::now();
    let created = KnowledgeNode {
        id: Uuid::new_v4(),
        title: node.title.clone(),
        content: node.content.clone(),
        category: node.category.clone(),
        level: node.level,
        difficulty: node.difficulty,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO knowledge_nodes (
            guid, title, content, category, level, difficulty, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(created.id.to_string())
    .bind(&created.title)
    .bind(&created.content)
    .bind(&created.category)
    .bind(created.level)
    .bind(created.difficulty)
    .bind(created.created_at)
    .bind(created.updated_at)
    .execute(pool)
    .await?;

    Ok(created)
}

/// Apply a partial update; `Ok(None)` when the node does not exist
pub async fn update_node(
    pool: &SqlitePool,
    id: Uuid,
    changes: &NodeChanges,
) -> Result<Option<KnowledgeNode>> {
    let Some(mut node) = get_node(pool, id).await? else {
        return Ok(None);
    };

    if let Some(title) = &changes.title {
        node.title = title.clone();
    }
    if let Some(content) = &changes.content {
        node.content = content.clone();
    }
    if let Some(category) = &changes.category {
        node.category = category.clone();
    }
    if let Some(level) = changes.level {
        node.level = level;
    }
    if let Some(difficulty) = changes.difficulty {
        node.difficulty = difficulty;
    }
    node.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE knowledge_nodes
        SET title = ?, content = ?, category = ?, level = ?, difficulty = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&node.title)
    .bind(&node.content)
    .bind(&node.category)
    .bind(node.level)
    .bind(node.difficulty)
    .bind(node.updated_at)
    .bind(node.id.to_string())
    .execute(pool)
    .await?;

    Ok(Some(node))
}

/// Delete a node (links and question tags cascade); `false` if it did not exist
pub async fn delete_node(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM knowledge_nodes WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathmap_common::db::init_memory_database;

    fn new_node(title: &str, category: &str) -> NewNode {
        NewNode {
            title: title.to_string(),
            content: format!("{}的内容", title),
            category: category.to_string(),
            level: 2,
            difficulty: 3,
        }
    }

    #[tokio::test]
    async fn test_create_and_load_node() {
        let pool = init_memory_database().await.unwrap();

        let created = create_node(&pool, &new_node("方程", "代数")).await.unwrap();
        let loaded = get_node(&pool, created.id).await.unwrap().expect("node exists");

        assert_eq!(loaded.title, "方程");
        assert_eq!(loaded.category, "代数");
        assert_eq!(loaded.level, 2);
        assert_eq!(loaded.difficulty, 3);
    }

    #[tokio::test]
    async fn test_update_node_partial() {
        let pool = init_memory_database().await.unwrap();
        let created = create_node(&pool, &new_node("配方法", "解题方法")).await.unwrap();

        let changes = NodeChanges {
            level: Some(4),
            ..Default::default()
        };
        let updated = update_node(&pool, created.id, &changes).await.unwrap().unwrap();

        assert_eq!(updated.level, 4);
        assert_eq!(updated.title, "配方法");
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_node() {
        let pool = init_memory_database().await.unwrap();
        let result = update_node(&pool, Uuid::new_v4(), &NodeChanges::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_node() {
        let pool = init_memory_database().await.unwrap();
        let created = create_node(&pool, &new_node("复数", "代数")).await.unwrap();

        assert!(delete_node(&pool, created.id).await.unwrap());
        assert!(!delete_node(&pool, created.id).await.unwrap());
        assert!(list_nodes(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_title() {
        let pool = init_memory_database().await.unwrap();
        create_node(&pool, &new_node("判别式", "代数")).await.unwrap();

        assert!(find_node_by_title(&pool, "判别式").await.unwrap().is_some());
        assert!(find_node_by_title(&pool, "不存在").await.unwrap().is_none());
    }
}
