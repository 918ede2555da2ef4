//! Knowledge link persistence
//!
//! (source, target, relation_type) is unique; both endpoints must exist.

use chrono::{DateTime, Utc};
use mathmap_common::db::{KnowledgeLink, KnowledgeLinkDetail, KnowledgeNode};
use mathmap_common::{Error, Result};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use super::nodes::{get_node, list_nodes};
use super::parse_guid;

/// Fields for a new link
#[derive(Debug, Clone, Deserialize)]
pub struct NewLink {
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub relation_type: String,
}

/// Partial update; `None` leaves the column unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkChanges {
    pub source_id: Option<Uuid>,
    pub target_id: Option<Uuid>,
    pub relation_type: Option<String>,
}

fn link_from_row(row: &SqliteRow) -> Result<KnowledgeLink> {
    let guid: String = row.try_get("guid")?;
    let source: String = row.try_get("source_id")?;
    let target: String = row.try_get("target_id")?;
    Ok(KnowledgeLink {
        id: parse_guid(&guid)?,
        source_id: parse_guid(&source)?,
        target_id: parse_guid(&target)?,
        relation_type: row.try_get("relation_type")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

/// All links in insertion order (endpoint ids only)
pub async fn list_link_rows(pool: &SqlitePool) -> Result<Vec<KnowledgeLink>> {
    let rows = sqlx::query(
        "SELECT guid, source_id, target_id, relation_type, created_at FROM knowledge_links ORDER BY rowid",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(link_from_row).collect()
}

async fn get_link_row(pool: &SqlitePool, id: Uuid) -> Result<Option<KnowledgeLink>> {
    let row = sqlx::query(
        "SELECT guid, source_id, target_id, relation_type, created_at FROM knowledge_links WHERE guid = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(link_from_row).transpose()
}

fn expand(link: KnowledgeLink, nodes: &HashMap<Uuid, KnowledgeNode>) -> Result<KnowledgeLinkDetail> {
    let lookup = |id: Uuid| {
        nodes
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("Link {} references missing node {}", link.id, id)))
    };

    Ok(KnowledgeLinkDetail {
        id: link.id,
        source: lookup(link.source_id)?,
        target: lookup(link.target_id)?,
        relation_type: link.relation_type.clone(),
        created_at: link.created_at,
    })
}

/// All links with both endpoints expanded
pub async fn list_links(pool: &SqlitePool) -> Result<Vec<KnowledgeLinkDetail>> {
    let nodes: HashMap<Uuid, KnowledgeNode> = list_nodes(pool)
        .await?
        .into_iter()
        .map(|n| (n.id, n))
        .collect();

    list_link_rows(pool)
        .await?
        .into_iter()
        .map(|link| expand(link, &nodes))
        .collect()
}

/// Load one link with both endpoints expanded
pub async fn get_link(pool: &SqlitePool, id: Uuid) -> Result<Option<KnowledgeLinkDetail>> {
    let Some(link) = get_link_row(pool, id).await? else {
        return Ok(None);
    };

    let mut nodes = HashMap::new();
    for node_id in [link.source_id, link.target_id] {
        if let Some(node) = get_node(pool, node_id).await? {
            nodes.insert(node.id, node);
        }
    }

    expand(link, &nodes).map(Some)
}

/// Insert a link
pub async fn create_link(pool: &SqlitePool, link: &NewLink) -> Result<KnowledgeLinkDetail> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO knowledge_links (guid, source_id, target_id, relation_type, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(link.source_id.to_string())
    .bind(link.target_id.to_string())
    .bind(&link.relation_type)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    get_link(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Link {} vanished after insert", id)))
}

/// Apply a partial update; `Ok(None)` when the link does not exist
pub async fn update_link(
    pool: &SqlitePool,
    id: Uuid,
    changes: &LinkChanges,
) -> Result<Option<KnowledgeLinkDetail>> {
    let Some(mut link) = get_link_row(pool, id).await? else {
        return Ok(None);
    };

    if let Some(source_id) = changes.source_id {
        link.source_id = source_id;
    }
    if let Some(target_id) = changes.target_id {
        link.target_id = target_id;
    }
    if let Some(relation_type) = &changes.relation_type {
        link.relation_type = relation_type.clone();
    }

    sqlx::query(
        "UPDATE knowledge_links SET source_id = ?, target_id = ?, relation_type = ? WHERE guid = ?",
    )
    .bind(link.source_id.to_string())
    .bind(link.target_id.to_string())
    .bind(&link.relation_type)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    get_link(pool, id).await
}

/// Delete a link; `false` if it did not exist
pub async fn delete_link(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM knowledge_links WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::nodes::{create_node, NewNode};
    use mathmap_common::db::init_memory_database;

    async fn node(pool: &SqlitePool, title: &str) -> KnowledgeNode {
        create_node(
            pool,
            &NewNode {
                title: title.to_string(),
                content: String::new(),
                category: "代数".to_string(),
                level: 1,
                difficulty: 1,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_link_expands_endpoints() {
        let pool = init_memory_database().await.unwrap();
        let a = node(&pool, "代数").await;
        let b = node(&pool, "方程").await;

        let link = create_link(
            &pool,
            &NewLink {
                source_id: a.id,
                target_id: b.id,
                relation_type: "包含".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(link.source.title, "代数");
        assert_eq!(link.target.title, "方程");
        assert_eq!(link.relation_type, "包含");
        assert_eq!(list_links(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_triple_rejected() {
        let pool = init_memory_database().await.unwrap();
        let a = node(&pool, "A").await;
        let b = node(&pool, "B").await;
        let new_link = NewLink {
            source_id: a.id,
            target_id: b.id,
            relation_type: "使用".to_string(),
        };

        create_link(&pool, &new_link).await.unwrap();
        let err = create_link(&pool, &new_link).await.unwrap_err();

        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test]
    async fn test_update_link_relation() {
        let pool = init_memory_database().await.unwrap();
        let a = node(&pool, "A").await;
        let b = node(&pool, "B").await;
        let link = create_link(
            &pool,
            &NewLink {
                source_id: a.id,
                target_id: b.id,
                relation_type: "使用".to_string(),
            },
        )
        .await
        .unwrap();

        let changes = LinkChanges {
            relation_type: Some("相关".to_string()),
            ..Default::default()
        };
        let updated = update_link(&pool, link.id, &changes).await.unwrap().unwrap();

        assert_eq!(updated.relation_type, "相关");
        assert_eq!(updated.source.id, a.id);
    }
}
