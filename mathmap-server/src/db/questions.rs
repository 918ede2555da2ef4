//! Question persistence and knowledge-node tagging

use chrono::{DateTime, Utc};
use mathmap_common::db::{KnowledgeNode, Question};
use mathmap_common::{Error, Result};
use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::nodes::node_from_row;
use super::parse_guid;

/// Fields for a new question
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
    pub title: String,
    pub content: String,
    pub answer: String,
    #[serde(default)]
    pub analysis: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: i64,
    #[serde(default)]
    pub knowledge_node_ids: Vec<Uuid>,
}

/// Partial update; `knowledge_node_ids` replaces the whole tag set when present
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub answer: Option<String>,
    pub analysis: Option<String>,
    pub difficulty: Option<i64>,
    pub knowledge_node_ids: Option<Vec<Uuid>>,
}

fn default_difficulty() -> i64 {
    1
}

/// Question row without its tags
struct QuestionRow {
    id: Uuid,
    title: String,
    content: String,
    answer: String,
    analysis: String,
    difficulty: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QuestionRow {
    fn with_nodes(self, knowledge_nodes: Vec<KnowledgeNode>) -> Question {
        Question {
            id: self.id,
            title: self.title,
            content: self.content,
            answer: self.answer,
            analysis: self.analysis,
            difficulty: self.difficulty,
            knowledge_nodes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn question_from_row(row: &SqliteRow) -> Result<QuestionRow> {
    let guid: String = row.try_get("guid")?;
    Ok(QuestionRow {
        id: parse_guid(&guid)?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        answer: row.try_get("answer")?,
        analysis: row.try_get("analysis")?,
        difficulty: row.try_get("difficulty")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

const QUESTION_SELECT: &str = "SELECT guid, title, content, answer, analysis, difficulty, created_at, updated_at FROM questions";

/// Tags of every question, keyed by question id
async fn load_all_tags(pool: &SqlitePool) -> Result<HashMap<Uuid, Vec<KnowledgeNode>>> {
    let rows = sqlx::query(
        r#"
        SELECT qkn.question_id, n.guid, n.title, n.content, n.category, n.level,
               n.difficulty, n.created_at, n.updated_at
        FROM question_knowledge_nodes qkn
        JOIN knowledge_nodes n ON n.guid = qkn.node_id
        ORDER BY n.rowid
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut tags: HashMap<Uuid, Vec<KnowledgeNode>> = HashMap::new();
    for row in &rows {
        let question_id: String = row.try_get("question_id")?;
        tags.entry(parse_guid(&question_id)?)
            .or_default()
            .push(node_from_row(row)?);
    }
    Ok(tags)
}

async fn load_tags(pool: &SqlitePool, question_id: Uuid) -> Result<Vec<KnowledgeNode>> {
    let rows = sqlx::query(
        r#"
        SELECT n.guid, n.title, n.content, n.category, n.level,
               n.difficulty, n.created_at, n.updated_at
        FROM question_knowledge_nodes qkn
        JOIN knowledge_nodes n ON n.guid = qkn.node_id
        WHERE qkn.question_id = ?
        ORDER BY n.rowid
        "#,
    )
    .bind(question_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(node_from_row).collect()
}

async fn replace_tags(
    tx: &mut Transaction<'_, Sqlite>,
    question_id: Uuid,
    node_ids: &[Uuid],
) -> Result<()> {
    sqlx::query("DELETE FROM question_knowledge_nodes WHERE question_id = ?")
        .bind(question_id.to_string())
        .execute(&mut **tx)
        .await?;

    for node_id in node_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO question_knowledge_nodes (question_id, node_id) VALUES (?, ?)",
        )
        .bind(question_id.to_string())
        .bind(node_id.to_string())
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// All questions in insertion order, tags expanded
pub async fn list_questions(pool: &SqlitePool) -> Result<Vec<Question>> {
    list_questions_limited(pool, None).await
}

/// First `limit` questions in insertion order (all when `None`)
pub async fn list_questions_limited(pool: &SqlitePool, limit: Option<i64>) -> Result<Vec<Question>> {
    let sql = match limit {
        Some(limit) => format!("{} ORDER BY rowid LIMIT {}", QUESTION_SELECT, limit.max(0)),
        None => format!("{} ORDER BY rowid", QUESTION_SELECT),
    };
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    let mut tags = load_all_tags(pool).await?;

    rows.iter()
        .map(|row| {
            let question = question_from_row(row)?;
            let nodes = tags.remove(&question.id).unwrap_or_default();
            Ok(question.with_nodes(nodes))
        })
        .collect()
}

/// Load question by id
pub async fn get_question(pool: &SqlitePool, id: Uuid) -> Result<Option<Question>> {
    let row = sqlx::query(&format!("{} WHERE guid = ?", QUESTION_SELECT))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let question = question_from_row(&row)?;
            let nodes = load_tags(pool, question.id).await?;
            Ok(Some(question.with_nodes(nodes)))
        }
        None => Ok(None),
    }
}

/// Insert a question and its tags in one transaction
pub async fn create_question(pool: &SqlitePool, question: &NewQuestion) -> Result<Question> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO questions (
            guid, title, content, answer, analysis, difficulty, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&question.title)
    .bind(&question.content)
    .bind(&question.answer)
    .bind(&question.analysis)
    .bind(question.difficulty)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    replace_tags(&mut tx, id, &question.knowledge_node_ids).await?;
    tx.commit().await?;

    get_question(pool, id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Question {} vanished after insert", id)))
}

/// Apply a partial update; `Ok(None)` when the question does not exist
pub async fn update_question(
    pool: &SqlitePool,
    id: Uuid,
    changes: &QuestionChanges,
) -> Result<Option<Question>> {
    let Some(mut question) = get_question(pool, id).await? else {
        return Ok(None);
    };

    if let Some(title) = &changes.title {
        question.title = title.clone();
    }
    if let Some(content) = &changes.content {
        question.content = content.clone();
    }
    if let Some(answer) = &changes.answer {
        question.answer = answer.clone();
    }
    if let Some(analysis) = &changes.analysis {
        question.analysis = analysis.clone();
    }
    if let Some(difficulty) = changes.difficulty {
        question.difficulty = difficulty;
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE questions
        SET title = ?, content = ?, answer = ?, analysis = ?, difficulty = ?, updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&question.title)
    .bind(&question.content)
    .bind(&question.answer)
    .bind(&question.analysis)
    .bind(question.difficulty)
    .bind(Utc::now())
    .bind(id.to_string())
    .execute(&mut *tx)
    .await?;

    if let Some(node_ids) = &changes.knowledge_node_ids {
        replace_tags(&mut tx, id, node_ids).await?;
    }
    tx.commit().await?;

    get_question(pool, id).await
}

/// Delete a question (tags and practice rows cascade); `false` if it did not exist
pub async fn delete_question(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM questions WHERE guid = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
