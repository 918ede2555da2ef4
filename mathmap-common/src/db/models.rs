//! Database models
//!
//! Serialized forms match the JSON the API returns: `guid` columns surface as
//! `id`, related rows are nested where the API nests them.

use crate::progress::{calculate_mastery_level, round_percentage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// Registered user (credentials are never part of this struct)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    pub date_joined: DateTime<Utc>,
}

/// Math concept in the knowledge graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: String,
    /// Ordinal depth in the concept hierarchy
    pub level: i64,
    /// 1 (入门) through 5 (专家)
    pub difficulty: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Directed, labeled edge between two nodes (row form)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeLink {
    pub id: Uuid,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub relation_type: String,
    pub created_at: DateTime<Utc>,
}

/// Edge with both endpoints expanded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeLinkDetail {
    pub id: Uuid,
    pub source: KnowledgeNode,
    pub target: KnowledgeNode,
    pub relation_type: String,
    pub created_at: DateTime<Utc>,
}

/// Practice question with its tagged knowledge nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub answer: String,
    pub analysis: String,
    /// 1 (简单) through 3 (困难)
    pub difficulty: i64,
    pub knowledge_nodes: Vec<KnowledgeNode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One practice attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PracticeRecord {
    pub id: Uuid,
    pub user: Uuid,
    pub question: Question,
    pub user_answer: String,
    pub is_correct: bool,
    /// Seconds
    pub time_spent: i64,
    pub created_at: DateTime<Utc>,
}

/// Per-user aggregate of practice attempts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProgress {
    pub id: Uuid,
    pub user: Uuid,
    pub total_practices: i64,
    pub correct_practices: i64,
    /// Seconds
    pub total_time_spent: i64,
    pub last_practice_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgress {
    /// Mastery percentage rounded to two decimals
    pub fn mastery_level(&self) -> f64 {
        round_percentage(calculate_mastery_level(
            self.correct_practices,
            self.total_practices,
        ))
    }
}

/// Progress row as returned by the API (adds the derived mastery level)
#[derive(Debug, Clone, Serialize)]
pub struct UserProgressView {
    #[serde(flatten)]
    pub progress: UserProgress,
    pub mastery_level: f64,
}

impl From<UserProgress> for UserProgressView {
    fn from(progress: UserProgress) -> Self {
        let mastery_level = progress.mastery_level();
        Self {
            progress,
            mastery_level,
        }
    }
}
