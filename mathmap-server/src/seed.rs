//! Database seeding for development and demos
//!
//! Used by the `mathmap-seed` binary.

use mathmap_common::db::KnowledgeNode;
use mathmap_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::db::links::{create_link, NewLink};
use crate::db::nodes::{create_node, find_node_by_title, NewNode};
use crate::db::progress::get_or_create_progress;
use crate::db::questions::{create_question, NewQuestion};
use crate::db::users::{create_user, find_user_by_username, NewUser};

/// Rows created by a seeding run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub nodes: usize,
    pub links: usize,
    pub questions: usize,
}

/// (title, category, level, content)
const CONCEPT_MAP_NODES: &[(&str, &str, i64, &str)] = &[
    ("代数", "基础数学", 5, "研究数学符号及其运算规则的数学分支，涵盖方程、多项式与代数结构。"),
    ("方程", "代数", 4, "含有未知数的等式；求出使等式成立的未知数取值即为解方程。"),
    ("一元二次方程", "方程", 3, "形如 ax²+bx+c=0（a≠0）的方程，可用多种方法求解。"),
    ("因式分解", "代数", 3, "把多项式写成若干多项式乘积的形式，是解方程的常用手段。"),
    ("配方法", "解题方法", 2, "通过变形把方程化为完全平方式，再开方求解。"),
    ("求根公式", "公式", 2, "x=[-b±√(b²-4ac)]/(2a)，直接给出一元二次方程的根。"),
    ("判别式", "代数", 2, "Δ=b²-4ac：Δ>0 两个不等实根，Δ=0 两个相等实根，Δ<0 一对共轭复根。"),
    ("韦达定理", "定理", 3, "根与系数的关系：x₁+x₂=-b/a，x₁x₂=c/a。"),
    ("复数", "代数", 4, "引入虚数单位 i（i²=-1）后，任何一元二次方程都有解。"),
];

/// (source, target, relation)
const CONCEPT_MAP_LINKS: &[(&str, &str, &str)] = &[
    ("代数", "方程", "包含"),
    ("方程", "一元二次方程", "包含"),
    ("一元二次方程", "因式分解", "使用"),
    ("一元二次方程", "配方法", "使用"),
    ("一元二次方程", "求根公式", "使用"),
    ("一元二次方程", "判别式", "相关"),
    ("一元二次方程", "韦达定理", "相关"),
    ("一元二次方程", "复数", "相关"),
    ("判别式", "求根公式", "使用"),
    ("韦达定理", "求根公式", "相关"),
    ("复数", "求根公式", "扩展"),
];

pub const TEST_USERNAME: &str = "testuser";
pub const TEST_EMAIL: &str = "test@example.com";
pub const TEST_PASSWORD: &str = "testpass123";

/// (title, category, level, difficulty, content)
const TEST_NODES: &[(&str, &str, i64, i64, &str)] = &[
    ("基础运算", "运算", 1, 1, "加减乘除等基本运算"),
    ("分数运算", "运算", 2, 2, "分数的四则运算"),
    ("代数基础", "代数", 1, 2, "代数式的基本概念与运算"),
    ("一元二次方程", "代数", 3, 3, "一元二次方程的解法"),
    ("几何基础", "几何", 1, 1, "基本几何概念与性质"),
    ("三角函数", "几何", 4, 4, "三角函数的概念与性质"),
    ("微积分基础", "微积分", 5, 5, "导数与积分的基本概念"),
];

const TEST_LINKS: &[(&str, &str, &str)] = &[
    ("基础运算", "分数运算", "包含"),
    ("代数基础", "一元二次方程", "使用"),
    ("几何基础", "三角函数", "使用"),
    ("三角函数", "微积分基础", "相关"),
];

/// (title, content, answer, analysis, difficulty, tagged node)
const TEST_QUESTIONS: &[(&str, &str, &str, &str, i64, &str)] = &[
    ("基础加法", "计算：1 + 1 = ?", "2", "最基础的加法运算", 1, "基础运算"),
    ("分数加法", "计算：1/2 + 1/3 = ?", "5/6", "先通分再相加", 2, "分数运算"),
    ("解方程", "解方程：x² + 2x + 1 = 0", "x = -1", "利用完全平方公式", 3, "一元二次方程"),
];

/// Replace the knowledge graph with the quadratic-equation concept map
pub async fn init_knowledge_map(pool: &SqlitePool) -> Result<SeedReport> {
    // Links and question tags cascade
    sqlx::query("DELETE FROM knowledge_nodes").execute(pool).await?;

    let mut report = SeedReport::default();
    let mut nodes: HashMap<&str, Uuid> = HashMap::new();

    for &(title, category, level, content) in CONCEPT_MAP_NODES {
        let node = create_node(
            pool,
            &NewNode {
                title: title.to_string(),
                content: content.to_string(),
                category: category.to_string(),
                level,
                difficulty: 1,
            },
        )
        .await?;
        nodes.insert(title, node.id);
        report.nodes += 1;
    }

    for &(source, target, relation) in CONCEPT_MAP_LINKS {
        create_link(
            pool,
            &NewLink {
                source_id: nodes[source],
                target_id: nodes[target],
                relation_type: relation.to_string(),
            },
        )
        .await?;
        report.links += 1;
    }

    info!(nodes = report.nodes, links = report.links, "Knowledge map initialized");
    Ok(report)
}

async fn node_or_create(
    pool: &SqlitePool,
    (title, category, level, difficulty, content): (&str, &str, i64, i64, &str),
) -> Result<(KnowledgeNode, bool)> {
    if let Some(node) = find_node_by_title(pool, title).await? {
        return Ok((node, false));
    }

    let node = create_node(
        pool,
        &NewNode {
            title: title.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            level,
            difficulty,
        },
    )
    .await?;
    Ok((node, true))
}

/// Create the test user, nodes, links, questions and progress row
///
/// Idempotent: rows that already exist (matched by username, title, or
/// source/target pair) are left alone.
pub async fn create_test_data(pool: &SqlitePool) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    let user = match find_user_by_username(pool, TEST_USERNAME).await? {
        Some(user) => user,
        None => {
            report.users += 1;
            create_user(
                pool,
                &NewUser {
                    username: TEST_USERNAME.to_string(),
                    email: TEST_EMAIL.to_string(),
                    password: TEST_PASSWORD.to_string(),
                },
            )
            .await?
        }
    };

    let mut nodes: HashMap<&str, Uuid> = HashMap::new();
    for &entry in TEST_NODES {
        let (node, created) = node_or_create(pool, entry).await?;
        let title = entry.0;
        if created {
            report.nodes += 1;
        }
        nodes.insert(title, node.id);
    }

    for &(source, target, relation) in TEST_LINKS {
        let exists: Option<String> = sqlx::query_scalar(
            "SELECT guid FROM knowledge_links WHERE source_id = ? AND target_id = ?",
        )
        .bind(nodes[source].to_string())
        .bind(nodes[target].to_string())
        .fetch_optional(pool)
        .await?;

        if exists.is_none() {
            create_link(
                pool,
                &NewLink {
                    source_id: nodes[source],
                    target_id: nodes[target],
                    relation_type: relation.to_string(),
                },
            )
            .await?;
            report.links += 1;
        }
    }

    for &(title, content, answer, analysis, difficulty, node) in TEST_QUESTIONS {
        let exists: Option<String> = sqlx::query_scalar("SELECT guid FROM questions WHERE title = ?")
            .bind(title)
            .fetch_optional(pool)
            .await?;

        if exists.is_none() {
            create_question(
                pool,
                &NewQuestion {
                    title: title.to_string(),
                    content: content.to_string(),
                    answer: answer.to_string(),
                    analysis: analysis.to_string(),
                    difficulty,
                    knowledge_node_ids: vec![nodes[node]],
                },
            )
            .await?;
            report.questions += 1;
        }
    }

    get_or_create_progress(pool, user.id).await?;

    info!(
        users = report.users,
        nodes = report.nodes,
        links = report.links,
        questions = report.questions,
        "Test data created"
    );
    Ok(report)
}

/// Delete practice history, questions, links and nodes; users are kept
pub async fn reset(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for table in ["practice_history", "questions", "knowledge_links", "knowledge_nodes"] {
        info!(table, "Clearing table");
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}
