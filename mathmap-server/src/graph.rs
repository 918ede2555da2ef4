//! Knowledge graph export
//!
//! Reshapes the stored nodes and links into the node/link/category document
//! consumed by the graph visualization.

use mathmap_common::db::{KnowledgeLink, KnowledgeNode};
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

/// One vertex of the exported graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: Uuid,
    pub name: String,
    /// Node level (depth in the concept hierarchy)
    pub value: i64,
    pub category: String,
    pub content: String,
    pub difficulty: i64,
}

/// One directed edge of the exported graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLink {
    pub source: Uuid,
    pub target: Uuid,
    pub value: i64,
    pub relation_type: String,
}

/// Full graph snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphDocument {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
    /// Distinct node categories, sorted
    pub categories: Vec<String>,
}

/// Build the export document from every node and link
pub fn export_graph(nodes: &[KnowledgeNode], links: &[KnowledgeLink]) -> GraphDocument {
    let categories: BTreeSet<&str> = nodes.iter().map(|n| n.category.as_str()).collect();

    GraphDocument {
        nodes: nodes
            .iter()
            .map(|node| GraphNode {
                id: node.id,
                name: node.title.clone(),
                value: node.level,
                category: node.category.clone(),
                content: node.content.clone(),
                difficulty: node.difficulty,
            })
            .collect(),
        links: links
            .iter()
            .map(|link| GraphLink {
                source: link.source_id,
                target: link.target_id,
                value: 1,
                relation_type: link.relation_type.clone(),
            })
            .collect(),
        categories: categories.into_iter().map(str::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(title: &str, category: &str, level: i64) -> KnowledgeNode {
        let now = Utc::now();
        KnowledgeNode {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: String::new(),
            category: category.to_string(),
            level,
            difficulty: 2,
            created_at: now,
            updated_at: now,
        }
    }

    fn link(source: &KnowledgeNode, target: &KnowledgeNode, relation: &str) -> KnowledgeLink {
        KnowledgeLink {
            id: Uuid::new_v4(),
            source_id: source.id,
            target_id: target.id,
            relation_type: relation.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_graph() {
        let doc = export_graph(&[], &[]);
        assert!(doc.nodes.is_empty());
        assert!(doc.links.is_empty());
        assert!(doc.categories.is_empty());
    }

    #[test]
    fn test_counts_and_distinct_categories() {
        let algebra = node("代数", "基础概念", 1);
        let equation = node("方程", "基础概念", 2);
        let quadratic = node("一元二次方程", "方程类型", 3);
        let factoring = node("因式分解", "解题方法", 4);
        let nodes = vec![algebra.clone(), equation.clone(), quadratic.clone(), factoring.clone()];
        let links = vec![
            link(&algebra, &equation, "包含"),
            link(&equation, &quadratic, "包含"),
            link(&quadratic, &factoring, "使用"),
        ];

        let doc = export_graph(&nodes, &links);

        assert_eq!(doc.nodes.len(), 4);
        assert_eq!(doc.links.len(), 3);
        assert_eq!(doc.categories.len(), 3);
        for category in ["基础概念", "方程类型", "解题方法"] {
            assert!(doc.categories.iter().any(|c| c == category));
        }
    }

    #[test]
    fn test_field_mapping() {
        let a = node("判别式", "重要概念", 4);
        let b = node("求根公式", "解题方法", 4);
        let doc = export_graph(&[a.clone(), b.clone()], &[link(&a, &b, "使用")]);

        assert_eq!(doc.nodes[0].name, "判别式");
        assert_eq!(doc.nodes[0].value, 4);
        assert_eq!(doc.nodes[0].difficulty, 2);
        assert_eq!(doc.links[0].source, a.id);
        assert_eq!(doc.links[0].target, b.id);
        assert_eq!(doc.links[0].value, 1);
        assert_eq!(doc.links[0].relation_type, "使用");
    }

    #[test]
    fn test_ids_serialize_as_strings() {
        let a = node("复数", "扩展概念", 5);
        let json = serde_json::to_value(export_graph(&[a.clone()], &[])).unwrap();
        assert_eq!(json["nodes"][0]["id"], a.id.to_string());
    }
}
