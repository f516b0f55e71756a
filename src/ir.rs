//! Compiled diagram graph handed to the renderer.

use crate::classify::EntityClass;
use crate::layout::handles::Handle;
use crate::schema::{Column, Participation, Point, RelType};
use serde::{Deserialize, Serialize};

pub const ENTITY_PREFIX: &str = "entity-";
pub const ATTRIBUTE_PREFIX: &str = "attr-";
pub const RELATIONSHIP_PREFIX: &str = "relationship-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagramMode {
    /// Chen-style: entities, attribute satellites and relationship nodes.
    #[default]
    Conceptual,
    /// Entities joined directly, one edge per relationship.
    Logical,
}

impl DiagramMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "conceptual" => Some(Self::Conceptual),
            "logical" => Some(Self::Logical),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conceptual => "conceptual",
            Self::Logical => "logical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn entity_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Entity(_)))
    }

    pub fn attribute_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Attribute(_)))
    }

    pub fn relationship_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Relationship(_)))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    pub position: Point,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum NodeKind {
    Entity(EntityData),
    Attribute(AttributeData),
    Relationship(RelationshipData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    pub name: String,
    pub class: EntityClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_lookup_table: bool,
    pub column_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assumptions_made: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeData {
    pub entity: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_nullable: bool,
    pub is_multivalued: bool,
    pub is_derived: bool,
    pub is_composite: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<Column>,
}

impl AttributeData {
    pub fn from_column(entity: &str, column: &Column) -> Self {
        Self {
            entity: entity.to_string(),
            name: column.display_name().to_string(),
            data_type: column.data_type.clone(),
            is_primary_key: column.is_primary_key,
            is_foreign_key: column.is_foreign_key,
            is_nullable: column.is_nullable,
            is_multivalued: column.is_multivalued,
            is_derived: column.is_derived,
            is_composite: column.is_composite,
            sub_attributes: column.sub_attributes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipData {
    pub name: String,
    /// Structured identity, so edits never need to re-parse the node ID.
    pub key: RelationshipKey,
    pub relationship_type: RelType,
    pub is_identifying: bool,
    pub source_cardinality: String,
    pub target_cardinality: String,
    pub source_participation: Participation,
    pub target_participation: Participation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Column>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assumptions_made: Vec<String>,
}

/// Identity of a relationship node: its name and the two tables it joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipKey {
    pub relationship_name: String,
    pub source_entity: String,
    pub target_entity: String,
}

impl RelationshipKey {
    pub fn new(
        relationship_name: impl Into<String>,
        source_entity: impl Into<String>,
        target_entity: impl Into<String>,
    ) -> Self {
        Self {
            relationship_name: relationship_name.into(),
            source_entity: source_entity.into(),
            target_entity: target_entity.into(),
        }
    }

    pub fn node_id(&self) -> String {
        format!(
            "{RELATIONSHIP_PREFIX}{}-{}-to-{}",
            self.relationship_name, self.source_entity, self.target_entity
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<Handle>,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub data: EdgeData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Attribute,
    Relationship,
    Logical,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    pub source_cardinality: String,
    pub target_cardinality: String,
    pub source_participation: Participation,
    pub target_participation: Participation,
    pub is_identifying: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelType>,
}

pub fn entity_node_id(table: &str) -> String {
    format!("{ENTITY_PREFIX}{table}")
}

/// `attr-entity-<table>-<column>`; blank column names use the column index.
pub fn attribute_node_id(entity_id: &str, column: &Column, index: usize) -> String {
    if column.name.trim().is_empty() {
        format!("{ATTRIBUTE_PREFIX}{entity_id}-{index}")
    } else {
        format!("{ATTRIBUTE_PREFIX}{entity_id}-{}", column.name)
    }
}

pub fn entity_name_from_node_id(id: &str) -> Option<&str> {
    id.strip_prefix(ENTITY_PREFIX).filter(|name| !name.is_empty())
}
