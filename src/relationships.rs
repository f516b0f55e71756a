//! Relationship nodes and the edge pair joining them to their entities.

use crate::cardinality::{Side, cardinality_notation, participation};
use crate::diagnostics::Diagnostic;
use crate::ir::{Edge, EdgeData, EdgeKind, Node, NodeKind, RelationshipData, RelationshipKey};
use crate::layout::LayoutConfig;
use crate::layout::grid::first_finite;
use crate::schema::{Point, Relationship};
use std::collections::HashMap;

/// An entity node already placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedEntity {
    pub id: String,
    pub position: Point,
}

/// Table name -> placed entity.
pub type EntityIndex = HashMap<String, PlacedEntity>;

pub fn relationship_key(index: usize, rel: &Relationship) -> RelationshipKey {
    RelationshipKey::new(
        rel.effective_name(index),
        rel.source_table.clone(),
        rel.target_table.clone(),
    )
}

/// Both endpoint entities, or a diagnostic naming the first missing table.
pub fn resolve_endpoints<'a>(
    index: usize,
    rel: &Relationship,
    entities: &'a EntityIndex,
) -> Result<(&'a PlacedEntity, &'a PlacedEntity), Diagnostic> {
    let lookup = |table: &str| {
        entities
            .get(table)
            .ok_or_else(|| Diagnostic::DanglingRelationship {
                index,
                name: rel.effective_name(index),
                missing: table.to_string(),
            })
    };
    Ok((lookup(&rel.source_table)?, lookup(&rel.target_table)?))
}

/// Edge annotations shared by both compilers, before per-side blanking.
pub fn edge_data(rel: &Relationship) -> EdgeData {
    EdgeData {
        source_cardinality: cardinality_notation(rel, Side::Source),
        target_cardinality: cardinality_notation(rel, Side::Target),
        source_participation: participation(rel, Side::Source),
        target_participation: participation(rel, Side::Target),
        is_identifying: rel.is_identifying(),
        relationship_type: Some(rel.rel_type.clone()),
    }
}

/// Relationship node plus its source-side and target-side edges.
///
/// `node_id` is passed in already claimed so the edges agree with the node.
pub fn compile_relationship(
    rel: &Relationship,
    key: RelationshipKey,
    node_id: String,
    source: &PlacedEntity,
    target: &PlacedEntity,
    config: &LayoutConfig,
) -> (Node, [Edge; 2]) {
    let position = first_finite(
        [rel.saved_position()],
        source.position.midpoint(target.position),
        config,
    );
    let data = edge_data(rel);

    let source_edge = Edge {
        id: format!("{node_id}-source"),
        source: source.id.clone(),
        target: node_id.clone(),
        source_handle: None,
        target_handle: None,
        kind: EdgeKind::Relationship,
        data: EdgeData {
            target_cardinality: String::new(),
            ..data.clone()
        },
    };
    let target_edge = Edge {
        id: format!("{node_id}-target"),
        source: node_id.clone(),
        target: target.id.clone(),
        source_handle: None,
        target_handle: None,
        kind: EdgeKind::Relationship,
        data: EdgeData {
            source_cardinality: String::new(),
            ..data.clone()
        },
    };

    let node = Node {
        id: node_id,
        position,
        kind: NodeKind::Relationship(RelationshipData {
            name: key.relationship_name.clone(),
            key,
            relationship_type: rel.rel_type.clone(),
            is_identifying: data.is_identifying,
            source_cardinality: data.source_cardinality,
            target_cardinality: data.target_cardinality,
            source_participation: data.source_participation,
            target_participation: data.target_participation,
            attributes: rel.attributes.clone(),
            assumptions_made: rel.assumptions_made.clone(),
        }),
    };

    (node, [source_edge, target_edge])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Participation, RelType};

    fn index() -> EntityIndex {
        let mut entities = EntityIndex::new();
        for (name, x, y) in [("Customer", 100.0, 100.0), ("Order", 600.0, 100.0)] {
            entities.insert(
                name.to_string(),
                PlacedEntity {
                    id: format!("entity-{name}"),
                    position: Point::new(x, y),
                },
            );
        }
        entities
    }

    fn compile(rel: &Relationship) -> (Node, [Edge; 2]) {
        let entities = index();
        let (source, target) = resolve_endpoints(0, rel, &entities).unwrap();
        let key = relationship_key(0, rel);
        let id = key.node_id();
        compile_relationship(rel, key, id, source, target, &LayoutConfig::default())
    }

    #[test]
    fn test_midpoint_and_edges() {
        let rel = Relationship::new("places", "Customer", "Order", RelType::OneToMany);
        let (node, [source_edge, target_edge]) = compile(&rel);

        assert_eq!(node.id, "relationship-places-Customer-to-Order");
        assert_eq!(node.position, Point::new(350.0, 100.0));

        assert_eq!(source_edge.source, "entity-Customer");
        assert_eq!(source_edge.target, node.id);
        assert_eq!(source_edge.data.source_cardinality, "1");
        assert_eq!(source_edge.data.target_cardinality, "");

        assert_eq!(target_edge.source, node.id);
        assert_eq!(target_edge.target, "entity-Order");
        assert_eq!(target_edge.data.source_cardinality, "");
        assert_eq!(target_edge.data.target_cardinality, "N");
        assert_eq!(target_edge.data.source_participation, Participation::Partial);
    }

    #[test]
    fn test_saved_position_respects_draggable() {
        let mut rel = Relationship::new("places", "Customer", "Order", RelType::OneToMany);
        rel.position = Some(Point::new(42.0, 24.0));
        assert_eq!(compile(&rel).0.position, Point::new(42.0, 24.0));

        rel.draggable = Some(false);
        assert_eq!(compile(&rel).0.position, Point::new(350.0, 100.0));
    }

    #[test]
    fn test_identifying_flag_on_both_edges() {
        let mut rel = Relationship::new("owns", "Customer", "Order", RelType::OneToMany);
        rel.is_identifying = Some(true);
        let (node, edges) = compile(&rel);
        assert!(edges.iter().all(|e| e.data.is_identifying));
        match node.kind {
            NodeKind::Relationship(data) => assert!(data.is_identifying),
            other => panic!("unexpected node kind {other:?}"),
        }
    }

    #[test]
    fn test_dangling_endpoint() {
        let rel = Relationship::new("ships", "Order", "Warehouse", RelType::ManyToOne);
        let err = resolve_endpoints(4, &rel, &index()).unwrap_err();
        assert_eq!(
            err,
            Diagnostic::DanglingRelationship {
                index: 4,
                name: "ships".to_string(),
                missing: "Warehouse".to_string(),
            }
        );
    }

    #[test]
    fn test_unnamed_relationship_key() {
        let rel = Relationship::new("", "Customer", "Order", RelType::OneToOne);
        assert_eq!(
            relationship_key(2, &rel).node_id(),
            "relationship-rel2-Customer-to-Order"
        );
    }
}
