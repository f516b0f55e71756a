//! Direct entity-to-entity edges for the logical view.

use crate::ir::{Edge, EdgeKind};
use crate::layout::handles::facing_handles;
use crate::relationships::{PlacedEntity, edge_data};
use crate::schema::Relationship;

/// One edge per relationship, attached to the sides facing each other.
pub fn compile_logical_edge(
    rel: &Relationship,
    edge_id: String,
    source: &PlacedEntity,
    target: &PlacedEntity,
) -> Edge {
    let (source_handle, target_handle) = facing_handles(source.position, target.position);
    Edge {
        id: edge_id,
        source: source.id.clone(),
        target: target.id.clone(),
        source_handle: Some(source_handle),
        target_handle: Some(target_handle),
        kind: EdgeKind::Logical,
        data: edge_data(rel),
    }
}
