//! Attribute satellites placed on rings around their entity.

use super::LayoutConfig;
use super::grid::{first_finite, sanitize};
use crate::ir::{AttributeData, Edge, EdgeData, EdgeKind, Node, NodeKind, attribute_node_id};
use crate::schema::{Point, Table};
use std::collections::BTreeMap;
use std::f64::consts::TAU;

/// Offset of attribute `index` (out of `count`) from the entity centre.
///
/// Up to `single_ring_max` attributes share one ring. Beyond that, even
/// indices go on the inner ring and odd ones on the outer ring.
pub fn ring_offset(index: usize, count: usize, config: &LayoutConfig) -> (f64, f64) {
    let (radius, slot, slots) = if count <= config.single_ring_max {
        (
            config.inner_radius,
            index,
            count.max(config.single_ring_max).max(1),
        )
    } else {
        let radius = if index % 2 == 0 {
            config.inner_radius
        } else {
            config.outer_radius
        };
        (radius, index / 2, count.div_ceil(2))
    };

    let angle = config.start_angle + slot as f64 * (TAU / slots as f64);
    (radius * angle.cos(), radius * angle.sin())
}

/// Centre of an entity box whose top-left corner is `position`.
pub fn entity_center(position: Point, config: &LayoutConfig) -> Point {
    position.offset(config.entity_width / 2.0, config.entity_height / 2.0)
}

/// One node and one entity-to-attribute edge per column of `table`.
///
/// A position saved under the attribute's node ID always wins over geometry.
pub fn layout_attributes(
    table: &Table,
    entity_id: &str,
    entity_position: Point,
    saved: &BTreeMap<String, Point>,
    config: &LayoutConfig,
) -> Vec<(Node, Edge)> {
    let center = entity_center(entity_position, config);
    let count = table.columns.len();

    table
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let id = attribute_node_id(entity_id, column, index);
            let (dx, dy) = ring_offset(index, count, config);
            let computed = center.offset(
                dx - config.attribute_width / 2.0,
                dy - config.attribute_height / 2.0,
            );
            let position = first_finite(
                [saved.get(&id).copied()],
                sanitize(computed, config),
                config,
            );
            tracing::trace!(%id, x = position.x, y = position.y, "placed attribute");

            let edge = Edge {
                id: format!("edge-{id}"),
                source: entity_id.to_string(),
                target: id.clone(),
                source_handle: None,
                target_handle: None,
                kind: EdgeKind::Attribute,
                data: EdgeData::default(),
            };
            let node = Node {
                id,
                position,
                kind: NodeKind::Attribute(AttributeData::from_column(&table.name, column)),
            };
            (node, edge)
        })
        .collect()
}
