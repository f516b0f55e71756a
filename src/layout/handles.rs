//! Connection side selection for directly joined entities.

use crate::schema::Point;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Top,
    Right,
    Bottom,
    Left,
}

/// Pick the facing sides of two entities from their relative position.
///
/// Horizontal distance wins only when strictly larger; ties go vertical.
pub fn facing_handles(source: Point, target: Point) -> (Handle, Handle) {
    let dx = target.x - source.x;
    let dy = target.y - source.y;

    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            (Handle::Right, Handle::Left)
        } else {
            (Handle::Left, Handle::Right)
        }
    } else if dy > 0.0 {
        (Handle::Bottom, Handle::Top)
    } else {
        (Handle::Top, Handle::Bottom)
    }
}
