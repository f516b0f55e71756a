//! Entity grid placement and coordinate sanitising.

use super::LayoutConfig;
use crate::schema::Point;

/// Default position of the `index`-th entity: rows of `grid_columns` cells.
pub fn default_entity_position(index: usize, config: &LayoutConfig) -> Point {
    let columns = config.grid_columns.max(1);
    let col = index % columns;
    let row = index / columns;
    Point::new(
        config.grid_origin_x + col as f64 * config.grid_step_x,
        config.grid_origin_y + row as f64 * config.grid_step_y,
    )
}

/// Pick the first finite candidate; if none is finite use `fallback`, and
/// if even that is broken use the configured fallback coordinate.
pub fn first_finite(
    candidates: impl IntoIterator<Item = Option<Point>>,
    fallback: Point,
    config: &LayoutConfig,
) -> Point {
    candidates
        .into_iter()
        .flatten()
        .find(Point::is_finite)
        .unwrap_or_else(|| sanitize(fallback, config))
}

pub fn sanitize(point: Point, config: &LayoutConfig) -> Point {
    Point::new(
        if point.x.is_finite() { point.x } else { config.fallback_x },
        if point.y.is_finite() { point.y } else { config.fallback_y },
    )
}
