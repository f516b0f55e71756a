//! Deterministic placement of diagram nodes.

pub mod attributes;
pub mod grid;
pub mod handles;

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;

/// Geometry constants for entity grid placement and attribute rings.
///
/// Every field has a default, so a partial JSON config overrides only what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub grid_origin_x: f64,
    pub grid_origin_y: f64,
    pub grid_step_x: f64,
    pub grid_step_y: f64,
    pub grid_columns: usize,
    pub inner_radius: f64,
    pub outer_radius: f64,
    /// Attribute count up to which a single ring is used.
    pub single_ring_max: usize,
    pub start_angle: f64,
    pub entity_width: f64,
    pub entity_height: f64,
    pub attribute_width: f64,
    pub attribute_height: f64,
    pub fallback_x: f64,
    pub fallback_y: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            grid_origin_x: 100.0,
            grid_origin_y: 100.0,
            grid_step_x: 500.0,
            grid_step_y: 400.0,
            grid_columns: 3,
            inner_radius: 180.0,
            outer_radius: 270.0,
            single_ring_max: 4,
            start_angle: FRAC_PI_4,
            entity_width: 150.0,
            entity_height: 60.0,
            attribute_width: 110.0,
            attribute_height: 40.0,
            fallback_x: 0.0,
            fallback_y: 0.0,
        }
    }
}
