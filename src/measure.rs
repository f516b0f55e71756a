//! Fixed-pitch label sizing for the SVG exporter.

use unicode_width::UnicodeWidthStr;

pub struct LabelMetrics {
    /// Width of one display column.
    pub column_width: f64,
    pub line_height: f64,
    /// Horizontal space kept on each side of a label inside its shape.
    pub inset: f64,
}

impl Default for LabelMetrics {
    fn default() -> Self {
        Self {
            column_width: 8.0,
            line_height: 20.0,
            inset: 12.0,
        }
    }
}

impl LabelMetrics {
    /// Width of a shape holding `label`, never narrower than `min_width`.
    /// East Asian wide glyphs take two display columns.
    pub fn label_width(&self, label: &str, min_width: f64) -> f64 {
        let columns = label.width() as f64;
        (columns * self.column_width + 2.0 * self.inset).max(min_width)
    }
}
