//! Image export of a compiled diagram.
//!
//! Export is a capability handed to whoever needs it ([`DiagramExporter`]),
//! not ambient state. [`SvgExporter`] draws Chen-style shapes straight from
//! the compiled graph: rectangles for entities, ellipses for attributes and
//! diamonds for relationships.

use crate::classify::EntityClass;
use crate::ir::{Edge, EdgeKind, Graph, Node, NodeKind};
use crate::layout::LayoutConfig;
use crate::measure::LabelMetrics;
use crate::schema::{Participation, Point};
use std::collections::HashMap;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(&'static str),
    #[error("Render failed: {0}")]
    Render(#[from] std::fmt::Error),
}

pub trait DiagramExporter {
    fn export_as_image(&self, graph: &Graph, format: ImageFormat) -> Result<Vec<u8>, ExportError>;
}

/// Bounding box of a drawn node, in diagram coordinates.
#[derive(Debug, Clone, Copy)]
struct Shape {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Shape {
    fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

pub struct SvgExporter {
    metrics: LabelMetrics,
    config: LayoutConfig,
    margin: f64,
}

impl Default for SvgExporter {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl DiagramExporter for SvgExporter {
    fn export_as_image(&self, graph: &Graph, format: ImageFormat) -> Result<Vec<u8>, ExportError> {
        match format {
            ImageFormat::Svg => Ok(self.render(graph)?.into_bytes()),
            other => Err(ExportError::UnsupportedFormat(other.as_str())),
        }
    }
}

impl SvgExporter {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            metrics: LabelMetrics::default(),
            config,
            margin: 40.0,
        }
    }

    pub fn render(&self, graph: &Graph) -> Result<String, ExportError> {
        let shapes: HashMap<&str, Shape> = graph
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), self.shape(n)))
            .collect();

        let min_x = shapes.values().map(|s| s.x).fold(f64::INFINITY, f64::min);
        let min_y = shapes.values().map(|s| s.y).fold(f64::INFINITY, f64::min);
        let max_x = shapes
            .values()
            .map(|s| s.x + s.width)
            .fold(f64::NEG_INFINITY, f64::max);
        let max_y = shapes
            .values()
            .map(|s| s.y + s.height)
            .fold(f64::NEG_INFINITY, f64::max);
        let (shift_x, shift_y, width, height) = if shapes.is_empty() {
            (0.0, 0.0, self.margin * 2.0, self.margin * 2.0)
        } else {
            (
                self.margin - min_x,
                self.margin - min_y,
                max_x - min_x + self.margin * 2.0,
                max_y - min_y + self.margin * 2.0,
            )
        };

        let mut svg = String::new();
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        )?;
        writeln!(
            svg,
            r#"<style>
  .entity {{ fill: #fff; stroke: #333; stroke-width: 1.5; }}
  .attribute {{ fill: #fff; stroke: #555; stroke-width: 1.2; }}
  .derived {{ stroke-dasharray: 4 3; }}
  .relationship {{ fill: #f4f4f4; stroke: #333; stroke-width: 1.5; }}
  .label {{ font-family: monospace; font-size: 13px; }}
  .pk {{ text-decoration: underline; font-weight: bold; }}
  .edge {{ stroke: #666; stroke-width: 1.5; fill: none; }}
  .total {{ stroke-width: 3.5; }}
  .cardinality {{ font-family: monospace; font-size: 11px; fill: #333; }}
</style>"#
        )?;
        writeln!(svg, r#"<g transform="translate({shift_x} {shift_y})">"#)?;

        // Edges first so shapes paint over their ends.
        for edge in &graph.edges {
            if let (Some(from), Some(to)) = (
                shapes.get(edge.source.as_str()),
                shapes.get(edge.target.as_str()),
            ) {
                self.render_edge(&mut svg, edge, from.center(), to.center())?;
            }
        }

        for node in &graph.nodes {
            if let Some(shape) = shapes.get(node.id.as_str()) {
                self.render_node(&mut svg, node, shape)?;
            }
        }

        writeln!(svg, "</g>")?;
        writeln!(svg, "</svg>")?;
        Ok(svg)
    }

    fn shape(&self, node: &Node) -> Shape {
        let (label, min_width, height) = match &node.kind {
            NodeKind::Entity(data) => (&data.name, self.config.entity_width, self.config.entity_height),
            NodeKind::Attribute(data) => (
                &data.name,
                self.config.attribute_width,
                self.config.attribute_height,
            ),
            NodeKind::Relationship(data) => (
                &data.name,
                self.config.entity_width,
                self.config.entity_height,
            ),
        };
        Shape {
            x: node.position.x,
            y: node.position.y,
            width: self.metrics.label_width(label, min_width),
            height,
        }
    }

    fn render_edge(
        &self,
        svg: &mut String,
        edge: &Edge,
        from: Point,
        to: Point,
    ) -> std::fmt::Result {
        let mut class = String::from("edge");
        let total = match edge.kind {
            EdgeKind::Attribute => false,
            // The entity end decides which participation the stroke shows.
            EdgeKind::Relationship if edge.data.source_cardinality.is_empty() => {
                edge.data.target_participation == Participation::Total
            }
            EdgeKind::Relationship | EdgeKind::Logical => {
                edge.data.source_participation == Participation::Total
            }
        };
        if total {
            class.push_str(" total");
        }

        writeln!(
            svg,
            r#"<line class="{class}" x1="{}" y1="{}" x2="{}" y2="{}" />"#,
            from.x, from.y, to.x, to.y
        )?;

        // Labels sit a quarter of the way in from each end.
        let near = |a: Point, b: Point| a.offset((b.x - a.x) * 0.25, (b.y - a.y) * 0.25 - 6.0);
        for (text, at) in [
            (&edge.data.source_cardinality, near(from, to)),
            (&edge.data.target_cardinality, near(to, from)),
        ] {
            if !text.is_empty() {
                writeln!(
                    svg,
                    r#"<text class="cardinality" x="{}" y="{}" text-anchor="middle">{}</text>"#,
                    at.x,
                    at.y,
                    escape_xml(text)
                )?;
            }
        }
        Ok(())
    }

    fn render_node(&self, svg: &mut String, node: &Node, shape: &Shape) -> std::fmt::Result {
        let Shape {
            x,
            y,
            width,
            height,
        } = *shape;
        let c = shape.center();

        match &node.kind {
            NodeKind::Entity(data) => {
                writeln!(
                    svg,
                    r#"<rect class="entity" x="{x}" y="{y}" width="{width}" height="{height}" />"#
                )?;
                match data.class {
                    EntityClass::Weak => writeln!(
                        svg,
                        r#"<rect class="entity" x="{}" y="{}" width="{}" height="{}" />"#,
                        x + 4.0,
                        y + 4.0,
                        width - 8.0,
                        height - 8.0
                    )?,
                    EntityClass::Associative => writeln!(
                        svg,
                        r#"<polygon class="relationship" points="{},{} {},{} {},{} {},{}" />"#,
                        c.x,
                        y + 4.0,
                        x + width - 4.0,
                        c.y,
                        c.x,
                        y + height - 4.0,
                        x + 4.0,
                        c.y
                    )?,
                    EntityClass::Strong | EntityClass::Lookup => {}
                }
                self.render_label(svg, c, &data.name, "label")
            }
            NodeKind::Attribute(data) => {
                let class = if data.is_derived {
                    "attribute derived"
                } else {
                    "attribute"
                };
                let (rx, ry) = (width / 2.0, height / 2.0);
                writeln!(
                    svg,
                    r#"<ellipse class="{class}" cx="{}" cy="{}" rx="{rx}" ry="{ry}" />"#,
                    c.x, c.y
                )?;
                if data.is_multivalued {
                    writeln!(
                        svg,
                        r#"<ellipse class="{class}" cx="{}" cy="{}" rx="{}" ry="{}" />"#,
                        c.x,
                        c.y,
                        rx - 4.0,
                        ry - 4.0
                    )?;
                }
                let label_class = if data.is_primary_key { "label pk" } else { "label" };
                self.render_label(svg, c, &data.name, label_class)
            }
            NodeKind::Relationship(data) => {
                let diamond = |inset: f64| {
                    format!(
                        "{},{} {},{} {},{} {},{}",
                        c.x,
                        y + inset,
                        x + width - inset,
                        c.y,
                        c.x,
                        y + height - inset,
                        x + inset,
                        c.y
                    )
                };
                writeln!(svg, r#"<polygon class="relationship" points="{}" />"#, diamond(0.0))?;
                if data.is_identifying {
                    writeln!(svg, r#"<polygon class="relationship" points="{}" />"#, diamond(6.0))?;
                }
                self.render_label(svg, c, &data.name, "label")
            }
        }
    }

    fn render_label(&self, svg: &mut String, at: Point, text: &str, class: &str) -> std::fmt::Result {
        writeln!(
            svg,
            r#"<text class="{class}" x="{}" y="{}" text-anchor="middle">{}</text>"#,
            at.x,
            at.y + self.metrics.line_height / 4.0,
            escape_xml(text)
        )
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
