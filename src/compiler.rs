//! Graph assembly: schema in, positioned nodes and edges out.

use crate::classify::classify;
use crate::diagnostics::Diagnostic;
use crate::ir::{DiagramMode, EntityData, Graph, Node, NodeKind, entity_node_id};
use crate::layout::LayoutConfig;
use crate::layout::attributes::layout_attributes;
use crate::layout::grid::{default_entity_position, first_finite};
use crate::logical::compile_logical_edge;
use crate::parser::parse_value;
use crate::relationships::{
    EntityIndex, PlacedEntity, compile_relationship, relationship_key, resolve_endpoints,
};
use crate::schema::Schema;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{count} element(s) dropped, first: {first}")]
    Dropped {
        count: usize,
        first: Diagnostic,
        diagnostics: Vec<Diagnostic>,
    },
}

/// Compiled graph together with everything left out of it.
#[derive(Debug, Clone, Default)]
pub struct CompileReport {
    pub graph: Graph,
    pub diagnostics: Vec<Diagnostic>,
}

/// Hands out node IDs, suffixing any repeat with `-<n>`.
#[derive(Default)]
struct IdRegistry {
    seen: HashSet<String>,
}

impl IdRegistry {
    fn claim(&mut self, id: String, diagnostics: &mut Vec<Diagnostic>) -> String {
        if self.seen.insert(id.clone()) {
            return id;
        }
        let mut n = 2;
        let renamed = loop {
            let candidate = format!("{id}-{n}");
            if self.seen.insert(candidate.clone()) {
                break candidate;
            }
            n += 1;
        };
        tracing::warn!(%id, %renamed, "duplicate node id");
        diagnostics.push(Diagnostic::DuplicateNodeId {
            id,
            renamed_to: renamed.clone(),
        });
        renamed
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiagramCompiler {
    config: LayoutConfig,
}

impl DiagramCompiler {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lenient compile; dropped elements are logged and discarded.
    pub fn compile(&self, schema: &Schema, mode: DiagramMode) -> Graph {
        self.compile_report(schema, mode).graph
    }

    /// Validate raw JSON and compile it. Never fails; junk yields an empty graph.
    pub fn compile_value(&self, value: &Value, mode: DiagramMode) -> CompileReport {
        let parsed = parse_value(value);
        for diagnostic in &parsed.diagnostics {
            tracing::warn!(%diagnostic, "schema input dropped");
        }
        let mut report = self.compile_report(&parsed.schema, mode);
        let mut diagnostics = parsed.diagnostics;
        diagnostics.append(&mut report.diagnostics);
        report.diagnostics = diagnostics;
        report
    }

    /// Compile, failing if anything had to be dropped or renamed.
    pub fn compile_strict(&self, schema: &Schema, mode: DiagramMode) -> Result<Graph, CompileError> {
        let report = self.compile_report(schema, mode);
        let Some(first) = report.diagnostics.first().cloned() else {
            return Ok(report.graph);
        };
        Err(CompileError::Dropped {
            count: report.diagnostics.len(),
            first,
            diagnostics: report.diagnostics,
        })
    }

    pub fn compile_report(&self, schema: &Schema, mode: DiagramMode) -> CompileReport {
        let mut graph = Graph::default();
        let mut diagnostics = Vec::new();
        let mut ids = IdRegistry::default();
        let mut entities = EntityIndex::new();

        for (index, table) in schema.tables.iter().enumerate() {
            let base_id = entity_node_id(&table.name);
            let grid = default_entity_position(index, &self.config);
            let position = first_finite(
                [table.position, schema.node_positions.get(&base_id).copied()],
                grid,
                &self.config,
            );
            if table.position.is_some_and(|p| !p.is_finite()) {
                diagnostics.push(Diagnostic::NonFinitePosition {
                    id: base_id.clone(),
                });
            }
            let id = ids.claim(base_id, &mut diagnostics);

            entities
                .entry(table.name.clone())
                .or_insert_with(|| PlacedEntity {
                    id: id.clone(),
                    position,
                });

            graph.nodes.push(Node {
                id: id.clone(),
                position,
                kind: NodeKind::Entity(EntityData {
                    name: table.name.clone(),
                    class: classify(table, &schema.relationships),
                    description: table.description.clone(),
                    is_lookup_table: table.is_lookup_table,
                    column_count: table.columns.len(),
                    assumptions_made: table.assumptions_made.clone(),
                }),
            });

            if mode == DiagramMode::Conceptual {
                for (mut node, mut edge) in
                    layout_attributes(table, &id, position, &schema.node_positions, &self.config)
                {
                    let claimed = ids.claim(node.id.clone(), &mut diagnostics);
                    if claimed != node.id {
                        edge.id = format!("edge-{claimed}");
                        edge.target = claimed.clone();
                        node.id = claimed;
                    }
                    graph.nodes.push(node);
                    graph.edges.push(edge);
                }
            }
        }

        for (index, rel) in schema.relationships.iter().enumerate() {
            let (source, target) = match resolve_endpoints(index, rel, &entities) {
                Ok(endpoints) => endpoints,
                Err(diagnostic) => {
                    tracing::warn!(%diagnostic, "relationship skipped");
                    diagnostics.push(diagnostic);
                    continue;
                }
            };
            let key = relationship_key(index, rel);
            let id = ids.claim(key.node_id(), &mut diagnostics);

            match mode {
                DiagramMode::Conceptual => {
                    let (node, edges) =
                        compile_relationship(rel, key, id, source, target, &self.config);
                    graph.nodes.push(node);
                    graph.edges.extend(edges);
                }
                DiagramMode::Logical => {
                    graph
                        .edges
                        .push(compile_logical_edge(rel, format!("edge-{id}"), source, target));
                }
            }
        }

        tracing::debug!(
            mode = mode.as_str(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            dropped = diagnostics.len(),
            "compiled diagram"
        );

        CompileReport { graph, diagnostics }
    }
}

/// Compile with the default layout configuration.
pub fn compile(schema: &Schema, mode: DiagramMode) -> Graph {
    DiagramCompiler::default().compile(schema, mode)
}

/// Compile raw JSON with the default layout configuration.
pub fn compile_json(value: &Value, mode: DiagramMode) -> Graph {
    DiagramCompiler::default().compile_value(value, mode).graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::EntityClass;
    use crate::ir::EdgeKind;
    use crate::schema::{Column, Point, RelType, Relationship, Table};
    use serde_json::json;

    fn table(name: &str, columns: &[&str]) -> Table {
        Table {
            name: name.to_string(),
            columns: columns.iter().map(|c| Column::named(*c)).collect(),
            ..Table::default()
        }
    }

    fn shop() -> Schema {
        Schema {
            name: "shop".to_string(),
            tables: vec![
                table("Customer", &["id", "name"]),
                table("Order", &["id", "customer_id"]),
            ],
            relationships: vec![Relationship::new(
                "places",
                "Customer",
                "Order",
                RelType::OneToMany,
            )],
            ..Schema::default()
        }
    }

    #[test]
    fn test_conceptual_counts() {
        let graph = compile(&shop(), DiagramMode::Conceptual);
        assert_eq!(graph.entity_nodes().count(), 2);
        assert_eq!(graph.attribute_nodes().count(), 4);
        assert_eq!(graph.relationship_nodes().count(), 1);
        // four attribute edges plus the relationship pair
        assert_eq!(graph.edges.len(), 6);
    }

    #[test]
    fn test_logical_has_no_satellites() {
        let graph = compile(&shop(), DiagramMode::Logical);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].kind, EdgeKind::Logical);
        assert_eq!(graph.edges[0].id, "edge-relationship-places-Customer-to-Order");
    }

    #[test]
    fn test_grid_positions() {
        let mut schema = shop();
        schema.tables.extend([table("C", &[]), table("D", &[])]);
        let graph = compile(&schema, DiagramMode::Logical);
        assert_eq!(graph.node("entity-Customer").unwrap().position, Point::new(100.0, 100.0));
        assert_eq!(graph.node("entity-Order").unwrap().position, Point::new(600.0, 100.0));
        assert_eq!(graph.node("entity-C").unwrap().position, Point::new(1100.0, 100.0));
        assert_eq!(graph.node("entity-D").unwrap().position, Point::new(100.0, 500.0));
    }

    #[test]
    fn test_position_precedence() {
        let mut schema = shop();
        schema.tables[0].position = Some(Point::new(1.0, 1.0));
        schema
            .node_positions
            .insert("entity-Customer".to_string(), Point::new(2.0, 2.0));
        schema
            .node_positions
            .insert("entity-Order".to_string(), Point::new(3.0, 3.0));
        let graph = compile(&schema, DiagramMode::Logical);
        assert_eq!(graph.node("entity-Customer").unwrap().position, Point::new(1.0, 1.0));
        assert_eq!(graph.node("entity-Order").unwrap().position, Point::new(3.0, 3.0));
    }

    #[test]
    fn test_non_finite_table_position_falls_back_to_grid() {
        let mut schema = shop();
        schema.tables[1].position = Some(Point::new(f64::NAN, 0.0));
        let report = DiagramCompiler::default().compile_report(&schema, DiagramMode::Conceptual);
        assert_eq!(
            report.graph.node("entity-Order").unwrap().position,
            Point::new(600.0, 100.0)
        );
        assert!(report.graph.nodes.iter().all(|n| n.position.is_finite()));
        assert_eq!(report.diagnostics.len(), 1);
    }

    #[test]
    fn test_dangling_relationship_dropped() {
        let mut schema = shop();
        schema
            .relationships
            .push(Relationship::new("ships", "Order", "Warehouse", RelType::ManyToOne));
        let report = DiagramCompiler::default().compile_report(&schema, DiagramMode::Conceptual);
        assert_eq!(report.graph.relationship_nodes().count(), 1);
        assert!(matches!(
            report.diagnostics[0],
            Diagnostic::DanglingRelationship { .. }
        ));
        for edge in &report.graph.edges {
            assert!(report.graph.node(&edge.source).is_some());
            assert!(report.graph.node(&edge.target).is_some());
        }
    }

    #[test]
    fn test_strict_mode() {
        let compiler = DiagramCompiler::default();
        assert!(compiler.compile_strict(&shop(), DiagramMode::Conceptual).is_ok());

        let mut schema = shop();
        schema
            .relationships
            .push(Relationship::new("ships", "Order", "Nowhere", RelType::ManyToOne));
        let err = compiler
            .compile_strict(&schema, DiagramMode::Conceptual)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "1 element(s) dropped, first: relationship `ships` dropped: no table named `Nowhere`"
        );
    }

    #[test]
    fn test_duplicate_ids_are_suffixed() {
        let mut schema = shop();
        schema.tables[0].columns.push(Column::named("name"));
        schema.relationships.push(schema.relationships[0].clone());
        let report = DiagramCompiler::default().compile_report(&schema, DiagramMode::Conceptual);

        let ids: HashSet<&str> = report.graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), report.graph.nodes.len());
        assert!(ids.contains("attr-entity-Customer-name-2"));
        assert!(ids.contains("relationship-places-Customer-to-Order-2"));
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report.graph.edge("edge-attr-entity-Customer-name-2").is_some());
    }

    #[test]
    fn test_classification_on_entity_nodes() {
        let mut schema = shop();
        schema.relationships[0].is_identifying = Some(true);
        let graph = compile(&schema, DiagramMode::Conceptual);
        match &graph.node("entity-Order").unwrap().kind {
            NodeKind::Entity(data) => assert_eq!(data.class, EntityClass::Weak),
            other => panic!("unexpected node kind {other:?}"),
        }
    }

    #[test]
    fn test_malformed_json_degrades() {
        for value in [Value::Null, json!({}), json!({"tables": "nope"}), json!([1, 2])] {
            assert!(compile_json(&value, DiagramMode::Conceptual).is_empty());
        }
        let graph = compile_json(
            &json!({"tables": [null, {"name": "A", "columns": [{"name": "id"}]}]}),
            DiagramMode::Conceptual,
        );
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
    }

    #[test]
    fn test_deterministic() {
        let compiler = DiagramCompiler::default();
        let a = compiler.compile(&shop(), DiagramMode::Conceptual);
        let b = compiler.compile(&shop(), DiagramMode::Conceptual);
        assert_eq!(a, b);
    }
}
