//! Folding renderer gestures back into the schema.
//!
//! [`reduce`] applies one event to a schema in place. [`reduce_document`]
//! does the same for a raw JSON schema, writing back only what the event
//! changed. [`DiagramSession`] wraps a schema, applies events and recompiles
//! the whole graph after each change, so the renderer always redraws from the
//! canonical schema.

use crate::compiler::{CompileReport, DiagramCompiler};
use crate::diagnostics::Diagnostic;
use crate::ir::{
    DiagramMode, ENTITY_PREFIX, Graph, NodeKind, RELATIONSHIP_PREFIX, RelationshipKey,
    entity_name_from_node_id,
};
use crate::parser::{self, Parsed};
use crate::schema::{Participation, Point, RelType, Relationship, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovedNodeType {
    Entity,
    Relationship,
    #[serde(other)]
    Other,
}

impl MovedNodeType {
    fn infer(id: &str) -> Self {
        if id.starts_with(ENTITY_PREFIX) {
            Self::Entity
        } else if id.starts_with(RELATIONSHIP_PREFIX) {
            Self::Relationship
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DiagramEvent {
    /// A node was dropped at `position` after a drag.
    #[serde(rename_all = "camelCase")]
    NodeMoved {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Inferred from the ID prefix when absent.
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        node_type: Option<MovedNodeType>,
        position: Point,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        relationship: Option<RelationshipKey>,
    },
    /// The user drew a connection between two entity nodes.
    Connect { source: String, target: String },
}

impl DiagramEvent {
    pub fn node_moved(id: impl Into<String>, position: Point) -> Self {
        Self::NodeMoved {
            id: id.into(),
            name: None,
            node_type: None,
            position,
            relationship: None,
        }
    }

    pub fn connect(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Connect {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Applied,
    /// The schema already reflected the event.
    Unchanged,
    /// Nothing in the schema matched; the schema is untouched.
    Ignored(Diagnostic),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Name, plus source and target when known, of the relationship being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RelationshipMatcher {
    name: String,
    source: Option<String>,
    target: Option<String>,
}

impl RelationshipMatcher {
    fn from_key(key: &RelationshipKey) -> Self {
        Self {
            name: key.relationship_name.clone(),
            source: Some(key.source_entity.clone()),
            target: Some(key.target_entity.clone()),
        }
    }

    /// Every reading of a bare `relationship-<name>-<source>-to-<target>` ID.
    ///
    /// Names and table names may contain `-` and `to`, so each `to` token and
    /// each name/source split is offered in turn; the plain name comes last.
    fn decode(id: &str) -> Vec<Self> {
        let Some(rest) = id
            .strip_prefix(RELATIONSHIP_PREFIX)
            .filter(|rest| !rest.is_empty())
        else {
            return Vec::new();
        };
        let parts: Vec<&str> = rest.split('-').collect();

        let mut readings = Vec::new();
        for to in (2..parts.len().saturating_sub(1)).filter(|&i| parts[i] == "to") {
            let target = parts[to + 1..].join("-");
            for split in 1..to {
                readings.push(Self {
                    name: parts[..split].join("-"),
                    source: Some(parts[split..to].join("-")),
                    target: Some(target.clone()),
                });
            }
        }
        readings.push(Self {
            name: rest.to_string(),
            source: None,
            target: None,
        });
        readings
    }

    fn matches(&self, index: usize, rel: &Relationship) -> bool {
        let same = |a: &str, b: &str| a.to_lowercase() == b.to_lowercase();
        same(&self.name, &rel.effective_name(index))
            && self.source.as_deref().is_none_or(|s| same(s, &rel.source_table))
            && self.target.as_deref().is_none_or(|t| same(t, &rel.target_table))
    }
}

/// Apply one event to `schema`.
pub fn reduce(schema: &mut Schema, event: &DiagramEvent) -> EditOutcome {
    let outcome = match event {
        DiagramEvent::NodeMoved {
            id,
            name,
            node_type,
            position,
            relationship,
        } => {
            if !position.is_finite() {
                EditOutcome::Ignored(Diagnostic::NonFinitePosition { id: id.clone() })
            } else {
                match node_type.unwrap_or_else(|| MovedNodeType::infer(id)) {
                    MovedNodeType::Entity => move_entity(schema, id, name.as_deref(), *position),
                    MovedNodeType::Relationship => {
                        move_relationship(schema, id, relationship.as_ref(), *position)
                    }
                    MovedNodeType::Other => move_other(schema, id, *position),
                }
            }
        }
        DiagramEvent::Connect { source, target } => connect(schema, source, target),
    };

    match &outcome {
        EditOutcome::Applied => tracing::debug!(?event, "edit applied"),
        EditOutcome::Unchanged => tracing::trace!(?event, "edit already reflected"),
        EditOutcome::Ignored(diagnostic) => tracing::warn!(%diagnostic, "edit ignored"),
    }
    outcome
}

fn set_position(slot: &mut Option<Point>, position: Point) -> EditOutcome {
    if *slot == Some(position) {
        EditOutcome::Unchanged
    } else {
        *slot = Some(position);
        EditOutcome::Applied
    }
}

fn move_entity(schema: &mut Schema, id: &str, name: Option<&str>, position: Point) -> EditOutcome {
    let name = name
        .filter(|n| !n.is_empty())
        .or_else(|| entity_name_from_node_id(id));
    match name.and_then(|n| schema.table_mut(n)) {
        Some(table) => set_position(&mut table.position, position),
        None => EditOutcome::Ignored(Diagnostic::UnmatchedMove { id: id.to_string() }),
    }
}

fn move_relationship(
    schema: &mut Schema,
    id: &str,
    key: Option<&RelationshipKey>,
    position: Point,
) -> EditOutcome {
    let readings = match key {
        Some(key) => vec![RelationshipMatcher::from_key(key)],
        None => RelationshipMatcher::decode(id),
    };
    let found = readings.iter().find_map(|m| {
        schema
            .relationships
            .iter()
            .enumerate()
            .position(|(index, rel)| m.matches(index, rel))
    });

    match found.and_then(|index| schema.relationships.get_mut(index)) {
        Some(rel) => set_position(&mut rel.position, position),
        None => EditOutcome::Ignored(Diagnostic::UnmatchedMove { id: id.to_string() }),
    }
}

fn move_other(schema: &mut Schema, id: &str, position: Point) -> EditOutcome {
    match schema.node_positions.insert(id.to_string(), position) {
        Some(previous) if previous == position => EditOutcome::Unchanged,
        _ => EditOutcome::Applied,
    }
}

fn connect(schema: &mut Schema, source: &str, target: &str) -> EditOutcome {
    let endpoint = |node_id: &str| {
        entity_name_from_node_id(node_id)
            .filter(|name| schema.has_table(name))
            .map(str::to_string)
            .ok_or_else(|| Diagnostic::UnknownConnectEndpoint {
                node_id: node_id.to_string(),
            })
    };
    let (source, target) = match (endpoint(source), endpoint(target)) {
        (Ok(s), Ok(t)) => (s, t),
        (Err(d), _) | (_, Err(d)) => return EditOutcome::Ignored(d),
    };

    let name = format!("{source}_{target}");
    let exists = schema
        .relationships
        .iter()
        .any(|r| r.name == name && r.source_table == source && r.target_table == target);
    if exists {
        return EditOutcome::Unchanged;
    }

    schema.relationships.push(Relationship {
        source_participation: Some(Participation::Partial),
        target_participation: Some(Participation::Partial),
        ..Relationship::new(name, source, target, RelType::OneToMany)
    });
    EditOutcome::Applied
}

/// Apply one event to a raw schema document.
///
/// The event is resolved against the validated view of `document`; only the
/// positions, relationships and saved node positions it changed are written
/// back. Records the validation pass dropped and fields it does not know
/// stay exactly as they were.
pub fn reduce_document(document: &mut Value, event: &DiagramEvent) -> EditOutcome {
    if !document.is_object() {
        return EditOutcome::Ignored(Diagnostic::NotAnObject);
    }
    let before = parser::parse_value(document);
    let mut after = before.schema.clone();
    let outcome = reduce(&mut after, event);
    if outcome.is_applied() {
        write_back(document, &before, &after);
    }
    outcome
}

fn point_value(point: Point) -> Value {
    json!({"x": point.x, "y": point.y})
}

fn write_back(document: &mut Value, before: &Parsed, after: &Schema) {
    let Some(root) = document.as_object_mut() else {
        return;
    };

    let moved_tables = before
        .schema
        .tables
        .iter()
        .zip(&after.tables)
        .zip(&before.table_origins)
        .filter(|((old, new), _)| old.position != new.position)
        .filter_map(|((_, new), &origin)| Some((origin, new.position?)));
    for (origin, position) in moved_tables {
        set_record_position(root, "tables", origin, position);
    }

    let moved_relationships = before
        .schema
        .relationships
        .iter()
        .zip(&after.relationships)
        .zip(&before.relationship_origins)
        .filter(|((old, new), _)| old.position != new.position)
        .filter_map(|((_, new), &origin)| Some((origin, new.position?)));
    for (origin, position) in moved_relationships {
        set_record_position(root, "relationships", origin, position);
    }

    let added: Vec<Value> = after
        .relationships
        .iter()
        .skip(before.schema.relationships.len())
        .filter_map(|rel| serde_json::to_value(rel).ok())
        .collect();
    if !added.is_empty() {
        let slot = root
            .entry("relationships")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            items.extend(added);
        }
    }

    let saved: Vec<(&String, &Point)> = after
        .node_positions
        .iter()
        .filter(|(id, point)| before.schema.node_positions.get(*id) != Some(*point))
        .collect();
    if !saved.is_empty() {
        let slot = root
            .entry("nodePositions")
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(positions) = slot {
            for (id, point) in saved {
                positions.insert(id.clone(), point_value(*point));
            }
        }
    }
}

fn set_record_position(root: &mut Map<String, Value>, list: &str, origin: usize, position: Point) {
    let record = root
        .get_mut(list)
        .and_then(|items| items.get_mut(origin))
        .and_then(Value::as_object_mut);
    if let Some(record) = record {
        record.insert("position".to_string(), point_value(position));
    }
}

/// One editing session: the canonical schema and its latest compiled graph.
#[derive(Debug, Clone)]
pub struct DiagramSession {
    schema: Schema,
    mode: DiagramMode,
    compiler: DiagramCompiler,
    report: CompileReport,
}

impl DiagramSession {
    pub fn new(schema: Schema, mode: DiagramMode) -> Self {
        Self::with_compiler(schema, mode, DiagramCompiler::default())
    }

    pub fn with_compiler(schema: Schema, mode: DiagramMode, compiler: DiagramCompiler) -> Self {
        let report = compiler.compile_report(&schema, mode);
        Self {
            schema,
            mode,
            compiler,
            report,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn into_schema(self) -> Schema {
        self.schema
    }

    pub fn mode(&self) -> DiagramMode {
        self.mode
    }

    pub fn graph(&self) -> &Graph {
        &self.report.graph
    }

    /// What the latest compilation dropped.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.report.diagnostics
    }

    pub fn set_mode(&mut self, mode: DiagramMode) {
        if self.mode != mode {
            self.mode = mode;
            self.recompile();
        }
    }

    /// Apply an event; any applied change triggers a full recompilation.
    pub fn apply(&mut self, event: &DiagramEvent) -> EditOutcome {
        let outcome = reduce(&mut self.schema, event);
        if outcome.is_applied() {
            self.recompile();
        }
        outcome
    }

    /// Drag-stop from the renderer. Identity comes from the compiled node,
    /// so relationship moves never depend on parsing the ID.
    pub fn on_node_drag_stop(&mut self, node_id: &str, position: Point) -> EditOutcome {
        let (node_type, name, relationship) = match self.graph().node(node_id).map(|n| &n.kind) {
            Some(NodeKind::Entity(data)) => (MovedNodeType::Entity, Some(data.name.clone()), None),
            Some(NodeKind::Relationship(data)) => (
                MovedNodeType::Relationship,
                Some(data.name.clone()),
                Some(data.key.clone()),
            ),
            Some(NodeKind::Attribute(_)) => (MovedNodeType::Other, None, None),
            None => (MovedNodeType::infer(node_id), None, None),
        };
        self.apply(&DiagramEvent::NodeMoved {
            id: node_id.to_string(),
            name,
            node_type: Some(node_type),
            position,
            relationship,
        })
    }

    pub fn on_connect(&mut self, source: &str, target: &str) -> EditOutcome {
        self.apply(&DiagramEvent::connect(source, target))
    }

    fn recompile(&mut self) {
        self.report = self.compiler.compile_report(&self.schema, self.mode);
    }
}
