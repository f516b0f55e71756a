//! Single validation pass from loosely shaped JSON to a [`Schema`].
//!
//! Malformed entries are dropped and recorded as [`Diagnostic`]s instead of
//! failing the whole document, so a half-edited schema still renders. A
//! record with a usable name is always kept; its malformed fields fall back
//! to their defaults and are reported one by one.

use crate::diagnostics::Diagnostic;
use crate::schema::{Point, Relationship, Schema, Table};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

const COLUMN_FLAGS: [&str; 6] = [
    "isPrimaryKey",
    "isForeignKey",
    "isNullable",
    "isMultivalued",
    "isDerived",
    "isComposite",
];

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Schema rejected: {0}")]
    Rejected(Diagnostic),
}

/// Validated schema plus everything that was dropped on the way in.
#[derive(Debug, Clone, Default)]
pub struct Parsed {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
    /// Index in the input `tables` array of each kept table.
    pub table_origins: Vec<usize>,
    /// Index in the input `relationships` array of each kept relationship.
    pub relationship_origins: Vec<usize>,
}

#[derive(Default)]
pub struct Parser {
    diagnostics: Vec<Diagnostic>,
    table_origins: Vec<usize>,
    relationship_origins: Vec<usize>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(mut self, value: &Value) -> Parsed {
        let Some(root) = value.as_object() else {
            self.diagnostics.push(Diagnostic::NotAnObject);
            return self.finish(Schema::default());
        };

        let name = root
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let Some(raw_tables) = root.get("tables").and_then(Value::as_array) else {
            self.diagnostics.push(Diagnostic::MissingTables);
            return self.finish(Schema {
                name,
                ..Schema::default()
            });
        };

        let tables = self.parse_tables(raw_tables);
        let relationships = self.parse_relationships(root.get("relationships"));
        let node_positions = self.parse_node_positions(root.get("nodePositions"));

        self.finish(Schema {
            name,
            tables,
            relationships,
            node_positions,
        })
    }

    fn finish(self, schema: Schema) -> Parsed {
        Parsed {
            schema,
            diagnostics: self.diagnostics,
            table_origins: self.table_origins,
            relationship_origins: self.relationship_origins,
        }
    }

    fn parse_tables(&mut self, raw: &[Value]) -> Vec<Table> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut tables = Vec::with_capacity(raw.len());

        for (index, value) in raw.iter().enumerate() {
            let Some(table) = self.parse_table(index, value) else {
                continue;
            };
            if !seen.insert(table.name.clone()) {
                self.diagnostics.push(Diagnostic::DuplicateTable {
                    index,
                    name: table.name,
                });
                continue;
            }
            self.table_origins.push(index);
            tables.push(table);
        }

        tables
    }

    fn parse_table(&mut self, index: usize, value: &Value) -> Option<Table> {
        let reject = |reason: &str| Diagnostic::InvalidTable {
            index,
            reason: reason.to_string(),
        };

        let Some(record) = value.as_object() else {
            self.diagnostics.push(reject("not an object"));
            return None;
        };
        let Some(name) = record
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
        else {
            self.diagnostics.push(reject("missing name"));
            return None;
        };

        self.check::<String>(name, record, "description");
        self.check::<bool>(name, record, "isLookupTable");
        self.check::<Point>(name, record, "position");
        self.check::<Vec<String>>(name, record, "assumptionsMade");
        self.check_columns(name, "columns", record.get("columns"));

        match Table::deserialize(value) {
            Ok(table) => Some(table),
            Err(e) => {
                self.diagnostics.push(reject(&e.to_string()));
                None
            }
        }
    }

    fn parse_relationships(&mut self, raw: Option<&Value>) -> Vec<Relationship> {
        let items = match raw {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.diagnostics.push(Diagnostic::InvalidRelationship {
                    index: 0,
                    reason: "`relationships` is not an array".to_string(),
                });
                return Vec::new();
            }
        };

        let mut relationships = Vec::with_capacity(items.len());
        for (index, value) in items.iter().enumerate() {
            if let Some(rel) = self.parse_relationship(index, value) {
                self.relationship_origins.push(index);
                relationships.push(rel);
            }
        }
        relationships
    }

    fn parse_relationship(&mut self, index: usize, value: &Value) -> Option<Relationship> {
        let Some(record) = value.as_object() else {
            self.diagnostics.push(Diagnostic::InvalidRelationship {
                index,
                reason: "not an object".to_string(),
            });
            return None;
        };

        let owner = record
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .map_or_else(|| format!("relationship #{index}"), str::to_string);
        for field in ["name", "sourceTable", "targetTable", "type"] {
            self.check::<String>(&owner, record, field);
        }
        for field in ["sourceCardinality", "targetCardinality", "cardinality"] {
            self.check::<String>(&owner, record, field);
        }
        for field in ["sourceParticipation", "targetParticipation"] {
            self.check::<String>(&owner, record, field);
        }
        for field in ["isIdentifying", "identifying", "draggable"] {
            self.check::<bool>(&owner, record, field);
        }
        self.check::<Point>(&owner, record, "position");
        self.check::<Vec<String>>(&owner, record, "assumptionsMade");
        self.check_columns(&owner, "attributes", record.get("attributes"));

        match Relationship::deserialize(value) {
            Ok(rel) => Some(rel),
            Err(e) => {
                self.diagnostics.push(Diagnostic::InvalidRelationship {
                    index,
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    /// Reports `field` of `record` when present, not `null` and not a `T`.
    fn check<T: DeserializeOwned>(&mut self, owner: &str, record: &Map<String, Value>, field: &str) {
        let malformed = record
            .get(field)
            .filter(|value| !value.is_null())
            .is_some_and(|value| T::deserialize(value).is_err());
        if malformed {
            self.diagnostics.push(Diagnostic::InvalidField {
                owner: owner.to_string(),
                field: field.to_string(),
            });
        }
    }

    fn check_columns(&mut self, owner: &str, field: &str, raw: Option<&Value>) {
        let items = match raw {
            None | Some(Value::Null) => return,
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.diagnostics.push(Diagnostic::InvalidField {
                    owner: owner.to_string(),
                    field: field.to_string(),
                });
                return;
            }
        };

        for (index, item) in items.iter().enumerate() {
            let Some(column) = item.as_object() else {
                self.diagnostics.push(Diagnostic::InvalidField {
                    owner: owner.to_string(),
                    field: format!("{field}[{index}]"),
                });
                continue;
            };
            let label = column
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.trim().is_empty())
                .map_or_else(
                    || format!("{owner}.{field}[{index}]"),
                    |name| format!("{owner}.{name}"),
                );
            self.check::<String>(&label, column, "name");
            self.check::<String>(&label, column, "dataType");
            for flag in COLUMN_FLAGS {
                self.check::<bool>(&label, column, flag);
            }
        }
    }

    fn parse_node_positions(&mut self, raw: Option<&Value>) -> BTreeMap<String, Point> {
        let empty = Map::new();
        let entries = raw.and_then(Value::as_object).unwrap_or(&empty);

        entries
            .iter()
            .filter_map(|(id, value)| match Point::deserialize(value) {
                Ok(point) if point.is_finite() => Some((id.clone(), point)),
                _ => {
                    self.diagnostics
                        .push(Diagnostic::InvalidNodePosition { id: id.clone() });
                    None
                }
            })
            .collect()
    }
}

/// Lenient parse of an already-decoded JSON value.
pub fn parse_value(value: &Value) -> Parsed {
    Parser::new().parse(value)
}

/// Lenient parse of JSON text; only a syntax error fails.
pub fn parse_str(input: &str) -> Result<Parsed, ParseError> {
    let value: Value = serde_json::from_str(input)?;
    Ok(parse_value(&value))
}

/// Strict parse: the first dropped element rejects the document.
pub fn parse_strict(input: &str) -> Result<Schema, ParseError> {
    let parsed = parse_str(input)?;
    match parsed.diagnostics.into_iter().next() {
        Some(diagnostic) => Err(ParseError::Rejected(diagnostic)),
        None => Ok(parsed.schema),
    }
}
