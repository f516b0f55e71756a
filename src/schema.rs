//! Schema data model consumed by the diagram compiler.
//!
//! Field names follow the camelCase JSON produced by the upstream schema
//! generator. Construction from untrusted JSON goes through
//! [`crate::parser`], which is the only place shapes are validated.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// A 2D coordinate in diagram space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    /// Saved positions for nodes that are neither entities nor relationships,
    /// keyed by node ID.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub node_positions: BTreeMap<String, Point>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_columns")]
    pub columns: Vec<Column>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "is_false")]
    pub is_lookup_table: bool,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Vec::is_empty")]
    pub assumptions_made: Vec<String>,
}

impl Table {
    pub fn foreign_key_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_foreign_key).count()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub is_primary_key: bool,
    #[serde(deserialize_with = "lenient")]
    pub is_foreign_key: bool,
    #[serde(deserialize_with = "lenient")]
    pub is_nullable: bool,
    #[serde(deserialize_with = "lenient")]
    pub is_multivalued: bool,
    #[serde(deserialize_with = "lenient")]
    pub is_derived: bool,
    #[serde(deserialize_with = "lenient")]
    pub is_composite: bool,
    #[serde(
        deserialize_with = "lenient_columns",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub sub_attributes: Vec<Column>,
}

impl Column {
    pub const UNNAMED: &'static str = "Unnamed";

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Label shown for the column; blank names render as `Unnamed`.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            Self::UNNAMED
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub source_table: String,
    #[serde(default, deserialize_with = "lenient")]
    pub target_table: String,
    #[serde(rename = "type", default)]
    pub rel_type: RelType,
    #[serde(
        default,
        alias = "identifying",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_identifying: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub source_cardinality: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub target_cardinality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_participation: Option<Participation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_participation: Option<Participation>,
    /// Explicit `"lo-hi"` range; wins over everything derived from `rel_type`.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_columns",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub attributes: Vec<Column>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Vec::is_empty")]
    pub assumptions_made: Vec<String>,
}

impl Relationship {
    pub fn new(
        name: impl Into<String>,
        source_table: impl Into<String>,
        target_table: impl Into<String>,
        rel_type: RelType,
    ) -> Self {
        Self {
            name: name.into(),
            source_table: source_table.into(),
            target_table: target_table.into(),
            rel_type,
            ..Self::default()
        }
    }

    /// True when flagged identifying or typed as an identifying relationship.
    pub fn is_identifying(&self) -> bool {
        self.is_identifying.unwrap_or(false) || self.rel_type == RelType::IdentifyingRelationship
    }

    pub fn touches(&self, table: &str) -> bool {
        self.source_table == table || self.target_table == table
    }

    /// The endpoint opposite `table`, if `table` is one of the endpoints.
    pub fn other_end(&self, table: &str) -> Option<&str> {
        if self.source_table == table {
            Some(&self.target_table)
        } else if self.target_table == table {
            Some(&self.source_table)
        } else {
            None
        }
    }

    /// Name used for node identity; unnamed relationships fall back to `rel<index>`.
    pub fn effective_name(&self, index: usize) -> String {
        if self.name.trim().is_empty() {
            format!("rel{index}")
        } else {
            self.name.clone()
        }
    }

    /// Stored position, honoured only while the relationship is draggable.
    pub fn saved_position(&self) -> Option<Point> {
        if self.draggable == Some(false) {
            return None;
        }
        self.position
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RelType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    IdentifyingRelationship,
    /// Anything unrecognised. Carries the raw string so it survives a round trip.
    Other(String),
    #[default]
    Unspecified,
}

impl RelType {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "ONE_TO_ONE" => Self::OneToOne,
            "ONE_TO_MANY" => Self::OneToMany,
            "MANY_TO_ONE" => Self::ManyToOne,
            "MANY_TO_MANY" => Self::ManyToMany,
            "IDENTIFYING_RELATIONSHIP" => Self::IdentifyingRelationship,
            "" => Self::Unspecified,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::OneToOne => "ONE_TO_ONE",
            Self::OneToMany => "ONE_TO_MANY",
            Self::ManyToOne => "MANY_TO_ONE",
            Self::ManyToMany => "MANY_TO_MANY",
            Self::IdentifyingRelationship => "IDENTIFYING_RELATIONSHIP",
            Self::Other(raw) => raw,
            Self::Unspecified => "",
        }
    }
}

impl Serialize for RelType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Self::parse(&s),
            _ => Self::Unspecified,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Participation {
    #[default]
    Partial,
    Total,
}

impl<'de> Deserialize<'de> for Participation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if s.eq_ignore_ascii_case("total") => Self::Total,
            _ => Self::Partial,
        })
    }
}

/// A field of the wrong shape (or `null`) falls back to its default instead
/// of failing the whole record. [`crate::parser`] reports such fields.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Column lists tolerate junk: a non-array becomes empty and a non-object
/// entry becomes an unnamed column with every flag off. Object entries keep
/// whatever fields are well formed.
fn lenient_columns<'de, D>(deserializer: D) -> Result<Vec<Column>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .iter()
            .map(|item| Column::deserialize(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

fn is_false(b: &bool) -> bool {
    !*b
}
