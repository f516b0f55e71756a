//! Cardinality and participation annotations for relationship edges.

use crate::schema::{Participation, RelType, Relationship};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

/// Notation implied by the relationship type alone.
pub fn type_notation(rel_type: &RelType, side: Side) -> &'static str {
    match (rel_type, side) {
        (RelType::OneToMany, Side::Target) | (RelType::ManyToMany, Side::Target) => "N",
        (RelType::ManyToOne, Side::Source) => "N",
        (RelType::ManyToMany, Side::Source) => "M",
        _ => "1",
    }
}

/// Notation for one side of `rel`.
///
/// Precedence: the `"lo-hi"` range string, then the per-side field, then the type.
pub fn cardinality_notation(rel: &Relationship, side: Side) -> String {
    if let Some(part) = rel.cardinality.as_deref().and_then(|c| split_range(c, side)) {
        return part.to_string();
    }

    let explicit = match side {
        Side::Source => rel.source_cardinality.as_deref(),
        Side::Target => rel.target_cardinality.as_deref(),
    };
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => type_notation(&rel.rel_type, side).to_string(),
    }
}

fn split_range(range: &str, side: Side) -> Option<&str> {
    let (lo, hi) = range.split_once('-')?;
    let part = match side {
        Side::Source => lo,
        Side::Target => hi,
    };
    Some(part.trim()).filter(|p| !p.is_empty())
}

pub fn participation(rel: &Relationship, side: Side) -> Participation {
    match side {
        Side::Source => rel.source_participation,
        Side::Target => rel.target_participation,
    }
    .unwrap_or_default()
}
