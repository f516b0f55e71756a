//! Structural role of a table within the relationship graph.

use crate::schema::{Relationship, Table};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityClass {
    #[default]
    Strong,
    /// Identity depends on an owner through an identifying relationship.
    Weak,
    /// Junction table resolving a many-to-many between two other entities.
    Associative,
    /// Reference data flagged by the schema author.
    Lookup,
}

/// Classify `table` against the full relationship list.
///
/// Weak wins over associative, associative over lookup; everything else is strong.
pub fn classify(table: &Table, relationships: &[Relationship]) -> EntityClass {
    if is_weak(table, relationships) {
        EntityClass::Weak
    } else if is_associative(table, relationships) {
        EntityClass::Associative
    } else if table.is_lookup_table {
        EntityClass::Lookup
    } else {
        EntityClass::Strong
    }
}

fn is_weak(table: &Table, relationships: &[Relationship]) -> bool {
    relationships
        .iter()
        .any(|r| r.is_identifying() && r.target_table == table.name)
}

fn is_associative(table: &Table, relationships: &[Relationship]) -> bool {
    if table.foreign_key_count() != 2 {
        return false;
    }
    let partners: BTreeSet<&str> = relationships
        .iter()
        .filter_map(|r| r.other_end(&table.name))
        .filter(|other| *other != table.name)
        .collect();
    partners.len() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, RelType};

    fn fk(name: &str) -> Column {
        Column {
            is_foreign_key: true,
            ..Column::named(name)
        }
    }

    fn table(name: &str, columns: Vec<Column>) -> Table {
        Table {
            name: name.to_string(),
            columns,
            ..Table::default()
        }
    }

    #[test]
    fn test_default_strong() {
        let t = table("Customer", vec![Column::named("id")]);
        assert_eq!(classify(&t, &[]), EntityClass::Strong);
    }

    #[test]
    fn test_associative() {
        let t = table("Enrollment", vec![fk("student_id"), fk("course_id")]);
        let rels = vec![
            Relationship::new("enrolls", "Student", "Enrollment", RelType::OneToMany),
            Relationship::new("has", "Course", "Enrollment", RelType::OneToMany),
        ];
        assert_eq!(classify(&t, &rels), EntityClass::Associative);
        assert_eq!(classify(&t, &rels), classify(&t, &rels));
    }

    #[test]
    fn test_associative_needs_two_distinct_partners() {
        let t = table("Enrollment", vec![fk("a"), fk("b")]);
        let rels = vec![
            Relationship::new("x", "Student", "Enrollment", RelType::OneToMany),
            Relationship::new("y", "Enrollment", "Student", RelType::ManyToOne),
            Relationship::new("self", "Enrollment", "Enrollment", RelType::OneToOne),
        ];
        assert_eq!(classify(&t, &rels), EntityClass::Strong);
    }

    #[test]
    fn test_associative_needs_exactly_two_fks() {
        let t = table("Enrollment", vec![fk("a"), fk("b"), fk("c")]);
        let rels = vec![
            Relationship::new("x", "Student", "Enrollment", RelType::OneToMany),
            Relationship::new("y", "Course", "Enrollment", RelType::OneToMany),
        ];
        assert_eq!(classify(&t, &rels), EntityClass::Strong);
    }

    #[test]
    fn test_weak_beats_associative() {
        let t = table("Enrollment", vec![fk("student_id"), fk("course_id")]);
        let mut owner = Relationship::new("owns", "Student", "Enrollment", RelType::OneToMany);
        owner.is_identifying = Some(true);
        let rels = vec![
            owner,
            Relationship::new("has", "Course", "Enrollment", RelType::OneToMany),
        ];
        assert_eq!(classify(&t, &rels), EntityClass::Weak);
    }

    #[test]
    fn test_identifying_source_is_not_weak() {
        let t = table("Building", vec![]);
        let mut rel = Relationship::new("contains", "Building", "Room", RelType::OneToMany);
        rel.is_identifying = Some(true);
        assert_eq!(classify(&t, &[rel]), EntityClass::Strong);
    }

    #[test]
    fn test_lookup_flag() {
        let t = Table {
            is_lookup_table: true,
            ..table("Country", vec![])
        };
        assert_eq!(classify(&t, &[]), EntityClass::Lookup);
    }
}
