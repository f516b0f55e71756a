//! Records of input the compiler or reconciler had to drop or adjust.
//!
//! Lenient entry points swallow these after logging them; the strict and
//! report variants hand them back to the caller.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    #[error("schema is not a JSON object")]
    NotAnObject,
    #[error("schema has no `tables` array")]
    MissingTables,
    #[error("table #{index} dropped: {reason}")]
    InvalidTable { index: usize, reason: String },
    #[error("table #{index} dropped: duplicate name `{name}`")]
    DuplicateTable { index: usize, name: String },
    #[error("relationship #{index} dropped: {reason}")]
    InvalidRelationship { index: usize, reason: String },
    #[error("`{owner}`: malformed `{field}` replaced with its default")]
    InvalidField { owner: String, field: String },
    #[error("saved position for `{id}` ignored")]
    InvalidNodePosition { id: String },
    #[error("relationship `{name}` dropped: no table named `{missing}`")]
    DanglingRelationship {
        index: usize,
        name: String,
        missing: String,
    },
    #[error("node id `{id}` already used, renamed to `{renamed_to}`")]
    DuplicateNodeId { id: String, renamed_to: String },
    #[error("non-finite position for `{id}` replaced")]
    NonFinitePosition { id: String },
    #[error("move of `{id}` matched nothing in the schema")]
    UnmatchedMove { id: String },
    #[error("cannot connect `{node_id}`: not an existing entity node")]
    UnknownConnectEndpoint { node_id: String },
}
