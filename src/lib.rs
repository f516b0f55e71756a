pub mod cardinality;
pub mod classify;
pub mod compiler;
pub mod diagnostics;
pub mod export;
pub mod ir;
pub mod layout;
pub mod logical;
pub mod measure;
pub mod parser;
pub mod reconcile;
pub mod relationships;
pub mod schema;

use wasm_bindgen::prelude::*;

pub use compiler::{CompileError, CompileReport, DiagramCompiler, compile, compile_json};
pub use diagnostics::Diagnostic;
pub use ir::{DiagramMode, Graph};
pub use reconcile::{DiagramEvent, DiagramSession, EditOutcome, reduce, reduce_document};
pub use schema::{Column, Point, RelType, Relationship, Schema, Table};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

/// Compile schema JSON into renderer graph JSON.
///
/// Malformed schemas degrade to a partial or empty graph; only text that is
/// not JSON at all is reported as an error.
#[wasm_bindgen(js_name = "compileDiagram")]
pub fn compile_diagram(schema_json: &str, mode: Option<String>) -> Result<String, JsValue> {
    let value: serde_json::Value = serde_json::from_str(schema_json).map_err(js_error)?;
    let mode = mode
        .as_deref()
        .and_then(DiagramMode::from_str)
        .unwrap_or_default();

    let graph = compile_json(&value, mode);
    serde_json::to_string(&graph).map_err(js_error)
}

/// Apply one renderer event to schema JSON and return the updated schema JSON.
///
/// Everything the event does not touch is returned as it came in.
#[wasm_bindgen(js_name = "applyDiagramEdit")]
pub fn apply_diagram_edit(schema_json: &str, event_json: &str) -> Result<String, JsValue> {
    let mut document: serde_json::Value = serde_json::from_str(schema_json).map_err(js_error)?;
    let event: DiagramEvent = serde_json::from_str(event_json).map_err(js_error)?;

    reduce_document(&mut document, &event);
    serde_json::to_string(&document).map_err(js_error)
}
