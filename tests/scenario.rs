use erdgraph::classify::EntityClass;
use erdgraph::ir::{EdgeKind, NodeKind};
use erdgraph::{DiagramMode, DiagramSession, Point, compile_json};
use serde_json::json;

fn shop() -> serde_json::Value {
    json!({
        "name": "shop",
        "tables": [
            {"name": "Customer", "columns": [
                {"name": "id", "dataType": "int", "isPrimaryKey": true},
                {"name": "name", "dataType": "text"}
            ]},
            {"name": "Order", "columns": [
                {"name": "id", "dataType": "int", "isPrimaryKey": true},
                {"name": "customer_id", "dataType": "int", "isForeignKey": true}
            ]}
        ],
        "relationships": [
            {"name": "places", "sourceTable": "Customer", "targetTable": "Order", "type": "ONE_TO_MANY"}
        ]
    })
}

#[test]
fn test_customer_order_conceptual() {
    let graph = compile_json(&shop(), DiagramMode::Conceptual);

    assert_eq!(graph.entity_nodes().count(), 2);
    assert_eq!(graph.attribute_nodes().count(), 4);
    let rels: Vec<_> = graph.relationship_nodes().collect();
    assert_eq!(rels.len(), 1);
    match &rels[0].kind {
        NodeKind::Relationship(data) => assert_eq!(data.name, "places"),
        other => panic!("unexpected node kind {other:?}"),
    }

    let rel_edges: Vec<_> = graph
        .edges
        .iter()
        .filter(|e| e.kind == EdgeKind::Relationship)
        .collect();
    assert_eq!(rel_edges.len(), 2);

    let source_side = rel_edges.iter().find(|e| e.source == "entity-Customer").unwrap();
    assert_eq!(source_side.data.source_cardinality, "1");
    assert_eq!(source_side.data.target_cardinality, "");

    let target_side = rel_edges.iter().find(|e| e.target == "entity-Order").unwrap();
    assert_eq!(target_side.data.source_cardinality, "");
    assert_eq!(target_side.data.target_cardinality, "N");
}

#[test]
fn test_renderer_json_shape() {
    let graph = compile_json(&shop(), DiagramMode::Logical);
    let value = serde_json::to_value(&graph).unwrap();

    assert_eq!(value["nodes"][0]["id"], "entity-Customer");
    assert_eq!(value["nodes"][0]["type"], "entity");
    assert_eq!(value["nodes"][0]["position"], json!({"x": 100.0, "y": 100.0}));

    let edge = &value["edges"][0];
    assert_eq!(edge["type"], "logical");
    assert_eq!(edge["sourceHandle"], "right");
    assert_eq!(edge["targetHandle"], "left");
    assert_eq!(edge["data"]["sourceCardinality"], "1");
    assert_eq!(edge["data"]["targetCardinality"], "N");
    assert_eq!(edge["data"]["sourceParticipation"], "partial");
    assert_eq!(edge["data"]["relationshipType"], "ONE_TO_MANY");
    assert_eq!(edge["data"]["isIdentifying"], false);
}

#[test]
fn test_malformed_inputs_never_panic() {
    for value in [
        serde_json::Value::Null,
        json!({}),
        json!({"tables": [null]}),
        json!({"tables": [{"name": "A"}], "relationships": [null, {"sourceTable": "A"}]}),
        json!("schema"),
    ] {
        for mode in [DiagramMode::Conceptual, DiagramMode::Logical] {
            let graph = compile_json(&value, mode);
            for edge in &graph.edges {
                assert!(graph.node(&edge.source).is_some());
                assert!(graph.node(&edge.target).is_some());
            }
        }
    }
    assert!(compile_json(&json!({"tables": [null]}), DiagramMode::Conceptual).is_empty());
}

#[test]
fn test_junction_table_classified() {
    let value = json!({
        "tables": [
            {"name": "Student", "columns": [{"name": "id", "isPrimaryKey": true}]},
            {"name": "Course", "columns": [{"name": "id", "isPrimaryKey": true}]},
            {"name": "Enrollment", "columns": [
                {"name": "student_id", "isForeignKey": true},
                {"name": "course_id", "isForeignKey": true}
            ]},
            {"name": "Grade", "columns": [{"name": "value"}]}
        ],
        "relationships": [
            {"name": "enrolls", "sourceTable": "Student", "targetTable": "Enrollment", "type": "ONE_TO_MANY"},
            {"name": "offers", "sourceTable": "Course", "targetTable": "Enrollment", "type": "ONE_TO_MANY"},
            {"name": "earns", "sourceTable": "Enrollment", "targetTable": "Grade", "identifying": true}
        ]
    });
    let graph = compile_json(&value, DiagramMode::Conceptual);
    let class_of = |id: &str| match &graph.node(id).unwrap().kind {
        NodeKind::Entity(data) => data.class,
        other => panic!("unexpected node kind {other:?}"),
    };
    assert_eq!(class_of("entity-Student"), EntityClass::Strong);
    assert_eq!(class_of("entity-Enrollment"), EntityClass::Associative);
    assert_eq!(class_of("entity-Grade"), EntityClass::Weak);
}

#[test]
fn test_edit_loop_round_trip() {
    let parsed = erdgraph::parser::parse_value(&shop());
    let mut session = DiagramSession::new(parsed.schema, DiagramMode::Conceptual);

    session.on_node_drag_stop("entity-Order", Point::new(900.0, 300.0));
    session.on_node_drag_stop("attr-entity-Order-id", Point::new(1.0, 2.0));
    session.on_connect("entity-Order", "entity-Customer");

    // The saved schema compiles to the same graph the session holds.
    let saved = serde_json::to_value(session.schema()).unwrap();
    assert_eq!(saved["nodePositions"]["attr-entity-Order-id"], json!({"x": 1.0, "y": 2.0}));
    let recompiled = compile_json(&saved, DiagramMode::Conceptual);
    assert_eq!(&recompiled, session.graph());

    assert_eq!(
        session.graph().node("entity-Order").unwrap().position,
        Point::new(900.0, 300.0)
    );
    assert!(
        session
            .graph()
            .node("relationship-Order_Customer-Order-to-Customer")
            .is_some()
    );
}

#[test]
fn test_wasm_entry_points_on_valid_input() {
    let graph_json =
        erdgraph::compile_diagram(&shop().to_string(), Some("logical".to_string())).unwrap();
    let graph: serde_json::Value = serde_json::from_str(&graph_json).unwrap();
    assert_eq!(graph["edges"].as_array().unwrap().len(), 1);

    let event = r#"{"event":"nodeMoved","id":"entity-Customer","type":"entity","position":{"x":5,"y":6}}"#;
    let schema_json = erdgraph::apply_diagram_edit(&shop().to_string(), event).unwrap();
    let schema: serde_json::Value = serde_json::from_str(&schema_json).unwrap();
    assert_eq!(schema["tables"][0]["position"], json!({"x": 5.0, "y": 6.0}));
}

#[test]
fn test_malformed_optional_fields_keep_the_graph() {
    let value = json!({
        "tables": [
            {"name": "A", "isLookupTable": null, "columns": [
                {"name": "id"},
                {"name": "email", "isNullable": null},
                {"name": "age", "dataType": 7}
            ]},
            {"name": "B", "assumptionsMade": null, "description": 5}
        ],
        "relationships": [
            {"name": "r", "sourceTable": "A", "targetTable": "B", "type": "ONE_TO_MANY", "draggable": "yes"}
        ],
        "nodePositions": {"attr-entity-A-email": {"x": 40.0, "y": 50.0}}
    });
    let graph = compile_json(&value, DiagramMode::Conceptual);

    let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "entity-A",
            "attr-entity-A-id",
            "attr-entity-A-email",
            "attr-entity-A-age",
            "entity-B",
            "relationship-r-A-to-B"
        ]
    );
    assert_eq!(
        graph.node("attr-entity-A-email").unwrap().position,
        Point::new(40.0, 50.0)
    );
    assert_eq!(graph.edges.len(), 5);
}

#[test]
fn test_wasm_edit_keeps_unrelated_tables() {
    let schema = json!({
        "tables": [
            {"name": "A", "columns": [{"name": "id", "comment": "surrogate"}]},
            {"name": "B", "isLookupTable": null, "position": {"x": 70.0, "y": 80.0}},
            {"columns": []}
        ],
        "nodePositions": {"attr-entity-A-id": {"x": 9.0, "y": 9.0}}
    });
    let event = r#"{"event":"nodeMoved","id":"entity-A","position":{"x":1,"y":2}}"#;
    let saved_json = erdgraph::apply_diagram_edit(&schema.to_string(), event).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&saved_json).unwrap();

    let mut expected = schema.clone();
    expected["tables"][0]["position"] = json!({"x": 1.0, "y": 2.0});
    assert_eq!(saved, expected);

    // Earlier saved positions survive and still drive the layout.
    let graph = compile_json(&saved, DiagramMode::Conceptual);
    assert_eq!(graph.node("entity-B").unwrap().position, Point::new(70.0, 80.0));
    assert_eq!(graph.node("attr-entity-A-id").unwrap().position, Point::new(9.0, 9.0));
}

#[test]
fn test_wasm_edit_moves_hyphenated_relationship() {
    let schema = json!({
        "tables": [{"name": "order-item"}, {"name": "B"}],
        "relationships": [{"name": "has", "sourceTable": "order-item", "targetTable": "B"}]
    });
    let event = r#"{"event":"nodeMoved","id":"relationship-has-order-item-to-B","position":{"x":3,"y":4}}"#;
    let saved_json = erdgraph::apply_diagram_edit(&schema.to_string(), event).unwrap();
    let saved: serde_json::Value = serde_json::from_str(&saved_json).unwrap();
    assert_eq!(saved["relationships"][0]["position"], json!({"x": 3.0, "y": 4.0}));
}
