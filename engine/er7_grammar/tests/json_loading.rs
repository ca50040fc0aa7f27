use er7_grammar::{Cardinality, ChildKind, GrammarError, GrammarNode, GrammarRegistry, MaxOccurs};
use pretty_assertions::assert_eq;

const ORU: &str = r#"{
  "segments": [
    { "name": "OBX", "fields": [
      { "name": "OBX-1" },
      { "name": "OBX-2", "cardinality": "1..1" },
      { "name": "OBX-3", "cardinality": "1..1" }
    ] }
  ],
  "groups": [
    { "name": "ORU_R01", "combinator": "sequence", "children": [
      { "name": "MSH", "kind": "segment" },
      { "name": "PATIENT_RESULT", "kind": "group", "cardinality": "1..*" }
    ] },
    { "name": "PATIENT_RESULT", "combinator": "sequence", "children": [
      { "name": "PID", "kind": "segment", "cardinality": "0..1" },
      { "name": "ORDER_OBSERVATION", "kind": "group", "cardinality": "1..*" }
    ] },
    { "name": "ORDER_OBSERVATION", "combinator": "sequence", "children": [
      { "name": "OBR", "kind": "segment" },
      { "name": "OBSERVATION", "kind": "group", "cardinality": "0..*" }
    ] },
    { "name": "OBSERVATION", "combinator": "sequence", "children": [
      { "name": "OBX", "kind": "segment" },
      { "name": "NTE", "kind": "segment", "cardinality": "0..*" }
    ] }
  ],
  "aliases": { "ORU_R30": "ORU_R01" }
}"#;

#[test]
fn loads_nested_groups_from_json() {
    let mut registry = GrammarRegistry::new();
    let grammar = registry.load_json("2.5", ORU).expect("valid grammar");
    assert_eq!(grammar.version(), "2.5");

    let root = registry.resolve("2.5", "ORU_R30").expect("alias resolves");
    let GrammarNode::Sequence(msg) = root.node() else {
        panic!("ORU_R01 is a sequence");
    };
    assert_eq!(msg.slots.len(), 2);
    assert_eq!(msg.slots[1].kind, ChildKind::Group);
    assert_eq!(msg.slots[1].cardinality, Cardinality::AT_LEAST_ONE);
    assert_eq!(msg.slots[0].cardinality, Cardinality::ONE);

    let result = grammar
        .group(grammar.lookup("PATIENT_RESULT").unwrap())
        .unwrap();
    let first: Vec<&str> = result.first().iter().map(|s| s.as_str()).collect();
    assert_eq!(first, vec!["OBR", "PID"]);
}

#[test]
fn field_layouts_default_to_optional() {
    let grammar = er7_grammar::Grammar::from_json("2.5", ORU).unwrap();
    let obx = grammar.segment(grammar.lookup("OBX").unwrap()).unwrap();
    assert_eq!(obx.fields.len(), 3);
    assert_eq!(obx.field(1).unwrap().cardinality, Cardinality::OPTIONAL);
    assert_eq!(
        obx.field(2).unwrap().cardinality.max,
        MaxOccurs::Bounded(1)
    );

    // Undeclared segments have no layout.
    let msh = grammar.segment(grammar.lookup("MSH").unwrap()).unwrap();
    assert!(msh.fields.is_empty());
}

#[test]
fn malformed_json_and_bad_cardinality_are_reported() {
    let mut registry = GrammarRegistry::new();
    assert!(matches!(
        registry.load_json("2.5", "{ not json"),
        Err(GrammarError::Json(_))
    ));
    let inverted = r#"{ "groups": [ { "name": "A", "combinator": "choice",
        "children": [ { "name": "X", "kind": "segment", "cardinality": "2..1" } ] } ] }"#;
    assert!(matches!(
        registry.load_json("2.5", inverted),
        Err(GrammarError::Json(_))
    ));
    assert_eq!(registry.versions().count(), 0);
}
