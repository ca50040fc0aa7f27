use er7_lexer::Delimiters;
use er7_parser::{encode, validate, ParseError, ParseOptions, Parser};
use er7_tree::{EditError, Message};
use pretty_assertions::assert_eq;

use crate::{init_test_logger, registry, shared_grammar, ADT_A01, VERSION};

fn parse(raw: &str) -> Message {
    init_test_logger();
    let registry = registry().unwrap();
    Parser::new(&registry).parse(raw, VERSION).unwrap().message
}

#[test]
fn admit_message_parses_strictly_and_round_trips() {
    let message = parse(ADT_A01);
    assert_eq!(message.name(), "ADT_A01");
    assert_eq!(message.get("PID-3(2)").unwrap().as_deref(), Some("123456789"));
    assert_eq!(message.get("PID-3-6").unwrap().as_deref(), Some("GOOD HEALTH HOSPITAL"));
    assert_eq!(message.get("PID-5-2").unwrap().as_deref(), Some("ADAM"));
    assert_eq!(message.get("NK1[2]-2-1").unwrap().as_deref(), Some("MUM"));
    assert_eq!(message.get("INSURANCE[2]/IN1-2").unwrap().as_deref(), Some("PLAN2"));
    assert_eq!(message.get("INSURANCE[2]/IN2-1").unwrap(), None);
    assert_eq!(message.group("INSURANCE[1]").unwrap().unwrap().children.len(), 2);
    assert!(validate(&message).is_empty());
    assert_eq!(encode(&message).unwrap(), ADT_A01);
}

#[test]
fn header_alias_selects_the_shared_structure() {
    let raw = ADT_A01.replacen("ADT^A01^ADT_A01", "ADT^A04", 1);
    let message = parse(&raw);
    assert_eq!(message.name(), "ADT_A01");
    assert_eq!(message.get("MSH-9-2").unwrap().as_deref(), Some("A04"));
}

#[test]
fn edits_are_escaped_on_the_wire() {
    let mut message = parse(ADT_A01);
    message.set("PID-5-2", "ADAM & SON").unwrap();
    message.remove("", "NK1", 1).unwrap();
    message.remove("", "INSURANCE", 2).unwrap();
    let wire = encode(&message).unwrap();
    assert!(wire.contains("PID|1||PATID1234^5^M11^ADT1^MR^GOOD HEALTH HOSPITAL~123456789^^^USSSA^SS||EVERYMAN^ADAM \\T\\ SON^A^III\r"));
    assert!(wire.contains("\rNK1|2|MUM^MARTHA^M\rIN1|1|PLAN1\rIN2|x\r"));
    assert!(!wire.contains("PLAN2"));

    let reparsed = parse(&wire);
    assert_eq!(reparsed.get("PID-5-2").unwrap().as_deref(), Some("ADAM & SON"));
    assert_eq!(reparsed, message);
}

#[test]
fn required_slots_cannot_be_removed_or_left_out() {
    let mut message = parse(ADT_A01);
    assert!(matches!(
        message.remove("", "PID", 1),
        Err(EditError::Cardinality { count: 0, .. })
    ));
    assert!(matches!(message.set("MSH-2", "^~"), Err(EditError::ReadOnlyField(_))));

    let grammar = shared_grammar().unwrap();
    let root = grammar.lookup("ADT_A01").unwrap();
    let mut built = Message::new(grammar, root, Delimiters::default()).unwrap();
    built.add_segment("", "MSH").unwrap();
    built.add_segment("", "PID").unwrap();
    built.set("PID-3", "1").unwrap();
    built.set("PID-5", "DOE").unwrap();
    let err = encode(&built).unwrap_err();
    assert!(err.to_string().contains("ADT_A01/EVN"), "{err}");
}

#[test]
fn tolerant_parse_keeps_what_strict_parse_rejects() {
    init_test_logger();
    let registry = registry().unwrap();
    let raw = concat!(
        "MSH|^~\\&|ADT1|GHH|||||ADT^A01|MSG2|P|2.5\r",
        "EVN|A01|200708181123\r",
        "PID|1||||EVERYMAN\r",
        "ZPD|site specific\r",
        "NK1|1\r",
    );
    let strict = Parser::new(&registry).parse(raw, VERSION).unwrap_err();
    assert!(matches!(strict, ParseError::Cardinality(ref e) if e.path == "ADT_A01/PID-3"), "{strict}");

    let parsed = Parser::with_options(&registry, ParseOptions::tolerant())
        .parse(raw, VERSION)
        .unwrap();
    assert_eq!(parsed.violations.len(), 2);
    assert!(matches!(
        parsed.violations[0],
        ParseError::UnexpectedSegment { position: 3, line: 4, .. }
    ));
    assert!(matches!(parsed.violations[1], ParseError::Cardinality(ref e) if e.path == "ADT_A01/PID-3"));
    assert_eq!(parsed.message.unparsed().len(), 1);
    assert_eq!(encode(&parsed.message).unwrap(), raw);
}
