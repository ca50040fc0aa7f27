use er7_parser::{encode, Diagnostic, ParseError, ParseOptions, Parser};
use pretty_assertions::assert_eq;

use crate::{init_test_logger, registry, ORU_R01, VERSION};

const PARTIAL_ORU: &str = concat!(
    "MSH|^~\\&|LAB|HOSP|EHR|HOSP|20250101120000||ORU^R01^ORU_R01|43|P|2.5\r",
    "PID|1||12345||DOE^JANE\r",
    "OBR|1|A1|B1|CBC\r",
    "OBX|1|NM|||7.5\r",
    "ZDS|custom\r",
);

const OBX_PATH: &str = "ORU_R01/PATIENT_RESULT[1]/ORDER_OBSERVATION[1]/OBSERVATION[1]/OBX-3";

#[test]
fn nested_groups_follow_the_observation_hierarchy() {
    init_test_logger();
    let registry = registry().unwrap();
    let parsed = Parser::new(&registry).parse(ORU_R01, VERSION).unwrap();
    let message = &parsed.message;
    assert!(parsed.is_valid());
    assert_eq!(parsed.stats.segments, 8);

    let result = message.group("PATIENT_RESULT").unwrap().unwrap();
    assert_eq!(result.groups().filter(|g| g.name == "ORDER_OBSERVATION").count(), 2);
    let first_order = message.group("PATIENT_RESULT/ORDER_OBSERVATION[1]").unwrap().unwrap();
    assert_eq!(first_order.groups().count(), 2);

    assert_eq!(message.get("PATIENT_RESULT/PATIENT/PID-5-2").unwrap().as_deref(), Some("JANE"));
    assert_eq!(
        message
            .get("PATIENT_RESULT/ORDER_OBSERVATION/OBSERVATION[1]/NTE-3")
            .unwrap()
            .as_deref(),
        Some("verified")
    );
    assert_eq!(
        message
            .get("PATIENT_RESULT/ORDER_OBSERVATION[2]/OBSERVATION/OBX-5")
            .unwrap()
            .as_deref(),
        Some("190")
    );
    assert_eq!(
        message
            .get_raw("PATIENT_RESULT/ORDER_OBSERVATION[1]/OBSERVATION[2]/OBX-3")
            .unwrap()
            .as_deref(),
        Some("HGB^Hemoglobin")
    );
    assert_eq!(encode(message).unwrap(), ORU_R01);
}

#[test]
fn missing_order_is_reported_at_its_slot() {
    init_test_logger();
    let registry = registry().unwrap();
    let raw = "MSH|^~\\&|LAB|HOSP|||||ORU^R01|44|P|2.5\rPID|1||12345||DOE\r";
    match Parser::new(&registry).parse(raw, VERSION).unwrap_err() {
        ParseError::Cardinality(err) => {
            assert_eq!(err.path, "ORU_R01/PATIENT_RESULT[1]/ORDER_OBSERVATION");
            assert_eq!(err.actual, 0);
            assert_eq!(err.found, None);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn partial_result_fails_strictly_and_is_diagnosed_tolerantly() {
    init_test_logger();
    let registry = registry().unwrap();
    let strict = Parser::new(&registry).parse(PARTIAL_ORU, VERSION).unwrap_err();
    assert!(matches!(strict, ParseError::Cardinality(ref e) if e.path == OBX_PATH), "{strict}");

    let parsed = Parser::with_options(&registry, ParseOptions::tolerant())
        .parse(PARTIAL_ORU, VERSION)
        .unwrap();
    let diagnostics: Vec<Diagnostic> = parsed
        .violations
        .iter()
        .map(|v| Diagnostic::warning(v).with_source(PARTIAL_ORU))
        .collect();
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].line, Some(5));
    assert_eq!(diagnostics[0].snippet.as_deref(), Some("ZDS|custom"));
    assert!(diagnostics[0].render().starts_with("warning: line 5: segment `ZDS`"));
    assert!(diagnostics[1].message.starts_with(OBX_PATH));
    assert_eq!(diagnostics[1].line, None);

    let observation = parsed
        .message
        .group("PATIENT_RESULT/ORDER_OBSERVATION/OBSERVATION")
        .unwrap()
        .unwrap();
    assert!(observation.children.iter().any(|c| c.is_unparsed()));
    assert_eq!(encode(&parsed.message).unwrap(), PARTIAL_ORU);
}
