use std::sync::Once;
use std::thread;

use er7::{ParseError, ParseOptions, Severity};
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::{init_test_logger, registry, ADT_A01, ORU_R01, VERSION};

static INSTALL: Once = Once::new();

fn setup() {
    INSTALL.call_once(|| {
        init_test_logger();
        er7::install_registry(registry().unwrap()).unwrap();
    });
}

#[test]
fn process_wide_registry_parses_and_encodes() {
    setup();
    let message = er7::parse(ADT_A01, VERSION).unwrap();
    assert_eq!(message.version(), VERSION);
    assert_eq!(er7::encode(&message).unwrap(), ADT_A01);
    assert!(er7::install_registry(registry().unwrap()).is_err());
}

#[test]
fn unknown_version_is_fatal() {
    setup();
    assert!(matches!(
        er7::parse(ORU_R01, "2.3"),
        Err(ParseError::UnknownStructure(ref e)) if e.version == "2.3"
    ));
    let parsed = er7::parse_with(ORU_R01, VERSION, ParseOptions::tolerant()).unwrap();
    assert!(parsed.is_valid());
}

#[test]
fn version_is_read_from_the_header() {
    assert_eq!(er7::detect_version(ORU_R01).as_deref(), Some(VERSION));
}

#[test]
fn analysis_serializes_for_triage() {
    setup();
    let raw = concat!(
        "MSH|^~\\&|LAB|HOSP|EHR|HOSP|20250101120000||ORU^R01^ORU_R01|43|P|2.5\r",
        "PID|1||12345||DOE^JANE\r",
        "OBR|1|A1|B1|CBC\r",
        "OBX|1|NM|||7.5\r",
        "ZDS|custom\r",
    );
    let report = er7::analyze(raw, VERSION);
    assert!(!report.valid);
    assert_eq!(report.errors().count(), 0);
    assert!(report.diagnostics.iter().all(|d| d.severity == Severity::Warning));

    let json: Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["structure"], "ORU_R01");
    assert_eq!(json["segments"], 4);
    assert_eq!(json["unparsed"], 1);
    assert_eq!(json["segment_counts"]["OBX"], 1);
    assert_eq!(json["stats"]["segments"], 4);
    assert_eq!(json["diagnostics"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["diagnostics"][0]["snippet"], "ZDS|custom");
}

#[test]
fn parsing_scales_across_threads() {
    setup();
    let handles: Vec<_> = (0..8)
        .map(|n| {
            thread::spawn(move || {
                let raw = if n % 2 == 0 { ADT_A01 } else { ORU_R01 };
                let message = er7::parse(raw, VERSION).unwrap();
                er7::encode(&message).unwrap() == raw
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
