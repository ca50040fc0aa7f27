//! Shared fixtures for the end-to-end tests: a trimmed 2.5 grammar with
//! ACK, ADT_A01 and ORU_R01 and a handful of sample messages.

use std::sync::{Arc, Once};

use er7_grammar::{Grammar, GrammarError, GrammarRegistry};

pub const VERSION: &str = "2.5";

pub const GRAMMAR_JSON: &str = include_str!("../fixtures/v2_5.json");

pub const ADT_A01: &str = concat!(
    "MSH|^~\\&|ADT1|GOOD HEALTH HOSPITAL|GHH LAB|GHH LAB|198808181126|SECURITY|ADT^A01^ADT_A01|MSG00001|P|2.5\r",
    "EVN|A01|200708181123\r",
    "PID|1||PATID1234^5^M11^ADT1^MR^GOOD HEALTH HOSPITAL~123456789^^^USSSA^SS||EVERYMAN^ADAM^A^III\r",
    "PV1|1|I|2000^2012^01\r",
    "NK1|1|NUCLEAR^NELDA^W\r",
    "NK1|2|MUM^MARTHA^M\r",
    "IN1|1|PLAN1\r",
    "IN2|x\r",
    "IN1|2|PLAN2\r",
);

pub const ORU_R01: &str = concat!(
    "MSH|^~\\&|LAB|HOSP|EHR|HOSP|20250101120000||ORU^R01^ORU_R01|42|P|2.5\r",
    "PID|1||12345^^^HOSP^MR||DOE^JANE\r",
    "OBR|1|A1|B1|CBC^Complete blood count\r",
    "OBX|1|NM|WBC^Leukocytes||7.5|10*3/uL\r",
    "NTE|1||verified\r",
    "OBX|2|NM|HGB^Hemoglobin||13.2|g/dL\r",
    "OBR|2|A2|B2|LIPID^Lipid panel\r",
    "OBX|1|NM|CHOL^Cholesterol||190|mg/dL\r",
);

pub fn grammar() -> Result<Grammar, GrammarError> {
    Grammar::from_json(VERSION, GRAMMAR_JSON)
}

pub fn registry() -> Result<GrammarRegistry, GrammarError> {
    let mut registry = GrammarRegistry::new();
    registry.load_json(VERSION, GRAMMAR_JSON)?;
    Ok(registry)
}

pub fn shared_grammar() -> Result<Arc<Grammar>, GrammarError> {
    grammar().map(Arc::new)
}

static INIT: Once = Once::new();

pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();
    });
}

#[cfg(test)]
mod adt;
#[cfg(test)]
mod facade;
#[cfg(test)]
mod lab_results;
