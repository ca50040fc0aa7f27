use std::collections::BTreeMap;

use er7_parser::{Diagnostic, MatchStats, ParseError, Parsed, Severity};
use serde::Serialize;

/// Summary of a tolerant parse, for logs, dashboards and intake triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub version: String,
    /// The structure the message was matched against, if parsing got that far.
    pub structure: Option<String>,
    /// No diagnostics of any severity.
    pub valid: bool,
    pub segments: usize,
    pub unparsed: usize,
    pub groups: usize,
    /// Matched segment occurrences by name.
    pub segment_counts: BTreeMap<String, usize>,
    pub stats: Option<MatchStats>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    pub(crate) fn from_parsed(version: &str, raw: &str, parsed: &Parsed) -> Self {
        let message = &parsed.message;
        let shape = message.shape();
        let mut segment_counts = BTreeMap::new();
        for segment in message.segments() {
            *segment_counts.entry(segment.name.to_string()).or_insert(0) += 1;
        }
        let diagnostics: Vec<Diagnostic> = parsed
            .violations
            .iter()
            .map(|v| Diagnostic::warning(v).with_source(raw))
            .collect();
        Self {
            version: version.to_string(),
            structure: Some(message.name().to_string()),
            valid: diagnostics.is_empty(),
            segments: shape.segments,
            unparsed: shape.unparsed,
            groups: shape.groups,
            segment_counts,
            stats: Some(parsed.stats),
            diagnostics,
        }
    }

    pub(crate) fn from_error(version: &str, raw: &str, err: &ParseError) -> Self {
        Self {
            version: version.to_string(),
            structure: None,
            valid: false,
            segments: 0,
            unparsed: 0,
            groups: 0,
            segment_counts: BTreeMap::new(),
            stats: None,
            diagnostics: vec![Diagnostic::error(err).with_source(raw)],
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
