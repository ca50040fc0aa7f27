use crate::components::first_component;
use crate::delimiters::Delimiters;
use crate::tokenizer::{RawSegment, TokenizedMessage};

/// Identification codes read from a raw `MSH` segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeader {
    /// MSH-9.1, e.g. `ADT`
    pub message_type: Option<String>,
    /// MSH-9.2, e.g. `A01`
    pub trigger_event: Option<String>,
    /// MSH-9.3, e.g. `ADT_A01`
    pub structure: Option<String>,
    /// MSH-12.1, e.g. `2.5`
    pub version: Option<String>,
}

impl MessageHeader {
    /// Read the header of a tokenized message, if its first segment is `MSH`.
    pub fn read(message: &TokenizedMessage<'_>) -> Option<Self> {
        let msh = message.segments.first().filter(|s| s.name == "MSH")?;
        Some(Self::from_segment(msh, &message.delimiters))
    }

    pub fn from_segment(msh: &RawSegment<'_>, d: &Delimiters) -> Self {
        let component = |field: &str, index: usize| -> Option<String> {
            let rep = field.split(d.repetition).next()?;
            first_component(rep.split(d.component).nth(index)?, d)
        };
        let msh9 = msh.field(9).unwrap_or_default();
        Self {
            message_type: component(msh9, 0),
            trigger_event: component(msh9, 1),
            structure: component(msh9, 2),
            version: msh.field(12).and_then(|f| first_component(f, d)),
        }
    }

    /// Structure names to try in order: MSH-9.3, `type_event`, `type`.
    pub fn structure_candidates(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(3);
        if let Some(s) = &self.structure {
            out.push(s.clone());
        }
        if let (Some(t), Some(e)) = (&self.message_type, &self.trigger_event) {
            out.push(format!("{t}_{e}"));
        }
        if let Some(t) = &self.message_type {
            out.push(t.clone());
        }
        out.dedup();
        out
    }
}
