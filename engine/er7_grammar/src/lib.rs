//! HL7 v2 message grammars.
//!
//! A [`Grammar`] is an arena of [`GrammarNode`]s for one HL7 version: segment
//! leaves with their field layouts, and sequence/choice groups whose slots
//! reference other nodes by [`NodeId`]. Names are resolved, cycles rejected
//! and lookahead sets computed once, when the grammar is built.
//! [`GrammarRegistry`] maps versions to grammars and is the only lookup the
//! parser consumes.

pub mod builder;
pub mod cardinality;
pub mod definition;
pub mod error;
pub mod grammar;
pub mod node;
pub mod registry;

pub use builder::GrammarBuilder;
pub use cardinality::{Cardinality, MaxOccurs};
pub use definition::{ChildDef, GrammarDef, GroupDef, SegmentDef};
pub use error::{CardinalityParseError, GrammarError, UnknownStructureError};
pub use grammar::Grammar;
pub use node::{ChildKind, Combinator, FieldSpec, GrammarNode, GroupNode, NodeId, SegmentNode, Slot};
pub use registry::{GrammarRegistry, StructureRef};
