use std::sync::Arc;

use er7_grammar::{Grammar, NodeId};
use er7_lexer::{escape, Delimiters};

use crate::element::{Element, Group};
use crate::error::{EditError, PathError};
use crate::field::{encode_components, Field};
use crate::path::{FieldRef, Path, PathStep};
use crate::segment::Segment;
use crate::visit::{SegmentCollector, ShapeCounter, Visitable};

/// A message tree: the root group occurrence, the delimiter profile it was
/// read with (and will be written with), and the grammar it conforms to.
#[derive(Debug, Clone)]
pub struct Message {
    grammar: Arc<Grammar>,
    delimiters: Delimiters,
    root: Group,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.grammar.version() == other.grammar.version()
            && self.delimiters == other.delimiters
            && self.root == other.root
    }
}

impl Message {
    /// An empty tree for `structure`, which must be a group of `grammar`.
    pub fn new(grammar: Arc<Grammar>, structure: NodeId, delimiters: Delimiters) -> Result<Self, EditError> {
        let node = grammar
            .get(structure)
            .ok_or_else(|| EditError::NotFound(structure.to_string()))?;
        if node.as_group().is_none() {
            return Err(EditError::NotAGroup(node.name().to_string()));
        }
        let root = Group::new(node.name().clone(), structure, 1);
        Ok(Self {
            grammar,
            delimiters,
            root,
        })
    }

    pub fn from_parts(grammar: Arc<Grammar>, delimiters: Delimiters, root: Group) -> Self {
        Self {
            grammar,
            delimiters,
            root,
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn version(&self) -> &str {
        self.grammar.version()
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    /// Encode with a different profile from now on. Values are stored
    /// unescaped, so nothing else changes.
    pub fn set_delimiters(&mut self, delimiters: Delimiters) {
        self.delimiters = delimiters;
        let encoding = delimiters.encoding_characters();
        fn refresh(group: &mut Group, d: &Delimiters, encoding: &str) {
            for child in &mut group.children {
                match child {
                    Element::Segment { segment, .. } | Element::Unparsed { segment } => {
                        if segment.is_header() && segment.fields.len() >= 2 {
                            segment.fields[0] = Field::opaque(d.field.to_string());
                            segment.fields[1] = Field::opaque(encoding);
                        }
                    }
                    Element::Group { group, .. } => refresh(group, d, encoding),
                }
            }
        }
        refresh(&mut self.root, &delimiters, &encoding);
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }

    pub fn into_root(self) -> Group {
        self.root
    }

    pub fn name(&self) -> &str {
        self.root.name.as_str()
    }

    pub fn structure(&self) -> NodeId {
        self.root.node
    }

    /// Matched segments in stored order.
    pub fn segments(&self) -> Vec<&Segment> {
        self.collect().matched
    }

    /// Segments kept aside because the grammar had no place for them.
    pub fn unparsed(&self) -> Vec<&Segment> {
        self.collect().unparsed
    }

    pub fn shape(&self) -> ShapeCounter {
        let mut counter = ShapeCounter::default();
        match self.root.accept(&mut counter) {
            Ok(()) => counter,
            Err(never) => match never {},
        }
    }

    fn collect(&self) -> SegmentCollector<'_> {
        let mut collector = SegmentCollector::default();
        match self.root.accept(&mut collector) {
            Ok(()) => collector,
            Err(never) => match never {},
        }
    }

    /// Steps below the root. A leading step naming the root itself is
    /// skipped, so validator paths can be fed back in.
    pub(crate) fn relative<'p>(&self, steps: &'p [PathStep]) -> &'p [PathStep] {
        match steps.split_first() {
            Some((first, rest))
                if first.name == self.root.name.as_str()
                    && first.occurrence == 1
                    && self.root.child(&first.name, 1).is_none() =>
            {
                rest
            }
            _ => steps,
        }
    }

    pub(crate) fn element_at(&self, steps: &[PathStep]) -> Option<&Element> {
        let steps = self.relative(steps);
        let (last, parents) = steps.split_last()?;
        let mut group = &self.root;
        for step in parents {
            group = group.child(&step.name, step.occurrence)?.as_group()?;
        }
        group.child(&last.name, last.occurrence)
    }

    pub(crate) fn group_at_mut(&mut self, path: &Path) -> Result<&mut Group, EditError> {
        let steps = self.relative(&path.steps).to_vec();
        let mut group = &mut self.root;
        for (depth, step) in steps.iter().enumerate() {
            let shown = || render_steps(&steps[..=depth]);
            group = match group.child_mut(&step.name, step.occurrence) {
                Some(Element::Group { group, .. }) => group,
                Some(_) => return Err(EditError::NotAGroup(shown())),
                None => return Err(EditError::NotFound(shown())),
            };
        }
        Ok(group)
    }

    fn segment_at_mut(&mut self, path: &Path) -> Result<&mut Segment, EditError> {
        let steps = self.relative(&path.steps).to_vec();
        let shown = render_steps(&steps);
        let Some((last, parents)) = steps.split_last() else {
            return Err(EditError::NotFound(shown));
        };
        let parent = self.group_at_mut(&Path {
            steps: parents.to_vec(),
            field: None,
        })?;
        parent
            .child_mut(&last.name, last.occurrence)
            .and_then(Element::as_segment_mut)
            .ok_or(EditError::NotFound(shown))
    }

    /// The group at `path`; the empty path is the root.
    pub fn group(&self, path: &str) -> Result<Option<&Group>, PathError> {
        let path: Path = path.parse()?;
        if self.relative(&path.steps).is_empty() {
            return Ok(Some(&self.root));
        }
        Ok(self.element_at(&path.steps).and_then(Element::as_group))
    }

    pub fn segment(&self, path: &str) -> Result<Option<&Segment>, PathError> {
        let path: Path = path.parse()?;
        Ok(self.element_at(&path.steps).and_then(Element::as_segment))
    }

    /// Unescaped leaf value at `path`. Omitted repetition, component and
    /// subcomponent indices default to 1.
    pub fn get(&self, path: &str) -> Result<Option<String>, PathError> {
        let parsed: Path = path.parse()?;
        let fref = parsed
            .field
            .ok_or_else(|| PathError::MissingField(path.to_string()))?;
        let Some(segment) = self.element_at(&parsed.steps).and_then(Element::as_segment) else {
            return Ok(None);
        };
        let Some(field) = segment.field(fref.field) else {
            return Ok(None);
        };
        if is_control_field(segment, &fref) {
            return Ok(field_text(field));
        }
        let structured = field.structured(&self.delimiters);
        Ok(structured
            .leaf(
                fref.repetition.unwrap_or(1),
                fref.component.unwrap_or(1),
                fref.subcomponent.unwrap_or(1),
            )
            .map(str::to_string))
    }

    /// Wire text of whatever `path` addresses: a whole field, one
    /// repetition, one component or one subcomponent.
    pub fn get_raw(&self, path: &str) -> Result<Option<String>, PathError> {
        let parsed: Path = path.parse()?;
        let fref = parsed
            .field
            .ok_or_else(|| PathError::MissingField(path.to_string()))?;
        let Some(segment) = self.element_at(&parsed.steps).and_then(Element::as_segment) else {
            return Ok(None);
        };
        let Some(field) = segment.field(fref.field) else {
            return Ok(None);
        };
        if is_control_field(segment, &fref) {
            return Ok(field_text(field));
        }
        let d = &self.delimiters;
        let Some(rep) = fref.repetition.or(fref.component.map(|_| 1)) else {
            return Ok(Some(field.encode(d).into_owned()));
        };
        let structured = field.structured(d);
        let Field::Value(reps) = structured.as_ref() else {
            return Ok(None);
        };
        let Some(comps) = reps.get(rep - 1) else {
            return Ok(None);
        };
        let Some(component) = fref.component else {
            return Ok(Some(encode_components(comps, d)));
        };
        let Some(subs) = comps.get(component - 1) else {
            return Ok(None);
        };
        Ok(match fref.subcomponent {
            None => Some(encode_components(std::slice::from_ref(subs), d)),
            Some(sub) => subs
                .get(sub - 1)
                .map(|leaf| escape(leaf, d).into_owned()),
        })
    }

    /// Write an unescaped leaf value, creating empty fields and components
    /// as needed. Setting `""` clears the leaf.
    pub fn set(&mut self, path: &str, value: &str) -> Result<(), EditError> {
        let parsed: Path = path.parse()?;
        let fref = parsed
            .field
            .ok_or_else(|| PathError::MissingField(path.to_string()))?;
        let d = self.delimiters;
        let segment = self.segment_at_mut(&parsed)?;
        if is_control_field(segment, &fref) {
            return Err(EditError::ReadOnlyField(path.to_string()));
        }
        segment.field_mut(fref.field).set_leaf(
            &d,
            fref.repetition.unwrap_or(1),
            fref.component.unwrap_or(1),
            fref.subcomponent.unwrap_or(1),
            value,
        );
        segment.normalize();
        Ok(())
    }
}

fn is_control_field(segment: &Segment, fref: &FieldRef) -> bool {
    segment.is_header() && fref.field <= 2
}

fn field_text(field: &Field) -> Option<String> {
    match field {
        Field::Opaque(raw) => Some(raw.clone()),
        Field::Value(_) => None,
    }
}

pub(crate) fn render_steps(steps: &[PathStep]) -> String {
    Path {
        steps: steps.to_vec(),
        field: None,
    }
    .to_string()
}

#[cfg(feature = "serde")]
impl serde::Serialize for Message {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Message", 3)?;
        state.serialize_field("version", self.grammar.version())?;
        state.serialize_field("delimiters", &self.delimiters)?;
        state.serialize_field("root", &self.root)?;
        state.end()
    }
}
