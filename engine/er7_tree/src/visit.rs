//! Depth-first traversal of an element tree in stored order.
//!
//! Implement [`Visitor`] to act on groups and segments; every method has an
//! empty default. Visitors borrow the tree for `'t`, so they may keep
//! references to what they visit. The encoder and the validator are both
//! visitors.

use crate::element::{Element, Group};
use crate::segment::Segment;

pub trait Visitor<'t> {
    type Error;

    fn enter_group(&mut self, _group: &'t Group) -> Result<(), Self::Error> {
        Ok(())
    }

    fn exit_group(&mut self, _group: &'t Group) -> Result<(), Self::Error> {
        Ok(())
    }

    /// `occurrence` counts same-named matched segments within the parent, from 1.
    fn visit_segment(&mut self, _segment: &'t Segment, _occurrence: usize) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_unparsed(&mut self, _segment: &'t Segment) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A type that can be visited by a [`Visitor`].
pub trait Visitable {
    fn accept<'t, V: Visitor<'t> + ?Sized>(&'t self, visitor: &mut V) -> Result<(), V::Error>;
}

impl Visitable for Group {
    fn accept<'t, V: Visitor<'t> + ?Sized>(&'t self, visitor: &mut V) -> Result<(), V::Error> {
        visitor.enter_group(self)?;
        let mut seen: Vec<(&str, usize)> = Vec::new();
        for child in &self.children {
            match child {
                Element::Segment { segment, .. } => {
                    let occurrence = bump(&mut seen, segment.name.as_str());
                    visitor.visit_segment(segment, occurrence)?;
                }
                Element::Group { group, .. } => group.accept(visitor)?,
                Element::Unparsed { segment } => visitor.visit_unparsed(segment)?,
            }
        }
        visitor.exit_group(self)
    }
}

fn bump<'a>(seen: &mut Vec<(&'a str, usize)>, name: &'a str) -> usize {
    match seen.iter_mut().find(|(n, _)| *n == name) {
        Some((_, count)) => {
            *count += 1;
            *count
        }
        None => {
            seen.push((name, 1));
            1
        }
    }
}

/// Collects every segment in stored order.
#[derive(Debug, Default)]
pub struct SegmentCollector<'t> {
    pub matched: Vec<&'t Segment>,
    pub unparsed: Vec<&'t Segment>,
}

impl<'t> Visitor<'t> for SegmentCollector<'t> {
    type Error = std::convert::Infallible;

    fn visit_segment(&mut self, segment: &'t Segment, _occurrence: usize) -> Result<(), Self::Error> {
        self.matched.push(segment);
        Ok(())
    }

    fn visit_unparsed(&mut self, segment: &'t Segment) -> Result<(), Self::Error> {
        self.unparsed.push(segment);
        Ok(())
    }
}

/// Counts groups, segments and unparsed segments.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShapeCounter {
    pub groups: usize,
    pub segments: usize,
    pub unparsed: usize,
}

impl<'t> Visitor<'t> for ShapeCounter {
    type Error = std::convert::Infallible;

    fn enter_group(&mut self, _group: &'t Group) -> Result<(), Self::Error> {
        self.groups += 1;
        Ok(())
    }

    fn visit_segment(&mut self, _segment: &'t Segment, _occurrence: usize) -> Result<(), Self::Error> {
        self.segments += 1;
        Ok(())
    }

    fn visit_unparsed(&mut self, _segment: &'t Segment) -> Result<(), Self::Error> {
        self.unparsed += 1;
        Ok(())
    }
}
