//! Transactions: an ordered batch of steps built against a private working
//! copy of the document.
//!
//! A failing step leaves the transaction as it was before the call, so a
//! builder can try a step and fall back. A transaction only reaches an
//! editor state whole.

use std::collections::BTreeMap;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::attrs::{AttrValue, Attrs};
use crate::error::GrammarViolation;
use crate::mapping::Mapping;
use crate::mark::Mark;
use crate::node::{Fragment, Node};
use crate::schema::{MarkType, NodeType, Schema};
use crate::step::{NodeShell, Step};

/// A text selection. `anchor` stays put while `head` moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn cursor(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn map(&self, mapping: &Mapping) -> Selection {
        Selection {
            anchor: mapping.map(self.anchor, 1),
            head: mapping.map(self.head, 1),
        }
    }

    fn clamp(self, size: usize) -> Selection {
        Selection {
            anchor: self.anchor.min(size),
            head: self.head.min(size),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Transaction {
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
    selection: Selection,
    selection_set: bool,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    meta: BTreeMap<SmolStr, AttrValue>,
}

impl Transaction {
    pub fn new(doc: &Node, selection: Selection) -> Self {
        Self {
            before: doc.clone(),
            doc: doc.clone(),
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
            selection,
            selection_set: false,
            stored_marks: None,
            stored_marks_set: false,
            meta: BTreeMap::new(),
        }
    }

    /// Document the transaction started from.
    pub fn doc_before(&self) -> &Node {
        &self.before
    }

    /// Current working document.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Document before each step.
    pub fn docs(&self) -> &[Node] {
        &self.docs
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selection_set(&self) -> bool {
        self.selection_set
    }

    /// Stored marks, when the transaction set them.
    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks_set
    }

    pub fn meta(&self, key: &str) -> Option<&AttrValue> {
        self.meta.get(key)
    }

    pub fn set_meta(&mut self, key: impl Into<SmolStr>, value: impl Into<AttrValue>) -> &mut Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection.clamp(self.doc.content_size());
        self.selection_set = true;
        self
    }

    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks;
        self.stored_marks_set = true;
        self
    }

    /// Apply a step. On failure nothing changes.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, GrammarViolation> {
        let (doc, map) = step.apply(&self.doc)?;
        tracing::trace!(target: "quire::transform", ?step, "applied step");
        let prev = std::mem::replace(&mut self.doc, doc);
        self.docs.push(prev);
        self.selection = Selection {
            anchor: map.map(self.selection.anchor, 1),
            head: map.map(self.selection.head, 1),
        }
        .clamp(self.doc.content_size());
        self.mapping.push(map);
        self.steps.push(step);
        Ok(self)
    }

    pub fn replace(&mut self, from: usize, to: usize, content: Fragment) -> Result<&mut Self, GrammarViolation> {
        if from == to && content.size() == 0 {
            return Ok(self);
        }
        self.step(Step::Replace { from, to, content })
    }

    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, GrammarViolation> {
        self.replace(from, to, Fragment::empty())
    }

    pub fn insert(&mut self, pos: usize, content: impl Into<Fragment>) -> Result<&mut Self, GrammarViolation> {
        self.replace(pos, pos, content.into())
    }

    /// Replace `from..to` with `text`, carrying the stored marks or the marks
    /// at `from`.
    pub fn insert_text(
        &mut self,
        schema: &Schema,
        text: &str,
        from: usize,
        to: usize,
    ) -> Result<&mut Self, GrammarViolation> {
        if text.is_empty() {
            return self.delete(from, to);
        }
        let marks = match &self.stored_marks {
            Some(marks) => marks.clone(),
            None => self.doc.resolve(from)?.marks(),
        };
        let node = schema.text(text, marks)?;
        self.replace(from, to, node.into())
    }

    pub fn set_node_markup(
        &mut self,
        pos: usize,
        ty: &Arc<NodeType>,
        attrs: Attrs,
    ) -> Result<&mut Self, GrammarViolation> {
        self.step(Step::SetNodeMarkup {
            pos,
            ty: ty.clone(),
            attrs,
        })
    }

    /// Add `mark` to inline content in `from..to`, one step per run that
    /// does not already carry it, so the steps invert exactly.
    pub fn add_mark(&mut self, from: usize, to: usize, mark: &Mark) -> Result<&mut Self, GrammarViolation> {
        let runs = self.mark_runs(from, to, |node, parent| {
            parent.ty().allows_mark_type(&mark.ty) && !mark.is_in_set(node.marks()) && {
                let added = mark.add_to_set(node.marks());
                mark.is_in_set(&added)
            }
        });
        let mut removed = Vec::new();
        for (start, end) in &runs {
            // Marks excluded by the new one are dropped by add_to_set; remove
            // them explicitly first so each step has an exact inverse.
            let doc = self.doc.clone();
            doc.nodes_between(*start, *end, &mut |node, pos, _, _| {
                if node.is_inline() {
                    for other in node.marks() {
                        if other != mark && mark.ty.excludes(&other.ty) {
                            removed.push((pos.max(*start), (pos + node.node_size()).min(*end), other.clone()));
                        }
                    }
                }
                true
            });
        }
        for (start, end, other) in removed {
            self.step(Step::RemoveMark {
                from: start,
                to: end,
                mark: other,
            })?;
        }
        for (start, end) in runs {
            self.step(Step::AddMark {
                from: start,
                to: end,
                mark: mark.clone(),
            })?;
        }
        Ok(self)
    }

    /// Remove every mark of type `ty` from inline content in `from..to`.
    pub fn remove_mark(&mut self, from: usize, to: usize, ty: &MarkType) -> Result<&mut Self, GrammarViolation> {
        let mut found: Vec<(usize, usize, Mark)> = Vec::new();
        self.doc.nodes_between(from, to, &mut |node, pos, _, _| {
            if let Some(mark) = ty.is_in_set(node.marks()) {
                let start = pos.max(from);
                let end = (pos + node.node_size()).min(to);
                match found.last_mut() {
                    Some(last) if last.1 == start && last.2 == *mark => last.1 = end,
                    _ => found.push((start, end, mark.clone())),
                }
            }
            true
        });
        for (start, end, mark) in found {
            self.step(Step::RemoveMark { from: start, to: end, mark })?;
        }
        Ok(self)
    }

    fn mark_runs(&self, from: usize, to: usize, pred: impl Fn(&Node, &Node) -> bool) -> Vec<(usize, usize)> {
        let mut runs: Vec<(usize, usize)> = Vec::new();
        self.doc.nodes_between(from, to, &mut |node, pos, parent, _| {
            if node.is_inline() {
                if let Some(parent) = parent {
                    if pred(node, parent) {
                        let start = pos.max(from);
                        let end = (pos + node.node_size()).min(to);
                        match runs.last_mut() {
                            Some(last) if last.1 == start => last.1 = end,
                            _ => runs.push((start, end)),
                        }
                    }
                }
            }
            true
        });
        runs
    }

    pub fn split(
        &mut self,
        pos: usize,
        depth: usize,
        types_after: Vec<Option<NodeShell>>,
    ) -> Result<&mut Self, GrammarViolation> {
        self.step(Step::Split {
            pos,
            depth,
            types_after,
        })
    }

    pub fn join(&mut self, pos: usize, depth: usize) -> Result<&mut Self, GrammarViolation> {
        self.step(Step::Join { pos, depth })
    }

    pub fn wrap(
        &mut self,
        from: usize,
        to: usize,
        wrapper: NodeShell,
        items: Vec<(NodeShell, usize)>,
    ) -> Result<&mut Self, GrammarViolation> {
        self.step(Step::Wrap {
            from,
            to,
            wrapper,
            items,
        })
    }

    pub fn unwrap(&mut self, pos: usize, items: bool) -> Result<&mut Self, GrammarViolation> {
        self.step(Step::Unwrap { pos, items })
    }

    /// Inverted steps that undo this transaction, in application order.
    pub fn inverted_steps(&self) -> Result<Vec<Step>, GrammarViolation> {
        self.steps
            .iter()
            .zip(&self.docs)
            .rev()
            .map(|(step, doc)| step.invert(doc))
            .collect()
    }
}

#[cfg(test)]
mod tests;
