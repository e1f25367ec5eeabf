//! Resolved positions: a position plus the path of ancestors around it.

use crate::error::GrammarViolation;
use crate::mark::Mark;
use crate::node::Node;

#[derive(Clone, Copy, Debug)]
struct PathEntry<'a> {
    node: &'a Node,
    index: usize,
    /// Absolute position of the start of the child at `index`.
    offset: usize,
}

/// A position resolved against a document. Depth 0 is the document node.
#[derive(Clone, Debug)]
pub struct ResolvedPos<'a> {
    pub pos: usize,
    path: Vec<PathEntry<'a>>,
    /// Offset of `pos` within its parent's content.
    pub parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn resolve(doc: &'a Node, pos: usize) -> Result<Self, GrammarViolation> {
        if pos > doc.content_size() {
            return Err(GrammarViolation::PositionOutOfRange {
                pos,
                size: doc.content_size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc;
        loop {
            let (index, offset) = node.content().find_index(parent_offset);
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node,
                index,
                offset: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index);
            if child.is_text() {
                break;
            }
            node = child;
            parent_offset = rem - 1;
            start += offset + 1;
        }
        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn doc(&self) -> &'a Node {
        self.path[0].node
    }

    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    /// Ancestor at depth `d`.
    pub fn node(&self, d: usize) -> &'a Node {
        self.path[d].node
    }

    /// Index into the ancestor at depth `d`.
    pub fn index(&self, d: usize) -> usize {
        self.path[d].index
    }

    /// Index pointing after this position into the ancestor at depth `d`.
    pub fn index_after(&self, d: usize) -> usize {
        self.index(d) + usize::from(!(d == self.depth() && self.text_offset() == 0))
    }

    /// Start of the content of the ancestor at depth `d`.
    pub fn start(&self, d: usize) -> usize {
        if d == 0 { 0 } else { self.path[d - 1].offset + 1 }
    }

    /// End of the content of the ancestor at depth `d`.
    pub fn end(&self, d: usize) -> usize {
        self.start(d) + self.node(d).content_size()
    }

    /// Position before the ancestor at depth `d` (`d >= 1`). At
    /// `depth() + 1` this is the position itself.
    pub fn before(&self, d: usize) -> usize {
        debug_assert!(d >= 1, "no position before the top node");
        if d == self.depth() + 1 {
            self.pos
        } else {
            self.path[d - 1].offset
        }
    }

    /// Position after the ancestor at depth `d` (`d >= 1`).
    pub fn after(&self, d: usize) -> usize {
        debug_assert!(d >= 1, "no position after the top node");
        if d == self.depth() + 1 {
            self.pos
        } else {
            self.path[d - 1].offset + self.node(d).node_size()
        }
    }

    /// Offset into the text node the position points into, zero on boundaries.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].offset
    }

    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let off = self.text_offset();
        Some(if off > 0 {
            child.cut(off, child.node_size())
        } else {
            child.clone()
        })
    }

    pub fn node_before(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let off = self.text_offset();
        if off > 0 {
            return Some(parent.child(index).cut(0, off));
        }
        if index == 0 {
            None
        } else {
            Some(parent.child(index - 1).clone())
        }
    }

    /// Position at the start of child `index` of the ancestor at depth `d`.
    pub fn pos_at_index(&self, index: usize, d: usize) -> usize {
        let node = self.node(d);
        let mut pos = self.start(d);
        for child in node.content().iter().take(index) {
            pos += child.node_size();
        }
        pos
    }

    /// Marks that apply to content inserted at this position.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content_size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().to_vec();
        }
        let mut main = if index > 0 { parent.maybe_child(index - 1) } else { None };
        let mut other = parent.maybe_child(index);
        if main.is_none() {
            std::mem::swap(&mut main, &mut other);
        }
        let Some(main) = main else {
            return Vec::new();
        };
        let mut marks = main.marks().to_vec();
        marks.retain(|m| m.ty.spec.inclusive || other.is_some_and(|o| m.is_in_set(o.marks())));
        marks
    }

    /// Deepest depth whose content contains both this position and `pos`.
    pub fn shared_depth(&self, pos: usize) -> usize {
        (1..=self.depth())
            .rev()
            .find(|d| self.start(*d) <= pos && self.end(*d) >= pos)
            .unwrap_or(0)
    }

    pub fn same_parent(&self, other: &ResolvedPos<'_>) -> bool {
        self.depth() == other.depth() && self.start(self.depth()) == other.start(other.depth())
    }

    /// The range of block siblings covering this position and `other`,
    /// optionally requiring the shared parent to satisfy `pred`.
    pub fn block_range(
        &self,
        other: &ResolvedPos<'a>,
        pred: Option<&dyn Fn(&Node) -> bool>,
    ) -> Option<NodeRange<'a>> {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let lower = usize::from(self.parent().ty().inline_content() || self.pos == other.pos);
        let top = self.depth().checked_sub(lower)?;
        (0..=top).rev().find_map(|d| {
            let ok = other.pos <= self.end(d) && pred.is_none_or(|p| p(self.node(d)));
            ok.then(|| NodeRange {
                from: self.clone(),
                to: other.clone(),
                depth: d,
            })
        })
    }
}

/// A flat range of siblings inside one parent.
#[derive(Clone, Debug)]
pub struct NodeRange<'a> {
    pub from: ResolvedPos<'a>,
    pub to: ResolvedPos<'a>,
    pub depth: usize,
}

impl<'a> NodeRange<'a> {
    /// Position before the first node of the range.
    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1)
    }

    /// Position after the last node of the range.
    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1)
    }

    pub fn parent(&self) -> &'a Node {
        self.from.node(self.depth)
    }

    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}
