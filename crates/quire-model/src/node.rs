//! Document tree: [`Node`] and its child list [`Fragment`].
//!
//! Positions count tokens in a pre-order walk: a text node counts its
//! characters, a leaf counts one, and any other node counts its content plus
//! an opening and a closing token. A position is an offset into a node's
//! content.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::attrs::{AttrValue, Attrs};
use crate::error::GrammarViolation;
use crate::mark::{Mark, same_set};
use crate::resolve::ResolvedPos;
use crate::schema::{MarkType, NodeType};

/// Ordered child list of a node. Normalized on construction: adjacent text
/// nodes with equal marks are merged and empty text nodes are dropped.
#[derive(Clone, Debug, Default)]
pub struct Fragment {
    nodes: Arc<[Node]>,
    size: usize,
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.nodes[..] == other.nodes[..]
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        Fragment::from_vec(vec![node])
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_vec(nodes)
    }
}

impl From<Option<Node>> for Fragment {
    fn from(node: Option<Node>) -> Self {
        Fragment::from_vec(node.into_iter().collect())
    }
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub(crate) fn char_slice(s: &str, from: usize, to: usize) -> &str {
    let mut indices = s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len()));
    let start = indices.by_ref().nth(from).unwrap_or(s.len());
    let end = if to > from {
        indices.nth(to - from - 1).unwrap_or(s.len())
    } else {
        start
    };
    &s[start..end]
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_vec(nodes: Vec<Node>) -> Self {
        let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node.is_text() && node.text().is_none_or(str::is_empty) {
                continue;
            }
            if let Some(last) = out.last_mut() {
                if last.is_text() && node.is_text() && same_set(last.marks(), node.marks()) {
                    let mut merged = String::from(last.text().unwrap_or_default());
                    merged.push_str(node.text().unwrap_or_default());
                    last.text = Some(SmolStr::from(merged));
                    continue;
                }
            }
            out.push(node);
        }
        let size = out.iter().map(Node::node_size).sum();
        Self {
            nodes: out.into(),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child at `index`. Panics when out of range, like slice indexing.
    pub fn child(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[Node] {
        &self.nodes
    }

    pub fn to_vec(&self) -> Vec<Node> {
        self.nodes.to_vec()
    }

    pub fn append(&self, other: &Fragment) -> Fragment {
        let mut nodes = self.to_vec();
        nodes.extend(other.iter().cloned());
        Fragment::from_vec(nodes)
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut nodes = self.to_vec();
        nodes[index] = node;
        Fragment::from_vec(nodes)
    }

    /// Index of the child containing `pos` and that child's start offset.
    /// A position on a boundary resolves to the child after it.
    pub fn find_index(&self, pos: usize) -> (usize, usize) {
        if pos == 0 {
            return (0, 0);
        }
        if pos >= self.size {
            return (self.nodes.len(), self.size);
        }
        let mut cur = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                if end == pos {
                    return (i + 1, end);
                }
                return (i, cur);
            }
            cur = end;
        }
        (self.nodes.len(), self.size)
    }

    /// The part of this fragment between two positions. Children cut in
    /// the middle keep their type with partial content.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to >= self.size {
            return self.clone();
        }
        let mut out = Vec::new();
        let mut pos = 0;
        if to > from {
            for child in self.nodes.iter() {
                let end = pos + child.node_size();
                if end > from {
                    let mut c = child.clone();
                    if pos < from || end > to {
                        c = if c.is_text() {
                            c.cut(from.saturating_sub(pos), (to - pos).min(c.node_size()))
                        } else {
                            c.cut(
                                from.saturating_sub(pos + 1),
                                (to - pos - 1).min(c.content.size()),
                            )
                        };
                    }
                    out.push(c);
                }
                pos = end;
                if pos >= to {
                    break;
                }
            }
        }
        Fragment::from_vec(out)
    }

    /// Replace the range `from..to` with `slice`. Both positions must lie in
    /// the same parent; the call descends into the child holding them.
    pub fn replace(&self, from: usize, to: usize, slice: &Fragment) -> Fragment {
        let (index, offset) = self.find_index(from);
        if let Some(child) = self.maybe_child(index) {
            let end = offset + child.node_size();
            if !child.is_text() && !child.is_leaf() && from > offset && to < end {
                let inner = child.content.replace(from - offset - 1, to - offset - 1, slice);
                return self.replace_child(index, child.copy(inner));
            }
        }
        let mut nodes = self.cut(0, from).to_vec();
        nodes.extend(slice.iter().cloned());
        nodes.extend(self.cut(to, self.size).iter().cloned());
        Fragment::from_vec(nodes)
    }

    /// Visit descendants overlapping `from..to`. The callback receives the
    /// node, its absolute position, its parent and its index; returning
    /// `false` skips the node's children.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
        node_start: usize,
        parent: Option<&Node>,
    ) {
        let mut pos = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content.size() > 0 {
                let start = pos + 1;
                child.content.nodes_between(
                    from.saturating_sub(start),
                    child.content.size().min(to.saturating_sub(start)),
                    f,
                    node_start + start,
                    Some(child),
                );
            }
            pos = end;
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.nodes.iter().map(|n| n.to_string()).collect();
        write!(f, "<{}>", parts.join(", "))
    }
}

/// A node of the document tree. Cheap to clone: children are shared.
#[derive(Clone, Debug)]
pub struct Node {
    ty: Arc<NodeType>,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<SmolStr>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ty.id == other.ty.id
            && self.text == other.text
            && self.attrs == other.attrs
            && same_set(&self.marks, &other.marks)
            && self.content == other.content
    }
}

impl Node {
    pub(crate) fn new(ty: Arc<NodeType>, attrs: Attrs, content: Fragment, marks: Vec<Mark>) -> Self {
        Self {
            ty,
            attrs,
            content,
            marks,
            text: None,
        }
    }

    pub(crate) fn new_text(ty: Arc<NodeType>, text: SmolStr, marks: Vec<Mark>) -> Self {
        Self {
            ty,
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text: Some(text),
        }
    }

    pub fn ty(&self) -> &Arc<NodeType> {
        &self.ty
    }

    pub fn type_name(&self) -> &str {
        &self.ty.name
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    /// Text of a text node.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn node_size(&self) -> usize {
        match &self.text {
            Some(text) => char_len(text),
            None if self.ty.is_leaf() => 1,
            None => self.content.size() + 2,
        }
    }

    pub fn content_size(&self) -> usize {
        self.content.size()
    }

    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.content.last_child()
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_block(&self) -> bool {
        self.ty.is_block()
    }

    pub fn is_inline(&self) -> bool {
        self.ty.is_inline()
    }

    pub fn is_textblock(&self) -> bool {
        self.ty.is_textblock()
    }

    pub fn is_leaf(&self) -> bool {
        self.ty.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.ty.is_atom()
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.to_string(),
            None => self.text_between(0, self.content.size(), None, None),
        }
    }

    /// Same node with different content.
    pub fn copy(&self, content: Fragment) -> Node {
        Node {
            ty: self.ty.clone(),
            attrs: self.attrs.clone(),
            content,
            marks: self.marks.clone(),
            text: None,
        }
    }

    /// Same node with a different mark set.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        Node {
            marks,
            ..self.clone()
        }
    }

    /// Same text node with different text.
    pub fn with_text(&self, text: impl Into<SmolStr>) -> Node {
        Node {
            text: Some(text.into()),
            ..self.clone()
        }
    }

    /// Same node with different attributes; not validated.
    pub fn with_attrs(&self, ty: Arc<NodeType>, attrs: Attrs) -> Node {
        Node {
            ty,
            attrs,
            ..self.clone()
        }
    }

    /// Cut to `from..to` of this node's content (characters for text).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.text {
            Some(text) => self.with_text(char_slice(text, from, to)),
            None => self.copy(self.content.cut(from, to)),
        }
    }

    /// The node directly after `pos`, descending as needed.
    pub fn node_at(&self, mut pos: usize) -> Option<&Node> {
        let mut node = self;
        loop {
            let (index, offset) = node.content.find_index(pos);
            let child = node.content.maybe_child(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, GrammarViolation> {
        ResolvedPos::resolve(self, pos)
    }

    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    ) {
        self.content.nodes_between(from, to, f, 0, Some(self));
    }

    /// Visit every descendant with its position.
    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool) {
        self.nodes_between(0, self.content.size(), f);
    }

    /// Text between two positions. `block_separator` goes between blocks,
    /// `leaf_text` stands in for inline leaf nodes.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&str>,
    ) -> String {
        let mut out = String::new();
        let mut first = true;
        self.nodes_between(from, to, &mut |node, pos, _, _| {
            let piece = match node.text() {
                Some(text) => {
                    let start = from.max(pos) - pos;
                    let end = (to - pos).min(char_len(text));
                    char_slice(text, start, end).to_owned()
                }
                None if node.is_leaf() && node.is_inline() => leaf_text.unwrap_or("").to_owned(),
                None => String::new(),
            };
            if node.is_block() && (node.is_textblock() || (node.is_leaf() && !piece.is_empty())) {
                if let Some(sep) = block_separator {
                    if first {
                        first = false;
                    } else {
                        out.push_str(sep);
                    }
                }
            }
            out.push_str(&piece);
            true
        });
        out
    }

    /// Whether any inline node in `from..to` carries a mark of `ty`.
    pub fn range_has_mark(&self, from: usize, to: usize, ty: &MarkType) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, &mut |node, _, _, _| {
                if ty.is_in_set(node.marks()).is_some() {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// Validate this subtree against the grammar.
    pub fn check(&self) -> Result<(), GrammarViolation> {
        if let Some(text) = &self.text {
            if text.is_empty() {
                return Err(GrammarViolation::Structure("empty text node".into()));
            }
            return Ok(());
        }
        let computed = self.ty.compute_attrs(&self.attrs)?;
        if computed != self.attrs {
            return Err(GrammarViolation::Structure(format!(
                "attributes of `{}` are incomplete",
                self.ty.name
            )));
        }
        let ids: Vec<usize> = self.content.iter().map(|n| n.ty.id).collect();
        if !self.ty.valid_types(&ids) {
            return Err(GrammarViolation::InvalidContent {
                node: self.ty.name.clone(),
                content: self.content.to_string(),
            });
        }
        self.ty.check_newlines(&self.content)?;
        for child in self.content.iter() {
            for mark in child.marks() {
                if !self.ty.allows_mark_type(&mark.ty) {
                    return Err(GrammarViolation::MarkNotAllowed {
                        node: self.ty.name.clone(),
                        mark: mark.ty.name.clone(),
                    });
                }
            }
            child.check()?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inner = match &self.text {
            Some(text) => format!("{text:?}"),
            None if self.content.is_empty() => self.ty.name.to_string(),
            None => {
                let parts: Vec<String> = self.content.iter().map(|n| n.to_string()).collect();
                format!("{}({})", self.ty.name, parts.join(", "))
            }
        };
        for mark in self.marks.iter().rev() {
            inner = format!("{}({inner})", mark.ty.name);
        }
        f.write_str(&inner)
    }
}
