//! Mutation steps: atomic, invertible changes to a document tree.
//!
//! Applying a step yields the new tree and a [`StepMap`] describing how
//! positions moved. Every result is checked against the grammar; a step that
//! would produce an invalid tree fails with [`GrammarViolation`].

use std::sync::Arc;

use crate::attrs::Attrs;
use crate::error::GrammarViolation;
use crate::mapping::StepMap;
use crate::mark::Mark;
use crate::node::{Fragment, Node};
use crate::schema::{MarkType, NodeType};

/// A node type plus attributes, used where a step creates wrapper nodes.
#[derive(Clone, Debug)]
pub struct NodeShell {
    pub ty: Arc<NodeType>,
    pub attrs: Attrs,
}

impl PartialEq for NodeShell {
    fn eq(&self, other: &Self) -> bool {
        self.ty.id == other.ty.id && self.attrs == other.attrs
    }
}

impl NodeShell {
    pub fn new(ty: Arc<NodeType>, attrs: Attrs) -> Self {
        Self { ty, attrs }
    }

    pub fn of(node: &Node) -> Self {
        Self {
            ty: node.ty().clone(),
            attrs: node.attrs().clone(),
        }
    }

    fn wrap(&self, content: Fragment) -> Result<Node, GrammarViolation> {
        self.ty.create(&self.attrs, content, Vec::new())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Replace `from..to` (both in the same parent) with `content`.
    Replace {
        from: usize,
        to: usize,
        content: Fragment,
    },
    /// Change type and attributes of the node at `pos`, keeping its children.
    SetNodeMarkup {
        pos: usize,
        ty: Arc<NodeType>,
        attrs: Attrs,
    },
    AddMark {
        from: usize,
        to: usize,
        mark: Mark,
    },
    RemoveMark {
        from: usize,
        to: usize,
        mark: Mark,
    },
    /// Split `depth` ancestors at `pos`. `types_after` optionally gives the
    /// type of each new node, outermost first.
    Split {
        pos: usize,
        depth: usize,
        types_after: Vec<Option<NodeShell>>,
    },
    /// Join the two siblings meeting at `pos`, and their `depth - 1` nested
    /// edge descendants. The left node's type is kept.
    Join { pos: usize, depth: usize },
    /// Wrap the siblings in `from..to` in `wrapper`. With `items`, runs of
    /// consecutive siblings are first wrapped in item nodes: each entry gives
    /// the item shell and how many siblings it takes.
    Wrap {
        from: usize,
        to: usize,
        wrapper: NodeShell,
        items: Vec<(NodeShell, usize)>,
    },
    /// Replace the node at `pos` by its children, or with `items`, by the
    /// children of each of its children.
    Unwrap { pos: usize, items: bool },
}

impl Step {
    /// Apply to `doc`, returning the new tree and the position map.
    pub fn apply(&self, doc: &Node) -> Result<(Node, StepMap), GrammarViolation> {
        let (result, map) = match self {
            Step::Replace { from, to, content } => apply_replace(doc, *from, *to, content)?,
            Step::SetNodeMarkup { pos, ty, attrs } => {
                let node = doc.node_at(*pos).ok_or_else(|| no_node(*pos))?;
                if node.is_text() {
                    return Err(GrammarViolation::Structure(format!(
                        "cannot set markup of text at {pos}"
                    )));
                }
                let attrs = ty.compute_attrs(attrs)?;
                let updated = node.with_attrs(ty.clone(), attrs);
                let content = doc.content().replace(*pos, pos + node.node_size(), &updated.into());
                (doc.copy(content), StepMap::identity())
            }
            Step::AddMark { from, to, mark } => {
                let content = map_inline(doc.content(), *from, *to, 0, doc.ty(), &|marks| {
                    mark.add_to_set(marks)
                }, mark.ty.as_ref());
                (doc.copy(content), StepMap::identity())
            }
            Step::RemoveMark { from, to, mark } => {
                let content = map_inline(doc.content(), *from, *to, 0, doc.ty(), &|marks| {
                    mark.remove_from_set(marks)
                }, mark.ty.as_ref());
                (doc.copy(content), StepMap::identity())
            }
            Step::Split {
                pos,
                depth,
                types_after,
            } => apply_split(doc, *pos, *depth, types_after)?,
            Step::Join { pos, depth } => apply_join(doc, *pos, *depth)?,
            Step::Wrap {
                from,
                to,
                wrapper,
                items,
            } => apply_wrap(doc, *from, *to, wrapper, items)?,
            Step::Unwrap { pos, items } => apply_unwrap(doc, *pos, *items)?,
        };
        result.check()?;
        Ok((result, map))
    }

    /// The step that undoes this one, given the document it was applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step, GrammarViolation> {
        Ok(match self {
            Step::Replace { from, to, content } => Step::Replace {
                from: *from,
                to: from + content.size(),
                content: doc.content().cut_range(*from, *to),
            },
            Step::SetNodeMarkup { pos, .. } => {
                let node = doc.node_at(*pos).ok_or_else(|| no_node(*pos))?;
                Step::SetNodeMarkup {
                    pos: *pos,
                    ty: node.ty().clone(),
                    attrs: node.attrs().clone(),
                }
            }
            Step::AddMark { from, to, mark } => Step::RemoveMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::RemoveMark { from, to, mark } => Step::AddMark {
                from: *from,
                to: *to,
                mark: mark.clone(),
            },
            Step::Split { pos, depth, .. } => Step::Join {
                pos: pos + depth,
                depth: *depth,
            },
            Step::Join { pos, depth } => {
                let res = doc.resolve(*pos)?;
                let mut types_after = Vec::with_capacity(*depth);
                let mut node = res.node_after();
                for _ in 0..*depth {
                    let Some(n) = node else {
                        return Err(GrammarViolation::Structure("join without a right side".into()));
                    };
                    types_after.push(Some(NodeShell::of(&n)));
                    node = n.first_child().cloned();
                }
                Step::Split {
                    pos: pos - depth,
                    depth: *depth,
                    types_after,
                }
            }
            Step::Wrap { from, items, .. } => Step::Unwrap {
                pos: *from,
                items: !items.is_empty(),
            },
            Step::Unwrap { pos, items } => {
                let node = doc.node_at(*pos).ok_or_else(|| no_node(*pos))?;
                let wrapper = NodeShell::of(node);
                let (inner, shells) = if *items {
                    let size: usize = node.content().iter().map(Node::content_size).sum();
                    let shells = node
                        .content()
                        .iter()
                        .map(|item| (NodeShell::of(item), item.child_count()))
                        .collect();
                    (size, shells)
                } else {
                    (node.content_size(), Vec::new())
                };
                Step::Wrap {
                    from: *pos,
                    to: pos + inner,
                    wrapper,
                    items: shells,
                }
            }
        })
    }
}

fn no_node(pos: usize) -> GrammarViolation {
    GrammarViolation::Structure(format!("no node at position {pos}"))
}

impl Fragment {
    /// Content between two positions of one parent, as a closed fragment.
    pub(crate) fn cut_range(&self, from: usize, to: usize) -> Fragment {
        let (index, offset) = self.find_index(from);
        if let Some(child) = self.maybe_child(index) {
            let end = offset + child.node_size();
            if !child.is_text() && !child.is_leaf() && from > offset && to < end {
                return child.content().cut_range(from - offset - 1, to - offset - 1);
            }
        }
        self.cut(from, to)
    }
}

fn apply_replace(
    doc: &Node,
    from: usize,
    to: usize,
    content: &Fragment,
) -> Result<(Node, StepMap), GrammarViolation> {
    if to < from {
        return Err(GrammarViolation::Structure(format!("inverted range {from}..{to}")));
    }
    let rf = doc.resolve(from)?;
    let rt = doc.resolve(to)?;
    if !rf.same_parent(&rt) {
        return Err(GrammarViolation::Structure(format!(
            "replace range {from}..{to} spans more than one parent"
        )));
    }
    let replaced = doc.content().replace(from, to, content);
    Ok((
        doc.copy(replaced),
        StepMap::new(vec![(from, to - from, content.size())]),
    ))
}

fn map_inline(
    frag: &Fragment,
    from: usize,
    to: usize,
    offset: usize,
    parent: &NodeType,
    f: &dyn Fn(&[Mark]) -> Vec<Mark>,
    ty: &MarkType,
) -> Fragment {
    let mut out = Vec::with_capacity(frag.child_count());
    let mut pos = offset;
    for child in frag.iter() {
        let size = child.node_size();
        let end = pos + size;
        if end <= from || pos >= to {
            out.push(child.clone());
        } else if child.is_inline() {
            if !parent.allows_mark_type(ty) {
                out.push(child.clone());
            } else if child.is_text() {
                let start = from.saturating_sub(pos);
                let stop = (to - pos).min(size);
                if start > 0 {
                    out.push(child.cut(0, start));
                }
                let middle = child.cut(start, stop);
                out.push(middle.mark(f(middle.marks())));
                if stop < size {
                    out.push(child.cut(stop, size));
                }
            } else {
                out.push(child.mark(f(child.marks())));
            }
        } else {
            let inner = map_inline(child.content(), from, to, pos + 1, child.ty(), f, ty);
            out.push(child.copy(inner));
        }
        pos = end;
    }
    Fragment::from_vec(out)
}

fn apply_split(
    doc: &Node,
    pos: usize,
    depth: usize,
    types_after: &[Option<NodeShell>],
) -> Result<(Node, StepMap), GrammarViolation> {
    let res = doc.resolve(pos)?;
    if depth == 0 || depth > res.depth() {
        return Err(GrammarViolation::Structure(format!(
            "cannot split {depth} levels at position {pos}"
        )));
    }
    let parent = res.parent();
    let mut before = parent.content().cut(0, res.parent_offset);
    let mut after = parent.content().cut(res.parent_offset, parent.content_size());
    let top = res.depth() - depth + 1;
    for (i, d) in (top..=res.depth()).rev().enumerate() {
        let node = res.node(d);
        before = Fragment::from(node.copy(before));
        let shell = types_after.get(depth - 1 - i).and_then(Option::as_ref);
        after = Fragment::from(match shell {
            Some(shell) => shell.wrap(after)?,
            None => node.copy(after),
        });
    }
    let from = res.before(top);
    let to = res.after(top);
    let content = doc.content().replace(from, to, &before.append(&after));
    Ok((doc.copy(content), StepMap::new(vec![(pos, 0, 2 * depth)])))
}

fn join_nodes(left: &Node, right: &Node, depth: usize) -> Result<Node, GrammarViolation> {
    if left.is_text() || right.is_text() || left.is_leaf() || right.is_leaf() {
        return Err(GrammarViolation::Structure("cannot join leaf nodes".into()));
    }
    if depth == 1 {
        return Ok(left.copy(left.content().append(right.content())));
    }
    let (Some(last), Some(first)) = (left.last_child(), right.first_child()) else {
        return Err(GrammarViolation::Structure("nothing to join".into()));
    };
    let inner = join_nodes(last, first, depth - 1)?;
    let mut nodes = left.content().to_vec();
    nodes.pop();
    nodes.push(inner);
    nodes.extend(right.content().iter().skip(1).cloned());
    Ok(left.copy(Fragment::from_vec(nodes)))
}

fn apply_join(doc: &Node, pos: usize, depth: usize) -> Result<(Node, StepMap), GrammarViolation> {
    let res = doc.resolve(pos)?;
    if depth == 0 || res.text_offset() > 0 {
        return Err(GrammarViolation::Structure(format!("cannot join at {pos}")));
    }
    let parent = res.parent();
    let index = res.index(res.depth());
    let (Some(left), Some(right)) = (
        index.checked_sub(1).and_then(|i| parent.maybe_child(i)),
        parent.maybe_child(index),
    ) else {
        return Err(GrammarViolation::Structure(format!("no siblings meet at {pos}")));
    };
    let joined = join_nodes(left, right, depth)?;
    let from = pos - left.node_size();
    let to = pos + right.node_size();
    let content = doc.content().replace(from, to, &joined.into());
    Ok((doc.copy(content), StepMap::new(vec![(pos - depth, 2 * depth, 0)])))
}

fn apply_wrap(
    doc: &Node,
    from: usize,
    to: usize,
    wrapper: &NodeShell,
    items: &[(NodeShell, usize)],
) -> Result<(Node, StepMap), GrammarViolation> {
    if to <= from {
        return Err(GrammarViolation::Structure("empty wrap range".into()));
    }
    let rf = doc.resolve(from)?;
    let rt = doc.resolve(to)?;
    if !rf.same_parent(&rt) || rf.text_offset() > 0 || rt.text_offset() > 0 {
        return Err(GrammarViolation::Structure(format!(
            "wrap range {from}..{to} does not cover whole siblings"
        )));
    }
    let parent = rf.parent();
    let first = rf.index(rf.depth());
    let children = &parent.content().as_slice()[first..rt.index(rt.depth())];
    let mut ranges = Vec::new();
    let inner = if items.is_empty() {
        ranges.push((from, 0, 1));
        ranges.push((to, 0, 1));
        Fragment::from_vec(children.to_vec())
    } else {
        let taken: usize = items.iter().map(|(_, n)| n).sum();
        if taken != children.len() || items.iter().any(|(_, n)| *n == 0) {
            return Err(GrammarViolation::Structure(format!(
                "item shells take {taken} of {} nodes",
                children.len()
            )));
        }
        let mut wrapped = Vec::with_capacity(items.len());
        let mut rest = children;
        let mut pos = from;
        for (shell, count) in items {
            let (group, tail) = rest.split_at(*count);
            ranges.push((pos, 0, 2));
            pos += group.iter().map(Node::node_size).sum::<usize>();
            wrapped.push(shell.wrap(Fragment::from_vec(group.to_vec()))?);
            rest = tail;
        }
        ranges.push((to, 0, 2));
        Fragment::from_vec(wrapped)
    };
    let node = wrapper.wrap(inner)?;
    let content = doc.content().replace(from, to, &node.into());
    Ok((doc.copy(content), StepMap::new(ranges)))
}

fn apply_unwrap(doc: &Node, pos: usize, items: bool) -> Result<(Node, StepMap), GrammarViolation> {
    let node = doc.node_at(pos).ok_or_else(|| no_node(pos))?;
    if node.is_leaf() || node.is_text() {
        return Err(GrammarViolation::Structure(format!("nothing to unwrap at {pos}")));
    }
    let mut ranges = Vec::new();
    let inner = if items {
        let mut nodes = Vec::new();
        ranges.push((pos, 2, 0));
        let mut at = pos + 2;
        for item in node.content().iter() {
            if item.is_leaf() || item.is_text() {
                return Err(GrammarViolation::Structure("unwrapped items must be containers".into()));
            }
            at += item.content_size();
            ranges.push((at, 2, 0));
            at += 2;
            nodes.extend(item.content().iter().cloned());
        }
        Fragment::from_vec(nodes)
    } else {
        ranges.push((pos, 1, 0));
        ranges.push((pos + node.node_size() - 1, 1, 0));
        node.content().clone()
    };
    let end = pos + node.node_size();
    let content = doc.content().replace(pos, end, &inner);
    Ok((doc.copy(content), StepMap::new(ranges)))
}

#[cfg(test)]
mod tests;
