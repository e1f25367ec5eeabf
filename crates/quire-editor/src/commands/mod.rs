//! Editing commands.
//!
//! A command is a pure function of the state (and optional attributes)
//! returning the transaction to apply, or `None` when it does not apply.
//! Commands never partially apply: a transaction reaches the editor whole.

pub mod lists;

use std::sync::Arc;

use chrono::{DateTime, Local};
use quire_model::{
    Attrs, Fragment, GrammarViolation, MarkType, Node, NodeShell, NodeType, ResolvedPos, Schema,
    Selection, Transaction,
};

use crate::state::{EditorState, HISTORY_META, start_of_text};

pub use lists::{lift_list_item, sink_list_item, split_list_item, toggle_list, wrap_in_list};

pub type CommandResult = Result<Option<Transaction>, GrammarViolation>;

/// Build a transaction with `f`. `Ok(false)` from `f`, or a failure to fit
/// the grammar, means the command does not apply. Other errors (bad
/// attributes, positions out of range) are passed on.
pub fn attempt(
    state: &EditorState,
    f: impl FnOnce(&mut Transaction) -> Result<bool, GrammarViolation>,
) -> CommandResult {
    let mut tr = state.tr();
    match f(&mut tr) {
        Ok(true) => Ok(Some(tr)),
        Ok(false) => Ok(None),
        Err(
            error @ (GrammarViolation::InvalidContent { .. }
            | GrammarViolation::MarkNotAllowed { .. }
            | GrammarViolation::NewlineInText { .. }
            | GrammarViolation::Structure(_)),
        ) => {
            tracing::trace!(target: "quire::editor", %error, "command does not fit the grammar");
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

/// Whether `node` carries every attribute in `attrs`.
pub fn attrs_match(node: &Node, attrs: &Attrs) -> bool {
    attrs.iter().all(|(name, value)| node.attr(name) == Some(value))
}

/// Depth of the nearest ancestor of `res` satisfying `pred`.
pub fn find_ancestor(res: &ResolvedPos<'_>, pred: impl Fn(&Node) -> bool) -> Option<usize> {
    (1..=res.depth()).rev().find(|d| pred(res.node(*d)))
}

/// The first textblock type that can be created without attributes.
pub fn default_textblock(schema: &Schema) -> Option<&Arc<NodeType>> {
    schema
        .node_types()
        .iter()
        .find(|ty| ty.is_textblock() && !ty.is_code() && !ty.has_required_attrs())
}

/// Whether the block around the selection start is `ty` with `attrs`.
pub fn is_block_active(state: &EditorState, ty: &NodeType, attrs: &Attrs) -> bool {
    let Ok(res) = state.doc().resolve(state.selection().from()) else {
        return false;
    };
    find_ancestor(&res, |node| node.ty().id == ty.id && attrs_match(node, attrs)).is_some()
}

/// Add `ty` over the selection when the selection start does not carry it,
/// remove it otherwise. With an empty selection the stored marks are
/// toggled instead.
pub fn toggle_mark(state: &EditorState, ty: &Arc<MarkType>, attrs: &Attrs) -> CommandResult {
    let mark = ty.create(attrs)?;
    let sel = state.selection();
    let doc = state.doc();
    if sel.is_empty() {
        let res = doc.resolve(sel.from())?;
        if !res.parent().is_textblock() || !res.parent().ty().allows_mark_type(ty) {
            return Ok(None);
        }
        let current = match state.stored_marks() {
            Some(marks) => marks.to_vec(),
            None => res.marks(),
        };
        let next = if ty.is_in_set(&current).is_some() {
            current.into_iter().filter(|m| m.ty.id != ty.id).collect()
        } else {
            mark.add_to_set(&current)
        };
        let mut tr = state.tr();
        tr.set_stored_marks(Some(next));
        return Ok(Some(tr));
    }

    let mut present = None;
    doc.nodes_between(sel.from(), sel.to(), &mut |node, _, _, _| {
        if present.is_none() && node.is_inline() {
            present = Some(ty.is_in_set(node.marks()).is_some());
        }
        present.is_none()
    });
    let present = present.unwrap_or(false);
    attempt(state, |tr| {
        if present {
            tr.remove_mark(sel.from(), sel.to(), ty)?;
        } else {
            tr.add_mark(sel.from(), sel.to(), &mark)?;
        }
        Ok(tr.doc_changed())
    })
}

/// Turn the textblock at `pos` into `ty`, dropping what `ty` cannot hold.
/// Disallowed marks are removed. Line breaks swap with newlines on
/// conversion to or from code, or become spaces where `ty` takes no breaks.
/// Other inline leaves `ty` does not accept are deleted.
///
/// Content changes go through one step replacing the node, so no step sees
/// a node holding content of the other type. Selection ends inside the node
/// keep their offsets.
fn retype_textblock(
    tr: &mut Transaction,
    schema: &Schema,
    pos: usize,
    ty: &Arc<NodeType>,
    attrs: Attrs,
) -> Result<(), GrammarViolation> {
    let Some(node) = tr.doc().node_at(pos).cloned() else {
        return Ok(());
    };
    let accepts = |id: usize| ty.content_expr().can_start_with(id);
    let break_type = schema
        .node_types()
        .iter()
        .find(|t| t.is_inline() && t.is_leaf() && !t.is_text() && !t.has_required_attrs());
    let line_break = break_type.filter(|t| accepts(t.id));

    let mut children = Vec::with_capacity(node.child_count());
    let mut dropped = Vec::new();
    let mut changed = false;
    let mut offset = pos + 1;
    for child in node.content().iter() {
        let marks: Vec<_> = child
            .marks()
            .iter()
            .filter(|m| ty.allows_mark_type(&m.ty))
            .cloned()
            .collect();
        changed |= marks.len() != child.marks().len();
        let is_break = break_type.is_some_and(|t| t.id == child.ty().id);
        match child.text() {
            Some(text) if !ty.is_code() && text.contains('\n') => {
                changed = true;
                for (i, line) in text.split('\n').enumerate() {
                    if i > 0 {
                        children.push(match line_break {
                            Some(br) => br.create(&Attrs::new(), Fragment::empty(), marks.clone())?,
                            None => schema.text(" ", marks.clone())?,
                        });
                    }
                    if !line.is_empty() {
                        children.push(schema.text(line, marks.clone())?);
                    }
                }
            }
            Some(_) => children.push(child.mark(marks)),
            None if is_break && ty.is_code() => {
                changed = true;
                children.push(schema.text("\n", Vec::new())?);
            }
            None if is_break && !accepts(child.ty().id) => {
                changed = true;
                children.push(schema.text(" ", marks)?);
            }
            None if ty.is_code() || !accepts(child.ty().id) => {
                changed = true;
                dropped.push(offset);
            }
            None => children.push(child.mark(marks)),
        }
        offset += child.node_size();
    }
    if !changed {
        tr.set_node_markup(pos, ty, attrs)?;
        return Ok(());
    }

    let retyped = ty.create(&attrs, Fragment::from_vec(children), node.marks().to_vec())?;
    let end = pos + node.node_size();
    let before = tr.selection();
    tr.replace(pos, end, retyped.into())?;
    let inside = |p: usize| p > pos && p < end;
    if inside(before.anchor) || inside(before.head) {
        let keep = |p: usize, mapped: usize| {
            if inside(p) {
                p - dropped.iter().filter(|&&d| d < p).count()
            } else {
                mapped
            }
        };
        let mapped = tr.selection();
        tr.set_selection(Selection::new(
            keep(before.anchor, mapped.anchor),
            keep(before.head, mapped.head),
        ));
    }
    Ok(())
}

/// Turn every textblock in the selection into `ty`.
pub fn set_block_type(state: &EditorState, ty: &Arc<NodeType>, attrs: &Attrs) -> CommandResult {
    if !ty.is_textblock() {
        return Ok(None);
    }
    let sel = state.selection();
    let mut targets = Vec::new();
    state.doc().nodes_between(sel.from(), sel.to(), &mut |node, pos, _, _| {
        if node.is_textblock() {
            if !(node.ty().id == ty.id && attrs_match(node, attrs)) {
                targets.push(pos);
            }
            return false;
        }
        true
    });
    if targets.is_empty() {
        return Ok(None);
    }
    let schema = state.schema().clone();
    attempt(state, |tr| {
        for pos in targets.into_iter().rev() {
            retype_textblock(tr, &schema, pos, ty, attrs.clone())?;
        }
        Ok(true)
    })
}

/// `ty` with `attrs`, or back to `toggle` when already active.
pub fn toggle_block_type(
    state: &EditorState,
    ty: &Arc<NodeType>,
    toggle: &Arc<NodeType>,
    attrs: &Attrs,
) -> CommandResult {
    let res = state.doc().resolve(state.selection().from())?;
    let parent = res.parent();
    if parent.ty().id == ty.id && attrs_match(parent, attrs) {
        set_block_type(state, toggle, &Attrs::new())
    } else {
        set_block_type(state, ty, attrs)
    }
}

/// Lift the siblings in `start..end` out of their parent, splitting the
/// parent around them when they do not cover all of it. With `items`, the
/// siblings are themselves unwrapped too, as when lifting list items out
/// of their list.
pub(crate) fn lift_range(
    tr: &mut Transaction,
    start: usize,
    end: usize,
    items: bool,
) -> Result<bool, GrammarViolation> {
    let doc = tr.doc().clone();
    let res = doc.resolve(start)?;
    let depth = res.depth();
    if depth == 0 {
        return Ok(false);
    }
    let (content_start, content_end) = (res.start(depth), res.end(depth));
    let mut wrapper = res.before(depth);
    if end < content_end {
        tr.split(end, 1, vec![None])?;
    }
    if start > content_start {
        tr.split(start, 1, vec![None])?;
        wrapper = start + 1;
    }
    tr.unwrap(wrapper, items)?;
    Ok(true)
}

/// Wrap the selected blocks in `ty`, or lift them out of the nearest `ty`
/// ancestor when there is one.
pub fn toggle_wrap(state: &EditorState, ty: &Arc<NodeType>, attrs: &Attrs) -> CommandResult {
    let sel = state.selection();
    let doc = state.doc();
    let from = doc.resolve(sel.from())?;
    let to = doc.resolve(sel.to())?;
    let id = ty.id;
    if find_ancestor(&from, |node| node.ty().id == id).is_some() {
        let is_wrapper: &dyn Fn(&Node) -> bool = &|node: &Node| node.ty().id == id;
        let Some(range) = from.block_range(&to, Some(is_wrapper)) else {
            return Ok(None);
        };
        let (start, end) = (range.start(), range.end());
        return attempt(state, |tr| lift_range(tr, start, end, false));
    }
    let Some(range) = from.block_range(&to, None) else {
        return Ok(None);
    };
    let (start, end) = (range.start(), range.end());
    attempt(state, |tr| {
        tr.wrap(start, end, NodeShell::new(ty.clone(), attrs.clone()), Vec::new())?;
        Ok(true)
    })
}

/// Replace the selection with a block leaf such as a horizontal rule,
/// splitting the textblock around the caret.
pub fn insert_node(state: &EditorState, ty: &Arc<NodeType>, attrs: &Attrs) -> CommandResult {
    let node = ty.create_checked(attrs, Fragment::empty(), Vec::new())?;
    let sel = state.selection();
    let filler = default_textblock(state.schema()).cloned();
    attempt(state, |tr| {
        if !sel.is_empty() {
            tr.delete(sel.from(), sel.to())?;
        }
        let at = sel.from();
        let doc = tr.doc().clone();
        let res = doc.resolve(at)?;
        if !res.parent().is_textblock() {
            tr.insert(at, node)?;
            return Ok(true);
        }
        let depth = res.depth();
        if res.parent_offset == 0 {
            tr.insert(res.before(depth), node)?;
        } else if res.parent_offset == res.parent().content_size() {
            let after = res.after(depth);
            let size = node.node_size();
            let mut nodes = vec![node];
            if let Some(filler) = &filler {
                nodes.push(filler.create(&Attrs::new(), Fragment::empty(), Vec::new())?);
            }
            let with_filler = nodes.len() > 1;
            tr.insert(after, nodes)?;
            if with_filler {
                tr.set_selection(Selection::cursor(after + size + 1));
            }
        } else {
            tr.split(at, 1, vec![None])?;
            tr.insert(at + 1, node)?;
        }
        Ok(true)
    })
}

/// Enter: a newline inside code, lifting an empty last block out of its
/// wrapper, or splitting the textblock.
pub fn split_block(state: &EditorState) -> CommandResult {
    let sel = state.selection();
    let doc = state.doc();
    let from = doc.resolve(sel.from())?;
    let to = doc.resolve(sel.to())?;
    let parent = from.parent();
    if !parent.is_textblock() || !from.same_parent(&to) {
        return Ok(None);
    }
    if parent.ty().is_code() {
        return attempt(state, |tr| {
            tr.insert_text(state.schema(), "\n", sel.from(), sel.to())?;
            Ok(true)
        });
    }
    let depth = from.depth();
    if depth >= 2 && parent.content_size() == 0 {
        let container = from.node(depth - 1);
        let is_last = from.index(depth - 1) + 1 == container.child_count();
        let in_item = from.node(depth - 2).ty().in_group("list");
        if is_last && !in_item {
            let (start, end) = (from.before(depth), from.after(depth));
            return attempt(state, |tr| lift_range(tr, start, end, false));
        }
    }
    let at_end = to.parent_offset == parent.content_size();
    let grand = from.node(depth - 1);
    let after_type = if at_end {
        state
            .schema()
            .default_type_at(grand, from.index(depth - 1) + 1)
            .filter(|ty| ty.is_textblock())
            .cloned()
    } else {
        None
    };
    attempt(state, |tr| {
        if !sel.is_empty() {
            tr.delete(sel.from(), sel.to())?;
        }
        let shell = after_type.map(|ty| NodeShell::new(ty, Attrs::new()));
        tr.split(sel.from(), 1, vec![shell])?;
        Ok(true)
    })
}

/// Backspace at the start of a textblock: join with the block before it,
/// or lift the block out of its wrapper when it comes first.
pub fn join_backward(state: &EditorState) -> CommandResult {
    let sel = state.selection();
    if !sel.is_empty() {
        return Ok(None);
    }
    let doc = state.doc();
    let res = doc.resolve(sel.from())?;
    if !res.parent().is_textblock() || res.parent_offset != 0 || res.depth() == 0 {
        return Ok(None);
    }
    let depth = res.depth();
    let index = res.index(depth - 1);
    let block_pos = res.before(depth);

    if index == 0 {
        if depth < 2 {
            return Ok(None);
        }
        let container = res.node(depth - 1);
        if res.node(depth - 2).ty().in_group("list") {
            return lists::lift_list_item(state, container.ty());
        }
        let end = res.after(depth);
        return attempt(state, |tr| lift_range(tr, block_pos, end, false));
    }

    let prev = res.node(depth - 1).child(index - 1).clone();
    if prev.is_textblock() {
        return attempt(state, |tr| {
            tr.join(block_pos, 1)?;
            Ok(true)
        });
    }
    if prev.is_leaf() {
        let start = block_pos - prev.node_size();
        return attempt(state, |tr| {
            tr.delete(start, block_pos)?;
            Ok(true)
        });
    }

    // Move the content to the end of the last textblock inside `prev`.
    let mut target = &prev;
    let mut end = block_pos - 1;
    while !target.is_textblock() {
        let Some(last) = target.last_child() else {
            return Ok(None);
        };
        target = last;
        end -= 1;
    }
    let block = res.parent().clone();
    attempt(state, |tr| {
        let content = block.content().clone();
        let size = content.size();
        tr.insert(end, content)?;
        tr.delete(block_pos + size, block_pos + size + block.node_size())?;
        tr.set_selection(Selection::cursor(end));
        Ok(true)
    })
}

/// Delete a non-empty selection. Across two sibling textblocks the
/// remaining halves are joined.
pub fn delete_selection(state: &EditorState) -> CommandResult {
    let sel = state.selection();
    if sel.is_empty() {
        return Ok(None);
    }
    let doc = state.doc();
    let (from, to) = (sel.from(), sel.to());
    if from == 0 && to == doc.content_size() {
        let empty = state.schema().empty_doc()?;
        return attempt(state, |tr| {
            tr.replace(0, to, empty.content().clone())?;
            let start = start_of_text(tr.doc());
            tr.set_selection(Selection::cursor(start));
            Ok(true)
        });
    }
    let rf = doc.resolve(from)?;
    let rt = doc.resolve(to)?;
    if rf.same_parent(&rt) {
        return attempt(state, |tr| {
            tr.delete(from, to)?;
            Ok(true)
        });
    }
    let depth = rf.depth();
    let siblings = depth >= 1
        && depth == rt.depth()
        && rf.parent().is_textblock()
        && rt.parent().is_textblock()
        && rf.start(depth - 1) == rt.start(depth - 1);
    if !siblings {
        return Ok(None);
    }
    let (to_start, between_start, between_end, from_end) =
        (rt.start(depth), rf.after(depth), rt.before(depth), rf.end(depth));
    attempt(state, |tr| {
        tr.delete(to_start, to)?;
        tr.delete(between_start, between_end)?;
        tr.delete(from, from_end)?;
        tr.join(from + 1, 1)?;
        tr.set_selection(Selection::cursor(from));
        Ok(true)
    })
}

pub fn select_all(state: &EditorState) -> CommandResult {
    let mut tr = state.tr();
    tr.set_selection(Selection::new(0, state.doc().content_size()));
    Ok(Some(tr))
}

pub fn undo(state: &EditorState) -> CommandResult {
    let Some(entry) = state.history().next_undo() else {
        return Ok(None);
    };
    let mut tr = state.tr();
    for step in &entry.steps {
        tr.step(step.clone())?;
    }
    tr.set_selection(entry.selection).set_meta(HISTORY_META, "undo");
    Ok(Some(tr))
}

pub fn redo(state: &EditorState) -> CommandResult {
    let Some(entry) = state.history().next_redo() else {
        return Ok(None);
    };
    let mut tr = state.tr();
    for step in &entry.steps {
        tr.step(step.clone())?;
    }
    tr.set_selection(entry.selection).set_meta(HISTORY_META, "redo");
    Ok(Some(tr))
}

/// Replace the selection with `text`, carrying the marks at the caret.
pub fn insert_text(state: &EditorState, text: &str) -> CommandResult {
    let sel = state.selection();
    let doc = state.doc();
    let from = doc.resolve(sel.from())?;
    if !from.parent().is_textblock() || !from.same_parent(&doc.resolve(sel.to())?) {
        return Ok(None);
    }
    let stored = state.stored_marks().map(<[_]>::to_vec);
    attempt(state, |tr| {
        if stored.is_some() {
            tr.set_stored_marks(stored);
        }
        tr.insert_text(state.schema(), text, sel.from(), sel.to())?;
        tr.set_stored_marks(None);
        Ok(true)
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stamp {
    Date,
    Time,
    DateTime,
}

/// `October 19, 2026`, `3:04 PM`, or both joined by a comma.
pub fn format_stamp(kind: Stamp, now: DateTime<Local>) -> String {
    let date = now.format("%B %-d, %Y");
    let time = now.format("%-I:%M %p");
    match kind {
        Stamp::Date => date.to_string(),
        Stamp::Time => time.to_string(),
        Stamp::DateTime => format!("{date}, {time}"),
    }
}

/// Insert the current date or time followed by a space.
pub fn insert_stamp(state: &EditorState, kind: Stamp) -> CommandResult {
    insert_text(state, &format!("{} ", format_stamp(kind, Local::now())))
}

/// Turn textblocks in the selection into the default textblock and lift
/// them out of every wrapper.
pub fn clear_nodes(state: &EditorState) -> CommandResult {
    let sel = state.selection();
    let schema = state.schema().clone();
    attempt(state, |tr| {
        clear_nodes_in(tr, &schema, sel.from(), sel.to())?;
        Ok(tr.doc_changed())
    })
}

pub(crate) fn clear_nodes_in(
    tr: &mut Transaction,
    schema: &Schema,
    from: usize,
    to: usize,
) -> Result<(), GrammarViolation> {
    let Some(paragraph) = default_textblock(schema).cloned() else {
        return Ok(());
    };
    let mut targets = Vec::new();
    tr.doc().nodes_between(from, to, &mut |node, pos, _, _| {
        if node.is_textblock() {
            if node.ty().id != paragraph.id {
                targets.push(pos);
            }
            return false;
        }
        true
    });
    for pos in targets.into_iter().rev() {
        retype_textblock(tr, schema, pos, &paragraph, Attrs::new())?;
    }
    // Lift each selected textblock out of its own wrappers, one level per
    // round. List items are lifted whole.
    let mut budget = 0;
    tr.doc().nodes_between(from, to, &mut |node, _, _, _| {
        budget += 1;
        !node.is_textblock()
    });
    for _ in 0..budget {
        let selection = tr.selection();
        let doc = tr.doc().clone();
        let mut nested = None;
        doc.nodes_between(selection.from(), selection.to(), &mut |node, pos, _, _| {
            if nested.is_some() {
                return false;
            }
            if node.is_textblock() {
                if doc.resolve(pos).is_ok_and(|res| res.depth() > 0) {
                    nested = Some((pos, node.node_size()));
                }
                return false;
            }
            true
        });
        let Some((pos, size)) = nested else {
            break;
        };
        let res = doc.resolve(pos)?;
        let depth = res.depth();
        let lifted = if depth >= 2 && res.node(depth - 1).ty().in_group("list") {
            lift_range(tr, res.before(depth), res.after(depth), true)?
        } else {
            lift_range(tr, pos, pos + size, false)?
        };
        if !lifted {
            break;
        }
    }
    Ok(())
}
