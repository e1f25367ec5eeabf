//! List commands.
//!
//! Item commands take the item type they act on. Bullet and ordered lists
//! share `list_item` while checkbox lists hold `checkbox_item`, and both
//! register the same command names: a command only applies when the
//! nearest item around the selection has its type, so at most one of them
//! fires.

use std::sync::Arc;

use quire_model::{
    Attrs, Fragment, GrammarViolation, Node, NodeRange, NodeShell, NodeType, ResolvedPos,
    Selection, Transaction,
};

use super::{CommandResult, attempt, clear_nodes_in, find_ancestor, lift_range};
use crate::state::EditorState;

fn is_list(node: &Node) -> bool {
    node.ty().in_group("list")
}

/// Depth of the nearest list item around `res`, of any item type.
fn item_depth(res: &ResolvedPos<'_>) -> Option<usize> {
    (2..=res.depth()).rev().find(|d| is_list(res.node(d - 1)))
}

/// The range of items of type `item` covering the selection, when the
/// nearest item around the selection is of that type.
fn item_range<'a>(
    from: &ResolvedPos<'a>,
    to: &ResolvedPos<'a>,
    item: &NodeType,
) -> Option<NodeRange<'a>> {
    let id = item.id;
    let holds_items: &dyn Fn(&Node) -> bool =
        &|node: &Node| node.first_child().is_some_and(|child| child.ty().id == id);
    let range = from.block_range(to, Some(holds_items))?;
    (item_depth(from) == Some(range.depth + 1)).then_some(range)
}

/// Wrap the blocks of `range` in a `list`, each block in its own `item`.
pub fn wrap_range_in_list(
    tr: &mut Transaction,
    range: &NodeRange<'_>,
    list: &Arc<NodeType>,
    item: &Arc<NodeType>,
    attrs: Attrs,
) -> Result<(), GrammarViolation> {
    let count = range.end_index() - range.start_index();
    let items = vec![(NodeShell::new(item.clone(), Attrs::new()), 1); count];
    tr.wrap(range.start(), range.end(), NodeShell::new(list.clone(), attrs), items)?;
    Ok(())
}

pub fn wrap_in_list(
    state: &EditorState,
    list: &Arc<NodeType>,
    item: &Arc<NodeType>,
    attrs: &Attrs,
) -> CommandResult {
    let sel = state.selection();
    let doc = state.doc();
    let from = doc.resolve(sel.from())?;
    let to = doc.resolve(sel.to())?;
    let Some(range) = from.block_range(&to, None) else {
        return Ok(None);
    };
    attempt(state, |tr| {
        wrap_range_in_list(tr, &range, list, item, attrs.clone())?;
        Ok(true)
    })
}

/// Toggle a `list` around the selection.
///
/// Inside a list of the same type the items are lifted out. Inside another
/// list whose items `list` can hold, that list is retyped. Otherwise the
/// blocks are wrapped, first turning them into plain paragraphs outside any
/// wrapper when they cannot be wrapped as they are.
pub fn toggle_list(
    state: &EditorState,
    list: &Arc<NodeType>,
    item: &Arc<NodeType>,
    attrs: &Attrs,
) -> CommandResult {
    let sel = state.selection();
    let doc = state.doc();
    let from = doc.resolve(sel.from())?;
    let to = doc.resolve(sel.to())?;
    let Some(range) = from.block_range(&to, None) else {
        return Ok(None);
    };

    if let Some(list_depth) = find_ancestor(&from, is_list)
        && range.depth >= 1
        && range.depth <= list_depth + 1
    {
        let existing = from.node(list_depth);
        if existing.ty().id == list.id {
            return lift_list_item(state, item);
        }
        if list.valid_content(existing.content()) {
            let pos = from.before(list_depth);
            return attempt(state, |tr| {
                tr.set_node_markup(pos, list, attrs.clone())?;
                Ok(true)
            });
        }
    }

    if let Some(tr) = wrap_in_list(state, list, item, attrs)? {
        return Ok(Some(tr));
    }

    let schema = state.schema().clone();
    attempt(state, |tr| {
        clear_nodes_in(tr, &schema, sel.from(), sel.to())?;
        let selection = tr.selection();
        let doc = tr.doc().clone();
        let from = doc.resolve(selection.from())?;
        let to = doc.resolve(selection.to())?;
        let Some(range) = from.block_range(&to, None) else {
            return Ok(false);
        };
        wrap_range_in_list(tr, &range, list, item, attrs.clone())?;
        Ok(true)
    })
}

/// Lift the list items in `start..end` out of their list, the list is split
/// around them as needed.
pub(crate) fn lift_out_of_list(
    tr: &mut Transaction,
    start: usize,
    end: usize,
) -> Result<bool, GrammarViolation> {
    lift_range(tr, start, end, true)
}

/// Move the selected items one level out: into the surrounding list when
/// nested in another item, out of the list entirely otherwise.
pub fn lift_list_item(state: &EditorState, item: &Arc<NodeType>) -> CommandResult {
    let sel = state.selection();
    let doc = state.doc();
    let from = doc.resolve(sel.from())?;
    let to = doc.resolve(sel.to())?;
    let Some(range) = item_range(&from, &to, item) else {
        return Ok(None);
    };
    if range.depth >= 2 && from.node(range.depth - 1).ty().id == item.id {
        return lift_to_outer_list(state, &range);
    }
    let (start, end) = (range.start(), range.end());
    attempt(state, |tr| lift_out_of_list(tr, start, end))
}

/// Replace the outer item with itself (keeping the items before the
/// selection) followed by the lifted items. Items after the selection nest
/// under the last lifted one.
fn lift_to_outer_list(state: &EditorState, range: &NodeRange<'_>) -> CommandResult {
    let sel = state.selection();
    let inner = range.parent();
    let outer_depth = range.depth - 1;
    let outer = range.from.node(outer_depth);
    let outer_start = range.from.before(outer_depth);
    let outer_end = range.from.after(outer_depth);
    let list_index = range.from.index(outer_depth);
    let (si, ei) = (range.start_index(), range.end_index());
    let items = inner.content().as_slice();

    let mut kept: Vec<Node> = outer.content().iter().take(list_index).cloned().collect();
    if si > 0 {
        kept.push(inner.copy(Fragment::from_vec(items[..si].to_vec())));
    }
    let trailing: Vec<Node> = outer.content().iter().skip(list_index + 1).cloned().collect();
    let kept = outer.copy(Fragment::from_vec(kept));
    let new_start = outer_start + kept.node_size();

    let selected = &items[si..ei];
    let mut lifted = Vec::with_capacity(selected.len() + 1);
    lifted.push(kept);
    for (i, node) in selected.iter().enumerate() {
        if i + 1 < selected.len() {
            lifted.push(node.clone());
            continue;
        }
        let mut children = node.content().to_vec();
        if ei < items.len() {
            children.push(inner.copy(Fragment::from_vec(items[ei..].to_vec())));
        }
        children.extend(trailing.iter().cloned());
        lifted.push(node.copy(Fragment::from_vec(children)));
    }

    let shift = |pos: usize| new_start + (pos - range.start());
    attempt(state, |tr| {
        tr.replace(outer_start, outer_end, Fragment::from_vec(lifted))?;
        tr.set_selection(Selection::new(shift(sel.anchor), shift(sel.head)));
        Ok(true)
    })
}

/// Nest the selected items inside the item before them.
pub fn sink_list_item(state: &EditorState, item: &Arc<NodeType>) -> CommandResult {
    let sel = state.selection();
    let doc = state.doc();
    let from = doc.resolve(sel.from())?;
    let to = doc.resolve(sel.to())?;
    let Some(range) = item_range(&from, &to, item) else {
        return Ok(None);
    };
    let si = range.start_index();
    if si == 0 {
        return Ok(None);
    }
    let list = range.parent();
    let prev = list.child(si - 1);
    if prev.ty().id != item.id {
        return Ok(None);
    }
    let selected = list.content().as_slice()[si..range.end_index()].to_vec();

    let nested = prev.last_child().filter(|child| child.ty().id == list.ty().id);
    let (new_prev, into_existing) = match nested {
        Some(nested) => {
            let mut children = nested.content().to_vec();
            children.extend(selected);
            let nested = nested.copy(Fragment::from_vec(children));
            let content = prev.content().replace_child(prev.child_count() - 1, nested);
            (prev.copy(content), true)
        }
        None => {
            let sub = list.ty().create(&Attrs::new(), selected, Vec::new())?;
            (prev.copy(prev.content().append(&Fragment::from(sub))), false)
        }
    };
    let start = range.start() - prev.node_size();
    let end = range.end();
    // Appending to an existing nested list moves the items back over the
    // two closing tokens of that list and of `prev`.
    let shift = |pos: usize| if into_existing { pos - 2 } else { pos };
    attempt(state, |tr| {
        tr.replace(start, end, Fragment::from(new_prev))?;
        tr.set_selection(Selection::new(shift(sel.anchor), shift(sel.head)));
        Ok(true)
    })
}

/// Enter inside a list item: split the item, or lift it out when its
/// last block is empty.
pub fn split_list_item(state: &EditorState, item: &Arc<NodeType>) -> CommandResult {
    let sel = state.selection();
    let doc = state.doc();
    let from = doc.resolve(sel.from())?;
    let to = doc.resolve(sel.to())?;
    let depth = from.depth();
    if depth < 2 || !from.same_parent(&to) || from.parent().ty().is_code() {
        return Ok(None);
    }
    let container = from.node(depth - 1);
    if container.ty().id != item.id || !is_list(from.node(depth - 2)) {
        return Ok(None);
    }
    let is_last = from.index(depth - 1) + 1 == container.child_count();
    if from.parent().content_size() == 0 && is_last {
        return lift_list_item(state, item);
    }
    // A new item starts from default attributes, so a split checkbox item
    // comes out unchecked.
    let shell = NodeShell::new(item.clone(), Attrs::new());
    attempt(state, |tr| {
        if !sel.is_empty() {
            tr.delete(sel.from(), sel.to())?;
        }
        tr.split(sel.from(), 2, vec![Some(shell), None])?;
        Ok(true)
    })
}
