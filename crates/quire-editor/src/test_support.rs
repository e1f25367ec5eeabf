use std::sync::Arc;

use quire_model::{Node, Selection};

use crate::builtins;
use crate::editor::Editor;
use crate::highlight::HighlightOptions;
use crate::registry::{Composition, ExtensionRegistry};

/// Every built-in unit; highlighting paints immediately.
pub fn composition() -> Arc<Composition> {
    let highlight = HighlightOptions {
        defer_first_paint: false,
        ..HighlightOptions::default()
    };
    let units = builtins::NAMES
        .iter()
        .filter_map(|name| builtins::by_name(name, &highlight))
        .collect();
    ExtensionRegistry::compose(units).unwrap()
}

pub fn editor(markdown: &str) -> Editor {
    Editor::from_markdown(composition(), markdown).unwrap()
}

/// Absolute position of the first occurrence of `needle` in a text node.
pub fn pos_of(doc: &Node, needle: &str) -> usize {
    let mut found = None;
    doc.descendants(&mut |node, pos, _, _| {
        if found.is_some() {
            return false;
        }
        if let Some(text) = node.text()
            && let Some(byte) = text.find(needle)
        {
            found = Some(pos + text[..byte].chars().count());
        }
        true
    });
    found.unwrap_or_else(|| panic!("`{needle}` not in document"))
}

/// Put the cursor right before `needle`.
pub fn cursor_before(editor: &mut Editor, needle: &str) {
    let pos = pos_of(editor.doc(), needle);
    editor.set_selection(Selection::cursor(pos));
}

/// Put the cursor right after `needle`.
pub fn cursor_after(editor: &mut Editor, needle: &str) {
    let pos = pos_of(editor.doc(), needle) + needle.chars().count();
    editor.set_selection(Selection::cursor(pos));
}

/// Select `needle`.
pub fn select(editor: &mut Editor, needle: &str) {
    let from = pos_of(editor.doc(), needle);
    editor.set_selection(Selection::new(from, from + needle.chars().count()));
}
