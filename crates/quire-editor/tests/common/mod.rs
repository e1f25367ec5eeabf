#![allow(dead_code)]

use std::sync::{Arc, LazyLock};

use quire_editor::{Composition, Editor, ExtensionRegistry, builtins};
use quire_model::{Node, Selection};

pub static COMPOSITION: LazyLock<Arc<Composition>> =
    LazyLock::new(|| ExtensionRegistry::compose(builtins::all()).unwrap());

pub fn editor(markdown: &str) -> Editor {
    Editor::from_markdown(COMPOSITION.clone(), markdown).unwrap()
}

pub fn empty_editor() -> Editor {
    Editor::empty(COMPOSITION.clone()).unwrap()
}

/// Type `text` one character at a time, as a keyboard would.
pub fn type_text(editor: &mut Editor, text: &str) {
    for c in text.chars() {
        let mut buf = [0; 4];
        editor.handle_text_input(c.encode_utf8(&mut buf)).unwrap();
    }
}

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

pub fn cursor_after(editor: &mut Editor, needle: &str) {
    let pos = pos_of(editor.doc(), needle) + needle.chars().count();
    editor.set_selection(Selection::cursor(pos));
}

pub fn cursor_before(editor: &mut Editor, needle: &str) {
    let pos = pos_of(editor.doc(), needle);
    editor.set_selection(Selection::cursor(pos));
}
