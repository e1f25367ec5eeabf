use quire_model::{Selection, attrs};

use super::*;
use crate::editor::Editor;
use crate::registry::ExtensionRegistry;
use crate::test_support::{cursor_after, editor};

const CODE: &str = "intro\n\n```python\ndef f(): pass\n```";

fn code_pos(editor: &Editor) -> usize {
    let mut found = None;
    editor.doc().descendants(&mut |node, pos, _, _| {
        if node.type_name() == "code_block" {
            found = Some(pos);
        }
        found.is_none()
    });
    found.unwrap()
}

#[test]
fn test_first_paint_waits_for_deferred_task() {
    let composition = ExtensionRegistry::compose(crate::builtins::all()).unwrap();
    let mut editor = Editor::from_markdown(composition, CODE).unwrap();
    assert!(editor.decorations().is_empty());
    assert!(editor.has_pending_tasks());

    // Edits before the first paint are not tracked.
    cursor_after(&mut editor, "intro");
    editor.handle_text_input("!").unwrap();
    assert!(editor.decorations().is_empty());

    assert_eq!(editor.run_deferred(), 1);
    assert!(!editor.has_pending_tasks());
    let start = code_pos(&editor) + 1;
    let def = editor.decorations().into_iter().find(|d| d.from == start).unwrap();
    assert_eq!(def.to, start + 3);
}

#[test]
fn test_decorations_follow_edits_outside_the_block() {
    let mut editor = editor(CODE);
    let before = editor.decorations();
    assert!(!before.is_empty());

    cursor_after(&mut editor, "intro");
    editor.handle_text_input("duction").unwrap();
    let after = editor.decorations();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!((b.from + 7, b.to + 7), (a.from, a.to));
        assert_eq!(b.class, a.class);
    }
}

#[test]
fn test_cache_keeps_untouched_blocks() {
    let editor = editor(CODE);
    let mut cache = DecorationCache::new(None);
    let stats = cache.sync(editor.doc(), "code_block", false);
    assert_eq!(stats.tokenized, 1);
    let ids: Vec<_> = cache.block_ids().collect();

    let mut tr = editor.state().tr();
    tr.insert_text(editor.state().schema(), "more ", 1, 1).unwrap();
    cache.map(tr.mapping());
    let stats = cache.sync(tr.doc(), "code_block", false);
    assert_eq!(stats, SyncStats { kept: 1, tokenized: 0, evicted: 0 });
    assert_eq!(cache.block_ids().collect::<Vec<_>>(), ids);

    let stats = cache.sync(tr.doc(), "code_block", true);
    assert_eq!(stats.tokenized, 1);
    assert_eq!(cache.block_ids().collect::<Vec<_>>(), ids);
}

#[test]
fn test_editing_code_retokenizes_only_that_block() {
    let mut editor = editor("```python\nx = 1\n```\n\n```python\ny = 2\n```");
    let mut cache = DecorationCache::new(None);
    cache.sync(editor.doc(), "code_block", false);
    assert_eq!(cache.len(), 2);

    cursor_after(&mut editor, "y = 2");
    let mut tr = editor.state().tr();
    let at = tr.selection().from();
    tr.insert_text(editor.state().schema(), "0", at, at).unwrap();
    cache.map(tr.mapping());
    let stats = cache.sync(tr.doc(), "code_block", false);
    assert_eq!(stats, SyncStats { kept: 1, tokenized: 1, evicted: 0 });
}

#[test]
fn test_language_change_updates_decorations() {
    let mut editor = editor("```\ndef f(): pass\n```");
    assert!(editor.decorations().is_empty());

    let pos = code_pos(&editor);
    let ty = editor.composition().schema.node_type("code_block").unwrap().clone();
    let mut tr = editor.state().tr();
    tr.set_node_markup(pos, &ty, attrs([("language", "python")])).unwrap();
    editor.dispatch(tr);
    assert!(editor.decorations().iter().any(|d| d.from == pos + 1 && d.to == pos + 4));
}

#[test]
fn test_deleted_block_is_evicted() {
    let mut editor = editor(CODE);
    let pos = code_pos(&editor);
    let size = editor.doc().node_at(pos).unwrap().node_size();
    let mut tr = editor.state().tr();
    tr.delete(pos, pos + size).unwrap();
    editor.dispatch(tr);
    assert!(editor.decorations().is_empty());
}

#[test]
fn test_remote_patch_without_doc_change_keeps_decorations() {
    let mut editor = editor(CODE);
    let before = editor.decorations();
    let mut tr = editor.state().tr();
    tr.set_meta(REMOTE_PATCH_META, true);
    editor.dispatch(tr);
    assert_eq!(editor.decorations(), before);
}

#[test]
fn test_language_allow_list() {
    let options = HighlightOptions {
        defer_first_paint: false,
        languages: Some(vec![SmolStr::new("rust")]),
        ..HighlightOptions::default()
    };
    let mut plugin = HighlightPlugin::new(options);
    let editor = editor(CODE);
    let mut scheduler = Scheduler::new();
    plugin.init(editor.state(), &mut scheduler);
    assert!(plugin.is_settled());
    assert!(scheduler.is_empty());
    assert_eq!(plugin.cache().len(), 1);
    assert!(plugin.decorations().is_empty());
}

#[test]
fn test_selection_changes_do_not_touch_the_cache() {
    let mut editor = editor(CODE);
    let before = editor.decorations();
    editor.set_selection(Selection::cursor(2));
    assert_eq!(editor.decorations(), before);
    assert_eq!(editor.state().version(), 0);
}
