mod common;

use common::*;
use insta::assert_snapshot;
use quire_editor::{EditorConfig, EditorError, Key, KeyCombo, KeydownResult, Modifiers};
use quire_model::{Attrs, attrs};

fn press(editor: &mut quire_editor::Editor, combo: KeyCombo) -> KeydownResult {
    editor.handle_key(&combo).unwrap()
}

#[test]
fn test_typing_a_document() {
    let mut editor = empty_editor();
    type_text(&mut editor, "# Notes");
    press(&mut editor, KeyCombo::new(Key::Enter));
    type_text(&mut editor, "- one");
    press(&mut editor, KeyCombo::new(Key::Enter));
    type_text(&mut editor, "two");
    press(&mut editor, KeyCombo::new(Key::Enter));
    press(&mut editor, KeyCombo::new(Key::Enter));
    type_text(&mut editor, "```");
    type_text(&mut editor, "fn main");
    assert_snapshot!(editor.to_markdown(), @r"
    # Notes

    - one
    - two

    ```
    fn main
    ```
    ");
}

#[test]
fn test_unbound_and_navigation_keys() {
    let mut editor = editor("text");
    assert_eq!(
        press(&mut editor, KeyCombo::new(Key::ArrowLeft)),
        KeydownResult::PassThrough
    );
    assert_eq!(press(&mut editor, KeyCombo::new(Key::Shift)), KeydownResult::PassThrough);
    assert_eq!(
        press(&mut editor, KeyCombo::new(Key::character("x"))),
        KeydownResult::NotHandled
    );
    // Bound, but nothing to do with an empty selection at the end.
    cursor_after(&mut editor, "text");
    assert_eq!(press(&mut editor, KeyCombo::new(Key::Delete)), KeydownResult::NotHandled);
}

#[test]
fn test_backspace_joins_blocks() {
    let mut editor = editor("hello\n\nworld");
    cursor_before(&mut editor, "world");
    assert_eq!(press(&mut editor, KeyCombo::new(Key::Backspace)), KeydownResult::Handled);
    assert_eq!(editor.to_markdown(), "helloworld");
}

#[test]
fn test_backspace_at_start_of_list_lifts_item() {
    let mut editor = editor("- one\n- two");
    cursor_before(&mut editor, "one");
    assert_eq!(press(&mut editor, KeyCombo::new(Key::Backspace)), KeydownResult::Handled);
    assert_eq!(editor.to_markdown(), "one\n\n- two");
}

#[test]
fn test_tab_and_shift_tab_in_lists() {
    let mut editor = editor("- one\n- two");
    cursor_before(&mut editor, "two");
    assert_eq!(press(&mut editor, KeyCombo::new(Key::Tab)), KeydownResult::Handled);
    assert_eq!(editor.to_markdown(), "- one\n  - two");
    assert_eq!(press(&mut editor, KeyCombo::shift(Key::Tab)), KeydownResult::Handled);
    assert_eq!(editor.to_markdown(), "- one\n- two");
}

#[test]
fn test_tab_outside_lists_is_not_handled() {
    let mut editor = editor("plain");
    assert_eq!(press(&mut editor, KeyCombo::new(Key::Tab)), KeydownResult::NotHandled);
}

#[test]
fn test_mod_resolves_per_platform() {
    let mut editor = editor("hello world");
    let from = pos_of(editor.doc(), "world");
    editor.set_selection(quire_model::Selection::new(from, from + 5));

    assert_eq!(
        press(&mut editor, KeyCombo::meta(Key::character("b"))),
        KeydownResult::NotHandled
    );
    assert_eq!(
        press(&mut editor, KeyCombo::ctrl(Key::character("b"))),
        KeydownResult::Handled
    );
    assert_eq!(editor.to_markdown(), "hello **world**");

    editor.set_mac(true);
    assert_eq!(
        press(&mut editor, KeyCombo::meta(Key::character("z"))),
        KeydownResult::Handled
    );
    assert_eq!(editor.to_markdown(), "hello world");
    assert_eq!(
        press(&mut editor, KeyCombo::with_modifiers(Key::character("z"), Modifiers::META_SHIFT)),
        KeydownResult::Handled
    );
    assert_eq!(editor.to_markdown(), "hello **world**");
}

#[test]
fn test_heading_shortcuts_carry_level() {
    let mut editor = editor("title");
    let combo = KeyCombo::with_modifiers(Key::character("3"), Modifiers::CTRL_SHIFT);
    assert_eq!(press(&mut editor, combo.clone()), KeydownResult::Handled);
    assert_eq!(editor.to_markdown(), "### title");
    assert_eq!(press(&mut editor, combo), KeydownResult::Handled);
    assert_eq!(editor.to_markdown(), "title");
}

#[test]
fn test_shift_enter_inserts_break() {
    let mut editor = editor("ab");
    cursor_after(&mut editor, "a");
    assert_eq!(press(&mut editor, KeyCombo::shift(Key::Enter)), KeydownResult::Handled);
    assert_eq!(editor.to_markdown(), "a\\\nb");
}

#[test]
fn test_headings_hold_no_breaks() {
    let mut heading = editor("## ab");
    cursor_after(&mut heading, "a");
    assert_eq!(press(&mut heading, KeyCombo::shift(Key::Enter)), KeydownResult::NotHandled);
    assert_eq!(heading.to_markdown(), "## ab");

    let mut broken = editor("a\\\nb");
    cursor_after(&mut broken, "a");
    assert!(broken.invoke("heading", &attrs([("level", 2i64)])).unwrap());
    assert_eq!(broken.to_markdown(), "## a b");
}

#[test]
fn test_raw_newlines_only_go_into_code() {
    let mut text = editor("ab");
    cursor_after(&mut text, "a");
    assert!(!text.handle_text_input("\n").unwrap());
    assert_eq!(text.to_markdown(), "ab");

    let mut code = editor("```\nab\n```");
    cursor_after(&mut code, "a");
    assert!(code.handle_text_input("\n").unwrap());
    assert_eq!(code.to_markdown(), "```\na\nb\n```");
}

#[test]
fn test_enter_in_checkbox_list() {
    let mut editor = editor("- [x] done");
    cursor_after(&mut editor, "done");
    press(&mut editor, KeyCombo::new(Key::Enter));
    type_text(&mut editor, "next");
    assert_eq!(editor.to_markdown(), "- [x] done\n- [ ] next");
}

#[test]
fn test_unknown_command() {
    let mut editor = editor("x");
    let err = editor.invoke("table", &Attrs::new()).unwrap_err();
    assert!(matches!(err, EditorError::UnknownCommand(ref name) if name == "table"));
}

#[test]
fn test_editors_share_composition_but_not_plugins() {
    let mut a = editor("```python\nx = 1\n```");
    let b = editor("```python\nx = 1\n```");
    assert!(a.has_pending_tasks() && b.has_pending_tasks());
    assert_eq!(a.run_deferred(), 1);
    assert!(!a.decorations().is_empty());
    assert!(b.decorations().is_empty());
    assert!(b.has_pending_tasks());
}

#[test]
fn test_config_file_drives_composition() {
    let path = std::env::temp_dir().join(format!("quire-editing-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "extensions = [\"doc\", \"text\", \"paragraph\", \"strong\", \"history\", \"keys\"]\nhistory_depth = 1\n",
    )
    .unwrap();
    let config = EditorConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let composition = config.build_registry().unwrap();
    assert!(composition.schema.node_type("heading").is_none());
    let doc = composition.codec.parse("a b").unwrap();
    let mut editor = quire_editor::Editor::with_history_depth(composition, doc, config.history_depth);
    cursor_after(&mut editor, "a b");
    type_text(&mut editor, "c");
    type_text(&mut editor, "d");
    assert!(editor.invoke("undo", &Attrs::new()).unwrap());
    assert!(!editor.invoke("undo", &Attrs::new()).unwrap());
    assert_eq!(editor.to_markdown(), "a bc");
}

#[test]
fn test_missing_config_file() {
    let err = EditorConfig::load("/nonexistent/quire.toml").unwrap_err();
    assert!(matches!(err, quire_editor::ConfigurationError::Io { .. }));
}
