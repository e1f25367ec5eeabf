mod common;

use common::*;
use insta::assert_snapshot;

fn typed(text: &str) -> String {
    let mut editor = empty_editor();
    type_text(&mut editor, text);
    editor.to_markdown()
}

#[test]
fn test_block_shortcuts() {
    assert_eq!(typed("## Title"), "## Title");
    assert_eq!(typed("> quoted"), "> quoted");
    assert_eq!(typed("* item"), "- item");
    assert_eq!(typed("7. seventh"), "7. seventh");
    assert_eq!(typed("[ ] task"), "- [ ] task");
    assert_eq!(typed(" [] task"), "- [ ] task");
    assert_eq!(typed("```code"), "```\ncode\n```");
}

#[test]
fn test_hash_without_space_stays_text() {
    let mut editor = empty_editor();
    type_text(&mut editor, "#tag");
    assert_eq!(editor.doc().child(0).type_name(), "paragraph");
    assert_eq!(editor.doc().text_content(), "#tag");
}

#[test]
fn test_notice_shortcut() {
    assert_snapshot!(typed(":::careful"), @r"
    :::info
    careful
    :::
    ");
}

#[test]
fn test_horizontal_rules() {
    assert_eq!(typed("---after"), "---\n\nafter");
    assert_eq!(typed("*** after"), "***\n\nafter");
    assert_eq!(typed("___ after"), "___\n\nafter");
}

#[test]
fn test_ordered_list_continues_previous_list() {
    let mut editor = editor("1. a\n2. b");
    cursor_after(&mut editor, "b");
    editor.handle_key(&quire_editor::KeyCombo::new(quire_editor::Key::Enter)).unwrap();
    editor.handle_key(&quire_editor::KeyCombo::new(quire_editor::Key::Enter)).unwrap();
    type_text(&mut editor, "3. c");
    assert_snapshot!(editor.to_markdown(), @r"
    1. a
    2. b
    3. c
    ");
}

#[test]
fn test_ordered_list_with_other_number_starts_new_list() {
    let mut editor = editor("1. a");
    cursor_after(&mut editor, "a");
    editor.handle_key(&quire_editor::KeyCombo::new(quire_editor::Key::Enter)).unwrap();
    editor.handle_key(&quire_editor::KeyCombo::new(quire_editor::Key::Enter)).unwrap();
    type_text(&mut editor, "5. e");
    assert_eq!(editor.doc().child_count(), 2);
    assert_eq!(editor.to_markdown(), "1. a\n\n\n5. e");
}

#[test]
fn test_inline_mark_shortcuts() {
    assert_eq!(typed("a **bold** b"), "a **bold** b");
    assert_eq!(typed("a __bold__ b"), "a **bold** b");
    assert_eq!(typed("say *it* now"), "say _it_ now");
    assert_eq!(typed("say _it_ now"), "say _it_ now");
    assert_eq!(typed("~~gone~~ x"), "~~gone~~ x");
    assert_eq!(typed("run `ls` now"), "run `ls` now");
}

#[test]
fn test_mark_shortcut_stops_mark_after_delimiter() {
    let mut editor = empty_editor();
    type_text(&mut editor, "**b**c");
    let paragraph = editor.doc().child(0);
    assert_eq!(paragraph.child_count(), 2);
    assert!(paragraph.child(1).marks().is_empty());
}

#[test]
fn test_snake_case_is_not_emphasis() {
    let mut editor = empty_editor();
    type_text(&mut editor, "snake_case_name");
    assert_eq!(editor.doc().text_content(), "snake_case_name");
}

#[test]
fn test_rules_do_not_fire_in_code() {
    let mut editor = editor("```\nz\n```");
    cursor_before(&mut editor, "z");
    type_text(&mut editor, "# **x** ");
    assert_eq!(editor.doc().child(0).type_name(), "code_block");
    assert_eq!(editor.doc().text_content(), "# **x** z");
}

#[test]
fn test_date_shortcut() {
    let mut editor = empty_editor();
    type_text(&mut editor, "on /date ");
    let text = editor.doc().text_content();
    assert!(text.starts_with("on "));
    assert!(!text.contains("/date"));
    assert!(text.contains(", 20"));
    assert!(text.ends_with(' '));
}

#[test]
fn test_undo_reverts_rule() {
    let mut editor = empty_editor();
    type_text(&mut editor, "# ");
    assert_eq!(editor.doc().child(0).type_name(), "heading");
    editor.invoke("undo", &quire_model::Attrs::new()).unwrap();
    assert_eq!(editor.doc().child(0).type_name(), "paragraph");
    assert_eq!(editor.doc().text_content(), "#");
}
