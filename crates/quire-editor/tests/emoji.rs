mod common;

use common::*;
use quire_editor::EditorError;
use quire_model::{AttrValue, GrammarViolation, attrs};

fn names(editor: &quire_editor::Editor) -> Vec<String> {
    let block = editor.doc().child(0);
    (0..block.child_count())
        .map(|i| {
            let child = block.child(i);
            match child.attr("name").and_then(AttrValue::as_str) {
                Some(name) => format!("{}({name})", child.type_name()),
                None => child.type_name().to_owned(),
            }
        })
        .collect()
}

#[test]
fn test_shortcodes_parse_to_emoji_nodes() {
    let editor = editor("Hi :wave: there :+1:");
    assert_eq!(names(&editor), ["text", "emoji(wave)", "text", "emoji(+1)"]);
    assert_eq!(editor.to_markdown(), "Hi :wave: there :+1:");
}

#[test]
fn test_unknown_shortcodes_stay_text() {
    let editor = editor("a :notanemoji: b");
    assert_eq!(names(&editor), ["text"]);
    assert_eq!(editor.doc().text_content(), "a :notanemoji: b");
    assert_eq!(editor.to_markdown(), r"a \:notanemoji: b");
}

#[test]
fn test_text_next_to_emoji_keeps_its_colon() {
    let editor = editor(r"x\:b:tada:");
    assert_eq!(names(&editor), ["text", "emoji(tada)"]);
    assert_eq!(editor.doc().text_content(), "x:b");
    let md = editor.to_markdown();
    assert_eq!(md, r"x\:b:tada:");
    let again = quire_editor::Editor::from_markdown(COMPOSITION.clone(), &md).unwrap();
    assert_eq!(again.doc(), editor.doc());
}

#[test]
fn test_emoji_in_headings_and_marks() {
    let editor = editor("## Launch :rocket:\n\n**:fire: hot**");
    let heading = editor.doc().child(0);
    assert_eq!(heading.child(1).type_name(), "emoji");
    let fire = editor.doc().child(1).child(0);
    assert_eq!(fire.type_name(), "emoji");
    assert_eq!(fire.marks().len(), 1);
    assert_eq!(editor.to_markdown(), "## Launch :rocket:\n\n**:fire: hot**");
}

#[test]
fn test_shortcodes_in_code_are_literal() {
    let editor = editor("`:wave:`\n\n```\n:wave:\n```");
    assert_eq!(names(&editor), ["text"]);
    assert_eq!(editor.to_markdown(), "`:wave:`\n\n```\n:wave:\n```");
}

#[test]
fn test_typing_a_shortcode() {
    let mut editor = empty_editor();
    type_text(&mut editor, "ok :smile: and :nope: x");
    assert_eq!(names(&editor), ["text", "emoji(smile)", "text"]);
    assert_eq!(editor.doc().child(0).child(2).text_content(), " and :nope: x");
}

#[test]
fn test_emoji_command() {
    let mut editor = editor("ab");
    cursor_after(&mut editor, "a");
    assert!(editor.invoke("emoji", &attrs([("name", "sparkles")])).unwrap());
    assert_eq!(editor.to_markdown(), "a:sparkles:b");

    let err = editor.invoke("emoji", &attrs([("name", "no such")])).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Grammar(GrammarViolation::InvalidAttr { ref attr, .. }) if attr == "name"
    ));
}
