use super::*;
use crate::test_schema::*;

fn mark(name: &str) -> Mark {
    schema()
        .mark_type(name)
        .unwrap()
        .create(&Attrs::new())
        .unwrap()
}

fn undo(tr: &Transaction) -> Node {
    let mut doc = tr.doc().clone();
    for step in tr.inverted_steps().unwrap() {
        doc = step.apply(&doc).unwrap().0;
    }
    doc
}

#[test]
fn test_insert_text_inherits_marks() {
    let d = doc(vec![node(
        "paragraph",
        vec![text("a"), marked("b", &["strong"])],
    )]);
    let mut tr = Transaction::new(&d, Selection::cursor(3));
    tr.insert_text(schema(), "c", 3, 3).unwrap();
    assert_eq!(
        tr.doc(),
        &doc(vec![node(
            "paragraph",
            vec![text("a"), marked("bc", &["strong"])]
        )])
    );
    assert_eq!(tr.selection(), Selection::cursor(4));
}

#[test]
fn test_stored_marks_override_position_marks() {
    let d = doc(vec![node(
        "paragraph",
        vec![text("a"), marked("b", &["strong"])],
    )]);
    let mut tr = Transaction::new(&d, Selection::cursor(3));
    tr.set_stored_marks(Some(Vec::new()));
    tr.insert_text(schema(), "c", 3, 3).unwrap();
    assert_eq!(
        tr.doc(),
        &doc(vec![node(
            "paragraph",
            vec![text("a"), marked("b", &["strong"]), text("c")]
        )])
    );
    assert!(tr.stored_marks_set());
}

#[test]
fn test_selection_follows_insertions_before_it() {
    let d = doc(vec![p("abcd")]);
    let mut tr = Transaction::new(&d, Selection::new(2, 4));
    tr.insert(1, text("X")).unwrap();
    assert_eq!(tr.selection(), Selection::new(3, 5));
    assert!(!tr.selection_set());
}

#[test]
fn test_failed_step_leaves_transaction_untouched() {
    let d = doc(vec![p("ab")]);
    let mut tr = Transaction::new(&d, Selection::cursor(1));
    assert!(tr.delete(0, 4).is_err());
    assert_eq!(tr.doc(), &d);
    assert!(!tr.doc_changed());
    assert!(tr.mapping().is_empty());
}

#[test]
fn test_empty_replace_adds_no_step() {
    let d = doc(vec![p("ab")]);
    let mut tr = Transaction::new(&d, Selection::cursor(1));
    tr.replace(2, 2, Fragment::empty()).unwrap();
    assert!(!tr.doc_changed());
}

#[test]
fn test_add_mark_drops_excluded_marks_and_undoes() {
    let d = doc(vec![node(
        "paragraph",
        vec![text("a"), marked("bc", &["strong"]), text("d")],
    )]);
    let mut tr = Transaction::new(&d, Selection::new(1, 5));
    tr.add_mark(1, 5, &mark("code")).unwrap();
    assert_eq!(
        tr.doc(),
        &doc(vec![node("paragraph", vec![marked("abcd", &["code"])])])
    );
    assert_eq!(tr.steps().len(), 2);
    assert_eq!(undo(&tr), d);
}

#[test]
fn test_add_mark_skips_runs_that_have_it() {
    let d = doc(vec![node(
        "paragraph",
        vec![text("a"), marked("b", &["em"]), text("c")],
    )]);
    let mut tr = Transaction::new(&d, Selection::new(1, 4));
    tr.add_mark(1, 4, &mark("em")).unwrap();
    assert_eq!(tr.steps().len(), 2);
    assert_eq!(
        tr.doc(),
        &doc(vec![node("paragraph", vec![marked("abc", &["em"])])])
    );
    assert_eq!(undo(&tr), d);
}

#[test]
fn test_remove_mark_from_middle() {
    let d = doc(vec![node("paragraph", vec![marked("abcd", &["strong"])])]);
    let strong = schema().mark_type("strong").unwrap().clone();
    let mut tr = Transaction::new(&d, Selection::cursor(1));
    tr.remove_mark(2, 4, &strong).unwrap();
    assert_eq!(
        tr.doc(),
        &doc(vec![node(
            "paragraph",
            vec![marked("a", &["strong"]), text("bc"), marked("d", &["strong"])]
        )])
    );
}

#[test]
fn test_marks_skip_code_blocks() {
    let d = doc(vec![p("ab"), node("code_block", vec![text("cd")])]);
    let mut tr = Transaction::new(&d, Selection::new(0, 8));
    tr.add_mark(0, 8, &mark("strong")).unwrap();
    assert_eq!(
        tr.doc(),
        &doc(vec![
            node("paragraph", vec![marked("ab", &["strong"])]),
            node("code_block", vec![text("cd")]),
        ])
    );
}

#[test]
fn test_mapping_composes_steps() {
    let d = doc(vec![p("abcd")]);
    let mut tr = Transaction::new(&d, Selection::cursor(4));
    tr.split(3, 1, Vec::new()).unwrap();
    tr.insert_text(schema(), "Z", 1, 1).unwrap();
    assert_eq!(tr.doc(), &doc(vec![p("Zab"), p("cd")]));
    assert_eq!(tr.docs().len(), 2);
    assert_eq!(tr.docs()[0], d);
    assert_eq!(tr.mapping().map(4, 1), 7);
    assert_eq!(tr.selection(), Selection::cursor(7));
    assert_eq!(undo(&tr), d);
}

#[test]
fn test_set_selection_is_clamped() {
    let d = doc(vec![p("ab")]);
    let mut tr = Transaction::new(&d, Selection::cursor(1));
    tr.set_selection(Selection::new(1, 99)).set_meta("origin", "test");
    assert_eq!(tr.selection(), Selection::new(1, 4));
    assert!(tr.selection_set());
    assert_eq!(tr.meta("origin").and_then(AttrValue::as_str), Some("test"));
}

#[test]
fn test_wrap_and_unwrap_round_trip_through_history() {
    let d = doc(vec![p("a"), p("b")]);
    let list = schema().node_type("ordered_list").unwrap().clone();
    let item = schema().node_type("list_item").unwrap().clone();
    let mut tr = Transaction::new(&d, Selection::cursor(1));
    tr.wrap(
        0,
        6,
        NodeShell::new(list, crate::attrs::attrs([("order", 3)])),
        vec![(NodeShell::new(item, Attrs::new()), 2)],
    )
    .unwrap();
    assert_eq!(tr.doc().to_string(), r#"doc(ordered_list(list_item(paragraph("a"), paragraph("b"))))"#);
    assert_eq!(tr.selection(), Selection::cursor(3));
    assert_eq!(undo(&tr), d);
}
