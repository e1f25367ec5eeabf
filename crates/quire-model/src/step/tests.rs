use super::*;
use crate::attrs::attrs;
use crate::test_schema::*;

fn apply(step: &Step, d: &Node) -> Node {
    step.apply(d).unwrap().0
}

fn assert_inverts(step: Step, d: &Node) {
    let (after, _) = step.apply(d).unwrap();
    let inverse = step.invert(d).unwrap();
    assert_eq!(&apply(&inverse, &after), d, "inverse of {step:?}");
}

#[test]
fn test_replace_text_inside_paragraph() {
    let d = doc(vec![p("hello")]);
    let step = Step::Replace {
        from: 2,
        to: 4,
        content: text("EY").into(),
    };
    let (after, map) = step.apply(&d).unwrap();
    assert_eq!(after, doc(vec![p("hEYlo")]));
    assert_eq!(map.map(6, 1), 6);
    assert_inverts(step, &d);
}

#[test]
fn test_replace_across_parents_is_rejected() {
    let d = doc(vec![p("ab"), p("cd")]);
    let step = Step::Replace {
        from: 2,
        to: 6,
        content: Fragment::empty(),
    };
    assert!(matches!(step.apply(&d), Err(GrammarViolation::Structure(_))));
}

#[test]
fn test_replace_violating_grammar_is_rejected() {
    let d = doc(vec![p("ab")]);
    let step = Step::Replace {
        from: 0,
        to: 4,
        content: Fragment::empty(),
    };
    assert!(matches!(
        step.apply(&d),
        Err(GrammarViolation::InvalidContent { .. })
    ));
}

#[test]
fn test_set_node_markup_keeps_children() {
    let d = doc(vec![p("title")]);
    let heading = schema().node_type("heading").unwrap().clone();
    let step = Step::SetNodeMarkup {
        pos: 0,
        ty: heading,
        attrs: attrs([("level", 2)]),
    };
    assert_eq!(apply(&step, &d), doc(vec![h(2, "title")]));
    assert_inverts(step, &d);
}

#[test]
fn test_add_and_remove_mark() {
    let d = doc(vec![p("abcd")]);
    let strong = schema()
        .mark_type("strong")
        .unwrap()
        .create(&Attrs::new())
        .unwrap();
    let step = Step::AddMark {
        from: 2,
        to: 4,
        mark: strong,
    };
    let after = apply(&step, &d);
    assert_eq!(
        after,
        doc(vec![node(
            "paragraph",
            vec![text("a"), marked("bc", &["strong"]), text("d")]
        )])
    );
    assert_inverts(step, &d);
}

#[test]
fn test_split_and_join() {
    let d = doc(vec![p("abcd")]);
    let split = Step::Split {
        pos: 3,
        depth: 1,
        types_after: vec![],
    };
    let (after, map) = split.apply(&d).unwrap();
    assert_eq!(after, doc(vec![p("ab"), p("cd")]));
    assert_eq!(map.map(3, 1), 5);
    assert_eq!(map.map(3, -1), 3);

    let join = split.invert(&d).unwrap();
    assert_eq!(join, Step::Join { pos: 4, depth: 1 });
    assert_eq!(apply(&join, &after), d);
}

#[test]
fn test_split_with_type_after() {
    let d = doc(vec![h(1, "ab")]);
    let paragraph = schema().node_type("paragraph").unwrap().clone();
    let split = Step::Split {
        pos: 3,
        depth: 1,
        types_after: vec![Some(NodeShell::new(paragraph, Attrs::new()))],
    };
    assert_eq!(apply(&split, &d), doc(vec![h(1, "ab"), p("")]));
}

#[test]
fn test_join_restores_right_type_on_invert() {
    let d = doc(vec![p("ab"), h(1, "cd")]);
    let join = Step::Join { pos: 4, depth: 1 };
    assert_eq!(apply(&join, &d), doc(vec![p("abcd")]));
    assert_inverts(join, &d);
}

#[test]
fn test_deep_split_of_list_item() {
    let d = doc(vec![ul(vec![li(vec![p("ab")])])]);
    let split = Step::Split {
        pos: 4,
        depth: 2,
        types_after: vec![],
    };
    let after = apply(&split, &d);
    assert_eq!(
        after,
        doc(vec![ul(vec![li(vec![p("a")]), li(vec![p("b")])])])
    );
    assert_inverts(split, &d);
}

#[test]
fn test_wrap_each_node_in_item() {
    let d = doc(vec![p("a"), p("b")]);
    let list = schema().node_type("bullet_list").unwrap().clone();
    let item = schema().node_type("list_item").unwrap().clone();
    let step = Step::Wrap {
        from: 0,
        to: 6,
        wrapper: NodeShell::new(list, Attrs::new()),
        items: vec![
            (NodeShell::new(item.clone(), Attrs::new()), 1),
            (NodeShell::new(item, Attrs::new()), 1),
        ],
    };
    let (after, map) = step.apply(&d).unwrap();
    assert_eq!(
        after,
        doc(vec![ul(vec![li(vec![p("a")]), li(vec![p("b")])])])
    );
    // Inside the first paragraph, shifted by list and item open tokens.
    assert_eq!(map.map(1, 1), 3);
    // Inside the second paragraph.
    assert_eq!(map.map(4, 1), 8);
    assert_inverts(step, &d);
}

#[test]
fn test_wrap_in_blockquote_and_unwrap() {
    let d = doc(vec![p("a"), p("b")]);
    let quote = schema().node_type("blockquote").unwrap().clone();
    let step = Step::Wrap {
        from: 3,
        to: 6,
        wrapper: NodeShell::new(quote, Attrs::new()),
        items: vec![],
    };
    let after = apply(&step, &d);
    assert_eq!(after, doc(vec![p("a"), bq(vec![p("b")])]));
    let unwrap = Step::Unwrap { pos: 3, items: false };
    assert_eq!(apply(&unwrap, &after), d);
}

#[test]
fn test_unwrap_items_with_nested_content() {
    let d = doc(vec![ul(vec![
        li(vec![p("a"), p("a2")]),
        li(vec![p("b")]),
    ])]);
    let unwrap = Step::Unwrap { pos: 0, items: true };
    let (after, map) = unwrap.apply(&d).unwrap();
    assert_eq!(after, doc(vec![p("a"), p("a2"), p("b")]));
    // "b" moves left by the list, first item and the item boundary tokens.
    assert_eq!(map.map(13, 1), 9);
    assert_inverts(unwrap, &d);
}
