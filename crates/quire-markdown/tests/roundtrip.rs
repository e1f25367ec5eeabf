mod common;

use common::*;

fn sample_doc() -> quire_model::Node {
    doc(vec![
        h(1, "Title"),
        para(vec![
            text("Some "),
            marked("bold", &["strong"]),
            text(" and "),
            marked("it", &["em"]),
            text(" text"),
        ]),
        ul(vec![
            li(vec![p("one")]),
            li(vec![p("two"), ul(vec![li(vec![p("nested")])])]),
        ]),
        ol(3, vec![li(vec![p("a")]), li(vec![p("b")])]),
        code("rust", "fn main() {}\n"),
        bq(vec![p("quoted")]),
        hr("***"),
        notice("warning", vec![p("careful")]),
        tasks(vec![task(true, vec![p("done")]), task(false, vec![p("todo")])]),
    ])
}

#[test]
fn test_serialize_canonical_form() {
    let md = CODEC.serialize(&sample_doc());
    insta::assert_snapshot!(md, @r#"
# Title

Some **bold** and _it_ text

- one
- two
  - nested

3. a
4. b

```rust
fn main() {}

```

> quoted

***

:::warning
careful
:::

- [x] done
- [ ] todo
"#);
}

#[test]
fn test_round_trip_sample() {
    assert_round_trip(&sample_doc());
}

#[test]
fn test_canonical_form_is_idempotent() {
    let inputs = [
        "#  Spaced   heading  \ntext\n\n\n\n* star\n* list\n\n1) one\n2) two",
        "> a\n> b\n\n---\n___",
        "- [X] upper\n- [ ] lower\n\n:::\nplain notice\n:::",
        "Text with *stars* and __double__ ~~gone~~ `code`",
    ];
    for input in inputs {
        let once = CODEC.serialize(&CODEC.parse(input).unwrap());
        let twice = CODEC.serialize(&CODEC.parse(&once).unwrap());
        assert_eq!(once, twice, "input: {input:?}");
    }
}

#[test]
fn test_hr_marker_is_preserved() {
    for markup in ["---", "***", "___"] {
        let md = assert_round_trip(&doc(vec![p("a"), hr(markup), p("b")]));
        assert_eq!(md, format!("a\n\n{markup}\n\nb"));
    }
}

#[test]
fn test_empty_paragraph_round_trip() {
    let md = assert_round_trip(&doc(vec![p(""), p("x"), p("")]));
    assert_eq!(md, "\\\n\nx\n\n\\");
}

#[test]
fn test_hard_break_round_trip() {
    let tree = doc(vec![para(vec![text("a"), br(), text("b")])]);
    let md = assert_round_trip(&tree);
    assert_eq!(md, "a\\\nb");
}

#[test]
fn test_trailing_hard_break_is_dropped() {
    let tree = doc(vec![para(vec![text("a"), br()])]);
    assert_eq!(CODEC.serialize(&tree), "a");
}

#[test]
fn test_nested_marks_round_trip() {
    let tree = doc(vec![para(vec![
        marked("a", &["strong"]),
        marked("b", &["strong", "em"]),
        marked("c", &["em"]),
        text(" "),
        marked("d", &["strikethrough"]),
    ])]);
    let md = assert_round_trip(&tree);
    assert_eq!(md, "**a_b_**_c_ ~~d~~");
}

#[test]
fn test_inline_code_backticks() {
    let tree = doc(vec![para(vec![
        marked("a`b", &["code_inline"]),
        text(" "),
        marked(" x ", &["code_inline"]),
        text(" "),
        marked("*raw*", &["code_inline"]),
    ])]);
    let md = assert_round_trip(&tree);
    assert_eq!(md, "`` a`b `` `  x  ` `*raw*`");
}

#[test]
fn test_code_fence_outgrows_content() {
    let tree = doc(vec![code("none", "```\ninner\n```")]);
    let md = assert_round_trip(&tree);
    assert_eq!(md, "````\n```\ninner\n```\n````");
}

#[test]
fn test_empty_code_block_round_trip() {
    let md = assert_round_trip(&doc(vec![code("python", "")]));
    assert_eq!(md, "```python\n```");
}

#[test]
fn test_links_round_trip() {
    let tree = doc(vec![para(vec![
        text("see "),
        link("docs", "https://x.test/a_(b)", None),
        text(" or "),
        link("this", "has space", Some(r#"a "title""#)),
    ])]);
    let md = assert_round_trip(&tree);
    assert_eq!(
        md,
        r#"see [docs](https://x.test/a_\(b\)) or [this](<has space> "a \"title\"")"#
    );
}

#[test]
fn test_adjacent_lists_of_same_type() {
    let tree = doc(vec![
        ul(vec![li(vec![p("a")])]),
        ul(vec![li(vec![p("b")])]),
    ]);
    let md = assert_round_trip(&tree);
    assert_eq!(md, "- a\n\n\n- b");
}

#[test]
fn test_list_item_with_several_blocks() {
    let tree = doc(vec![ol(
        9,
        vec![
            li(vec![p("nine"), p("more")]),
            li(vec![p("ten"), code("none", "x")]),
        ],
    )]);
    let md = assert_round_trip(&tree);
    insta::assert_snapshot!(md, @r"
9.  nine

    more
10. ten

    ```
    x
    ```
");
}

#[test]
fn test_quote_containing_list_and_notice() {
    let tree = doc(vec![bq(vec![
        p("intro"),
        ul(vec![li(vec![p("x")])]),
        notice("tip", vec![p("inside")]),
    ])]);
    let md = assert_round_trip(&tree);
    assert_eq!(md, "> intro\n>\n> - x\n>\n> :::tip\n> inside\n> :::");
}

#[test]
fn test_heading_stays_on_one_line() {
    let heading = schema().node_type("heading").unwrap();
    let broken = heading.create_checked(
        &quire_model::attrs([("level", 2i64)]),
        vec![text("a"), br(), text("b")],
        Vec::new(),
    );
    assert!(broken.is_err());

    let tree = doc(vec![node_with(
        "heading",
        quire_model::attrs([("level", 2i64)]),
        vec![text("a "), marked("b", &["em"])],
    )]);
    assert_eq!(assert_round_trip(&tree), "## a _b_");
}
