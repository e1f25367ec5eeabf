mod common;

use std::sync::Arc;

use common::*;
use miette::Diagnostic;
use quire_markdown::serializer::write_paragraph;
use quire_markdown::{CodecError, MAX_LIST_ORDER, MarkdownCodec, ParseSpec};
use quire_model::{GrammarViolation, NodeSpec, Schema, attrs};

#[test]
fn test_parse_blocks() {
    let tree = CODEC
        .parse("## Two\n\n> quote\n\n```js\nlet a;\n```\n\n- [ ] task")
        .unwrap();
    assert_eq!(
        tree,
        doc(vec![
            h(2, "Two"),
            bq(vec![p("quote")]),
            code("js", "let a;"),
            tasks(vec![task(false, vec![p("task")])]),
        ])
    );
}

#[test]
fn test_escape_round_trip() {
    for s in ["a*b", "_x_", "`tick`", r"back\slash", r"\*", "# hash", "1. one", "- dash"] {
        let tree = doc(vec![p(s)]);
        let md = assert_round_trip(&tree);
        assert_ne!(md, s, "{s:?} should have been escaped");
    }
}

#[test]
fn test_escaped_text_stays_literal() {
    let tree = CODEC.parse(r"\*not em\* and \_neither\_").unwrap();
    assert_eq!(tree, doc(vec![p("*not em* and _neither_")]));
}

#[test]
fn test_soft_line_break_becomes_hard_break() {
    let tree = CODEC.parse("one\ntwo").unwrap();
    assert_eq!(tree, doc(vec![para(vec![text("one"), br(), text("two")])]));
}

#[test]
fn test_link_mark_ends_at_its_close_token() {
    let tree = CODEC.parse("see [**the** docs](https://x.test \"T\") now").unwrap();
    let mut the = link("the", "https://x.test", Some("T"));
    let strong = schema()
        .mark_type("strong")
        .unwrap()
        .create(&Default::default())
        .unwrap();
    the = the.mark(strong.add_to_set(the.marks()));
    assert_eq!(
        tree,
        doc(vec![para(vec![
            text("see "),
            the,
            link(" docs", "https://x.test", Some("T")),
            text(" now"),
        ])])
    );
}

#[test]
fn test_marks_inside_code_block_text_are_not_parsed() {
    let tree = CODEC.parse("```\n**not bold**\n```").unwrap();
    assert_eq!(tree, doc(vec![code("none", "**not bold**")]));
}

#[test]
fn test_unterminated_fence_is_an_error() {
    let err = CODEC.parse("intro\n\n```rust\nfn x() {}").unwrap_err();
    assert_eq!(err.line, 3);
    assert!(err.message.contains("unterminated code fence"));
}

#[test]
fn test_unterminated_notice_is_an_error() {
    let err = CODEC.parse(":::warning\ncareful").unwrap_err();
    assert_eq!(err.line, 1);
}

#[test]
fn test_error_carries_source_for_diagnostics() {
    let err = CODEC.parse_named("note.md", "a\n\n```\nb").unwrap_err();
    assert!(err.source_code().is_some());
    let labels: Vec<_> = err.labels().expect("labelled").collect();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].offset(), 3);
    assert_eq!(labels[0].len(), 3);
}

#[test]
fn test_unknown_tokens_fall_back_to_text() {
    let mut builder = codec_builder(SCHEMA.clone());
    let plain = {
        // A codec without notice or fence mappings, but with their rules.
        let mut b = MarkdownCodec::builder(SCHEMA.clone());
        b.block_rule(Arc::new(quire_markdown::NoticeRule::default()))
            .block_rule(Arc::new(quire_markdown::FenceRule))
            .token("paragraph", ParseSpec::block("paragraph"))
            .token("hardbreak", ParseSpec::leaf("hard_break"));
        for name in [
            "heading",
            "blockquote",
            "bullet_list",
            "ordered_list",
            "list_item",
            "checkbox_list",
            "checkbox_item",
            "code_block",
            "hr",
            "container_notice",
            "hard_break",
        ] {
            b.node_writer(name, write_paragraph);
        }
        b.node_writer("paragraph", write_paragraph);
        b.build().unwrap()
    };
    let tree = plain.parse(":::tip\ninside\n:::\n\n```\ncode\n```").unwrap();
    assert_eq!(tree, doc(vec![p("inside"), p("code")]));
    // Multi-line content outside code reads as one line.
    assert_eq!(plain.parse("```\none\ntwo\n```").unwrap(), doc(vec![p("one two")]));
    // The full codec still maps the same input to dedicated nodes.
    let full = builder.build().unwrap();
    assert_eq!(
        full.parse(":::tip\ninside\n:::").unwrap(),
        doc(vec![notice("tip", vec![p("inside")])])
    );
}

#[test]
fn test_content_that_does_not_fit_is_an_error() {
    let nodes = vec![
        ("doc".into(), NodeSpec::new().content("block+")),
        ("paragraph".into(), NodeSpec::new().content("inline*").group("block")),
        ("blockquote".into(), NodeSpec::new().content("paragraph").group("block")),
        ("text".into(), NodeSpec::new().group("inline")),
    ];
    let schema = Arc::new(Schema::new(nodes, vec![]).unwrap());
    let mut b = MarkdownCodec::builder(schema);
    b.block_rule(Arc::new(quire_markdown::BlockquoteRule))
        .token("paragraph", ParseSpec::block("paragraph"))
        .token("blockquote", ParseSpec::block("blockquote"))
        .node_writer("paragraph", write_paragraph)
        .node_writer("blockquote", write_paragraph);
    let codec = b.build().unwrap();
    assert!(codec.parse("> one").is_ok());
    let err = codec.parse("x\n\n> one\n>\n> two").unwrap_err();
    assert_eq!(err.line, 3);
}

#[test]
fn test_builder_rejects_unknown_names() {
    let mut b = codec_builder(SCHEMA.clone());
    b.token("footnote", ParseSpec::block("footnote"));
    assert_eq!(
        b.build().unwrap_err(),
        CodecError::UnknownNodeType {
            token: "footnote".into(),
            node: "footnote".into(),
        }
    );

    let mut b = MarkdownCodec::builder(SCHEMA.clone());
    b.node_writer("paragraph", write_paragraph);
    assert!(matches!(b.build(), Err(CodecError::MissingWriter(_))));
}

#[test]
fn test_notice_styles_are_restricted() {
    let ty = schema().node_type("container_notice").unwrap();
    let err = ty
        .create_checked(&attrs([("style", "my style")]), vec![p("x")], Vec::new())
        .unwrap_err();
    assert!(matches!(err, GrammarViolation::InvalidAttr { ref attr, .. } if attr == "style"));
    assert_eq!(
        err.code().map(|c| c.to_string()).as_deref(),
        Some("quire::grammar::invalid_attr")
    );

    // Unknown openers still read as a notice.
    let tree = CODEC.parse(":::danger\ncareful\n:::").unwrap();
    assert_eq!(tree, doc(vec![notice("info", vec![p("careful")])]));
    assert_round_trip(&tree);
}

#[test]
fn test_list_order_bounds() {
    let ty = schema().node_type("ordered_list").unwrap();
    let item = || li(vec![p("x")]);
    for order in [-3, MAX_LIST_ORDER + 1, i64::MAX] {
        let err = ty
            .create_checked(&attrs([("order", order)]), vec![item()], Vec::new())
            .unwrap_err();
        assert!(matches!(err, GrammarViolation::InvalidAttr { .. }), "{order}");
    }
    let md = assert_round_trip(&doc(vec![ol(MAX_LIST_ORDER, vec![item()])]));
    assert_eq!(md, "999999999. x");
    assert_round_trip(&doc(vec![ol(0, vec![item(), item()])]));
}

#[test]
fn test_blank_code_language_is_none() {
    assert_eq!(code("", "x"), code("none", "x"));
    assert_eq!(code(" rust ", "x"), code("rust", "x"));
    let ty = schema().node_type("code_block").unwrap();
    let err = ty
        .create_checked(&attrs([("language", "a`b")]), vec![], Vec::new())
        .unwrap_err();
    assert!(matches!(err, GrammarViolation::InvalidAttr { .. }));
    assert_round_trip(&doc(vec![code("", "x")]));
}
