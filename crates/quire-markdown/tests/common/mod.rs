#![allow(dead_code)]

use std::sync::{Arc, LazyLock};

use quire_markdown::serializer::*;
use quire_markdown::*;
use quire_model::{
    AttrSpec, AttrValue, Attrs, MarkAllowance, MarkSpec, Node, NodeSpec, Schema, attrs,
};

pub static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    let nodes = vec![
        ("doc".into(), NodeSpec::new().content("block+")),
        ("paragraph".into(), NodeSpec::new().content("inline*").group("block")),
        (
            "heading".into(),
            NodeSpec::new()
                .content("phrase*")
                .group("block")
                .attr("level", AttrSpec::with_default(1)),
        ),
        ("blockquote".into(), NodeSpec::new().content("block+").group("block")),
        ("bullet_list".into(), NodeSpec::new().content("list_item+").group("block list")),
        (
            "ordered_list".into(),
            NodeSpec::new()
                .content("list_item+")
                .group("block list")
                .attr("order", AttrSpec::with_default(1).coerce(list_order)),
        ),
        ("list_item".into(), NodeSpec::new().content("paragraph block*")),
        (
            "checkbox_list".into(),
            NodeSpec::new().content("checkbox_item+").group("block list"),
        ),
        (
            "checkbox_item".into(),
            NodeSpec::new()
                .content("paragraph block*")
                .attr("checked", AttrSpec::with_default(false)),
        ),
        (
            "code_block".into(),
            NodeSpec::new()
                .content("text*")
                .group("block")
                .code()
                .marks(MarkAllowance::None)
                .attr("language", AttrSpec::with_default("none").coerce(fence_language)),
        ),
        (
            "hr".into(),
            NodeSpec::new().group("block").attr("markup", AttrSpec::with_default("---")),
        ),
        (
            "container_notice".into(),
            NodeSpec::new()
                .content("block+")
                .group("block")
                .attr("style", AttrSpec::with_default("info").coerce(notice_style)),
        ),
        ("text".into(), NodeSpec::new().group("inline phrase")),
        ("hard_break".into(), NodeSpec::new().group("inline").inline()),
    ];
    let marks = vec![
        ("strong".into(), MarkSpec::new()),
        ("em".into(), MarkSpec::new()),
        ("strikethrough".into(), MarkSpec::new()),
        ("code_inline".into(), MarkSpec::new().excludes("_")),
        (
            "link".into(),
            MarkSpec::new()
                .attr("href", AttrSpec::required())
                .attr("title", AttrSpec::with_default(AttrValue::Null))
                .inclusive(false),
        ),
    ];
    Arc::new(Schema::new(nodes, marks).expect("test schema compiles"))
});

pub fn codec_builder(schema: Arc<Schema>) -> MarkdownCodecBuilder {
    let mut b = MarkdownCodec::builder(schema);
    b.block_rule(Arc::new(HeadingRule))
        .block_rule(Arc::new(FenceRule))
        .block_rule(Arc::new(HrRule))
        .block_rule(Arc::new(NoticeRule::default()))
        .block_rule(Arc::new(BlockquoteRule))
        .block_rule(Arc::new(ListRule))
        .delimiter(DelimiterSpec::new('*', 2, "strong"))
        .delimiter(DelimiterSpec::new('_', 2, "strong"))
        .delimiter(DelimiterSpec::new('*', 1, "em"))
        .delimiter(DelimiterSpec::new('_', 1, "em"))
        .delimiter(DelimiterSpec::new('~', 2, "strikethrough"))
        .token("paragraph", ParseSpec::block("paragraph"))
        .token("heading", ParseSpec::block("heading").with_attrs(heading_attrs))
        .token("blockquote", ParseSpec::block("blockquote"))
        .token("bullet_list", ParseSpec::block("bullet_list"))
        .token("ordered_list", ParseSpec::block("ordered_list").with_attrs(ordered_list_attrs))
        .token("list_item", ParseSpec::block("list_item"))
        .token("checkbox_list", ParseSpec::block("checkbox_list"))
        .token("checkbox_item", ParseSpec::block("checkbox_item").with_attrs(checkbox_item_attrs))
        .token("fence", ParseSpec::code("code_block").with_attrs(fence_attrs))
        .token("hr", ParseSpec::leaf("hr").with_attrs(hr_attrs))
        .token("container_notice", ParseSpec::block("container_notice").with_attrs(notice_attrs))
        .token("hardbreak", ParseSpec::leaf("hard_break"))
        .token("strong", ParseSpec::mark("strong"))
        .token("em", ParseSpec::mark("em"))
        .token("strikethrough", ParseSpec::mark("strikethrough"))
        .token("code_inline", ParseSpec::mark("code_inline"))
        .token("link", ParseSpec::mark("link"))
        .node_writer("paragraph", write_paragraph)
        .node_writer("heading", write_heading)
        .node_writer("blockquote", write_blockquote)
        .node_writer("bullet_list", write_bullet_list)
        .node_writer("ordered_list", write_ordered_list)
        .node_writer("list_item", write_list_item)
        .node_writer("checkbox_list", write_bullet_list)
        .node_writer("checkbox_item", write_checkbox_item)
        .node_writer("code_block", write_code_block)
        .node_writer("hr", write_hr)
        .node_writer("container_notice", write_notice)
        .node_writer("hard_break", write_hard_break)
        .mark_writer("strong", MarkWriter::symmetric(strong_delim))
        .mark_writer("em", MarkWriter::symmetric(em_delim))
        .mark_writer("strikethrough", MarkWriter::symmetric(strikethrough_delim))
        .mark_writer(
            "code_inline",
            MarkWriter {
                open: code_open,
                close: code_close,
                escape: false,
            },
        )
        .mark_writer(
            "link",
            MarkWriter {
                open: link_open,
                close: link_close,
                escape: true,
            },
        );
    b
}

pub static CODEC: LazyLock<MarkdownCodec> =
    LazyLock::new(|| codec_builder(SCHEMA.clone()).build().expect("codec builds"));

pub fn schema() -> &'static Schema {
    &SCHEMA
}

pub fn node_with(name: &str, a: Attrs, children: Vec<Node>) -> Node {
    let ty = schema().node_type(name).expect("known node type");
    ty.create_checked(&a, children, Vec::new()).expect("valid node")
}

pub fn node(name: &str, children: Vec<Node>) -> Node {
    node_with(name, Attrs::new(), children)
}

pub fn text(s: &str) -> Node {
    schema().text(s, Vec::new()).expect("non-empty text")
}

pub fn marked(s: &str, marks: &[&str]) -> Node {
    let mut set = Vec::new();
    for name in marks {
        let mark = schema()
            .mark_type(name)
            .expect("known mark")
            .create(&Attrs::new())
            .expect("mark attrs");
        set = mark.add_to_set(&set);
    }
    schema().text(s, set).expect("non-empty text")
}

pub fn link(s: &str, href: &str, title: Option<&str>) -> Node {
    let mut a = attrs([("href", href)]);
    if let Some(title) = title {
        a.insert("title".into(), title.into());
    }
    let mark = schema()
        .mark_type("link")
        .expect("link mark")
        .create(&a)
        .expect("link attrs");
    schema().text(s, vec![mark]).expect("non-empty text")
}

pub fn doc(children: Vec<Node>) -> Node {
    node("doc", children)
}

pub fn p(s: &str) -> Node {
    if s.is_empty() {
        node("paragraph", vec![])
    } else {
        node("paragraph", vec![text(s)])
    }
}

pub fn para(children: Vec<Node>) -> Node {
    node("paragraph", children)
}

pub fn h(level: i64, s: &str) -> Node {
    node_with("heading", attrs([("level", level)]), vec![text(s)])
}

pub fn li(children: Vec<Node>) -> Node {
    node("list_item", children)
}

pub fn ul(items: Vec<Node>) -> Node {
    node("bullet_list", items)
}

pub fn ol(order: i64, items: Vec<Node>) -> Node {
    node_with("ordered_list", attrs([("order", order)]), items)
}

pub fn task(checked: bool, children: Vec<Node>) -> Node {
    node_with("checkbox_item", attrs([("checked", checked)]), children)
}

pub fn tasks(items: Vec<Node>) -> Node {
    node("checkbox_list", items)
}

pub fn bq(children: Vec<Node>) -> Node {
    node("blockquote", children)
}

pub fn code(language: &str, s: &str) -> Node {
    let children = if s.is_empty() { vec![] } else { vec![text(s)] };
    node_with("code_block", attrs([("language", language)]), children)
}

pub fn hr(markup: &str) -> Node {
    node_with("hr", attrs([("markup", markup)]), vec![])
}

pub fn notice(style: &str, children: Vec<Node>) -> Node {
    node_with("container_notice", attrs([("style", style)]), children)
}

pub fn br() -> Node {
    node("hard_break", vec![])
}

/// Serialize, parse back and compare.
pub fn assert_round_trip(tree: &Node) -> String {
    let md = CODEC.serialize(tree);
    let back = CODEC
        .parse(&md)
        .unwrap_or_else(|e| panic!("reparse failed: {e}\n---\n{md}"));
    assert_eq!(&back, tree, "round trip changed the tree\n---\n{md}");
    md
}
