//! Small grammar and tree builders shared by the unit tests.

use std::sync::{Arc, LazyLock};

use crate::attrs::{AttrSpec, Attrs, attrs};
use crate::node::Node;
use crate::schema::{MarkAllowance, MarkSpec, NodeSpec, Schema};

pub static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    let nodes = vec![
        ("doc".into(), NodeSpec::new().content("block+")),
        ("paragraph".into(), NodeSpec::new().content("inline*").group("block")),
        (
            "heading".into(),
            NodeSpec::new()
                .content("inline*")
                .group("block")
                .attr("level", AttrSpec::with_default(1)),
        ),
        ("blockquote".into(), NodeSpec::new().content("block+").group("block")),
        (
            "bullet_list".into(),
            NodeSpec::new().content("list_item+").group("block list"),
        ),
        (
            "ordered_list".into(),
            NodeSpec::new()
                .content("list_item+")
                .group("block list")
                .attr("order", AttrSpec::with_default(1)),
        ),
        ("list_item".into(), NodeSpec::new().content("paragraph block*")),
        (
            "code_block".into(),
            NodeSpec::new()
                .content("text*")
                .group("block")
                .code()
                .marks(MarkAllowance::None)
                .attr("language", AttrSpec::with_default("none")),
        ),
        ("hr".into(), NodeSpec::new().group("block")),
        ("text".into(), NodeSpec::new().group("inline")),
        ("hard_break".into(), NodeSpec::new().group("inline").inline()),
    ];
    let marks = vec![
        ("strong".into(), MarkSpec::new()),
        ("em".into(), MarkSpec::new()),
        ("code".into(), MarkSpec::new().excludes("_")),
        (
            "link".into(),
            MarkSpec::new()
                .attr("href", AttrSpec::required())
                .inclusive(false),
        ),
    ];
    Arc::new(Schema::new(nodes, marks).expect("test schema compiles"))
});

pub fn schema() -> &'static Schema {
    &SCHEMA
}

pub fn node(name: &str, children: Vec<Node>) -> Node {
    node_with(name, Attrs::new(), children)
}

pub fn node_with(name: &str, a: Attrs, children: Vec<Node>) -> Node {
    let ty = schema().node_type(name).expect("known node type");
    ty.create_checked(&a, children, Vec::new()).expect("valid node")
}

pub fn text(s: &str) -> Node {
    schema().text(s, Vec::new()).expect("text")
}

pub fn marked(s: &str, marks: &[&str]) -> Node {
    let mut set = Vec::new();
    for name in marks {
        let mark = schema()
            .mark_type(name)
            .expect("known mark")
            .create(&Attrs::new())
            .expect("mark");
        set = mark.add_to_set(&set);
    }
    schema().text(s, set).expect("text")
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

pub fn h(level: i64, s: &str) -> Node {
    node_with("heading", attrs([("level", level)]), vec![text(s)])
}

pub fn li(children: Vec<Node>) -> Node {
    node("list_item", children)
}

pub fn ul(items: Vec<Node>) -> Node {
    node("bullet_list", items)
}

pub fn ol(items: Vec<Node>) -> Node {
    node("ordered_list", items)
}

pub fn bq(children: Vec<Node>) -> Node {
    node("blockquote", children)
}
