//! Built-in mark units. Each gets the default toggle command under its
//! own name.

use quire_markdown::serializer::{
    code_close, code_open, em_delim, link_close, link_open, strikethrough_delim, strong_delim,
};
use quire_markdown::{DelimiterSpec, MarkWriter, ParseSpec};
use quire_model::{AttrSpec, AttrValue, DomSpec, Mark, MarkSpec};
use smol_str::SmolStr;

use crate::extension::{Extension, MarkMarkdown, key};
use crate::input_rules::mark_rule;

fn markdown(token: &str, writer: MarkWriter, delimiters: Vec<DelimiterSpec>) -> MarkMarkdown {
    MarkMarkdown {
        token: SmolStr::new(token),
        spec: ParseSpec::mark(token),
        writer,
        delimiters,
    }
}

pub fn strong() -> Extension {
    Extension::mark("strong", MarkSpec::new().to_dom(|_| DomSpec::new("strong")))
        .with_mark_markdown(markdown(
            "strong",
            MarkWriter::symmetric(strong_delim),
            vec![DelimiterSpec::new('*', 2, "strong"), DelimiterSpec::new('_', 2, "strong")],
        ))
        .with_keys(|_| vec![key("Mod-b", "strong")])
        .with_input_rules(|ctx| {
            let Some(ty) = ctx.mark_type.clone() else {
                return Vec::new();
            };
            vec![
                mark_rule("strong_star", r"(?:^|\s)(\*\*([^*]+)\*\*)$", ty.clone()),
                mark_rule("strong_underscore", r"(?:^|\s)(__([^_]+)__)$", ty),
            ]
        })
}

pub fn em() -> Extension {
    Extension::mark("em", MarkSpec::new().to_dom(|_| DomSpec::new("em")))
        .with_mark_markdown(markdown(
            "em",
            MarkWriter::symmetric(em_delim),
            vec![DelimiterSpec::new('*', 1, "em"), DelimiterSpec::new('_', 1, "em")],
        ))
        .with_keys(|_| vec![key("Mod-i", "em")])
        .with_input_rules(|ctx| {
            let Some(ty) = ctx.mark_type.clone() else {
                return Vec::new();
            };
            vec![
                mark_rule("em_star", r"(?:^|[^*])(\*([^*\s][^*]*)\*)$", ty.clone()),
                mark_rule("em_underscore", r"(?:^|[^_\w])(_([^_\s][^_]*)_)$", ty),
            ]
        })
}

pub fn strikethrough() -> Extension {
    Extension::mark("strikethrough", MarkSpec::new().to_dom(|_| DomSpec::new("s")))
        .with_mark_markdown(markdown(
            "strikethrough",
            MarkWriter::symmetric(strikethrough_delim),
            vec![DelimiterSpec::new('~', 2, "strikethrough")],
        ))
        .with_keys(|_| vec![key("Mod-d", "strikethrough")])
        .with_input_rules(|ctx| match ctx.mark_type.clone() {
            Some(ty) => vec![mark_rule("strikethrough", r"(?:^|[^~])(~~([^~]+)~~)$", ty)],
            None => Vec::new(),
        })
}

pub fn code_inline() -> Extension {
    Extension::mark(
        "code_inline",
        MarkSpec::new().excludes("_").to_dom(|_| DomSpec::new("code")),
    )
    .with_mark_markdown(markdown(
        "code_inline",
        MarkWriter {
            open: code_open,
            close: code_close,
            escape: false,
        },
        Vec::new(),
    ))
    .with_keys(|_| vec![key("Mod-e", "code_inline")])
    .with_input_rules(|ctx| match ctx.mark_type.clone() {
        Some(ty) => vec![mark_rule("code_inline", r"(?:^|[^`])(`([^`]+)`)$", ty)],
        None => Vec::new(),
    })
}

fn link_dom(mark: &Mark) -> DomSpec {
    let mut dom = DomSpec::new("a");
    if let Some(href) = mark.attrs.get("href").and_then(AttrValue::as_str) {
        dom = dom.attr("href", href);
    }
    if let Some(title) = mark.attrs.get("title").and_then(AttrValue::as_str) {
        dom = dom.attr("title", title);
    }
    dom
}

/// Links have no keys or input rules; the `link` command takes `href`
/// (and optionally `title`) as attributes.
pub fn link() -> Extension {
    Extension::mark(
        "link",
        MarkSpec::new()
            .attr("href", AttrSpec::required())
            .attr("title", AttrSpec::with_default(AttrValue::Null))
            .inclusive(false)
            .to_dom(link_dom),
    )
    .with_mark_markdown(markdown(
        "link",
        MarkWriter {
            open: link_open,
            close: link_close,
            escape: true,
        },
        Vec::new(),
    ))
}
