//! The built-in capability units.
//!
//! Order matters: nodes first, so their key bindings take precedence over
//! the base keymap, then marks, then behaviors.

pub mod behaviors;
pub mod marks;
pub mod nodes;

use crate::extension::Extension;
use crate::highlight::HighlightOptions;

/// Names of the built-in units, in canonical order.
pub const NAMES: &[&str] = &[
    "doc",
    "text",
    "paragraph",
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
    "emoji",
    "strong",
    "em",
    "strikethrough",
    "code_inline",
    "link",
    "history",
    "keys",
    "date_time",
    "highlight",
];

/// The built-in unit called `name`.
pub fn by_name(name: &str, highlight: &HighlightOptions) -> Option<Extension> {
    Some(match name {
        "doc" => nodes::doc(),
        "text" => nodes::text(),
        "paragraph" => nodes::paragraph(),
        "heading" => nodes::heading(),
        "blockquote" => nodes::blockquote(),
        "bullet_list" => nodes::bullet_list(),
        "ordered_list" => nodes::ordered_list(),
        "list_item" => nodes::list_item(),
        "checkbox_list" => nodes::checkbox_list(),
        "checkbox_item" => nodes::checkbox_item(),
        "code_block" => nodes::code_block(),
        "hr" => nodes::hr(),
        "container_notice" => nodes::container_notice(),
        "hard_break" => nodes::hard_break(),
        "emoji" => nodes::emoji(),
        "strong" => marks::strong(),
        "em" => marks::em(),
        "strikethrough" => marks::strikethrough(),
        "code_inline" => marks::code_inline(),
        "link" => marks::link(),
        "history" => behaviors::history(),
        "keys" => behaviors::keys(),
        "date_time" => behaviors::date_time(),
        "highlight" => behaviors::highlight(highlight.clone()),
        _ => return None,
    })
}

/// Every built-in unit with default options.
pub fn all() -> Vec<Extension> {
    let highlight = HighlightOptions::default();
    NAMES.iter().filter_map(|name| by_name(name, &highlight)).collect()
}
