//! Built-in node units.

use std::sync::Arc;

use quire_markdown::serializer::{
    MarkdownWriter, write_blockquote, write_bullet_list, write_checkbox_item, write_code_block, write_hard_break,
    write_heading, write_hr, write_list_item, write_notice, write_ordered_list, write_paragraph,
};
use quire_markdown::{
    BlockquoteRule, FenceRule, HeadingRule, HrRule, InlineRule, ListRule, NoticeRule, ParseSpec, Token,
    checkbox_item_attrs, fence_attrs, fence_language, heading_attrs, hr_attrs, list_order,
    notice_attrs, notice_style, ordered_list_attrs,
};
use quire_model::{
    AttrSpec, AttrValue, Attrs, DomSpec, Fragment, MarkAllowance, Node, NodeSpec, NodeType,
    Selection, attrs,
};
use smol_str::SmolStr;

use crate::commands::{
    self, CommandResult, attempt, find_ancestor, insert_node, lift_list_item, set_block_type,
    sink_list_item, split_list_item, toggle_block_type, toggle_list, toggle_wrap,
};
use crate::extension::{CommandFn, Extension, NodeMarkdown, UnitContext, command, key};
use crate::input_rules::{InputMatch, InputRuleSpec, textblock_type_rule, wrapping_rule};
use crate::state::EditorState;

pub fn doc() -> Extension {
    Extension::node("doc", NodeSpec::new().content("block+"))
}

/// `phrase` is inline content that fits on one line.
pub fn text() -> Extension {
    Extension::node("text", NodeSpec::new().group("inline phrase"))
}

fn node_type(ctx: &UnitContext, name: &str) -> Option<Arc<NodeType>> {
    ctx.schema.node_type(name).cloned()
}

fn paragraph_dom(_: &Node) -> DomSpec {
    DomSpec::new("p")
}

pub fn paragraph() -> Extension {
    Extension::node(
        "paragraph",
        NodeSpec::new().content("inline*").group("block").to_dom(paragraph_dom),
    )
    .with_node_markdown(NodeMarkdown::new(write_paragraph).token("paragraph", ParseSpec::block("paragraph")))
    .with_keys(|_| vec![key("Shift-Ctrl-0", "paragraph")])
    .with_commands(|ctx| {
        let Some(ty) = ctx.node_type.clone() else {
            return Vec::new();
        };
        vec![(
            SmolStr::new("paragraph"),
            command(move |state, attrs| set_block_type(state, &ty, attrs)),
        )]
    })
}

fn heading_dom(node: &Node) -> DomSpec {
    let level = node.attr("level").and_then(AttrValue::as_int).unwrap_or(1).clamp(1, 6);
    DomSpec::new(format!("h{level}"))
}

fn heading_match_attrs(m: &InputMatch<'_>) -> Attrs {
    attrs([("level", m.group(1).map_or(1, |hashes| hashes.len() as i64))])
}

pub fn heading() -> Extension {
    Extension::node(
        "heading",
        NodeSpec::new()
            .content("phrase*")
            .group("block")
            .defining()
            .attr("level", AttrSpec::with_default(1))
            .to_dom(heading_dom),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_heading)
            .token("heading", ParseSpec::block("heading").with_attrs(heading_attrs))
            .block_rule(Arc::new(HeadingRule)),
    )
    .with_keys(|_| {
        (1..=6i64)
            .map(|level| key(&format!("Shift-Ctrl-{level}"), "heading").with_attrs(attrs([("level", level)])))
            .collect()
    })
    .with_input_rules(|ctx| {
        let Some(ty) = ctx.node_type.clone() else {
            return Vec::new();
        };
        vec![textblock_type_rule("heading", r"^(#{1,6})\s$", ty, heading_match_attrs)]
    })
    .with_commands(|ctx| {
        let (Some(ty), Some(paragraph)) = (ctx.node_type.clone(), node_type(ctx, "paragraph")) else {
            return Vec::new();
        };
        vec![(
            SmolStr::new("heading"),
            command(move |state, attrs| toggle_block_type(state, &ty, &paragraph, attrs)),
        )]
    })
}

/// A command wrapping the selection in the unit's own type.
fn toggle_wrap_command(ctx: &UnitContext, name: &str) -> Vec<(SmolStr, CommandFn)> {
    let Some(ty) = ctx.node_type.clone() else {
        return Vec::new();
    };
    vec![(SmolStr::new(name), command(move |state, attrs| toggle_wrap(state, &ty, attrs)))]
}

pub fn blockquote() -> Extension {
    Extension::node(
        "blockquote",
        NodeSpec::new()
            .content("block+")
            .group("block")
            .defining()
            .to_dom(|_| DomSpec::new("blockquote")),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_blockquote)
            .token("blockquote", ParseSpec::block("blockquote"))
            .block_rule(Arc::new(BlockquoteRule)),
    )
    .with_keys(|_| vec![key("Ctrl->", "blockquote")])
    .with_input_rules(|ctx| {
        let Some(ty) = ctx.node_type.clone() else {
            return Vec::new();
        };
        vec![wrapping_rule("blockquote", r"^\s*>\s$", ty, None, |_| Attrs::new(), None)]
    })
    .with_commands(|ctx| toggle_wrap_command(ctx, "blockquote"))
}

/// Toggle command for a list type holding `item` nodes.
fn list_command(ctx: &UnitContext, name: &str, item: &str) -> Vec<(SmolStr, CommandFn)> {
    let (Some(list), Some(item)) = (ctx.node_type.clone(), node_type(ctx, item)) else {
        return Vec::new();
    };
    vec![(
        SmolStr::new(name),
        command(move |state, attrs| toggle_list(state, &list, &item, attrs)),
    )]
}

pub fn bullet_list() -> Extension {
    Extension::node(
        "bullet_list",
        NodeSpec::new()
            .content("list_item+")
            .group("block list")
            .to_dom(|_| DomSpec::new("ul")),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_bullet_list)
            .token("bullet_list", ParseSpec::block("bullet_list"))
            .block_rule(Arc::new(ListRule)),
    )
    .with_keys(|_| vec![key("Shift-Ctrl-8", "bullet_list")])
    .with_input_rules(|ctx| {
        let (Some(ty), Some(item)) = (ctx.node_type.clone(), node_type(ctx, "list_item")) else {
            return Vec::new();
        };
        vec![wrapping_rule(
            "bullet_list",
            r"^\s*([-+*])\s$",
            ty,
            Some(item),
            |_| Attrs::new(),
            None,
        )]
    })
    .with_commands(|ctx| list_command(ctx, "bullet_list", "list_item"))
}

fn ordered_match_attrs(m: &InputMatch<'_>) -> Attrs {
    let order = m.group(1).and_then(|n| n.parse::<i64>().ok()).unwrap_or(1);
    attrs([("order", order)])
}

/// Typing `3. ` right after a list of two items starting at 1 continues it.
fn continues_list(m: &InputMatch<'_>, list: &Node) -> bool {
    let order = list.attr("order").and_then(AttrValue::as_int).unwrap_or(1);
    let typed = m.group(1).and_then(|n| n.parse::<i64>().ok());
    typed == Some(order + list.child_count() as i64)
}

fn ordered_list_dom(node: &Node) -> DomSpec {
    match node.attr("order").and_then(AttrValue::as_int) {
        Some(order) if order != 1 => DomSpec::new("ol").attr("start", order.to_string()),
        _ => DomSpec::new("ol"),
    }
}

pub fn ordered_list() -> Extension {
    Extension::node(
        "ordered_list",
        NodeSpec::new()
            .content("list_item+")
            .group("block list")
            .attr("order", AttrSpec::with_default(1).coerce(list_order))
            .to_dom(ordered_list_dom),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_ordered_list)
            .token("ordered_list", ParseSpec::block("ordered_list").with_attrs(ordered_list_attrs))
            .block_rule(Arc::new(ListRule)),
    )
    .with_keys(|_| vec![key("Shift-Ctrl-9", "ordered_list")])
    .with_input_rules(|ctx| {
        let (Some(ty), Some(item)) = (ctx.node_type.clone(), node_type(ctx, "list_item")) else {
            return Vec::new();
        };
        vec![wrapping_rule(
            "ordered_list",
            r"^(\d+)\.\s$",
            ty,
            Some(item),
            ordered_match_attrs,
            Some(continues_list),
        )]
    })
    .with_commands(|ctx| list_command(ctx, "ordered_list", "list_item"))
}

/// Split, sink and lift for the unit's own item type, with their keys.
fn item_commands(ctx: &UnitContext) -> Vec<(SmolStr, CommandFn)> {
    let Some(item) = ctx.node_type.clone() else {
        return Vec::new();
    };
    let split = item.clone();
    let sink = item.clone();
    vec![
        (
            SmolStr::new("split_list_item"),
            command(move |state, _| split_list_item(state, &split)),
        ),
        (
            SmolStr::new("sink_list_item"),
            command(move |state, _| sink_list_item(state, &sink)),
        ),
        (
            SmolStr::new("lift_list_item"),
            command(move |state, _| lift_list_item(state, &item)),
        ),
    ]
}

fn item_keys(_: &UnitContext) -> Vec<crate::extension::KeyDecl> {
    vec![
        key("Enter", "split_list_item"),
        key("Tab", "sink_list_item"),
        key("Mod-]", "sink_list_item"),
        key("Shift-Tab", "lift_list_item"),
        key("Mod-[", "lift_list_item"),
    ]
}

pub fn list_item() -> Extension {
    Extension::node(
        "list_item",
        NodeSpec::new()
            .content("paragraph block*")
            .defining()
            .to_dom(|_| DomSpec::new("li")),
    )
    .with_node_markdown(NodeMarkdown::new(write_list_item).token("list_item", ParseSpec::block("list_item")))
    .with_keys(item_keys)
    .with_commands(item_commands)
}

pub fn checkbox_list() -> Extension {
    Extension::node(
        "checkbox_list",
        NodeSpec::new()
            .content("checkbox_item+")
            .group("block list")
            .to_dom(|_| DomSpec::new("ul").attr("data-type", "checkbox_list")),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_bullet_list)
            .token("checkbox_list", ParseSpec::block("checkbox_list"))
            .block_rule(Arc::new(ListRule)),
    )
    .with_keys(|_| vec![key("Shift-Ctrl-7", "checkbox_list")])
    .with_input_rules(|ctx| {
        let (Some(ty), Some(item)) = (ctx.node_type.clone(), node_type(ctx, "checkbox_item")) else {
            return Vec::new();
        };
        vec![wrapping_rule(
            "checkbox_list",
            r"^\s*-?\s*\[ ?\]\s$",
            ty,
            Some(item),
            |_| Attrs::new(),
            None,
        )]
    })
    .with_commands(|ctx| list_command(ctx, "checkbox_list", "checkbox_item"))
}

fn checkbox_item_dom(node: &Node) -> DomSpec {
    let checked = node.attr("checked").and_then(AttrValue::as_bool).unwrap_or(false);
    DomSpec::new("li").attr("data-checked", checked.to_string())
}

/// Flip `checked` on the checkbox item around the selection.
fn toggle_checked(state: &EditorState, item: &Arc<NodeType>) -> CommandResult {
    let res = state.doc().resolve(state.selection().from())?;
    let id = item.id;
    let Some(depth) = find_ancestor(&res, |node| node.ty().id == id) else {
        return Ok(None);
    };
    let node = res.node(depth);
    let checked = node.attr("checked").and_then(AttrValue::as_bool).unwrap_or(false);
    let mut next = node.attrs().clone();
    next.insert("checked".into(), (!checked).into());
    let pos = res.before(depth);
    attempt(state, |tr| {
        tr.set_node_markup(pos, item, next)?;
        Ok(true)
    })
}

pub fn checkbox_item() -> Extension {
    Extension::node(
        "checkbox_item",
        NodeSpec::new()
            .content("paragraph block*")
            .defining()
            .attr("checked", AttrSpec::with_default(false))
            .to_dom(checkbox_item_dom),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_checkbox_item)
            .token("checkbox_item", ParseSpec::block("checkbox_item").with_attrs(checkbox_item_attrs)),
    )
    .with_keys(|ctx| {
        let mut keys = item_keys(ctx);
        keys.push(key("Mod-Enter", "toggle_checked"));
        keys
    })
    .with_commands(|ctx| {
        let mut commands = item_commands(ctx);
        if let Some(item) = ctx.node_type.clone() {
            commands.push((
                SmolStr::new("toggle_checked"),
                command(move |state, _| toggle_checked(state, &item)),
            ));
        }
        commands
    })
}

fn code_block_dom(node: &Node) -> DomSpec {
    let language = node.attr("language").and_then(AttrValue::as_str).unwrap_or("none");
    DomSpec::new("pre").attr("data-language", language)
}

pub fn code_block() -> Extension {
    Extension::node(
        "code_block",
        NodeSpec::new()
            .content("text*")
            .group("block")
            .code()
            .defining()
            .marks(MarkAllowance::None)
            .attr("language", AttrSpec::with_default("none").coerce(fence_language))
            .to_dom(code_block_dom),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_code_block)
            .token("fence", ParseSpec::code("code_block").with_attrs(fence_attrs))
            .block_rule(Arc::new(FenceRule)),
    )
    .with_keys(|_| vec![key("Shift-Ctrl-\\", "code_block")])
    .with_input_rules(|ctx| {
        let Some(ty) = ctx.node_type.clone() else {
            return Vec::new();
        };
        vec![textblock_type_rule("code_block", "^```$", ty, |_| Attrs::new())]
    })
    .with_commands(|ctx| {
        let (Some(ty), Some(paragraph)) = (ctx.node_type.clone(), node_type(ctx, "paragraph")) else {
            return Vec::new();
        };
        vec![(
            SmolStr::new("code_block"),
            command(move |state, attrs| toggle_block_type(state, &ty, &paragraph, attrs)),
        )]
    })
}

/// `---`, `___ ` or `*** ` at the start of a paragraph: the paragraph is
/// replaced by a rule followed by what was after the caret.
fn hr_rule(ty: Arc<NodeType>) -> InputRuleSpec {
    InputRuleSpec::new("hr", r"^(?:---|___\s|\*\*\*\s)$", move |state, m| {
        let markup = m.group(0).map_or("---", str::trim);
        let rule = ty.create(&attrs([("markup", markup)]), Fragment::empty(), Vec::new())?;
        attempt(state, |tr| {
            tr.delete(m.from, m.to)?;
            let doc = tr.doc().clone();
            let res = doc.resolve(m.from)?;
            let depth = res.depth();
            if depth == 0 || res.parent().ty().is_code() {
                return Ok(false);
            }
            let rest = res.parent().clone();
            let (start, end) = (res.before(depth), res.after(depth));
            let caret = start + rule.node_size() + 1;
            tr.replace(start, end, Fragment::from_vec(vec![rule.clone(), rest]))?;
            tr.set_selection(Selection::cursor(caret));
            Ok(true)
        })
    })
}

pub fn hr() -> Extension {
    Extension::node(
        "hr",
        NodeSpec::new()
            .group("block")
            .attr("markup", AttrSpec::with_default("---"))
            .to_dom(|_| DomSpec::leaf("hr")),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_hr)
            .token("hr", ParseSpec::leaf("hr").with_attrs(hr_attrs))
            .block_rule(Arc::new(HrRule)),
    )
    .with_keys(|_| vec![key("Mod-_", "hr")])
    .with_input_rules(|ctx| match ctx.node_type.clone() {
        Some(ty) => vec![hr_rule(ty)],
        None => Vec::new(),
    })
    .with_commands(|ctx| {
        let Some(ty) = ctx.node_type.clone() else {
            return Vec::new();
        };
        vec![(SmolStr::new("hr"), command(move |state, attrs| insert_node(state, &ty, attrs)))]
    })
}

fn notice_dom(node: &Node) -> DomSpec {
    let style = node.attr("style").and_then(AttrValue::as_str).unwrap_or("info");
    DomSpec::new("div").attr("class", format!("notice notice-{style}"))
}

pub fn container_notice() -> Extension {
    Extension::node(
        "container_notice",
        NodeSpec::new()
            .content("block+")
            .group("block")
            .defining()
            .attr("style", AttrSpec::with_default("info").coerce(notice_style))
            .to_dom(notice_dom),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_notice)
            .token("container_notice", ParseSpec::block("container_notice").with_attrs(notice_attrs))
            .block_rule(Arc::new(NoticeRule::default())),
    )
    .with_input_rules(|ctx| {
        let Some(ty) = ctx.node_type.clone() else {
            return Vec::new();
        };
        vec![wrapping_rule("container_notice", "^:::$", ty, None, |_| Attrs::new(), None)]
    })
    .with_commands(|ctx| toggle_wrap_command(ctx, "container_notice"))
}

/// Insert a line break: the break node in text, a newline in code.
fn insert_hard_break(state: &EditorState, ty: &Arc<NodeType>) -> CommandResult {
    let sel = state.selection();
    let res = state.doc().resolve(sel.from())?;
    if !res.parent().is_textblock() {
        return Ok(None);
    }
    if res.parent().ty().is_code() {
        return commands::insert_text(state, "\n");
    }
    let node = ty.create(&Attrs::new(), Fragment::empty(), Vec::new())?;
    attempt(state, |tr| {
        tr.replace(sel.from(), sel.to(), node.into())?;
        tr.set_selection(Selection::cursor(sel.from() + 1));
        Ok(true)
    })
}

pub fn hard_break() -> Extension {
    Extension::node(
        "hard_break",
        NodeSpec::new().group("inline").inline().to_dom(|_| DomSpec::leaf("br")),
    )
    .with_node_markdown(NodeMarkdown::new(write_hard_break).token("hardbreak", ParseSpec::leaf("hard_break")))
    .with_keys(|_| vec![key("Shift-Enter", "hard_break")])
    .with_commands(|ctx| {
        let Some(ty) = ctx.node_type.clone() else {
            return Vec::new();
        };
        vec![(
            SmolStr::new("hard_break"),
            command(move |state, _| insert_hard_break(state, &ty)),
        )]
    })
}

fn is_shortcode_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '+' | '-')
}

/// Attribute check for an emoji's `name`: a known gemoji shortcode.
pub fn emoji_name(value: AttrValue) -> Result<AttrValue, String> {
    match value.as_str() {
        Some(name) if emojis::get_by_shortcode(name).is_some() => Ok(value),
        Some(name) => Err(format!("`{name}` is not an emoji shortcode")),
        None => Ok(value),
    }
}

/// `:name:` for every known shortcode. Unknown names stay text.
pub struct EmojiRule;

impl InlineRule for EmojiRule {
    fn name(&self) -> &str {
        "emoji"
    }

    fn trigger(&self) -> char {
        ':'
    }

    fn parse(&self, chars: &[char], start: usize, line: usize) -> Option<(Token, usize)> {
        let len = chars[start + 1..].iter().take_while(|c| is_shortcode_char(**c)).count();
        let end = start + 1 + len;
        if len == 0 || chars.get(end) != Some(&':') {
            return None;
        }
        let name: String = chars[start + 1..end].iter().collect();
        emojis::get_by_shortcode(&name)?;
        Some((Token::leaf("emoji", line).with_attr("name", name.as_str()).with_markup(":"), end + 1))
    }
}

fn write_emoji(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    let name = node.attr("name").and_then(AttrValue::as_str).unwrap_or_default();
    w.write(&format!(":{name}:"));
}

fn emoji_dom(node: &Node) -> DomSpec {
    let name = node.attr("name").and_then(AttrValue::as_str).unwrap_or_default();
    let glyph = emojis::get_by_shortcode(name).map_or("", |e| e.as_str());
    DomSpec::new("span")
        .attr("class", "emoji")
        .attr("data-name", name)
        .attr("aria-label", glyph)
}

/// Replace the selection with an emoji and put the caret after it.
fn insert_emoji(state: &EditorState, ty: &Arc<NodeType>, attrs: &Attrs) -> CommandResult {
    let node = ty.create_checked(attrs, Fragment::empty(), Vec::new())?;
    let sel = state.selection();
    let res = state.doc().resolve(sel.from())?;
    if !res.parent().is_textblock() || res.parent().ty().is_code() {
        return Ok(None);
    }
    attempt(state, |tr| {
        tr.replace(sel.from(), sel.to(), node.into())?;
        tr.set_selection(Selection::cursor(sel.from() + 1));
        Ok(true)
    })
}

/// Typing the closing colon of a known `:name:`.
fn emoji_input_rule(ty: Arc<NodeType>) -> InputRuleSpec {
    InputRuleSpec::new("emoji", r":([a-z0-9_+-]+):$", move |state, m| {
        let Some(name) = m.group(1) else {
            return Ok(None);
        };
        if emojis::get_by_shortcode(name).is_none() {
            return Ok(None);
        }
        let node = ty.create(&attrs([("name", name)]), Fragment::empty(), Vec::new())?;
        attempt(state, |tr| {
            tr.replace(m.from, m.to, node.into())?;
            tr.set_selection(Selection::cursor(m.from + 1));
            Ok(true)
        })
    })
}

pub fn emoji() -> Extension {
    Extension::node(
        "emoji",
        NodeSpec::new()
            .group("inline phrase")
            .inline()
            .atom()
            .attr("name", AttrSpec::required().coerce(emoji_name))
            .to_dom(emoji_dom),
    )
    .with_node_markdown(
        NodeMarkdown::new(write_emoji)
            .token("emoji", ParseSpec::leaf("emoji"))
            .inline_rule(Arc::new(EmojiRule)),
    )
    .with_input_rules(|ctx| match ctx.node_type.clone() {
        Some(ty) => vec![emoji_input_rule(ty)],
        None => Vec::new(),
    })
    .with_commands(|ctx| {
        let Some(ty) = ctx.node_type.clone() else {
            return Vec::new();
        };
        vec![(SmolStr::new("emoji"), command(move |state, attrs| insert_emoji(state, &ty, attrs)))]
    })
}
