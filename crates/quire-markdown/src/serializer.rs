//! Tree to markdown.
//!
//! Blocks are written through [`MarkdownWriter`], which tracks the current
//! line prefix (`> `, list indentation) and defers the separator after a
//! block until the next write. That deferral is what keeps exactly one blank
//! line between sibling blocks, a single newline between tight list items and
//! two blank lines between adjacent lists of the same type.

use std::collections::HashMap;

use quire_model::{AttrValue, Mark, Node};
use smol_str::SmolStr;

use crate::escape::{escape, escape_link_dest, escape_title};

/// Writes one node. Receives the node, its parent and its index in the parent.
pub type NodeWriter = fn(&mut MarkdownWriter<'_>, &Node, &Node, usize);

/// Delimiter functions for a mark. Both receive the mark and the inline node
/// at the edge of the marked run.
#[derive(Clone, Copy)]
pub struct MarkWriter {
    pub open: fn(&Mark, &Node) -> String,
    pub close: fn(&Mark, &Node) -> String,
    /// Whether text inside the mark is escaped. Code marks write raw text.
    pub escape: bool,
}

impl std::fmt::Debug for MarkWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkWriter").field("escape", &self.escape).finish()
    }
}

impl MarkWriter {
    /// A mark written as the same delimiter on both sides.
    pub fn symmetric(open: fn(&Mark, &Node) -> String) -> Self {
        Self {
            open,
            close: open,
            escape: true,
        }
    }
}

pub struct MarkdownWriter<'a> {
    nodes: &'a HashMap<SmolStr, NodeWriter>,
    marks: &'a HashMap<SmolStr, MarkWriter>,
    out: String,
    /// Prefix written at the start of every line of the current block.
    delim: String,
    /// Type of the block closed last, whose separator has not been written.
    closed: Option<SmolStr>,
    in_tight_list: bool,
    /// Offset where the current line's content starts, after any prefix.
    line_start: usize,
}

impl<'a> MarkdownWriter<'a> {
    pub fn new(nodes: &'a HashMap<SmolStr, NodeWriter>, marks: &'a HashMap<SmolStr, MarkWriter>) -> Self {
        Self {
            nodes,
            marks,
            out: String::new(),
            delim: String::new(),
            closed: None,
            in_tight_list: false,
            line_start: 0,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    fn at_blank(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    /// Write the pending block separator: `size - 1` blank lines.
    pub fn flush_close(&mut self, size: usize) {
        if self.closed.take().is_none() {
            return;
        }
        if !self.at_blank() {
            self.out.push('\n');
        }
        let trimmed = self.delim.trim_end().to_owned();
        for _ in 1..size {
            self.out.push_str(&trimmed);
            self.out.push('\n');
        }
    }

    /// Write `content`, preceded by the pending separator and, at the start
    /// of a line, the line prefix.
    pub fn write(&mut self, content: &str) {
        self.flush_close(2);
        if !self.delim.is_empty() && self.at_blank() {
            self.out.push_str(&self.delim);
            self.line_start = self.out.len();
        } else if self.at_blank() {
            self.line_start = self.out.len();
        }
        self.out.push_str(content);
    }

    /// Write a marker that belongs to the line prefix, so text after it
    /// still counts as the start of a line.
    pub fn write_block_prefix(&mut self, prefix: &str) {
        self.write(prefix);
        self.line_start = self.out.len();
    }

    pub fn ensure_new_line(&mut self) {
        if !self.at_blank() {
            self.out.push('\n');
        }
    }

    pub fn close_block(&mut self, node: &Node) {
        self.closed = Some(SmolStr::new(node.type_name()));
    }

    /// Write text line by line, escaping it when asked.
    pub fn text(&mut self, text: &str, escaped: bool) {
        let mut lines = text.split('\n').peekable();
        while let Some(line) = lines.next() {
            self.write("");
            if escaped {
                let start_of_line = self.out.len() == self.line_start;
                self.out.push_str(&escape(line, start_of_line));
            } else {
                self.out.push_str(line);
            }
            if lines.peek().is_some() {
                self.out.push('\n');
            }
        }
    }

    /// Write raw text after the current output, without any prefix handling.
    pub fn write_raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Render `f` with `delim` added to the line prefix. The first line gets
    /// `first` instead, when given.
    pub fn wrap_block(&mut self, delim: &str, first: Option<&str>, node: &Node, f: impl FnOnce(&mut Self)) {
        let old = self.delim.clone();
        self.write_block_prefix(first.unwrap_or(delim));
        self.delim.push_str(delim);
        f(self);
        self.delim = old;
        self.close_block(node);
    }

    pub fn render(&mut self, node: &Node, parent: &Node, index: usize) {
        match self.nodes.get(node.type_name()) {
            Some(writer) => writer(self, node, parent, index),
            None => {
                tracing::warn!(target: "quire::markdown", node = node.type_name(), "no markdown writer, writing text content");
                self.text(&node.text_content(), true);
                if node.is_block() {
                    self.close_block(node);
                }
            }
        }
    }

    pub fn render_content(&mut self, parent: &Node) {
        for (i, child) in parent.content().iter().enumerate() {
            self.render(child, parent, i);
        }
    }

    fn mark_writer(&self, mark: &Mark) -> Option<MarkWriter> {
        self.marks.get(mark.name()).copied()
    }

    fn mark_string(&mut self, mark: &Mark, node: &Node, open: bool) {
        let Some(writer) = self.mark_writer(mark) else {
            tracing::debug!(target: "quire::markdown", mark = mark.name(), "mark has no writer, dropped");
            return;
        };
        let s = if open { (writer.open)(mark, node) } else { (writer.close)(mark, node) };
        self.text(&s, false);
    }

    /// Render the inline children of `parent`. Marks shared with the
    /// previous node stay open; the rest are closed innermost first and the
    /// new ones opened in rank order.
    pub fn render_inline(&mut self, parent: &Node) {
        let mut active: Vec<(Mark, Node)> = Vec::new();
        for (index, node) in parent.content().iter().enumerate() {
            let marks = node.marks();
            let raw = marks
                .last()
                .filter(|m| node.is_text() && self.mark_writer(m).is_some_and(|w| !w.escape));
            let len = marks.len() - usize::from(raw.is_some());

            let mut keep = 0;
            while keep < active.len().min(len) && marks[keep] == active[keep].0 {
                keep += 1;
            }
            while active.len() > keep {
                if let Some((mark, at)) = active.pop() {
                    self.mark_string(&mark, &at, false);
                }
            }
            while active.len() < len {
                let mark = marks[active.len()].clone();
                self.mark_string(&mark, node, true);
                active.push((mark, node.clone()));
            }
            // Later nodes of a run close on the last node that carried it.
            for (_, at) in active.iter_mut() {
                *at = node.clone();
            }

            match raw {
                Some(inner) => {
                    let inner = inner.clone();
                    self.mark_string(&inner, node, true);
                    self.text(node.text().unwrap_or_default(), false);
                    self.mark_string(&inner, node, false);
                }
                None if node.is_text() => self.text(node.text().unwrap_or_default(), true),
                None => self.render(node, parent, index),
            }
        }
        while let Some((mark, at)) = active.pop() {
            self.mark_string(&mark, &at, false);
        }
    }

    /// Render a list. Items are always written tight.
    pub fn render_list(&mut self, node: &Node, delim: &str, first: impl Fn(usize) -> String) {
        if self.closed.as_deref() == Some(node.type_name()) {
            self.flush_close(3);
        } else if self.in_tight_list {
            self.flush_close(1);
        }
        let prev_tight = self.in_tight_list;
        self.in_tight_list = true;
        for (i, child) in node.content().iter().enumerate() {
            if i > 0 {
                self.flush_close(1);
            }
            let first_delim = first(i);
            self.wrap_block(delim, Some(&first_delim), node, |w| w.render(child, node, i));
        }
        self.in_tight_list = prev_tight;
    }
}

fn longest_run(text: &str, c: char) -> usize {
    let mut best = 0;
    let mut run = 0;
    for ch in text.chars() {
        if ch == c {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

fn attr_str<'n>(node: &'n Node, name: &str) -> Option<&'n str> {
    node.attr(name).and_then(AttrValue::as_str)
}

/// Paragraphs holding only line breaks are written as blank.
pub fn write_paragraph(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    let visible = node.content().iter().any(|c| c.is_text() || c.ty().spec.atom);
    if visible {
        w.render_inline(node);
    } else {
        w.write("\\");
    }
    w.close_block(node);
}

pub fn write_heading(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    let level = node.attr("level").and_then(AttrValue::as_int).unwrap_or(1).clamp(1, 6) as usize;
    w.write(&format!("{} ", "#".repeat(level)));
    w.render_inline(node);
    w.close_block(node);
}

pub fn write_code_block(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    let text = node.text_content();
    let fence = "`".repeat((longest_run(&text, '`') + 1).max(3));
    let language = match attr_str(node, "language") {
        Some("none") | None => "",
        Some(language) => language,
    };
    w.write(&format!("{fence}{language}"));
    w.write_raw("\n");
    if !text.is_empty() {
        w.text(&text, false);
        w.write_raw("\n");
    }
    w.write(&fence);
    w.close_block(node);
}

pub fn write_blockquote(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    w.wrap_block("> ", None, node, |w| w.render_content(node));
}

pub fn write_bullet_list(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    w.render_list(node, "  ", |_| "- ".to_owned());
}

/// Items are numbered from `order`. Markers are padded on the right so every
/// item's content starts in the same column.
pub fn write_ordered_list(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    let start = node.attr("order").and_then(AttrValue::as_int).unwrap_or(1).max(0);
    let last = start.saturating_add(node.child_count().saturating_sub(1) as i64);
    let width = last.to_string().len();
    let delim = " ".repeat(width + 2);
    w.render_list(node, &delim, |i| {
        let number = start.saturating_add(i as i64).to_string();
        format!("{number}.{}", " ".repeat(width + 1 - number.len()))
    });
}

pub fn write_list_item(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    w.render_content(node);
}

pub fn write_checkbox_item(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    let checked = node.attr("checked").and_then(AttrValue::as_bool).unwrap_or(false);
    w.write_block_prefix(if checked { "[x] " } else { "[ ] " });
    w.render_content(node);
}

pub fn write_notice(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    let style = attr_str(node, "style").unwrap_or("info");
    w.write(&format!(":::{style}"));
    w.ensure_new_line();
    w.render_content(node);
    w.flush_close(1);
    w.write(":::");
    w.close_block(node);
}

pub fn write_hr(w: &mut MarkdownWriter<'_>, node: &Node, _parent: &Node, _index: usize) {
    w.write(attr_str(node, "markup").unwrap_or("---"));
    w.close_block(node);
}

/// Trailing hard breaks have no markdown form and are dropped.
pub fn write_hard_break(w: &mut MarkdownWriter<'_>, node: &Node, parent: &Node, index: usize) {
    let followed = parent
        .content()
        .iter()
        .skip(index + 1)
        .any(|sibling| sibling.type_name() != node.type_name());
    if followed {
        w.write("\\\n");
    }
}

pub fn strong_delim(_mark: &Mark, _node: &Node) -> String {
    "**".to_owned()
}

pub fn em_delim(_mark: &Mark, _node: &Node) -> String {
    "_".to_owned()
}

pub fn strikethrough_delim(_mark: &Mark, _node: &Node) -> String {
    "~~".to_owned()
}

fn code_ticks(node: &Node, open: bool) -> String {
    let text = node.text().unwrap_or_default();
    let run = longest_run(text, '`');
    let ticks = "`".repeat(run + 1);
    let padded = run > 0
        || (text.starts_with(' ') && text.ends_with(' ') && !text.chars().all(|c| c == ' '));
    match (padded, open) {
        (false, _) => ticks,
        (true, true) => format!("{ticks} "),
        (true, false) => format!(" {ticks}"),
    }
}

pub fn code_open(_mark: &Mark, node: &Node) -> String {
    code_ticks(node, true)
}

pub fn code_close(_mark: &Mark, node: &Node) -> String {
    code_ticks(node, false)
}

pub fn link_open(_mark: &Mark, _node: &Node) -> String {
    "[".to_owned()
}

pub fn link_close(mark: &Mark, _node: &Node) -> String {
    let href = mark.attrs.get("href").and_then(AttrValue::as_str).unwrap_or_default();
    match mark.attrs.get("title").and_then(AttrValue::as_str) {
        Some(title) => format!("]({} {})", escape_link_dest(href), escape_title(title)),
        None => format!("]({})", escape_link_dest(href)),
    }
}
