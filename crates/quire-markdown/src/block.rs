//! Line-based block tokenizer.
//!
//! Block rules are tried in registration order at the start of every
//! non-blank line. The paragraph rule is built in and runs when no other rule
//! claims the line. Container rules (blockquote, list items, notices) strip
//! their markers and tokenize the inner lines recursively.

use std::sync::{Arc, LazyLock};

use quire_model::{AttrValue, Attrs, attrs};
use regex::Regex;

use crate::error::MarkdownSyntaxError;
use crate::token::Token;

/// One source line, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub number: usize,
}

impl Line {
    pub fn new(text: impl Into<String>, number: usize) -> Self {
        Self {
            text: text.into(),
            number,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Count of leading spaces, with tabs expanded to four columns.
    pub fn indent(&self) -> usize {
        let mut width = 0;
        for c in self.text.chars() {
            match c {
                ' ' => width += 1,
                '\t' => width += 4 - width % 4,
                _ => break,
            }
        }
        width
    }

    /// The line with `cols` columns of indentation removed.
    pub fn dedent(&self, cols: usize) -> Line {
        let mut width = 0;
        let mut cut = 0;
        for (i, c) in self.text.char_indices() {
            if width >= cols {
                break;
            }
            match c {
                ' ' => width += 1,
                '\t' => width += 4 - width % 4,
                _ => break,
            }
            cut = i + c.len_utf8();
        }
        Line::new(&self.text[cut..], self.number)
    }

    /// A copy with different text but the same line number.
    pub fn with_text(&self, text: impl Into<String>) -> Line {
        Line::new(text, self.number)
    }
}

/// Split source text into numbered lines.
pub fn split_lines(text: &str) -> Vec<Line> {
    text.lines()
        .enumerate()
        .map(|(i, l)| Line::new(l, i + 1))
        .collect()
}

/// A block-level syntax rule.
pub trait BlockRule: Send + Sync {
    /// Rule name. Registering a second rule with the same name is a no-op.
    fn name(&self) -> &str;

    /// Whether `line` starts this block even in the middle of a paragraph.
    fn interrupts_paragraph(&self, _line: &str) -> bool {
        false
    }

    /// Try to read a block starting at `lines[start]`. On success, push the
    /// tokens and return the index of the first line after the block.
    fn parse(
        &self,
        tokenizer: &BlockTokenizer,
        lines: &[Line],
        start: usize,
        out: &mut Vec<Token>,
    ) -> Result<Option<usize>, MarkdownSyntaxError>;
}

/// The composed set of block rules.
#[derive(Clone, Default)]
pub struct BlockTokenizer {
    rules: Vec<Arc<dyn BlockRule>>,
}

impl std::fmt::Debug for BlockTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| r.name().to_owned()))
            .finish()
    }
}

impl BlockTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, unless one with the same name is already registered.
    pub fn push(&mut self, rule: Arc<dyn BlockRule>) -> bool {
        if self.rules.iter().any(|r| r.name() == rule.name()) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn interrupts_paragraph(&self, line: &str) -> bool {
        self.rules.iter().any(|r| r.interrupts_paragraph(line))
    }

    pub fn tokenize(&self, lines: &[Line]) -> Result<Vec<Token>, MarkdownSyntaxError> {
        let mut out = Vec::new();
        let mut i = 0;
        'lines: while i < lines.len() {
            if lines[i].is_blank() {
                i += 1;
                continue;
            }
            for rule in &self.rules {
                if let Some(next) = rule.parse(self, lines, i, &mut out)? {
                    debug_assert!(next > i, "block rule {} made no progress", rule.name());
                    i = next.max(i + 1);
                    continue 'lines;
                }
            }
            i = self.paragraph(lines, i, &mut out);
        }
        Ok(out)
    }

    fn paragraph(&self, lines: &[Line], start: usize, out: &mut Vec<Token>) -> usize {
        let mut end = start + 1;
        while end < lines.len()
            && !lines[end].is_blank()
            && !self.interrupts_paragraph(&lines[end].text)
        {
            end += 1;
        }
        let joined = lines[start..end]
            .iter()
            .map(|l| l.text.trim_start())
            .collect::<Vec<_>>()
            .join("\n");
        let content = joined.trim_end();
        let line = lines[start].number;
        out.push(Token::open("paragraph", line));
        // A lone backslash marks an intentionally empty paragraph.
        if content != "\\" {
            out.push(Token::leaf("inline", line).with_content(content));
        }
        out.push(Token::close("paragraph", line));
        end
    }
}

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").unwrap());

/// ATX headings: `#` to `######` followed by a space.
pub struct HeadingRule;

impl BlockRule for HeadingRule {
    fn name(&self) -> &str {
        "heading"
    }

    fn interrupts_paragraph(&self, line: &str) -> bool {
        HEADING.is_match(line)
    }

    fn parse(
        &self,
        _tokenizer: &BlockTokenizer,
        lines: &[Line],
        start: usize,
        out: &mut Vec<Token>,
    ) -> Result<Option<usize>, MarkdownSyntaxError> {
        let line = &lines[start];
        let Some(caps) = HEADING.captures(&line.text) else {
            return Ok(None);
        };
        let markup = &caps[1];
        out.push(Token::open("heading", line.number).with_markup(markup));
        if let Some(text) = caps.get(2).filter(|m| !m.as_str().is_empty()) {
            out.push(Token::leaf("inline", line.number).with_content(text.as_str()));
        }
        out.push(Token::close("heading", line.number).with_markup(markup));
        Ok(Some(start + 1))
    }
}

/// Heading level from the marker length.
pub fn heading_attrs(token: &Token) -> Attrs {
    attrs([("level", token.markup.len() as i64)])
}

static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^( {0,3})(`{3,}|~{3,})[ \t]*([^`]*?)[ \t]*$").unwrap());

/// Fenced code blocks. The closing fence uses the same character and is at
/// least as long as the opening one.
pub struct FenceRule;

impl BlockRule for FenceRule {
    fn name(&self) -> &str {
        "fence"
    }

    fn interrupts_paragraph(&self, line: &str) -> bool {
        FENCE_OPEN.is_match(line)
    }

    fn parse(
        &self,
        _tokenizer: &BlockTokenizer,
        lines: &[Line],
        start: usize,
        out: &mut Vec<Token>,
    ) -> Result<Option<usize>, MarkdownSyntaxError> {
        let line = &lines[start];
        let Some(caps) = FENCE_OPEN.captures(&line.text) else {
            return Ok(None);
        };
        let indent = caps[1].len();
        let fence = &caps[2];
        let info = &caps[3];
        let Some(close) = find_fence_close(lines, start + 1, fence) else {
            return Err(MarkdownSyntaxError::new(line.number, "unterminated code fence")
                .with_advice(format!("close the block with a line containing `{fence}`")));
        };
        let content = lines[start + 1..close]
            .iter()
            .map(|l| l.dedent(indent).text)
            .collect::<Vec<_>>()
            .join("\n");
        out.push(
            Token::leaf("fence", line.number)
                .with_info(info)
                .with_markup(fence)
                .with_content(content),
        );
        Ok(Some(close + 1))
    }
}

/// Index of the line closing a fence opened with `fence`.
fn find_fence_close(lines: &[Line], from: usize, fence: &str) -> Option<usize> {
    let marker = fence.chars().next()?;
    let min = fence.len();
    (from..lines.len()).find(|&i| {
        let line = &lines[i];
        if line.indent() > 3 {
            return false;
        }
        let trimmed = line.text.trim();
        trimmed.len() >= min && trimmed.chars().all(|c| c == marker)
    })
}

/// Code block language from the fence info string. An empty info string is
/// the `none` language.
pub fn fence_attrs(token: &Token) -> Attrs {
    let language = token.info.split_whitespace().next().unwrap_or("none");
    attrs([("language", language)])
}

/// Attribute check for a code block's `language`: a blank language is
/// `none`, and the id must fit on a fence line.
pub fn fence_language(value: AttrValue) -> Result<AttrValue, String> {
    let Some(language) = value.as_str() else {
        return Ok(value);
    };
    let language = language.trim();
    if language.is_empty() {
        return Ok(AttrValue::from("none"));
    }
    if language.contains(|c: char| c.is_whitespace() || c == '`') {
        return Err(format!("`{language}` is not a language id"));
    }
    Ok(AttrValue::from(language))
}

static HR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(?:(?:\*[ \t]*){3,}|(?:-[ \t]*){3,}|(?:_[ \t]*){3,})$").unwrap()
});

/// Thematic breaks. The marker is kept so it can be written back verbatim.
pub struct HrRule;

impl BlockRule for HrRule {
    fn name(&self) -> &str {
        "hr"
    }

    fn interrupts_paragraph(&self, line: &str) -> bool {
        HR.is_match(line)
    }

    fn parse(
        &self,
        _tokenizer: &BlockTokenizer,
        lines: &[Line],
        start: usize,
        out: &mut Vec<Token>,
    ) -> Result<Option<usize>, MarkdownSyntaxError> {
        let line = &lines[start];
        if !HR.is_match(&line.text) {
            return Ok(None);
        }
        let markup: String = line.text.chars().filter(|c| !c.is_whitespace()).collect();
        out.push(Token::leaf("hr", line.number).with_markup(markup));
        Ok(Some(start + 1))
    }
}

pub fn hr_attrs(token: &Token) -> Attrs {
    attrs([("markup", token.markup.as_str())])
}

static NOTICE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}:::[ \t]*([A-Za-z][\w-]*)?[ \t]*$").unwrap());

/// `:::style` ... `:::` containers.
pub struct NoticeRule {
    default_style: &'static str,
}

impl NoticeRule {
    pub fn new(default_style: &'static str) -> Self {
        Self { default_style }
    }
}

impl Default for NoticeRule {
    fn default() -> Self {
        Self::new("info")
    }
}

impl BlockRule for NoticeRule {
    fn name(&self) -> &str {
        "container_notice"
    }

    fn interrupts_paragraph(&self, line: &str) -> bool {
        NOTICE_OPEN.is_match(line)
    }

    fn parse(
        &self,
        tokenizer: &BlockTokenizer,
        lines: &[Line],
        start: usize,
        out: &mut Vec<Token>,
    ) -> Result<Option<usize>, MarkdownSyntaxError> {
        let line = &lines[start];
        let Some(caps) = NOTICE_OPEN.captures(&line.text) else {
            return Ok(None);
        };
        let style = caps.get(1).map_or(self.default_style, |m| m.as_str());

        let mut depth = 0usize;
        let mut fence: Option<String> = None;
        let mut close = None;
        for (i, l) in lines.iter().enumerate().skip(start + 1) {
            if let Some(open) = &fence {
                let trimmed = l.text.trim();
                if trimmed.len() >= open.len() && trimmed.chars().all(|c| open.starts_with(c)) {
                    fence = None;
                }
                continue;
            }
            if let Some(caps) = FENCE_OPEN.captures(&l.text) {
                fence = Some(caps[2].to_owned());
                continue;
            }
            match NOTICE_OPEN.captures(&l.text) {
                Some(c) if c.get(1).is_some() => depth += 1,
                Some(_) if depth == 0 => {
                    close = Some(i);
                    break;
                }
                Some(_) => depth -= 1,
                None => {}
            }
        }
        let Some(close) = close else {
            return Err(MarkdownSyntaxError::new(line.number, "unterminated notice block")
                .with_advice("close the notice with a line containing only `:::`"));
        };

        out.push(
            Token::open("container_notice", line.number)
                .with_info(style)
                .with_markup(":::"),
        );
        out.extend(tokenizer.tokenize(&lines[start + 1..close])?);
        out.push(Token::close("container_notice", lines[close].number));
        Ok(Some(close + 1))
    }
}

/// Notice styles with a markdown form.
pub const NOTICE_STYLES: [&str; 3] = ["info", "warning", "tip"];

/// Openers without a known style read as `info`.
pub fn notice_attrs(token: &Token) -> Attrs {
    let style = token.info.as_str();
    let style = if NOTICE_STYLES.contains(&style) { style } else { "info" };
    attrs([("style", style)])
}

/// Attribute check for a notice's `style`.
pub fn notice_style(value: AttrValue) -> Result<AttrValue, String> {
    match value.as_str() {
        Some(style) if NOTICE_STYLES.contains(&style) => Ok(value),
        _ => Err(format!("style must be one of {}", NOTICE_STYLES.join(", "))),
    }
}

static QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ {0,3}> ?").unwrap());

/// `>` block quotes. Every line of the quote carries the marker.
pub struct BlockquoteRule;

impl BlockRule for BlockquoteRule {
    fn name(&self) -> &str {
        "blockquote"
    }

    fn interrupts_paragraph(&self, line: &str) -> bool {
        QUOTE.is_match(line)
    }

    fn parse(
        &self,
        tokenizer: &BlockTokenizer,
        lines: &[Line],
        start: usize,
        out: &mut Vec<Token>,
    ) -> Result<Option<usize>, MarkdownSyntaxError> {
        let mut inner = Vec::new();
        let mut end = start;
        while let Some(line) = lines.get(end) {
            let Some(m) = QUOTE.find(&line.text) else {
                break;
            };
            inner.push(line.with_text(&line.text[m.end()..]));
            end += 1;
        }
        if inner.is_empty() {
            return Ok(None);
        }
        let number = lines[start].number;
        out.push(Token::open("blockquote", number).with_markup(">"));
        out.extend(tokenizer.tokenize(&inner)?);
        out.push(Token::close("blockquote", lines[end - 1].number));
        Ok(Some(end))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet(char),
    Ordered(char),
    Checkbox(char),
}

impl ListKind {
    fn list_token(self) -> &'static str {
        match self {
            ListKind::Bullet(_) => "bullet_list",
            ListKind::Ordered(_) => "ordered_list",
            ListKind::Checkbox(_) => "checkbox_list",
        }
    }

    fn item_token(self) -> &'static str {
        match self {
            ListKind::Checkbox(_) => "checkbox_item",
            _ => "list_item",
        }
    }
}

/// A parsed list item marker.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListMarker {
    kind: ListKind,
    number: Option<i64>,
    checked: bool,
    markup: String,
    /// Column where the first line's content starts.
    content_start: usize,
    /// Indentation of continuation lines.
    continuation: usize,
}

static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^( {0,3})([-+*])([ \t]+|$)").unwrap());
static ORDERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^( {0,3})(\d{1,9})([.)])([ \t]+|$)").unwrap());
static CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^( {0,3})([-+*]) \[([ xX])\](?: |$)").unwrap());

fn marker_width(indent: usize, marker: usize, spaces: usize, at_end: bool) -> usize {
    if at_end || spaces > 4 {
        indent + marker + 1
    } else {
        indent + marker + spaces
    }
}

fn list_marker(text: &str) -> Option<ListMarker> {
    if let Some(caps) = CHECKBOX.captures(text) {
        let indent = caps[1].len();
        let bullet = caps[2].chars().next()?;
        let whole = caps.get(0)?;
        return Some(ListMarker {
            kind: ListKind::Checkbox(bullet),
            number: None,
            checked: &caps[3] != " ",
            markup: caps[2].to_owned(),
            content_start: whole.end(),
            continuation: indent + 2,
        });
    }
    if let Some(caps) = BULLET.captures(text) {
        let indent = caps[1].len();
        let bullet = caps[2].chars().next()?;
        let spaces = caps[3].len();
        let at_end = caps.get(0)?.end() == text.len();
        let width = marker_width(indent, 1, spaces, at_end);
        return Some(ListMarker {
            kind: ListKind::Bullet(bullet),
            number: None,
            checked: false,
            markup: caps[2].to_owned(),
            content_start: width.min(text.len()),
            continuation: width,
        });
    }
    if let Some(caps) = ORDERED.captures(text) {
        let indent = caps[1].len();
        let digits = &caps[2];
        let delim = caps[3].chars().next()?;
        let spaces = caps[4].len();
        let at_end = caps.get(0)?.end() == text.len();
        let width = marker_width(indent, digits.len() + 1, spaces, at_end);
        return Some(ListMarker {
            kind: ListKind::Ordered(delim),
            number: digits.parse().ok(),
            checked: false,
            markup: format!("{digits}{delim}"),
            content_start: width.min(text.len()),
            continuation: width,
        });
    }
    None
}

/// Bullet, ordered and checkbox lists.
///
/// A change of list kind, bullet character or ordered delimiter starts a new
/// list. A single blank line between items keeps the list going; two end it.
pub struct ListRule;

impl ListRule {
    fn item_lines(lines: &[Line], start: usize, marker: &ListMarker) -> (Vec<Line>, usize) {
        let first = &lines[start];
        let mut inner = vec![first.with_text(&first.text[marker.content_start..])];
        let mut i = start + 1;
        while i < lines.len() {
            let line = &lines[i];
            if !line.is_blank() {
                if line.indent() >= marker.continuation {
                    inner.push(line.dedent(marker.continuation));
                    i += 1;
                    continue;
                }
                break;
            }
            // A run of blank lines belongs to the item only when indented
            // content follows it.
            let mut next = i;
            while next < lines.len() && lines[next].is_blank() {
                next += 1;
            }
            if next < lines.len() && lines[next].indent() >= marker.continuation {
                for blank in &lines[i..next] {
                    inner.push(blank.dedent(marker.continuation));
                }
                i = next;
                continue;
            }
            break;
        }
        (inner, i)
    }
}

impl BlockRule for ListRule {
    fn name(&self) -> &str {
        "list"
    }

    fn interrupts_paragraph(&self, line: &str) -> bool {
        match list_marker(line) {
            Some(m) => matches!(m.kind, ListKind::Ordered(_)) || m.content_start < line.len(),
            None => false,
        }
    }

    fn parse(
        &self,
        tokenizer: &BlockTokenizer,
        lines: &[Line],
        start: usize,
        out: &mut Vec<Token>,
    ) -> Result<Option<usize>, MarkdownSyntaxError> {
        let Some(first) = list_marker(&lines[start].text) else {
            return Ok(None);
        };
        let kind = first.kind;
        let mut list_open = Token::open(kind.list_token(), lines[start].number)
            .with_markup(first.markup.clone());
        if let Some(order) = first.number {
            list_open = list_open.with_attr("order", order);
        }
        out.push(list_open);

        let mut i = start;
        let mut marker = first;
        let mut last_line = lines[start].number;
        loop {
            let (inner, next) = Self::item_lines(lines, i, &marker);
            let mut open = Token::open(kind.item_token(), lines[i].number).with_markup(marker.markup.clone());
            if matches!(kind, ListKind::Checkbox(_)) {
                open = open.with_attr("checked", marker.checked);
            }
            out.push(open);
            out.extend(tokenizer.tokenize(&inner)?);
            last_line = inner.last().map_or(last_line, |l| l.number);
            out.push(Token::close(kind.item_token(), last_line));

            let mut after = next;
            while after < lines.len() && lines[after].is_blank() {
                after += 1;
            }
            let Some(line) = lines.get(after) else {
                i = after;
                break;
            };
            if after - next > 1 {
                i = next;
                break;
            }
            match list_marker(&line.text) {
                Some(m) if m.kind == kind => {
                    marker = m;
                    i = after;
                }
                _ => {
                    i = next;
                    break;
                }
            }
        }
        out.push(Token::close(kind.list_token(), last_line));
        Ok(Some(i))
    }
}

/// Largest start number an ordered list marker can carry.
pub const MAX_LIST_ORDER: i64 = 999_999_999;

/// Attribute check for an ordered list's `order`.
pub fn list_order(value: AttrValue) -> Result<AttrValue, String> {
    match value.as_int() {
        Some(order) if !(0..=MAX_LIST_ORDER).contains(&order) => {
            Err(format!("order must be between 0 and {MAX_LIST_ORDER}"))
        }
        _ => Ok(value),
    }
}

pub fn ordered_list_attrs(token: &Token) -> Attrs {
    let order = token.attr("order").and_then(AttrValue::as_int).unwrap_or(1);
    attrs([("order", order)])
}

pub fn checkbox_item_attrs(token: &Token) -> Attrs {
    let checked = token.attr("checked").and_then(AttrValue::as_bool).unwrap_or(false);
    attrs([("checked", checked)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Nesting;

    fn tokenizer() -> BlockTokenizer {
        let mut t = BlockTokenizer::new();
        t.push(Arc::new(HeadingRule));
        t.push(Arc::new(FenceRule));
        t.push(Arc::new(HrRule));
        t.push(Arc::new(NoticeRule::default()));
        t.push(Arc::new(BlockquoteRule));
        t.push(Arc::new(ListRule));
        t
    }

    fn names(text: &str) -> Vec<String> {
        tokenizer()
            .tokenize(&split_lines(text))
            .unwrap()
            .iter()
            .map(|t| match t.nesting {
                Nesting::Open => format!("+{}", t.name),
                Nesting::Close => format!("-{}", t.name),
                Nesting::SelfClosing => t.name.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_duplicate_rule_names_are_ignored() {
        let mut t = tokenizer();
        assert!(!t.push(Arc::new(ListRule)));
        assert_eq!(
            t.rule_names(),
            ["heading", "fence", "hr", "container_notice", "blockquote", "list"]
        );
    }

    #[test]
    fn test_heading_and_paragraph() {
        assert_eq!(
            names("# Title\ntext\nmore\n\n## Sub"),
            ["+heading", "inline", "-heading", "+paragraph", "inline", "-paragraph", "+heading", "inline", "-heading"]
        );
    }

    #[test]
    fn test_empty_paragraph_marker() {
        let tokens = tokenizer().tokenize(&split_lines("\\")).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].name, "paragraph");
    }

    #[test]
    fn test_fence_keeps_content_and_info() {
        let tokens = tokenizer()
            .tokenize(&split_lines("````rust\nlet a = 1;\n```\n\n````"))
            .unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].info, "rust");
        assert_eq!(tokens[0].content, "let a = 1;\n```\n");
        assert_eq!(fence_attrs(&tokens[0])["language"], AttrValue::from("rust"));
    }

    #[test]
    fn test_unterminated_fence_reports_line() {
        let err = tokenizer()
            .tokenize(&split_lines("para\n\n```js\nx"))
            .unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_hr_markup_is_compacted() {
        let tokens = tokenizer().tokenize(&split_lines("* * *")).unwrap();
        assert_eq!(tokens[0].name, "hr");
        assert_eq!(tokens[0].markup, "***");
    }

    #[test]
    fn test_notice_nesting_and_fences() {
        let text = ":::warning\nouter\n\n:::tip\ninner\n:::\n\n```\n:::\n```\n:::";
        assert_eq!(
            names(text),
            [
                "+container_notice",
                "+paragraph",
                "inline",
                "-paragraph",
                "+container_notice",
                "+paragraph",
                "inline",
                "-paragraph",
                "-container_notice",
                "fence",
                "-container_notice"
            ]
        );
    }

    #[test]
    fn test_unterminated_notice() {
        let err = tokenizer().tokenize(&split_lines("a\n\n:::info\nbody")).unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_tight_list_with_nested_list() {
        assert_eq!(
            names("- a\n  - b\n- c"),
            [
                "+bullet_list",
                "+list_item",
                "+paragraph",
                "inline",
                "-paragraph",
                "+bullet_list",
                "+list_item",
                "+paragraph",
                "inline",
                "-paragraph",
                "-list_item",
                "-bullet_list",
                "-list_item",
                "+list_item",
                "+paragraph",
                "inline",
                "-paragraph",
                "-list_item",
                "-bullet_list"
            ]
        );
    }

    #[test]
    fn test_two_blank_lines_split_lists() {
        let opens: Vec<_> = names("- a\n\n\n- b")
            .into_iter()
            .filter(|n| n == "+bullet_list")
            .collect();
        assert_eq!(opens.len(), 2);

        let opens: Vec<_> = names("- a\n\n- b")
            .into_iter()
            .filter(|n| n == "+bullet_list")
            .collect();
        assert_eq!(opens.len(), 1);
    }

    #[test]
    fn test_list_kind_change_starts_new_list() {
        assert_eq!(
            names("- a\n1. b")
                .into_iter()
                .filter(|n| n.starts_with('+') && n.ends_with("list"))
                .collect::<Vec<_>>(),
            ["+bullet_list", "+ordered_list"]
        );
    }

    #[test]
    fn test_ordered_list_order_and_checkbox_state() {
        let tokens = tokenizer().tokenize(&split_lines("3. x\n4. y")).unwrap();
        assert_eq!(ordered_list_attrs(&tokens[0])["order"], AttrValue::Int(3));

        let tokens = tokenizer().tokenize(&split_lines("- [x] done\n- [ ] todo")).unwrap();
        assert_eq!(tokens[0].name, "checkbox_list");
        assert_eq!(checkbox_item_attrs(&tokens[1])["checked"], AttrValue::Bool(true));
        let second = tokens
            .iter()
            .filter(|t| t.name == "checkbox_item" && t.nesting == Nesting::Open)
            .nth(1)
            .unwrap();
        assert_eq!(checkbox_item_attrs(second)["checked"], AttrValue::Bool(false));
    }

    #[test]
    fn test_blockquote_strips_markers() {
        let tokens = tokenizer().tokenize(&split_lines("> a\n>\n> b")).unwrap();
        let inline: Vec<_> = tokens
            .iter()
            .filter(|t| t.name == "inline")
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(inline, ["a", "b"]);
    }

    #[test]
    fn test_lines_keep_source_numbers() {
        let tokens = tokenizer().tokenize(&split_lines("\n\n> quoted")).unwrap();
        assert_eq!(tokens[0].line, 3);
    }
}
