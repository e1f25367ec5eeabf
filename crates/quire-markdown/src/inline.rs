//! Inline tokenizer: escapes, code spans, links, hard breaks, delimiter
//! runs declared by mark units and inline rules declared by node units.
//!
//! Delimiter runs are resolved without flanking rules. A run first closes
//! the nearest open delimiters of the same character (innermost first),
//! then whatever is left of it opens new ones, longest delimiter first.
//! Openers that are never closed fall back to literal text.

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::escape::unescape;
use crate::token::Token;

/// A delimiter such as `**` that wraps text in a mark token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimiterSpec {
    pub marker: char,
    pub len: usize,
    pub token: SmolStr,
}

impl DelimiterSpec {
    pub fn new(marker: char, len: usize, token: impl Into<SmolStr>) -> Self {
        Self {
            marker,
            len,
            token: token.into(),
        }
    }

    fn markup(&self) -> String {
        std::iter::repeat_n(self.marker, self.len).collect()
    }
}

/// A span of inline syntax that becomes a single token, such as an emoji
/// shortcode. Rules run before the built-in syntax, in registration order.
pub trait InlineRule: Send + Sync {
    /// Unique rule name; a second rule with the same name is ignored.
    fn name(&self) -> &str;

    /// First character of every match.
    fn trigger(&self) -> char;

    /// The token for the syntax at `start` and the index after it, or `None`
    /// when the text there is not this rule's syntax.
    fn parse(&self, chars: &[char], start: usize, line: usize) -> Option<(Token, usize)>;
}

#[derive(Clone, Default)]
pub struct InlineTokenizer {
    delimiters: Vec<DelimiterSpec>,
    rules: Vec<Arc<dyn InlineRule>>,
}

impl fmt::Debug for InlineTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineTokenizer")
            .field("delimiters", &self.delimiters)
            .field("rules", &self.rule_names())
            .finish()
    }
}

#[derive(Debug)]
enum Piece {
    Text(String),
    Token(Token),
    Open(usize),
    Close(usize),
}

struct Link {
    label_end: usize,
    href: String,
    title: Option<String>,
    end: usize,
}

fn run_length(chars: &[char], start: usize, c: char) -> usize {
    chars[start..].iter().take_while(|&&x| x == c).count()
}

impl InlineTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delimiter. A second spec for the same marker and length is
    /// ignored.
    pub fn push(&mut self, spec: DelimiterSpec) -> bool {
        if spec.len == 0
            || self
                .delimiters
                .iter()
                .any(|d| d.marker == spec.marker && d.len == spec.len)
        {
            return false;
        }
        self.delimiters.push(spec);
        // Longest first, so greedy splitting of opening runs works.
        self.delimiters.sort_by(|a, b| b.len.cmp(&a.len));
        true
    }

    pub fn delimiters(&self) -> &[DelimiterSpec] {
        &self.delimiters
    }

    /// Register an inline rule. Returns false when the name is taken.
    pub fn push_rule(&mut self, rule: Arc<dyn InlineRule>) -> bool {
        if self.rules.iter().any(|r| r.name() == rule.name()) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    fn apply_rules(&self, chars: &[char], start: usize, line: usize) -> Option<(Token, usize)> {
        let c = chars[start];
        self.rules
            .iter()
            .filter(|r| r.trigger() == c)
            .find_map(|r| r.parse(chars, start, line))
            .filter(|(_, end)| *end > start)
    }

    pub fn tokenize(&self, text: &str, line: usize) -> Vec<Token> {
        let chars: Vec<char> = text.chars().collect();
        let pieces = self.scan(&chars, line);
        self.to_tokens(pieces, line)
    }

    fn is_delimiter(&self, c: char) -> bool {
        self.delimiters.iter().any(|d| d.marker == c)
    }

    fn scan(&self, chars: &[char], line: usize) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut openers: Vec<(usize, usize)> = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        fn flush(text: &mut String, pieces: &mut Vec<Piece>) {
            if !text.is_empty() {
                pieces.push(Piece::Text(std::mem::take(text)));
            }
        }

        while i < chars.len() {
            let c = chars[i];
            if let Some((token, end)) = self.apply_rules(chars, i, line) {
                flush(&mut text, &mut pieces);
                pieces.push(Piece::Token(token));
                i = end;
                continue;
            }
            match c {
                '\\' => match chars.get(i + 1) {
                    Some('\n') => {
                        flush(&mut text, &mut pieces);
                        pieces.push(Piece::Token(Token::leaf("hardbreak", line)));
                        i += 2;
                    }
                    Some(&next) if next.is_ascii_punctuation() => {
                        text.push(next);
                        i += 2;
                    }
                    _ => {
                        text.push('\\');
                        i += 1;
                    }
                },
                '\n' => {
                    flush(&mut text, &mut pieces);
                    pieces.push(Piece::Token(Token::leaf("hardbreak", line)));
                    i += 1;
                }
                '`' => {
                    let run = run_length(chars, i, '`');
                    match code_span(chars, i, run) {
                        Some((content, end)) => {
                            flush(&mut text, &mut pieces);
                            let markup: String = std::iter::repeat_n('`', run).collect();
                            pieces.push(Piece::Token(
                                Token::leaf("code_inline", line)
                                    .with_markup(markup)
                                    .with_content(content),
                            ));
                            i = end;
                        }
                        None => {
                            text.extend(std::iter::repeat_n('`', run));
                            i += run;
                        }
                    }
                }
                '[' => match parse_link(chars, i) {
                    Some(link) => {
                        flush(&mut text, &mut pieces);
                        let mut open = Token::open("link", line).with_attr("href", link.href.as_str());
                        if let Some(title) = &link.title {
                            open = open.with_attr("title", title.as_str());
                        }
                        pieces.push(Piece::Token(open));
                        let inner = self.scan(&chars[i + 1..link.label_end], line);
                        for token in self.to_tokens(inner, line) {
                            pieces.push(Piece::Token(token));
                        }
                        pieces.push(Piece::Token(Token::close("link", line)));
                        i = link.end;
                    }
                    None => {
                        text.push('[');
                        i += 1;
                    }
                },
                c if self.is_delimiter(c) => {
                    flush(&mut text, &mut pieces);
                    let run = run_length(chars, i, c);
                    self.delimiter_run(c, run, &mut pieces, &mut openers);
                    i += run;
                }
                c => {
                    text.push(c);
                    i += 1;
                }
            }
        }
        flush(&mut text, &mut pieces);
        for (index, spec) in openers {
            pieces[index] = Piece::Text(self.delimiters[spec].markup());
        }
        pieces
    }

    fn delimiter_run(
        &self,
        c: char,
        run: usize,
        pieces: &mut Vec<Piece>,
        openers: &mut Vec<(usize, usize)>,
    ) {
        let mut remaining = run;
        while remaining > 0 {
            let found = openers.iter().rposition(|&(_, s)| {
                let spec = &self.delimiters[s];
                spec.marker == c && spec.len <= remaining
            });
            let Some(at) = found else {
                break;
            };
            for (index, spec) in openers.drain(at + 1..) {
                pieces[index] = Piece::Text(self.delimiters[spec].markup());
            }
            let Some((_, spec)) = openers.pop() else {
                break;
            };
            pieces.push(Piece::Close(spec));
            remaining -= self.delimiters[spec].len;
        }
        if remaining == 0 {
            return;
        }

        let mut opens = Vec::new();
        let mut rest = remaining;
        while let Some(spec) = self
            .delimiters
            .iter()
            .position(|d| d.marker == c && d.len <= rest)
        {
            opens.push(spec);
            rest -= self.delimiters[spec].len;
        }
        if rest > 0 {
            pieces.push(Piece::Text(std::iter::repeat_n(c, rest).collect()));
        }
        for spec in opens {
            openers.push((pieces.len(), spec));
            pieces.push(Piece::Open(spec));
        }
    }

    fn to_tokens(&self, pieces: Vec<Piece>, line: usize) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                Piece::Text(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    match tokens.last_mut() {
                        Some(last) if last.name == "text" => last.content.push_str(&text),
                        _ => tokens.push(Token::leaf("text", line).with_content(text)),
                    }
                }
                Piece::Token(token) => tokens.push(token),
                Piece::Open(spec) => {
                    let spec = &self.delimiters[spec];
                    tokens.push(Token::open(spec.token.clone(), line).with_markup(spec.markup()));
                }
                Piece::Close(spec) => {
                    let spec = &self.delimiters[spec];
                    tokens.push(Token::close(spec.token.clone(), line).with_markup(spec.markup()));
                }
            }
        }
        tokens
    }
}

/// Find the closing backtick run of exactly `run` ticks. Returns the span
/// content and the index after the closing run.
fn code_span(chars: &[char], start: usize, run: usize) -> Option<(String, usize)> {
    let mut k = start + run;
    while k < chars.len() {
        if chars[k] == '`' {
            let close = run_length(chars, k, '`');
            if close == run {
                let content: String = chars[start + run..k].iter().collect();
                let padded = content.len() >= 2
                    && content.starts_with(' ')
                    && content.ends_with(' ')
                    && !content.chars().all(|c| c == ' ');
                let content = if padded {
                    content[1..content.len() - 1].to_owned()
                } else {
                    content
                };
                return Some((content, k + close));
            }
            k += close;
        } else {
            k += 1;
        }
    }
    None
}

/// Index of the `]` closing the label opened at `start`.
fn label_end(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut k = start + 1;
    while k < chars.len() {
        match chars[k] {
            '\\' => k += 2,
            '`' => {
                let run = run_length(chars, k, '`');
                k = code_span(chars, k, run).map_or(k + run, |(_, end)| end);
            }
            '[' => {
                depth += 1;
                k += 1;
            }
            ']' if depth == 0 => return Some(k),
            ']' => {
                depth -= 1;
                k += 1;
            }
            _ => k += 1,
        }
    }
    None
}

fn skip_spaces(chars: &[char], mut k: usize) -> usize {
    while k < chars.len() && matches!(chars[k], ' ' | '\t') {
        k += 1;
    }
    k
}

/// `[label](dest "title")`, where dest may be wrapped in angle brackets.
fn parse_link(chars: &[char], start: usize) -> Option<Link> {
    let label_end = label_end(chars, start)?;
    if chars.get(label_end + 1) != Some(&'(') {
        return None;
    }
    let mut k = skip_spaces(chars, label_end + 2);
    let mut raw = String::new();
    if chars.get(k) == Some(&'<') {
        k += 1;
        loop {
            match chars.get(k)? {
                '\\' => {
                    raw.push('\\');
                    raw.push(*chars.get(k + 1)?);
                    k += 2;
                }
                '>' => {
                    k += 1;
                    break;
                }
                '\n' => return None,
                &c => {
                    raw.push(c);
                    k += 1;
                }
            }
        }
    } else {
        while let Some(&c) = chars.get(k) {
            match c {
                '\\' => {
                    raw.push('\\');
                    raw.push(*chars.get(k + 1)?);
                    k += 2;
                }
                ')' | ' ' | '\t' | '\n' => break,
                c => {
                    raw.push(c);
                    k += 1;
                }
            }
        }
    }
    k = skip_spaces(chars, k);
    let mut title = None;
    if chars.get(k) == Some(&'"') {
        let mut raw_title = String::new();
        k += 1;
        loop {
            match chars.get(k)? {
                '\\' => {
                    raw_title.push('\\');
                    raw_title.push(*chars.get(k + 1)?);
                    k += 2;
                }
                '"' => {
                    k += 1;
                    break;
                }
                &c => {
                    raw_title.push(c);
                    k += 1;
                }
            }
        }
        title = Some(unescape(&raw_title));
        k = skip_spaces(chars, k);
    }
    if chars.get(k) != Some(&')') {
        return None;
    }
    Some(Link {
        label_end,
        href: unescape(&raw),
        title,
        end: k + 1,
    })
}
