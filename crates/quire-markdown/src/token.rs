//! Flat token stream produced by the block and inline tokenizers.

use quire_model::{AttrValue, Attrs};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    Open,
    Close,
    SelfClosing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub name: SmolStr,
    pub nesting: Nesting,
    pub attrs: Attrs,
    /// Text after an opening marker, e.g. a fence language or notice style.
    pub info: SmolStr,
    /// The literal marker that produced the token (`##`, `---`, `**`).
    pub markup: SmolStr,
    /// Raw text for leaf tokens (code, inline runs).
    pub content: String,
    /// Inline tokens of an `inline` token.
    pub children: Vec<Token>,
    /// 1-based source line.
    pub line: usize,
}

impl Token {
    pub fn new(name: impl Into<SmolStr>, nesting: Nesting, line: usize) -> Self {
        Self {
            name: name.into(),
            nesting,
            attrs: Attrs::new(),
            info: SmolStr::default(),
            markup: SmolStr::default(),
            content: String::new(),
            children: Vec::new(),
            line,
        }
    }

    pub fn open(name: impl Into<SmolStr>, line: usize) -> Self {
        Self::new(name, Nesting::Open, line)
    }

    pub fn close(name: impl Into<SmolStr>, line: usize) -> Self {
        Self::new(name, Nesting::Close, line)
    }

    pub fn leaf(name: impl Into<SmolStr>, line: usize) -> Self {
        Self::new(name, Nesting::SelfClosing, line)
    }

    pub fn with_info(mut self, info: impl Into<SmolStr>) -> Self {
        self.info = info.into();
        self
    }

    pub fn with_markup(mut self, markup: impl Into<SmolStr>) -> Self {
        self.markup = markup.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }
}
