//! Errors raised while building a codec or parsing markdown.

use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};
use smol_str::SmolStr;

/// Malformed markdown structure. The line is 1-based.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[error("markdown syntax error on line {line}: {message}")]
#[diagnostic(code(quire::markdown::syntax))]
pub struct MarkdownSyntaxError {
    pub line: usize,
    pub message: String,
    #[source_code]
    src: Option<NamedSource<String>>,
    #[label("here")]
    err_location: Option<SourceSpan>,
    #[help]
    advice: Option<String>,
}

impl MarkdownSyntaxError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            src: None,
            err_location: None,
            advice: None,
        }
    }

    pub fn with_advice(mut self, advice: impl Into<String>) -> Self {
        self.advice = Some(advice.into());
        self
    }

    /// Attach the source text so the diagnostic can point at the line.
    pub fn with_source(self, name: impl AsRef<str>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_len = text
            .lines()
            .nth(self.line.saturating_sub(1))
            .map(str::len)
            .unwrap_or(0);
        let location = SourceSpan::new(
            SourceOffset::from_location(&text, self.line.max(1), 1),
            line_len,
        );
        Self {
            src: Some(NamedSource::new(name, text)),
            err_location: Some(location),
            ..self
        }
    }
}

/// A codec refers to grammar names that do not exist.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Diagnostic)]
#[non_exhaustive]
pub enum CodecError {
    #[error("token `{token}` maps to unknown node type `{node}`")]
    #[diagnostic(code(quire::markdown::unknown_node))]
    UnknownNodeType { token: SmolStr, node: SmolStr },

    #[error("token `{token}` maps to unknown mark type `{mark}`")]
    #[diagnostic(code(quire::markdown::unknown_mark))]
    UnknownMarkType { token: SmolStr, mark: SmolStr },

    #[error("no serializer for node type `{0}`")]
    #[diagnostic(
        code(quire::markdown::missing_writer),
        help("every node type in the grammar needs a markdown writer")
    )]
    MissingWriter(SmolStr),
}
