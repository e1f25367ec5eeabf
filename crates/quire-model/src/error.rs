//! Error types for grammar construction and document mutation.

use miette::Diagnostic;
use smol_str::SmolStr;

use crate::attrs::AttrKind;

/// Raised while compiling node and mark descriptors into a [`Schema`](crate::Schema).
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("content expression of `{node}` references unknown type or group `{name}`")]
    #[diagnostic(code(quire::schema::unknown_content))]
    UnknownContentName { node: SmolStr, name: SmolStr },

    #[error("mark `{mark}` excludes unknown mark or group `{name}`")]
    #[diagnostic(code(quire::schema::unknown_exclude))]
    UnknownExcludedMark { mark: SmolStr, name: SmolStr },

    #[error("node `{node}` allows unknown mark or group `{name}`")]
    #[diagnostic(code(quire::schema::unknown_mark))]
    UnknownAllowedMark { node: SmolStr, name: SmolStr },

    #[error("`{name}` is declared more than once")]
    #[diagnostic(code(quire::schema::duplicate))]
    DuplicateName { name: SmolStr },

    #[error("`{name}` is declared both as a node type and as a mark type")]
    #[diagnostic(code(quire::schema::collision))]
    NameCollision { name: SmolStr },

    #[error("grammar has no `{name}` node type")]
    #[diagnostic(
        code(quire::schema::missing),
        help("every grammar needs a `doc` top node and a `text` node")
    )]
    MissingType { name: SmolStr },

    #[error("invalid content expression `{expr}` for `{node}`: {message}")]
    #[diagnostic(code(quire::schema::content_syntax))]
    ContentSyntax {
        node: SmolStr,
        expr: SmolStr,
        message: String,
    },
}

/// A step or transaction would produce a tree that violates the grammar,
/// or refers to positions that do not exist. The document is left unchanged.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq)]
#[non_exhaustive]
pub enum GrammarViolation {
    #[error("invalid content for `{node}`: {content}")]
    #[diagnostic(code(quire::grammar::content))]
    InvalidContent { node: SmolStr, content: String },

    #[error("mark `{mark}` is not allowed inside `{node}`")]
    #[diagnostic(code(quire::grammar::mark))]
    MarkNotAllowed { node: SmolStr, mark: SmolStr },

    #[error("attribute `{attr}` of `{owner}` is missing")]
    #[diagnostic(code(quire::grammar::missing_attr))]
    MissingAttr { owner: SmolStr, attr: SmolStr },

    #[error("attribute `{attr}` of `{owner}` has kind {found}, expected {expected}")]
    #[diagnostic(code(quire::grammar::attr_kind))]
    AttrKind {
        owner: SmolStr,
        attr: SmolStr,
        expected: AttrKind,
        found: AttrKind,
    },

    #[error("attribute `{attr}` of `{owner}` is invalid: {reason}")]
    #[diagnostic(code(quire::grammar::invalid_attr))]
    InvalidAttr {
        owner: SmolStr,
        attr: SmolStr,
        reason: String,
    },

    #[error("text inside `{node}` contains a newline")]
    #[diagnostic(
        code(quire::grammar::newline),
        help("only code nodes hold newlines; use a line break node elsewhere")
    )]
    NewlineInText { node: SmolStr },

    #[error("unknown attribute `{attr}` on `{owner}`")]
    #[diagnostic(code(quire::grammar::unknown_attr))]
    UnknownAttr { owner: SmolStr, attr: SmolStr },

    #[error("position {pos} is out of range (document size {size})")]
    #[diagnostic(code(quire::grammar::position))]
    PositionOutOfRange { pos: usize, size: usize },

    #[error("invalid structure: {0}")]
    #[diagnostic(code(quire::grammar::structure))]
    Structure(String),
}

/// Failure converting a JSON value into a document tree.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum JsonError {
    #[error("unknown node type `{0}`")]
    #[diagnostic(code(quire::json::node_type))]
    UnknownNodeType(String),

    #[error("unknown mark type `{0}`")]
    #[diagnostic(code(quire::json::mark_type))]
    UnknownMarkType(String),

    #[error("malformed document JSON: {0}")]
    #[diagnostic(code(quire::json::malformed))]
    Malformed(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Invalid(#[from] GrammarViolation),

    #[error(transparent)]
    #[diagnostic(code(quire::json::syntax))]
    Syntax(#[from] serde_json::Error),
}
