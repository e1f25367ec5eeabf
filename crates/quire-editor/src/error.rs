//! Errors raised while composing extensions and while editing.

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use quire_markdown::{CodecError, MarkdownSyntaxError};
use quire_model::{GrammarViolation, SchemaError};
use smol_str::SmolStr;

use crate::keymap::KeySpecError;

/// Which registry namespace a duplicate name was found in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Node,
    Mark,
    Behavior,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CapabilityKind::Node => "node",
            CapabilityKind::Mark => "mark",
            CapabilityKind::Behavior => "behavior",
        })
    }
}

/// Composition or configuration failed. No registry is produced.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("{kind} extension `{name}` is registered more than once")]
    #[diagnostic(
        code(quire::config::duplicate),
        help("each node, mark and behavior name may be registered once")
    )]
    DuplicateCapability { kind: CapabilityKind, name: SmolStr },

    #[error("composed grammar is invalid")]
    #[diagnostic(code(quire::config::grammar))]
    InvalidGrammar(
        #[from]
        #[diagnostic_source]
        SchemaError,
    ),

    #[error("markdown mapping is inconsistent with the grammar")]
    #[diagnostic(code(quire::config::markdown))]
    Codec(
        #[from]
        #[diagnostic_source]
        CodecError,
    ),

    #[error("input rule `{name}` has an invalid pattern")]
    #[diagnostic(code(quire::config::input_rule))]
    InputRulePattern {
        name: SmolStr,
        #[source]
        source: regex::Error,
    },

    #[error("extension `{unit}` declares an invalid key binding")]
    #[diagnostic(
        code(quire::config::key_binding),
        help("bindings look like `Mod-b`, `Shift-Ctrl-1` or `Shift-Tab`")
    )]
    InvalidKeyBinding {
        unit: SmolStr,
        #[source]
        source: KeySpecError,
    },

    #[error("extension `{unit}` binds `{keys}` to unknown command `{command}`")]
    #[diagnostic(code(quire::config::unknown_command))]
    UnboundCommand {
        unit: SmolStr,
        keys: SmolStr,
        command: SmolStr,
    },

    #[error("unknown extension `{0}`")]
    #[diagnostic(
        code(quire::config::unknown_extension),
        help("run `quire commands` to see the built-in extensions")
    )]
    UnknownExtension(SmolStr),

    #[error("failed to read config file {}", path.display())]
    #[diagnostic(code(quire::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML config")]
    #[diagnostic(code(quire::config::toml))]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON config")]
    #[diagnostic(code(quire::config::json))]
    Json(#[from] serde_json::Error),
}

/// An editor operation failed. "Not applicable" is reported as `false`,
/// never as an error.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EditorError {
    #[error("unknown command `{0}`")]
    #[diagnostic(code(quire::editor::unknown_command))]
    UnknownCommand(SmolStr),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarViolation),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Markdown(#[from] MarkdownSyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigurationError),
}
