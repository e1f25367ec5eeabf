//! quire-editor: composition, commands and editing sessions for quire.
//!
//! This crate provides:
//! - `Extension` - capability units declaring a node, a mark or a behavior
//! - `ExtensionRegistry` - folds units into a shared `Composition` (grammar,
//!   markdown codec, keymap, input rules, commands and plugin factories)
//! - `Editor` - one editing session: state, undo history, plugins and
//!   deferred tasks
//! - `builtins` - the stock units, and `EditorConfig` to pick among them
//! - `highlight` - code block highlighting backed by syntect

pub mod builtins;
pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod extension;
pub mod highlight;
pub mod input_rules;
pub mod keymap;
pub mod plugin;
pub mod registry;
pub mod scheduler;
pub mod state;

pub use config::{EditorConfig, HighlightConfig};
pub use editor::{DEFAULT_HISTORY_DEPTH, Editor};
pub use error::{CapabilityKind, ConfigurationError, EditorError};
pub use extension::{CommandFn, Extension, KeyDecl, MarkMarkdown, NodeMarkdown, UnitContext, command, key};
pub use highlight::{HighlightOptions, HighlightPlugin};
pub use input_rules::{InputRule, InputRuleSpec};
pub use keymap::{Key, KeyBinding, KeyCombo, KeydownResult, Keymap, Modifiers};
pub use plugin::{Decoration, Plugin};
pub use registry::{Composition, ExtensionRegistry};
pub use scheduler::Scheduler;
pub use state::EditorState;

#[cfg(test)]
pub(crate) mod test_support;
