//! Capability units: the values an editor is composed from.
//!
//! A unit is plain data. It declares one node type, one mark type, or no
//! grammar at all, plus optional factories for keys, input rules, commands
//! and plugins. The registry folds a list of units into a composition.

use std::fmt;
use std::sync::Arc;

use quire_markdown::{BlockRule, DelimiterSpec, InlineRule, MarkWriter, NodeWriter, ParseSpec};
use quire_model::{Attrs, GrammarViolation, MarkSpec, MarkType, NodeSpec, NodeType, Schema, Transaction};
use smol_str::SmolStr;

use crate::error::CapabilityKind;
use crate::input_rules::InputRuleSpec;
use crate::plugin::Plugin;
use crate::state::EditorState;

/// A command: reads the state and returns the transaction to apply, or
/// `None` when it does not apply.
pub type CommandFn =
    Arc<dyn Fn(&EditorState, &Attrs) -> Result<Option<Transaction>, GrammarViolation> + Send + Sync>;

pub type KeysFactory = Arc<dyn Fn(&UnitContext) -> Vec<KeyDecl> + Send + Sync>;
pub type InputRulesFactory = Arc<dyn Fn(&UnitContext) -> Vec<InputRuleSpec> + Send + Sync>;
pub type CommandsFactory = Arc<dyn Fn(&UnitContext) -> Vec<(SmolStr, CommandFn)> + Send + Sync>;
pub type PluginFactory = Arc<dyn Fn(&UnitContext) -> Box<dyn Plugin> + Send + Sync>;

/// What a factory gets to see: the composed grammar and the unit's own type.
#[derive(Clone)]
pub struct UnitContext {
    pub schema: Arc<Schema>,
    pub node_type: Option<Arc<NodeType>>,
    pub mark_type: Option<Arc<MarkType>>,
}

impl fmt::Debug for UnitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitContext")
            .field("node_type", &self.node_type.as_ref().map(|t| &t.name))
            .field("mark_type", &self.mark_type.as_ref().map(|t| &t.name))
            .finish_non_exhaustive()
    }
}

/// A key binding as declared by a unit. The key string is parsed when the
/// registry is composed.
#[derive(Debug, Clone)]
pub struct KeyDecl {
    pub keys: SmolStr,
    pub command: SmolStr,
    pub attrs: Attrs,
}

/// Bind `keys` to the command `command`.
pub fn key(keys: &str, command: &str) -> KeyDecl {
    KeyDecl {
        keys: keys.into(),
        command: command.into(),
        attrs: Attrs::new(),
    }
}

impl KeyDecl {
    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }
}

/// Markdown mapping of a node unit.
#[derive(Clone)]
pub struct NodeMarkdown {
    /// Token names and how they fold into the tree.
    pub tokens: Vec<(SmolStr, ParseSpec)>,
    pub writer: NodeWriter,
    pub block_rules: Vec<Arc<dyn BlockRule>>,
    pub inline_rules: Vec<Arc<dyn InlineRule>>,
}

impl NodeMarkdown {
    pub fn new(writer: NodeWriter) -> Self {
        Self {
            tokens: Vec::new(),
            writer,
            block_rules: Vec::new(),
            inline_rules: Vec::new(),
        }
    }

    pub fn token(mut self, name: &str, spec: ParseSpec) -> Self {
        self.tokens.push((name.into(), spec));
        self
    }

    pub fn block_rule(mut self, rule: Arc<dyn BlockRule>) -> Self {
        self.block_rules.push(rule);
        self
    }

    pub fn inline_rule(mut self, rule: Arc<dyn InlineRule>) -> Self {
        self.inline_rules.push(rule);
        self
    }
}

/// Markdown mapping of a mark unit.
#[derive(Clone)]
pub struct MarkMarkdown {
    pub token: SmolStr,
    pub spec: ParseSpec,
    pub writer: MarkWriter,
    pub delimiters: Vec<DelimiterSpec>,
}

/// Factories shared by every unit kind.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub keys: Option<KeysFactory>,
    pub input_rules: Option<InputRulesFactory>,
    pub commands: Option<CommandsFactory>,
    pub plugins: Option<PluginFactory>,
}

#[derive(Clone)]
pub struct NodeExtension {
    pub name: SmolStr,
    pub spec: NodeSpec,
    pub markdown: Option<NodeMarkdown>,
    pub capabilities: Capabilities,
}

#[derive(Clone)]
pub struct MarkExtension {
    pub name: SmolStr,
    pub spec: MarkSpec,
    pub markdown: Option<MarkMarkdown>,
    pub capabilities: Capabilities,
}

#[derive(Clone)]
pub struct BehaviorExtension {
    pub name: SmolStr,
    pub capabilities: Capabilities,
}

/// A capability unit.
#[derive(Clone)]
pub enum Extension {
    Node(NodeExtension),
    Mark(MarkExtension),
    Behavior(BehaviorExtension),
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension::{:?}({})", self.kind(), self.name())
    }
}

impl Extension {
    pub fn node(name: &str, spec: NodeSpec) -> Self {
        Extension::Node(NodeExtension {
            name: name.into(),
            spec,
            markdown: None,
            capabilities: Capabilities::default(),
        })
    }

    pub fn mark(name: &str, spec: MarkSpec) -> Self {
        Extension::Mark(MarkExtension {
            name: name.into(),
            spec,
            markdown: None,
            capabilities: Capabilities::default(),
        })
    }

    pub fn behavior(name: &str) -> Self {
        Extension::Behavior(BehaviorExtension {
            name: name.into(),
            capabilities: Capabilities::default(),
        })
    }

    pub fn name(&self) -> &SmolStr {
        match self {
            Extension::Node(unit) => &unit.name,
            Extension::Mark(unit) => &unit.name,
            Extension::Behavior(unit) => &unit.name,
        }
    }

    pub fn kind(&self) -> CapabilityKind {
        match self {
            Extension::Node(_) => CapabilityKind::Node,
            Extension::Mark(_) => CapabilityKind::Mark,
            Extension::Behavior(_) => CapabilityKind::Behavior,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        match self {
            Extension::Node(unit) => &unit.capabilities,
            Extension::Mark(unit) => &unit.capabilities,
            Extension::Behavior(unit) => &unit.capabilities,
        }
    }

    fn capabilities_mut(&mut self) -> &mut Capabilities {
        match self {
            Extension::Node(unit) => &mut unit.capabilities,
            Extension::Mark(unit) => &mut unit.capabilities,
            Extension::Behavior(unit) => &mut unit.capabilities,
        }
    }

    /// Attach a node markdown mapping. Ignored on other unit kinds.
    pub fn with_node_markdown(mut self, markdown: NodeMarkdown) -> Self {
        if let Extension::Node(unit) = &mut self {
            unit.markdown = Some(markdown);
        }
        self
    }

    /// Attach a mark markdown mapping. Ignored on other unit kinds.
    pub fn with_mark_markdown(mut self, markdown: MarkMarkdown) -> Self {
        if let Extension::Mark(unit) = &mut self {
            unit.markdown = Some(markdown);
        }
        self
    }

    pub fn with_keys(
        mut self,
        f: impl Fn(&UnitContext) -> Vec<KeyDecl> + Send + Sync + 'static,
    ) -> Self {
        self.capabilities_mut().keys = Some(Arc::new(f));
        self
    }

    pub fn with_input_rules(
        mut self,
        f: impl Fn(&UnitContext) -> Vec<InputRuleSpec> + Send + Sync + 'static,
    ) -> Self {
        self.capabilities_mut().input_rules = Some(Arc::new(f));
        self
    }

    pub fn with_commands(
        mut self,
        f: impl Fn(&UnitContext) -> Vec<(SmolStr, CommandFn)> + Send + Sync + 'static,
    ) -> Self {
        self.capabilities_mut().commands = Some(Arc::new(f));
        self
    }

    pub fn with_plugin(
        mut self,
        f: impl Fn(&UnitContext) -> Box<dyn Plugin> + Send + Sync + 'static,
    ) -> Self {
        self.capabilities_mut().plugins = Some(Arc::new(f));
        self
    }
}

/// Wrap a closure as a [`CommandFn`].
pub fn command(
    f: impl Fn(&EditorState, &Attrs) -> Result<Option<Transaction>, GrammarViolation> + Send + Sync + 'static,
) -> CommandFn {
    Arc::new(f)
}
