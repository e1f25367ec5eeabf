//! Extension registry: folds capability units into a composition.
//!
//! Composition is a pure function of the unit list. Order matters: key
//! bindings, input rules and command implementations keep registration
//! order, and the first registered markdown mapping for a token wins.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use quire_markdown::{MarkdownCodec, ParseSpec};
use quire_model::{Attrs, MarkSpec, NodeSpec, Schema};
use smol_str::SmolStr;

use crate::commands::toggle_mark;
use crate::error::{CapabilityKind, ConfigurationError};
use crate::extension::{CommandFn, Extension, PluginFactory, UnitContext, command};
use crate::input_rules::InputRule;
use crate::keymap::{KeyBinding, Keymap};
use crate::plugin::Plugin;

/// Command names to their implementations, in registration order.
#[derive(Clone, Default)]
pub struct CommandTable {
    order: Vec<SmolStr>,
    commands: HashMap<SmolStr, Vec<CommandFn>>,
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.order.iter().map(|name| (name, self.commands[name].len())))
            .finish()
    }
}

impl CommandTable {
    pub fn push(&mut self, name: SmolStr, f: CommandFn) {
        match self.commands.get_mut(&name) {
            Some(fns) => fns.push(f),
            None => {
                self.order.push(name.clone());
                self.commands.insert(name, vec![f]);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[CommandFn]> {
        self.commands.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Names in the order they were first registered.
    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A plugin factory bound to the context of the unit that declared it.
#[derive(Clone)]
pub struct PluginSlot {
    pub unit: SmolStr,
    context: UnitContext,
    factory: PluginFactory,
}

impl PluginSlot {
    pub fn instantiate(&self) -> Box<dyn Plugin> {
        (self.factory)(&self.context)
    }
}

/// Everything an editor needs, composed once and shared read-only.
pub struct Composition {
    pub schema: Arc<Schema>,
    pub codec: MarkdownCodec,
    pub keymap: Keymap,
    pub input_rules: Vec<InputRule>,
    pub commands: CommandTable,
    pub plugins: Vec<PluginSlot>,
    /// Unit names in registration order.
    pub units: Vec<(CapabilityKind, SmolStr)>,
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("units", &self.units)
            .field("keymap", &self.keymap.len())
            .field("input_rules", &self.input_rules)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl Composition {
    /// Fresh plugin instances for one editor.
    pub fn instantiate_plugins(&self) -> Vec<Box<dyn Plugin>> {
        self.plugins.iter().map(PluginSlot::instantiate).collect()
    }
}

pub struct ExtensionRegistry;

impl ExtensionRegistry {
    /// Compose `units` into a grammar, a markdown codec and the command,
    /// key and input rule tables.
    pub fn compose(units: Vec<Extension>) -> Result<Arc<Composition>, ConfigurationError> {
        check_duplicates(&units)?;

        let mut nodes: Vec<(SmolStr, NodeSpec)> = Vec::new();
        let mut marks: Vec<(SmolStr, MarkSpec)> = Vec::new();
        for unit in &units {
            match unit {
                Extension::Node(node) => nodes.push((node.name.clone(), node.spec.clone())),
                Extension::Mark(mark) => marks.push((mark.name.clone(), mark.spec.clone())),
                Extension::Behavior(_) => {}
            }
        }
        let schema = Arc::new(Schema::new(nodes, marks)?);
        tracing::debug!(
            target: "quire::registry",
            nodes = schema.node_types().len(),
            marks = schema.mark_types().len(),
            "grammar composed"
        );

        let codec = build_codec(&schema, &units)?;

        let mut keymap = Keymap::new();
        let mut input_rules = Vec::new();
        let mut commands = CommandTable::default();
        let mut plugins = Vec::new();
        let mut pending_keys = Vec::new();

        for unit in &units {
            let context = UnitContext {
                schema: schema.clone(),
                node_type: match unit {
                    Extension::Node(node) => schema.node_type(&node.name).cloned(),
                    _ => None,
                },
                mark_type: match unit {
                    Extension::Mark(mark) => schema.mark_type(&mark.name).cloned(),
                    _ => None,
                },
            };
            let capabilities = unit.capabilities();

            match (&capabilities.commands, &context.mark_type) {
                (Some(factory), _) => {
                    for (name, f) in factory(&context) {
                        commands.push(name, f);
                    }
                }
                (None, Some(mark_type)) => {
                    let ty = mark_type.clone();
                    commands.push(
                        unit.name().clone(),
                        command(move |state, attrs: &Attrs| toggle_mark(state, &ty, attrs)),
                    );
                }
                (None, None) => {}
            }

            if let Some(factory) = &capabilities.keys {
                for decl in factory(&context) {
                    let binding = KeyBinding::new(&decl.keys, decl.command.clone())
                        .map_err(|source| ConfigurationError::InvalidKeyBinding {
                            unit: unit.name().clone(),
                            source,
                        })?
                        .with_attrs(decl.attrs);
                    pending_keys.push((unit.name().clone(), decl.keys, binding));
                }
            }

            if let Some(factory) = &capabilities.input_rules {
                for spec in factory(&context) {
                    let name = spec.name.clone();
                    let rule = InputRule::compile(spec)
                        .map_err(|source| ConfigurationError::InputRulePattern { name, source })?;
                    input_rules.push(rule);
                }
            }

            if let Some(factory) = &capabilities.plugins {
                plugins.push(PluginSlot {
                    unit: unit.name().clone(),
                    context: context.clone(),
                    factory: factory.clone(),
                });
            }
        }

        // Bindings are checked once every unit had the chance to register
        // the command they name.
        for (unit, keys, binding) in pending_keys {
            if !commands.contains(&binding.command) {
                return Err(ConfigurationError::UnboundCommand {
                    unit,
                    keys,
                    command: binding.command,
                });
            }
            keymap.push(binding);
        }

        tracing::debug!(
            target: "quire::registry",
            units = units.len(),
            commands = commands.len(),
            bindings = keymap.len(),
            input_rules = input_rules.len(),
            plugins = plugins.len(),
            "composition ready"
        );

        Ok(Arc::new(Composition {
            schema,
            codec,
            keymap,
            input_rules,
            commands,
            plugins,
            units: units.iter().map(|u| (u.kind(), u.name().clone())).collect(),
        }))
    }
}

fn check_duplicates(units: &[Extension]) -> Result<(), ConfigurationError> {
    let mut seen = HashSet::new();
    for unit in units {
        if !seen.insert((unit.kind(), unit.name().clone())) {
            return Err(ConfigurationError::DuplicateCapability {
                kind: unit.kind(),
                name: unit.name().clone(),
            });
        }
    }
    Ok(())
}

fn build_codec(schema: &Arc<Schema>, units: &[Extension]) -> Result<MarkdownCodec, ConfigurationError> {
    let mut builder = MarkdownCodec::builder(schema.clone());
    // The default paragraph token is always there, whichever unit declares
    // the paragraph type.
    if schema.node_type("paragraph").is_some() {
        builder.token("paragraph", ParseSpec::block("paragraph"));
    }
    for unit in units {
        match unit {
            Extension::Node(node) => {
                let Some(markdown) = &node.markdown else { continue };
                for rule in &markdown.block_rules {
                    builder.block_rule(rule.clone());
                }
                for rule in &markdown.inline_rules {
                    builder.inline_rule(rule.clone());
                }
                for (token, spec) in &markdown.tokens {
                    builder.token(token.clone(), spec.clone());
                }
                builder.node_writer(node.name.clone(), markdown.writer);
            }
            Extension::Mark(mark) => {
                let Some(markdown) = &mark.markdown else { continue };
                for delimiter in &markdown.delimiters {
                    builder.delimiter(delimiter.clone());
                }
                builder
                    .token(markdown.token.clone(), markdown.spec.clone())
                    .mark_writer(mark.name.clone(), markdown.writer);
            }
            Extension::Behavior(_) => {}
        }
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use quire_model::{AttrSpec, NodeSpec};

    use super::*;
    use crate::builtins;
    use crate::extension::key;

    #[test]
    fn test_duplicate_node_unit_is_rejected() {
        let mut units = builtins::all();
        units.push(Extension::node(
            "heading",
            NodeSpec::new()
                .content("inline*")
                .group("block")
                .attr("level", AttrSpec::with_default(1)),
        ));
        let err = ExtensionRegistry::compose(units).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::DuplicateCapability { kind: CapabilityKind::Node, ref name } if name == "heading"
        ));
    }

    #[test]
    fn test_same_name_in_different_kinds_reaches_the_grammar() {
        let mut units = builtins::all();
        units.push(Extension::mark("paragraph", MarkSpec::new()));
        let err = ExtensionRegistry::compose(units).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidGrammar(_)));
    }

    #[test]
    fn test_unknown_content_reference_is_rejected() {
        let units = vec![
            Extension::node("doc", NodeSpec::new().content("figure+")),
            Extension::node("text", NodeSpec::new().group("inline")),
        ];
        let err = ExtensionRegistry::compose(units).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidGrammar(_)));
    }

    #[test]
    fn test_builtins_compose() {
        let composition = ExtensionRegistry::compose(builtins::all()).unwrap();
        assert!(composition.schema.node_type("checkbox_item").is_some());
        assert!(composition.commands.contains("strong"));
        assert!(composition.commands.contains("bullet_list"));
        assert_eq!(composition.plugins.len(), 1);
        // list_item and checkbox_item both back the item commands.
        assert_eq!(composition.commands.get("sink_list_item").unwrap().len(), 2);
    }

    #[test]
    fn test_mark_units_get_a_toggle_command() {
        let composition = ExtensionRegistry::compose(builtins::all()).unwrap();
        let names: Vec<&str> = composition.commands.names().map(|n| n.as_str()).collect();
        for mark in ["strong", "em", "strikethrough", "code_inline", "link"] {
            assert!(names.contains(&mark), "missing {mark}");
        }
    }

    #[test]
    fn test_binding_to_unknown_command_is_rejected() {
        let mut units = builtins::all();
        units.push(Extension::behavior("broken").with_keys(|_| vec![key("Mod-k", "no_such_command")]));
        let err = ExtensionRegistry::compose(units).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnboundCommand { ref command, .. } if command == "no_such_command"));
    }

    #[test]
    fn test_invalid_key_binding_is_rejected() {
        let mut units = builtins::all();
        units.push(Extension::behavior("broken").with_keys(|_| vec![key("Hyper-k", "undo")]));
        let err = ExtensionRegistry::compose(units).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidKeyBinding { ref unit, .. } if unit == "broken"));
    }
}
