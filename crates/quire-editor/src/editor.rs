//! One editing session over a shared composition.

use std::sync::Arc;

use quire_model::{Attrs, Node, Selection, Transaction};

use crate::commands;
use crate::error::EditorError;
use crate::input_rules::run_input_rules;
use crate::keymap::{KeyCombo, KeydownResult};
use crate::plugin::{Decoration, Plugin};
use crate::registry::Composition;
use crate::scheduler::Scheduler;
use crate::state::EditorState;

/// Undo depth used when none is configured.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// An editor: its own state, plugin instances and deferred work, over a
/// composition that may be shared with other editors.
pub struct Editor {
    composition: Arc<Composition>,
    state: EditorState,
    plugins: Vec<Box<dyn Plugin>>,
    scheduler: Scheduler,
    is_mac: bool,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("version", &self.state.version())
            .field("selection", &self.state.selection())
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("pending", &self.scheduler.len())
            .finish_non_exhaustive()
    }
}

impl Editor {
    pub fn new(composition: Arc<Composition>, doc: Node) -> Self {
        Self::with_history_depth(composition, doc, DEFAULT_HISTORY_DEPTH)
    }

    pub fn with_history_depth(composition: Arc<Composition>, doc: Node, history_depth: usize) -> Self {
        let state = EditorState::new(composition.schema.clone(), doc, history_depth);
        let mut plugins = composition.instantiate_plugins();
        let mut scheduler = Scheduler::new();
        scheduler.set_version(state.version());
        for plugin in &mut plugins {
            plugin.init(&state, &mut scheduler);
        }
        Self {
            composition,
            state,
            plugins,
            scheduler,
            is_mac: false,
        }
    }

    /// An empty document of the composition's grammar.
    pub fn empty(composition: Arc<Composition>) -> Result<Self, EditorError> {
        let doc = composition.schema.empty_doc()?;
        Ok(Self::new(composition, doc))
    }

    pub fn from_markdown(composition: Arc<Composition>, markdown: &str) -> Result<Self, EditorError> {
        let doc = composition.codec.parse(markdown)?;
        Ok(Self::new(composition, doc))
    }

    /// Resolve `Mod-` bindings to Cmd instead of Ctrl.
    pub fn set_mac(&mut self, is_mac: bool) {
        self.is_mac = is_mac;
    }

    pub fn composition(&self) -> &Arc<Composition> {
        &self.composition
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Node {
        self.state.doc()
    }

    pub fn to_markdown(&self) -> String {
        self.composition.codec.serialize(self.state.doc())
    }

    pub fn plugin(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.iter().find(|p| p.name() == name).map(|p| p.as_ref())
    }

    /// Apply `tr` and let every plugin see it.
    pub fn dispatch(&mut self, tr: Transaction) {
        self.state.apply(&tr);
        self.scheduler.set_version(self.state.version());
        for plugin in &mut self.plugins {
            plugin.apply(&tr, &self.state, &mut self.scheduler);
        }
    }

    /// Move the selection, clamped to the document.
    pub fn set_selection(&mut self, selection: Selection) {
        let size = self.state.doc().content_size();
        let mut tr = self.state.tr();
        tr.set_selection(Selection::new(selection.anchor.min(size), selection.head.min(size)));
        self.dispatch(tr);
    }

    /// Replace the document, as when loading from storage. Not undoable.
    pub fn set_markdown(&mut self, markdown: &str) -> Result<(), EditorError> {
        let doc = self.composition.codec.parse(markdown)?;
        let size = self.state.doc().content_size();
        let mut tr = self.state.tr();
        tr.replace(0, size, doc.content().clone())?;
        tr.set_meta(crate::state::ADD_TO_HISTORY_META, false);
        tr.set_selection(Selection::cursor(crate::state::start_of_text(tr.doc())));
        self.dispatch(tr);
        Ok(())
    }

    /// Run the command `name`. Every implementation registered under the
    /// name is tried in registration order against the current state.
    /// Returns whether any of them applied.
    pub fn invoke(&mut self, name: &str, attrs: &Attrs) -> Result<bool, EditorError> {
        let fns = self
            .composition
            .commands
            .get(name)
            .ok_or_else(|| EditorError::UnknownCommand(name.into()))?
            .to_vec();
        let mut applied = false;
        for f in fns {
            if let Some(tr) = f(&self.state, attrs)? {
                self.dispatch(tr);
                applied = true;
            }
        }
        tracing::debug!(target: "quire::editor", command = name, applied, "invoked");
        Ok(applied)
    }

    /// Run the bindings for `combo` in registration order until one applies.
    pub fn handle_key(&mut self, combo: &KeyCombo) -> Result<KeydownResult, EditorError> {
        let composition = self.composition.clone();
        for binding in composition.keymap.lookup(combo, self.is_mac) {
            if self.invoke(&binding.command, &binding.attrs)? {
                return Ok(KeydownResult::Handled);
            }
        }
        if combo.key.is_navigation() || combo.key.is_modifier() {
            return Ok(KeydownResult::PassThrough);
        }
        Ok(KeydownResult::NotHandled)
    }

    /// Typed text: an input rule when one fires, a plain insertion
    /// otherwise.
    pub fn handle_text_input(&mut self, text: &str) -> Result<bool, EditorError> {
        let rules = &self.composition.input_rules;
        if let Some((rule, tr)) = run_input_rules(rules, &self.state, text)? {
            tracing::trace!(target: "quire::editor", %rule, "text input consumed by rule");
            self.dispatch(tr);
            return Ok(true);
        }
        match commands::insert_text(&self.state, text)? {
            Some(tr) => {
                self.dispatch(tr);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run deferred tasks queued by plugins, dropping those made stale by
    /// later changes. Returns how many ran.
    pub fn run_deferred(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.scheduler.pop() {
            if task.is_stale(self.state.version()) {
                tracing::trace!(target: "quire::editor", plugin = %task.plugin, task = %task.task, "stale task dropped");
                continue;
            }
            match self.plugins.iter_mut().find(|p| p.name() == task.plugin) {
                Some(plugin) => {
                    plugin.run_task(&task.task, &self.state);
                    ran += 1;
                }
                None => {
                    tracing::warn!(target: "quire::editor", plugin = %task.plugin, "task for unknown plugin");
                }
            }
        }
        ran
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.scheduler.is_empty()
    }

    /// Decorations of every plugin, in document order.
    pub fn decorations(&self) -> Vec<Decoration> {
        let mut out: Vec<Decoration> = self.plugins.iter().flat_map(|p| p.decorations()).collect();
        out.sort_by_key(|d| (d.from, d.to));
        out
    }
}
