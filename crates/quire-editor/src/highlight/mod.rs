//! Syntax highlighting of code blocks as a plugin.
//!
//! Nothing is highlighted until the first-paint task runs, so opening a
//! large document does not block on tokenization. After that each
//! transaction only re-tokenizes the blocks it changed.

pub mod cache;
pub mod languages;

use quire_model::Transaction;
use smol_str::SmolStr;

pub use cache::{BlockId, DecorationCache, Snapshot, SyncStats};
pub use languages::{LANGUAGES, Language, Span, find_language, tokenize};

use crate::plugin::{Decoration, Plugin};
use crate::scheduler::Scheduler;
use crate::state::EditorState;

pub const PLUGIN_NAME: &str = "highlight";
pub const FIRST_PAINT_TASK: &str = "first_paint";
/// Meta key marking a transaction that patched the document from outside
/// the editor. All blocks are recomputed.
pub const REMOTE_PATCH_META: &str = "remote_patch";

#[derive(Debug, Clone)]
pub struct HighlightOptions {
    /// Node type name of code blocks.
    pub node: SmolStr,
    pub defer_first_paint: bool,
    /// Language ids that get highlighted; `None` allows all.
    pub languages: Option<Vec<SmolStr>>,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            node: SmolStr::new_static("code_block"),
            defer_first_paint: true,
            languages: None,
        }
    }
}

#[derive(Debug)]
pub struct HighlightPlugin {
    node: SmolStr,
    defer_first_paint: bool,
    settled: bool,
    cache: DecorationCache,
}

impl HighlightPlugin {
    pub fn new(options: HighlightOptions) -> Self {
        Self {
            node: options.node,
            defer_first_paint: options.defer_first_paint,
            settled: false,
            cache: DecorationCache::new(options.languages),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn cache(&self) -> &DecorationCache {
        &self.cache
    }

    fn settle(&mut self, state: &EditorState) {
        self.settled = true;
        let stats = self.cache.sync(state.doc(), &self.node, true);
        tracing::debug!(target: "quire::highlight", blocks = stats.tokenized, "first paint");
    }
}

impl Plugin for HighlightPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn init(&mut self, state: &EditorState, scheduler: &mut Scheduler) {
        if self.defer_first_paint {
            scheduler.schedule(PLUGIN_NAME, FIRST_PAINT_TASK);
        } else {
            self.settle(state);
        }
    }

    fn apply(&mut self, tr: &Transaction, state: &EditorState, _scheduler: &mut Scheduler) {
        if !self.settled {
            return;
        }
        let remote = tr.meta(REMOTE_PATCH_META).is_some_and(|v| v.as_bool() != Some(false));
        if !tr.doc_changed() && !remote {
            return;
        }
        self.cache.map(tr.mapping());
        self.cache.sync(state.doc(), &self.node, remote);
    }

    fn run_task(&mut self, task: &str, state: &EditorState) {
        match task {
            FIRST_PAINT_TASK if !self.settled => self.settle(state),
            FIRST_PAINT_TASK => {}
            other => tracing::warn!(target: "quire::highlight", task = other, "unknown task"),
        }
    }

    fn decorations(&self) -> Vec<Decoration> {
        self.cache.decorations()
    }
}

#[cfg(test)]
mod tests;
