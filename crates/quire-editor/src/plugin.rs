//! Per-editor plugins and the decorations they derive.

use quire_model::Transaction;
use smol_str::SmolStr;

use crate::scheduler::Scheduler;
use crate::state::EditorState;

/// A styled range of the document, in absolute positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub class: SmolStr,
}

impl Decoration {
    pub fn new(from: usize, to: usize, class: impl Into<SmolStr>) -> Self {
        Self {
            from,
            to,
            class: class.into(),
        }
    }
}

/// Plugin state owned by one editor. Instances come from the factories of
/// a composition, so no state is shared between editors.
pub trait Plugin: Send {
    fn name(&self) -> &str;

    /// Called once with the initial state.
    fn init(&mut self, _state: &EditorState, _scheduler: &mut Scheduler) {}

    /// Called after `tr` has been applied; `state` is the new state.
    fn apply(&mut self, tr: &Transaction, state: &EditorState, scheduler: &mut Scheduler);

    /// Run a task this plugin scheduled earlier.
    fn run_task(&mut self, _task: &str, _state: &EditorState) {}

    fn decorations(&self) -> Vec<Decoration> {
        Vec::new()
    }
}
