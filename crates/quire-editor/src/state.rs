//! Editor state: document, selection, stored marks and undo history.

use std::sync::Arc;

use quire_model::{Mark, Node, Schema, Selection, Step, Transaction};

/// Meta key carrying `"undo"` or `"redo"` on history transactions.
pub const HISTORY_META: &str = "history";
/// Meta key set to `false` on changes that must not be undoable, such as
/// patches from another source. Their arrival clears the history.
pub const ADD_TO_HISTORY_META: &str = "add_to_history";

/// One undoable change: the steps that revert it and the selection to
/// restore.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub steps: Vec<Step>,
    pub selection: Selection,
}

/// Undo and redo stacks of inverted transactions.
#[derive(Debug, Clone)]
pub struct History {
    done: Vec<HistoryEntry>,
    undone: Vec<HistoryEntry>,
    max_steps: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    pub fn new(max_steps: usize) -> Self {
        Self {
            done: Vec::new(),
            undone: Vec::new(),
            max_steps,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.done.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undone.len()
    }

    /// The entry the next undo applies.
    pub fn next_undo(&self) -> Option<&HistoryEntry> {
        self.done.last()
    }

    /// The entry the next redo applies.
    pub fn next_redo(&self) -> Option<&HistoryEntry> {
        self.undone.last()
    }

    pub fn clear(&mut self) {
        self.done.clear();
        self.undone.clear();
    }

    fn record(&mut self, entry: HistoryEntry) {
        // Clear redo stack on new edit
        self.undone.clear();
        self.done.push(entry);
        while self.done.len() > self.max_steps {
            self.done.remove(0);
        }
    }
}

/// The state a command reads. Commands never mutate it; they return a
/// [`Transaction`] that the editor applies.
#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
    history: History,
    version: u64,
}

impl EditorState {
    pub fn new(schema: Arc<Schema>, doc: Node, history_depth: usize) -> Self {
        let start = start_of_text(&doc);
        Self {
            schema,
            doc,
            selection: Selection::cursor(start),
            stored_marks: None,
            history: History::new(history_depth),
            version: 0,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Marks to apply to the next typed text, when set explicitly.
    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Bumped on every document change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// A transaction starting from this state. Stored marks are not
    /// carried over; text insertion sets them itself.
    pub fn tr(&self) -> Transaction {
        Transaction::new(&self.doc, self.selection)
    }

    /// Move to the state after `tr`. The transaction must have been built
    /// from this state's document.
    pub fn apply(&mut self, tr: &Transaction) {
        if tr.doc_changed() {
            self.record_history(tr);
            self.doc = tr.doc().clone();
            self.version += 1;
        }
        self.selection = tr.selection();
        self.stored_marks = if tr.stored_marks_set() {
            tr.stored_marks().map(<[Mark]>::to_vec)
        } else if tr.doc_changed() || tr.selection_set() {
            None
        } else {
            self.stored_marks.take()
        };
    }

    /// Replace the document wholesale, as when loading new content. The
    /// history is cleared.
    pub fn reset(&mut self, doc: Node) {
        self.selection = Selection::cursor(start_of_text(&doc));
        self.doc = doc;
        self.stored_marks = None;
        self.history.clear();
        self.version += 1;
    }

    fn record_history(&mut self, tr: &Transaction) {
        if tr.meta(ADD_TO_HISTORY_META).and_then(|v| v.as_bool()) == Some(false) {
            tracing::debug!(target: "quire::editor", "untracked change, clearing history");
            self.history.clear();
            return;
        }
        let inverted = match tr.inverted_steps() {
            Ok(steps) => steps,
            Err(error) => {
                tracing::warn!(target: "quire::editor", %error, "cannot invert transaction, clearing history");
                self.history.clear();
                return;
            }
        };
        let entry = HistoryEntry {
            steps: inverted,
            selection: self.selection,
        };
        match tr.meta(HISTORY_META).and_then(|v| v.as_str()) {
            Some("undo") => {
                self.history.done.pop();
                self.history.undone.push(entry);
            }
            Some("redo") => {
                self.history.undone.pop();
                self.history.done.push(entry);
            }
            _ => self.history.record(entry),
        }
    }
}

/// Position inside the first textblock, or 0.
pub fn start_of_text(doc: &Node) -> usize {
    let mut found = None;
    doc.descendants(&mut |node, pos, _, _| {
        if found.is_some() {
            return false;
        }
        if node.is_textblock() {
            found = Some(pos + 1);
            return false;
        }
        true
    });
    found.unwrap_or(0)
}
