//! Input rules: patterns over the text before the caret that turn typed
//! text into structure, like `## ` into a heading.

use std::fmt;
use std::sync::Arc;

use quire_model::{Attrs, GrammarViolation, MarkType, Node, NodeShell, NodeType, Transaction};
use regex::{Captures, Regex};
use smol_str::SmolStr;

use crate::commands::{attempt, lists};
use crate::state::EditorState;

/// How far back the text before the caret is read.
pub const MAX_MATCH: usize = 500;

/// Stand-in character for inline leaf nodes in the text before the caret.
const LEAF_CHAR: &str = "\u{fffc}";

pub type InputRuleHandler =
    Arc<dyn Fn(&EditorState, &InputMatch<'_>) -> Result<Option<Transaction>, GrammarViolation> + Send + Sync>;

/// An input rule as declared by a unit. The pattern is compiled when the
/// registry is composed.
#[derive(Clone)]
pub struct InputRuleSpec {
    pub name: SmolStr,
    pub pattern: String,
    pub handler: InputRuleHandler,
}

impl InputRuleSpec {
    pub fn new(
        name: &str,
        pattern: &str,
        handler: impl Fn(&EditorState, &InputMatch<'_>) -> Result<Option<Transaction>, GrammarViolation>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Clone)]
pub struct InputRule {
    pub name: SmolStr,
    regex: Regex,
    handler: InputRuleHandler,
}

impl fmt::Debug for InputRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputRule")
            .field("name", &self.name)
            .field("pattern", &self.regex.as_str())
            .finish_non_exhaustive()
    }
}

impl InputRule {
    pub fn compile(spec: InputRuleSpec) -> Result<Self, regex::Error> {
        Ok(Self {
            name: spec.name,
            regex: Regex::new(&spec.pattern)?,
            handler: spec.handler,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// A successful match, with helpers to turn byte offsets of the matched
/// text into document positions.
pub struct InputMatch<'t> {
    pub captures: Captures<'t>,
    text: &'t str,
    /// Document position of the first character of `text`.
    base: usize,
    /// Document position where the match starts.
    pub from: usize,
    /// End of the replaced range: the end of the selection.
    pub to: usize,
}

impl<'t> InputMatch<'t> {
    pub fn group(&self, i: usize) -> Option<&'t str> {
        self.captures.get(i).map(|m| m.as_str())
    }

    /// Document range of group `i`. Only the part before the caret exists
    /// in the document; the typed text is not inserted.
    pub fn group_range(&self, i: usize) -> Option<(usize, usize)> {
        let m = self.captures.get(i)?;
        Some((self.pos_of(m.start()), self.pos_of(m.end())))
    }

    fn pos_of(&self, byte: usize) -> usize {
        self.base + self.text[..byte].chars().count()
    }
}

/// Try `rules` in order for `typed` inserted over the current selection.
/// Returns the first rule that produced a transaction.
pub fn run_input_rules(
    rules: &[InputRule],
    state: &EditorState,
    typed: &str,
) -> Result<Option<(SmolStr, Transaction)>, GrammarViolation> {
    if rules.is_empty() {
        return Ok(None);
    }
    let selection = state.selection();
    let doc = state.doc();
    let from = doc.resolve(selection.from())?;
    let parent = from.parent();
    if !parent.is_textblock() || parent.ty().is_code() {
        return Ok(None);
    }
    let offset = from.parent_offset;
    let start = offset.saturating_sub(MAX_MATCH);
    let mut text = parent.text_between(start, offset, None, Some(LEAF_CHAR));
    let before_chars = offset - start;
    text.push_str(typed);
    let base = selection.from() - before_chars;

    for rule in rules {
        let Some(captures) = rule.regex.captures(&text) else {
            continue;
        };
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if whole.end() != text.len() {
            continue;
        }
        let match_start = base + text[..whole.start()].chars().count();
        // A match lying entirely inside the typed text has nothing to replace.
        if match_start > selection.from() {
            continue;
        }
        let m = InputMatch {
            captures,
            text: &text,
            base,
            from: match_start,
            to: selection.to(),
        };
        if let Some(tr) = (rule.handler)(state, &m)? {
            tracing::debug!(target: "quire::editor", rule = %rule.name, "input rule fired");
            return Ok(Some((rule.name.clone(), tr)));
        }
    }
    Ok(None)
}

/// Turn the textblock into `ty` when the pattern matches at its start.
pub fn textblock_type_rule(
    name: &str,
    pattern: &str,
    ty: Arc<NodeType>,
    get_attrs: fn(&InputMatch<'_>) -> Attrs,
) -> InputRuleSpec {
    InputRuleSpec::new(name, pattern, move |state, m| {
        attempt(state, |tr| {
            tr.delete(m.from, m.to)?;
            let doc = tr.doc().clone();
            let at = doc.resolve(m.from)?;
            if at.depth() == 0 {
                return Ok(false);
            }
            let pos = at.before(at.depth());
            tr.set_node_markup(pos, &ty, get_attrs(m))?;
            Ok(true)
        })
    })
}

/// Wrap the textblock in `ty` (with `item` nodes around each block when
/// given). When `join` accepts the node right before the new wrapper and
/// it is of the same type, the two are joined.
pub fn wrapping_rule(
    name: &str,
    pattern: &str,
    ty: Arc<NodeType>,
    item: Option<Arc<NodeType>>,
    get_attrs: fn(&InputMatch<'_>) -> Attrs,
    join: Option<fn(&InputMatch<'_>, &Node) -> bool>,
) -> InputRuleSpec {
    InputRuleSpec::new(name, pattern, move |state, m| {
        attempt(state, |tr| {
            tr.delete(m.from, m.to)?;
            let doc = tr.doc().clone();
            let at = doc.resolve(m.from)?;
            let Some(range) = at.block_range(&at, None) else {
                return Ok(false);
            };
            let attrs = get_attrs(m);
            let start = range.start();
            match &item {
                Some(item) => lists::wrap_range_in_list(tr, &range, &ty, item, attrs)?,
                None => {
                    tr.wrap(start, range.end(), NodeShell::new(ty.clone(), attrs), Vec::new())?;
                }
            }
            let doc = tr.doc().clone();
            let before = doc.resolve(start)?.node_before();
            if let Some(before) = before {
                let joinable = before.ty().id == ty.id && join.is_none_or(|f| f(m, &before));
                if joinable && tr.join(start, 1).is_err() {
                    tracing::trace!(target: "quire::editor", "wrapper not joined with previous sibling");
                }
            }
            Ok(true)
        })
    })
}

/// Apply `ty` to group 2 when group 1 (the delimited text) is complete,
/// dropping the delimiters.
pub fn mark_rule(name: &str, pattern: &str, ty: Arc<MarkType>) -> InputRuleSpec {
    InputRuleSpec::new(name, pattern, move |state, m| {
        let (Some((full_start, _)), Some((inner_start, inner_end))) = (m.group_range(1), m.group_range(2))
        else {
            return Ok(None);
        };
        if inner_end <= inner_start {
            return Ok(None);
        }
        let mark = ty.create(&Attrs::new())?;
        attempt(state, |tr| {
            if inner_end < m.to {
                tr.delete(inner_end, m.to)?;
            }
            if full_start < inner_start {
                tr.delete(full_start, inner_start)?;
            }
            let end = full_start + (inner_end - inner_start);
            tr.add_mark(full_start, end, &mark)?;
            let doc = tr.doc().clone();
            let mut marks = doc.resolve(end)?.marks();
            marks.retain(|other| other.ty.id != ty.id);
            tr.set_stored_marks(Some(marks));
            Ok(true)
        })
    })
}

/// Replace the matched text with the result of `replacement`.
pub fn text_rule(
    name: &str,
    pattern: &str,
    replacement: impl Fn(&InputMatch<'_>) -> String + Send + Sync + 'static,
) -> InputRuleSpec {
    InputRuleSpec::new(name, pattern, move |state, m| {
        let text = replacement(m);
        attempt(state, |tr| {
            tr.insert_text(state.schema(), &text, m.from, m.to)?;
            Ok(true)
        })
    })
}
