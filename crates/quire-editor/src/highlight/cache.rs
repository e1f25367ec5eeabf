//! Per-editor cache of code block decorations.
//!
//! Entries live in an arena keyed by [`BlockId`]. Each holds the block's
//! position in the current document, the text and language it was
//! tokenized from, and the resulting block-relative spans. A transaction
//! moves every entry through its mapping in one pass; blocks are only
//! re-tokenized when their snapshot changed.

use std::collections::{BTreeMap, HashMap};

use quire_model::{Mapping, Node};
use smol_str::SmolStr;

use super::languages::{Span, tokenize};
use crate::plugin::Decoration;

/// Stable identity of a cached block across transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u64);

/// What a block's decorations were computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub language: SmolStr,
}

impl Snapshot {
    pub fn of(node: &Node) -> Self {
        Self {
            text: node.text_content(),
            language: node
                .attr("language")
                .and_then(|v| v.as_str())
                .map(SmolStr::new)
                .unwrap_or_else(|| SmolStr::new_static("none")),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    pos: usize,
    snapshot: Snapshot,
    spans: Vec<Span>,
}

/// Counters from one [`DecorationCache::sync`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub kept: usize,
    pub tokenized: usize,
    pub evicted: usize,
}

#[derive(Debug, Default)]
pub struct DecorationCache {
    entries: BTreeMap<BlockId, Entry>,
    next_id: u64,
    /// Language ids that get highlighted; `None` allows all.
    languages: Option<Vec<SmolStr>>,
}

impl DecorationCache {
    pub fn new(languages: Option<Vec<SmolStr>>) -> Self {
        Self {
            languages,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move every entry through `mapping`, evicting blocks it deleted.
    pub fn map(&mut self, mapping: &Mapping) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            let result = mapping.map_result(entry.pos, 1);
            entry.pos = result.pos;
            !result.deleted
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::debug!(target: "quire::highlight", evicted, "deleted blocks evicted");
        }
    }

    /// Bring the cache in line with `doc`, whose code blocks are the nodes
    /// of type `code_type`. With `force` every block is re-tokenized.
    pub fn sync(&mut self, doc: &Node, code_type: &str, force: bool) -> SyncStats {
        let mut blocks = Vec::new();
        doc.descendants(&mut |node, pos, _, _| {
            if node.type_name() == code_type {
                blocks.push((pos, node.clone()));
                return false;
            }
            !node.is_textblock()
        });

        let mut by_pos: HashMap<usize, Vec<BlockId>> = HashMap::new();
        for (id, entry) in &self.entries {
            by_pos.entry(entry.pos).or_default().push(*id);
        }

        let mut stats = SyncStats::default();
        let mut live = BTreeMap::new();
        for (pos, node) in blocks {
            let snapshot = Snapshot::of(&node);
            let mut candidates = by_pos.remove(&pos).unwrap_or_default();
            if candidates.len() > 1 {
                tracing::warn!(
                    target: "quire::highlight",
                    pos,
                    entries = candidates.len(),
                    "several cache entries map to one block, recomputing"
                );
                candidates.clear();
            }
            let reused = candidates
                .first()
                .and_then(|id| self.entries.remove(id).map(|entry| (*id, entry)));
            let (id, entry) = match reused {
                Some((id, mut entry)) if !force && entry.snapshot == snapshot => {
                    entry.pos = pos;
                    stats.kept += 1;
                    (id, entry)
                }
                reused => {
                    let id = match reused {
                        Some((id, _)) => id,
                        None => self.allocate(),
                    };
                    stats.tokenized += 1;
                    let spans = self.tokenize(&snapshot);
                    (id, Entry { pos, snapshot, spans })
                }
            };
            live.insert(id, entry);
        }

        stats.evicted = self.entries.len();
        if stats.evicted > 0 {
            tracing::debug!(
                target: "quire::highlight",
                evicted = stats.evicted,
                "entries no longer on a code block evicted"
            );
        }
        self.entries = live;
        tracing::trace!(target: "quire::highlight", ?stats, "cache synced");
        stats
    }

    fn allocate(&mut self) -> BlockId {
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    fn tokenize(&self, snapshot: &Snapshot) -> Vec<Span> {
        let allowed = self
            .languages
            .as_ref()
            .is_none_or(|langs| langs.contains(&snapshot.language));
        if !allowed {
            return Vec::new();
        }
        tokenize(&snapshot.text, &snapshot.language)
    }

    /// Block-relative spans of the block at `pos`.
    pub fn spans_at(&self, pos: usize) -> Option<&[Span]> {
        self.entries
            .values()
            .find(|entry| entry.pos == pos)
            .map(|entry| entry.spans.as_slice())
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.entries.keys().copied()
    }

    /// All spans as absolute document ranges, in document order.
    pub fn decorations(&self) -> Vec<Decoration> {
        let mut out: Vec<Decoration> = self
            .entries
            .values()
            .flat_map(|entry| {
                let start = entry.pos + 1;
                entry
                    .spans
                    .iter()
                    .map(move |span| Decoration::new(start + span.from, start + span.to, span.class.clone()))
            })
            .collect();
        out.sort_by_key(|d| (d.from, d.to));
        out
    }
}
