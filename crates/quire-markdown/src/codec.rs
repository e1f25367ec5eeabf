//! The composed markdown codec.

use std::collections::HashMap;
use std::sync::Arc;

use quire_model::{Node, Schema};
use smol_str::SmolStr;

use crate::block::{BlockRule, BlockTokenizer, split_lines};
use crate::error::{CodecError, MarkdownSyntaxError};
use crate::inline::{DelimiterSpec, InlineRule, InlineTokenizer};
use crate::parser::{ParseSpec, TreeBuilder};
use crate::serializer::{MarkWriter, MarkdownWriter, NodeWriter};
use crate::token::Token;

/// Markdown parser and serializer for one grammar.
///
/// Built once per composition with [`MarkdownCodecBuilder`] and shared
/// read-only afterwards.
pub struct MarkdownCodec {
    schema: Arc<Schema>,
    blocks: BlockTokenizer,
    inline: InlineTokenizer,
    token_specs: HashMap<SmolStr, ParseSpec>,
    node_writers: HashMap<SmolStr, NodeWriter>,
    mark_writers: HashMap<SmolStr, MarkWriter>,
}

impl std::fmt::Debug for MarkdownCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownCodec")
            .field("blocks", &self.blocks)
            .field("inline", &self.inline)
            .field("tokens", &self.token_specs.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl MarkdownCodec {
    pub fn builder(schema: Arc<Schema>) -> MarkdownCodecBuilder {
        MarkdownCodecBuilder::new(schema)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn block_rules(&self) -> Vec<&str> {
        self.blocks.rule_names()
    }

    pub fn inline_rules(&self) -> Vec<&str> {
        self.inline.rule_names()
    }

    /// Block and inline tokens for `text`. Inline tokens are attached as the
    /// children of each `inline` token.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, MarkdownSyntaxError> {
        let mut tokens = self.blocks.tokenize(&split_lines(text))?;
        for token in tokens.iter_mut().filter(|t| t.name == "inline") {
            token.children = self.inline.tokenize(&token.content, token.line);
        }
        Ok(tokens)
    }

    pub fn parse(&self, text: &str) -> Result<Node, MarkdownSyntaxError> {
        let tokens = self.tokenize(text)?;
        tracing::trace!(target: "quire::markdown", tokens = tokens.len(), "folding tokens");
        let mut builder = TreeBuilder::new(&self.schema, &self.token_specs);
        for token in &tokens {
            builder.feed(token)?;
        }
        builder.finish()
    }

    /// Parse, attaching `text` to any error so it renders with the failing
    /// line highlighted.
    pub fn parse_named(&self, name: &str, text: &str) -> Result<Node, MarkdownSyntaxError> {
        self.parse(text).map_err(|e| e.with_source(name, text))
    }

    /// Canonical markdown for `doc`. There is no trailing newline.
    pub fn serialize(&self, doc: &Node) -> String {
        let mut writer = MarkdownWriter::new(&self.node_writers, &self.mark_writers);
        writer.render_content(doc);
        writer.finish()
    }
}

/// Collects token specs, tokenizer rules and writers, then checks them
/// against the grammar.
pub struct MarkdownCodecBuilder {
    schema: Arc<Schema>,
    blocks: BlockTokenizer,
    inline: InlineTokenizer,
    token_specs: Vec<(SmolStr, ParseSpec)>,
    node_writers: HashMap<SmolStr, NodeWriter>,
    mark_writers: HashMap<SmolStr, MarkWriter>,
}

impl MarkdownCodecBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            blocks: BlockTokenizer::new(),
            inline: InlineTokenizer::new(),
            token_specs: Vec::new(),
            node_writers: HashMap::new(),
            mark_writers: HashMap::new(),
        }
    }

    pub fn block_rule(&mut self, rule: Arc<dyn BlockRule>) -> &mut Self {
        if !self.blocks.push(rule) {
            tracing::debug!(target: "quire::markdown", "block rule already registered, skipped");
        }
        self
    }

    pub fn inline_rule(&mut self, rule: Arc<dyn InlineRule>) -> &mut Self {
        if !self.inline.push_rule(rule) {
            tracing::debug!(target: "quire::markdown", "inline rule already registered, skipped");
        }
        self
    }

    pub fn delimiter(&mut self, spec: DelimiterSpec) -> &mut Self {
        self.inline.push(spec);
        self
    }

    /// Map a token name. The first mapping of a name wins.
    pub fn token(&mut self, name: impl Into<SmolStr>, spec: ParseSpec) -> &mut Self {
        let name = name.into();
        if !self.token_specs.iter().any(|(n, _)| *n == name) {
            self.token_specs.push((name, spec));
        }
        self
    }

    pub fn node_writer(&mut self, node: impl Into<SmolStr>, writer: NodeWriter) -> &mut Self {
        self.node_writers.entry(node.into()).or_insert(writer);
        self
    }

    pub fn mark_writer(&mut self, mark: impl Into<SmolStr>, writer: MarkWriter) -> &mut Self {
        self.mark_writers.entry(mark.into()).or_insert(writer);
        self
    }

    pub fn build(&mut self) -> Result<MarkdownCodec, CodecError> {
        for (token, spec) in &self.token_specs {
            if let Some(node) = spec.node_name() {
                if self.schema.node_type(node).is_none() {
                    return Err(CodecError::UnknownNodeType {
                        token: token.clone(),
                        node: node.clone(),
                    });
                }
            }
            if let Some(mark) = spec.mark_name() {
                if self.schema.mark_type(mark).is_none() {
                    return Err(CodecError::UnknownMarkType {
                        token: token.clone(),
                        mark: mark.clone(),
                    });
                }
            }
        }
        for ty in self.schema.node_types() {
            if ty.is_text() || ty == self.schema.top_node_type() {
                continue;
            }
            if !self.node_writers.contains_key(&ty.name) {
                return Err(CodecError::MissingWriter(ty.name.clone()));
            }
        }
        Ok(MarkdownCodec {
            schema: self.schema.clone(),
            blocks: std::mem::take(&mut self.blocks),
            inline: std::mem::take(&mut self.inline),
            token_specs: std::mem::take(&mut self.token_specs).into_iter().collect(),
            node_writers: std::mem::take(&mut self.node_writers),
            mark_writers: std::mem::take(&mut self.mark_writers),
        })
    }
}
