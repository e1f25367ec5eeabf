//! Folding a token stream into a document tree.

use std::collections::HashMap;
use std::sync::Arc;

use quire_model::{Attrs, GrammarViolation, Mark, MarkType, Node, NodeType, Schema};
use smol_str::SmolStr;

use crate::error::MarkdownSyntaxError;
use crate::token::{Nesting, Token};

/// Attribute extraction for a token.
pub type AttrsFn = fn(&Token) -> Attrs;

/// How a token becomes part of the tree.
#[derive(Debug, Clone)]
pub enum ParseSpec {
    /// Open/close token pair wrapping child content.
    Block { node: SmolStr, get_attrs: Option<AttrsFn> },
    /// Self-closing token creating a leaf node (rules, hard breaks).
    Leaf { node: SmolStr, get_attrs: Option<AttrsFn> },
    /// Self-closing token whose content becomes the node's text.
    Code { node: SmolStr, get_attrs: Option<AttrsFn> },
    /// Open/close pair (or self-closing token with content) applying a mark.
    Mark { mark: SmolStr, get_attrs: Option<AttrsFn> },
    /// Dropped, children included.
    Ignore,
}

impl ParseSpec {
    pub fn block(node: impl Into<SmolStr>) -> Self {
        ParseSpec::Block {
            node: node.into(),
            get_attrs: None,
        }
    }

    pub fn leaf(node: impl Into<SmolStr>) -> Self {
        ParseSpec::Leaf {
            node: node.into(),
            get_attrs: None,
        }
    }

    pub fn code(node: impl Into<SmolStr>) -> Self {
        ParseSpec::Code {
            node: node.into(),
            get_attrs: None,
        }
    }

    pub fn mark(mark: impl Into<SmolStr>) -> Self {
        ParseSpec::Mark {
            mark: mark.into(),
            get_attrs: None,
        }
    }

    /// Use `f` instead of the token's own attributes.
    pub fn with_attrs(self, f: AttrsFn) -> Self {
        match self {
            ParseSpec::Block { node, .. } => ParseSpec::Block {
                node,
                get_attrs: Some(f),
            },
            ParseSpec::Leaf { node, .. } => ParseSpec::Leaf {
                node,
                get_attrs: Some(f),
            },
            ParseSpec::Code { node, .. } => ParseSpec::Code {
                node,
                get_attrs: Some(f),
            },
            ParseSpec::Mark { mark, .. } => ParseSpec::Mark {
                mark,
                get_attrs: Some(f),
            },
            ParseSpec::Ignore => ParseSpec::Ignore,
        }
    }

    /// Node type name this spec creates, if any.
    pub fn node_name(&self) -> Option<&SmolStr> {
        match self {
            ParseSpec::Block { node, .. } | ParseSpec::Leaf { node, .. } | ParseSpec::Code { node, .. } => {
                Some(node)
            }
            _ => None,
        }
    }

    pub fn mark_name(&self) -> Option<&SmolStr> {
        match self {
            ParseSpec::Mark { mark, .. } => Some(mark),
            _ => None,
        }
    }
}

fn token_attrs(get_attrs: &Option<AttrsFn>, token: &Token) -> Attrs {
    match get_attrs {
        Some(f) => f(token),
        None => token.attrs.clone(),
    }
}

/// Node under construction.
struct Frame {
    ty: Arc<NodeType>,
    attrs: Attrs,
    content: Vec<Node>,
    /// Token that opened the frame; `None` for the top node.
    token: Option<SmolStr>,
    line: usize,
}

/// Token fold state. Unknown tokens degrade to paragraphs and plain text.
pub(crate) struct TreeBuilder<'a> {
    schema: &'a Schema,
    specs: &'a HashMap<SmolStr, ParseSpec>,
    stack: Vec<Frame>,
    marks: Vec<Mark>,
    /// Unknown open tokens, so their close tokens can be skipped too.
    transparent: Vec<SmolStr>,
}

fn violation(line: usize, err: GrammarViolation) -> MarkdownSyntaxError {
    MarkdownSyntaxError::new(line, err.to_string())
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(schema: &'a Schema, specs: &'a HashMap<SmolStr, ParseSpec>) -> Self {
        Self {
            schema,
            specs,
            stack: vec![Frame {
                ty: schema.top_node_type().clone(),
                attrs: Attrs::new(),
                content: Vec::new(),
                token: None,
                line: 1,
            }],
            marks: Vec::new(),
            transparent: Vec::new(),
        }
    }

    fn node_type(&self, name: &str, line: usize) -> Result<&'a Arc<NodeType>, MarkdownSyntaxError> {
        self.schema
            .node_type(name)
            .ok_or_else(|| MarkdownSyntaxError::new(line, format!("unknown node type `{name}`")))
    }

    fn mark_type(&self, name: &str, line: usize) -> Result<&'a Arc<MarkType>, MarkdownSyntaxError> {
        self.schema
            .mark_type(name)
            .ok_or_else(|| MarkdownSyntaxError::new(line, format!("unknown mark type `{name}`")))
    }

    fn top(&mut self) -> &mut Frame {
        // The top node frame is never popped before `finish`.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn push_node(&mut self, node: Node) {
        self.top().content.push(node);
    }

    /// Add text with the current marks. Outside inline content the text is
    /// wrapped in a paragraph. Newlines become spaces outside code.
    fn add_text(&mut self, text: &str, line: usize) -> Result<(), MarkdownSyntaxError> {
        if text.is_empty() {
            return Ok(());
        }
        let in_code = self.top().ty.is_code();
        let text = if in_code { text.to_owned() } else { text.replace('\n', " ") };
        let node = self
            .schema
            .text(text, self.marks.clone())
            .map_err(|e| violation(line, e))?;
        if self.top().ty.inline_content() {
            self.push_node(node);
            return Ok(());
        }
        let paragraph = self.node_type("paragraph", line)?;
        let wrapped = paragraph
            .create(&Attrs::new(), vec![node], Vec::new())
            .map_err(|e| violation(line, e))?;
        self.push_node(wrapped);
        Ok(())
    }

    pub(crate) fn feed(&mut self, token: &Token) -> Result<(), MarkdownSyntaxError> {
        match token.name.as_str() {
            "inline" => {
                if !token.children.is_empty() {
                    for child in &token.children {
                        self.feed(child)?;
                    }
                } else if !token.content.is_empty() {
                    self.add_text(&token.content, token.line)?;
                }
                return Ok(());
            }
            "text" => return self.add_text(&token.content, token.line),
            _ => {}
        }

        let Some(spec) = self.specs.get(&token.name) else {
            return self.unknown(token);
        };
        match (spec, token.nesting) {
            (ParseSpec::Ignore, _) => {}
            (ParseSpec::Block { node, get_attrs }, Nesting::Open) => {
                let ty = self.node_type(node, token.line)?.clone();
                self.stack.push(Frame {
                    ty,
                    attrs: token_attrs(get_attrs, token),
                    content: Vec::new(),
                    token: Some(token.name.clone()),
                    line: token.line,
                });
            }
            (ParseSpec::Block { .. }, Nesting::Close) => self.close_frame(token)?,
            (ParseSpec::Block { node, get_attrs }, Nesting::SelfClosing)
            | (ParseSpec::Leaf { node, get_attrs }, _) => {
                let ty = self.node_type(node, token.line)?;
                let marks = if ty.is_inline() { self.marks.clone() } else { Vec::new() };
                let created = self
                    .schema
                    .create_and_fill(ty, &token_attrs(get_attrs, token), Vec::new(), marks)
                    .map_err(|e| violation(token.line, e))?
                    .ok_or_else(|| {
                        MarkdownSyntaxError::new(token.line, format!("cannot build an empty `{node}`"))
                    })?;
                self.push_node(created);
            }
            (ParseSpec::Code { node, get_attrs }, _) => {
                let ty = self.node_type(node, token.line)?;
                let mut children = Vec::new();
                if !token.content.is_empty() {
                    children.push(
                        self.schema
                            .text(token.content.as_str(), Vec::new())
                            .map_err(|e| violation(token.line, e))?,
                    );
                }
                let created = ty
                    .create_checked(&token_attrs(get_attrs, token), children, Vec::new())
                    .map_err(|e| violation(token.line, e))?;
                self.push_node(created);
            }
            (ParseSpec::Mark { mark, get_attrs }, nesting) => {
                let ty = self.mark_type(mark, token.line)?;
                // Close tokens carry no attributes; only the type matters.
                if nesting == Nesting::Close {
                    self.marks.retain(|m| m.ty.id != ty.id);
                    return Ok(());
                }
                let mark = ty
                    .create(&token_attrs(get_attrs, token))
                    .map_err(|e| violation(token.line, e))?;
                if nesting == Nesting::Open {
                    self.marks = mark.add_to_set(&self.marks);
                } else {
                    let saved = self.marks.clone();
                    self.marks = mark.add_to_set(&self.marks);
                    self.add_text(&token.content, token.line)?;
                    self.marks = saved;
                }
            }
        }
        Ok(())
    }

    fn unknown(&mut self, token: &Token) -> Result<(), MarkdownSyntaxError> {
        tracing::debug!(target: "quire::markdown", token = %token.name, line = token.line, "no parse spec, using fallback");
        match token.nesting {
            Nesting::Open => self.transparent.push(token.name.clone()),
            Nesting::Close => {
                if let Some(at) = self.transparent.iter().rposition(|n| *n == token.name) {
                    self.transparent.remove(at);
                }
            }
            Nesting::SelfClosing => {
                let text = if token.content.is_empty() {
                    token.markup.to_string()
                } else {
                    token.content.clone()
                };
                self.add_text(&text, token.line)?;
            }
        }
        Ok(())
    }

    fn close_frame(&mut self, token: &Token) -> Result<(), MarkdownSyntaxError> {
        let open = self.top().token.clone();
        if open.as_ref() != Some(&token.name) {
            return Err(MarkdownSyntaxError::new(
                token.line,
                format!(
                    "`{}` closed while `{}` is open",
                    token.name,
                    open.as_deref().unwrap_or("document")
                ),
            ));
        }
        let Some(frame) = self.stack.pop() else {
            return Err(MarkdownSyntaxError::new(token.line, "unbalanced block tokens"));
        };
        let node = self.build(frame)?;
        self.push_node(node);
        Ok(())
    }

    fn build(&self, frame: Frame) -> Result<Node, MarkdownSyntaxError> {
        let Frame {
            ty,
            attrs,
            content,
            line,
            ..
        } = frame;
        // Drop marks the parent does not allow rather than failing.
        let content: Vec<Node> = content
            .into_iter()
            .map(|child| {
                if child.is_inline() && !ty.allows_marks(child.marks()) {
                    let kept = child
                        .marks()
                        .iter()
                        .filter(|m| ty.allows_mark_type(&m.ty))
                        .cloned()
                        .collect();
                    child.mark(kept)
                } else {
                    child
                }
            })
            .collect();
        let name = ty.name.clone();
        self.schema
            .create_and_fill(&ty, &attrs, content, Vec::new())
            .map_err(|e| violation(line, e))?
            .ok_or_else(|| {
                MarkdownSyntaxError::new(line, format!("content does not fit into `{name}`"))
            })
    }

    pub(crate) fn finish(mut self) -> Result<Node, MarkdownSyntaxError> {
        if self.stack.len() > 1 {
            let line = self.top().line;
            let name = self.top().ty.name.clone();
            return Err(MarkdownSyntaxError::new(line, format!("unclosed `{name}`")));
        }
        let Some(frame) = self.stack.pop() else {
            return Err(MarkdownSyntaxError::new(1, "no document node"));
        };
        let doc = self.build(frame)?;
        doc.check().map_err(|e| violation(1, e))?;
        Ok(doc)
    }
}
