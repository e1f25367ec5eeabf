//! Tree grammar: node and mark descriptors compiled into a [`Schema`].
//!
//! Descriptors ([`NodeSpec`], [`MarkSpec`]) are plain data contributed by
//! extension units. [`Schema::new`] validates them as a whole (unique names,
//! resolvable content expressions, a `doc` top node and a `text` node) and
//! produces shared [`NodeType`] / [`MarkType`] values that document nodes
//! point to.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use smol_str::SmolStr;

use crate::attrs::{AttrSpec, AttrValue, Attrs};
use crate::content::ContentExpr;
use crate::error::{GrammarViolation, SchemaError};
use crate::mark::Mark;
use crate::node::{Fragment, Node};

/// Name of the top node type every grammar must declare.
pub const TOP_NODE: &str = "doc";
/// Name of the text node type every grammar must declare.
pub const TEXT_NODE: &str = "text";

/// Serialization hint for a view layer: an element template with an
/// optional content hole. The core never reads view state back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomSpec {
    pub tag: SmolStr,
    pub attrs: Vec<(SmolStr, String)>,
    /// Whether children render inside this element.
    pub hole: bool,
}

impl DomSpec {
    pub fn new(tag: impl Into<SmolStr>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            hole: true,
        }
    }

    pub fn leaf(tag: impl Into<SmolStr>) -> Self {
        Self {
            hole: false,
            ..Self::new(tag)
        }
    }

    pub fn attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }
}

pub type NodeDomFn = fn(&Node) -> DomSpec;
pub type MarkDomFn = fn(&Mark) -> DomSpec;

/// Which marks a node's children may carry.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MarkAllowance {
    /// Marks allowed only when the node has inline content.
    #[default]
    Inherit,
    All,
    None,
    /// Mark names or mark groups.
    Names(Vec<SmolStr>),
}

/// Descriptor of a node type.
#[derive(Clone, Debug, Default)]
pub struct NodeSpec {
    /// Content expression; empty for leaf nodes.
    pub content: SmolStr,
    /// Space separated group names.
    pub group: SmolStr,
    pub attrs: BTreeMap<SmolStr, AttrSpec>,
    pub marks: MarkAllowance,
    pub inline: bool,
    pub atom: bool,
    /// Content is code: no input rules, no marks, whitespace preserved.
    pub code: bool,
    /// Node keeps its identity when content is replaced into it.
    pub defining: bool,
    pub to_dom: Option<NodeDomFn>,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, expr: impl Into<SmolStr>) -> Self {
        self.content = expr.into();
        self
    }

    pub fn group(mut self, group: impl Into<SmolStr>) -> Self {
        self.group = group.into();
        self
    }

    pub fn attr(mut self, name: impl Into<SmolStr>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn marks(mut self, marks: MarkAllowance) -> Self {
        self.marks = marks;
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn to_dom(mut self, f: NodeDomFn) -> Self {
        self.to_dom = Some(f);
        self
    }
}

/// Descriptor of a mark type.
#[derive(Clone, Debug)]
pub struct MarkSpec {
    pub attrs: BTreeMap<SmolStr, AttrSpec>,
    /// Space separated names or groups of marks that cannot coexist with
    /// this one. `_` excludes every mark. A mark always excludes its own type.
    pub excludes: SmolStr,
    /// Whether typing at the end of the mark extends it.
    pub inclusive: bool,
    pub group: SmolStr,
    pub to_dom: Option<MarkDomFn>,
}

impl Default for MarkSpec {
    fn default() -> Self {
        Self {
            attrs: BTreeMap::new(),
            excludes: SmolStr::default(),
            inclusive: true,
            group: SmolStr::default(),
            to_dom: None,
        }
    }
}

impl MarkSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: impl Into<SmolStr>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn excludes(mut self, excludes: impl Into<SmolStr>) -> Self {
        self.excludes = excludes.into();
        self
    }

    pub fn inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = inclusive;
        self
    }

    pub fn group(mut self, group: impl Into<SmolStr>) -> Self {
        self.group = group.into();
        self
    }

    pub fn to_dom(mut self, f: MarkDomFn) -> Self {
        self.to_dom = Some(f);
        self
    }
}

/// Compiled node type. Nodes hold it through an `Arc`.
#[derive(Debug)]
pub struct NodeType {
    pub name: SmolStr,
    /// Registration index within the schema.
    pub id: usize,
    pub spec: NodeSpec,
    groups: Vec<SmolStr>,
    content: ContentExpr,
    inline_content: bool,
    /// `None` means every mark is allowed.
    allowed_marks: Option<Vec<usize>>,
    /// Types that can fill missing content, in schema order.
    fill_candidates: Vec<usize>,
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name
    }
}

impl NodeType {
    pub fn is_text(&self) -> bool {
        self.name == TEXT_NODE
    }

    pub fn is_inline(&self) -> bool {
        self.spec.inline || self.is_text()
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content
    }

    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.spec.atom
    }

    pub fn is_code(&self) -> bool {
        self.spec.code
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn content_expr(&self) -> &ContentExpr {
        &self.content
    }

    pub fn has_required_attrs(&self) -> bool {
        self.spec.attrs.values().any(AttrSpec::is_required)
    }

    pub fn allows_mark_type(&self, mark: &MarkType) -> bool {
        match &self.allowed_marks {
            None => true,
            Some(ids) => ids.contains(&mark.id),
        }
    }

    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        marks.iter().all(|m| self.allows_mark_type(&m.ty))
    }

    /// Whether `content` is valid for this type (children and their marks).
    pub fn valid_content(&self, content: &Fragment) -> bool {
        let ids: Vec<usize> = content.iter().map(|n| n.ty().id).collect();
        self.content.matches(&ids) && content.iter().all(|n| self.allows_marks(n.marks()))
    }

    /// Whether a child list of the given types would be valid.
    pub fn valid_types(&self, ids: &[usize]) -> bool {
        self.content.matches(ids)
    }

    /// Fill in defaults and check attribute kinds.
    pub fn compute_attrs(&self, given: &Attrs) -> Result<Attrs, GrammarViolation> {
        compute_attrs(&self.name, &self.spec.attrs, given)
    }

    /// Display hint for a view layer.
    pub fn to_dom(&self, node: &Node) -> Option<DomSpec> {
        self.spec.to_dom.map(|f| f(node))
    }

    /// Create a node without validating its content.
    pub fn create(
        self: &Arc<Self>,
        attrs: &Attrs,
        content: impl Into<Fragment>,
        marks: Vec<Mark>,
    ) -> Result<Node, GrammarViolation> {
        if self.is_text() {
            return Err(GrammarViolation::Structure(
                "text nodes are created with Schema::text".into(),
            ));
        }
        let attrs = self.compute_attrs(attrs)?;
        Ok(Node::new(self.clone(), attrs, content.into(), marks))
    }

    /// Create a node, failing when the content does not match the grammar.
    pub fn create_checked(
        self: &Arc<Self>,
        attrs: &Attrs,
        content: impl Into<Fragment>,
        marks: Vec<Mark>,
    ) -> Result<Node, GrammarViolation> {
        let node = self.create(attrs, content, marks)?;
        if !self.valid_content(node.content()) {
            return Err(GrammarViolation::InvalidContent {
                node: self.name.clone(),
                content: node.content().to_string(),
            });
        }
        self.check_newlines(node.content())?;
        Ok(node)
    }

    /// Newlines in text are only valid inside code.
    pub(crate) fn check_newlines(&self, content: &Fragment) -> Result<(), GrammarViolation> {
        let stray = !self.is_code()
            && content
                .iter()
                .any(|child| child.text().is_some_and(|text| text.contains('\n')));
        if stray {
            return Err(GrammarViolation::NewlineInText {
                node: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Compiled mark type. The id doubles as rank: mark sets are kept sorted by it.
#[derive(Debug)]
pub struct MarkType {
    pub name: SmolStr,
    pub id: usize,
    pub spec: MarkSpec,
    groups: Vec<SmolStr>,
    excluded: Vec<usize>,
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name
    }
}

impl MarkType {
    pub fn rank(&self) -> usize {
        self.id
    }

    pub fn excludes(&self, other: &MarkType) -> bool {
        self.excluded.contains(&other.id)
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn create(self: &Arc<Self>, attrs: &Attrs) -> Result<Mark, GrammarViolation> {
        let attrs = compute_attrs(&self.name, &self.spec.attrs, attrs)?;
        Ok(Mark {
            ty: self.clone(),
            attrs,
        })
    }

    pub fn to_dom(&self, mark: &Mark) -> Option<DomSpec> {
        self.spec.to_dom.map(|f| f(mark))
    }

    /// The mark of this type in `set`, if any.
    pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
        set.iter().find(|m| m.ty.id == self.id)
    }
}

fn compute_attrs(
    owner: &SmolStr,
    specs: &BTreeMap<SmolStr, AttrSpec>,
    given: &Attrs,
) -> Result<Attrs, GrammarViolation> {
    let mut out = Attrs::new();
    for (name, spec) in specs {
        let value = match given.get(name) {
            Some(value) => value.clone(),
            None => match &spec.default {
                Some(default) => default.clone(),
                None => {
                    return Err(GrammarViolation::MissingAttr {
                        owner: owner.clone(),
                        attr: name.clone(),
                    });
                }
            },
        };
        check_kind(owner, name, spec, &value)?;
        let value = match spec.coerce {
            Some(coerce) => coerce(value).map_err(|reason| GrammarViolation::InvalidAttr {
                owner: owner.clone(),
                attr: name.clone(),
                reason,
            })?,
            None => value,
        };
        out.insert(name.clone(), value);
    }
    for name in given.keys() {
        if !specs.contains_key(name) {
            return Err(GrammarViolation::UnknownAttr {
                owner: owner.clone(),
                attr: name.clone(),
            });
        }
    }
    Ok(out)
}

pub(crate) fn check_kind(
    owner: &SmolStr,
    name: &SmolStr,
    spec: &AttrSpec,
    value: &AttrValue,
) -> Result<(), GrammarViolation> {
    let Some(default) = &spec.default else {
        return Ok(());
    };
    if default.is_null() || value.is_null() || default.kind() == value.kind() {
        return Ok(());
    }
    Err(GrammarViolation::AttrKind {
        owner: owner.clone(),
        attr: name.clone(),
        expected: default.kind(),
        found: value.kind(),
    })
}

/// A validated grammar: the merged node and mark types of all units.
#[derive(Debug)]
pub struct Schema {
    nodes: Vec<Arc<NodeType>>,
    marks: Vec<Arc<MarkType>>,
    node_index: HashMap<SmolStr, usize>,
    mark_index: HashMap<SmolStr, usize>,
}

fn split_groups(group: &str) -> Vec<SmolStr> {
    group.split_whitespace().map(SmolStr::new).collect()
}

impl Schema {
    /// Compile node and mark descriptors, in registration order.
    pub fn new(
        nodes: Vec<(SmolStr, NodeSpec)>,
        marks: Vec<(SmolStr, MarkSpec)>,
    ) -> Result<Self, SchemaError> {
        let mut node_index = HashMap::new();
        for (i, (name, _)) in nodes.iter().enumerate() {
            if node_index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateName { name: name.clone() });
            }
        }
        let mut mark_index = HashMap::new();
        for (i, (name, _)) in marks.iter().enumerate() {
            if node_index.contains_key(name) {
                return Err(SchemaError::NameCollision { name: name.clone() });
            }
            if mark_index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateName { name: name.clone() });
            }
        }
        for required in [TOP_NODE, TEXT_NODE] {
            if !node_index.contains_key(required) {
                return Err(SchemaError::MissingType {
                    name: SmolStr::new(required),
                });
            }
        }

        let node_groups: Vec<Vec<SmolStr>> =
            nodes.iter().map(|(_, s)| split_groups(&s.group)).collect();
        let mark_groups: Vec<Vec<SmolStr>> =
            marks.iter().map(|(_, s)| split_groups(&s.group)).collect();

        let resolve_node = |name: &str| -> Option<Vec<usize>> {
            if let Some(i) = node_index.get(name) {
                return Some(vec![*i]);
            }
            let ids: Vec<usize> = node_groups
                .iter()
                .enumerate()
                .filter(|(_, groups)| groups.iter().any(|g| g == name))
                .map(|(i, _)| i)
                .collect();
            (!ids.is_empty()).then_some(ids)
        };
        let resolve_mark = |name: &str| -> Option<Vec<usize>> {
            if name == "_" {
                return Some((0..marks.len()).collect());
            }
            if let Some(i) = mark_index.get(name) {
                return Some(vec![*i]);
            }
            let ids: Vec<usize> = mark_groups
                .iter()
                .enumerate()
                .filter(|(_, groups)| groups.iter().any(|g| g == name))
                .map(|(i, _)| i)
                .collect();
            (!ids.is_empty()).then_some(ids)
        };

        let mut exprs = Vec::with_capacity(nodes.len());
        for (name, spec) in &nodes {
            exprs.push(ContentExpr::parse(name, &spec.content, resolve_node)?);
        }

        let is_inline = |i: usize| nodes[i].1.inline || nodes[i].0 == TEXT_NODE;
        let fill_candidates: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(i, (name, spec))| {
                name != TEXT_NODE
                    && name != TOP_NODE
                    && !spec.attrs.values().any(AttrSpec::is_required)
                    && !is_inline(*i)
            })
            .map(|(i, _)| i)
            .collect();

        let mut compiled_marks = Vec::with_capacity(marks.len());
        for (id, (name, spec)) in marks.iter().enumerate() {
            let mut excluded = vec![id];
            for ex in spec.excludes.split_whitespace() {
                let ids = resolve_mark(ex).ok_or_else(|| SchemaError::UnknownExcludedMark {
                    mark: name.clone(),
                    name: SmolStr::new(ex),
                })?;
                for other in ids {
                    if !excluded.contains(&other) {
                        excluded.push(other);
                    }
                }
            }
            compiled_marks.push(Arc::new(MarkType {
                name: name.clone(),
                id,
                spec: spec.clone(),
                groups: mark_groups[id].clone(),
                excluded,
            }));
        }

        let mut compiled_nodes = Vec::with_capacity(nodes.len());
        for (id, ((name, spec), content)) in nodes.iter().zip(exprs).enumerate() {
            let inline_content = content.referenced().iter().any(|i| is_inline(*i));
            let allowed_marks = match &spec.marks {
                MarkAllowance::All => None,
                MarkAllowance::None => Some(Vec::new()),
                MarkAllowance::Inherit if inline_content => None,
                MarkAllowance::Inherit => Some(Vec::new()),
                MarkAllowance::Names(names) => {
                    let mut ids = Vec::new();
                    for n in names {
                        let found =
                            resolve_mark(n).ok_or_else(|| SchemaError::UnknownAllowedMark {
                                node: name.clone(),
                                name: n.clone(),
                            })?;
                        ids.extend(found);
                    }
                    Some(ids)
                }
            };
            let candidates = fill_candidates
                .iter()
                .copied()
                .filter(|c| content.referenced().contains(c))
                .collect();
            compiled_nodes.push(Arc::new(NodeType {
                name: name.clone(),
                id,
                spec: spec.clone(),
                groups: node_groups[id].clone(),
                content,
                inline_content,
                allowed_marks,
                fill_candidates: candidates,
            }));
        }

        tracing::debug!(
            target: "quire::schema",
            nodes = compiled_nodes.len(),
            marks = compiled_marks.len(),
            "compiled grammar"
        );

        Ok(Self {
            nodes: compiled_nodes,
            marks: compiled_marks,
            node_index,
            mark_index,
        })
    }

    pub fn node_type(&self, name: &str) -> Option<&Arc<NodeType>> {
        self.node_index.get(name).map(|i| &self.nodes[*i])
    }

    pub fn mark_type(&self, name: &str) -> Option<&Arc<MarkType>> {
        self.mark_index.get(name).map(|i| &self.marks[*i])
    }

    pub fn node_types(&self) -> &[Arc<NodeType>] {
        &self.nodes
    }

    pub fn mark_types(&self) -> &[Arc<MarkType>] {
        &self.marks
    }

    pub fn node_by_id(&self, id: usize) -> &Arc<NodeType> {
        &self.nodes[id]
    }

    /// The `doc` type. Its presence is checked in [`Schema::new`].
    pub fn top_node_type(&self) -> &Arc<NodeType> {
        &self.nodes[self.node_index[TOP_NODE]]
    }

    pub fn text_type(&self) -> &Arc<NodeType> {
        &self.nodes[self.node_index[TEXT_NODE]]
    }

    /// A text node. Empty text is not a valid node.
    pub fn text(&self, text: impl Into<SmolStr>, marks: Vec<Mark>) -> Result<Node, GrammarViolation> {
        let text = text.into();
        if text.is_empty() {
            return Err(GrammarViolation::Structure("empty text node".into()));
        }
        Ok(Node::new_text(self.text_type().clone(), text, marks))
    }

    /// The first type that can start `parent`'s content and can be created
    /// without attributes.
    pub fn default_type(&self, parent: &NodeType) -> Option<&Arc<NodeType>> {
        parent
            .fill_candidates
            .iter()
            .map(|id| &self.nodes[*id])
            .find(|ty| parent.content.can_start_with(ty.id))
    }

    /// Default child type accepted at `index` of `parent`, given the
    /// children before it.
    pub fn default_type_at(&self, parent: &Node, index: usize) -> Option<&Arc<NodeType>> {
        let before: Vec<usize> = parent.content().iter().take(index).map(|n| n.ty().id).collect();
        let expr = &parent.ty().content;
        parent.ty().fill_candidates.iter().map(|id| &self.nodes[*id]).find(|ty| {
            let mut ids = before.clone();
            ids.push(ty.id);
            expr.can_complete(&ids)
        })
    }

    /// Create a node of `ty`, adding default children around `content` so it
    /// satisfies the grammar. `None` when no filling works.
    pub fn create_and_fill(
        &self,
        ty: &Arc<NodeType>,
        attrs: &Attrs,
        content: Vec<Node>,
        marks: Vec<Mark>,
    ) -> Result<Option<Node>, GrammarViolation> {
        self.create_and_fill_depth(ty, attrs, content, marks, 0)
    }

    fn create_and_fill_depth(
        &self,
        ty: &Arc<NodeType>,
        attrs: &Attrs,
        content: Vec<Node>,
        marks: Vec<Mark>,
        depth: usize,
    ) -> Result<Option<Node>, GrammarViolation> {
        let fragment = Fragment::from_vec(content);
        if ty.valid_content(&fragment) {
            return ty.create(attrs, fragment, marks).map(Some);
        }
        if depth > 4 {
            return Ok(None);
        }
        let ids: Vec<usize> = fragment.iter().map(|n| n.ty().id).collect();
        let Some((before, after)) = ty.content.fill_around(&ids, &ty.fill_candidates) else {
            return Ok(None);
        };
        let mut children = Vec::with_capacity(before.len() + fragment.child_count() + after.len());
        for id in before {
            match self.create_and_fill_depth(&self.nodes[id], &Attrs::new(), Vec::new(), Vec::new(), depth + 1)? {
                Some(n) => children.push(n),
                None => return Ok(None),
            }
        }
        children.extend(fragment.iter().cloned());
        for id in after {
            match self.create_and_fill_depth(&self.nodes[id], &Attrs::new(), Vec::new(), Vec::new(), depth + 1)? {
                Some(n) => children.push(n),
                None => return Ok(None),
            }
        }
        let fragment = Fragment::from_vec(children);
        if !ty.valid_content(&fragment) {
            return Ok(None);
        }
        ty.create(attrs, fragment, marks).map(Some)
    }

    /// An empty document: the top node filled with default content.
    pub fn empty_doc(&self) -> Result<Node, GrammarViolation> {
        self.create_and_fill(self.top_node_type(), &Attrs::new(), Vec::new(), Vec::new())?
            .ok_or_else(|| GrammarViolation::Structure("cannot build an empty document".into()))
    }
}
