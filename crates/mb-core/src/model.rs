//! Core document model for Mailblocks templates.
//!
//! A template is a tree `Template → Section → Column → (Block | InnerSection)`
//! where an InnerSection again holds Columns. Nodes live in an arena
//! (`StableDiGraph`) and are addressed by `NodeIndex`; the parent of a node is
//! its single incoming edge, and sibling order is kept explicitly per parent
//! because document order is render order.
//!
//! Callers never touch node fields directly. All mutation goes through the
//! action methods on [`Template`], each of which records a [`Change`] that the
//! editor layer drains and publishes to its subscribers.

use crate::id::{ElementId, ElementKey};
use crate::style::{Device, StyleMap, StyleRecord, StyleValue, expand_derived, merge_for_device};
use crate::widgets::{self, BlockKind};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::Serialize;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::HashMap;

// ─── Element kinds ───────────────────────────────────────────────────────

/// The variant of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Document root.
    Template,
    /// Top-level row; holds Columns.
    Section,
    /// Holds Blocks and InnerSections. `width` is a percentage of the row.
    Column { width: f64 },
    /// A nested row inside a Column; holds Columns.
    InnerSection,
    /// Leaf widget.
    Block(BlockKind),
}

impl ElementKind {
    /// The `name` discriminator used in document JSON.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Template => "Template",
            ElementKind::Section => "Section",
            ElementKind::Column { .. } => "Column",
            ElementKind::InnerSection => "InnerSection",
            ElementKind::Block(_) => "Block",
        }
    }

    /// Prefix for minted IDs, also the start of the element's CSS class.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            ElementKind::Template => "template",
            ElementKind::Section => "section",
            ElementKind::Column { .. } => "column",
            ElementKind::InnerSection => "inner-section",
            ElementKind::Block(_) => "block",
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, ElementKind::Block(_))
    }

    pub fn block_kind(&self) -> Option<&BlockKind> {
        match self {
            ElementKind::Block(kind) => Some(kind),
            _ => None,
        }
    }

    /// Nesting rules of the editor. The model itself does not enforce them;
    /// the store and the linter do.
    pub fn accepts(&self, child: &ElementKind) -> bool {
        matches!(
            (self, child),
            (ElementKind::Template, ElementKind::Section)
                | (ElementKind::Section, ElementKind::Column { .. })
                | (ElementKind::InnerSection, ElementKind::Column { .. })
                | (ElementKind::Column { .. }, ElementKind::Block(_))
                | (ElementKind::Column { .. }, ElementKind::InnerSection)
        )
    }

    pub(crate) fn default_style(&self) -> StyleMap {
        match self {
            ElementKind::Template => widgets::template_style(),
            ElementKind::Section => widgets::section_style(),
            ElementKind::Column { .. } => widgets::column_style(),
            ElementKind::InnerSection => widgets::inner_section_style(),
            ElementKind::Block(_) => StyleMap::new(),
        }
    }

    pub(crate) fn default_data(&self) -> Map<String, Value> {
        match self {
            ElementKind::Block(kind) => widgets::block_data(kind),
            _ => Map::new(),
        }
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

/// A single node: identity, per-device styles and free-form content.
#[derive(Debug, Clone)]
pub struct Element {
    pub(crate) id: ElementId,
    pub(crate) key: ElementKey,
    pub(crate) kind: ElementKind,
    pub(crate) style: StyleRecord,
    pub(crate) data: Map<String, Value>,
}

impl Element {
    /// A new element with a fresh identity and the kind's construction defaults.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::fresh(kind.id_prefix()),
            key: ElementKey::next(),
            style: StyleRecord::from_desktop(kind.default_style()),
            data: kind.default_data(),
            kind,
        }
    }

    pub(crate) fn from_parts(
        id: ElementId,
        kind: ElementKind,
        style: StyleRecord,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            id,
            key: ElementKey::next(),
            kind,
            style,
            data,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn key(&self) -> ElementKey {
        self.key
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn style_record(&self) -> &StyleRecord {
        &self.style
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// A string field of `data`; numbers are stringified, blanks are `None`.
    pub fn data_str(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Column width in percent.
    pub fn width(&self) -> Option<f64> {
        match self.kind {
            ElementKind::Column { width } => Some(width),
            _ => None,
        }
    }

    /// The render-ready style for `device`: cascaded, then derived keys expanded.
    pub fn computed_style(&self, device: Device) -> StyleMap {
        expand_derived(merge_for_device(&self.style, device))
    }

    /// Same content, brand-new identity.
    fn duplicate(&self) -> Self {
        Self {
            id: ElementId::fresh(self.kind.id_prefix()),
            key: ElementKey::next(),
            kind: self.kind.clone(),
            style: self.style.clone(),
            data: self.data.clone(),
        }
    }
}

/// An owned subtree that is not (or no longer) part of a template.
///
/// Produced by the constructors below, by [`Template::clone_element`], by
/// detaching, and by JSON import; consumed by [`Template::add_child`].
#[derive(Debug, Clone)]
pub struct ElementTree {
    pub(crate) element: Element,
    pub(crate) children: Vec<ElementTree>,
}

impl ElementTree {
    pub fn new(kind: ElementKind) -> Self {
        Self {
            element: Element::new(kind),
            children: Vec::new(),
        }
    }

    pub fn section() -> Self {
        Self::new(ElementKind::Section)
    }

    pub fn column(width: f64) -> Self {
        Self::new(ElementKind::Column { width })
    }

    pub fn inner_section() -> Self {
        Self::new(ElementKind::InnerSection)
    }

    pub fn block(kind: BlockKind) -> Self {
        Self::new(ElementKind::Block(kind))
    }

    /// A Section with one Column per width.
    pub fn section_with_columns(widths: &[f64]) -> Self {
        widths
            .iter()
            .fold(Self::section(), |section, w| section.with_child(Self::column(*w)))
    }

    pub fn with_child(mut self, child: ElementTree) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_style(mut self, device: Device, prop: &str, value: impl Into<StyleValue>) -> Self {
        self.element
            .style
            .bucket_mut(device)
            .insert(prop.to_string(), value.into());
        self
    }

    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.element.data.insert(key.to_string(), value.into());
        self
    }

    pub fn id(&self) -> ElementId {
        self.element.id
    }

    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn children(&self) -> &[ElementTree] {
        &self.children
    }

    /// Number of elements in this subtree, including the root.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ElementTree::count).sum::<usize>()
    }

    /// Deep copy with fresh IDs and keys at every level.
    pub fn duplicate(&self) -> Self {
        Self {
            element: self.element.duplicate(),
            children: self.children.iter().map(ElementTree::duplicate).collect(),
        }
    }
}

// ─── Change journal ──────────────────────────────────────────────────────

/// A mutation that happened to a template, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Change {
    StyleUpdated {
        id: ElementId,
        device: Device,
        field: String,
    },
    DataUpdated {
        id: ElementId,
        key: String,
    },
    WidthUpdated {
        id: ElementId,
        width: f64,
    },
    ChildAdded {
        parent: ElementId,
        child: ElementId,
        index: usize,
    },
    ChildRemoved {
        parent: ElementId,
        child: ElementId,
    },
    ChildMoved {
        child: ElementId,
        from: ElementId,
        to: ElementId,
        index: usize,
    },
    ChildrenReordered {
        parent: ElementId,
    },
}

// ─── Template ────────────────────────────────────────────────────────────

type ChildList = SmallVec<[NodeIndex; 4]>;

/// The complete document: an arena of elements rooted at a Template node.
#[derive(Debug, Clone)]
pub struct Template {
    graph: StableDiGraph<Element, ()>,
    root: NodeIndex,
    id_index: HashMap<ElementId, NodeIndex>,
    child_order: HashMap<NodeIndex, ChildList>,
    changes: Vec<Change>,
}

impl Template {
    /// An empty template with body-level default styles.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(Element::new(ElementKind::Template))
    }

    pub(crate) fn with_root(root: Element) -> Self {
        let mut graph = StableDiGraph::new();
        let id = root.id;
        let root = graph.add_node(root);
        let mut id_index = HashMap::new();
        id_index.insert(id, root);
        Self {
            graph,
            root,
            id_index,
            child_order: HashMap::new(),
            changes: Vec::new(),
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn root_id(&self) -> ElementId {
        self.graph[self.root].id
    }

    pub fn root_element(&self) -> &Element {
        &self.graph[self.root]
    }

    pub fn index_of(&self, id: ElementId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn element_at(&self, idx: NodeIndex) -> Option<&Element> {
        self.graph.node_weight(idx)
    }

    /// Look up any element of the document by ID.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn element_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).next()
    }

    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        let idx = self.index_of(id)?;
        self.parent_index(idx).map(|p| self.graph[p].id)
    }

    /// Children of a node in document order.
    pub fn children(&self, idx: NodeIndex) -> &[NodeIndex] {
        self.child_order
            .get(&idx)
            .map(|order| order.as_slice())
            .unwrap_or(&[])
    }

    pub fn children_of(&self, id: ElementId) -> Vec<ElementId> {
        self.index_of(id)
            .map(|idx| self.children(idx).iter().map(|c| self.graph[*c].id).collect())
            .unwrap_or_default()
    }

    /// Position of `id` among its siblings.
    pub fn position_of(&self, id: ElementId) -> Option<usize> {
        let idx = self.index_of(id)?;
        let parent = self.parent_index(idx)?;
        self.children(parent).iter().position(|c| *c == idx)
    }

    /// Depth-first search of `scope` and its descendants.
    pub fn find_by_id(&self, scope: ElementId, id: ElementId) -> Option<&Element> {
        let start = self.index_of(scope)?;
        self.find_in(start, id).map(|idx| &self.graph[idx])
    }

    fn find_in(&self, idx: NodeIndex, id: ElementId) -> Option<NodeIndex> {
        if self.graph[idx].id == id {
            return Some(idx);
        }
        self.children(idx).iter().find_map(|c| self.find_in(*c, id))
    }

    /// Pre-order IDs of `id` and everything below it.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if let Some(idx) = self.index_of(id) {
            self.collect_preorder(idx, &mut out);
        }
        out
    }

    fn collect_preorder(&self, idx: NodeIndex, out: &mut Vec<ElementId>) {
        out.push(self.graph[idx].id);
        for child in self.children(idx) {
            self.collect_preorder(*child, out);
        }
    }

    /// Pre-order walk of the whole document with depth (root is depth 0).
    pub fn walk(&self) -> Vec<(NodeIndex, usize)> {
        let mut out = Vec::with_capacity(self.element_count());
        let mut stack = vec![(self.root, 0)];
        while let Some((idx, depth)) = stack.pop() {
            out.push((idx, depth));
            for child in self.children(idx).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }

    /// Is `ancestor` a parent, grandparent, … of `descendant`?
    pub fn is_ancestor_of(&self, ancestor: ElementId, descendant: ElementId) -> bool {
        if ancestor == descendant {
            return false;
        }
        let Some(mut current) = self.index_of(descendant) else {
            return false;
        };
        while let Some(parent) = self.parent_index(current) {
            if self.graph[parent].id == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Computed style of an element for `device`.
    pub fn style(&self, id: ElementId, device: Device) -> Option<StyleMap> {
        self.get(id).map(|e| e.computed_style(device))
    }

    /// Owned copy of a subtree, IDs preserved.
    pub fn subtree(&self, id: ElementId) -> Option<ElementTree> {
        self.index_of(id).map(|idx| self.subtree_at(idx))
    }

    pub(crate) fn subtree_at(&self, idx: NodeIndex) -> ElementTree {
        ElementTree {
            element: self.graph[idx].clone(),
            children: self
                .children(idx)
                .iter()
                .map(|c| self.subtree_at(*c))
                .collect(),
        }
    }

    /// Deep copy of a subtree with fresh IDs and keys, ready to be inserted.
    pub fn clone_element(&self, id: ElementId) -> Option<ElementTree> {
        self.subtree(id).map(|tree| tree.duplicate())
    }

    // ─── Actions ─────────────────────────────────────────────────────────

    /// Set a style property in one device bucket, or delete it with `None`
    /// so the bucket inherits again.
    pub fn update(
        &mut self,
        id: ElementId,
        device: Device,
        field: &str,
        value: Option<StyleValue>,
    ) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let bucket = self.graph[idx].style.bucket_mut(device);
        match value {
            Some(value) => {
                log::trace!("style {id}.{field}@{device} = {value}");
                bucket.insert(field.to_string(), value);
            }
            None => {
                log::trace!("style {id}.{field}@{device} cleared");
                bucket.remove(field);
            }
        }
        self.changes.push(Change::StyleUpdated {
            id,
            device,
            field: field.to_string(),
        });
        true
    }

    /// Set one entry of an element's free-form data. No validation.
    pub fn update_data(&mut self, id: ElementId, key: &str, value: Value) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        self.graph[idx].data.insert(key.to_string(), value);
        self.changes.push(Change::DataUpdated {
            id,
            key: key.to_string(),
        });
        true
    }

    /// Change a Column's width. Other kinds are left alone.
    pub fn set_column_width(&mut self, id: ElementId, width: f64) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let width = width.clamp(0.0, 100.0);
        match &mut self.graph[idx].kind {
            ElementKind::Column { width: w } => *w = width,
            _ => return false,
        }
        self.changes.push(Change::WidthUpdated { id, width });
        true
    }

    /// Insert a detached subtree under `parent` at `index` (appends when
    /// `None` or out of range). Returns the ID the subtree root ended up with.
    ///
    /// IDs that already exist in this document are re-minted so CSS classes
    /// stay unique. No cycle or nesting checks are done here.
    pub fn add_child(
        &mut self,
        parent: ElementId,
        tree: ElementTree,
        index: Option<usize>,
    ) -> Option<ElementId> {
        let parent_idx = self.index_of(parent)?;
        let idx = self.insert_tree(parent_idx, tree, index);
        let child = self.graph[idx].id;
        let index = self.children(parent_idx).iter().position(|c| *c == idx).unwrap_or(0);
        log::debug!("added {child} under {parent} at {index}");
        self.changes.push(Change::ChildAdded {
            parent,
            child,
            index,
        });
        Some(child)
    }

    pub(crate) fn insert_tree(
        &mut self,
        parent: NodeIndex,
        tree: ElementTree,
        index: Option<usize>,
    ) -> NodeIndex {
        let ElementTree {
            mut element,
            children,
        } = tree;
        if self.id_index.contains_key(&element.id) {
            let minted = ElementId::fresh(element.kind.id_prefix());
            log::warn!("duplicate element id {} re-minted as {minted}", element.id);
            element.id = minted;
        }
        let id = element.id;
        let idx = self.graph.add_node(element);
        self.graph.add_edge(parent, idx, ());
        self.id_index.insert(id, idx);

        let order = self.child_order.entry(parent).or_default();
        let at = index.unwrap_or(order.len()).min(order.len());
        order.insert(at, idx);

        for child in children {
            self.insert_tree(idx, child, None);
        }
        idx
    }

    /// Detach the child `id` of `parent`. No-op (`None`) if `id` is not a
    /// direct child of `parent`.
    pub fn remove_child(&mut self, parent: ElementId, id: ElementId) -> Option<ElementTree> {
        let parent_idx = self.index_of(parent)?;
        let idx = self.index_of(id)?;
        if self.parent_index(idx) != Some(parent_idx) {
            return None;
        }
        if let Some(order) = self.child_order.get_mut(&parent_idx) {
            order.retain(|c| *c != idx);
        }
        let tree = self.take_tree(idx)?;
        log::debug!("removed {id} from {parent}");
        self.changes.push(Change::ChildRemoved { parent, child: id });
        Some(tree)
    }

    /// Detach `id` from whatever parent it has. The root cannot be removed.
    pub fn remove(&mut self, id: ElementId) -> Option<ElementTree> {
        let parent = self.parent_of(id)?;
        self.remove_child(parent, id)
    }

    fn take_tree(&mut self, idx: NodeIndex) -> Option<ElementTree> {
        let order = self.child_order.remove(&idx).unwrap_or_default();
        let children = order
            .into_iter()
            .filter_map(|c| self.take_tree(c))
            .collect();
        let element = self.graph.remove_node(idx)?;
        self.id_index.remove(&element.id);
        Some(ElementTree { element, children })
    }

    /// Reattach an existing node under a new parent. The node keeps its
    /// identity, styles and subtree; nothing is copied.
    ///
    /// Refuses to move the root, or to move a node into its own subtree.
    pub fn move_element(&mut self, id: ElementId, new_parent: ElementId, index: Option<usize>) -> bool {
        let (Some(idx), Some(target)) = (self.index_of(id), self.index_of(new_parent)) else {
            return false;
        };
        if id == new_parent || self.is_ancestor_of(id, new_parent) {
            return false;
        }
        let Some(old_parent) = self.parent_index(idx) else {
            return false;
        };

        if let Some(order) = self.child_order.get_mut(&old_parent) {
            order.retain(|c| *c != idx);
        }
        if let Some(edge) = self.graph.find_edge(old_parent, idx) {
            self.graph.remove_edge(edge);
        }
        self.graph.add_edge(target, idx, ());

        let order = self.child_order.entry(target).or_default();
        let at = index.unwrap_or(order.len()).min(order.len());
        order.insert(at, idx);

        let from = self.graph[old_parent].id;
        log::debug!("moved {id} from {from} to {new_parent} at {at}");
        self.changes.push(Change::ChildMoved {
            child: id,
            from,
            to: new_parent,
            index: at,
        });
        true
    }

    /// Replace the child order of `parent` with `ids`.
    ///
    /// IDs that are not children of `parent` are skipped; children missing
    /// from `ids` keep their relative order after the listed ones.
    pub fn reorder_children(&mut self, parent: ElementId, ids: &[ElementId]) -> bool {
        let Some(parent_idx) = self.index_of(parent) else {
            return false;
        };
        let current: ChildList = self.children(parent_idx).iter().copied().collect();
        let mut next: ChildList = SmallVec::with_capacity(current.len());
        for id in ids {
            if let Some(idx) = self.index_of(*id)
                && current.contains(&idx)
                && !next.contains(&idx)
            {
                next.push(idx);
            }
        }
        for idx in &current {
            if !next.contains(idx) {
                next.push(*idx);
            }
        }
        self.child_order.insert(parent_idx, next);
        self.changes.push(Change::ChildrenReordered { parent });
        true
    }

    /// Take every change recorded since the last drain.
    pub fn drain_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}
