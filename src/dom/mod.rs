//! DOM Arena - the document tree the binding engine mutates.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Slots released
//! by [`Dom::free_subtree`] are reused; a generation counter keeps stale
//! ids from reaching the new occupant. A [`Dom`] is a cheap `Rc` handle;
//! clones share the same document.
//!
//! # Borrowing
//!
//! No method holds the document borrowed while user code runs. Listener
//! callbacks and microtasks are cloned or popped out first, so they are free
//! to mutate the tree.
//!
//! # Architecture
//!
//! ```text
//! host <my-list>
//!   └─ #shadow-root (open)
//!        ├─ <ul>
//!        │    ├─ <!--items-->
//!        │    ├─ <li data-on-click="4">   ← reconciled item
//!        │    └─ <!--//items-->
//!        └─ <button data-on-click="2">
//! ```

mod builder;
mod event;
mod walk;

pub use builder::ElementBuilder;
pub use event::{Event, EventPhase, ListenerCallback, ListenerId, ListenerOptions};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::error::DomError;

use event::Listener;

// =============================================================================
// Node Types
// =============================================================================

/// Slot of a node in its document arena, plus the slot's generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShadowMode {
    #[default]
    Open,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element { tag: String },
    Text,
    Comment,
    Fragment,
    ShadowRoot { mode: ShadowMode, host: NodeId },
}

impl NodeKind {
    fn accepts_children(&self) -> bool {
        matches!(
            self,
            Self::Element { .. } | Self::Fragment | Self::ShadowRoot { .. }
        )
    }
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<(String, String)>,
    value: String,
    listeners: Vec<Listener>,
    shadow_root: Option<NodeId>,
    generation: u32,
    live: bool,
}

impl NodeData {
    fn new(kind: NodeKind, value: String, generation: u32) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
            value,
            listeners: Vec::new(),
            shadow_root: None,
            generation,
            live: true,
        }
    }
}

/// Mutation counters, used to check that updates stay minimal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DomStats {
    pub nodes_created: u64,
    pub nodes_freed: u64,
    pub attribute_writes: u64,
    pub insertions: u64,
    pub removals: u64,
}

struct DomInner {
    nodes: Vec<NodeData>,
    /// Released slots, reused before the arena grows.
    free: Vec<usize>,
    stats: DomStats,
    next_listener: u64,
    microtasks: VecDeque<Box<dyn FnOnce()>>,
}

impl DomInner {
    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes
            .get(id.index)
            .filter(|data| data.live && data.generation == id.generation)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes
            .get_mut(id.index)
            .filter(|data| data.live && data.generation == id.generation)
    }

    fn live_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }
}

// =============================================================================
// Document Handle
// =============================================================================

#[derive(Clone)]
pub struct Dom {
    inner: Rc<RefCell<DomInner>>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Dom")
            .field("nodes", &inner.live_count())
            .field("slots", &inner.nodes.len())
            .field("stats", &inner.stats)
            .finish()
    }
}

impl Dom {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(DomInner {
                nodes: Vec::new(),
                free: Vec::new(),
                stats: DomStats::default(),
                next_listener: 0,
                microtasks: VecDeque::new(),
            })),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn stats(&self) -> DomStats {
        self.inner.borrow().stats
    }

    pub fn reset_stats(&self) {
        self.inner.borrow_mut().stats = DomStats::default();
    }

    /// Nodes currently allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.inner.borrow().live_count()
    }

    fn create(&self, kind: NodeKind, value: String) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        inner.stats.nodes_created += 1;
        match inner.free.pop() {
            Some(index) => {
                let generation = inner.nodes[index].generation;
                inner.nodes[index] = NodeData::new(kind, value, generation);
                NodeId { index, generation }
            }
            None => {
                let index = inner.nodes.len();
                inner.nodes.push(NodeData::new(kind, value, 0));
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn exists(&self, node: NodeId) -> bool {
        self.inner.borrow().node(node).is_some()
    }

    fn check(&self, node: NodeId) -> Result<(), DomError> {
        if self.exists(node) {
            Ok(())
        } else {
            Err(DomError::UnknownNode(node))
        }
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.create(
            NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
            },
            String::new(),
        )
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.create(NodeKind::Text, text.to_string())
    }

    pub fn create_comment(&self, text: &str) -> NodeId {
        self.create(NodeKind::Comment, text.to_string())
    }

    pub fn create_fragment(&self) -> NodeId {
        self.create(NodeKind::Fragment, String::new())
    }

    /// Create a fragment holding `children`, in order.
    pub fn fragment(&self, children: impl IntoIterator<Item = NodeId>) -> Result<NodeId, DomError> {
        let fragment = self.create_fragment();
        for child in children {
            self.append_child(fragment, child)?;
        }
        Ok(fragment)
    }

    /// Attach a shadow root to an element host.
    pub fn attach_shadow(&self, host: NodeId, mode: ShadowMode) -> Result<NodeId, DomError> {
        self.check(host)?;
        let already = {
            let inner = self.inner.borrow();
            let data = &inner.nodes[host.index];
            !matches!(data.kind, NodeKind::Element { .. }) || data.shadow_root.is_some()
        };
        if already {
            return Err(DomError::HierarchyRequest { parent: host, node: host });
        }

        let root = self.create(NodeKind::ShadowRoot { mode, host }, String::new());
        self.inner.borrow_mut().nodes[host.index].shadow_root = Some(root);
        Ok(root)
    }

    /// The host's shadow root as seen from outside. Closed roots are hidden.
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let root = inner.node(host)?.shadow_root?;
        match inner.nodes[root.index].kind {
            NodeKind::ShadowRoot {
                mode: ShadowMode::Open,
                ..
            } => Some(root),
            _ => None,
        }
    }

    /// Deep copy of `node` without parent or listeners.
    pub fn clone_subtree(&self, node: NodeId) -> Result<NodeId, DomError> {
        self.check(node)?;
        let (kind, attributes, value, children) = {
            let inner = self.inner.borrow();
            let data = &inner.nodes[node.index];
            let kind = match &data.kind {
                NodeKind::ShadowRoot { .. } => NodeKind::Fragment,
                other => other.clone(),
            };
            (kind, data.attributes.clone(), data.value.clone(), data.children.clone())
        };

        let copy = self.create(kind, value);
        self.inner.borrow_mut().nodes[copy.index].attributes = attributes;
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            self.append_child(copy, child_copy)?;
        }
        Ok(copy)
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.inner.borrow().node(node).map(|data| data.kind.clone())
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Element { .. }))
    }

    pub fn is_comment(&self, node: NodeId) -> bool {
        matches!(self.kind(node), Some(NodeKind::Comment))
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        match self.kind(node)? {
            NodeKind::Element { tag } => Some(tag),
            _ => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node)?.parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node)?.children.first().copied()
    }

    pub fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().node(node)?.children.last().copied()
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, 1)
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.sibling(node, -1)
    }

    fn sibling(&self, node: NodeId, offset: isize) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let parent = inner.node(node)?.parent?;
        let siblings = &inner.nodes[parent.index].children;
        let position = siblings.iter().position(|&n| n == node)?;
        let target = position.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }

    /// True when `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (at the end when
    /// `None`). The child is detached from its previous parent first.
    /// Inserting a fragment moves its children instead.
    pub fn insert_before(
        &self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;

        if matches!(self.kind(child), Some(NodeKind::Fragment)) {
            for grandchild in self.children(child) {
                self.insert_before(parent, grandchild, reference)?;
            }
            return Ok(());
        }

        let parent_ok = self
            .kind(parent)
            .is_some_and(|kind| kind.accepts_children());
        let child_ok = !matches!(self.kind(child), Some(NodeKind::ShadowRoot { .. }));
        if !parent_ok || !child_ok || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, node: child });
        }

        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild { parent, reference });
            }
            if reference == child {
                return Ok(());
            }
        }

        self.detach(child);

        let mut inner = self.inner.borrow_mut();
        let position = match reference {
            Some(reference) => inner.nodes[parent.index]
                .children
                .iter()
                .position(|&n| n == reference)
                .ok_or(DomError::NotAChild { parent, reference })?,
            None => inner.nodes[parent.index].children.len(),
        };
        inner.nodes[parent.index].children.insert(position, child);
        inner.nodes[child.index].parent = Some(parent);
        inner.stats.insertions += 1;
        Ok(())
    }

    /// Remove `node` from its parent. Detached or unknown nodes are ignored.
    pub fn remove(&self, node: NodeId) {
        if self.detach(node) {
            self.inner.borrow_mut().stats.removals += 1;
        }
    }

    /// Detach `node` and release it with everything below it. The ids
    /// become unknown and their slots are reused by later creations.
    /// Shadow roots of hosts inside the subtree are left alone.
    /// Returns how many nodes were released.
    pub fn free_subtree(&self, node: NodeId) -> usize {
        if !self.exists(node) {
            return 0;
        }
        self.remove(node);
        let mut released = self.descendants(node);
        released.push(node);

        let mut inner = self.inner.borrow_mut();
        for &id in &released {
            let data = &mut inner.nodes[id.index];
            let generation = data.generation.wrapping_add(1);
            *data = NodeData::new(NodeKind::Fragment, String::new(), generation);
            data.live = false;
            inner.free.push(id.index);
        }
        inner.stats.nodes_freed += released.len() as u64;
        released.len()
    }

    fn detach(&self, node: NodeId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(parent) = inner.node(node).and_then(|data| data.parent) else {
            return false;
        };
        inner.nodes[parent.index].children.retain(|&n| n != node);
        inner.nodes[node.index].parent = None;
        true
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let inner = self.inner.borrow();
        inner
            .node(node)?
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.clone())
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        let inner = self.inner.borrow();
        inner
            .node(node)
            .is_some_and(|data| data.attributes.iter().any(|(n, _)| n == name))
    }

    /// Set an attribute on an element. Every call counts as a write.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut inner = self.inner.borrow_mut();
        let Some(data) = inner.node_mut(node) else {
            return;
        };
        if !matches!(data.kind, NodeKind::Element { .. }) {
            return;
        }
        match data.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, current)) => *current = value.to_string(),
            None => data.attributes.push((name.to_string(), value.to_string())),
        }
        inner.stats.attribute_writes += 1;
    }

    /// Remove an attribute. Returns whether it was present.
    pub fn remove_attribute(&self, node: NodeId, name: &str) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(data) = inner.node_mut(node) else {
            return false;
        };
        let before = data.attributes.len();
        data.attributes.retain(|(n, _)| n != name);
        data.attributes.len() != before
    }

    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.inner
            .borrow()
            .node(node)
            .map(|data| data.attributes.clone())
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Character data
    // -------------------------------------------------------------------------

    /// Text of a text or comment node.
    pub fn node_value(&self, node: NodeId) -> Option<String> {
        let inner = self.inner.borrow();
        let data = inner.node(node)?;
        matches!(data.kind, NodeKind::Text | NodeKind::Comment).then(|| data.value.clone())
    }

    pub fn set_node_value(&self, node: NodeId, value: &str) {
        let mut inner = self.inner.borrow_mut();
        if let Some(data) = inner.node_mut(node) {
            if matches!(data.kind, NodeKind::Text | NodeKind::Comment) {
                data.value = value.to_string();
            }
        }
    }

    /// Concatenated text of every text node under `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        if let Some(NodeKind::Text) = self.kind(node) {
            return self.node_value(node).unwrap_or_default();
        }
        self.descendants(node)
            .into_iter()
            .filter(|&n| matches!(self.kind(n), Some(NodeKind::Text)))
            .filter_map(|n| self.node_value(n))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Microtasks
    // -------------------------------------------------------------------------

    /// Queue work to run at the next microtask checkpoint.
    pub fn queue_microtask(&self, task: impl FnOnce() + 'static) {
        self.inner.borrow_mut().microtasks.push_back(Box::new(task));
    }

    /// Run queued microtasks, including ones queued meanwhile.
    /// Returns how many ran.
    pub fn run_microtasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let task = self.inner.borrow_mut().microtasks.pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    pub fn pending_microtasks(&self) -> usize {
        self.inner.borrow().microtasks.len()
    }
}
