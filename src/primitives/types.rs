//! Primitive types - cleanup, views and binding descriptors.
//!
//! A [`View`] is what a template compiler hands to the engine: a fragment
//! with marker attributes and comments, plus the bindings and refs that
//! point into it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Dom, NodeId};
use crate::reactive::Signal;
use crate::value::{ItemKey, KeyExtractor, Value};

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by the engine.
///
/// Call this to dispose an effect or detach a listener.
pub type Cleanup = Box<dyn FnOnce()>;

/// Cleanups owned by a component or a rendered list item.
#[derive(Default)]
pub struct CleanupList {
    entries: RefCell<Vec<Cleanup>>,
}

impl CleanupList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, cleanup: Cleanup) {
        self.entries.borrow_mut().push(cleanup);
    }

    pub fn add(&self, cleanup: impl FnOnce() + 'static) {
        self.push(Box::new(cleanup));
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Run every cleanup once, in registration order, and empty the list.
    ///
    /// Cleanups registered while running are run too. Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        loop {
            let batch = std::mem::take(&mut *self.entries.borrow_mut());
            if batch.is_empty() {
                return ran;
            }
            for cleanup in batch {
                cleanup();
                ran += 1;
            }
        }
    }
}

impl fmt::Debug for CleanupList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupList").field("len", &self.len()).finish()
    }
}

// =============================================================================
// Refs
// =============================================================================

pub type RefCallback = Box<dyn FnOnce(NodeId)>;

/// Ref callbacks by index. Each is taken on first use.
#[derive(Default)]
pub struct RefMap {
    callbacks: RefCell<HashMap<usize, RefCallback>>,
}

impl RefMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, index: usize, callback: impl FnOnce(NodeId) + 'static) {
        self.callbacks.borrow_mut().insert(index, Box::new(callback));
    }

    pub fn with(self, index: usize, callback: impl FnOnce(NodeId) + 'static) -> Self {
        self.insert(index, callback);
        self
    }

    pub(crate) fn take(&self, index: usize) -> Option<RefCallback> {
        self.callbacks.borrow_mut().remove(&index)
    }

    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.borrow().is_empty()
    }
}

// =============================================================================
// Bindings
// =============================================================================

/// A declared binding from the template compiler.
///
/// `marker` is the attribute name for attribute bindings and the opening
/// comment text for region bindings.
pub enum Binding {
    /// Keep `attribute` on the element carrying `marker` equal to the signal.
    Attribute {
        signal: Signal<Value>,
        marker: String,
        attribute: String,
    },
    /// A single text node between the marker comments.
    Text { signal: Signal<Value>, marker: String },
    /// Arbitrary content between the marker comments, replaced on change.
    Expression { signal: Signal<Value>, marker: String },
    /// A reconciled list between the marker comments.
    Array {
        signal: Signal<Value>,
        marker: String,
        template: ItemTemplate,
    },
}

impl Binding {
    pub fn attribute(signal: Signal<Value>, marker: &str, attribute: &str) -> Self {
        Self::Attribute {
            signal,
            marker: marker.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub fn text(signal: Signal<Value>, marker: &str) -> Self {
        Self::Text {
            signal,
            marker: marker.to_string(),
        }
    }

    pub fn expression(signal: Signal<Value>, marker: &str) -> Self {
        Self::Expression {
            signal,
            marker: marker.to_string(),
        }
    }

    pub fn array(signal: Signal<Value>, marker: &str, template: ItemTemplate) -> Self {
        Self::Array {
            signal,
            marker: marker.to_string(),
            template,
        }
    }

    pub fn signal(&self) -> &Signal<Value> {
        match self {
            Self::Attribute { signal, .. }
            | Self::Text { signal, .. }
            | Self::Expression { signal, .. }
            | Self::Array { signal, .. } => signal,
        }
    }

    pub fn marker(&self) -> &str {
        match self {
            Self::Attribute { marker, .. }
            | Self::Text { marker, .. }
            | Self::Expression { marker, .. }
            | Self::Array { marker, .. } => marker,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Attribute { .. } => "attribute",
            Self::Text { .. } => "text",
            Self::Expression { .. } => "expression",
            Self::Array { .. } => "array",
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.kind())
            .field("marker", &self.marker())
            .finish()
    }
}

// =============================================================================
// Views and Item Templates
// =============================================================================

/// Compiled template output: a fragment and what binds into it.
pub struct View {
    pub fragment: NodeId,
    pub bindings: Vec<Binding>,
    pub refs: Option<RefMap>,
}

impl View {
    pub fn new(fragment: NodeId) -> Self {
        Self {
            fragment,
            bindings: Vec::new(),
            refs: None,
        }
    }

    pub fn bind(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn refs(mut self, refs: RefMap) -> Self {
        self.refs = Some(refs);
        self
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("fragment", &self.fragment)
            .field("bindings", &self.bindings)
            .field("refs", &self.refs.as_ref().map(RefMap::len))
            .finish()
    }
}

/// What an item template renders from.
pub struct ItemContext {
    pub dom: Dom,
    /// The item's current value. Updated in place when the item is reused.
    pub value: Signal<Value>,
    /// Position in the list at first render.
    pub index: usize,
    pub key: ItemKey,
}

type RenderFn = Rc<dyn Fn(&ItemContext) -> View>;

/// Renders one list item. Cloning shares the render function.
#[derive(Clone)]
pub struct ItemTemplate {
    render: RenderFn,
    key: KeyExtractor,
}

impl ItemTemplate {
    pub fn new(render: impl Fn(&ItemContext) -> View + 'static) -> Self {
        Self {
            render: Rc::new(render),
            key: KeyExtractor::Identity,
        }
    }

    pub fn keyed(mut self, key: KeyExtractor) -> Self {
        self.key = key;
        self
    }

    pub fn key_of(&self, item: &Value) -> ItemKey {
        self.key.key(item)
    }

    pub(crate) fn render(&self, ctx: &ItemContext) -> View {
        (self.render)(ctx)
    }
}

impl fmt::Debug for ItemTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemTemplate").field("key", &self.key).finish()
    }
}
