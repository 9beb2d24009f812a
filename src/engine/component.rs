//! Component instances.
//!
//! A [`Component`] owns its host element, its shadow root, its props and
//! everything the binding engine creates for it: effects, native listeners
//! and registry entries. [`Component::destroy`] releases all of them.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► (microtask) init_dispatch → setup → mount view → before_mount hooks
//!        ──► connect    → mount hooks (once)
//!        ──► destroy    → destroy hooks → cleanups → sweep registry (once)
//! ```
//!
//! `destroy` is safe at any point, including before the deferred setup ran.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::config::EngineConfig;
use crate::dom::{Dom, Event, ListenerId, NodeId};
use crate::error::{EngineError, Result};
use crate::primitives::CleanupList;
use crate::reactive::{signal, Signal};
use crate::value::Value;

use super::registry::{ComponentId, EventRegistry, HandlerId, Propagation};

// =============================================================================
// Current Component Stack
// =============================================================================

thread_local! {
    static CURRENT: RefCell<Vec<Component>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` with `component` as the current component.
pub fn with_current_component<R>(component: &Component, f: impl FnOnce() -> R) -> R {
    CURRENT.with(|stack| stack.borrow_mut().push(component.clone()));
    let _guard = PopCurrent;
    f()
}

struct PopCurrent;

impl Drop for PopCurrent {
    fn drop(&mut self) {
        let popped = CURRENT.with(|stack| stack.borrow_mut().pop());
        drop(popped);
    }
}

pub fn current_component() -> Option<Component> {
    CURRENT.with(|stack| stack.borrow().last().cloned())
}

pub fn current_component_tag() -> Option<String> {
    CURRENT.with(|stack| stack.borrow().last().map(|c| c.tag().to_string()))
}

// =============================================================================
// Props
// =============================================================================

/// Named reactive properties.
#[derive(Default)]
pub struct Props {
    values: RefCell<BTreeMap<String, Signal<Value>>>,
}

impl Props {
    /// The signal behind `name`, created as `Null` on first access.
    pub fn signal(&self, name: &str) -> Signal<Value> {
        self.values
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| signal(Value::Null))
            .clone()
    }

    /// Tracked read.
    pub fn get(&self, name: &str) -> Value {
        self.signal(name).get()
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let signal = self.signal(name);
        signal.set(value.into());
    }

    pub fn names(&self) -> Vec<String> {
        self.values.borrow().keys().cloned().collect()
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.borrow().iter().map(|(k, v)| (k.clone(), v.peek())))
            .finish()
    }
}

// =============================================================================
// Lifecycle Hooks
// =============================================================================

pub type Hook = Box<dyn FnOnce(&Component)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookKind {
    BeforeMount,
    Mount,
    Destroy,
}

#[derive(Default)]
struct Hooks {
    before_mount: Vec<Hook>,
    mount: Vec<Hook>,
    destroy: Vec<Hook>,
}

impl Hooks {
    fn slot(&mut self, kind: HookKind) -> &mut Vec<Hook> {
        match kind {
            HookKind::BeforeMount => &mut self.before_mount,
            HookKind::Mount => &mut self.mount,
            HookKind::Destroy => &mut self.destroy,
        }
    }
}

// =============================================================================
// Component
// =============================================================================

struct ComponentInner {
    id: ComponentId,
    tag: String,
    dom: Dom,
    host: NodeId,
    root: Cell<Option<NodeId>>,
    registry: Rc<EventRegistry>,
    config: Rc<EngineConfig>,
    props: Props,
    cleanups: CleanupList,
    /// Native listeners on the root, one per delegated event type.
    delegated: RefCell<BTreeMap<String, ListenerId>>,
    hooks: RefCell<Hooks>,
    dispatch_ready: Cell<bool>,
    initialized: Cell<bool>,
    mounted: Cell<bool>,
    destroyed: Cell<bool>,
}

/// Handle to a component instance. Cloning shares the instance.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

/// Non-owning handle, held by listeners and effects.
#[derive(Clone)]
pub struct WeakComponent {
    inner: Weak<ComponentInner>,
}

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.inner.upgrade().map(|inner| Component { inner })
    }
}

impl Component {
    /// Create an instance on `host`, attaching its shadow root.
    pub fn new(
        dom: &Dom,
        host: NodeId,
        registry: Rc<EventRegistry>,
        config: Rc<EngineConfig>,
    ) -> Result<Self> {
        let tag = dom.tag_name(host).ok_or(EngineError::MissingRoot)?;
        let root = dom.attach_shadow(host, config.shadow_mode)?;
        let id = registry.allocate_component_id();

        tracing::debug!(%id, %tag, "component created");

        Ok(Self {
            inner: Rc::new(ComponentInner {
                id,
                tag,
                dom: dom.clone(),
                host,
                root: Cell::new(Some(root)),
                registry,
                config,
                props: Props::default(),
                cleanups: CleanupList::new(),
                delegated: RefCell::new(BTreeMap::new()),
                hooks: RefCell::new(Hooks::default()),
                dispatch_ready: Cell::new(false),
                initialized: Cell::new(false),
                mounted: Cell::new(false),
                destroyed: Cell::new(false),
            }),
        })
    }

    pub fn id(&self) -> ComponentId {
        self.inner.id
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    pub fn dom(&self) -> &Dom {
        &self.inner.dom
    }

    pub fn host(&self) -> NodeId {
        self.inner.host
    }

    /// The shadow root. Destroy hooks still see it; afterwards this fails
    /// with [`EngineError::Destroyed`].
    pub fn root(&self) -> Result<NodeId> {
        match self.inner.root.get() {
            Some(root) => Ok(root),
            None if self.is_destroyed() => Err(EngineError::Destroyed {
                tag: self.inner.tag.clone(),
            }),
            None => Err(EngineError::MissingRoot),
        }
    }

    pub fn registry(&self) -> &Rc<EventRegistry> {
        &self.inner.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn props(&self) -> &Props {
        &self.inner.props
    }

    pub fn cleanups(&self) -> &CleanupList {
        &self.inner.cleanups
    }

    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register a handler owned by this component. Embed the returned id in
    /// the template's event marker.
    pub fn on<R, F>(&self, event_type: &str, handler: F) -> HandlerId
    where
        R: Into<Propagation>,
        F: Fn(&Component, &mut Event) -> R + 'static,
    {
        self.inner.registry.register_for(self.inner.id, event_type, handler)
    }

    // -------------------------------------------------------------------------
    // Delegation table
    // -------------------------------------------------------------------------

    /// Whether the root already has a delegated listener for `event_type`.
    pub fn delegates(&self, event_type: &str) -> bool {
        self.inner.delegated.borrow().contains_key(event_type)
    }

    pub fn delegated_event_types(&self) -> Vec<String> {
        self.inner.delegated.borrow().keys().cloned().collect()
    }

    pub(crate) fn add_delegated(&self, event_type: &str, listener: ListenerId) {
        self.inner
            .delegated
            .borrow_mut()
            .insert(event_type.to_string(), listener);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    pub fn on_before_mount(&self, hook: impl FnOnce(&Component) + 'static) {
        self.add_hook(HookKind::BeforeMount, Box::new(hook));
    }

    pub fn on_mount(&self, hook: impl FnOnce(&Component) + 'static) {
        self.add_hook(HookKind::Mount, Box::new(hook));
    }

    pub fn on_destroy(&self, hook: impl FnOnce(&Component) + 'static) {
        self.add_hook(HookKind::Destroy, Box::new(hook));
    }

    fn add_hook(&self, kind: HookKind, hook: Hook) {
        if self.is_destroyed() {
            return;
        }
        self.inner.hooks.borrow_mut().slot(kind).push(hook);
    }

    /// Run and drop the hooks of `kind`.
    pub(crate) fn run_hooks(&self, kind: HookKind) {
        let hooks = std::mem::take(self.inner.hooks.borrow_mut().slot(kind));
        if hooks.is_empty() {
            return;
        }
        tracing::trace!(id = %self.inner.id, ?kind, count = hooks.len(), "running hooks");
        with_current_component(self, || {
            for hook in hooks {
                hook(self);
            }
        });
    }

    /// Enable [`Component::emit`].
    pub fn init_dispatch(&self) {
        self.inner.dispatch_ready.set(true);
    }

    /// Dispatch a bubbling custom event from the host.
    ///
    /// Returns `None` before [`Component::init_dispatch`] or after destroy.
    pub fn emit(&self, event_type: &str, detail: Value) -> Option<Event> {
        if !self.inner.dispatch_ready.get() || self.is_destroyed() {
            return None;
        }
        let event = Event::bubbling(event_type).with_detail(detail);
        Some(self.inner.dom.dispatch_event(self.inner.host, event))
    }

    pub(crate) fn mark_initialized(&self) {
        self.inner.initialized.set(true);
    }

    /// Host inserted into the document. Runs mount hooks the first time.
    pub fn connect(&self) {
        if self.is_destroyed() || self.inner.mounted.replace(true) {
            return;
        }
        self.run_hooks(HookKind::Mount);
    }

    /// Release everything the engine created for this component.
    ///
    /// Destroy hooks run first, then every cleanup exactly once. Repeated
    /// calls do nothing.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        self.run_hooks(HookKind::Destroy);

        let ran = self.inner.cleanups.run_all();
        self.inner.delegated.borrow_mut().clear();
        let swept = self.inner.registry.sweep(self.inner.id);
        self.inner.mounted.set(false);
        self.inner.dispatch_ready.set(false);
        self.inner.root.set(None);

        // Drop hooks for phases that never ran.
        let leftover = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        drop(leftover);

        tracing::debug!(id = %self.inner.id, tag = %self.inner.tag, ran, swept, "component destroyed");
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("tag", &self.inner.tag)
            .field("host", &self.inner.host)
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}
