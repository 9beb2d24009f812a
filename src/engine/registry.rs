//! Event Registry - handler table shared by every component.
//!
//! Templates embed handler ids as marker attribute values
//! (`data-on-click="3"`). The registry maps `(event type, id)` back to the
//! handler at dispatch time.
//!
//! - Handler ids are never reused, so a stale marker can never reach a
//!   handler that belongs to another component.
//! - Entries registered through [`EventRegistry::register_for`] live in the
//!   owning component's arena and are swept when it is destroyed.
//! - Entries registered through [`EventRegistry::register`] live as long as
//!   the registry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::num::ParseIntError;
use std::rc::Rc;
use std::str::FromStr;

use crate::dom::Event;

use super::Component;

// =============================================================================
// Ids and Handler Types
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HandlerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(HandlerId)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// What a handler wants done with the event afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Propagation {
    #[default]
    Continue,
    Stop,
}

impl From<()> for Propagation {
    fn from(_: ()) -> Self {
        Self::Continue
    }
}

/// `false` stops propagation, `true` continues.
impl From<bool> for Propagation {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Self::Continue
        } else {
            Self::Stop
        }
    }
}

/// A registered event handler. Called with the owning component.
pub type EventHandler = Rc<dyn Fn(&Component, &mut Event) -> Propagation>;

struct HandlerEntry {
    event_type: String,
    handler: EventHandler,
    owner: Option<ComponentId>,
}

#[derive(Default)]
struct RegistryState {
    handlers: HashMap<HandlerId, HandlerEntry>,
    /// Handler ids per owning component.
    arenas: HashMap<ComponentId, Vec<HandlerId>>,
    next_handler: u64,
    next_component: u64,
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
pub struct EventRegistry {
    state: RefCell<RegistryState>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for the registry's lifetime.
    pub fn register<R, F>(&self, event_type: &str, handler: F) -> HandlerId
    where
        R: Into<Propagation>,
        F: Fn(&Component, &mut Event) -> R + 'static,
    {
        self.insert(None, event_type, wrap(handler))
    }

    /// Register a handler owned by `owner`. It is dropped by [`Self::sweep`].
    pub fn register_for<R, F>(&self, owner: ComponentId, event_type: &str, handler: F) -> HandlerId
    where
        R: Into<Propagation>,
        F: Fn(&Component, &mut Event) -> R + 'static,
    {
        self.insert(Some(owner), event_type, wrap(handler))
    }

    fn insert(&self, owner: Option<ComponentId>, event_type: &str, handler: EventHandler) -> HandlerId {
        let mut state = self.state.borrow_mut();
        let id = HandlerId(state.next_handler);
        state.next_handler += 1;

        state.handlers.insert(
            id,
            HandlerEntry {
                event_type: event_type.to_string(),
                handler,
                owner,
            },
        );
        if let Some(owner) = owner {
            state.arenas.entry(owner).or_default().push(id);
        }

        tracing::trace!(%id, event_type, ?owner, "handler registered");
        id
    }

    /// The handler registered under `id` for `event_type`.
    pub fn handler(&self, event_type: &str, id: HandlerId) -> Option<EventHandler> {
        let state = self.state.borrow();
        let entry = state.handlers.get(&id)?;
        (entry.event_type == event_type).then(|| entry.handler.clone())
    }

    /// Drop every handler owned by `owner`. Returns how many were removed.
    pub fn sweep(&self, owner: ComponentId) -> usize {
        let removed: Vec<HandlerEntry> = {
            let mut state = self.state.borrow_mut();
            let ids = state.arenas.remove(&owner).unwrap_or_default();
            ids.iter()
                .filter_map(|id| state.handlers.remove(id))
                .collect()
        };
        // Handlers may own component handles; drop them unborrowed.
        let count = removed.len();
        drop(removed);

        tracing::debug!(%owner, count, "handler arena swept");
        count
    }

    pub fn allocate_component_id(&self) -> ComponentId {
        let mut state = self.state.borrow_mut();
        let id = ComponentId(state.next_component);
        state.next_component += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.state.borrow().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handlers currently owned by `owner`.
    pub fn owned_by(&self, owner: ComponentId) -> usize {
        self.state.borrow().arenas.get(&owner).map_or(0, Vec::len)
    }

    pub fn owner_of(&self, id: HandlerId) -> Option<ComponentId> {
        self.state.borrow().handlers.get(&id)?.owner
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventRegistry")
            .field("handlers", &state.handlers.len())
            .field("arenas", &state.arenas.len())
            .finish()
    }
}

fn wrap<R, F>(handler: F) -> EventHandler
where
    R: Into<Propagation>,
    F: Fn(&Component, &mut Event) -> R + 'static,
{
    Rc::new(move |component: &Component, event: &mut Event| handler(component, event).into())
}
