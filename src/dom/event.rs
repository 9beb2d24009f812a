//! Event listeners and dispatch.
//!
//! Dispatch follows the platform model: a capture phase from the outermost
//! ancestor down to the target's parent, the target phase, then a bubble
//! phase back up when the event bubbles. The path ends at the tree root, so
//! an event raised inside a shadow tree stops at its shadow root.

use std::fmt;
use std::rc::Rc;

use crate::value::Value;

use super::{Dom, NodeId};

bitflags::bitflags! {
    /// Options for [`Dom::add_event_listener`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ListenerOptions: u8 {
        /// Fire during the capture phase instead of the bubble phase.
        const CAPTURE = 1 << 0;
        /// `prevent_default` is ignored inside the listener.
        const PASSIVE = 1 << 1;
        /// Remove the listener after its first invocation.
        const ONCE = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub type ListenerCallback = Rc<dyn Fn(&mut Event)>;

pub(crate) struct Listener {
    id: ListenerId,
    event_type: String,
    options: ListenerOptions,
    callback: ListenerCallback,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// An event travelling through the tree.
#[derive(Clone)]
pub struct Event {
    event_type: String,
    bubbles: bool,
    detail: Value,
    target: Option<NodeId>,
    current_target: Option<NodeId>,
    phase: EventPhase,
    propagation_stopped: bool,
    immediate_stopped: bool,
    default_prevented: bool,
    in_passive: bool,
}

impl Event {
    /// A non-bubbling event.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: false,
            detail: Value::Null,
            target: None,
            current_target: None,
            phase: EventPhase::None,
            propagation_stopped: false,
            immediate_stopped: false,
            default_prevented: false,
            in_passive: false,
        }
    }

    /// A bubbling event, like native `click` or `input`.
    pub fn bubbling(event_type: impl Into<String>) -> Self {
        Self {
            bubbles: true,
            ..Self::new(event_type)
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    /// The node the event was dispatched on.
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// The node whose listeners are running.
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    /// Stop after the listeners of the current node.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop now, skipping the remaining listeners of the current node.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn prevent_default(&mut self) {
        if !self.in_passive {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type)
            .field("target", &self.target)
            .field("phase", &self.phase)
            .field("stopped", &self.propagation_stopped)
            .finish()
    }
}

impl Dom {
    /// Register a listener. Returns an id for removal.
    pub fn add_event_listener(
        &self,
        node: NodeId,
        event_type: &str,
        options: ListenerOptions,
        callback: ListenerCallback,
    ) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        if let Some(data) = inner.node_mut(node) {
            data.listeners.push(Listener {
                id,
                event_type: event_type.to_string(),
                options,
                callback,
            });
        }
        id
    }

    /// Remove a listener. Returns whether it was registered on `node`.
    pub fn remove_event_listener(&self, node: NodeId, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(data) = inner.node_mut(node) else {
            return false;
        };
        let before = data.listeners.len();
        data.listeners.retain(|listener| listener.id != id);
        data.listeners.len() != before
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.inner
            .borrow()
            .node(node)
            .map_or(0, |data| data.listeners.len())
    }

    /// Listeners registered anywhere under `root`, `root` included.
    pub fn listener_count_in(&self, root: NodeId) -> usize {
        let own = self.listener_count(root);
        own + self
            .descendants(root)
            .into_iter()
            .map(|node| self.listener_count(node))
            .sum::<usize>()
    }

    fn has_listener(&self, node: NodeId, id: ListenerId) -> bool {
        self.inner
            .borrow()
            .node(node)
            .is_some_and(|data| data.listeners.iter().any(|listener| listener.id == id))
    }

    /// Dispatch `event` at `target`. Returns the event after dispatch.
    pub fn dispatch_event(&self, target: NodeId, mut event: Event) -> Event {
        event.target = Some(target);

        // target first, root last
        let mut path = vec![target];
        let mut current = self.parent(target);
        while let Some(node) = current {
            path.push(node);
            current = self.parent(node);
        }

        for &node in path.iter().skip(1).rev() {
            self.invoke(node, &mut event, EventPhase::Capturing);
            if event.propagation_stopped {
                break;
            }
        }

        if !event.propagation_stopped {
            self.invoke(target, &mut event, EventPhase::AtTarget);
        }

        if event.bubbles && !event.propagation_stopped {
            for &node in path.iter().skip(1) {
                self.invoke(node, &mut event, EventPhase::Bubbling);
                if event.propagation_stopped {
                    break;
                }
            }
        }

        event.phase = EventPhase::None;
        event.current_target = None;
        event
    }

    fn invoke(&self, node: NodeId, event: &mut Event, phase: EventPhase) {
        let mut matching: Vec<(ListenerId, ListenerOptions, ListenerCallback)> = {
            let inner = self.inner.borrow();
            let Some(data) = inner.node(node) else {
                return;
            };
            data.listeners
                .iter()
                .filter(|listener| listener.event_type == event.event_type)
                .filter(|listener| match phase {
                    EventPhase::Capturing => listener.options.contains(ListenerOptions::CAPTURE),
                    EventPhase::Bubbling => !listener.options.contains(ListenerOptions::CAPTURE),
                    _ => true,
                })
                .map(|listener| (listener.id, listener.options, listener.callback.clone()))
                .collect()
        };
        if phase == EventPhase::AtTarget {
            // capture listeners first, registration order otherwise
            matching.sort_by_key(|(_, options, _)| !options.contains(ListenerOptions::CAPTURE));
        }

        event.phase = phase;
        event.current_target = Some(node);

        for (id, options, callback) in matching {
            if !self.has_listener(node, id) {
                continue;
            }
            if options.contains(ListenerOptions::ONCE) {
                self.remove_event_listener(node, id);
            }
            event.in_passive = options.contains(ListenerOptions::PASSIVE);
            callback(event);
            event.in_passive = false;
            if event.immediate_stopped {
                break;
            }
        }
    }
}
