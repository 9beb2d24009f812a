//! Event Delegation Router.
//!
//! One capture-phase listener per event type sits on the component root.
//! At dispatch time it walks from the target up to the root and runs the
//! handler named by the nearest marker attribute. Elements inserted later
//! (list items) need no listener of their own.
//!
//! # Example
//!
//! ```text
//! #shadow-root  ← listener("click", capture)
//!   └─ <li data-on-click="4">
//!        └─ <span>  ← event.target
//!
//! path = [span, li]  → li carries the marker → handler 4
//! ```

use std::rc::Rc;

use crate::config::EngineConfig;
use crate::dom::{Dom, Event, ListenerOptions, NodeId};
use crate::engine::{with_current_component, Component, HandlerId, Propagation, WeakComponent};
use crate::error::Result;
use crate::log::{report, LogLevel};

/// A marker attribute found in a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrRef {
    pub element: NodeId,
    pub name: String,
    pub value: String,
}

/// Event marker attributes on elements under `root`, in document order.
pub fn collect_event_attrs(dom: &Dom, root: NodeId, config: &EngineConfig) -> Vec<AttrRef> {
    dom.elements(root)
        .into_iter()
        .flat_map(|element| {
            dom.attributes(element)
                .into_iter()
                .filter(move |(name, _)| config.event_type_of(name).is_some())
                .map(move |(name, value)| AttrRef { element, name, value })
        })
        .collect()
}

/// Attach one delegated listener per distinct event type in `event_attrs`.
///
/// Event types the root already delegates are skipped, so calling this
/// again for new markers never double-binds.
pub fn setup_event_delegation(component: &Component, event_attrs: &[AttrRef]) -> Result<()> {
    let root = component.root()?;
    let config = component.config();

    let mut event_types: Vec<&str> = Vec::new();
    for attr in event_attrs {
        if let Some(event_type) = config.event_type_of(&attr.name) {
            if !event_types.contains(&event_type) {
                event_types.push(event_type);
            }
        }
    }

    for event_type in event_types {
        if component.delegates(event_type) {
            continue;
        }

        let router = Router {
            component: component.downgrade(),
            root,
            event_type: event_type.to_string(),
            marker: config.event_attr(event_type),
        };
        let dom = component.dom().clone();
        let listener = dom.add_event_listener(
            root,
            event_type,
            ListenerOptions::CAPTURE,
            Rc::new(move |event: &mut Event| router.route(event)),
        );
        component.add_delegated(event_type, listener);
        component
            .cleanups()
            .add(move || {
                dom.remove_event_listener(root, listener);
            });

        tracing::debug!(id = %component.id(), event_type, "delegated listener attached");
    }
    Ok(())
}

struct Router {
    component: WeakComponent,
    root: NodeId,
    event_type: String,
    marker: String,
}

impl Router {
    fn route(&self, event: &mut Event) {
        let Some(component) = self.component.upgrade() else {
            return;
        };
        let Some(target) = event.target() else {
            return;
        };
        let dom = component.dom();

        let mut path = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            if node == self.root {
                break;
            }
            path.push(node);
            current = dom.parent(node);
        }

        for element in path {
            let Some(raw) = dom.get_attribute(element, &self.marker) else {
                continue;
            };
            let id: HandlerId = match raw.parse() {
                Ok(id) => id,
                Err(_) => {
                    with_current_component(&component, || {
                        report(
                            LogLevel::Warn,
                            "malformed event handler reference",
                            (&self.marker, &raw),
                        )
                    });
                    continue;
                }
            };
            // Markers without a live handler are skipped
            let Some(handler) = component.registry().handler(&self.event_type, id) else {
                continue;
            };

            let outcome = with_current_component(&component, || handler(&component, event));
            if outcome == Propagation::Stop {
                event.stop_propagation();
            }
            break;
        }
    }
}
