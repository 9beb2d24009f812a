//! Direct (non-delegated) event binding.
//!
//! Resolves event markers to handlers immediately, attaches a listener on
//! the element itself and strips the marker. Event types the component
//! root already delegates are left alone so no element is bound twice.

use std::rc::Rc;

use crate::dom::{Dom, Event, ListenerOptions, NodeId};
use crate::engine::{with_current_component, Component, HandlerId, Propagation};
use crate::error::Result;
use crate::log::{report, LogLevel};
use crate::primitives::CleanupList;

/// Elements under `root` between `start` and `end`, in document order.
///
/// With neither bound, every element under `root`. A missing `start`
/// begins at the root's first child; a missing `end` runs to the end.
pub fn elements_in_range(
    dom: &Dom,
    root: NodeId,
    start: Option<NodeId>,
    end: Option<NodeId>,
) -> Vec<NodeId> {
    if start.is_none() && end.is_none() {
        return dom.elements(root);
    }

    let first = match start {
        Some(start) => dom.next_sibling(start),
        None => dom.first_child(root),
    };

    let mut elements = Vec::new();
    let mut current = first;
    while let Some(node) = current {
        if Some(node) == end {
            break;
        }
        if dom.is_element(node) {
            elements.push(node);
        }
        current = dom.next_in_preorder(node, root);
    }
    elements
}

/// Bind every event marker on `elements`. Returns how many were bound.
pub fn bind_events(component: &Component, elements: &[NodeId], cleanups: &CleanupList) -> usize {
    let dom = component.dom();
    let config = component.config();
    let mut bound = 0;

    for &element in elements {
        for (name, value) in dom.attributes(element) {
            let Some(event_type) = config.event_type_of(&name) else {
                continue;
            };
            if component.delegates(event_type) {
                continue;
            }
            let id: HandlerId = match value.parse() {
                Ok(id) => id,
                Err(_) => {
                    report(LogLevel::Warn, "malformed event handler reference", (&name, &value));
                    continue;
                }
            };
            let Some(handler) = component.registry().handler(event_type, id) else {
                continue;
            };

            let weak = component.downgrade();
            let listener = dom.add_event_listener(
                element,
                event_type,
                ListenerOptions::empty(),
                Rc::new(move |event: &mut Event| {
                    let Some(component) = weak.upgrade() else {
                        return;
                    };
                    let outcome = with_current_component(&component, || handler(&component, event));
                    if outcome == Propagation::Stop {
                        event.stop_propagation();
                    }
                }),
            );
            dom.remove_attribute(element, &name);

            let dom = dom.clone();
            cleanups.add(move || {
                dom.remove_event_listener(element, listener);
            });
            bound += 1;
        }
    }

    if bound > 0 {
        tracing::trace!(id = %component.id(), bound, "direct listeners attached");
    }
    bound
}

/// Bind event markers between two nodes of the component root.
pub fn bind_events_in_range(
    component: &Component,
    start: Option<NodeId>,
    end: Option<NodeId>,
    cleanups: &CleanupList,
) -> Result<usize> {
    let root = component.root()?;
    let elements = elements_in_range(component.dom(), root, start, end);
    Ok(bind_events(component, &elements, cleanups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::EventRegistry;
    use crate::events::{collect_event_attrs, setup_event_delegation};
    use std::cell::Cell;

    fn setup() -> (Dom, Component) {
        let dom = Dom::new();
        let host = dom.create_element("x-test");
        let component = Component::new(
            &dom,
            host,
            Rc::new(EventRegistry::new()),
            Rc::new(EngineConfig::default()),
        )
        .unwrap();
        (dom, component)
    }

    #[test]
    fn test_elements_in_range_stops_at_end_marker() {
        let (dom, component) = setup();
        let root = component.root().unwrap();
        let before = dom.create_element("p");
        let start = dom.create_comment("x");
        let a = dom.element("li").child(dom.create_element("b")).build();
        let b = dom.create_element("li");
        let end = dom.create_comment("//x");
        let after = dom.create_element("p");
        for node in [before, start, a, b, end, after] {
            dom.append_child(root, node).unwrap();
        }

        let inside = elements_in_range(&dom, root, Some(start), Some(end));
        assert_eq!(inside.len(), 3);
        assert_eq!(inside[0], a);
        assert_eq!(inside[2], b);

        assert_eq!(elements_in_range(&dom, root, None, None).len(), 5);
    }

    #[test]
    fn test_bind_events_strips_marker_and_fires() {
        let (dom, component) = setup();
        let count = Rc::new(Cell::new(0));
        let count_c = count.clone();
        let id = component.on("input", move |_, _| count_c.set(count_c.get() + 1));
        let field = dom.element("input").attr("data-on-input", &id.to_string()).build();
        dom.append_child(component.root().unwrap(), field).unwrap();

        let bound = bind_events_in_range(&component, None, None, component.cleanups()).unwrap();
        dom.dispatch_event(field, Event::bubbling("input"));

        assert_eq!(bound, 1);
        assert_eq!(count.get(), 1);
        assert!(!dom.has_attribute(field, "data-on-input"));
        assert_eq!(dom.listener_count(field), 1);

        component.destroy();
        assert_eq!(dom.listener_count(field), 0);
    }

    #[test]
    fn test_delegated_types_are_not_bound_twice() {
        let (dom, component) = setup();
        let count = Rc::new(Cell::new(0));
        let count_c = count.clone();
        let id = component.on("click", move |_, _| count_c.set(count_c.get() + 1));
        let root = component.root().unwrap();
        let button = dom.element("button").attr("data-on-click", &id.to_string()).build();
        dom.append_child(root, button).unwrap();

        setup_event_delegation(&component, &collect_event_attrs(&dom, root, component.config())).unwrap();
        let bound = bind_events(&component, &[button], component.cleanups());
        dom.dispatch_event(button, Event::bubbling("click"));

        assert_eq!(bound, 0);
        assert!(dom.has_attribute(button, "data-on-click"), "marker stays for delegation");
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_unknown_handler_keeps_marker() {
        let (dom, component) = setup();
        let button = dom.element("button").attr("data-on-click", "999").build();
        dom.append_child(component.root().unwrap(), button).unwrap();

        assert_eq!(bind_events(&component, &[button], component.cleanups()), 0);
        assert!(dom.has_attribute(button, "data-on-click"));
    }
}
