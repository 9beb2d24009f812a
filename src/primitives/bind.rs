//! Binding Dispatcher - wires declared bindings to effects.
//!
//! Each binding gets one effect. The effect reads the signal (tracked) and
//! runs its DOM update untracked, so an update only ever depends on the
//! signal it is bound to. A write that reaches the effect while its update
//! is running is coalesced into one follow-up run.

use std::rc::Rc;

use crate::dom::{Dom, NodeId};
use crate::engine::Component;
use crate::reactive::{effect, untrack, Effect, Signal};
use crate::value::Value;

use super::control_flow::bind_array;
use super::text::{bind_expression, bind_text};
use super::types::{Binding, CleanupList};

/// Wire every binding whose markers are found under `scope`.
///
/// Bindings whose marker is missing are skipped. The created effects are
/// disposed through `cleanups`.
pub fn setup_signals(component: &Component, scope: NodeId, bindings: Vec<Binding>, cleanups: &CleanupList) {
    if bindings.is_empty() {
        return;
    }
    let dom = component.dom();

    for binding in bindings {
        let bound = match binding {
            Binding::Attribute {
                signal,
                marker,
                attribute,
            } => bind_attribute(dom, scope, &signal, &marker, &attribute, cleanups),
            Binding::Text { signal, marker } => bind_text(component, scope, &signal, &marker, cleanups),
            Binding::Expression { signal, marker } => {
                bind_expression(component, scope, &signal, &marker, cleanups)
            }
            Binding::Array {
                signal,
                marker,
                template,
            } => bind_array(component, scope, &signal, &marker, template, cleanups),
        };
        if !bound {
            tracing::trace!(id = %component.id(), "binding marker not found, skipped");
        }
    }
}

/// Run `update` with the signal's value now and on every change.
///
/// The returned effect is also registered in `cleanups`.
pub fn bind_signal_to_element(
    cleanups: &CleanupList,
    signal: &Signal<Value>,
    mut update: impl FnMut(&Value) + 'static,
) -> Effect {
    let signal = signal.clone();
    let e = effect(move || {
        let value = signal.get();
        untrack(|| update(&value));
    });
    cleanups.push(e.clone().into_cleanup());
    e
}

/// Keep `attribute` of the element marked with `marker` equal to the
/// signal's stringified value. The marker is stripped.
fn bind_attribute(
    dom: &Dom,
    scope: NodeId,
    signal: &Signal<Value>,
    marker: &str,
    attribute: &str,
    cleanups: &CleanupList,
) -> bool {
    let Some(element) = dom.query_attribute(scope, marker).into_iter().next() else {
        return false;
    };
    dom.remove_attribute(element, marker);

    let dom = dom.clone();
    let attribute: Rc<str> = Rc::from(attribute);
    bind_signal_to_element(cleanups, signal, move |value| {
        let text = value.to_string();
        if dom.get_attribute(element, &attribute).as_deref() != Some(text.as_str()) {
            dom.set_attribute(element, &attribute, &text);
        }
    });
    true
}
