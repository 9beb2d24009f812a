//! Text and expression regions.
//!
//! Both live between a comment pair `<!--marker-->` ... `<!--//marker-->`.
//! A text region owns exactly one text node and only rewrites its value.
//! An expression region replaces everything between the markers whenever
//! the value changes: templates are cloned in, lists are expanded, anything
//! else becomes a text node.

use crate::dom::{Dom, NodeId};
use crate::engine::Component;
use crate::log::{report, LogLevel};
use crate::reactive::Signal;
use crate::value::Value;

use super::bind::bind_signal_to_element;
use super::types::CleanupList;

fn placeholders(component: &Component, scope: NodeId, marker: &str) -> Option<(NodeId, NodeId)> {
    let end_value = component.config().region_end(marker);
    component
        .dom()
        .find_comment_placeholders(scope, marker, &end_value)
}

pub(crate) fn bind_text(
    component: &Component,
    scope: NodeId,
    signal: &Signal<Value>,
    marker: &str,
    cleanups: &CleanupList,
) -> bool {
    let Some((start, end)) = placeholders(component, scope, marker) else {
        return false;
    };
    let dom = component.dom().clone();
    let Some(parent) = dom.parent(start) else {
        return false;
    };

    match dom.remove_between(start, end) {
        Ok(placeholder) => release(&dom, placeholder),
        Err(err) => {
            report(LogLevel::Error, "text region is not well formed", err);
            return false;
        }
    }
    let node = dom.create_text("");
    if let Err(err) = dom.insert_before(parent, node, Some(end)) {
        report(LogLevel::Error, "text region is not well formed", err);
        return false;
    }

    bind_signal_to_element(cleanups, signal, move |value| {
        let text = value.to_string();
        if dom.node_value(node).as_deref() != Some(text.as_str()) {
            dom.set_node_value(node, &text);
        }
    });
    true
}

pub(crate) fn bind_expression(
    component: &Component,
    scope: NodeId,
    signal: &Signal<Value>,
    marker: &str,
    cleanups: &CleanupList,
) -> bool {
    let Some((start, end)) = placeholders(component, scope, marker) else {
        return false;
    };
    let dom = component.dom().clone();

    bind_signal_to_element(cleanups, signal, move |value| {
        let Some(parent) = dom.parent(start) else {
            return;
        };
        match dom.remove_between(start, end) {
            Ok(previous) => release(&dom, previous),
            Err(err) => {
                report(LogLevel::Error, "expression region is not well formed", err);
                return;
            }
        }
        insert_content(&dom, parent, value, end);
    });
    true
}

fn release(dom: &Dom, nodes: Vec<NodeId>) {
    for node in nodes {
        dom.free_subtree(node);
    }
}

/// Insert `value` before `reference`.
fn insert_content(dom: &Dom, parent: NodeId, value: &Value, reference: NodeId) {
    let node = match value {
        Value::Null => return,
        Value::List(items) => {
            for item in items.iter() {
                insert_content(dom, parent, item, reference);
            }
            return;
        }
        Value::Template(template) => match dom.clone_subtree(*template) {
            Ok(copy) => copy,
            Err(err) => {
                report(LogLevel::Warn, "expression template is not a node", err);
                return;
            }
        },
        other => dom.create_text(&other.to_string()),
    };
    if let Err(err) = dom.insert_before(parent, node, Some(reference)) {
        report(LogLevel::Error, "expression region is not well formed", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::EventRegistry;
    use crate::primitives::{setup_signals, Binding};
    use crate::reactive::signal;
    use std::rc::Rc;

    fn setup() -> (Dom, Component, NodeId) {
        let dom = Dom::new();
        let host = dom.create_element("x-test");
        let component = Component::new(
            &dom,
            host,
            Rc::new(EventRegistry::new()),
            Rc::new(EngineConfig::default()),
        )
        .unwrap();
        let p = dom.element("p").comment("t0").text("placeholder").comment("//t0").build();
        dom.append_child(component.root().unwrap(), p).unwrap();
        (dom, component, p)
    }

    #[test]
    fn test_text_region_reuses_one_node() {
        let (dom, component, p) = setup();
        let label = signal(Value::from("hello"));

        setup_signals(
            &component,
            component.root().unwrap(),
            vec![Binding::text(label.clone(), "t0")],
            component.cleanups(),
        );
        assert_eq!(dom.text_content(p), "hello");
        let text_node = dom.children(p)[1];

        label.set(Value::from(42));
        assert_eq!(dom.text_content(p), "42");
        assert_eq!(dom.children(p)[1], text_node);
        assert_eq!(dom.children(p).len(), 3);
    }

    #[test]
    fn test_expression_region_replaces_content() {
        let (dom, component, p) = setup();
        let template = dom.element("b").text("bold").build();
        let content = signal(Value::Template(template));

        setup_signals(
            &component,
            component.root().unwrap(),
            vec![Binding::expression(content.clone(), "t0")],
            component.cleanups(),
        );
        assert_eq!(dom.children(p).len(), 3);
        assert_eq!(dom.tag_name(dom.children(p)[1]).as_deref(), Some("b"));
        assert_ne!(dom.children(p)[1], template, "templates are cloned");

        content.set(Value::list([Value::from("a"), Value::from("b")]));
        assert_eq!(dom.text_content(p), "ab");

        content.set(Value::Null);
        assert_eq!(dom.children(p).len(), 2);
    }
}
