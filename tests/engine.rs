//! End-to-end behavior of mounted components: bindings, delegation,
//! reconciliation, refs and teardown through the public API.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use proptest::prelude::*;
use spark_dom::primitives::collect_ref_attrs;
use spark_dom::reactive::live_effect_count;
use spark_dom::{
    effect, setup_refs, signal, Binding, Component, ComponentDefinitions, Dom, EngineConfig, Event,
    ItemTemplate, NodeId, RefMap, Signal, Value, View,
};

// =============================================================================
// Helpers
// =============================================================================

/// Define `x-test` with `setup`, create one instance and run its setup.
fn mount<F>(dom: &Dom, setup: F) -> Component
where
    F: Fn(&Component) -> Option<View> + 'static,
{
    let defs = ComponentDefinitions::new(dom, EngineConfig::default());
    defs.define("x-test", setup).unwrap();
    let component = defs.create("x-test").unwrap();
    dom.run_microtasks();
    assert!(component.is_initialized());
    component
}

fn strs(items: &[&str]) -> Value {
    Value::list(items.iter().map(|s| Value::from(*s)))
}

/// `<li><!--v-->value<!--//v--></li>`
fn row_template() -> ItemTemplate {
    ItemTemplate::new(|ctx| {
        let li = ctx.dom.element("li").comment("v").comment("//v").build();
        let fragment = ctx.dom.fragment([li]).unwrap();
        View::new(fragment).bind(Binding::text(ctx.value.clone(), "v"))
    })
}

/// A component rendering `list` into a `<ul>`. Returns the component and the `<ul>`.
fn list_component(dom: &Dom, list: &Signal<Value>) -> (Component, NodeId) {
    let list = list.clone();
    let component = mount(dom, move |c| {
        let dom = c.dom();
        let ul = dom.element("ul").comment("items").comment("//items").build();
        let fragment = dom.fragment([ul]).unwrap();
        Some(View::new(fragment).bind(Binding::array(list.clone(), "items", row_template())))
    });
    let ul = dom.first_child(component.root().unwrap()).unwrap();
    (component, ul)
}

fn rows(dom: &Dom, ul: NodeId) -> Vec<NodeId> {
    dom.children(ul).into_iter().filter(|&n| dom.is_element(n)).collect()
}

// =============================================================================
// Reactivity
// =============================================================================

#[test]
fn effect_follows_only_the_latest_reads() {
    let flag = signal(true);
    let a = signal(0);
    let b = signal(0);
    let runs = Rc::new(Cell::new(0));

    let (flag_c, a_c, b_c, runs_c) = (flag.clone(), a.clone(), b.clone(), runs.clone());
    let e = effect(move || {
        runs_c.set(runs_c.get() + 1);
        if flag_c.get() {
            a_c.get();
        } else {
            b_c.get();
        }
    });
    assert_eq!(runs.get(), 1);

    a.set(1);
    assert_eq!(runs.get(), 2);
    b.set(1);
    assert_eq!(runs.get(), 2, "b not read yet");

    flag.set(false);
    assert_eq!(runs.get(), 3);
    a.set(2);
    assert_eq!(runs.get(), 3, "a no longer read");
    b.set(2);
    assert_eq!(runs.get(), 4);

    e.dispose();
}

#[test]
fn same_attribute_text_is_written_once() {
    let dom = Dom::new();
    let title = signal(Value::from("a"));
    let title_c = title.clone();
    let component = mount(&dom, move |c| {
        let div = c.dom().element("div").attr("data-bind-0", "").build();
        let fragment = c.dom().fragment([div]).unwrap();
        Some(View::new(fragment).bind(Binding::attribute(title_c.clone(), "data-bind-0", "title")))
    });
    let div = dom.first_child(component.root().unwrap()).unwrap();
    assert_eq!(dom.get_attribute(div, "title").as_deref(), Some("a"));

    dom.reset_stats();
    title.set(Value::from("x"));
    title.set(Value::list([Value::from("x")]));
    assert_eq!(dom.stats().attribute_writes, 1);
}

// =============================================================================
// Event Delegation
// =============================================================================

#[test]
fn nearest_marked_ancestor_handles_the_event() {
    let dom = Dom::new();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let nodes: Rc<RefCell<Option<(NodeId, NodeId)>>> = Rc::new(RefCell::new(None));

    let (log_c, nodes_c) = (log.clone(), nodes.clone());
    let component = mount(&dom, move |c| {
        let log_a = log_c.clone();
        let log_b = log_c.clone();
        let a = c.on("click", move |_, _| log_a.borrow_mut().push("A"));
        let b = c.on("click", move |_, _| log_b.borrow_mut().push("B"));

        let dom = c.dom();
        let em = dom.element("em").build();
        let span = dom
            .element("span")
            .attr("data-on-click", &a.to_string())
            .child(em)
            .build();
        let div = dom
            .element("div")
            .attr("data-on-click", &b.to_string())
            .child(span)
            .build();
        *nodes_c.borrow_mut() = Some((span, em));
        Some(View::new(dom.fragment([div]).unwrap()))
    });
    let (span, em) = nodes.borrow().unwrap();

    dom.dispatch_event(em, Event::bubbling("click"));
    assert_eq!(*log.borrow(), vec!["A"]);

    dom.remove_attribute(span, "data-on-click");
    dom.dispatch_event(em, Event::bubbling("click"));
    assert_eq!(*log.borrow(), vec!["A", "B"]);

    assert_eq!(component.delegated_event_types(), vec!["click".to_string()]);
}

#[test]
fn delegation_covers_items_inserted_after_mount() {
    let dom = Dom::new();
    let clicks = Rc::new(Cell::new(0));
    let list = signal(Value::list([]));

    let (clicks_c, list_c) = (clicks.clone(), list.clone());
    let component = mount(&dom, move |c| {
        let clicks = clicks_c.clone();
        let id = c.on("click", move |_, _| clicks.set(clicks.get() + 1));
        let marker = id.to_string();
        let row = ItemTemplate::new(move |ctx| {
            let span = ctx.dom.element("span").build();
            let li = ctx.dom.element("li").attr("data-on-click", &marker).child(span).build();
            View::new(ctx.dom.fragment([li]).unwrap())
        });

        let dom = c.dom();
        let button = dom.element("button").attr("data-on-click", &id.to_string()).build();
        let ul = dom.element("ul").comment("items").comment("//items").build();
        let fragment = dom.fragment([button, ul]).unwrap();
        Some(View::new(fragment).bind(Binding::array(list_c.clone(), "items", row)))
    });
    let root = component.root().unwrap();
    assert!(component.delegates("click"));
    assert_eq!(dom.listener_count_in(root), 1);

    list.set(strs(&["a"]));
    let ul = dom.children(root)[1];
    let li = rows(&dom, ul)[0];
    let span = dom.first_child(li).unwrap();

    dom.dispatch_event(span, Event::bubbling("click"));

    assert_eq!(clicks.get(), 1);
    assert_eq!(dom.listener_count_in(li), 0);
    assert_eq!(dom.listener_count_in(root), 1, "still only the root listener");
    assert!(dom.has_attribute(li, "data-on-click"), "resolved at dispatch time");
}

// =============================================================================
// List Reconciliation
// =============================================================================

#[test]
fn reorder_moves_existing_nodes() {
    let dom = Dom::new();
    let list = signal(strs(&["a", "b", "c"]));
    let (_component, ul) = list_component(&dom, &list);
    let before = rows(&dom, ul);

    list.set(strs(&["c", "a", "b"]));

    assert_eq!(rows(&dom, ul), vec![before[2], before[0], before[1]]);
    assert_eq!(dom.text_content(ul), "cab");
}

#[test]
fn replaced_item_is_disposed_and_new_one_bound() {
    let dom = Dom::new();
    let list = signal(strs(&["a", "b"]));
    let (_component, ul) = list_component(&dom, &list);
    let before = rows(&dom, ul);
    let effects = live_effect_count();

    list.set(strs(&["a", "c"]));

    let after = rows(&dom, ul);
    assert_eq!(after[0], before[0]);
    assert_ne!(after[1], before[1]);
    assert_eq!(dom.parent(before[1]), None);
    assert_eq!(dom.text_content(ul), "ac");
    assert_eq!(live_effect_count(), effects, "one item effect out, one in");
}

#[test]
fn non_list_values_empty_the_region() {
    let dom = Dom::new();
    let list = signal(strs(&["a", "b", "c"]));
    let (_component, ul) = list_component(&dom, &list);
    let with_items = live_effect_count();

    list.set(Value::Null);
    assert!(rows(&dom, ul).is_empty());
    assert_eq!(live_effect_count(), with_items - 3);

    list.set(Value::from("not an array"));
    assert!(rows(&dom, ul).is_empty());
    assert_eq!(live_effect_count(), with_items - 3);
    assert_eq!(dom.children(ul).len(), 2, "markers stay");
}

const KEYS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

fn key_list() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(KEYS.to_vec(), 0..=KEYS.len()).prop_shuffle()
}

proptest! {
    #[test]
    fn reconciled_region_matches_list_and_keeps_nodes(old in key_list(), new in key_list()) {
        let dom = Dom::new();
        let list = signal(strs(&old));
        let (_component, ul) = list_component(&dom, &list);

        let before: HashMap<String, NodeId> = rows(&dom, ul)
            .into_iter()
            .map(|row| (dom.text_content(row), row))
            .collect();

        list.set(strs(&new));

        let after = rows(&dom, ul);
        prop_assert_eq!(dom.text_content(ul), new.concat());
        prop_assert_eq!(after.len(), new.len());
        for (key, row) in new.iter().zip(&after) {
            if let Some(&old_row) = before.get(*key) {
                prop_assert_eq!(old_row, *row, "node for {} was recreated", key);
            }
        }
    }
}

// =============================================================================
// Refs
// =============================================================================

#[test]
fn ref_callback_fires_once_per_mount() {
    let dom = Dom::new();
    let resolved: Rc<RefCell<Vec<NodeId>>> = Rc::new(RefCell::new(Vec::new()));

    let resolved_c = resolved.clone();
    let component = mount(&dom, move |c| {
        let input = c.dom().element("input").attr("data-ref", "3").build();
        let resolved = resolved_c.clone();
        let refs = RefMap::new().with(3, move |el| resolved.borrow_mut().push(el));
        Some(View::new(c.dom().fragment([input]).unwrap()).refs(refs))
    });
    assert_eq!(resolved.borrow().len(), 1);

    let root = component.root().unwrap();
    let again = collect_ref_attrs(&dom, root, "data-ref");
    let refs = RefMap::new().with(3, |_| panic!("resolved twice"));
    assert_eq!(setup_refs(&dom, Some(again.as_slice()), Some(&refs)), 0);
    assert_eq!(resolved.borrow().len(), 1);
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn destroy_releases_listeners_and_effects() {
    let dom = Dom::new();
    let baseline = live_effect_count();
    let title = signal(Value::from("t"));
    let list = signal(strs(&["a", "b"]));
    let clicks = Rc::new(Cell::new(0));

    let (title_c, list_c, clicks_c) = (title.clone(), list.clone(), clicks.clone());
    let component = mount(&dom, move |c| {
        let clicks = clicks_c.clone();
        let id = c.on("click", move |_, _| clicks.set(clicks.get() + 1));
        let dom = c.dom();
        let button = dom
            .element("button")
            .attr("data-on-click", &id.to_string())
            .attr("data-bind-0", "")
            .build();
        let ul = dom.element("ul").comment("items").comment("//items").build();
        let fragment = dom.fragment([button, ul]).unwrap();
        Some(
            View::new(fragment)
                .bind(Binding::attribute(title_c.clone(), "data-bind-0", "title"))
                .bind(Binding::array(list_c.clone(), "items", row_template())),
        )
    });
    let root = component.root().unwrap();
    let button = dom.first_child(root).unwrap();
    assert!(live_effect_count() > baseline);
    assert_eq!(dom.listener_count_in(root), 1);

    component.destroy();

    assert_eq!(live_effect_count(), baseline);
    assert_eq!(dom.listener_count_in(root), 0);
    assert!(component.registry().is_empty());

    dom.reset_stats();
    title.set(Value::from("changed"));
    list.set(strs(&["x", "y", "z"]));
    dom.dispatch_event(button, Event::bubbling("click"));
    assert_eq!(dom.stats().attribute_writes, 0);
    assert_eq!(dom.stats().insertions, 0);
    assert_eq!(clicks.get(), 0);
    assert_eq!(title.subscriber_count(), 0);
}

#[test]
fn setup_is_skipped_when_destroyed_before_the_microtask() {
    let dom = Dom::new();
    let ran = Rc::new(Cell::new(false));
    let defs = ComponentDefinitions::new(&dom, EngineConfig::default());
    let ran_c = ran.clone();
    defs.define("x-late", move |_| {
        ran_c.set(true);
        None
    })
    .unwrap();

    let component = defs.create("x-late").unwrap();
    component.destroy();
    dom.run_microtasks();

    assert!(!ran.get());
    assert!(!component.is_initialized());
}
