//! List Reconciler - keyed rendering of array regions.
//!
//! An array binding owns the nodes between `<!--marker-->` and
//! `<!--//marker-->`. Every change of the bound list is diffed by key
//! against the items rendered last time:
//!
//! - Removed keys: nodes leave the region and the item's bindings are
//!   disposed.
//! - New keys: the item template renders a fresh view, which is wired to
//!   its own signals, events and refs before insertion.
//! - Kept keys: nodes are reused as they are. The new value reaches them
//!   through the item's value signal, nothing re-renders.
//!
//! An item owns the run of siblings from the first to the last top-level
//! node its template rendered. Regions at the top level of an item grow
//! and shrink between those two nodes, so the run is walked again whenever
//! the item is moved or disposed.
//!
//! Nodes are then placed in list order with a cursor starting at the
//! opening marker. A node already sitting right after the cursor is not
//! touched, so moving one item costs one insertion. Disposed items release
//! their nodes back to the document.
//!
//! # Example
//!
//! ```text
//! old:  <!--l--> Na Nb Nc <!--//l-->
//! new:  [c, a, b]
//! walk: cursor=<!--l-->  next=Na  want Nc  → insert Nc before Na
//!       cursor=Nc        next=Na  want Na  → keep
//!       cursor=Na        next=Nb  want Nb  → keep
//! ```
//!
//! When a list holds duplicate keys the last occurrence wins. Earlier
//! duplicates are dropped with a warning.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::dom::{Dom, NodeId};
use crate::engine::Component;
use crate::events::bind_events;
use crate::log::{report, LogLevel};
use crate::reactive::{signal, untrack, Signal};
use crate::value::{ItemKey, Value};

use super::bind::{bind_signal_to_element, setup_signals};
use super::refs::{collect_ref_attrs, setup_refs};
use super::types::{CleanupList, ItemContext, ItemTemplate};

// =============================================================================
// Rendered Items
// =============================================================================

/// One rendered list entry and the nodes it owns.
pub struct RenderedItem {
    key: ItemKey,
    value: Signal<Value>,
    /// First and last top-level node. `None` for an empty render.
    bounds: Option<(NodeId, NodeId)>,
    cleanups: CleanupList,
}

impl RenderedItem {
    pub fn key(&self) -> &ItemKey {
        &self.key
    }

    pub fn bounds(&self) -> Option<(NodeId, NodeId)> {
        self.bounds
    }

    /// Top-level nodes of the item, in document order.
    pub fn nodes(&self, dom: &Dom) -> Vec<NodeId> {
        let Some((first, last)) = self.bounds else {
            return Vec::new();
        };
        let mut nodes = Vec::new();
        let mut current = Some(first);
        while let Some(node) = current {
            nodes.push(node);
            if node == last {
                break;
            }
            current = dom.next_sibling(node);
        }
        nodes
    }

    pub fn value(&self) -> Value {
        self.value.peek()
    }

    /// Dispose the item's bindings, then release its nodes.
    fn dispose(self, dom: &Dom) {
        self.cleanups.run_all();
        for node in self.nodes(dom) {
            dom.free_subtree(node);
        }
    }
}

impl fmt::Debug for RenderedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedItem")
            .field("key", &self.key)
            .field("bounds", &self.bounds)
            .finish()
    }
}

/// Region state between two reconciliations.
struct ArrayRegion {
    start: NodeId,
    end: NodeId,
    template: ItemTemplate,
    items: RefCell<Vec<RenderedItem>>,
}

// =============================================================================
// Array Binding
// =============================================================================

pub(crate) fn bind_array(
    component: &Component,
    scope: NodeId,
    signal: &Signal<Value>,
    marker: &str,
    template: ItemTemplate,
    cleanups: &CleanupList,
) -> bool {
    let end_value = component.config().region_end(marker);
    let Some((start, end)) = component
        .dom()
        .find_comment_placeholders(scope, marker, &end_value)
    else {
        return false;
    };

    let region = Rc::new(ArrayRegion {
        start,
        end,
        template,
        items: RefCell::new(Vec::new()),
    });

    let weak = component.downgrade();
    let region_c = region.clone();
    bind_signal_to_element(cleanups, signal, move |value| {
        let Some(component) = weak.upgrade() else {
            return;
        };
        let new_values = value.as_list().unwrap_or(&[]);
        let old_items = std::mem::take(&mut *region_c.items.borrow_mut());
        let next = reconcile_arrays(
            &component,
            region_c.start,
            region_c.end,
            old_items,
            new_values,
            &region_c.template,
        );
        *region_c.items.borrow_mut() = next;
    });

    // Registered after the effect, so it runs once the effect is disposed.
    let dom = component.dom().clone();
    cleanups.add(move || {
        let items = std::mem::take(&mut *region.items.borrow_mut());
        for item in items {
            item.dispose(&dom);
        }
    });
    true
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Update the region between `start` and `end` from `old_items` to
/// `new_values`. Returns the items now rendered, in list order.
pub fn reconcile_arrays(
    component: &Component,
    start: NodeId,
    end: NodeId,
    old_items: Vec<RenderedItem>,
    new_values: &[Value],
    template: &ItemTemplate,
) -> Vec<RenderedItem> {
    let dom = component.dom().clone();
    let Some(parent) = dom.parent(start) else {
        report(
            LogLevel::Error,
            "array region start marker is detached",
            (start, end),
        );
        return old_items;
    };

    let entries = dedupe_last_wins(new_values, template);
    let wanted: HashSet<&ItemKey> = entries.iter().map(|(key, _)| key).collect();

    // 1. Drop items whose key is gone
    let mut reusable: HashMap<ItemKey, RenderedItem> = HashMap::with_capacity(old_items.len());
    for item in old_items {
        if wanted.contains(&item.key) {
            reusable.insert(item.key.clone(), item);
        } else {
            item.dispose(&dom);
        }
    }

    // 2. Reuse or render, in new order
    let mut next = Vec::with_capacity(entries.len());
    let mut fragments = Vec::new();
    for (index, (key, value)) in entries.into_iter().enumerate() {
        match reusable.remove(&key) {
            Some(item) => {
                item.value.set(value);
                next.push(item);
            }
            None => {
                let (item, fragment) = render_item(component, template, index, key, value);
                fragments.push(fragment);
                next.push(item);
            }
        }
    }

    // 3. Position with a cursor, skipping nodes already in place
    let mut cursor = start;
    let mut moved = 0usize;
    for item in &next {
        for node in item.nodes(&dom) {
            let reference = dom.next_sibling(cursor).unwrap_or(end);
            if reference != node {
                if let Err(err) = dom.insert_before(parent, node, Some(reference)) {
                    report(LogLevel::Error, "failed to place list item", err);
                    continue;
                }
                moved += 1;
            }
            cursor = node;
        }
    }

    for fragment in fragments {
        if dom.first_child(fragment).is_none() {
            dom.free_subtree(fragment);
        }
    }

    tracing::trace!(id = %component.id(), items = next.len(), moved, "array reconciled");
    next
}

fn dedupe_last_wins(values: &[Value], template: &ItemTemplate) -> Vec<(ItemKey, Value)> {
    let keyed: Vec<(ItemKey, &Value)> = values.iter().map(|v| (template.key_of(v), v)).collect();

    let mut last: HashMap<&ItemKey, usize> = HashMap::with_capacity(keyed.len());
    for (index, (key, _)) in keyed.iter().enumerate() {
        last.insert(key, index);
    }

    if last.len() != keyed.len() {
        let duplicates: Vec<String> = keyed
            .iter()
            .enumerate()
            .filter(|(index, (key, _))| last.get(key) != Some(index))
            .map(|(_, (key, _))| key.to_string())
            .collect();
        report(
            LogLevel::Warn,
            "duplicate list keys, keeping the last occurrence",
            &duplicates,
        );
    }

    keyed
        .iter()
        .enumerate()
        .filter(|(index, (key, _))| last.get(key) == Some(index))
        .map(|(_, (key, value))| (key.clone(), (*value).clone()))
        .collect()
}

/// Render and wire one item. Returns it with the fragment still holding
/// its nodes.
fn render_item(
    component: &Component,
    template: &ItemTemplate,
    index: usize,
    key: ItemKey,
    value: Value,
) -> (RenderedItem, NodeId) {
    let dom = component.dom();
    let ctx = ItemContext {
        dom: dom.clone(),
        value: signal(value),
        index,
        key,
    };
    let view = untrack(|| template.render(&ctx));
    let fragment = view.fragment;
    let cleanups = CleanupList::new();

    let ref_attrs = collect_ref_attrs(dom, fragment, &component.config().ref_attr);
    setup_signals(component, fragment, view.bindings, &cleanups);
    bind_events(component, &dom.elements(fragment), &cleanups);
    setup_refs(dom, Some(ref_attrs.as_slice()), view.refs.as_ref());

    // Bindings may have replaced top-level nodes, so bounds are read last
    let bounds = dom.first_child(fragment).zip(dom.last_child(fragment));
    let item = RenderedItem {
        key: ctx.key,
        value: ctx.value,
        bounds,
        cleanups,
    };
    (item, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dom::Dom;
    use crate::engine::EventRegistry;
    use crate::primitives::{setup_signals, Binding, View};
    use crate::value::KeyExtractor;
    use std::cell::Cell;

    fn setup() -> (Dom, Component, NodeId) {
        let dom = Dom::new();
        let host = dom.create_element("x-list");
        let component = Component::new(
            &dom,
            host,
            Rc::new(EventRegistry::new()),
            Rc::new(EngineConfig::default()),
        )
        .unwrap();
        let ul = dom.element("ul").comment("items").comment("//items").build();
        dom.append_child(component.root().unwrap(), ul).unwrap();
        (dom, component, ul)
    }

    /// `<li>` with a text binding to the item value.
    fn li_template(renders: Rc<Cell<usize>>) -> ItemTemplate {
        ItemTemplate::new(move |ctx| {
            renders.set(renders.get() + 1);
            let dom = &ctx.dom;
            let li = dom.element("li").comment("v").comment("//v").build();
            let fragment = dom.create_fragment();
            dom.append_child(fragment, li).unwrap();
            View::new(fragment).bind(Binding::text(ctx.value.clone(), "v"))
        })
    }

    fn strs(items: &[&str]) -> Value {
        Value::list(items.iter().map(|s| Value::from(*s)))
    }

    fn items_of(dom: &Dom, ul: NodeId) -> Vec<NodeId> {
        dom.children(ul).into_iter().filter(|&n| dom.is_element(n)).collect()
    }

    fn mount(component: &Component, list: &Signal<Value>, template: ItemTemplate) {
        setup_signals(
            component,
            component.root().unwrap(),
            vec![Binding::array(list.clone(), "items", template)],
            component.cleanups(),
        );
    }

    #[test]
    fn test_reorder_reuses_nodes() {
        let (dom, component, ul) = setup();
        let renders = Rc::new(Cell::new(0));
        let list = signal(strs(&["a", "b", "c"]));
        mount(&component, &list, li_template(renders.clone()));

        let before = items_of(&dom, ul);
        assert_eq!(before.len(), 3);

        dom.reset_stats();
        list.set(strs(&["c", "a", "b"]));

        let after = items_of(&dom, ul);
        assert_eq!(after, vec![before[2], before[0], before[1]]);
        assert_eq!(renders.get(), 3, "nothing re-rendered");
        assert_eq!(dom.stats().insertions, 1, "one move");
        assert_eq!(dom.text_content(ul), "cab");
    }

    #[test]
    fn test_replace_one_item() {
        let (dom, component, ul) = setup();
        let renders = Rc::new(Cell::new(0));
        let list = signal(strs(&["a", "b"]));
        mount(&component, &list, li_template(renders.clone()));
        let before = items_of(&dom, ul);

        list.set(strs(&["a", "c"]));

        let after = items_of(&dom, ul);
        assert_eq!(after[0], before[0]);
        assert_ne!(after[1], before[1]);
        assert_eq!(dom.parent(before[1]), None, "b was removed");
        assert_eq!(renders.get(), 3);
        assert_eq!(dom.text_content(ul), "ac");
    }

    /// `<li title=..>` bound to a signal shared by every item.
    fn shared_template(shared: Signal<Value>) -> ItemTemplate {
        ItemTemplate::new(move |ctx| {
            let li = ctx.dom.element("li").attr("data-bind-title", "").build();
            let fragment = ctx.dom.fragment([li]).unwrap();
            View::new(fragment).bind(Binding::attribute(shared.clone(), "data-bind-title", "title"))
        })
    }

    #[test]
    fn test_non_list_empties_region_and_disposes_items() {
        let (dom, component, ul) = setup();
        let shared = signal(Value::from("t"));
        let list = signal(strs(&["a", "b", "c"]));
        mount(&component, &list, shared_template(shared.clone()));
        assert_eq!(shared.subscriber_count(), 3);

        list.set(Value::Null);
        assert!(items_of(&dom, ul).is_empty());
        assert_eq!(shared.subscriber_count(), 0);

        list.set(Value::from("not an array"));
        assert!(items_of(&dom, ul).is_empty());
        assert_eq!(dom.children(ul).len(), 2, "markers stay");
    }

    #[test]
    fn test_reused_item_receives_new_value() {
        let (dom, component, ul) = setup();
        let renders = Rc::new(Cell::new(0));
        let template = li_template(renders.clone()).keyed(KeyExtractor::Field("id".into()));
        let row = |id: i32, label: &str| Value::record([("id", Value::from(id)), ("label", Value::from(label))]);
        let list = signal(Value::list([row(1, "one"), row(2, "two")]));
        mount(&component, &list, template);
        let before = items_of(&dom, ul);

        list.set(Value::list([row(2, "two"), row(1, "uno")]));

        assert_eq!(items_of(&dom, ul), vec![before[1], before[0]]);
        assert_eq!(renders.get(), 2);
        assert_eq!(dom.text_content(ul), "[object Object][object Object]");
    }

    #[test]
    fn test_duplicate_keys_keep_last() {
        let (dom, component, ul) = setup();
        let renders = Rc::new(Cell::new(0));
        let list = signal(strs(&["a", "b", "a"]));
        mount(&component, &list, li_template(renders));

        assert_eq!(items_of(&dom, ul).len(), 2);
        assert_eq!(dom.text_content(ul), "ba");
    }

    #[test]
    fn test_destroy_disposes_rendered_items() {
        let (dom, component, ul) = setup();
        let shared = signal(Value::from("t"));
        let list = signal(strs(&["a", "b"]));
        mount(&component, &list, shared_template(shared.clone()));

        component.destroy();

        assert_eq!(shared.subscriber_count(), 0);
        assert_eq!(list.subscriber_count(), 0);
        assert!(items_of(&dom, ul).is_empty());
    }

    /// `<!--v-->value<!--//v-->` with no element around it.
    fn bare_text_template() -> ItemTemplate {
        ItemTemplate::new(|ctx| {
            let open = ctx.dom.create_comment("v");
            let close = ctx.dom.create_comment("//v");
            let fragment = ctx.dom.fragment([open, close]).unwrap();
            View::new(fragment).bind(Binding::text(ctx.value.clone(), "v"))
        })
    }

    #[test]
    fn test_top_level_region_moves_with_its_item() {
        let (dom, component, ul) = setup();
        let list = signal(strs(&["a", "b"]));
        mount(&component, &list, bare_text_template());
        assert_eq!(dom.text_content(ul), "ab");
        assert_eq!(dom.children(ul).len(), 2 + 2 * 3);

        list.set(strs(&["b", "a"]));
        assert_eq!(dom.text_content(ul), "ba");

        list.set(strs(&["b", "a", "c"]));
        assert_eq!(dom.text_content(ul), "bac");

        list.set(Value::list([]));
        assert_eq!(dom.text_content(ul), "");
        assert_eq!(dom.children(ul).len(), 2, "only the region markers stay");
    }

    #[test]
    fn test_nested_region_at_item_top_level() {
        let (dom, component, ul) = setup();
        let inner = ItemTemplate::new(|ctx| {
            let open = ctx.dom.create_comment("inner");
            let close = ctx.dom.create_comment("//inner");
            let fragment = ctx.dom.fragment([open, close]).unwrap();
            View::new(fragment).bind(Binding::array(ctx.value.clone(), "inner", bare_text_template()))
        });
        let list = signal(Value::list([strs(&["a", "b"]), strs(&["c"])]));
        mount(&component, &list, inner);
        assert_eq!(dom.text_content(ul), "abc");

        let first = list.peek().as_list().unwrap()[0].clone();
        let second = list.peek().as_list().unwrap()[1].clone();
        list.set(Value::list([second, first]));
        assert_eq!(dom.text_content(ul), "cab");

        list.set(Value::Null);
        assert_eq!(dom.children(ul).len(), 2);
    }

    #[test]
    fn test_node_count_stays_flat_under_churn() {
        let (dom, component, _ul) = setup();
        let list = signal(strs(&["a"]));
        mount(&component, &list, li_template(Rc::new(Cell::new(0))));
        let baseline = dom.node_count();

        for round in 0..200 {
            let label = if round % 2 == 0 { "b" } else { "a" };
            list.set(strs(&[label]));
            assert_eq!(dom.node_count(), baseline);
        }
        assert_eq!(dom.text_content(component.root().unwrap()), "a");
    }

    #[test]
    fn test_item_events_bind_directly_without_delegation() {
        let (dom, component, ul) = setup();
        let clicks = Rc::new(Cell::new(0));
        let clicks_c = clicks.clone();
        let id = component.on("click", move |_, _| clicks_c.set(clicks_c.get() + 1));
        let template = ItemTemplate::new(move |ctx| {
            let li = ctx.dom.element("li").attr("data-on-click", &id.to_string()).build();
            View::new(ctx.dom.fragment([li]).unwrap())
        });
        let list = signal(strs(&["a"]));
        mount(&component, &list, template);

        let li = items_of(&dom, ul)[0];
        dom.dispatch_event(li, crate::dom::Event::bubbling("click"));

        assert_eq!(clicks.get(), 1);
        assert!(!dom.has_attribute(li, "data-on-click"));
    }
}
