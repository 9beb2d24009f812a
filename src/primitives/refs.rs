//! Ref Resolver.
//!
//! A ref marker (`data-ref="3"`) is resolved once: the attribute is
//! stripped and the callback registered under index 3 receives the element.
//! A second pass finds nothing, so callbacks never fire twice.

use crate::dom::{Dom, NodeId};
use crate::events::AttrRef;
use crate::log::{report, LogLevel};

use super::types::RefMap;

/// Ref markers named `ref_attr` on elements under `root`.
pub fn collect_ref_attrs(dom: &Dom, root: NodeId, ref_attr: &str) -> Vec<AttrRef> {
    dom.query_attribute(root, ref_attr)
        .into_iter()
        .filter_map(|element| {
            let value = dom.get_attribute(element, ref_attr)?;
            Some(AttrRef {
                element,
                name: ref_attr.to_string(),
                value,
            })
        })
        .collect()
}

/// Resolve ref markers. Returns how many callbacks ran.
///
/// Does nothing when either input is absent.
pub fn setup_refs(dom: &Dom, ref_attrs: Option<&[AttrRef]>, refs: Option<&RefMap>) -> usize {
    let (Some(ref_attrs), Some(refs)) = (ref_attrs, refs) else {
        return 0;
    };

    let mut resolved = 0;
    for attr in ref_attrs {
        if !dom.remove_attribute(attr.element, &attr.name) {
            continue;
        }
        let Ok(index) = attr.value.trim().parse::<usize>() else {
            report(LogLevel::Warn, "malformed ref index", &attr.value);
            continue;
        };
        if let Some(callback) = refs.take(index) {
            callback(attr.element);
            resolved += 1;
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_ref_resolves_once() {
        let dom = Dom::new();
        let input = dom.element("input").attr("data-ref", "3").build();
        let root = dom.fragment([input]).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_c = seen.clone();
        let refs = RefMap::new().with(3, move |el| seen_c.borrow_mut().push(el));

        let attrs = collect_ref_attrs(&dom, root, "data-ref");
        assert_eq!(setup_refs(&dom, Some(attrs.as_slice()), Some(&refs)), 1);
        assert_eq!(setup_refs(&dom, Some(attrs.as_slice()), Some(&refs)), 0);

        assert_eq!(*seen.borrow(), vec![input]);
        assert!(!dom.has_attribute(input, "data-ref"));
        assert!(collect_ref_attrs(&dom, root, "data-ref").is_empty());
    }

    #[test]
    fn test_missing_inputs_are_a_no_op() {
        let dom = Dom::new();
        let input = dom.element("input").attr("data-ref", "0").build();
        let root = dom.fragment([input]).unwrap();
        let attrs = collect_ref_attrs(&dom, root, "data-ref");

        assert_eq!(setup_refs(&dom, Some(attrs.as_slice()), None), 0);
        assert_eq!(setup_refs(&dom, None, Some(&RefMap::new())), 0);
        assert!(dom.has_attribute(input, "data-ref"), "marker untouched");
    }

    #[test]
    fn test_unmatched_index_still_strips_marker() {
        let dom = Dom::new();
        let input = dom.element("input").attr("data-ref", "7").build();
        let root = dom.fragment([input]).unwrap();
        let attrs = collect_ref_attrs(&dom, root, "data-ref");

        assert_eq!(setup_refs(&dom, Some(attrs.as_slice()), Some(&RefMap::new())), 0);
        assert!(!dom.has_attribute(input, "data-ref"));
    }
}
