//! Fluent element construction.

use crate::log::{report, LogLevel};

use super::{Dom, NodeId};

/// Builds an element and its children.
///
/// ```ignore
/// let li = dom.element("li").attr("class", "item").text("hello").build();
/// ```
pub struct ElementBuilder<'a> {
    dom: &'a Dom,
    node: NodeId,
}

impl Dom {
    pub fn element(&self, tag: &str) -> ElementBuilder<'_> {
        ElementBuilder {
            dom: self,
            node: self.create_element(tag),
        }
    }
}

impl ElementBuilder<'_> {
    pub fn attr(self, name: &str, value: &str) -> Self {
        self.dom.set_attribute(self.node, name, value);
        self
    }

    pub fn text(self, text: &str) -> Self {
        let node = self.dom.create_text(text);
        self.child(node)
    }

    pub fn comment(self, text: &str) -> Self {
        let node = self.dom.create_comment(text);
        self.child(node)
    }

    pub fn child(self, child: NodeId) -> Self {
        if let Err(err) = self.dom.append_child(self.node, child) {
            report(LogLevel::Warn, "builder child rejected", err);
        }
        self
    }

    pub fn children(self, children: impl IntoIterator<Item = NodeId>) -> Self {
        children.into_iter().fold(self, |builder, child| builder.child(child))
    }

    pub fn build(self) -> NodeId {
        self.node
    }
}
