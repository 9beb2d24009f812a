//! Tree walking and region helpers.

use crate::error::DomError;

use super::{Dom, NodeId, NodeKind};

impl Dom {
    /// Every node under `root` in document order, `root` excluded.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    /// Element descendants of `root`, in document order.
    pub fn elements(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&node| self.is_element(node))
            .collect()
    }

    /// Elements under `root` carrying attribute `name`.
    pub fn query_attribute(&self, root: NodeId, name: &str) -> Vec<NodeId> {
        self.elements(root)
            .into_iter()
            .filter(|&node| self.has_attribute(node, name))
            .collect()
    }

    /// The next node after `node` in pre-order, staying inside `root`.
    pub fn next_in_preorder(&self, node: NodeId, root: NodeId) -> Option<NodeId> {
        if let Some(child) = self.first_child(node) {
            return Some(child);
        }
        let mut current = node;
        loop {
            if current == root {
                return None;
            }
            if let Some(sibling) = self.next_sibling(current) {
                return Some(sibling);
            }
            current = self.parent(current)?;
        }
    }

    /// The comment pair `<!--marker-->` ... `<!--end_value-->` under `root`.
    ///
    /// The end comment is searched after the start comment only.
    pub fn find_comment_placeholders(
        &self,
        root: NodeId,
        marker: &str,
        end_value: &str,
    ) -> Option<(NodeId, NodeId)> {
        let comments: Vec<NodeId> = self
            .descendants(root)
            .into_iter()
            .filter(|&node| matches!(self.kind(node), Some(NodeKind::Comment)))
            .collect();

        let start_at = comments
            .iter()
            .position(|&node| self.node_value(node).as_deref() == Some(marker))?;
        let end = comments[start_at + 1..]
            .iter()
            .copied()
            .find(|&node| self.node_value(node).as_deref() == Some(end_value))?;
        Some((comments[start_at], end))
    }

    /// Siblings strictly between `start` and `end`.
    pub fn nodes_between(&self, start: NodeId, end: NodeId) -> Result<Vec<NodeId>, DomError> {
        let parent = self.parent(start);
        if parent.is_none() || parent != self.parent(end) {
            return Err(DomError::DetachedRegion { start, end });
        }

        let mut nodes = Vec::new();
        let mut current = self.next_sibling(start);
        while let Some(node) = current {
            if node == end {
                return Ok(nodes);
            }
            nodes.push(node);
            current = self.next_sibling(node);
        }
        Err(DomError::DetachedRegion { start, end })
    }

    /// Remove every sibling between `start` and `end`. Returns the removed nodes.
    pub fn remove_between(&self, start: NodeId, end: NodeId) -> Result<Vec<NodeId>, DomError> {
        let nodes = self.nodes_between(start, end)?;
        for &node in &nodes {
            self.remove(node);
        }
        Ok(nodes)
    }
}
