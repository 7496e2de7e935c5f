//! In-memory reference implementation of [`DomAdapter`].
//!
//! `MemDom` models a page as an arena of nodes with explicit metrics, so the
//! placement and truncation logic can run headlessly, in tests or in a host
//! that mirrors a real document into it. Layout is deliberately crude:
//! a node measures as its explicit size when one was set, otherwise as a
//! block-style fold of its children (max width, summed heights).

use crate::dom::{DomAdapter, NodeId, Offset, Size};

// ============================================================================
// Node Storage
// ============================================================================

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    /// Raw markup for fragment nodes; opaque to queries and text rendering.
    markup: Option<String>,
    parent: Option<usize>,
    children: Vec<usize>,
    size: Option<Size>,
    outer_height: Option<f64>,
    offset: Offset,
    visible: bool,
    alive: bool,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            text: String::new(),
            markup: None,
            parent: None,
            children: Vec::new(),
            size: None,
            outer_height: None,
            offset: Offset::default(),
            visible: true,
            alive: true,
        }
    }
}

// ============================================================================
// Document
// ============================================================================

/// Arena-backed document. Index 0 is the body.
#[derive(Debug, Clone)]
pub struct MemDom {
    nodes: Vec<NodeData>,
    document_width: f64,
    scrolled_to: Option<NodeId>,
}

impl Default for MemDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemDom {
    /// Empty document: a body and nothing else.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new("body")],
            document_width: 1024.0,
            scrolled_to: None,
        }
    }

    // ------------------------------------------------------------------
    // Host-construction API (beyond the adapter trait)
    // ------------------------------------------------------------------

    /// Create an element and append it under `parent`. `id` and `class` may
    /// be empty.
    pub fn element(&mut self, parent: NodeId, tag: &str, id: &str, class: &str) -> NodeId {
        let node = self.create_element(tag, class);
        if !id.is_empty() {
            self.nodes[node.0].id = Some(id.to_string());
        }
        self.append_child(parent, node);
        node
    }

    /// Override a node's rendered size.
    pub fn set_size(&mut self, node: NodeId, width: f64, height: f64) {
        if let Some(data) = self.get_mut(node) {
            data.size = Some(Size { width, height });
        }
    }

    /// Override a node's full rendered height (its visible height stays the
    /// measured one).
    pub fn set_outer_height(&mut self, node: NodeId, height: f64) {
        if let Some(data) = self.get_mut(node) {
            data.outer_height = Some(height);
        }
    }

    pub fn set_document_width(&mut self, width: f64) {
        self.document_width = width;
    }

    /// Last node passed to `scroll_into_view`, for assertions.
    pub fn scrolled_to(&self) -> Option<NodeId> {
        self.scrolled_to
    }

    /// Raw markup of a fragment node, if any.
    pub fn markup(&self, node: NodeId) -> Option<&str> {
        self.get(node).and_then(|d| d.markup.as_deref())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn get(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0).filter(|d| d.alive)
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(node.0).filter(|d| d.alive)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    fn attached(&self, index: usize) -> bool {
        let mut current = index;
        loop {
            let Some(data) = self.nodes.get(current).filter(|d| d.alive) else {
                return false;
            };
            match data.parent {
                Some(parent) => current = parent,
                None => return current == 0,
            }
        }
    }

    fn is_ancestor(&self, candidate: usize, of: usize) -> bool {
        let mut current = of;
        while let Some(parent) = self.nodes.get(current).and_then(|d| d.parent) {
            if parent == candidate {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Depth-first subtree walk, `root` included.
    fn walk(&self, root: usize, out: &mut Vec<usize>) {
        let Some(data) = self.nodes.get(root).filter(|d| d.alive) else {
            return;
        };
        out.push(root);
        for &child in &data.children {
            self.walk(child, out);
        }
    }

    fn subtree(&self, root: NodeId) -> Vec<usize> {
        let mut out = Vec::new();
        if self.get(root).is_some() {
            self.walk(root.0, &mut out);
        }
        out
    }

    fn clone_into(&mut self, source: usize) -> usize {
        let mut copy = self.nodes[source].clone();
        copy.parent = None;
        let children = std::mem::take(&mut copy.children);
        self.nodes.push(copy);
        let index = self.nodes.len() - 1;
        for child in children {
            let child_copy = self.clone_into(child);
            self.nodes[child_copy].parent = Some(index);
            self.nodes[index].children.push(child_copy);
        }
        index
    }

    fn unlink(&mut self, node: usize) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&c| c != node);
        }
    }
}

// ============================================================================
// Adapter Implementation
// ============================================================================

impl DomAdapter for MemDom {
    fn body(&self) -> NodeId {
        NodeId(0)
    }

    fn by_id(&self, id: &str) -> Option<NodeId> {
        self.subtree(self.body())
            .into_iter()
            .find(|&n| self.nodes[n].id.as_deref() == Some(id))
            .map(NodeId)
    }

    fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.subtree(self.body())
            .into_iter()
            .filter(|&n| self.nodes[n].tag == tag)
            .map(NodeId)
            .collect()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|d| d.parent).map(NodeId)
    }

    fn create_element(&mut self, tag: &str, class: &str) -> NodeId {
        let mut data = NodeData::new(tag);
        if !class.is_empty() {
            data.classes.push(class.to_string());
        }
        self.push(data)
    }

    fn create_fragment(&mut self, markup: &str) -> NodeId {
        let mut data = NodeData::new("fragment");
        data.markup = Some(markup.to_string());
        self.push(data)
    }

    fn clone_subtree(&mut self, node: NodeId) -> NodeId {
        if self.get(node).is_none() {
            return self.push(NodeData::new(""));
        }
        NodeId(self.clone_into(node.0))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child
            || self.get(parent).is_none()
            || self.get(child).is_none()
            || self.is_ancestor(child.0, parent.0)
        {
            return;
        }
        self.unlink(child.0);
        self.nodes[child.0].parent = Some(parent.0);
        self.nodes[parent.0].children.push(child.0);
    }

    fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        if reference == node || self.get(reference).is_none() || self.get(node).is_none() {
            return;
        }
        let Some(parent) = self.nodes[reference.0].parent else {
            return;
        };
        if self.is_ancestor(node.0, parent) || node.0 == parent {
            return;
        }
        self.unlink(node.0);
        let position = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == reference.0)
            .map(|p| p + 1)
            .unwrap_or(self.nodes[parent].children.len());
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent].children.insert(position, node.0);
    }

    fn detach(&mut self, node: NodeId) {
        if self.get(node).is_some() && node.0 != 0 {
            self.unlink(node.0);
        }
    }

    fn remove(&mut self, node: NodeId) {
        if self.get(node).is_none() || node.0 == 0 {
            return;
        }
        self.unlink(node.0);
        for index in self.subtree(node) {
            self.nodes[index].alive = false;
        }
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.get(node).is_some() && self.attached(node.0)
    }

    fn tag(&self, node: NodeId) -> &str {
        self.get(node).map(|d| d.tag.as_str()).unwrap_or("")
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.get(node)
            .map(|d| d.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(data) = self.get_mut(node) {
            if !data.classes.iter().any(|c| c == class) {
                data.classes.push(class.to_string());
            }
        }
    }

    fn descendants_with_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.subtree(root)
            .into_iter()
            .skip(1)
            .filter(|&n| self.nodes[n].classes.iter().any(|c| c == class))
            .map(NodeId)
            .collect()
    }

    fn children_with_class(&self, node: NodeId, class: &str) -> Vec<NodeId> {
        let Some(data) = self.get(node) else {
            return Vec::new();
        };
        data.children
            .iter()
            .filter(|&&c| {
                self.nodes[c].alive && self.nodes[c].classes.iter().any(|cl| cl == class)
            })
            .map(|&c| NodeId(c))
            .collect()
    }

    fn last_descendant_with_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.subtree(node)
            .into_iter()
            .skip(1)
            .filter(|&n| self.nodes[n].tag == tag)
            .last()
            .map(NodeId)
    }

    fn first_element_descendant(&self, node: NodeId) -> Option<NodeId> {
        self.subtree(node).into_iter().nth(1).map(NodeId)
    }

    fn ancestor_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        let mut current = self.get(node)?.parent;
        while let Some(index) = current {
            if self.nodes[index].classes.iter().any(|c| c == class) {
                return Some(NodeId(index));
            }
            current = self.nodes[index].parent;
        }
        None
    }

    fn text(&self, node: NodeId) -> String {
        let mut out = String::new();
        for index in self.subtree(node) {
            out.push_str(&self.nodes[index].text);
        }
        out
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(data) = self.get_mut(node) {
            data.text = text.to_string();
        }
    }

    fn measure(&self, node: NodeId) -> Size {
        let Some(data) = self.get(node) else {
            return Size::default();
        };
        if let Some(size) = data.size {
            return size;
        }
        let mut folded = Size::default();
        for &child in &data.children {
            let child_size = self.measure(NodeId(child));
            folded.width = folded.width.max(child_size.width);
            folded.height += child_size.height;
        }
        folded
    }

    fn outer_height(&self, node: NodeId) -> f64 {
        self.get(node)
            .and_then(|d| d.outer_height)
            .unwrap_or_else(|| self.measure(node).height)
    }

    fn offset(&self, node: NodeId) -> Offset {
        if self.is_attached(node) {
            self.nodes[node.0].offset
        } else {
            Offset::default()
        }
    }

    fn set_offset(&mut self, node: NodeId, offset: Offset) {
        if let Some(data) = self.get_mut(node) {
            data.offset = offset;
        }
    }

    fn set_inner_width(&mut self, node: NodeId, width: f64) {
        let height = self.measure(node).height;
        if let Some(data) = self.get_mut(node) {
            data.size = Some(Size { width, height });
        }
    }

    fn document_width(&self) -> f64 {
        self.document_width
    }

    fn show(&mut self, node: NodeId) {
        if let Some(data) = self.get_mut(node) {
            data.visible = true;
        }
    }

    fn hide(&mut self, node: NodeId) {
        if let Some(data) = self.get_mut(node) {
            data.visible = false;
        }
    }

    fn is_visible(&self, node: NodeId) -> bool {
        self.get(node).map(|d| d.visible).unwrap_or(false)
    }

    fn scroll_into_view(&mut self, node: NodeId) {
        if self.get(node).is_some() {
            self.scrolled_to = Some(node);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_nodes_invisible_to_queries() {
        let mut dom = MemDom::new();
        let body = dom.body();
        let main = dom.element(body, "main", "", "");
        assert_eq!(dom.elements_by_tag("main"), vec![main]);

        dom.detach(main);
        assert!(dom.elements_by_tag("main").is_empty());
        assert!(!dom.is_attached(main));

        // Re-attachable: the subtree stayed alive.
        dom.append_child(body, main);
        assert_eq!(dom.elements_by_tag("main"), vec![main]);
    }

    #[test]
    fn test_by_id_and_remove() {
        let mut dom = MemDom::new();
        let body = dom.body();
        let region = dom.element(body, "div", "text", "");
        assert_eq!(dom.by_id("text"), Some(region));

        dom.remove(region);
        assert_eq!(dom.by_id("text"), None);
        // Operations on the dead handle are no-ops.
        dom.set_text(region, "gone");
        assert_eq!(dom.text(region), "");
    }

    #[test]
    fn test_text_concatenates_subtree() {
        let mut dom = MemDom::new();
        let body = dom.body();
        let block = dom.element(body, "div", "", "");
        let first = dom.element(block, "p", "", "");
        let second = dom.element(block, "p", "", "");
        dom.set_text(first, "One. ");
        dom.set_text(second, "Two.");
        assert_eq!(dom.text(block), "One. Two.");
    }

    #[test]
    fn test_measure_folds_children_block_style() {
        let mut dom = MemDom::new();
        let body = dom.body();
        let panel = dom.element(body, "div", "", "");
        let first = dom.element(panel, "p", "", "");
        let second = dom.element(panel, "p", "", "");
        dom.set_size(first, 120.0, 18.0);
        dom.set_size(second, 80.0, 36.0);

        let size = dom.measure(panel);
        assert_eq!(size.width, 120.0);
        assert_eq!(size.height, 54.0);

        // An explicit size wins over the fold.
        dom.set_size(panel, 200.0, 40.0);
        assert_eq!(dom.measure(panel).width, 200.0);
    }

    #[test]
    fn test_clone_subtree_is_deep_and_detached() {
        let mut dom = MemDom::new();
        let body = dom.body();
        let panel = dom.element(body, "div", "", "text-popup");
        let inner = dom.element(panel, "p", "", "");
        dom.set_text(inner, "note");

        let copy = dom.clone_subtree(panel);
        assert!(!dom.is_attached(copy));
        assert_eq!(dom.text(copy), "note");

        // Mutating the copy leaves the original alone.
        dom.remove(copy);
        assert_eq!(dom.text(panel), "note");
    }

    #[test]
    fn test_insert_after_places_next_sibling() {
        let mut dom = MemDom::new();
        let body = dom.body();
        let header = dom.element(body, "header", "", "row");
        let footer = dom.element(body, "footer", "", "row");
        let main = dom.create_element("main", "row");

        dom.insert_after(header, main);
        assert_eq!(
            dom.descendants_with_class(body, "row"),
            vec![header, main, footer]
        );
        assert_eq!(dom.first_element_descendant(body), Some(header));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let mut dom = MemDom::new();
        let body = dom.body();
        let outer = dom.element(body, "div", "", "");
        let inner = dom.element(outer, "div", "", "");
        dom.append_child(inner, outer);
        assert_eq!(dom.parent(outer), Some(body));
    }
}
