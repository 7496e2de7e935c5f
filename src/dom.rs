//! DOM adapter seam.
//!
//! The popup, search, and truncation components never touch a concrete
//! document type. They drive the page through [`DomAdapter`], a minimal
//! capability set covering structure, queries, text, geometry, and
//! visibility. [`crate::memdom::MemDom`] is the in-memory reference
//! implementation; a host embedding the crate in a real page supplies its
//! own.
//!
//! Adapter contract: document-scoped queries (`by_id`, `elements_by_tag`)
//! see only the attached document; detached subtrees stay alive but are
//! invisible to them, matching live-DOM selector semantics. Subtree-scoped
//! queries walk whatever root they are given. Geometry of a detached or
//! unknown node degrades to zero; no operation panics on a stale handle.

// ============================================================================
// Handles and Geometry
// ============================================================================

/// Opaque handle to a page node. Handles stay valid for the page lifetime;
/// operations on a removed node are silent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Rendered size in pixels (inner box).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Page-coordinate offset in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub left: f64,
    pub top: f64,
}

// ============================================================================
// Adapter Trait
// ============================================================================

/// The capability set the page components require from a document.
pub trait DomAdapter {
    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// The document body, the root every attached node descends from.
    fn body(&self) -> NodeId;

    /// First attached element with the given id.
    fn by_id(&self, id: &str) -> Option<NodeId>;

    /// All attached elements with the given tag, in document order.
    fn elements_by_tag(&self, tag: &str) -> Vec<NodeId>;

    /// Parent of a node, if it has one.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Create a detached element with a tag and a single class.
    fn create_element(&mut self, tag: &str, class: &str) -> NodeId;

    /// Create a detached node holding a raw markup fragment (e.g. a
    /// server-rendered results view). The fragment is opaque to queries.
    fn create_fragment(&mut self, markup: &str) -> NodeId;

    /// Deep-copy a subtree; the copy is detached.
    fn clone_subtree(&mut self, node: NodeId) -> NodeId;

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Insert `node` as the next sibling of `reference`.
    fn insert_after(&mut self, reference: NodeId, node: NodeId);

    /// Detach a node from its parent, keeping the subtree alive for later
    /// re-insertion.
    fn detach(&mut self, node: NodeId);

    /// Remove a node and drop its subtree.
    fn remove(&mut self, node: NodeId);

    /// Whether the node is currently part of the attached document.
    fn is_attached(&self, node: NodeId) -> bool;

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Tag name of a node ("" for unknown handles).
    fn tag(&self, node: NodeId) -> &str;

    fn has_class(&self, node: NodeId, class: &str) -> bool;

    fn add_class(&mut self, node: NodeId, class: &str);

    /// Descendants of `root` carrying `class`, in document order. `root`
    /// itself is not included.
    fn descendants_with_class(&self, root: NodeId, class: &str) -> Vec<NodeId>;

    /// Direct children of `node` carrying `class`.
    fn children_with_class(&self, node: NodeId, class: &str) -> Vec<NodeId>;

    /// Last descendant of `node` (document order) with the given tag.
    fn last_descendant_with_tag(&self, node: NodeId, tag: &str) -> Option<NodeId>;

    /// First element descendant of `node` in document order.
    fn first_element_descendant(&self, node: NodeId) -> Option<NodeId>;

    /// Nearest ancestor of `node` carrying `class`.
    fn ancestor_with_class(&self, node: NodeId, class: &str) -> Option<NodeId>;

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Plain-text rendering of the subtree (markup-free).
    fn text(&self, node: NodeId) -> String;

    /// Replace the node's own text content.
    fn set_text(&mut self, node: NodeId, text: &str);

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Rendered inner size of a node.
    fn measure(&self, node: NodeId) -> Size;

    /// Full rendered height including the parts a clipping ancestor hides.
    fn outer_height(&self, node: NodeId) -> f64;

    /// Page offset of a node. Zero for detached or unknown nodes.
    fn offset(&self, node: NodeId) -> Offset;

    fn set_offset(&mut self, node: NodeId, offset: Offset);

    /// Force the node's inner width.
    fn set_inner_width(&mut self, node: NodeId, width: f64);

    /// Current document width in pixels.
    fn document_width(&self) -> f64;

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    fn show(&mut self, node: NodeId);

    fn hide(&mut self, node: NodeId);

    fn is_visible(&self, node: NodeId) -> bool;

    /// Bring a node into the viewport.
    fn scroll_into_view(&mut self, node: NodeId);
}
