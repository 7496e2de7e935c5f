//! Transient annotation popups anchored to page elements.
//!
//! A popup is a hover-dismissible overlay panel positioned against an anchor
//! element or an absolute page coordinate. The manager owns every live popup
//! and a single hover gate: while the pointer rests on any popup, no new one
//! may be created, so a reader is never buried under a popup storm.

use crate::dom::{DomAdapter, NodeId, Offset};
use tracing::debug;

/// Class applied to every popup panel.
pub const POPUP_CLASS: &str = "text-popup";

/// Id of the primary content region popups are appended to, when present.
pub const CONTENT_REGION_ID: &str = "text";

/// Horizontal margin kept between a popup's right edge and the document
/// edge; also the widening applied when the left edge is clamped.
const EDGE_PAD: f64 = 5.0;

/// Minimum left offset a popup may occupy.
const MIN_LEFT: f64 = 1.0;

// ============================================================================
// Anchors
// ============================================================================

/// Where a popup is positioned.
///
/// Explicit coordinates switch the popup to absolute mode: no centering, no
/// bottom-edge alignment, just the given page offset. A `Query` that matches
/// nothing anchors at the document origin instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Anchor {
    /// Anchor to an existing element.
    Element(NodeId),
    /// Anchor to the element with this id.
    Query(String),
    /// Absolute page coordinates; a missing component defaults to 0.
    At { left: Option<f64>, top: Option<f64> },
}

// ============================================================================
// Manager
// ============================================================================

/// A live popup and its survival marker.
#[derive(Debug, Clone, Copy)]
struct PopupHandle {
    node: NodeId,
    protected: bool,
}

/// Creates, positions, and tracks the page's popups.
#[derive(Debug, Default)]
pub struct PopupManager {
    is_popup_hover: bool,
    popups: Vec<PopupHandle>,
}

impl PopupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any popup currently has pointer focus.
    pub fn is_hovered(&self) -> bool {
        self.is_popup_hover
    }

    /// Number of live popups.
    pub fn live_count(&self) -> usize {
        self.popups.len()
    }

    /// Create a popup wrapping `content`, positioned per `anchor`.
    ///
    /// Returns the inserted panel, or `None` when suppressed by the hover
    /// gate (existing popups are then left untouched). Creating a popup
    /// clears all previously-live non-protected popups. A `protected` popup
    /// ignores pointer-leave and survives [`clear`](Self::clear) unless the
    /// clear is forced.
    pub fn popup<D: DomAdapter>(
        &mut self,
        dom: &mut D,
        anchor: Anchor,
        content: NodeId,
        protected: bool,
    ) -> Option<NodeId> {
        if self.is_popup_hover {
            return None;
        }
        debug!(?anchor, protected, "creating popup");

        let target = Self::markup_target(dom);

        // Resolve the anchoring point. Element anchors also contribute their
        // heights to the vertical alignment below.
        let (mut offset, anchor_element, absolute) = match anchor {
            Anchor::At { left, top } => (
                Offset {
                    left: left.unwrap_or(0.0),
                    top: top.unwrap_or(0.0),
                },
                None,
                true,
            ),
            Anchor::Element(node) => (dom.offset(node), Some(node), false),
            Anchor::Query(ref id) => match dom.by_id(id) {
                Some(node) => (dom.offset(node), Some(node), false),
                // Missing target: degrade to the zero offset.
                None => (Offset::default(), None, false),
            },
        };

        let panel = dom.create_element("div", POPUP_CLASS);
        dom.append_child(panel, content);

        let doc_width = dom.document_width();

        // Measure a throwaway clone instead of the real panel: realizing the
        // panel first and measuring it in place would let transition effects
        // animate it from its pre-placement position.
        let dupe = dom.clone_subtree(panel);
        dom.append_child(target, dupe);
        let panel_size = dom.measure(dupe);
        dom.remove(dupe);

        if !absolute {
            let (inner, outer) = match anchor_element {
                Some(node) => (dom.measure(node).height, dom.outer_height(node)),
                None => (0.0, 0.0),
            };
            // Align the panel's bottom with the anchor's visible bottom edge;
            // inner vs outer height accounts for any clipped portion.
            offset.top += inner - panel_size.height - outer;
            offset.left -= panel_size.width / 2.0;
        }

        if offset.left + panel_size.width + EDGE_PAD > doc_width {
            offset.left = doc_width - (panel_size.width + EDGE_PAD);
        }
        if offset.left < MIN_LEFT {
            offset.left = MIN_LEFT;
            // Widen to compensate for the clamp, so content near the left
            // edge is not clipped.
            dom.set_inner_width(panel, panel_size.width + EDGE_PAD);
        }

        dom.set_offset(panel, offset);
        dom.append_child(target, panel);
        // Insertion can shift layout; re-assert the computed offset.
        dom.set_offset(panel, offset);

        self.clear(dom, false);
        self.popups.push(PopupHandle {
            node: panel,
            protected,
        });
        Some(panel)
    }

    /// Remove every live popup. Protected popups are retained unless
    /// `clear_protected` is set. Always resets the hover gate; a no-op on an
    /// empty list.
    pub fn clear<D: DomAdapter>(&mut self, dom: &mut D, clear_protected: bool) {
        let mut keep = Vec::new();
        for handle in self.popups.drain(..) {
            if !clear_protected && handle.protected {
                debug!(node = handle.node.0, "keeping protected popup");
                keep.push(handle);
            } else {
                dom.remove(handle.node);
            }
        }
        self.popups = keep;
        self.is_popup_hover = false;
    }

    /// Pointer entered a node. Engages the hover gate when the node is a
    /// live popup; returns whether the event was consumed.
    pub fn on_pointer_enter(&mut self, node: NodeId) -> bool {
        if !self.is_live(node) {
            return false;
        }
        self.is_popup_hover = true;
        true
    }

    /// Pointer left a node. Dismisses a live non-protected popup and
    /// releases the hover gate; protected popups ignore pointer-leave.
    pub fn on_pointer_leave<D: DomAdapter>(&mut self, dom: &mut D, node: NodeId) -> bool {
        let Some(position) = self.popups.iter().position(|h| h.node == node) else {
            return false;
        };
        if self.popups[position].protected {
            return true;
        }
        dom.remove(node);
        self.popups.remove(position);
        self.is_popup_hover = false;
        true
    }

    fn is_live(&self, node: NodeId) -> bool {
        self.popups.iter().any(|h| h.node == node)
    }

    /// Popups land in the primary content region, falling back to the first
    /// `main`, then the body.
    fn markup_target<D: DomAdapter>(dom: &D) -> NodeId {
        dom.by_id(CONTENT_REGION_ID)
            .or_else(|| dom.elements_by_tag("main").into_iter().next())
            .unwrap_or_else(|| dom.body())
    }
}

// ============================================================================
// Tests
// ============================================================================
