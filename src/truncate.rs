//! Show-more/show-less truncation for long content blocks.
//!
//! Content opts in with the `truncate` class. A scan restructures each long
//! block into a hidden full view (`div.showmore`) and a visible brief view
//! (`div.showless`) built from a plain-text preview, with toggle links
//! wired between the two. The server may deliver pre-restructured
//! brief/full pairs for clients without scripting; the scan leaves those
//! untouched.
//!
//! Four selectors are reserved for the mechanism: `div.showmore`,
//! `div.showless`, `a.showmore`, `a.showless`.

use crate::dom::{DomAdapter, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Content blocks carrying this class are candidates for truncation.
pub const TRUNCATE_CLASS: &str = "truncate";

/// Class of the full view container and its collapse link.
pub const SHOW_MORE_CLASS: &str = "showmore";

/// Class of the brief view container and its expand link.
pub const SHOW_LESS_CLASS: &str = "showless";

/// Caption of the collapse link.
pub const LESS_CAPTION: &str = "[less]";

/// Caption of the expand link.
pub const MORE_CAPTION: &str = "[…more]";

/// Default plain-text length threshold.
pub const DEFAULT_MAX_LENGTH: usize = 200;

// A word-ish token containing a digit preceded only by letters/dots, taken
// together with its leading space. Matches reference sigils like "MN 10" or
// "Thag 2.4" fragments without eating ordinary words.
static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^| )[a-zA-Z.]*[0-9][^, ]*").expect("valid reference pattern"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"));

// Longest prefix ending in a period; `.` stops at newlines, which the
// whitespace pass has already collapsed away.
static SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".*\.").expect("valid sentence pattern"));

// Trailing run of characters that may be a broken word: anything but a
// space, em-dash, comma, or period.
static TRAILING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^ —,.]*$").expect("valid trailing pattern"));

// ============================================================================
// Brief Rendering
// ============================================================================

/// Compute the brief preview of a block's plain text.
///
/// Returns `None` when the text is already shorter than `max_length`
/// (nothing to truncate). Works on plain text only, so the preview can never
/// contain dangling markup.
pub fn brief(text: &str, max_length: usize) -> Option<String> {
    if text.chars().count() < max_length {
        return None;
    }

    let stripped = REFERENCE_RE.replace_all(text, "");
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    let cut: String = collapsed.chars().take(max_length + 1).collect();

    // Prefer a sentence boundary when it keeps at least 3/4 of the limit.
    if let Some(found) = SENTENCE_RE.find(&cut) {
        if 4 * found.as_str().chars().count() > 3 * max_length {
            return Some(found.as_str().to_string());
        }
    }
    Some(TRAILING_RE.replace(&cut, "").into_owned())
}

// ============================================================================
// Truncator
// ============================================================================

/// Restructures long content blocks and services their toggle links.
#[derive(Debug, Default)]
pub struct Truncator;

impl Truncator {
    pub fn new() -> Self {
        Self
    }

    /// Restructure every `.truncate` block under `root` whose plain text
    /// exceeds `max_length`.
    ///
    /// Idempotent: blocks already carrying a brief/full pair, whether from
    /// a prior scan or pre-rendered by the server, are skipped. After the
    /// pass, initial visibility is enforced document-wide (brief shown, full
    /// hidden) and the toggle links get their fixed captions.
    pub fn scan<D: DomAdapter>(&mut self, dom: &mut D, root: NodeId, max_length: usize) {
        let mut restructured = 0usize;
        for block in dom.descendants_with_class(root, TRUNCATE_CLASS) {
            if Self::is_restructured(dom, block) {
                continue;
            }
            let Some(preview) = brief(&dom.text(block), max_length) else {
                continue;
            };
            let Some(parent) = dom.parent(block) else {
                continue;
            };

            // Wrap the original content as the full view and build the brief
            // view beside it.
            let full_view = dom.create_element("div", SHOW_MORE_CLASS);
            dom.append_child(parent, full_view);
            dom.append_child(full_view, block);

            let brief_view = dom.create_element("div", SHOW_LESS_CLASS);
            dom.set_text(brief_view, &preview);
            dom.append_child(parent, brief_view);

            // The collapse control belongs at the end of the complete text.
            // A full view without paragraphs gets no collapse link at all;
            // that block can then only be re-collapsed by reloading.
            if let Some(last_paragraph) = dom.last_descendant_with_tag(full_view, "p") {
                let less_link = dom.create_element("a", SHOW_LESS_CLASS);
                dom.append_child(last_paragraph, less_link);
            }
            let more_link = dom.create_element("a", SHOW_MORE_CLASS);
            dom.append_child(brief_view, more_link);

            dom.hide(full_view);
            restructured += 1;
        }

        // Initial visibility and captions, enforced over the whole document
        // so server-rendered pairs line up with freshly built ones.
        let body = dom.body();
        for node in dom.descendants_with_class(body, SHOW_LESS_CLASS) {
            match dom.tag(node) {
                "div" => dom.show(node),
                "a" => dom.set_text(node, LESS_CAPTION),
                _ => {}
            }
        }
        for node in dom.descendants_with_class(body, SHOW_MORE_CLASS) {
            match dom.tag(node) {
                "div" => dom.hide(node),
                "a" => dom.set_text(node, MORE_CAPTION),
                _ => {}
            }
        }
        debug!(restructured, "truncation scan complete");
    }

    /// Delegated click handling for the reserved toggle links. Returns
    /// whether the click was consumed.
    pub fn on_click<D: DomAdapter>(&mut self, dom: &mut D, node: NodeId) -> bool {
        if dom.tag(node) != "a" {
            return false;
        }
        if dom.has_class(node, SHOW_MORE_CLASS) {
            self.expand(dom, node);
            true
        } else if dom.has_class(node, SHOW_LESS_CLASS) {
            self.collapse(dom, node);
            true
        } else {
            false
        }
    }

    /// "Show more": swap the brief view for the full one, then move every
    /// collapse link to the end of the full view's last paragraph so the
    /// control follows the complete text.
    fn expand<D: DomAdapter>(&mut self, dom: &mut D, link: NodeId) {
        let Some(brief_view) = dom.parent(link) else {
            return;
        };
        let Some(block) = dom.parent(brief_view) else {
            return;
        };
        for view in dom.children_with_class(block, SHOW_LESS_CLASS) {
            if dom.tag(view) == "div" {
                dom.hide(view);
            }
        }
        for view in dom.children_with_class(block, SHOW_MORE_CLASS) {
            if dom.tag(view) == "div" {
                dom.show(view);
            }
        }

        let full_view = dom
            .children_with_class(block, SHOW_MORE_CLASS)
            .into_iter()
            .find(|&view| dom.tag(view) == "div");
        let Some(full_view) = full_view else {
            return;
        };
        let Some(last_paragraph) = dom.last_descendant_with_tag(full_view, "p") else {
            return;
        };
        let links: Vec<NodeId> = dom
            .descendants_with_class(block, SHOW_LESS_CLASS)
            .into_iter()
            .filter(|&n| dom.tag(n) == "a")
            .collect();
        for less_link in links {
            dom.append_child(last_paragraph, less_link);
        }
    }

    /// "Show less": back to the brief view, scrolling the block's first
    /// descendant into view to compensate for the collapsed height.
    fn collapse<D: DomAdapter>(&mut self, dom: &mut D, link: NodeId) {
        let Some(full_view) = dom.ancestor_with_class(link, SHOW_MORE_CLASS) else {
            return;
        };
        let Some(block) = dom.parent(full_view) else {
            return;
        };
        for view in dom.children_with_class(block, SHOW_LESS_CLASS) {
            if dom.tag(view) == "div" {
                dom.show(view);
            }
        }
        for view in dom.children_with_class(block, SHOW_MORE_CLASS) {
            if dom.tag(view) == "div" {
                dom.hide(view);
            }
        }
        if let Some(first) = dom.first_element_descendant(block) {
            dom.scroll_into_view(first);
        }
    }

    /// A block carrying a brief/full pair already: either delivered by the
    /// server inside the block, or wrapped around it by a prior scan.
    fn is_restructured<D: DomAdapter>(dom: &D, block: NodeId) -> bool {
        let inside = dom
            .descendants_with_class(block, SHOW_MORE_CLASS)
            .into_iter()
            .chain(dom.descendants_with_class(block, SHOW_LESS_CLASS));
        for node in inside {
            if dom.tag(node) == "div" {
                return true;
            }
        }
        matches!(
            dom.ancestor_with_class(block, SHOW_MORE_CLASS),
            Some(wrapper) if dom.tag(wrapper) == "div"
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
