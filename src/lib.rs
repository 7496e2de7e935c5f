//! pagekit - the client-side enhancement layer of a content website,
//! modeled headlessly.
//!
//! Three independent behaviors share the host page:
//!
//! - `popup`: transient annotation popups anchored to page elements
//! - `search`: AJAX search-as-you-type replacing the primary content
//! - `truncate`: show-more/show-less truncation of long content blocks
//!
//! Components hold explicit state and drive the page through the
//! [`dom::DomAdapter`] trait, so everything runs and tests without a
//! browser; [`memdom::MemDom`] is the bundled in-memory document. A host
//! mirrors real page events into [`PageEvent`]s and executes the returned
//! [`search::SearchRequest`]s, the only asynchronous boundary in the crate.
//!
//! All modules are public so the behaviors can be embedded piecemeal.

use serde::{Deserialize, Serialize};

pub mod dom;
pub mod memdom;
pub mod popup;
pub mod search;
pub mod truncate;


// ============================================================================
// Configuration
// ============================================================================

/// Host-page configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Query endpoint path for the search box.
    pub search_endpoint: String,
    /// Plain-text length threshold for truncation.
    pub truncate_max_length: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            search_endpoint: "/search".to_string(),
            truncate_max_length: truncate::DEFAULT_MAX_LENGTH,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// A page event mirrored in by the host.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// Pointer entered an element.
    PointerEnter(NodeId),
    /// Pointer left an element.
    PointerLeave(NodeId),
    /// An element was activated.
    Click(NodeId),
    /// The search input's text changed to this value.
    SearchInput(String),
}

// ============================================================================
// Page
// ============================================================================

/// The page's behavior components, wired to a single dispatch point.
///
/// One owned instance per page, no shared mutable statics.
pub struct Page {
    pub config: PageConfig,
    pub popups: PopupManager,
    pub search: SearchBox,
    pub truncate: Truncator,
}

impl Page {
    pub fn new(config: PageConfig) -> Self {
        let search = SearchBox::new(config.search_endpoint.clone());
        Self {
            config,
            popups: PopupManager::new(),
            search,
            truncate: Truncator::new(),
        }
    }

    /// The page-load pass: truncate every opted-in content block. Popups
    /// and search are purely event-driven and need no initialization.
    ///
    /// Call [`Truncator::scan`] with a narrower root for dynamically
    /// inserted content.
    pub fn init<D: DomAdapter>(&mut self, dom: &mut D) {
        let body = dom.body();
        self.truncate.scan(dom, body, self.config.truncate_max_length);
    }

    /// Route one page event. Pointer events feed the popup lifecycle,
    /// clicks the truncation toggles (delegated, document-wide), and search
    /// input the search session. A returned [`SearchRequest`] is the
    /// host's to execute; deliver its outcome to
    /// [`apply_results`](Self::apply_results).
    pub fn handle_event<D: DomAdapter>(
        &mut self,
        dom: &mut D,
        event: PageEvent,
    ) -> Option<SearchRequest> {
        match event {
            PageEvent::PointerEnter(node) => {
                self.popups.on_pointer_enter(node);
                None
            }
            PageEvent::PointerLeave(node) => {
                self.popups.on_pointer_leave(dom, node);
                None
            }
            PageEvent::Click(node) => {
                self.truncate.on_click(dom, node);
                None
            }
            PageEvent::SearchInput(text) => self.search.handle_input(dom, &text),
        }
    }

    /// Deliver fetched results markup for the given request token.
    pub fn apply_results<D: DomAdapter>(
        &mut self,
        dom: &mut D,
        token: RequestToken,
        markup: &str,
    ) {
        self.search.on_results_ready(dom, token, markup);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(PageConfig::default())
    }
}

// Re-export commonly used types
pub use dom::{DomAdapter, NodeId, Offset, Size};
pub use memdom::MemDom;
pub use popup::{Anchor, PopupManager};
pub use search::{
    run_query, HttpFetcher, RequestToken, SearchBox, SearchError, SearchRequest,
};
pub use truncate::{brief, Truncator, DEFAULT_MAX_LENGTH};
