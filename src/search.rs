//! AJAX search-as-you-type.
//!
//! Keystrokes on the search input drive a small session state machine: each
//! input cancels whatever fetch is still in flight, queries shorter than the
//! threshold reset the page to browse mode, and longer ones become a
//! [`SearchRequest`] the host executes. Results replace the page's primary
//! content; the original content is detached and remembered so clearing the
//! query restores it.
//!
//! Cancellation is authoritative: a superseded request is aborted, and even
//! a completion that races the abort is dropped by the token check in
//! [`SearchBox::on_results_ready`].

use crate::dom::{DomAdapter, NodeId};
use futures_util::future::{AbortHandle, AbortRegistration, Abortable};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

/// Queries below this length reset to browse mode instead of searching.
pub const MIN_QUERY_CHARS: usize = 3;

/// Class marking the AJAX-delivered results view.
pub const RESULTS_CLASS: &str = "ajax-search-results";

// ============================================================================
// Requests
// ============================================================================

/// Identity of one issued request. Tokens are minted per keystroke and never
/// reused, so a stale completion can always be told apart from the current
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestToken(u64);

/// A fetch the host should execute against the query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    token: RequestToken,
    query: String,
    url: String,
}

impl SearchRequest {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Endpoint-relative URL: `{endpoint}?query={encoded}&ajax=1`.
    pub fn url(&self) -> &str {
        &self.url
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failures from the HTTP fetch path.
#[derive(Debug, Clone)]
pub enum SearchError {
    /// The configured endpoint or request URL cannot be parsed.
    InvalidEndpoint(String),
    /// The request failed or the server answered with an error status.
    Http(String),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::InvalidEndpoint(msg) => write!(f, "Invalid endpoint: {}", msg),
            SearchError::Http(msg) => write!(f, "Search request failed: {}", msg),
        }
    }
}

impl std::error::Error for SearchError {}

// ============================================================================
// Session
// ============================================================================

struct InFlight {
    token: RequestToken,
    abort: Option<AbortHandle>,
}

/// The page's search session: at most one in-flight request, at most one
/// saved original-content snapshot per page lifetime.
pub struct SearchBox {
    endpoint: String,
    next_token: u64,
    in_flight: Option<InFlight>,
    saved_original: Option<NodeId>,
}

impl SearchBox {
    /// `endpoint` is the query endpoint path, e.g. `/search`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            next_token: 0,
            in_flight: None,
            saved_original: None,
        }
    }

    /// The detached original content, once a search has replaced it.
    pub fn saved_original(&self) -> Option<NodeId> {
        self.saved_original
    }

    /// Process the search input's current text.
    ///
    /// Any in-flight request is cancelled outright. Short input removes the
    /// results view and restores the original content ("reset to browse
    /// mode"); otherwise the returned request should be executed by the host
    /// and its outcome delivered to [`on_results_ready`](Self::on_results_ready).
    pub fn handle_input<D: DomAdapter>(
        &mut self,
        dom: &mut D,
        input: &str,
    ) -> Option<SearchRequest> {
        if let Some(previous) = self.in_flight.take() {
            if let Some(handle) = previous.abort {
                handle.abort();
            }
        }

        if input.chars().count() < MIN_QUERY_CHARS {
            self.reset_to_browse(dom);
            return None;
        }

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        let url = format!(
            "{}?query={}&ajax=1",
            self.endpoint,
            urlencoding::encode(input)
        );
        debug!(query = input, ?token, "issuing search request");
        self.in_flight = Some(InFlight { token, abort: None });
        Some(SearchRequest {
            token,
            query: input.to_string(),
            url,
        })
    }

    /// Produce the abort registration for the given request so the host can
    /// wrap its fetch in [`Abortable`]. `None` when the request is no longer
    /// current.
    pub fn abort_registration(&mut self, token: RequestToken) -> Option<AbortRegistration> {
        match self.in_flight {
            Some(ref mut current) if current.token == token => {
                let (handle, registration) = AbortHandle::new_pair();
                current.abort = Some(handle);
                Some(registration)
            }
            _ => None,
        }
    }

    /// Apply fetched results markup to the page.
    ///
    /// A completion whose token does not match the current in-flight request
    /// is a guaranteed no-op: that request was cancelled or superseded. The
    /// markup is sanitized, tagged as a results view, and inserted
    /// immediately after the header; the prior primary content is detached
    /// and remembered (first save wins).
    pub fn on_results_ready<D: DomAdapter>(
        &mut self,
        dom: &mut D,
        token: RequestToken,
        markup: &str,
    ) {
        match self.in_flight {
            Some(ref current) if current.token == token => {}
            _ => {
                debug!(?token, "dropping stale search results");
                return;
            }
        }
        self.in_flight = None;

        // No header landmark, nowhere to put results: degrade silently.
        let Some(header) = dom.elements_by_tag("header").into_iter().next() else {
            return;
        };

        // Detach the browse-mode content and remember it the first time.
        if let Some(main) = Self::browse_main(dom) {
            dom.detach(main);
            if self.saved_original.is_none() {
                debug!("storing original content for later");
                self.saved_original = Some(main);
            }
        }

        // A previous results view is replaced, never stacked.
        self.remove_results_view(dom);

        let clean = ammonia::clean(markup);
        let results = dom.create_fragment(&clean);
        dom.add_class(results, RESULTS_CLASS);
        dom.insert_after(header, results);
    }

    /// Remove the results view and put the original content back after the
    /// header, if a snapshot exists.
    fn reset_to_browse<D: DomAdapter>(&mut self, dom: &mut D) {
        self.remove_results_view(dom);
        if let Some(original) = self.saved_original {
            if let Some(header) = dom.elements_by_tag("header").into_iter().next() {
                dom.insert_after(header, original);
            }
        }
    }

    fn remove_results_view<D: DomAdapter>(&self, dom: &mut D) {
        let body = dom.body();
        for view in dom.descendants_with_class(body, RESULTS_CLASS) {
            dom.remove(view);
        }
    }

    /// The primary content element, excluding any results view.
    fn browse_main<D: DomAdapter>(dom: &D) -> Option<NodeId> {
        dom.elements_by_tag("main")
            .into_iter()
            .find(|&main| !dom.has_class(main, RESULTS_CLASS))
    }
}

// ============================================================================
// HTTP Fetch
// ============================================================================

/// Executes [`SearchRequest`]s against the query endpoint.
///
/// The endpoint is a black box: a GET with `query` and `ajax=1` parameters
/// returning a renderable markup fragment, idempotent and cacheable per
/// unique query string.
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Url,
}

impl HttpFetcher {
    /// `base` is the site origin the endpoint-relative request URLs resolve
    /// against, e.g. `https://example.org`.
    pub fn new(base: &str) -> Result<Self, SearchError> {
        let base = Url::parse(base).map_err(|e| SearchError::InvalidEndpoint(e.to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    /// Fetch the results markup for one request.
    pub async fn fetch(&self, request: &SearchRequest) -> Result<String, SearchError> {
        let url = self
            .base
            .join(request.url())
            .map_err(|e| SearchError::InvalidEndpoint(e.to_string()))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| SearchError::Http(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))
    }
}

/// Await an abortable fetch. Aborted or failed fetches yield `None`; there
/// is no retry, the next keystroke supersedes any failed attempt.
pub async fn run_query(
    fetcher: &HttpFetcher,
    request: &SearchRequest,
    registration: AbortRegistration,
) -> Option<String> {
    match Abortable::new(fetcher.fetch(request), registration).await {
        Ok(Ok(markup)) => Some(markup),
        Ok(Err(err)) => {
            warn!(query = request.query(), %err, "search fetch failed");
            None
        }
        Err(_aborted) => {
            debug!(query = request.query(), "search fetch aborted");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memdom::MemDom;

    /// Page skeleton: header followed by the browse-mode main content.
    fn page() -> (MemDom, NodeId, NodeId) {
        let mut dom = MemDom::new();
        let body = dom.body();
        let header = dom.element(body, "header", "", "");
        let main = dom.element(body, "main", "", "");
        dom.set_text(main, "browse content");
        (dom, header, main)
    }

    fn results_views(dom: &MemDom) -> Vec<NodeId> {
        dom.descendants_with_class(dom.body(), RESULTS_CLASS)
    }

    #[test]
    fn test_short_input_is_not_a_search() {
        let (mut dom, _, _) = page();
        let mut search = SearchBox::new("/search");
        assert!(search.handle_input(&mut dom, "").is_none());
        assert!(search.handle_input(&mut dom, "ab").is_none());
    }

    #[test]
    fn test_request_url_is_encoded() {
        let (mut dom, _, _) = page();
        let mut search = SearchBox::new("/search");
        let request = search.handle_input(&mut dom, "mettā sutta").unwrap();
        assert_eq!(request.url(), "/search?query=mett%C4%81%20sutta&ajax=1");
        assert_eq!(request.query(), "mettā sutta");
    }

    #[test]
    fn test_results_replace_main_and_save_original() {
        let (mut dom, header, main) = page();
        let mut search = SearchBox::new("/search");

        let request = search.handle_input(&mut dom, "abc").unwrap();
        search.on_results_ready(&mut dom, request.token(), "<main>results</main>");

        // Original detached but alive, remembered for restoration.
        assert!(!dom.is_attached(main));
        assert_eq!(dom.text(main), "browse content");
        assert_eq!(search.saved_original(), Some(main));

        // Results view sits right after the header.
        let views = results_views(&dom);
        assert_eq!(views.len(), 1);
        assert_eq!(dom.first_element_descendant(dom.body()), Some(header));
    }

    #[test]
    fn test_stale_completion_is_a_no_op() {
        let (mut dom, _, main) = page();
        let mut search = SearchBox::new("/search");

        let first = search.handle_input(&mut dom, "abc").unwrap();
        let second = search.handle_input(&mut dom, "abcd").unwrap();

        // The first request was cancelled by the second keystroke; its
        // completion must not touch the page.
        search.on_results_ready(&mut dom, first.token(), "<main>stale</main>");
        assert!(results_views(&dom).is_empty());
        assert!(dom.is_attached(main));

        search.on_results_ready(&mut dom, second.token(), "<main>fresh</main>");
        assert_eq!(results_views(&dom).len(), 1);

        // A duplicate completion for an already-applied token is dropped too.
        search.on_results_ready(&mut dom, second.token(), "<main>dupe</main>");
        assert_eq!(results_views(&dom).len(), 1);
    }

    #[test]
    fn test_new_results_replace_previous_view() {
        let (mut dom, _, _) = page();
        let mut search = SearchBox::new("/search");

        let first = search.handle_input(&mut dom, "abc").unwrap();
        search.on_results_ready(&mut dom, first.token(), "<main>one</main>");
        let old_view = results_views(&dom)[0];

        let second = search.handle_input(&mut dom, "abcd").unwrap();
        search.on_results_ready(&mut dom, second.token(), "<main>two</main>");

        let views = results_views(&dom);
        assert_eq!(views.len(), 1);
        assert_ne!(views[0], old_view);
    }

    #[test]
    fn test_short_input_restores_original_after_header() {
        let (mut dom, header, main) = page();
        let mut search = SearchBox::new("/search");

        let request = search.handle_input(&mut dom, "abc").unwrap();
        search.on_results_ready(&mut dom, request.token(), "<main>results</main>");
        assert!(!dom.is_attached(main));

        search.handle_input(&mut dom, "ab");
        assert!(results_views(&dom).is_empty());
        assert!(dom.is_attached(main));
        assert_eq!(dom.first_element_descendant(dom.body()), Some(header));

        // The snapshot survives restoration: first save wins for the whole
        // page lifetime.
        let again = search.handle_input(&mut dom, "xyz").unwrap();
        search.on_results_ready(&mut dom, again.token(), "<main>more</main>");
        assert_eq!(search.saved_original(), Some(main));
    }

    #[test]
    fn test_results_markup_is_sanitized() {
        let (mut dom, _, _) = page();
        let mut search = SearchBox::new("/search");

        let request = search.handle_input(&mut dom, "abc").unwrap();
        search.on_results_ready(
            &mut dom,
            request.token(),
            "<p>hit</p><script>alert(1)</script>",
        );

        let view = results_views(&dom)[0];
        let markup = dom.markup(view).unwrap();
        assert!(markup.contains("hit"));
        assert!(!markup.contains("script"));
    }

    #[test]
    fn test_missing_header_degrades_silently() {
        let mut dom = MemDom::new();
        let body = dom.body();
        dom.element(body, "main", "", "");
        let mut search = SearchBox::new("/search");

        let request = search.handle_input(&mut dom, "abc").unwrap();
        search.on_results_ready(&mut dom, request.token(), "<main>results</main>");
        assert!(results_views(&dom).is_empty());
    }

    #[test]
    fn test_abort_registration_only_for_current_request() {
        let (mut dom, _, _) = page();
        let mut search = SearchBox::new("/search");

        let first = search.handle_input(&mut dom, "abc").unwrap();
        let second = search.handle_input(&mut dom, "abcd").unwrap();

        assert!(search.abort_registration(first.token()).is_none());
        assert!(search.abort_registration(second.token()).is_some());
    }

    #[tokio::test]
    async fn test_aborted_fetch_yields_nothing() {
        let fetcher = HttpFetcher::new("http://127.0.0.1:9").unwrap();
        let (mut dom, _, _) = page();
        let mut search = SearchBox::new("/search");

        let request = search.handle_input(&mut dom, "abc").unwrap();
        let registration = search.abort_registration(request.token()).unwrap();

        // The next keystroke aborts the in-flight fetch; the driver must
        // resolve to None rather than surface a result or an error.
        search.handle_input(&mut dom, "abcd");
        assert!(run_query(&fetcher, &request, registration).await.is_none());
    }
}
