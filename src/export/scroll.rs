//! Scroll-based document source for export operations
//!
//! This module wraps the store's paginated scroll protocol behind a small
//! streaming interface, so the rest of the pipeline can pull batches of raw
//! documents without knowing about continuation tokens or keep-alive
//! windows.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::connection::{map_transport_error, EsSession};
use crate::error::{classify_open_error, classify_scroll_error, EsErrorBody};
use crate::error::{ExportError, QueryError, Result};

/// A raw document as produced by the store: field name to arbitrary value.
pub type RawDocument = serde_json::Map<String, serde_json::Value>;

/// Keep-alive window requested when the scroll is opened.
const OPEN_KEEP_ALIVE: &str = "2m";

/// Keep-alive window requested on every continuation.
const NEXT_KEEP_ALIVE: &str = "1m";

/// Result of opening a scroll: the first page plus the store's count
/// estimate at open time.
///
/// The estimate is advisory only. The pipeline terminates on an empty page,
/// never on reaching it, so under- and over-counts are tolerated.
#[derive(Debug)]
pub struct ScrollOpen {
    /// Documents of the first page
    pub first_batch: Vec<RawDocument>,
    /// Total hit estimate reported by the store at open time
    pub total_hits: u64,
}

/// Trait for streaming raw documents page by page
///
/// One implementor exists per backing store; the orchestrator only ever
/// talks to this interface, which also makes it testable against mocks.
#[async_trait]
pub trait ScrollSource: Send {
    /// Open the server-side iteration and fetch the first page.
    ///
    /// Fails with a connection error if the store is unreachable, or a
    /// query error if the index does not exist or the request is malformed.
    async fn open(&mut self) -> Result<ScrollOpen>;

    /// Fetch the next page. An empty batch signals exhaustion.
    ///
    /// Fails with [`ExportError::CursorExpired`] if the server-side window
    /// lapsed; that condition is fatal and never retried here.
    async fn next_page(&mut self) -> Result<Vec<RawDocument>>;

    /// Release server-side resources, best effort.
    ///
    /// Failures are logged and swallowed: a leaked scroll context expires
    /// on its own and must never block run completion.
    async fn close(&mut self);
}

/* ========================= Wire types ========================= */

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default, deserialize_with = "deserialize_total")]
    total: u64,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: RawDocument,
}

/// Accept both total shapes: the `{"value": N, "relation": ...}` object of
/// newer servers and the bare number of older ones.
fn deserialize_total<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Total {
        Object { value: u64 },
        Number(u64),
    }

    Ok(match Total::deserialize(deserializer)? {
        Total::Object { value } => value,
        Total::Number(n) => n,
    })
}

/* ========================= HTTP implementation ========================= */

/// Scroll source over the store's HTTP API
///
/// Owns the continuation token for the lifetime of one export run. The
/// token is created by `open`, refreshed on every `next_page`, and released
/// by `close`.
pub struct HttpScrollSource {
    session: EsSession,
    index: String,
    page_size: u32,
    scroll_id: Option<String>,
    total_fetched: u64,
    closed: bool,
}

impl HttpScrollSource {
    /// Create a scroll source for one index.
    pub fn new(session: EsSession, index: impl Into<String>, page_size: u32) -> Self {
        Self {
            session,
            index: index.into(),
            page_size,
            scroll_id: None,
            total_fetched: 0,
            closed: false,
        }
    }

    fn parse_page(&mut self, response: SearchResponse) -> Result<Vec<RawDocument>> {
        match response.scroll_id {
            Some(id) => self.scroll_id = Some(id),
            None => return Err(ExportError::MissingScrollId.into()),
        }
        let batch: Vec<RawDocument> = response.hits.hits.into_iter().map(|h| h.source).collect();
        self.total_fetched += batch.len() as u64;
        Ok(batch)
    }
}

#[async_trait]
impl ScrollSource for HttpScrollSource {
    async fn open(&mut self) -> Result<ScrollOpen> {
        let path = format!("{}/_search?scroll={}", self.index, OPEN_KEEP_ALIVE);
        let body = json!({
            "size": self.page_size,
            "query": { "match_all": {} },
        });

        let response = self
            .session
            .request(Method::POST, &path)?
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_open_error(
                status.as_u16(),
                &EsErrorBody::from_text(&text),
                &self.index,
            ));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| QueryError::UnexpectedResponse(e.to_string()))?;
        let total_hits = parsed.hits.total;
        let first_batch = self.parse_page(parsed)?;

        debug!(
            "Opened scroll over '{}': {} hits estimated, first page has {} documents",
            self.index,
            total_hits,
            first_batch.len()
        );

        Ok(ScrollOpen {
            first_batch,
            total_hits,
        })
    }

    async fn next_page(&mut self) -> Result<Vec<RawDocument>> {
        if self.closed {
            return Ok(Vec::new());
        }
        let scroll_id = match self.scroll_id.as_ref() {
            Some(id) => id.clone(),
            None => return Ok(Vec::new()),
        };

        let body = json!({
            "scroll": NEXT_KEEP_ALIVE,
            "scroll_id": scroll_id,
        });

        let response = self
            .session
            .request(Method::POST, "_search/scroll")?
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_scroll_error(
                status.as_u16(),
                &EsErrorBody::from_text(&text),
            ));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| QueryError::UnexpectedResponse(e.to_string()))?;
        let batch = self.parse_page(parsed)?;

        if batch.is_empty() {
            debug!("Scroll exhausted after {} documents", self.total_fetched);
        } else {
            debug!(
                "Fetched page of {} documents (total: {})",
                batch.len(),
                self.total_fetched
            );
        }
        Ok(batch)
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let Some(scroll_id) = self.scroll_id.take() else {
            return;
        };

        let body = json!({ "scroll_id": [scroll_id] });
        let result = match self.session.request(Method::DELETE, "_search/scroll") {
            Ok(builder) => builder.json(&body).send().await,
            Err(e) => {
                warn!("Failed to release scroll context: {e}");
                return;
            }
        };

        match result {
            Ok(response) if response.status().is_success() => {
                info!(
                    "Released scroll context after fetching {} documents",
                    self.total_fetched
                );
            }
            Ok(response) => {
                warn!(
                    "Store refused scroll release with status {}",
                    response.status()
                );
            }
            Err(e) => warn!("Failed to release scroll context: {e}"),
        }
    }
}

impl Drop for HttpScrollSource {
    fn drop(&mut self) {
        // The release request is async and cannot run here; a context left
        // behind expires once its keep-alive window lapses.
        if !self.closed && self.scroll_id.is_some() {
            debug!("Scroll source dropped without explicit close");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_source_trait_object() {
        // Verify ScrollSource is usable as a trait object
        fn _accepts_scroll_source(_source: Box<dyn ScrollSource>) {}
    }

    #[test]
    fn test_parse_search_response_new_total_shape() {
        let text = r#"{
            "_scroll_id": "abc123",
            "hits": {
                "total": { "value": 42, "relation": "eq" },
                "hits": [
                    { "_index": "events", "_id": "1", "_source": { "a": 1 } },
                    { "_index": "events", "_id": "2", "_source": { "a": 2 } }
                ]
            }
        }"#;
        let parsed: SearchResponse = serde_json::from_str(text).unwrap();
        assert_eq!(parsed.scroll_id.as_deref(), Some("abc123"));
        assert_eq!(parsed.hits.total, 42);
        assert_eq!(parsed.hits.hits.len(), 2);
    }

    #[test]
    fn test_parse_search_response_bare_total() {
        let text = r#"{"_scroll_id": "x", "hits": {"total": 7, "hits": []}}"#;
        let parsed: SearchResponse = serde_json::from_str(text).unwrap();
        assert_eq!(parsed.hits.total, 7);
        assert!(parsed.hits.hits.is_empty());
    }

    #[test]
    fn test_parse_hit_without_source() {
        let text = r#"{"_scroll_id": "x", "hits": {"total": 1, "hits": [{"_id": "1"}]}}"#;
        let parsed: SearchResponse = serde_json::from_str(text).unwrap();
        assert!(parsed.hits.hits[0].source.is_empty());
    }
}
