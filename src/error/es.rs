use serde::Deserialize;

use crate::error::kinds::{EsdumpError, ExportError, QueryError};

/// Error body returned by Elasticsearch for failed requests.
///
/// Only the fields this client acts on are deserialized; anything else in
/// the body is ignored.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EsErrorBody {
    #[serde(default)]
    pub error: EsErrorInfo,
    #[serde(default)]
    pub status: u16,
}

/// The `error` object inside an Elasticsearch error body.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EsErrorInfo {
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl EsErrorBody {
    /// Parse an error body from raw response text.
    ///
    /// Elasticsearch occasionally answers with plain text (proxies, auth
    /// layers); in that case the text becomes the `reason` verbatim.
    pub fn from_text(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|_| EsErrorBody {
            error: EsErrorInfo {
                error_type: None,
                reason: Some(text.trim().to_string()),
            },
            status: 0,
        })
    }

    fn error_type(&self) -> &str {
        self.error.error_type.as_deref().unwrap_or("")
    }

    fn reason(&self) -> String {
        self.error
            .reason
            .clone()
            .unwrap_or_else(|| "no reason given".to_string())
    }
}

/// Classify a failed initial search request into a crate error.
///
/// A 404 with `index_not_found_exception` (or any 404 on the search
/// endpoint) means the index does not exist; a 400 means the request was
/// malformed. Everything else is surfaced verbatim.
pub fn classify_open_error(status: u16, body: &EsErrorBody, index: &str) -> EsdumpError {
    match status {
        404 => QueryError::IndexNotFound(index.to_string()).into(),
        400 => QueryError::BadRequest(body.reason()).into(),
        _ => QueryError::UnexpectedResponse(format!(
            "status {status}: {} ({})",
            body.reason(),
            body.error_type()
        ))
        .into(),
    }
}

/// Classify a failed scroll continuation request into a crate error.
///
/// An expired scroll context surfaces as `search_context_missing_exception`
/// (wrapped in a `search_phase_execution_exception` on older servers) with
/// status 404. That condition is fatal and is never retried.
pub fn classify_scroll_error(status: u16, body: &EsErrorBody) -> EsdumpError {
    if status == 404 || body.error_type().contains("search_context_missing") {
        ExportError::CursorExpired(body.reason()).into()
    } else {
        QueryError::UnexpectedResponse(format!(
            "status {status}: {} ({})",
            body.reason(),
            body.error_type()
        ))
        .into()
    }
}
