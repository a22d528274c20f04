use std::{fmt, io};

/// Crate-wide `Result` type using [`EsdumpError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, EsdumpError>;

/// Top-level error type for esdump operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum EsdumpError {
    /// Connection-related errors. Fatal: the run aborts before any
    /// extraction starts.
    Connection(ConnectionError),

    /// Query/request errors reported by the store. Fatal: the run aborts
    /// before any extraction starts.
    Query(QueryError),

    /// Errors raised mid-export by the scroll pipeline.
    Export(ExportError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// HTTP transport errors.
    Http(reqwest::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to reach the store.
    Unreachable(String),

    /// Connection timeout.
    Timeout,

    /// Invalid store URL.
    InvalidUrl(String),

    /// The ping issued after connecting was rejected.
    PingFailed(String),

    /// TLS setup failed (e.g. unreadable CA bundle).
    TlsSetup(String),

    /// No connection has been established yet.
    NotConnected,
}

/// Query-specific errors, raised when the store rejects a request.
#[derive(Debug)]
pub enum QueryError {
    /// The requested index does not exist.
    IndexNotFound(String),

    /// The store rejected the request as malformed.
    BadRequest(String),

    /// The store answered with a body this client cannot interpret.
    UnexpectedResponse(String),
}

/// Export-pipeline errors.
///
/// Only [`ExportError::CursorExpired`] is fatal mid-run; write and close
/// failures are logged at the component that observes them and never
/// surface as errors (see the writer and scroll source for the policy).
#[derive(Debug)]
pub enum ExportError {
    /// The server-side scroll window lapsed before the next page was
    /// requested. Not auto-retried: resuming would restart the scan from
    /// the top and silently duplicate already-exported rows.
    CursorExpired(String),

    /// A page response carried no continuation token.
    MissingScrollId,
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for EsdumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EsdumpError::Connection(e) => write!(f, "Connection error: {e}"),
            EsdumpError::Query(e) => write!(f, "Query error: {e}"),
            EsdumpError::Export(e) => write!(f, "Export error: {e}"),
            EsdumpError::Config(e) => write!(f, "Configuration error: {e}"),
            EsdumpError::Io(e) => write!(f, "I/O error: {e}"),
            EsdumpError::Http(e) => write!(f, "HTTP error: {e}"),
            EsdumpError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Unreachable(msg) => write!(f, "Failed to reach store: {msg}"),
            ConnectionError::Timeout => write!(f, "Connection timeout"),
            ConnectionError::InvalidUrl(url) => write!(f, "Invalid store URL: {url}"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
            ConnectionError::TlsSetup(msg) => write!(f, "TLS setup failed: {msg}"),
            ConnectionError::NotConnected => write!(f, "Not connected to the store"),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::IndexNotFound(index) => write!(f, "Index not found: {index}"),
            QueryError::BadRequest(msg) => write!(f, "Malformed request: {msg}"),
            QueryError::UnexpectedResponse(msg) => {
                write!(f, "Unexpected response from store: {msg}")
            }
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::CursorExpired(msg) => {
                write!(f, "Scroll context expired, aborting scan: {msg}")
            }
            ExportError::MissingScrollId => {
                write!(f, "Search response carried no scroll id")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for EsdumpError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for QueryError {}
impl std::error::Error for ExportError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to EsdumpError ========================= */

impl From<io::Error> for EsdumpError {
    fn from(err: io::Error) -> Self {
        EsdumpError::Io(err)
    }
}

impl From<reqwest::Error> for EsdumpError {
    fn from(err: reqwest::Error) -> Self {
        EsdumpError::Http(err)
    }
}

impl From<ConnectionError> for EsdumpError {
    fn from(err: ConnectionError) -> Self {
        EsdumpError::Connection(err)
    }
}

impl From<QueryError> for EsdumpError {
    fn from(err: QueryError) -> Self {
        EsdumpError::Query(err)
    }
}

impl From<ExportError> for EsdumpError {
    fn from(err: ExportError) -> Self {
        EsdumpError::Export(err)
    }
}

impl From<ConfigError> for EsdumpError {
    fn from(err: ConfigError) -> Self {
        EsdumpError::Config(err)
    }
}

impl From<String> for EsdumpError {
    fn from(msg: String) -> Self {
        EsdumpError::Generic(msg)
    }
}

impl From<&str> for EsdumpError {
    fn from(msg: &str) -> Self {
        EsdumpError::Generic(msg.to_owned())
    }
}
