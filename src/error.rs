// Crate Error Type
//
// One enum for the whole pipeline, grouped by how the indexer reacts:
// transient upstream failures are retried with backoff, fatal ones stop the
// worker. The API maps everything to small JSON error bodies instead.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// Invalid configuration, surfaced before any work starts.
    Config(String),
    /// Upstream RPC transport failure (connect, timeout, non-2xx).
    Rpc(reqwest::Error),
    /// Upstream returned a payload that did not decode as JSON.
    Json(serde_json::Error),
    /// Store-level failure.
    Db(sqlx::Error),
    /// Listener or server I/O failure.
    Io(std::io::Error),
    /// Live chain id differs from the one this database was built from.
    ChainIdMismatch { stored: String, live: String },
}

impl Error {
    /// Fatal errors terminate the indexer; everything else is retried on the
    /// same height. Constraint violations mean the schema invariants are
    /// broken and retrying would loop forever.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Config(_) | Error::ChainIdMismatch { .. } => true,
            Error::Db(sqlx::Error::Database(db)) => matches!(
                db.kind(),
                sqlx::error::ErrorKind::UniqueViolation
                    | sqlx::error::ErrorKind::ForeignKeyViolation
                    | sqlx::error::ErrorKind::NotNullViolation
                    | sqlx::error::ErrorKind::CheckViolation
            ),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Rpc(e) => write!(f, "rpc request failed: {}", e),
            Error::Json(e) => write!(f, "invalid json payload: {}", e),
            Error::Db(e) => write!(f, "database error: {}", e),
            Error::Io(e) => write!(f, "i/o error: {}", e),
            Error::ChainIdMismatch { stored, live } => write!(
                f,
                "chain id mismatch: database was indexed from {:?} but rpc reports {:?}",
                stored, live
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Rpc(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::Db(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Rpc(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Db(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
