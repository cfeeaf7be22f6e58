//! Directory and file provider for the content tree.
//!
//! The tree holds PDF and MP3 pairs addressed by `/`-separated paths relative
//! to its root. Two providers implement [`ContentProvider`]: a local
//! filesystem tree and an HTTP origin serving the same layout.

mod http;
mod local;

pub use http::HttpContentSource;
pub use local::LocalContentTree;

use async_trait::async_trait;
use bytes::Bytes;
use doc_model::DirectoryListing;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP error for {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected response from {url}: status {status}")]
    Status { url: String, status: u16 },
    #[error("malformed listing for {path}: {source}")]
    Listing {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported content location: {0}")]
    Unsupported(String),
}

impl ContentError {
    /// Whether the failure is worth retrying over another delivery route.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Http { .. } | Self::Status { .. })
    }
}

/// Which delivery path a fetch goes through.
///
/// The alternate route is tried after the primary one failed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryRoute {
    #[default]
    Primary,
    Alternate,
}

#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Lists a directory; directories first, then files, each group sorted by name.
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing, ContentError>;

    /// Reads a leaf file in full.
    async fn fetch(&self, path: &str, route: DeliveryRoute) -> Result<Bytes, ContentError>;
}

/// Splits a content path into segments, rejecting anything that escapes the root.
pub fn content_segments(path: &str) -> Result<Vec<&str>, ContentError> {
    let mut segments = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(ContentError::NotFound(path.to_owned())),
            segment => segments.push(segment),
        }
    }
    Ok(segments)
}

/// Canonical `/`-joined form of a content path.
pub fn normalize_path(path: &str) -> Result<String, ContentError> {
    Ok(content_segments(path)?.join("/"))
}
