//! Error types for the download module.
//!
//! Every terminal failure of a transfer is a [`TransferError`], classified into
//! an [`ErrorKind`] so callers can tell configuration problems (bad directory)
//! from network/server problems and from local-disk problems.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed source error for pluggable fetchers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of a transfer outcome that is not a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Destination directory or file could not be created or opened.
    CreateFileFailed,
    /// Request construction, send, or body read failed.
    DownloadFailed,
    /// Response received with a non-success status code.
    ServerError,
    /// Write to local storage failed or was short.
    SaveFailed,
    /// Cooperative cancellation observed during streaming.
    UserCancelled,
}

impl ErrorKind {
    /// Stable numeric code for this kind.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::DownloadFailed => -1,
            Self::CreateFileFailed => -2,
            Self::SaveFailed => -3,
            Self::UserCancelled => -4,
            Self::ServerError => -5,
        }
    }

    /// Returns the kind name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateFileFailed => "create_file_failed",
            Self::DownloadFailed => "download_failed",
            Self::ServerError => "server_error",
            Self::SaveFailed => "save_failed",
            Self::UserCancelled => "user_cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while resolving a destination path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The destination directory was missing and could not be created.
    #[error("cannot create destination directory {dir}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        dir: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The destination path exists but is not a directory.
    #[error("destination {path} is not a directory")]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// The destination path could not be inspected.
    #[error("cannot inspect destination {path}: {source}")]
    Inspect {
        /// Path that could not be inspected.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// An existing file could not be removed under the overwrite policy.
    #[error("cannot remove existing file {path}: {source}")]
    RemoveExisting {
        /// File that should have been replaced.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    /// Creates a directory creation error.
    pub fn create_dir(dir: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            dir: dir.into(),
            source,
        }
    }

    /// Creates an inspection error.
    pub fn inspect(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Inspect {
            path: path.into(),
            source,
        }
    }

    /// Creates an overwrite removal error.
    pub fn remove_existing(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RemoveExisting {
            path: path.into(),
            source,
        }
    }
}

/// Errors returned by a [`Fetch`](super::Fetch) implementation before any
/// response was received.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL is malformed or not HTTP/HTTPS.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Request timed out before a response arrived.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: BoxError,
    },
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a network error from any transport error.
    pub fn network(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Network {
            url: url.into(),
            source: source.into(),
        }
    }
}

/// Terminal failure of a transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The destination path could not be resolved.
    #[error("cannot prepare destination for {url}: {source}")]
    Destination {
        /// Source URL of the transfer.
        url: String,
        /// The resolver failure.
        #[source]
        source: ResolveError,
    },

    /// The destination file could not be created.
    #[error("cannot create {path}: {source}")]
    CreateFile {
        /// File that could not be created.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The request could not be built or sent.
    #[error("download [{url}] failed: {source}")]
    Request {
        /// Source URL of the transfer.
        url: String,
        /// The fetcher failure.
        #[source]
        source: FetchError,
    },

    /// The server answered with a non-success status.
    #[error("remote error: {status} downloading {url}")]
    ServerStatus {
        /// Source URL of the transfer.
        url: String,
        /// Status description, e.g. `404 Not Found`.
        status: String,
        /// Numeric status code.
        code: u16,
    },

    /// The response body could not be read to the end.
    #[error("network error reading body of {url}: {source}")]
    BodyRead {
        /// Source URL of the transfer.
        url: String,
        /// The underlying read error.
        #[source]
        source: std::io::Error,
    },

    /// The body grew past the content length the server declared.
    #[error("body of {url} exceeded declared length: expected {expected} bytes, got {received}")]
    LengthExceeded {
        /// Source URL of the transfer.
        url: String,
        /// Declared content length.
        expected: u64,
        /// Bytes received so far.
        received: u64,
    },

    /// Writing to the destination failed.
    #[error("IO error writing to {path}: {source}")]
    Write {
        /// File being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Fewer bytes reached the disk than were read from the network.
    #[error("save [{path}] failed: wrote {written} of {expected} bytes")]
    ShortWrite {
        /// File being written.
        path: PathBuf,
        /// Bytes read from the network for this chunk.
        expected: usize,
        /// Bytes accepted by the file.
        written: usize,
    },
}

impl TransferError {
    /// Returns the failure classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Destination { .. } | Self::CreateFile { .. } => ErrorKind::CreateFileFailed,
            Self::Request { .. } | Self::BodyRead { .. } | Self::LengthExceeded { .. } => {
                ErrorKind::DownloadFailed
            }
            Self::ServerStatus { .. } => ErrorKind::ServerError,
            Self::Write { .. } | Self::ShortWrite { .. } => ErrorKind::SaveFailed,
        }
    }

    /// Creates a destination resolution error.
    pub fn destination(url: impl Into<String>, source: ResolveError) -> Self {
        Self::Destination {
            url: url.into(),
            source,
        }
    }

    /// Creates a file creation error.
    pub fn create_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a request error.
    pub fn request(url: impl Into<String>, source: FetchError) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }

    /// Creates a server status error from a status code.
    pub fn server_status(url: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::ServerStatus {
            url: url.into(),
            status: status.to_string(),
            code: status.as_u16(),
        }
    }

    /// Creates a body read error.
    pub fn body_read(url: impl Into<String>, source: std::io::Error) -> Self {
        Self::BodyRead {
            url: url.into(),
            source,
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

// No `From<std::io::Error>` here: the same io::Error means CreateFileFailed,
// DownloadFailed or SaveFailed depending on where it happened.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes_are_stable() {
        assert_eq!(ErrorKind::DownloadFailed.code(), -1);
        assert_eq!(ErrorKind::CreateFileFailed.code(), -2);
        assert_eq!(ErrorKind::SaveFailed.code(), -3);
        assert_eq!(ErrorKind::UserCancelled.code(), -4);
        assert_eq!(ErrorKind::ServerError.code(), -5);
    }

    #[test]
    fn test_server_status_carries_description() {
        let error = TransferError::server_status(
            "https://example.com/file.pdf",
            reqwest::StatusCode::NOT_FOUND,
        );
        let msg = error.to_string();
        assert!(msg.contains("404 Not Found"), "Expected status in: {msg}");
        assert!(msg.contains("https://example.com/file.pdf"), "Expected URL in: {msg}");
        assert_eq!(error.kind(), ErrorKind::ServerError);
    }

    #[test]
    fn test_destination_error_is_create_file_failed() {
        let error = TransferError::destination(
            "https://example.com/a.bin",
            ResolveError::NotADirectory {
                path: PathBuf::from("/tmp/not-a-dir"),
            },
        );
        assert_eq!(error.kind(), ErrorKind::CreateFileFailed);
        assert!(error.to_string().contains("/tmp/not-a-dir"));
    }

    #[test]
    fn test_write_failures_are_save_failed() {
        let io_error = std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full");
        let error = TransferError::write("/tmp/out.bin", io_error);
        assert_eq!(error.kind(), ErrorKind::SaveFailed);

        let short = TransferError::ShortWrite {
            path: PathBuf::from("/tmp/out.bin"),
            expected: 10,
            written: 4,
        };
        assert_eq!(short.kind(), ErrorKind::SaveFailed);
        assert!(short.to_string().contains("wrote 4 of 10"));
    }

    #[test]
    fn test_request_and_body_failures_are_download_failed() {
        let request = TransferError::request(
            "not-a-url",
            FetchError::invalid_url("not-a-url"),
        );
        assert_eq!(request.kind(), ErrorKind::DownloadFailed);
        assert!(request.to_string().contains("invalid URL"));

        let body = TransferError::body_read(
            "https://example.com/a",
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"),
        );
        assert_eq!(body.kind(), ErrorKind::DownloadFailed);
    }

    #[test]
    fn test_fetch_error_network_preserves_source() {
        let source = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = FetchError::network("https://example.com", source);
        let inner = std::error::Error::source(&error).unwrap();
        assert_eq!(inner.to_string(), "refused");
    }
}
