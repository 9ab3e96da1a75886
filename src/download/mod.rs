//! Single-resource transfer engine.
//!
//! This module streams one HTTP/HTTPS resource into a local directory under
//! caller control: start it, observe progress, cancel it, and receive exactly
//! one terminal outcome.
//!
//! # Features
//!
//! - Streaming copy in fixed 32 KiB chunks (memory-bounded for large files)
//! - Collision-free destination names (`photo(1).jpg`) or explicit overwrite
//! - Cooperative cancellation observed at every chunk boundary
//! - Structured error kinds with full context
//! - No partial file left behind after a failure or cancellation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fetcher_core::download::{HttpClient, Transfer, TransferOutcome, TransferSpec};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(HttpClient::new()?);
//! let transfer = Transfer::new(
//!     TransferSpec::new("https://example.com/paper.pdf", "./downloads", false),
//!     client,
//! );
//! match transfer.start().await? {
//!     TransferOutcome::Succeeded(path) => println!("Downloaded: {}", path.display()),
//!     TransferOutcome::Failed(e) => eprintln!("{} ({})", e, e.kind()),
//!     TransferOutcome::Cancelled => eprintln!("cancelled"),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod engine;
mod error;
mod filename;

pub use client::{BodyReader, ClientConfig, Fetch, FetchResponse, HttpClient};
pub use engine::{
    CancelFn, EngineError, ErrorFn, FinishFn, ProgressFn, ProgressSample, Transfer,
    TransferCallbacks, TransferOutcome, TransferSpec, TransferState,
};
pub use error::{BoxError, ErrorKind, FetchError, ResolveError, TransferError};
pub use filename::{random_name, resolve_destination, split_name};
