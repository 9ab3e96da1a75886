//! Fetcher Core Library
//!
//! This library streams a single remote resource to local storage under
//! explicit caller control (start, observe progress, cancel) and reports a
//! well-defined outcome: success, a specific failure kind, or cancellation.
//!
//! # Architecture
//!
//! - [`download`] - Destination resolver, fetch client and transfer engine
//!
//! The library emits `tracing` events but never installs a subscriber.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
mod user_agent;

// Re-export commonly used types
pub use download::{
    ErrorKind, Fetch, HttpClient, ProgressSample, Transfer, TransferCallbacks, TransferError,
    TransferOutcome, TransferSpec, resolve_destination,
};
