//! Transfer engine: streams one remote resource to disk.
//!
//! A [`Transfer`] owns the lifecycle of a single transfer:
//!
//! 1. Resolve the destination path (see [`resolve_destination`])
//! 2. Create the destination file exclusively
//! 3. Issue the GET through a [`Fetch`] implementation
//! 4. Reject non-success statuses
//! 5. Copy the body to disk in [`CHUNK_SIZE`] steps, checking for cancellation
//!    before every read and reporting progress after every write
//!
//! Exactly one terminal callback (finish, error or cancel) fires per transfer,
//! after the terminal state is recorded. Any failure after the destination file
//! exists removes the file first, so a reported failure never leaves a partial
//! artifact behind.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fetcher_core::download::{HttpClient, Transfer, TransferCallbacks, TransferSpec};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = TransferSpec::new("https://example.com/report.csv", "./downloads", false);
//! let transfer = Arc::new(Transfer::new(spec, Arc::new(HttpClient::new()?)));
//!
//! let worker = Arc::clone(&transfer);
//! let handle = tokio::spawn(async move {
//!     worker
//!         .start_with(TransferCallbacks::new().on_progress(|s| println!("{s:?}")))
//!         .await
//! });
//!
//! // From any other task:
//! transfer.cancel();
//! let outcome = handle.await??;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

mod callbacks;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

pub use callbacks::{
    CancelFn, ErrorFn, FinishFn, ProgressFn, ProgressSample, TransferCallbacks,
};

use super::constants::CHUNK_SIZE;
use super::error::{ErrorKind, TransferError};
use super::filename::resolve_destination;
use super::{Fetch, FetchResponse};

/// Immutable configuration of one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    url: String,
    dest_dir: PathBuf,
    overwrite: bool,
}

impl TransferSpec {
    /// Creates a transfer configuration.
    ///
    /// `overwrite = true` replaces an existing file with the same name;
    /// `false` picks a numbered name such as `photo(1).jpg`.
    pub fn new(url: impl Into<String>, dest_dir: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            url: url.into(),
            dest_dir: dest_dir.into(),
            overwrite,
        }
    }

    /// Source URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Destination directory.
    #[must_use]
    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Whether an existing file with the same name is replaced.
    #[must_use]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }
}

/// Lifecycle state of a [`Transfer`]. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransferState {
    /// Not started yet.
    Idle = 0,
    /// `start` is running.
    Running = 1,
    /// Finished and the file is complete.
    Succeeded = 2,
    /// Stopped by an error.
    Failed = 3,
    /// Stopped by a cancellation request.
    Cancelled = 4,
}

impl TransferState {
    /// Returns true for `Succeeded`, `Failed` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Succeeded,
            3 => Self::Failed,
            _ => Self::Cancelled,
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Terminal result of a transfer.
#[derive(Debug)]
pub enum TransferOutcome {
    /// The body was written completely to this path.
    Succeeded(PathBuf),
    /// The transfer stopped with an error; no file remains at the destination.
    Failed(TransferError),
    /// The transfer was cancelled; no file remains at the destination.
    Cancelled,
}

impl TransferOutcome {
    /// Failure classification, `None` on success.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(error) => Some(error.kind()),
            Self::Cancelled => Some(ErrorKind::UserCancelled),
        }
    }

    /// Final path on success.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Succeeded(path) => Some(path),
            Self::Failed(_) | Self::Cancelled => None,
        }
    }

    /// Returns true on success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }
}

/// Error type for engine misuse.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `start` was called on a transfer that is not idle.
    #[error("transfer cannot start: already {state}")]
    AlreadyStarted {
        /// State observed when the start was rejected.
        state: TransferState,
    },
}

/// Why the copy stopped early.
enum Halt {
    Cancelled,
    Failed(TransferError),
}

impl From<TransferError> for Halt {
    fn from(error: TransferError) -> Self {
        Self::Failed(error)
    }
}

/// One single-resource transfer.
///
/// The abort flag and the callback slots are the only state shared with other
/// tasks; the file handle and response body never leave [`Transfer::start`].
pub struct Transfer {
    spec: TransferSpec,
    fetcher: Arc<dyn Fetch>,
    abort: AtomicBool,
    state: AtomicU8,
    callbacks: Mutex<TransferCallbacks>,
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("spec", &self.spec)
            .field("state", &self.state())
            .field("cancel_requested", &self.is_cancel_requested())
            .finish_non_exhaustive()
    }
}

impl Transfer {
    /// Creates an idle transfer that fetches through `fetcher`.
    #[must_use]
    pub fn new(spec: TransferSpec, fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            spec,
            fetcher,
            abort: AtomicBool::new(false),
            state: AtomicU8::new(TransferState::Idle as u8),
            callbacks: Mutex::new(TransferCallbacks::default()),
        }
    }

    /// Returns the transfer configuration.
    #[must_use]
    pub fn spec(&self) -> &TransferSpec {
        &self.spec
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransferState {
        TransferState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Binds the progress hook.
    pub fn on_progress(&self, f: impl Fn(ProgressSample) + Send + Sync + 'static) {
        self.slots().progress = Some(Arc::new(f));
    }

    /// Binds the success hook.
    pub fn on_finish(&self, f: impl Fn(&Path) + Send + Sync + 'static) {
        self.slots().finish = Some(Arc::new(f));
    }

    /// Binds the failure hook.
    pub fn on_error(&self, f: impl Fn(&TransferError) + Send + Sync + 'static) {
        self.slots().error = Some(Arc::new(f));
    }

    /// Binds the cancellation acknowledgement hook.
    pub fn on_cancel(&self, f: impl Fn() + Send + Sync + 'static) {
        self.slots().cancel = Some(Arc::new(f));
    }

    /// Binds every hook that `callbacks` sets, keeping the others.
    pub fn set_callbacks(&self, callbacks: TransferCallbacks) {
        self.slots().merge(callbacks);
    }

    /// Requests cancellation.
    ///
    /// The running copy observes the request before its next chunk read. A
    /// request after the transfer reached a terminal state is a no-op, as is
    /// a repeated request.
    pub fn cancel(&self) {
        let state = self.state();
        if state.is_terminal() {
            debug!(url = %self.spec.url, %state, "cancel after termination ignored");
            return;
        }
        if !self.abort.swap(true, Ordering::SeqCst) {
            info!(url = %self.spec.url, %state, "cancellation requested");
        }
    }

    /// Binds the cancellation hook, then requests cancellation.
    pub fn cancel_with(&self, on_cancel: impl Fn() + Send + Sync + 'static) {
        self.on_cancel(on_cancel);
        self.cancel();
    }

    /// Runs the transfer to completion with the hooks already bound.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyStarted`] if this transfer is not idle.
    /// Transfer failures are not errors here; they are reported as
    /// [`TransferOutcome::Failed`].
    pub async fn start(&self) -> Result<TransferOutcome, EngineError> {
        self.start_with(TransferCallbacks::default()).await
    }

    /// Binds the hooks set in `callbacks`, then runs the transfer to completion.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyStarted`] if this transfer is not idle.
    /// No callback fires for a rejected start.
    #[instrument(skip(self, callbacks), fields(url = %self.spec.url))]
    pub async fn start_with(
        &self,
        callbacks: TransferCallbacks,
    ) -> Result<TransferOutcome, EngineError> {
        if let Err(current) = self.state.compare_exchange(
            TransferState::Idle as u8,
            TransferState::Running as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            let state = TransferState::from_u8(current);
            warn!(%state, "rejected start on a transfer that is not idle");
            return Err(EngineError::AlreadyStarted { state });
        }
        self.set_callbacks(callbacks);

        debug!(
            dest_dir = %self.spec.dest_dir.display(),
            overwrite = self.spec.overwrite,
            "starting transfer"
        );

        let mut settle = Settle {
            transfer: self,
            partial: None,
            armed: true,
        };
        let result = self.run(&mut settle).await;
        settle.armed = false;
        Ok(self.conclude(result))
    }

    async fn run(&self, settle: &mut Settle<'_>) -> Result<PathBuf, Halt> {
        let url = self.spec.url.as_str();
        let path = resolve_destination(url, &self.spec.dest_dir, self.spec.overwrite)
            .map_err(|e| TransferError::destination(url, e))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| TransferError::create_file(&path, e))?;
        debug!(path = %path.display(), "destination created");
        settle.partial = Some(path.clone());

        let copied = self.copy_body(&mut file, &path).await;
        settle.partial = None;
        match copied {
            Ok(bytes) => {
                info!(path = %path.display(), bytes, "transfer complete");
                Ok(path)
            }
            Err(halt) => {
                drop(file);
                remove_partial(&path).await;
                Err(halt)
            }
        }
    }

    async fn copy_body(&self, file: &mut File, path: &Path) -> Result<u64, Halt> {
        let url = self.spec.url.as_str();
        let FetchResponse {
            status,
            content_length: total,
            mut body,
        } = self
            .fetcher
            .get(url)
            .await
            .map_err(|e| TransferError::request(url, e))?;

        if !status.is_success() {
            return Err(TransferError::server_status(url, status).into());
        }

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written: u64 = 0;
        loop {
            if self.abort.load(Ordering::SeqCst) {
                warn!(url, bytes = written, "user cancelled transfer");
                return Err(Halt::Cancelled);
            }

            let read = body
                .read(&mut buf)
                .await
                .map_err(|e| TransferError::body_read(url, e))?;
            if read == 0 {
                break;
            }

            let received = written + read as u64;
            if let Some(expected) = total
                && received > expected
            {
                return Err(TransferError::LengthExceeded {
                    url: url.to_string(),
                    expected,
                    received,
                }
                .into());
            }

            let accepted = file
                .write(&buf[..read])
                .await
                .map_err(|e| TransferError::write(path, e))?;
            if accepted != read {
                return Err(TransferError::ShortWrite {
                    path: path.to_path_buf(),
                    expected: read,
                    written: accepted,
                }
                .into());
            }
            written = received;

            self.emit_progress(ProgressSample {
                transferred: written,
                total,
            });
        }

        file.flush()
            .await
            .map_err(|e| TransferError::write(path, e))?;
        Ok(written)
    }

    /// Records the terminal state, then fires the matching hook once.
    fn conclude(&self, result: Result<PathBuf, Halt>) -> TransferOutcome {
        let (state, outcome) = match result {
            Ok(path) => (TransferState::Succeeded, TransferOutcome::Succeeded(path)),
            Err(Halt::Failed(error)) => {
                warn!(kind = %error.kind(), error = %error, "transfer failed");
                (TransferState::Failed, TransferOutcome::Failed(error))
            }
            Err(Halt::Cancelled) => (TransferState::Cancelled, TransferOutcome::Cancelled),
        };
        self.state.store(state as u8, Ordering::SeqCst);

        let hooks = self.slots().clone();
        match &outcome {
            TransferOutcome::Succeeded(path) => {
                if let Some(f) = hooks.finish {
                    f(path);
                }
            }
            TransferOutcome::Failed(error) => {
                if let Some(f) = hooks.error {
                    f(error);
                }
            }
            TransferOutcome::Cancelled => {
                if let Some(f) = hooks.cancel {
                    f();
                }
            }
        }
        outcome
    }

    fn emit_progress(&self, sample: ProgressSample) {
        let hook = self.slots().progress.clone();
        if let Some(f) = hook {
            f(sample);
        }
    }

    fn slots(&self) -> MutexGuard<'_, TransferCallbacks> {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles a transfer whose `start` future is dropped or unwinds before it
/// concludes.
///
/// The state becomes `Cancelled` and the partial file is removed. No hook
/// fires: there is no caller left to receive one.
struct Settle<'a> {
    transfer: &'a Transfer,
    partial: Option<PathBuf>,
    armed: bool,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let state = TransferState::Cancelled;
        self.transfer.state.store(state as u8, Ordering::SeqCst);
        warn!(url = %self.transfer.spec.url, %state, "transfer abandoned before completion");

        if let Some(path) = self.partial.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed partial file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove partial file");
                }
            }
        }
    }
}

/// Best-effort removal of a partially written destination.
///
/// A removal failure is logged and never replaces the transfer's own outcome.
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial file"),
    }
}
