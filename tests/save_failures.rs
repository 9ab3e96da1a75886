//! Disk-write failures during a transfer.
//!
//! Lowers the process file-size limit, so these tests live in their own test
//! binary and never share a process with other transfers.
#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fetcher_core::download::{
    ErrorKind, Fetch, FetchError, FetchResponse, Transfer, TransferCallbacks, TransferError,
    TransferOutcome, TransferSpec, TransferState,
};
use reqwest::StatusCode;
use tempfile::TempDir;

const FILE_SIZE_LIMIT: u64 = 1024 * 1024;

/// Serves an endless body of unknown length.
struct EndlessFetcher;

#[async_trait]
impl Fetch for EndlessFetcher {
    async fn get(&self, _url: &str) -> Result<FetchResponse, FetchError> {
        Ok(FetchResponse {
            status: StatusCode::OK,
            content_length: None,
            body: Box::pin(tokio::io::repeat(0xAB)),
        })
    }
}

/// Restores the process file-size limit when dropped.
struct FileSizeLimitGuard {
    soft: libc::rlim_t,
    hard: libc::rlim_t,
}

impl Drop for FileSizeLimitGuard {
    fn drop(&mut self) {
        let rlim = libc::rlimit {
            rlim_cur: self.soft,
            rlim_max: self.hard,
        };
        unsafe { libc::setrlimit(libc::RLIMIT_FSIZE, &rlim) };
    }
}

/// Caps regular-file growth at `limit` bytes and turns the resulting
/// SIGXFSZ into a plain `EFBIG` write error.
fn limit_file_size(limit: u64) -> Option<FileSizeLimitGuard> {
    let mut rlim = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    if unsafe { libc::getrlimit(libc::RLIMIT_FSIZE, &mut rlim) } != 0 {
        return None;
    }
    let guard = FileSizeLimitGuard {
        soft: rlim.rlim_cur,
        hard: rlim.rlim_max,
    };
    rlim.rlim_cur = (limit as libc::rlim_t).min(rlim.rlim_max);
    unsafe { libc::signal(libc::SIGXFSZ, libc::SIG_IGN) };
    if unsafe { libc::setrlimit(libc::RLIMIT_FSIZE, &rlim) } != 0 {
        return None;
    }
    Some(guard)
}

#[tokio::test]
async fn test_disk_write_failure_is_save_failed_and_leaves_no_file() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let finished = Arc::new(AtomicUsize::new(0));
    let errors: Arc<Mutex<Vec<ErrorKind>>> = Arc::default();
    let cancelled = Arc::new(AtomicUsize::new(0));
    let callbacks = {
        let (f, e, c) = (
            Arc::clone(&finished),
            Arc::clone(&errors),
            Arc::clone(&cancelled),
        );
        TransferCallbacks::new()
            .on_finish(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .on_error(move |error: &TransferError| {
                e.lock().expect("lock").push(error.kind());
            })
            .on_cancel(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
    };
    let transfer = Transfer::new(
        TransferSpec::new("https://example.com/huge.img", temp_dir.path(), false),
        Arc::new(EndlessFetcher),
    );

    let limit = limit_file_size(FILE_SIZE_LIMIT).expect("failed to lower file-size limit");
    let outcome = transfer
        .start_with(callbacks)
        .await
        .expect("start should be accepted");
    drop(limit);

    assert_eq!(outcome.kind(), Some(ErrorKind::SaveFailed), "got {outcome:?}");
    assert!(matches!(
        outcome,
        TransferOutcome::Failed(
            TransferError::Write { .. } | TransferError::ShortWrite { .. }
        )
    ));
    assert_eq!(transfer.state(), TransferState::Failed);
    assert_eq!(*errors.lock().expect("lock"), vec![ErrorKind::SaveFailed]);
    assert_eq!(finished.load(Ordering::SeqCst), 0);
    assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    assert!(!temp_dir.path().join("huge.img").exists());
}
