//! Constants for the download module (timeouts, chunking, fallback names).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Size of each body read/write step (32 KiB).
///
/// Cancellation is observed between chunks, so this also bounds cancel latency.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// Length of the random name used when the URL yields no file name.
pub const FALLBACK_NAME_LEN: usize = 32;

/// Alphabet for random file names. Excludes `0`, `1`, `o` and `l`.
pub const FALLBACK_NAME_ALPHABET: &[u8; 32] = b"abcdefghijkmnpqrstuvwxyz23456789";
