//! Destination resolution: deriving a safe, collision-free file path from a URL.
//!
//! The resolver touches the filesystem only to create the destination
//! directory, to probe for existing names, and to remove a file being
//! overwritten. It never performs network I/O.

use std::io;
use std::path::{Component, Path, PathBuf};

use rand::RngCore;
use rand::rngs::OsRng;
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{FALLBACK_NAME_ALPHABET, FALLBACK_NAME_LEN};
use super::error::ResolveError;

/// Resolves the final local path for `source_url` inside `dest_dir`.
///
/// Creates `dest_dir` (and parents) when it does not exist. When a file with
/// the candidate name already exists, `overwrite = true` removes it and reuses
/// the name, `overwrite = false` picks `base(1).ext`, `base(2).ext`, ...
///
/// # Errors
///
/// Returns [`ResolveError`] if the directory cannot be created, is not a
/// directory, or an existing file cannot be removed under the overwrite policy.
#[instrument(level = "debug", fields(dest_dir = %dest_dir.display()))]
pub fn resolve_destination(
    source_url: &str,
    dest_dir: &Path,
    overwrite: bool,
) -> Result<PathBuf, ResolveError> {
    ensure_dir(dest_dir)?;

    let candidate = candidate_name(source_url);
    let (base, ext) = split_name(&candidate);
    let name = format!("{base}{ext}");
    let path = dest_dir.join(&name);

    if !exists(&path)? {
        return Ok(path);
    }

    if overwrite {
        debug!(path = %path.display(), "removing existing file");
        std::fs::remove_file(&path).map_err(|e| ResolveError::remove_existing(&path, e))?;
        return Ok(path);
    }

    let mut num: u64 = 1;
    loop {
        let renamed = dest_dir.join(format!("{base}({num}){ext}"));
        if !exists(&renamed)? {
            debug!(original = %name, path = %renamed.display(), "name taken, using suffix");
            return Ok(renamed);
        }
        num += 1;
    }
}

/// Splits a file name into base name and extension.
///
/// The extension starts at the last `.` and keeps the dot. A name whose only
/// dot is the leading one (`.env`) has no extension and loses the dot.
#[must_use]
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        None => (name, ""),
        Some(0) => (&name[1..], ""),
        Some(index) => (&name[..index], &name[index..]),
    }
}

/// Generates a random lowercase identifier of `len` characters.
///
/// Characters come from an alphabet without `0`, `1`, `o` and `l`.
#[must_use]
pub fn random_name(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| char::from(FALLBACK_NAME_ALPHABET[usize::from(b >> 3)]))
        .collect()
}

/// Derives the candidate file name from the URL's last path segment.
///
/// Falls back to a random name when the segment is empty or unusable.
pub(crate) fn candidate_name(source_url: &str) -> String {
    let segment = last_path_segment(source_url);
    let decoded = urlencoding::decode(&segment).map_or_else(
        |e| {
            debug!(segment = %segment, error = %e, "URL decoding failed, using raw segment");
            segment.clone()
        },
        std::borrow::Cow::into_owned,
    );
    let sanitized = sanitize_filename(&decoded);

    // Only-dots names sanitize to underscores; a bare "_" carries no information.
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '_') {
        let name = random_name(FALLBACK_NAME_LEN);
        debug!(url = %source_url, name = %name, "no usable name in URL, using random name");
        return name;
    }
    sanitized
}

fn last_path_segment(source_url: &str) -> String {
    if let Ok(parsed) = Url::parse(source_url) {
        return parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();
    }

    // Not an absolute URL: strip query and fragment, take the text after the last '/'.
    let end = source_url.find(['?', '#']).unwrap_or(source_url.len());
    let path = &source_url[..end];
    path.rsplit('/').next().unwrap_or_default().to_string()
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
pub(crate) fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() || is_safe_filename_segment(&sanitized) {
        sanitized
    } else {
        sanitized
            .chars()
            .map(|c| if c == '.' { '_' } else { c })
            .collect()
    }
}

fn is_safe_filename_segment(name: &str) -> bool {
    !Path::new(name).components().any(|component| {
        matches!(
            component,
            Component::CurDir | Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    })
}

fn ensure_dir(dir: &Path) -> Result<(), ResolveError> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ResolveError::NotADirectory {
            path: dir.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(dir = %dir.display(), "destination directory does not exist, creating");
            std::fs::create_dir_all(dir).map_err(|e| ResolveError::create_dir(dir, e))
        }
        Err(e) => Err(ResolveError::inspect(dir, e)),
    }
}

fn exists(path: &Path) -> Result<bool, ResolveError> {
    path.try_exists().map_err(|e| ResolveError::inspect(path, e))
}
