//! User-Agent string sent with every transfer request.

/// Default User-Agent for transfer requests (identifies the tool and version).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("fetcher/{version}")
}
