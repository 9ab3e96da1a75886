//! Progress UI (bar or spinner) for a running transfer.

use std::time::Duration;

use fetcher_core::ProgressSample;
use indicatif::{ProgressBar, ProgressStyle};

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_show_progress(
    stderr_is_terminal: bool,
    quiet: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// Creates a spinner that turns into a bar once the total size is known.
pub(crate) fn new_progress(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Applies one engine progress sample to the UI.
pub(crate) fn apply_sample(progress: &ProgressBar, sample: ProgressSample) {
    if let Some(total) = sample.total
        && progress.length() != Some(total)
    {
        progress.set_length(total);
        progress.set_style(
            ProgressStyle::with_template(
                "{bar:40} {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
    }
    progress.set_position(sample.transferred);
}
