//! Progress bar display for artifact downloads

use indicatif::{ProgressBar, ProgressStyle};

/// Progress display for a fetch run. Hidden bars swallow every update, so
/// library callers and tests can pass `visible: false` and stay silent.
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    /// Create a progress display over `total` artifacts.
    pub fn new(total: u64, visible: bool) -> Self {
        let bar = if visible {
            let style = ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            let bar = ProgressBar::new(total);
            bar.set_style(style);
            bar
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }

    /// Show the coordinate currently being fetched.
    pub fn start(&self, coordinate: &str) {
        self.bar.set_message(coordinate.to_string());
    }

    /// One artifact finished (fetched, cached, or skipped).
    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_with_message("done");
    }

    /// Abandon on error, leaving the bar where it stopped.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
