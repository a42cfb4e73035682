#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `s3_push` binary: the logger and the
//! upload byte counter shown while a file is sent.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use s3_push::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// Shows bytes sent to the bucket.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied when the file size becomes known.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// A bar labelled `message`, added to `multi`.
    ///
    /// It spins while the remote object is being checked, and turns into a
    /// sized bar with rate and ETA once the upload reports the file size.
    #[must_use]
    pub fn bytes_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::spinner(multi, message))
    }

    fn spinner(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {bytes}/{total_bytes} {binary_bytes_per_sec} [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self { bar, bar_style }
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }

    fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Installs a timestamped `pretty_env_logger` as the global logger.
///
/// `info` unless `RUST_LOG` says otherwise. Log output goes through the
/// returned [`MultiProgress`], so add upload bars to it or log lines will
/// overwrite them.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already installed

    log::set_max_level(level);

    multi
}
