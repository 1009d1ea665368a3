//! Terminal feedback for the CLI: progress bars over contact scans, a
//! spinner for fixture loading, and a log-only mode.
//!
//! In log-only mode every bar is hidden and scans report through `tracing`
//! at a fixed interval, which keeps output readable when piped to a file.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

const BAR_TEMPLATE: &str = "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} contacts ({per_sec})";
const SPINNER_TEMPLATE: &str = "{msg} {spinner} [{elapsed_precise}]";

/// Set once from `--log-only` before any bar is created
static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// "250ms", "4.2s", "1.5m"
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    match secs {
        s if s < 1.0 => format!("{:.0}ms", s * 1000.0),
        s if s < 60.0 => format!("{:.1}s", s),
        s => format!("{:.1}m", s / 60.0),
    }
}

fn styled(pb: ProgressBar, style: ProgressStyle, msg: &str) -> ProgressBar {
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb
}

/// Bar ticking once per scanned contact. Hidden in log-only mode.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    styled(ProgressBar::new(len), style, msg)
}

/// Spinner for steps without a known length. Hidden in log-only mode.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pb = styled(ProgressBar::new_spinner(), style, msg);
    if !is_log_only() {
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb
}

/// Whether item `current` of `total` should produce a log line.
fn is_report_point(current: u64, total: u64, interval: u64) -> bool {
    total > 0 && interval > 0 && (current % interval == 0 || current == total)
}

/// Log-only replacement for a bar: one line every `interval` items and on the last.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && is_report_point(current, total, interval) {
        let pct = 100.0 * current as f64 / total as f64;
        info!(phase, current, total, "progress {:.1}%", pct);
    }
}
