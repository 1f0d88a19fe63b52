//! Logarithmic mapping between the file-size slider and a KB cutoff.
//!
//! The slider spans `0..=500`. Positions are warped by an exponent of 1.5
//! before the exponential so small sizes get most of the resolution while
//! the top of the range still reaches 100 MiB.

/// Highest slider position.
pub const SLIDER_MAX: u32 = 500;

/// Largest selectable cutoff (100 MiB) in kilobytes.
pub const MAX_SIZE_KB: u32 = 102_400;

/// Default cutoff used for a fresh form.
pub const DEFAULT_SIZE_KB: u32 = 50;

const WARP: f64 = 1.5;

fn log_bounds() -> (f64, f64) {
    (1f64.ln(), f64::from(MAX_SIZE_KB).ln())
}

/// Unrounded cutoff for a slider position. Positions past the end clamp.
pub fn position_to_size_exact(position: u32) -> f64 {
    let (min_log, max_log) = log_bounds();
    let t = f64::from(position.min(SLIDER_MAX)) / f64::from(SLIDER_MAX);
    (min_log + (max_log - min_log) * t.powf(WARP)).exp()
}

/// Cutoff in whole kilobytes for a slider position.
pub fn position_to_size(position: u32) -> u32 {
    let size = position_to_size_exact(position).round();
    (size as u32).clamp(1, MAX_SIZE_KB)
}

/// Slider position for a cutoff. Sizes outside `1..=MAX_SIZE_KB` clamp.
pub fn size_to_position(size_kb: f64) -> u32 {
    let (min_log, max_log) = log_bounds();
    let size = if size_kb.is_nan() {
        1.0
    } else {
        size_kb.clamp(1.0, f64::from(MAX_SIZE_KB))
    };
    let t = (size.ln() - min_log) / (max_log - min_log);
    let position = (f64::from(SLIDER_MAX) * t.powf(1.0 / WARP)).round();
    (position as u32).min(SLIDER_MAX)
}

/// `"Nmb"` for sizes of at least 1024 KB, `"Nkb"` otherwise.
pub fn format_size(size_kb: u32) -> String {
    if size_kb >= 1024 {
        let mb = (f64::from(size_kb) / 1024.0).round();
        format!("{}mb", mb as u64)
    } else {
        format!("{}kb", size_kb)
    }
}
