//! Progress rendering for Telegram status messages.
//!
//! Pure string formatting; the edit rate limit lives in the ingestion
//! pipeline, not here.

/// Number of slots in the rendered progress bar.
const BAR_SLOTS: u64 = 10;

/// Render a 10-slot progress bar with a one-decimal percentage.
///
/// When the total is unknown (0) no ratio can be drawn; a calculating
/// placeholder is returned instead.
pub fn render_progress_bar(current: u64, total: u64) -> String {
    if total == 0 {
        return "⏳ Calculating...".to_string();
    }

    let ratio = (current as f64 / total as f64).clamp(0.0, 1.0);
    let filled = ((ratio * BAR_SLOTS as f64) as u64).min(BAR_SLOTS);

    let mut bar = String::new();
    for _ in 0..filled {
        bar.push('🟩');
    }
    for _ in filled..BAR_SLOTS {
        bar.push('⬜');
    }

    format!("{bar} {:.1}%", ratio * 100.0)
}

/// Format a byte count in human-readable form.
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GiB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
