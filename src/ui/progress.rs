// Progress Renderer: pure formatting of position/duration into the bar
// the playback loop redraws. Never talks to the player itself.

/// "M:SS", or "H:MM:SS" past the hour mark.
pub fn format_clock(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// "1:23 [#####-----] 4:00". Unknown duration renders an empty bar with a
/// "--:--" clock so the line width stays stable while the player buffers.
pub fn progress_bar(position: f64, duration: f64, width: usize) -> String {
    let width = width.max(4);
    if !duration.is_finite() || duration <= 0.0 {
        return format!("{} [{}] --:--", format_clock(position), "-".repeat(width));
    }

    let position = position.clamp(0.0, duration);
    let filled = ((position / duration) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!(
        "{} [{}{}] {}",
        format_clock(position),
        "#".repeat(filled),
        "-".repeat(width - filled),
        format_clock(duration)
    )
}
