//! Elapsed time formatting for run summaries

use std::time::Duration;

/// Format a duration as `H:MM:SS` with a microsecond fraction when non-zero,
/// e.g. `0:01:05.250000`. Hours are not wrapped into days.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let micros = elapsed.subsec_micros();

    if micros == 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}.{:06}", hours, minutes, seconds, micros)
    }
}
