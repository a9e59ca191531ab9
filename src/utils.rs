use crate::error::{Error, Result};

// ============================================================================
// File Names
// ============================================================================

/// Marker appended to every generated output file stem.
pub const OUTPUT_MARKER: &str = "_entropy";

pub const DEFAULT_TRUNCATE_LENGTH: usize = 24;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Strips the final extension segment. A leading dot means the whole name is
/// an extension, so nothing is left.
pub fn trim_filename(name: &str) -> &str {
    match name.rfind('.') {
        None => name,
        Some(0) => "",
        Some(dot) => &name[..dot],
    }
}

pub fn generate_output_name(name: &str, extension: &str) -> String {
    format!("{}{}.{}", trim_filename(name), OUTPUT_MARKER, extension)
}

/// Shortens long names for display as `start...end.ext`, keeping half of
/// `max_length` characters from each side of the stem (text before the
/// first dot). Budgets below 2 keep no stem characters at all, so the
/// result is just `...` plus the extension.
pub fn truncate_file_name(name: &str, max_length: usize) -> String {
    if name.chars().count() <= max_length {
        return name.to_string();
    }

    let stem: Vec<char> = name.split('.').next().unwrap_or(name).chars().collect();
    let half = max_length / 2;

    let start: String = stem.iter().take(half).collect();
    let end: String = stem[stem.len().saturating_sub(half)..].iter().collect();

    match name.rfind('.') {
        Some(dot) => format!("{}...{}.{}", start, end, &name[dot + 1..]),
        None => format!("{}...{}", start, end),
    }
}

pub fn get_file_extension(name: &str) -> &str {
    name.rfind('.').map(|dot| &name[dot + 1..]).unwrap_or("")
}

// ============================================================================
// Display Formatting
// ============================================================================

pub fn get_file_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = 0;

    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", size, SIZE_UNITS[unit])
}

pub fn get_emoji_from_type(kind: &str) -> &'static str {
    match kind {
        "video" => "🎥",
        "audio" => "🎵",
        "image" => "🖼️",
        _ => "📁",
    }
}

pub fn capitalize_first_letter(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Time
// ============================================================================

/// Formats seconds as `HH:MM:SS.mmm`. Milliseconds are rounded over the whole
/// value, so 0.9996s becomes `00:00:01.000`.
pub fn format_time(time: f64) -> Result<String> {
    if time.is_nan() {
        return Err(Error::NotANumber("Time"));
    }
    if time < 0.0 {
        return Err(Error::Negative("Time"));
    }
    if time.is_infinite() {
        return Err(Error::NotANumber("Time"));
    }

    let total_ms = (time * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    Ok(format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis))
}

/// Seconds left for a job at `speed` times realtime.
///
/// `speed` is not checked: zero gives an infinite estimate and a negative
/// value a negative one. Callers decide what to show in that case.
pub fn calculate_time_remaining(total_duration: f64, current: f64, speed: f64) -> Result<f64> {
    if total_duration.is_nan() {
        return Err(Error::NotANumber("Total duration"));
    }
    if total_duration < 0.0 {
        return Err(Error::Negative("Total duration"));
    }
    if current >= total_duration {
        return Ok(0.0);
    }

    Ok((total_duration - current) / speed)
}

pub fn format_time_remaining(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let remaining = seconds % 60;

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if remaining > 0 || parts.is_empty() {
        parts.push(format!("{}s", remaining));
    }

    parts.join(" ")
}
