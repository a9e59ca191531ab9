use std::sync::LazyLock;

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::{calculate_time_remaining, format_time_remaining};

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=\s*(\d{2}):(\d{2}):(\d{2})\.\d{2}").expect("valid time regex"));
static SPEED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"speed=\s*(\d+(?:\.\d+)?)x").expect("valid speed regex"));
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration: (\d{2}):(\d{2}):(\d{2})\.\d{2}").expect("valid duration regex"));

/// One `time=... speed=...x` sample from the ffmpeg stats line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeLog {
    /// Whole seconds processed so far.
    pub time: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub percent: u8,
    pub time_remaining: Option<String>,
}

fn captured_seconds(cap: &regex::Captures<'_>) -> f64 {
    let h: f64 = cap.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);
    let m: f64 = cap.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);
    let s: f64 = cap.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);
    h * 3600.0 + m * 60.0 + s
}

/// Reads the processed time and speed from a stats line. Both tokens must be
/// present; the hundredths after the seconds are ignored.
pub fn parse_ffmpeg_time_log(line: &str) -> Option<TimeLog> {
    let time = TIME_RE.captures(line)?;
    let speed = SPEED_RE.captures(line)?;

    Some(TimeLog {
        time: captured_seconds(&time),
        speed: speed.get(1)?.as_str().parse().ok()?,
    })
}

/// Reads the input duration from the `Duration:` header ffmpeg prints before
/// processing starts.
pub fn parse_duration(line: &str) -> Option<f64> {
    DURATION_RE.captures(line).map(|cap| captured_seconds(&cap))
}

/// Turns the engine's log stream into progress updates for one invocation.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    duration: Option<f64>,
    state: ProgressState,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Feeds one log line. Returns `true` when the progress state changed.
    pub fn ingest(&mut self, line: &str) -> Result<bool> {
        if self.duration.is_none() {
            if let Some(duration) = parse_duration(line) {
                self.duration = Some(duration);
                return Ok(false);
            }
        }

        let Some(sample) = parse_ffmpeg_time_log(line) else {
            return Ok(false);
        };
        let Some(duration) = self.duration.filter(|d| *d > 0.0) else {
            return Ok(false);
        };

        let percent = (sample.time / duration * 100.0).round().clamp(0.0, 100.0) as u8;

        let remaining = calculate_time_remaining(duration, sample.time, sample.speed)?;
        let time_remaining = if remaining.is_finite() && remaining >= 0.0 {
            Some(format_time_remaining(remaining.round() as u64))
        } else {
            warn!(
                "Discarding time estimate {} (speed={}x at {}s of {}s)",
                remaining, sample.speed, sample.time, duration
            );
            None
        };

        let next = ProgressState { percent, time_remaining };
        if next == self.state {
            return Ok(false);
        }
        self.state = next;
        Ok(true)
    }

    /// Marks the invocation as finished.
    pub fn complete(&mut self) -> &ProgressState {
        self.state = ProgressState {
            percent: 100,
            time_remaining: None,
        };
        &self.state
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
