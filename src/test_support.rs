use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::engine::Reporter;
use crate::progress::ProgressState;

/// Stand-in for ffmpeg: prints a duration header and two stats lines, then
/// copies the input to the output. Inputs named `*fail*` exit with an error,
/// inputs named `*noout*` succeed without writing anything.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 6.1-test Copyright (c) 2000-2023 the FFmpeg developers"
  exit 0
fi
input="$2"
for output; do :; done
case "$input" in
  *fail*)
    echo "$input: Invalid data found when processing input" >&2
    exit 1
    ;;
esac
printf "Input #0, mov,mp4,m4a, from '%s':\n" "$input" >&2
printf '  Duration: 00:00:10.00, start: 0.000000, bitrate: 1000 kb/s\n' >&2
printf 'frame=  120 fps=0.0 q=28.0 size=     256kB time=00:00:05.00 bitrate= 419.4kbits/s speed=2.50x    \r' >&2
printf 'frame=  240 fps=0.0 q=28.0 size=     512kB time=00:00:10.00 bitrate= 419.4kbits/s speed=2.50x    \n' >&2
case "$input" in
  *noout*) exit 0 ;;
esac
cat "$input" > "$output"
"#;

/// Writes the fake engine once per test binary, before any test spawns it.
pub fn fake_engine() -> &'static Path {
    static ENGINE: OnceLock<(tempfile::TempDir, PathBuf)> = OnceLock::new();
    let (_, path) = ENGINE.get_or_init(|| {
        let dir = tempfile::tempdir().expect("temp dir for fake ffmpeg");
        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, FAKE_FFMPEG).expect("write fake ffmpeg");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("make fake ffmpeg executable");
        (dir, path)
    });
    path
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub loading: Vec<bool>,
    pub progress: Vec<ProgressState>,
    pub logs: Vec<String>,
    pub notices: Vec<String>,
}

impl Reporter for RecordingReporter {
    fn loading(&mut self, is_loading: bool) {
        self.loading.push(is_loading);
    }

    fn progress(&mut self, state: &ProgressState) {
        self.progress.push(state.clone());
    }

    fn log(&mut self, line: &str) {
        self.logs.push(line.to_string());
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
