use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::operations::Job;
use crate::progress::{ProgressState, ProgressTracker};

fn new_command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    #[cfg(target_os = "windows")]
    cmd.creation_flags(0x08000000);
    cmd
}

// ============================================================================
// Callbacks
// ============================================================================

/// Receives what a running action has to tell the front end. Every method
/// has a no-op default so front ends only implement what they display.
pub trait Reporter: Send {
    fn loading(&mut self, _is_loading: bool) {}

    fn progress(&mut self, _state: &ProgressState) {}

    /// One raw engine log line.
    fn log(&mut self, _line: &str) {}

    /// A message meant for the user, such as a rejected file.
    fn notice(&mut self, _message: &str) {}
}

pub struct NullReporter;

impl Reporter for NullReporter {}

/// Everything an action handler needs, passed explicitly into each call.
pub struct Context<'a> {
    pub settings: &'a Settings,
    pub engine: &'a Engine,
    pub reporter: &'a mut dyn Reporter,
}

impl<'a> Context<'a> {
    pub fn new(settings: &'a Settings, engine: &'a Engine, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            settings,
            engine,
            reporter,
        }
    }
}

// ============================================================================
// FFmpeg
// ============================================================================

#[derive(Debug, Clone)]
pub struct Engine {
    program: PathBuf,
    version: String,
}

impl Engine {
    /// Checks that `program` runs and records its version line.
    pub async fn load(program: impl Into<PathBuf>) -> Result<Self> {
        let program = program.into();
        info!("Loading ffmpeg from {}", program.display());

        let not_found = |message: String| Error::EngineNotFound {
            program: program.display().to_string(),
            message,
        };

        let output = new_command(&program)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| not_found(e.to_string()))?;

        if !output.status.success() {
            return Err(not_found(format!("exited with code {:?}", output.status.code())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = stdout.lines().next().unwrap_or("ffmpeg").trim().to_string();
        info!("Loaded {}", version);

        Ok(Self { program, version })
    }

    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        Self::load(settings.ffmpeg_program()).await
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Runs `job` on `input` inside a scratch workspace and returns the bytes
    /// of the produced file. The workspace is removed afterwards.
    pub async fn run(&self, input: &Path, job: &Job, reporter: &mut dyn Reporter) -> Result<Vec<u8>> {
        let input_name = input
            .file_name()
            .filter(|_| input.is_file())
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| Error::InputNotFound(input.to_path_buf()))?;

        let workspace = tempfile::Builder::new().prefix("entropy-").tempdir()?;
        tokio::fs::copy(input, workspace.path().join(&input_name)).await?;

        let args = job.command_line(&input_name);
        info!("Running FFmpeg with args: {:?}", args);

        let mut child = new_command(&self.program)
            .args(&args)
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::EngineNotFound {
                program: self.program.display().to_string(),
                message: e.to_string(),
            })?;

        let mut tracker = ProgressTracker::new();
        let mut last_line = String::new();

        // Stats lines end in '\r', everything else in '\n'.
        if let Some(stderr) = child.stderr.take() {
            let mut segments = BufReader::new(stderr).split(b'\r');
            while let Some(segment) = segments.next_segment().await? {
                let text = String::from_utf8_lossy(&segment);
                for line in text.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
                    debug!("ffmpeg: {}", line);
                    reporter.log(line);
                    if tracker.ingest(line)? {
                        reporter.progress(tracker.state());
                    }
                    last_line = line.to_string();
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(Error::EngineFailed {
                code: status.code(),
                last_line,
            });
        }

        reporter.progress(tracker.complete());

        match tokio::fs::read(workspace.path().join(&job.output_name)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::MissingOutput(job.output_name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::operations::{Operation, VideoFormat};
    use crate::test_support::{fake_engine, RecordingReporter};

    #[tokio::test]
    async fn load_reads_version_line() {
        let engine = Engine::load(fake_engine()).await.unwrap();
        assert!(engine.version().starts_with("ffmpeg version"));
        assert_eq!(engine.program(), fake_engine());
    }

    #[tokio::test]
    async fn load_fails_for_missing_binary() {
        let err = Engine::load("/definitely/not/here/ffmpeg").await.unwrap_err();
        assert!(matches!(err, Error::EngineNotFound { .. }));
    }

    #[tokio::test]
    async fn run_returns_output_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        std::fs::write(&input, b"not really a video").unwrap();

        let engine = Engine::load(fake_engine()).await.unwrap();
        let job = Operation::ConvertVideo { format: VideoFormat::Mkv }.plan("clip.mp4");
        let mut reporter = RecordingReporter::default();

        let bytes = engine.run(&input, &job, &mut reporter).await.unwrap();

        assert_eq!(bytes, b"not really a video");
        assert!(reporter.logs.iter().any(|l| l.contains("Duration: 00:00:10.00")));
        let percents: Vec<u8> = reporter.progress.iter().map(|p| p.percent).collect();
        assert_eq!(percents, [50, 100, 100]);
        assert_eq!(reporter.progress[0].time_remaining.as_deref(), Some("2s"));
        assert_eq!(reporter.progress.last().unwrap().time_remaining, None);
    }

    #[tokio::test]
    async fn dash_prefixed_input_is_not_taken_for_an_option() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("-clip.mp4");
        std::fs::write(&input, b"dashing").unwrap();

        let engine = Engine::load(fake_engine()).await.unwrap();
        let job = Operation::FlipVideo { flip: crate::operations::Flip::Vertical }.plan("-clip.mp4");
        let bytes = engine.run(&input, &job, &mut NullReporter).await.unwrap();

        assert_eq!(bytes, b"dashing");
    }

    #[tokio::test]
    async fn engine_failure_keeps_last_line() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fail.mp4");
        std::fs::write(&input, b"broken").unwrap();

        let engine = Engine::load(fake_engine()).await.unwrap();
        let job = Operation::VideoToGif.plan("fail.mp4");
        let err = engine
            .run(&input, &job, &mut NullReporter)
            .await
            .unwrap_err();

        match err {
            Error::EngineFailed { code, last_line } => {
                assert_eq!(code, Some(1));
                assert!(last_line.contains("Invalid data found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("noout.wav");
        std::fs::write(&input, b"RIFF").unwrap();

        let engine = Engine::load(fake_engine()).await.unwrap();
        let job = Operation::AudioToWaveform.plan("noout.wav");
        let err = engine.run(&input, &job, &mut NullReporter).await.unwrap_err();

        assert!(matches!(err, Error::MissingOutput(name) if name == "noout_entropy.png"));
    }

    #[tokio::test]
    async fn missing_input_is_rejected_before_spawning() {
        let engine = Engine::load(fake_engine()).await.unwrap();
        let job = Operation::VideoToGif.plan("ghost.mp4");
        let err = engine
            .run(Path::new("/nowhere/ghost.mp4"), &job, &mut NullReporter)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InputNotFound(_)));
    }
}
