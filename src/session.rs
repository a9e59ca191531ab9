use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::Serialize;

use crate::config::Settings;
use crate::engine::{Context, Reporter};
use crate::error::{Error, Result};
use crate::operations::{MediaKind, Operation};
use crate::output::Output;
use crate::progress::ProgressState;
use crate::utils::{get_file_size, truncate_file_name, DEFAULT_TRUNCATE_LENGTH};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub kind: Option<MediaKind>,
}

impl SelectedFile {
    pub fn display_name(&self) -> String {
        truncate_file_name(&self.name, DEFAULT_TRUNCATE_LENGTH)
    }

    pub fn display_size(&self) -> String {
        get_file_size(self.size)
    }

    pub fn emoji(&self) -> &'static str {
        match self.kind {
            Some(kind) => kind.emoji(),
            None => crate::utils::get_emoji_from_type(""),
        }
    }
}

/// State of one conversion panel: the chosen file, the progress of the
/// current action and whether an action is running.
#[derive(Debug, Default)]
pub struct Session {
    selected: Option<SelectedFile>,
    progress: ProgressState,
    is_loading: bool,
}

/// Mirrors progress into the session before handing it to the front end.
struct SessionReporter<'a> {
    progress: &'a mut ProgressState,
    inner: &'a mut dyn Reporter,
}

impl Reporter for SessionReporter<'_> {
    fn progress(&mut self, state: &ProgressState) {
        *self.progress = state.clone();
        self.inner.progress(state);
    }

    fn log(&mut self, line: &str) {
        self.inner.log(line);
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Replaces the selection. Files over the configured size cap are
    /// refused with a notice and leave nothing selected. Needs no engine.
    pub fn select_file(
        &mut self,
        settings: &Settings,
        reporter: &mut dyn Reporter,
        path: &Path,
    ) -> Result<&SelectedFile> {
        info!("select_file called for: {}", path.display());
        self.clear(reporter);

        let metadata = std::fs::metadata(path)
            .ok()
            .filter(|m| m.is_file())
            .ok_or_else(|| Error::InputNotFound(path.to_path_buf()))?;

        if let Err(err) = settings.check_file_size(metadata.len()) {
            reporter.notice(&err.to_string());
            return Err(err);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(self.selected.insert(SelectedFile {
            path: path.to_path_buf(),
            kind: MediaKind::from_file_name(&name),
            name,
            size: metadata.len(),
        }))
    }

    pub fn clear(&mut self, reporter: &mut dyn Reporter) {
        self.selected = None;
        self.progress = ProgressState::default();
        reporter.progress(&self.progress);
    }

    /// Runs `operation` on the selected file. Failures are logged and end the
    /// action without a result.
    pub async fn run(&mut self, ctx: &mut Context<'_>, operation: &Operation) -> Option<Output> {
        info!("run called with operation: {:?}", operation);

        self.set_loading(ctx, true);
        self.progress = ProgressState::default();
        ctx.reporter.progress(&self.progress);

        let result = self.execute(ctx, operation).await;
        self.set_loading(ctx, false);

        match result {
            Ok(output) => Some(output),
            Err(err) => {
                error!("{} failed: {}", operation.descriptor().label, err);
                None
            }
        }
    }

    async fn execute(&mut self, ctx: &mut Context<'_>, operation: &Operation) -> Result<Output> {
        let Session {
            selected, progress, ..
        } = self;
        let file = selected.as_ref().ok_or(Error::NoFileSelected)?;

        let descriptor = operation.descriptor();
        if file.kind.is_some_and(|kind| kind != descriptor.input_kind) {
            warn!(
                "{} expects {} input, {} looks like {}",
                descriptor.label,
                descriptor.input_kind,
                file.name,
                file.kind.map(MediaKind::as_str).unwrap_or("unknown")
            );
        }

        let job = operation.plan(&file.name);
        let mut reporter = SessionReporter {
            progress,
            inner: &mut *ctx.reporter,
        };
        let bytes = ctx.engine.run(&file.path, &job, &mut reporter).await?;

        Ok(Output::from_job(&job, bytes))
    }

    /// Saves a finished output into the configured output folder.
    pub async fn download(ctx: &mut Context<'_>, output: &Output) -> Option<PathBuf> {
        let dir = ctx.settings.output_dir();
        match output.save(&dir).await {
            Ok(path) => Some(path),
            Err(err) => {
                error!("Saving {} to {} failed: {}", output.file_name, dir.display(), err);
                None
            }
        }
    }

    fn set_loading(&mut self, ctx: &mut Context<'_>, is_loading: bool) {
        self.is_loading = is_loading;
        ctx.reporter.loading(is_loading);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::operations::{Flip, Resolution};
    use crate::test_support::{fake_engine, RecordingReporter};

    fn write_input(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn oversized_file_is_refused_and_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let small = write_input(dir.path(), "small.mp4", b"1234");
        let big = write_input(dir.path(), "big.mp4", b"123456789");

        let settings = Settings {
            max_file_size: Some(4),
            ..Settings::default()
        };
        let mut reporter = RecordingReporter::default();
        let mut session = Session::new();

        session.select_file(&settings, &mut reporter, &small).unwrap();
        assert_eq!(session.selected().unwrap().name, "small.mp4");

        let err = session.select_file(&settings, &mut reporter, &big).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { .. }));
        assert!(session.selected().is_none());
        assert_eq!(reporter.notices.len(), 1);
        assert!(reporter.notices[0].starts_with("File is too large (9.00 B)"));
    }

    #[test]
    fn selecting_and_clearing_work_without_an_engine() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "clip.webm", b"webm");

        let settings = Settings {
            ffmpeg_path: Some(PathBuf::from("/definitely/not/here/ffmpeg")),
            ..Settings::default()
        };
        let mut reporter = RecordingReporter::default();
        let mut session = Session::new();

        let selected = session.select_file(&settings, &mut reporter, &input).unwrap();
        assert_eq!(selected.kind, Some(MediaKind::Video));

        session.clear(&mut reporter);
        assert!(session.selected().is_none());
        assert_eq!(reporter.progress.last(), Some(&ProgressState::default()));
    }

    #[tokio::test]
    async fn run_produces_output_and_completes_progress() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "holiday.mov", b"frames");

        let settings = Settings {
            output_dir: Some(dir.path().join("downloads")),
            ..Settings::default()
        };
        let engine = Engine::load(fake_engine()).await.unwrap();
        let mut reporter = RecordingReporter::default();
        let mut ctx = Context::new(&settings, &engine, &mut reporter);
        let mut session = Session::new();

        let selected = session.select_file(ctx.settings, ctx.reporter, &input).unwrap();
        assert_eq!(selected.kind, Some(MediaKind::Video));
        assert_eq!(selected.display_size(), "6.00 B");

        let output = session
            .run(&mut ctx, &Operation::RescaleVideo { resolution: Resolution::P480 })
            .await
            .unwrap();
        assert_eq!(output.file_name, "holiday_entropy.mov");
        assert_eq!(output.mime, "video/mov");
        assert_eq!(output.bytes, b"frames");
        assert_eq!(session.progress().percent, 100);
        assert!(!session.is_loading());

        let saved = Session::download(&mut ctx, &output).await.unwrap();
        assert_eq!(saved, dir.path().join("downloads").join("holiday_entropy.mov"));

        assert_eq!(reporter.loading, [true, false]);
        assert!(reporter.progress.iter().any(|p| p.percent == 50));
    }

    #[tokio::test]
    async fn failures_are_swallowed_and_loading_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "fail.mp4", b"broken");

        let settings = Settings::default();
        let engine = Engine::load(fake_engine()).await.unwrap();
        let mut reporter = RecordingReporter::default();
        let mut ctx = Context::new(&settings, &engine, &mut reporter);
        let mut session = Session::new();

        session.select_file(ctx.settings, ctx.reporter, &input).unwrap();
        let output = session
            .run(&mut ctx, &Operation::FlipVideo { flip: Flip::Horizontal })
            .await;

        assert!(output.is_none());
        assert!(!session.is_loading());
        assert!(session.selected().is_some());
        assert_eq!(reporter.loading, [true, false]);
        assert!(reporter.notices.is_empty());
    }

    #[tokio::test]
    async fn run_without_selection_does_nothing() {
        let settings = Settings::default();
        let engine = Engine::load(fake_engine()).await.unwrap();
        let mut reporter = RecordingReporter::default();
        let mut ctx = Context::new(&settings, &engine, &mut reporter);
        let mut session = Session::new();

        assert!(session.run(&mut ctx, &Operation::VideoToGif).await.is_none());
        assert_eq!(reporter.loading, [true, false]);
    }

    #[tokio::test]
    async fn new_selection_resets_progress() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_input(dir.path(), "one.wav", b"RIFF");
        let second = write_input(dir.path(), "two.wav", b"RIFF");

        let settings = Settings::default();
        let engine = Engine::load(fake_engine()).await.unwrap();
        let mut reporter = RecordingReporter::default();
        let mut ctx = Context::new(&settings, &engine, &mut reporter);
        let mut session = Session::new();

        session.select_file(ctx.settings, ctx.reporter, &first).unwrap();
        session.run(&mut ctx, &Operation::AudioToWaveform).await.unwrap();
        assert_eq!(session.progress().percent, 100);

        session.select_file(ctx.settings, ctx.reporter, &second).unwrap();
        assert_eq!(session.progress(), &ProgressState::default());
    }
}
