use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use entropy_lib::utils::{
    capitalize_first_letter, get_emoji_from_type, get_file_size, truncate_file_name,
    DEFAULT_TRUNCATE_LENGTH,
};
use entropy_lib::{
    AudioFormat, Context, Engine, Flip, MediaKind, Operation, ProgressState, Reporter, Resolution,
    Session, Settings, VideoFormat, OPERATIONS,
};

/// Convert, rescale and export audio/video files with ffmpeg.
/// Results are saved as `<name>_entropy.<ext>` in the output folder.
#[derive(Parser, Debug)]
#[command(name = "entropy", version, about)]
struct Cli {
    /// ffmpeg binary (default: settings, then bin/ffmpeg next to entropy, then PATH)
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// Folder results are saved to (default: settings, then your Downloads folder)
    #[arg(short = 'o', long, global = true)]
    output_dir: Option<PathBuf>,

    /// Largest accepted input in MiB; 0 accepts anything
    #[arg(long, global = true)]
    max_size_mib: Option<u64>,

    /// Show ffmpeg's own log lines
    #[arg(short, long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available operations
    Operations,
    /// Show a file the way the picker presents it
    Info { file: PathBuf },
    /// Print the effective settings
    Config {
        /// Persist --ffmpeg, --output-dir and --max-size-mib
        #[arg(long, action = ArgAction::SetTrue)]
        save: bool,
    },
    /// Convert a video to another container
    ConvertVideo {
        input: PathBuf,
        #[arg(short, long, default_value = "mp4")]
        format: VideoFormat,
    },
    /// Scale a video down to a fixed height
    RescaleVideo {
        input: PathBuf,
        #[arg(short, long, default_value = "360p")]
        resolution: Resolution,
    },
    /// Mirror a video horizontally or vertically
    FlipVideo {
        input: PathBuf,
        #[arg(short, long, default_value = "horizontal")]
        direction: Flip,
    },
    /// Re-encode a video so WhatsApp accepts it
    #[command(name = "optimize-video-whatsapp")]
    OptimizeWhatsapp { input: PathBuf },
    /// Convert audio (or the audio track of a video) to another format
    ConvertAudio {
        input: PathBuf,
        #[arg(short, long, default_value = "mp3")]
        format: AudioFormat,
    },
    /// Export a video as an animated GIF
    VideoToGif { input: PathBuf },
    /// Draw the waveform of an audio file as a PNG
    AudioToWaveform { input: PathBuf },
}

impl Command {
    fn into_operation(self) -> Option<(PathBuf, Operation)> {
        let pair = match self {
            Command::ConvertVideo { input, format } => (input, Operation::ConvertVideo { format }),
            Command::RescaleVideo { input, resolution } => {
                (input, Operation::RescaleVideo { resolution })
            }
            Command::FlipVideo { input, direction } => {
                (input, Operation::FlipVideo { flip: direction })
            }
            Command::OptimizeWhatsapp { input } => (input, Operation::OptimizeWhatsapp),
            Command::ConvertAudio { input, format } => (input, Operation::ConvertAudio { format }),
            Command::VideoToGif { input } => (input, Operation::VideoToGif),
            Command::AudioToWaveform { input } => (input, Operation::AudioToWaveform),
            Command::Operations | Command::Info { .. } | Command::Config { .. } => return None,
        };
        Some(pair)
    }
}

// ============================================================================
// Progress UI
// ============================================================================

struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] [{bar:50.cyan/bright-black}] {pos:>3}%  {wide_msg}")
                .context("Invalid progress template")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }
}

impl Reporter for BarReporter {
    fn loading(&mut self, is_loading: bool) {
        if is_loading {
            self.bar.reset();
            self.bar.set_message("🚀 Preparing…");
        } else {
            self.bar.finish_and_clear();
        }
    }

    fn progress(&mut self, state: &ProgressState) {
        self.bar.set_position(u64::from(state.percent));
        match &state.time_remaining {
            Some(eta) => self.bar.set_message(format!("{} remaining", eta)),
            None => self.bar.set_message(""),
        }
    }

    fn notice(&mut self, message: &str) {
        self.bar.println(format!("⚠️  {}", message));
    }
}

// ============================================================================
// Commands
// ============================================================================

fn print_operations() {
    for op in OPERATIONS.iter() {
        println!(
            "{} {:<26} {} ({} → {})",
            op.icon.emoji(),
            op.value,
            op.label,
            op.input_kind,
            op.output_kind
        );
    }
}

fn print_info(file: &Path) -> Result<()> {
    let metadata = std::fs::metadata(file).with_context(|| format!("Cannot read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let kind = MediaKind::from_file_name(&name);
    let kind_name = kind.map(MediaKind::as_str).unwrap_or("unknown");

    println!("{} {}", get_emoji_from_type(kind_name), truncate_file_name(&name, DEFAULT_TRUNCATE_LENGTH));
    println!("   {} · {}", capitalize_first_letter(kind_name), get_file_size(metadata.len()));

    let usable: Vec<&str> = OPERATIONS
        .iter()
        .filter(|op| Some(op.input_kind) == kind)
        .map(|op| op.value)
        .collect();
    if !usable.is_empty() {
        println!("   Operations: {}", usable.join(", "));
    }
    Ok(())
}

fn print_config(settings: &Settings, save: bool) -> Result<()> {
    if save {
        let path = settings.save().context("Failed to save settings")?;
        println!("Saved settings to {}", path.display());
    } else if let Some(path) = Settings::config_path() {
        println!("# {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    println!("# ffmpeg: {}", settings.ffmpeg_program().display());
    println!("# output folder: {}", settings.output_dir().display());
    Ok(())
}

async fn convert(settings: &Settings, input: &Path, operation: Operation) -> Result<()> {
    let label = operation.descriptor().label;
    info!("{} {}", label, input.display());

    let mut reporter = BarReporter::new()?;
    let mut session = Session::new();
    session.select_file(settings, &mut reporter, input)?;

    let engine = Engine::from_settings(settings).await?;
    info!("Using {} from {}", engine.version(), engine.program().display());
    let mut ctx = Context::new(settings, &engine, &mut reporter);

    let Some(output) = session.run(&mut ctx, &operation).await else {
        bail!("{} failed, see the log above", label);
    };
    let Some(path) = Session::download(&mut ctx, &output).await else {
        bail!("Could not save {}", output.file_name);
    };

    println!("✅ Saved {} ({})", path.display(), output.size());
    Ok(())
}

/// `0` disables the cap; huge values saturate instead of wrapping.
fn size_cap_from_mib(mib: u64) -> Option<u64> {
    (mib > 0).then(|| mib.saturating_mul(1024 * 1024))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut settings = Settings::load().context("Failed to load settings")?;
    if let Some(ffmpeg) = cli.ffmpeg {
        settings.ffmpeg_path = Some(ffmpeg);
    }
    if let Some(dir) = cli.output_dir {
        settings.output_dir = Some(dir);
    }
    if let Some(mib) = cli.max_size_mib {
        settings.max_file_size = size_cap_from_mib(mib);
    }

    match cli.command {
        Command::Operations => {
            print_operations();
            Ok(())
        }
        Command::Info { file } => print_info(&file),
        Command::Config { save } => print_config(&settings, save),
        command => {
            let Some((input, operation)) = command.into_operation() else {
                bail!("Unknown command");
            };
            convert(&settings, &input, operation).await
        }
    }
}
