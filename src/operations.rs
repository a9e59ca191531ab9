use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::utils::{generate_output_name, get_emoji_from_type, get_file_extension};

// ============================================================================
// Media Kinds
// ============================================================================

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "wmv", "avi", "mkv", "webm", "mpg", "mpeg", "flv", "m4v", "3gp", "ts",
];

pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "aac", "ogg", "oga", "opus", "wma", "wav", "flac", "aiff", "aif", "m4a", "alac",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
        }
    }

    pub fn emoji(self) -> &'static str {
        get_emoji_from_type(self.as_str())
    }

    /// Guesses the kind of an input file from its extension.
    pub fn from_file_name(name: &str) -> Option<MediaKind> {
        let ext = get_file_extension(name).to_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Audio)
        } else {
            None
        }
    }

    pub fn input_extensions(self) -> &'static [&'static str] {
        match self {
            MediaKind::Video => VIDEO_EXTENSIONS,
            MediaKind::Audio => AUDIO_EXTENSIONS,
            MediaKind::Image => &[],
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Operation Table
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    ConvertVideo,
    RescaleVideo,
    FlipVideo,
    #[serde(rename = "optimize-video-whatsapp")]
    OptimizeWhatsapp,
    ConvertAudio,
    VideoToGif,
    AudioToWaveform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub label: &'static str,
    pub value: &'static str,
    pub kind: OperationKind,
    pub input_kind: MediaKind,
    pub output_kind: MediaKind,
    pub icon: MediaKind,
}

pub static OPERATIONS: [OperationDescriptor; 7] = [
    OperationDescriptor {
        label: "Convert Video",
        value: "convert-video",
        kind: OperationKind::ConvertVideo,
        input_kind: MediaKind::Video,
        output_kind: MediaKind::Video,
        icon: MediaKind::Video,
    },
    OperationDescriptor {
        label: "Rescale Video",
        value: "rescale-video",
        kind: OperationKind::RescaleVideo,
        input_kind: MediaKind::Video,
        output_kind: MediaKind::Video,
        icon: MediaKind::Video,
    },
    OperationDescriptor {
        label: "Flip Video",
        value: "flip-video",
        kind: OperationKind::FlipVideo,
        input_kind: MediaKind::Video,
        output_kind: MediaKind::Video,
        icon: MediaKind::Video,
    },
    OperationDescriptor {
        label: "Optimize Video for WhatsApp",
        value: "optimize-video-whatsapp",
        kind: OperationKind::OptimizeWhatsapp,
        input_kind: MediaKind::Video,
        output_kind: MediaKind::Video,
        icon: MediaKind::Video,
    },
    OperationDescriptor {
        label: "Convert Audio",
        value: "convert-audio",
        kind: OperationKind::ConvertAudio,
        input_kind: MediaKind::Audio,
        output_kind: MediaKind::Audio,
        icon: MediaKind::Audio,
    },
    OperationDescriptor {
        label: "Convert Video to GIF",
        value: "video-to-gif",
        kind: OperationKind::VideoToGif,
        input_kind: MediaKind::Video,
        output_kind: MediaKind::Image,
        icon: MediaKind::Image,
    },
    OperationDescriptor {
        label: "Draw Waveform from Audio",
        value: "audio-to-waveform",
        kind: OperationKind::AudioToWaveform,
        input_kind: MediaKind::Audio,
        output_kind: MediaKind::Image,
        icon: MediaKind::Image,
    },
];

impl OperationKind {
    pub fn descriptor(self) -> &'static OperationDescriptor {
        OPERATIONS
            .iter()
            .find(|d| d.kind == self)
            .unwrap_or(&OPERATIONS[0])
    }
}

pub fn find_operation(value: &str) -> Option<&'static OperationDescriptor> {
    OPERATIONS.iter().find(|d| d.value == value)
}

// ============================================================================
// Operation Options
// ============================================================================

const WHATSAPP_ARGS: &str = "-vf scale=trunc(iw/2)*2:trunc(ih/2)*2 -c:v libx264 -profile:v baseline -level 3.0 -preset slow -crf 23 -c:a aac -b:a 128k -ac 2";
const GIF_ARGS: &str = "-vf fps=10,scale=-2:360:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse -loop 0";
const WAVEFORM_ARGS: &str = "-filter_complex [0:a]aformat=channel_layouts=mono,showwavespic=s=1920x1080:colors=#ffffff -vframes 1 -c:v png -f image2pipe";
const SKIP_VIDEO_ARG: &str = "-vn";

fn invalid(what: &str, value: &str, choices: &[&str]) -> Error {
    Error::InvalidOption(format!("{} '{}' (expected one of: {})", what, value, choices.join(", ")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    Mp4,
    Mov,
    Wmv,
    Avi,
    Mkv,
    Webm,
    Mpg,
    Mpeg,
}

impl VideoFormat {
    pub const ALL: [VideoFormat; 8] = [
        VideoFormat::Mp4,
        VideoFormat::Mov,
        VideoFormat::Wmv,
        VideoFormat::Avi,
        VideoFormat::Mkv,
        VideoFormat::Webm,
        VideoFormat::Mpg,
        VideoFormat::Mpeg,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Mov => "mov",
            VideoFormat::Wmv => "wmv",
            VideoFormat::Avi => "avi",
            VideoFormat::Mkv => "mkv",
            VideoFormat::Webm => "webm",
            VideoFormat::Mpg => "mpg",
            VideoFormat::Mpeg => "mpeg",
        }
    }
}

impl FromStr for VideoFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        VideoFormat::ALL
            .into_iter()
            .find(|f| f.extension() == wanted)
            .ok_or_else(|| {
                let choices: Vec<&str> = VideoFormat::ALL.iter().map(|f| f.extension()).collect();
                invalid("video format", s, &choices)
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Aac,
    Ogg,
    Wma,
    Wav,
    Flac,
    Aiff,
    Alac,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 8] = [
        AudioFormat::Mp3,
        AudioFormat::Aac,
        AudioFormat::Ogg,
        AudioFormat::Wma,
        AudioFormat::Wav,
        AudioFormat::Flac,
        AudioFormat::Aiff,
        AudioFormat::Alac,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Aac => "aac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Wma => "wma",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Aiff => "aiff",
            AudioFormat::Alac => "alac",
        }
    }

    /// ALAC has no container of its own; ffmpeg picks it from `.m4a`.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Alac => "m4a",
            other => other.name(),
        }
    }

    pub fn codec_args(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "-c:a libmp3lame -b:a 192k -ar 44100",
            AudioFormat::Aac => "-c:a aac -b:a 192k",
            AudioFormat::Ogg => "-c:a libvorbis -q:a 5",
            AudioFormat::Wma => "-c:a wmav2 -b:a 192k",
            AudioFormat::Wav => "-c:a pcm_s16le -ar 44100",
            AudioFormat::Flac => "-c:a flac -compression_level 5",
            // aiff muxer only takes big-endian pcm
            AudioFormat::Aiff => "-c:a pcm_s16be -ar 44100",
            AudioFormat::Alac => "-c:a alac",
        }
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        AudioFormat::ALL
            .into_iter()
            .find(|f| f.name() == wanted)
            .ok_or_else(|| {
                let choices: Vec<&str> = AudioFormat::ALL.iter().map(|f| f.name()).collect();
                invalid("audio format", s, &choices)
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[default]
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "240p")]
    P240,
}

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Resolution::P1080,
        Resolution::P720,
        Resolution::P480,
        Resolution::P360,
        Resolution::P240,
    ];

    pub fn height(self) -> u32 {
        match self {
            Resolution::P1080 => 1080,
            Resolution::P720 => 720,
            Resolution::P480 => 480,
            Resolution::P360 => 360,
            Resolution::P240 => 240,
        }
    }

    pub fn label(self) -> String {
        format!("{}p", self.height())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let height = s.trim_end_matches(['p', 'P']);
        Resolution::ALL
            .into_iter()
            .find(|r| r.height().to_string() == height)
            .ok_or_else(|| invalid("resolution", s, &["1080p", "720p", "480p", "360p", "240p"]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flip {
    #[default]
    Horizontal,
    Vertical,
}

impl Flip {
    pub const ALL: [Flip; 2] = [Flip::Horizontal, Flip::Vertical];

    pub fn name(self) -> &'static str {
        match self {
            Flip::Horizontal => "horizontal",
            Flip::Vertical => "vertical",
        }
    }

    pub fn filter(self) -> &'static str {
        match self {
            Flip::Horizontal => "hflip",
            Flip::Vertical => "vflip",
        }
    }
}

impl FromStr for Flip {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "horizontal" | "hflip" | "h" => Ok(Flip::Horizontal),
            "vertical" | "vflip" | "v" => Ok(Flip::Vertical),
            _ => Err(invalid("flip direction", s, &["horizontal", "vertical"])),
        }
    }
}

// ============================================================================
// Operations
// ============================================================================

/// An operation together with the options its panel collects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Operation {
    ConvertVideo {
        #[serde(default)]
        format: VideoFormat,
    },
    RescaleVideo {
        #[serde(default)]
        resolution: Resolution,
    },
    FlipVideo {
        #[serde(default)]
        flip: Flip,
    },
    #[serde(rename = "optimize-video-whatsapp")]
    OptimizeWhatsapp,
    ConvertAudio {
        #[serde(default)]
        format: AudioFormat,
    },
    VideoToGif,
    AudioToWaveform,
}

/// Everything needed to run one operation on one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub output_name: String,
    pub output_kind: MediaKind,
    pub extension: String,
    /// Operation flags placed between the input and the output.
    pub args: Vec<String>,
}

impl Job {
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.output_kind, self.extension)
    }

    /// Full engine argument list: `-i ./<input> <flags...> ./<output>`.
    /// Both names are relative to the workspace and prefixed with `./` so a
    /// leading `-` is never read as an option.
    pub fn command_line(&self, input_name: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 3);
        args.push("-i".to_string());
        args.push(format!("./{}", input_name));
        args.extend(self.args.iter().cloned());
        args.push(format!("./{}", self.output_name));
        args
    }
}

fn split_args(method: &str) -> Vec<String> {
    method.split_whitespace().map(|s| s.to_string()).collect()
}

/// Output extension for operations that keep the input container.
fn same_extension(input_name: &str) -> String {
    match get_file_extension(input_name) {
        "" => VideoFormat::default().extension().to_string(),
        ext => ext.to_string(),
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::ConvertVideo { .. } => OperationKind::ConvertVideo,
            Operation::RescaleVideo { .. } => OperationKind::RescaleVideo,
            Operation::FlipVideo { .. } => OperationKind::FlipVideo,
            Operation::OptimizeWhatsapp => OperationKind::OptimizeWhatsapp,
            Operation::ConvertAudio { .. } => OperationKind::ConvertAudio,
            Operation::VideoToGif => OperationKind::VideoToGif,
            Operation::AudioToWaveform => OperationKind::AudioToWaveform,
        }
    }

    pub fn descriptor(&self) -> &'static OperationDescriptor {
        self.kind().descriptor()
    }

    /// Operation with the options its panel starts with.
    pub fn with_defaults(kind: OperationKind) -> Operation {
        match kind {
            OperationKind::ConvertVideo => Operation::ConvertVideo { format: VideoFormat::default() },
            OperationKind::RescaleVideo => Operation::RescaleVideo { resolution: Resolution::default() },
            OperationKind::FlipVideo => Operation::FlipVideo { flip: Flip::default() },
            OperationKind::OptimizeWhatsapp => Operation::OptimizeWhatsapp,
            OperationKind::ConvertAudio => Operation::ConvertAudio { format: AudioFormat::default() },
            OperationKind::VideoToGif => Operation::VideoToGif,
            OperationKind::AudioToWaveform => Operation::AudioToWaveform,
        }
    }

    pub fn plan(&self, input_name: &str) -> Job {
        let output_kind = self.descriptor().output_kind;

        let (extension, args) = match self {
            Operation::ConvertVideo { format } => (format.extension().to_string(), Vec::new()),
            Operation::RescaleVideo { resolution } => (
                same_extension(input_name),
                vec!["-vf".to_string(), format!("scale=-2:{}", resolution.height())],
            ),
            Operation::FlipVideo { flip } => (
                same_extension(input_name),
                vec!["-vf".to_string(), flip.filter().to_string()],
            ),
            Operation::OptimizeWhatsapp => ("mp4".to_string(), split_args(WHATSAPP_ARGS)),
            Operation::ConvertAudio { format } => {
                let mut args = Vec::new();
                if MediaKind::from_file_name(input_name) == Some(MediaKind::Video) {
                    args.push(SKIP_VIDEO_ARG.to_string());
                }
                args.extend(split_args(format.codec_args()));
                (format.extension().to_string(), args)
            }
            Operation::VideoToGif => ("gif".to_string(), split_args(GIF_ARGS)),
            Operation::AudioToWaveform => ("png".to_string(), split_args(WAVEFORM_ARGS)),
        };

        Job {
            output_name: generate_output_name(input_name, &extension),
            output_kind,
            extension,
            args,
        }
    }
}
