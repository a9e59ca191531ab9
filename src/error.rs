use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} cannot be negative")]
    Negative(&'static str),

    #[error("{0} must be a number")]
    NotANumber(&'static str),

    #[error("File is too large ({size}). Maximum allowed size is {limit}")]
    FileTooLarge { size: String, limit: String },

    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("No file selected")]
    NoFileSelected,

    #[error("Failed to load ffmpeg from {program}: {message}")]
    EngineNotFound { program: String, message: String },

    #[error("FFmpeg exited with code {code:?}: {last_line}")]
    EngineFailed { code: Option<i32>, last_line: String },

    #[error("FFmpeg produced no output file {0}")]
    MissingOutput(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Settings(err.to_string())
    }
}
