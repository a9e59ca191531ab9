use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::get_file_size;

pub const APP_DIR: &str = "entropy";
pub const SETTINGS_FILE: &str = "settings.json";

/// 1 GiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Explicit ffmpeg binary. Falls back to a bundled copy, then PATH.
    pub ffmpeg_path: Option<PathBuf>,
    /// Where finished outputs are saved. Falls back to the download folder.
    pub output_dir: Option<PathBuf>,
    /// Input size cap in bytes; `None` accepts any size.
    pub max_file_size: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            output_dir: None,
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
    }

    /// Loads the user's settings, or defaults when none were saved yet.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&json)?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()
            .ok_or_else(|| Error::Settings("No configuration directory on this system".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn ffmpeg_program(&self) -> PathBuf {
        if let Some(path) = &self.ffmpeg_path {
            return path.clone();
        }
        // Bundled next to the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let bundled = exe_path
                .parent()
                .map(|p| p.join("bin").join(format!("ffmpeg{}", std::env::consts::EXE_SUFFIX)));
            if let Some(path) = bundled {
                if path.exists() {
                    return path;
                }
            }
        }
        PathBuf::from("ffmpeg")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn check_file_size(&self, size: u64) -> Result<()> {
        match self.max_file_size {
            Some(limit) if size > limit => Err(Error::FileTooLarge {
                size: get_file_size(size),
                limit: get_file_size(limit),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cap_input_at_one_gib() {
        let settings = Settings::default();
        assert_eq!(settings.max_file_size, Some(DEFAULT_MAX_FILE_SIZE));
        assert!(settings.check_file_size(DEFAULT_MAX_FILE_SIZE).is_ok());

        let err = settings.check_file_size(DEFAULT_MAX_FILE_SIZE + 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "File is too large (1.00 GB). Maximum allowed size is 1.00 GB"
        );
    }

    #[test]
    fn cap_can_be_disabled() {
        let settings = Settings {
            max_file_size: None,
            ..Settings::default()
        };
        assert!(settings.check_file_size(u64::MAX).is_ok());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(APP_DIR).join(SETTINGS_FILE);
        let settings = Settings {
            ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")),
            output_dir: Some(dir.path().to_path_buf()),
            max_file_size: None,
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"outputDir":"/tmp/out"}"#).unwrap();
        assert_eq!(settings.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(settings.max_file_size, Some(DEFAULT_MAX_FILE_SIZE));
    }

    #[test]
    fn explicit_ffmpeg_wins() {
        let settings = Settings {
            ffmpeg_path: Some(PathBuf::from("/usr/local/bin/ffmpeg")),
            ..Settings::default()
        };
        assert_eq!(settings.ffmpeg_program(), PathBuf::from("/usr/local/bin/ffmpeg"));
    }

    #[test]
    fn corrupt_file_is_a_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(Error::Settings(_))));
    }
}
