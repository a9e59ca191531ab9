use std::path::{Path, PathBuf};

use base64::Engine as _;
use log::info;

use crate::error::Result;
use crate::operations::{Job, MediaKind};
use crate::utils::{get_file_size, trim_filename, get_file_extension};

/// A finished result, ready to be saved or previewed.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub file_name: String,
    pub kind: MediaKind,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Output {
    pub fn from_job(job: &Job, bytes: Vec<u8>) -> Self {
        Self {
            file_name: job.output_name.clone(),
            kind: job.output_kind,
            mime: job.mime_type(),
            bytes,
        }
    }

    pub fn size(&self) -> String {
        get_file_size(self.bytes.len() as u64)
    }

    /// Inline `data:` URL, used to preview GIF and waveform results.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Writes the result into `dir` without replacing existing files: a
    /// taken name gets a ` (1)`, ` (2)`, ... suffix.
    pub async fn save(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = unique_path(dir, &self.file_name);
        tokio::fs::write(&path, &self.bytes).await?;
        info!("Saved {} ({}) to {}", self.file_name, self.size(), path.display());
        Ok(path)
    }
}

fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = trim_filename(file_name);
    let ext = get_file_extension(file_name);
    (1u32..)
        .map(|n| {
            if ext.is_empty() {
                dir.join(format!("{} ({})", stem, n))
            } else {
                dir.join(format!("{} ({}).{}", stem, n, ext))
            }
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Operation;

    fn gif_output() -> Output {
        let job = Operation::VideoToGif.plan("clip.mp4");
        Output::from_job(&job, b"GIF89a".to_vec())
    }

    #[test]
    fn carries_job_metadata() {
        let output = gif_output();
        assert_eq!(output.file_name, "clip_entropy.gif");
        assert_eq!(output.kind, MediaKind::Image);
        assert_eq!(output.mime, "image/gif");
        assert_eq!(output.size(), "6.00 B");
    }

    #[test]
    fn data_url_is_base64() {
        assert_eq!(gif_output().data_url(), "data:image/gif;base64,R0lGODlh");
    }

    #[tokio::test]
    async fn save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let output = gif_output();

        let first = output.save(dir.path()).await.unwrap();
        let second = output.save(dir.path()).await.unwrap();
        let third = output.save(dir.path()).await.unwrap();

        assert_eq!(first.file_name().unwrap(), "clip_entropy.gif");
        assert_eq!(second.file_name().unwrap(), "clip_entropy (1).gif");
        assert_eq!(third.file_name().unwrap(), "clip_entropy (2).gif");
        assert_eq!(std::fs::read(&third).unwrap(), b"GIF89a");
    }
}
