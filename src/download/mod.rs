// Downloader collaborator: converts a provider page URL into a local MP3
// at a requested bitrate, plus the size estimation helpers the quality
// menu shows before committing to a download.

use crate::config::ProviderConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::info;

pub struct Downloader {
    binary: String,
}

impl Downloader {
    pub fn new(provider: &ProviderConfig) -> Self {
        Self {
            binary: provider.binary.clone(),
        }
    }

    /// Extract audio to `out_path` as MP3 at the given bitrate. Returns the
    /// tool's exit code; 0 means success.
    pub fn encode_to_file(&self, page_url: &str, out_path: &Path, bitrate_kbps: u32) -> Result<i32> {
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let status = Command::new(&self.binary)
            .arg("-x")
            .arg("--audio-format")
            .arg("mp3")
            .arg("--audio-quality")
            .arg(format!("{}K", bitrate_kbps))
            .arg("--no-playlist")
            .arg("-o")
            .arg(out_path)
            .arg(page_url)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("failed to run '{}' - is it installed?", self.binary))?;

        let code = status.code().unwrap_or(-1);
        info!(page_url, bitrate_kbps, code, "download finished");
        Ok(code)
    }
}

/// Rough MP3 size from duration and bitrate: kbps * 1000 / 8 bytes per
/// second. None when the duration is unknown.
pub fn estimate_mp3_size_bytes(duration_secs: Option<f64>, bitrate_kbps: u32) -> Option<u64> {
    let secs = duration_secs?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * (bitrate_kbps as f64) * 1000.0 / 8.0) as u64)
}

pub fn human_size(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes else {
        return "?".to_string();
    };
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// A title is not a filename: strip path separators before joining.
pub fn safe_file_stem(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "audio".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_estimate_from_duration_and_bitrate() {
        // 3 minutes at 128 kbps
        assert_eq!(estimate_mp3_size_bytes(Some(180.0), 128), Some(2_880_000));
        assert_eq!(estimate_mp3_size_bytes(None, 128), None);
        assert_eq!(estimate_mp3_size_bytes(Some(f64::NAN), 128), None);
    }

    #[test]
    fn sizes_render_human_readable() {
        assert_eq!(human_size(None), "?");
        assert_eq!(human_size(Some(512)), "512 B");
        assert_eq!(human_size(Some(2_880_000)), "2.7 MB");
        assert_eq!(human_size(Some(3 * 1024 * 1024 * 1024)), "3.0 GB");
    }

    #[test]
    fn titles_become_safe_file_stems() {
        assert_eq!(safe_file_stem("AC/DC: Back\\In Black"), "AC_DC_ Back_In Black");
        assert_eq!(safe_file_stem("   "), "audio");
    }
}
