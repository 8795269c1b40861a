// Provider collaborator: search and stream resolution through yt-dlp.
// The provider is an external subprocess, not an HTTP client — one JSON
// record per stdout line for searches, a bare URL line for resolution.

use crate::config::ProviderConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};
use tracing::{info, warn};

/// One ranked search result. Only the fields the shell shows and the
/// playlist persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    /// Seconds, when the provider knows it.
    #[serde(default)]
    pub duration: Option<f64>,
    pub webpage_url: String,
}

impl TrackRecord {
    pub fn display_duration(&self) -> String {
        match self.duration {
            Some(secs) if secs >= 0.0 => {
                let total = secs.round() as u64;
                let minutes = total / 60;
                let seconds = total % 60;
                format!("{}:{:02}", minutes, seconds)
            }
            _ => "?".to_string(),
        }
    }

    /// "Title - Uploader [3:45]" line for pick lists.
    pub fn summary(&self) -> String {
        format!(
            "{} - {} [{}]",
            self.title,
            self.uploader.as_deref().unwrap_or("?"),
            self.display_duration()
        )
    }
}

pub struct Searcher {
    binary: String,
}

impl Searcher {
    pub fn new(provider: &ProviderConfig) -> Self {
        Self {
            binary: provider.binary.clone(),
        }
    }

    /// Ranked results for a query. A fresh call re-queries the provider;
    /// the sequence is finite and not restartable.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackRecord>> {
        let target = format!("ytsearch{}:{}", limit, query);
        let output = Command::new(&self.binary)
            .arg("--dump-json")
            .arg("--no-download")
            .arg(&target)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run '{}' - is it installed?", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "provider search failed ({}): {}",
                output.status,
                stderr.lines().last().unwrap_or("no output")
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let results = parse_search_output(&stdout);
        info!(query, count = results.len(), "provider search finished");
        Ok(results)
    }

    /// Page URL -> directly playable stream URL. None on any failure; the
    /// caller treats that as "nothing to play", not an error.
    pub fn resolve_stream_url(&self, page_url: &str) -> Option<String> {
        let output = Command::new(&self.binary)
            .arg("-g")
            .arg("-f")
            .arg("bestaudio")
            .arg("--no-playlist")
            .arg(page_url)
            .stdin(Stdio::null())
            .output()
            .ok()?;

        if !output.status.success() {
            warn!(page_url, "stream resolution failed");
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
    }
}

/// One JSON record per line; malformed lines are skipped, not fatal.
fn parse_search_output(stdout: &str) -> Vec<TrackRecord> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<TrackRecord>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("skipping malformed provider record: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_record_per_line_and_skips_garbage() {
        let stdout = concat!(
            r#"{"title":"Song A","uploader":"Artist A","duration":185.0,"webpage_url":"https://example.com/a"}"#,
            "\n",
            "this line is not json\n",
            r#"{"title":"Song B","webpage_url":"https://example.com/b"}"#,
            "\n",
        );

        let records = parse_search_output(stdout);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Song A");
        assert_eq!(records[0].duration, Some(185.0));
        assert_eq!(records[1].uploader, None);
        assert_eq!(records[1].duration, None);
    }

    #[test]
    fn duration_formats_as_minutes_seconds() {
        let mut record = TrackRecord {
            title: "Song".to_string(),
            uploader: Some("Artist".to_string()),
            duration: Some(65.0),
            webpage_url: "https://example.com".to_string(),
        };
        assert_eq!(record.display_duration(), "1:05");

        record.duration = Some(3600.0);
        assert_eq!(record.display_duration(), "60:00");

        record.duration = None;
        assert_eq!(record.display_duration(), "?");
    }

    #[test]
    fn summary_shows_title_uploader_duration() {
        let record = TrackRecord {
            title: "Song".to_string(),
            uploader: None,
            duration: Some(185.0),
            webpage_url: "https://example.com".to_string(),
        };
        assert_eq!(record.summary(), "Song - ? [3:05]");
    }
}
