// Local playlist storage - one JSON file per playlist under the data dir.

use crate::search::TrackRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// A named, ordered list of track records plus a resume index for
/// play-all passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub items: Vec<TrackRecord>,
    #[serde(default)]
    pub index: usize,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            index: 0,
        }
    }

    /// Append a track unless the same page URL is already present.
    pub fn add(&mut self, track: TrackRecord) {
        if self.items.iter().any(|t| t.webpage_url == track.webpage_url) {
            info!("'{}' already in playlist '{}'", track.title, self.name);
            return;
        }
        info!("added '{}' to playlist '{}'", track.title, self.name);
        self.items.push(track);
    }

    pub fn remove(&mut self, index: usize) -> bool {
        if index < self.items.len() {
            let removed = self.items.remove(index);
            if self.index > index {
                self.index -= 1;
            }
            info!("removed '{}' from playlist '{}'", removed.title, self.name);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Loads and saves playlists as JSON files named after the playlist.
pub struct PlaylistStore {
    dir: PathBuf,
}

impl PlaylistStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create playlist dir {}", dir.display()))?;
            info!("created playlist directory {}", dir.display());
        }
        Ok(Self { dir })
    }

    pub fn list_playlists(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .filter_map(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .collect();
        names.sort();
        names
    }

    /// Missing playlists come back empty; a corrupt file is replaced on
    /// the next save rather than blocking the flow.
    pub fn load(&self, name: &str) -> Playlist {
        let path = self.path_for(name);
        if !path.exists() {
            return Playlist::new(name);
        }
        match fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str::<Playlist>(&content).map_err(Into::into))
        {
            Ok(playlist) => playlist,
            Err(e) => {
                warn!("failed to load playlist '{}': {}", name, e);
                Playlist::new(name)
            }
        }
    }

    pub fn save(&self, playlist: &Playlist) -> Result<()> {
        let path = self.path_for(&playlist.name);
        let json = serde_json::to_string_pretty(playlist)
            .context("failed to serialize playlist")?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write playlist file {}", path.display()))?;
        info!("saved playlist '{}' to {}", playlist.name, path.display());
        Ok(())
    }

    fn path_for(&self, name: &str) -> PathBuf {
        let stem: String = name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                other => other,
            })
            .collect();
        self.dir.join(format!("{}.json", stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str, url: &str) -> TrackRecord {
        TrackRecord {
            title: title.to_string(),
            uploader: Some("Artist".to_string()),
            duration: Some(180.0),
            webpage_url: url.to_string(),
        }
    }

    #[test]
    fn add_dedupes_by_page_url() {
        let mut pl = Playlist::new("mix");
        pl.add(track("Song A", "https://example.com/a"));
        pl.add(track("Song A (repost)", "https://example.com/a"));
        assert_eq!(pl.len(), 1);
    }

    #[test]
    fn remove_adjusts_resume_index() {
        let mut pl = Playlist::new("mix");
        pl.add(track("A", "https://example.com/a"));
        pl.add(track("B", "https://example.com/b"));
        pl.add(track("C", "https://example.com/c"));
        pl.index = 2;

        assert!(pl.remove(0));
        assert_eq!(pl.index, 1);
        assert!(!pl.remove(10));
    }

    #[test]
    fn store_roundtrips_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlaylistStore::new(dir.path().to_path_buf()).unwrap();

        let mut pl = store.load("evening");
        assert!(pl.is_empty());
        pl.add(track("Song A", "https://example.com/a"));
        store.save(&pl).unwrap();

        let reloaded = store.load("evening");
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.items[0].title, "Song A");
        assert_eq!(store.list_playlists(), vec!["evening".to_string()]);
    }

    #[test]
    fn missing_playlist_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PlaylistStore::new(dir.path().to_path_buf()).unwrap();
        assert!(store.load("nope").is_empty());
    }
}
