// User settings: cache dir, theme choice, support blurb, and keybinds.
// Kept separate from AppConfig so rebinding a key never touches player config.

use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The nine logical player actions a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    PauseToggle,
    VolUp,
    VolDown,
    SeekForward,
    SeekBackward,
    NextTrack,
    PrevTrack,
    Stop,
    QuitPlayer,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::PauseToggle,
        Action::VolUp,
        Action::VolDown,
        Action::SeekForward,
        Action::SeekBackward,
        Action::NextTrack,
        Action::PrevTrack,
        Action::Stop,
        Action::QuitPlayer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::PauseToggle => "pause_toggle",
            Action::VolUp => "vol_up",
            Action::VolDown => "vol_down",
            Action::SeekForward => "seek_forward",
            Action::SeekBackward => "seek_backward",
            Action::NextTrack => "next_track",
            Action::PrevTrack => "prev_track",
            Action::Stop => "stop",
            Action::QuitPlayer => "quit_player",
        }
    }

    pub fn from_name(name: &str) -> Option<Action> {
        Action::ALL.iter().copied().find(|a| a.name() == name)
    }
}

/// One bound character per action. Rebinding overwrites, never appends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    pub pause_toggle: char,
    pub vol_up: char,
    pub vol_down: char,
    pub seek_forward: char,
    pub seek_backward: char,
    pub next_track: char,
    pub prev_track: char,
    pub stop: char,
    pub quit_player: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            pause_toggle: ' ',
            vol_up: '0',
            vol_down: '9',
            seek_forward: '.',
            seek_backward: ',',
            next_track: 'n',
            prev_track: 'b',
            stop: 's',
            quit_player: 'q',
        }
    }
}

impl KeyBindings {
    pub fn key_for(&self, action: Action) -> char {
        match action {
            Action::PauseToggle => self.pause_toggle,
            Action::VolUp => self.vol_up,
            Action::VolDown => self.vol_down,
            Action::SeekForward => self.seek_forward,
            Action::SeekBackward => self.seek_backward,
            Action::NextTrack => self.next_track,
            Action::PrevTrack => self.prev_track,
            Action::Stop => self.stop,
            Action::QuitPlayer => self.quit_player,
        }
    }

    pub fn bind(&mut self, action: Action, key: char) {
        match action {
            Action::PauseToggle => self.pause_toggle = key,
            Action::VolUp => self.vol_up = key,
            Action::VolDown => self.vol_down = key,
            Action::SeekForward => self.seek_forward = key,
            Action::SeekBackward => self.seek_backward = key,
            Action::NextTrack => self.next_track = key,
            Action::PrevTrack => self.prev_track = key,
            Action::Stop => self.stop = key,
            Action::QuitPlayer => self.quit_player = key,
        }
    }

    /// Reverse lookup used by the playback loop: pressed char -> action.
    /// First action in declaration order wins if a key is bound twice.
    pub fn action_for(&self, key: char) -> Option<Action> {
        Action::ALL.iter().copied().find(|a| self.key_for(*a) == key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub theme: String,
    pub support_text: String,
    pub keybinds: KeyBindings,
}

impl Default for Settings {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cadenza");

        Self {
            cache_dir,
            theme: "default".to_string(),
            support_text: "Questions or ideas? Open an issue on the project page.".to_string(),
            keybinds: KeyBindings::default(),
        }
    }
}

/// Loads/saves Settings as TOML in the platform config dir.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Result<Self> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("cadenza");

        Ok(Self {
            path: config_dir.join("settings.toml"),
        })
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Settings> {
        if self.path.exists() {
            let content = fs::read_to_string(&self.path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            let settings = Settings::default();
            self.save(&settings)?;
            Ok(settings)
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(settings)?;
        fs::write(&self.path, content)?;
        info!("Saved settings to {}", self.path.display());

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_has_exactly_one_default_key() {
        let kb = KeyBindings::default();
        for action in Action::ALL {
            // key_for never panics and yields a concrete char
            let _ = kb.key_for(action);
        }
        assert_eq!(kb.action_for(' '), Some(Action::PauseToggle));
        assert_eq!(kb.action_for('q'), Some(Action::QuitPlayer));
        assert_eq!(kb.action_for('z'), None);
    }

    #[test]
    fn rebinding_overwrites_never_appends() {
        let mut kb = KeyBindings::default();
        kb.bind(Action::VolUp, '+');
        assert_eq!(kb.key_for(Action::VolUp), '+');
        assert_eq!(kb.action_for('0'), None);
        assert_eq!(kb.action_for('+'), Some(Action::VolUp));
    }

    #[test]
    fn action_names_roundtrip() {
        for action in Action::ALL {
            assert_eq!(Action::from_name(action.name()), Some(action));
        }
        assert_eq!(Action::from_name("warp_ten"), None);
    }

    #[test]
    fn settings_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::at(dir.path().join("settings.toml"));

        let mut settings = store.load().unwrap();
        settings.theme = "emerald".to_string();
        settings.keybinds.bind(Action::SeekForward, 'f');
        store.save(&settings).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.theme, "emerald");
        assert_eq!(reloaded.keybinds.seek_forward, 'f');
    }
}
