// Cadenza Library - core modules for the terminal music app
// Search, stream resolution, and downloads go through yt-dlp; playback
// goes through an mpv process owned and controlled by the player module

pub mod config;    // app-level config (player binary, IPC, cadence)
pub mod download;  // page URL -> local MP3 at a chosen bitrate
pub mod player;    // the external-player control subsystem
pub mod playlist;  // local playlist storage
pub mod search;    // provider search + stream resolution
pub mod settings;  // user settings: keybinds, theme, cache dir
pub mod ui;        // line-oriented menu shell + playback loop

// Export the stuff other modules actually use
pub use config::AppConfig;
pub use player::{PlaybackSession, PlayerError};
pub use search::{Searcher, TrackRecord};
pub use settings::{KeyBindings, Settings, SettingsStore};
