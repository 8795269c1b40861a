// The menu-driven shell: main menu, the seven flows, and the playback
// control loop that drives one session at a fixed cadence.

use super::{keys::KeyReader, progress, theme};
use crate::config::AppConfig;
use crate::download::{self, Downloader};
use crate::player::{KeyOutcome, PlaybackSession};
use crate::playlist::PlaylistStore;
use crate::search::{Searcher, TrackRecord};
use crate::settings::{Action, Settings, SettingsStore};
use crate::ui;
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

const LOGO: &str = r#"
  ____          _
 / ___|__ _  __| | ___ _ __  ______ _
| |   / _` |/ _` |/ _ \ '_ \|_  / _` |
| |__| (_| | (_| |  __/ | | |/ / (_| |
 \____\__,_|\__,_|\___|_| |_/___\__,_|
"#;

const TITLE: &str = "Cadenza";
const SUBTITLE: &str = "minimal - no ads - fast";
const FOOTER: &str = "developed by strength";

const DOWNLOAD_BITRATES: [u32; 3] = [128, 192, 320];

/// How a playback loop ended, so playlist passes know where to go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaybackEnd {
    /// Track finished (or process went away) on its own.
    Finished,
    /// User quit playback, back to the menu.
    Quit,
    /// User asked for the next track.
    Next,
    /// User asked for the previous track.
    Prev,
    /// User ended the whole playlist pass.
    StopAll,
}

pub struct App {
    config: AppConfig,
    settings_store: SettingsStore,
    settings: Settings,
    searcher: Searcher,
    downloader: Downloader,
    playlists: PlaylistStore,
}

impl App {
    pub fn new(config: AppConfig, settings_store: SettingsStore, settings: Settings) -> Result<Self> {
        let searcher = Searcher::new(&config.provider);
        let downloader = Downloader::new(&config.provider);
        let playlist_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cadenza")
            .join("playlists");
        let playlists = PlaylistStore::new(playlist_dir)?;

        Ok(Self {
            config,
            settings_store,
            settings,
            searcher,
            downloader,
            playlists,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.render_header();
            let items: Vec<String> = [
                "Play a song",
                "Search a song (info, play or download)",
                "Settings",
                "Support / Account",
                "Playlist",
                "Search singer",
                "Themes",
                "Exit",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect();

            let Some(idx) = ui::select_from_list(&items, "Main Menu:") else {
                continue;
            };
            ui::clear_screen();
            match idx {
                0 => self.play_now_flow(None).await?,
                1 => self.search_info_flow().await?,
                2 => self.settings_flow()?,
                3 => self.support_flow(),
                4 => self.playlist_flow().await?,
                5 => self.singer_info_flow(),
                6 => self.themes_flow()?,
                7 => break,
                _ => continue,
            }
        }
        println!("Goodbye.");
        Ok(())
    }

    /// One-shot entry for `--play <query>` on the command line.
    pub async fn play_query(&mut self, query: &str) -> Result<()> {
        self.play_now_flow(Some(query.to_string())).await
    }

    fn render_header(&self) {
        ui::set_console_title(TITLE);
        ui::clear_screen();
        let (width, height) = ui::terminal_size();
        print!("{}", "\n".repeat((height as usize) / 8));

        // two-tone logo: first half primary, second half accent
        let t = theme::current();
        let lines: Vec<&str> = LOGO.trim_matches('\n').lines().collect();
        let max_w = lines.iter().map(|l| l.len()).max().unwrap_or(0);
        let pad = (width as usize).saturating_sub(max_w) / 2;
        for line in &lines {
            let padded = format!("{:<1$}", line, max_w);
            let half = max_w / 2;
            let (first, second) = padded.split_at(half.min(padded.len()));
            println!(
                "{}{}{}",
                " ".repeat(pad),
                theme::paint(first, t.primary),
                theme::paint(second, t.accent)
            );
        }
        println!();
        ui::render_center_block(&[theme::paint(SUBTITLE, t.accent)]);
        ui::render_center_block(&[FOOTER.to_string()]);
        println!("\n");
    }

    fn new_session(&self) -> PlaybackSession {
        PlaybackSession::new(
            self.config.player.clone(),
            self.config.ipc_dir(),
            Arc::new(self.settings.keybinds.clone()),
        )
    }

    /// Resolve and play one track. None means it never started (resolution
    /// or launch failed); playlist passes skip such tracks.
    async fn play_track(&self, track: &TrackRecord) -> Result<Option<PlaybackEnd>> {
        println!("\nResolving stream URL...");
        let Some(stream_url) = self.searcher.resolve_stream_url(&track.webpage_url) else {
            println!("Failed to resolve stream.");
            return Ok(None);
        };

        let session = self.new_session();
        if let Err(e) = session.start(&stream_url) {
            warn!("playback start failed: {}", e);
            println!("{}", theme::paint(&format!("Could not start player: {}", e), theme::current().accent));
            return Ok(None);
        }

        let end = self.run_playback(&session).await?;
        Ok(Some(end))
    }

    /// The control loop: non-blocking key pass, liveness pass, and a
    /// progress redraw at the configured cadence (no more than ~5/s),
    /// with a short sleep to bound CPU.
    async fn run_playback(&self, session: &PlaybackSession) -> Result<PlaybackEnd> {
        let kb = &self.settings.keybinds;
        let key_label = |c: char| if c == ' ' { "space".to_string() } else { c.to_string() };
        let controls = format!(
            "Controls: [{}]=Pause  [{}]=Vol-  [{}]=Vol+  [{}]=Seek-  [{}]=Seek+  [{}]=Next  [{}]=Prev  [{}]=Stop  [{}]=Quit",
            key_label(kb.pause_toggle),
            key_label(kb.vol_down),
            key_label(kb.vol_up),
            key_label(kb.seek_backward),
            key_label(kb.seek_forward),
            key_label(kb.next_track),
            key_label(kb.prev_track),
            key_label(kb.stop),
            key_label(kb.quit_player),
        );
        println!("\n{}", theme::paint(&controls, theme::current().accent));

        let reader = KeyReader::new()?;
        let cadence = Duration::from_millis(self.config.player.poll_interval_ms.max(200));
        let mut last_draw = Instant::now() - cadence;
        let mut end = PlaybackEnd::Finished;

        while session.is_running() {
            if let Some(key) = reader.read_key_nonblocking() {
                match session.send_key(key) {
                    Some(KeyOutcome::QuitRequested) => {
                        end = PlaybackEnd::Quit;
                        break;
                    }
                    Some(KeyOutcome::StopRequested) => {
                        end = PlaybackEnd::StopAll;
                        break;
                    }
                    Some(KeyOutcome::NextRequested) => {
                        end = PlaybackEnd::Next;
                        break;
                    }
                    Some(KeyOutcome::PrevRequested) => {
                        end = PlaybackEnd::Prev;
                        break;
                    }
                    Some(KeyOutcome::Forwarded(_)) | None => {}
                }
            }

            if last_draw.elapsed() >= cadence {
                let (position, duration) = session.poll_progress();
                let (cols, _) = ui::terminal_size();
                let width = (cols as usize).saturating_sub(20).clamp(20, 60);
                let bar = progress::progress_bar(position, duration, width);
                print!("\r{}", theme::paint(&bar, theme::current().primary));
                let _ = std::io::stdout().flush();
                last_draw = Instant::now();
            }

            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        session.stop();
        drop(reader);
        print!("\r{}\r", " ".repeat(100));
        let _ = std::io::stdout().flush();
        Ok(end)
    }

    async fn play_now_flow(&mut self, initial_query: Option<String>) -> Result<()> {
        let query = match initial_query {
            Some(q) => q,
            None => ui::prompt("Search query: "),
        };
        if query.is_empty() {
            return Ok(());
        }

        let Some(track) = self.pick_track(&query)? else {
            return Ok(());
        };
        self.play_track(&track).await?;
        ui::wait_keypress("Playback ended. Press any key to continue...");
        Ok(())
    }

    /// Search + selection step shared by the play, info, and playlist flows.
    fn pick_track(&self, query: &str) -> Result<Option<TrackRecord>> {
        let results = match self.searcher.search(query, self.config.provider.search_limit) {
            Ok(results) => results,
            Err(e) => {
                println!("Search failed: {}", e);
                ui::wait_keypress("Press any key to continue...");
                return Ok(None);
            }
        };
        if results.is_empty() {
            println!("No results.");
            ui::wait_keypress("Press any key to continue...");
            return Ok(None);
        }

        let labels: Vec<String> = results.iter().map(TrackRecord::summary).collect();
        Ok(ui::select_from_list(&labels, "Select track:").map(|i| results[i].clone()))
    }

    async fn search_info_flow(&mut self) -> Result<()> {
        let query = ui::prompt("Search query: ");
        if query.is_empty() {
            return Ok(());
        }
        let Some(track) = self.pick_track(&query)? else {
            return Ok(());
        };

        println!("\nInfo:");
        println!("Title: {}", track.title);
        println!("Uploader: {}", track.uploader.as_deref().unwrap_or("?"));
        println!("Duration: {}", track.display_duration());
        println!("URL: {}", track.webpage_url);

        println!("\nOptions:");
        println!("1) Play");
        println!("2) Download MP3");
        match ui::prompt("Select: ").as_str() {
            "1" => {
                self.play_track(&track).await?;
                ui::wait_keypress("Playback ended. Press any key to continue...");
            }
            "2" => self.download_flow(&track)?,
            _ => {}
        }
        Ok(())
    }

    fn download_flow(&self, track: &TrackRecord) -> Result<()> {
        println!("\nQuality:");
        for (i, kbps) in DOWNLOAD_BITRATES.iter().enumerate() {
            let estimate = download::estimate_mp3_size_bytes(track.duration, *kbps);
            println!("{}) {} kbps  ~ {}", i + 1, kbps, download::human_size(estimate));
        }
        let choice = ui::prompt("Choose quality (1-3): ");
        let Ok(n) = choice.parse::<usize>() else {
            return Ok(());
        };
        if n < 1 || n > DOWNLOAD_BITRATES.len() {
            return Ok(());
        }
        let kbps = DOWNLOAD_BITRATES[n - 1];

        let dir_input = ui::prompt(&format!(
            "Output dir (default: {}): ",
            self.config.download_dir.display()
        ));
        let out_dir = if dir_input.is_empty() {
            self.config.download_dir.clone()
        } else {
            PathBuf::from(dir_input)
        };
        let out_path = out_dir.join(format!("{}.mp3", download::safe_file_stem(&track.title)));

        println!("Downloading {}kbps to {} ...", kbps, out_path.display());
        match self.downloader.encode_to_file(&track.webpage_url, &out_path, kbps) {
            Ok(0) => println!("Done."),
            Ok(code) => println!("Failed with code {}", code),
            Err(e) => println!("Download failed: {}", e),
        }
        ui::wait_keypress("Press any key to continue...");
        Ok(())
    }

    fn settings_flow(&mut self) -> Result<()> {
        loop {
            ui::clear_screen();
            println!("Settings:");
            println!("Cache dir: {}", self.settings.cache_dir.display());
            println!("Keybinds:");
            for action in Action::ALL {
                println!(
                    "  {}: {:?}",
                    action.name(),
                    self.settings.keybinds.key_for(action)
                );
            }
            println!("\n1) Change cache dir  2) Change keybind  0) Back");
            match ui::prompt("Select: ").as_str() {
                "1" => {
                    let new_dir = ui::prompt("New cache dir: ");
                    if !new_dir.is_empty() {
                        self.settings.cache_dir = PathBuf::from(new_dir);
                        self.settings_store.save(&self.settings)?;
                    }
                }
                "2" => {
                    let names: Vec<&str> = Action::ALL.iter().map(|a| a.name()).collect();
                    let name = ui::prompt(&format!("Action name ({}): ", names.join(", ")));
                    if let Some(action) = Action::from_name(&name) {
                        let value = ui::prompt(&format!("New key for {}: ", action.name()));
                        if let Some(key) = value.chars().next() {
                            self.settings.keybinds.bind(action, key);
                            self.settings_store.save(&self.settings)?;
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn support_flow(&self) {
        println!("\nSupport / Account");
        println!("{}", self.settings.support_text);
        ui::wait_keypress("Press any key to continue...");
    }

    async fn playlist_flow(&mut self) -> Result<()> {
        let existing = self.playlists.list_playlists();
        if !existing.is_empty() {
            println!("Existing playlists:");
            for (i, name) in existing.iter().enumerate() {
                let pl = self.playlists.load(name);
                println!("{}) {} ({} songs)", i + 1, name, pl.len());
            }
            println!();
        }
        let name = {
            let input = ui::prompt("Playlist name (default: default): ");
            if input.is_empty() {
                "default".to_string()
            } else {
                input
            }
        };
        let mut playlist = self.playlists.load(&name);

        loop {
            ui::clear_screen();
            println!("Playlist: {}", playlist.name);
            for (i, item) in playlist.items.iter().enumerate() {
                println!(
                    "{}) {} - {}",
                    i + 1,
                    item.title,
                    item.uploader.as_deref().unwrap_or("?")
                );
            }
            println!("\n1) Add song  2) Remove song  3) Play all  0) Back");
            match ui::prompt("Select: ").as_str() {
                "1" => {
                    let query = ui::prompt("Search query: ");
                    if query.is_empty() {
                        continue;
                    }
                    if let Some(track) = self.pick_track(&query)? {
                        playlist.add(track);
                        self.playlists.save(&playlist)?;
                    }
                }
                "2" => {
                    let input = ui::prompt("Index to remove: ");
                    if let Ok(n) = input.parse::<usize>() {
                        if n >= 1 && playlist.remove(n - 1) {
                            self.playlists.save(&playlist)?;
                        }
                    }
                }
                "3" => {
                    self.play_all(&playlist).await?;
                    ui::wait_keypress("Press any key to continue...");
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Walk the playlist from its resume index, honoring next/prev/stop.
    async fn play_all(&self, playlist: &crate::playlist::Playlist) -> Result<()> {
        let mut i = playlist.index.min(playlist.items.len());
        while i < playlist.items.len() {
            let track = &playlist.items[i];
            println!("\nResolving: {}", track.title);
            match self.play_track(track).await? {
                None => i += 1, // could not start, skip it
                Some(PlaybackEnd::Prev) => i = i.saturating_sub(1),
                Some(PlaybackEnd::Next) | Some(PlaybackEnd::Finished) => i += 1,
                Some(PlaybackEnd::Quit) | Some(PlaybackEnd::StopAll) => break,
            }
        }
        Ok(())
    }

    fn singer_info_flow(&self) {
        let artist = ui::prompt("Singer/Artist name: ");
        if artist.is_empty() {
            return;
        }
        let results = match self.searcher.search(&artist, 5) {
            Ok(results) if !results.is_empty() => results,
            _ => {
                println!("No info found.");
                ui::wait_keypress("Press any key to continue...");
                return;
            }
        };
        println!("Info for {}:", artist);
        println!("Birth date: Unknown");
        println!("Status: Unknown (Alive/Deceased)");
        println!("Family name: Unknown");
        println!("Nickname/Real name: Unknown");
        println!("\nTop results:");
        for r in &results {
            println!(
                "- {} ({}) [{}]",
                r.title,
                r.uploader.as_deref().unwrap_or("?"),
                r.display_duration()
            );
        }
        ui::wait_keypress("Press any key to continue...");
    }

    fn themes_flow(&mut self) -> Result<()> {
        let names: Vec<String> = theme::theme_names().iter().map(|s| s.to_string()).collect();
        let Some(idx) = ui::select_from_list(&names, "Available themes:") else {
            return Ok(());
        };
        let selected = &names[idx];
        if theme::set_theme(selected) {
            self.settings.theme = selected.clone();
            self.settings_store.save(&self.settings)?;
            println!("Theme set to {}.", selected);
            ui::wait_keypress("Press any key to continue...");
        }
        Ok(())
    }
}
