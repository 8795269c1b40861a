// Playback Session: one controller bound to one running player process for
// the duration of one track. Owns the process handle and the control
// channel, translates keystrokes into wire commands, and polls progress.
//
// stop() is the single cancellation entry point and must stay idempotent:
// it is reachable from the control loop, from a track ending naturally, and
// from the shutdown hook racing against both.

use super::channel::ControlChannel;
use super::launch::{self, ProcessHandle};
use super::shutdown;
use super::PlayerError;
use crate::config::PlayerConfig;
use crate::settings::{Action, KeyBindings};
use crate::ui::keys::CTRL_C;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded wait after the polite quit before escalating to a forced kill.
const QUIT_GRACE: Duration = Duration::from_millis(500);
/// Bounded wait for the kill itself to be observed.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// What a keystroke meant to the control loop, beyond the command already
/// forwarded to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Command forwarded (or dropped pre-connection); keep looping.
    Forwarded(Action),
    /// Leave playback and return to the menu.
    QuitRequested,
    /// End the whole playlist pass.
    StopRequested,
    /// Advance to the next track.
    NextRequested,
    /// Go back one track.
    PrevRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Stopped,
}

struct SessionState {
    phase: Phase,
    process: Option<ProcessHandle>,
    channel: Option<ControlChannel>,
    last_exit: Option<i32>,
}

/// Shared core of a session. The shutdown hook holds at most a Weak to
/// this, never ownership.
pub(crate) struct SessionInner {
    player: PlayerConfig,
    state: Mutex<SessionState>,
    // read-mostly primitives, safe to read from the hook's context
    position_bits: AtomicU64,
    duration_bits: AtomicU64,
}

impl SessionInner {
    /// Idempotent teardown: polite quit, bounded grace, at most one forced
    /// kill, then channel released before the process handle.
    pub(crate) fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        if state.phase != Phase::Running {
            state.channel = None;
            state.process = None;
            return;
        }

        if let Some(channel) = state.channel.as_mut() {
            channel.send_command(json!(["quit"]));
        }

        let mut forced = false;
        if let Some(process) = state.process.as_mut() {
            if process.is_alive() && !process.wait_timeout(QUIT_GRACE) {
                process.terminate();
                forced = true;
                if !process.wait_timeout(KILL_GRACE) {
                    warn!(pid = process.pid(), "player process survived kill");
                }
            }
            state.last_exit = process.exit_code();
        }

        state.channel = None;
        state.process = None;
        state.phase = Phase::Stopped;
        drop(state);

        shutdown::clear_if(self);
        info!(forced, "playback session stopped");
    }
}

pub struct PlaybackSession {
    inner: Arc<SessionInner>,
    ipc_dir: PathBuf,
    keybinds: Arc<KeyBindings>,
}

impl PlaybackSession {
    pub fn new(player: PlayerConfig, ipc_dir: PathBuf, keybinds: Arc<KeyBindings>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                player,
                state: Mutex::new(SessionState {
                    phase: Phase::Idle,
                    process: None,
                    channel: None,
                    last_exit: None,
                }),
                position_bits: AtomicU64::new(0f64.to_bits()),
                duration_bits: AtomicU64::new(0f64.to_bits()),
            }),
            ipc_dir,
            keybinds,
        }
    }

    /// Launch the player against a resolved stream URL. A still-running
    /// previous process is fully stopped first; on launch failure no
    /// process is retained and the session is not registered.
    pub fn start(&self, stream_url: &str) -> Result<(), PlayerError> {
        if stream_url.is_empty() {
            return Err(PlayerError::EmptyUrl);
        }

        if self.is_running() {
            self.inner.shutdown();
        }

        let endpoint = launch::ipc_endpoint(&self.ipc_dir);
        let cmd = launch::build_player_command(&self.inner.player, stream_url, &endpoint);
        let process = ProcessHandle::spawn(cmd).map_err(|source| PlayerError::Launch {
            binary: self.inner.player.binary.clone(),
            source,
        })?;

        let mut state = self.inner.state.lock().unwrap();
        state.process = Some(process);
        state.channel = Some(ControlChannel::new(endpoint));
        state.last_exit = None;
        state.phase = Phase::Running;
        drop(state);

        self.inner
            .position_bits
            .store(0f64.to_bits(), Ordering::Relaxed);
        self.inner
            .duration_bits
            .store(0f64.to_bits(), Ordering::Relaxed);

        shutdown::register(&self.inner);
        info!(url = stream_url, "playback session started");
        Ok(())
    }

    /// Forward one logical action to the player. Best-effort: before the
    /// channel is up the command is dropped, never queued.
    pub fn send_command(&self, action: Action) {
        let args = wire_command(action, &self.inner.player);
        let mut state = self.inner.state.lock().unwrap();
        if state.phase != Phase::Running {
            return;
        }
        if let Some(channel) = state.channel.as_mut() {
            debug!(action = action.name(), "sending player command");
            channel.send_command(args);
        }
    }

    /// Compose one keystroke into a player command via the current
    /// bindings. Unbound keys return None; Ctrl+C acts as quit since raw
    /// mode swallows the interrupt.
    pub fn send_key(&self, key: char) -> Option<KeyOutcome> {
        let action = if key == CTRL_C {
            Action::QuitPlayer
        } else {
            self.keybinds.action_for(key)?
        };
        self.send_command(action);
        Some(match action {
            Action::QuitPlayer => KeyOutcome::QuitRequested,
            Action::Stop => KeyOutcome::StopRequested,
            Action::NextTrack => KeyOutcome::NextRequested,
            Action::PrevTrack => KeyOutcome::PrevRequested,
            other => KeyOutcome::Forwarded(other),
        })
    }

    /// Last-known (position, duration) in seconds. Queries the channel and
    /// falls back to the previous values on any failure; duration never
    /// decreases once observed.
    pub fn poll_progress(&self) -> (f64, f64) {
        let mut state = self.inner.state.lock().unwrap();
        if state.phase == Phase::Running {
            if let Some(channel) = state.channel.as_mut() {
                if let Some(pos) = channel.query_f64("time-pos") {
                    if pos.is_finite() && pos >= 0.0 {
                        self.inner.position_bits.store(pos.to_bits(), Ordering::Relaxed);
                    }
                }
                if let Some(dur) = channel.query_f64("duration") {
                    let prev = f64::from_bits(self.inner.duration_bits.load(Ordering::Relaxed));
                    self.inner
                        .duration_bits
                        .store(merge_duration(prev, dur).to_bits(), Ordering::Relaxed);
                }
            }
        }
        drop(state);

        (
            f64::from_bits(self.inner.position_bits.load(Ordering::Relaxed)),
            f64::from_bits(self.inner.duration_bits.load(Ordering::Relaxed)),
        )
    }

    /// True until stop() or the process is observed to have exited on its
    /// own; a self-exit triggers the same teardown as stop().
    pub fn is_running(&self) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        if state.phase != Phase::Running {
            return false;
        }
        let alive = state
            .process
            .as_mut()
            .map(|p| p.is_alive())
            .unwrap_or(false);
        if alive {
            return true;
        }

        // track finished or the process crashed; release channel then process
        state.last_exit = state.process.as_ref().and_then(|p| p.exit_code());
        state.channel = None;
        state.process = None;
        state.phase = Phase::Stopped;
        drop(state);

        shutdown::clear_if(&self.inner);
        debug!("player process exited on its own");
        false
    }

    /// Exit code of the last player process, for callers that care to
    /// distinguish a natural end from a crash.
    pub fn exit_code(&self) -> Option<i32> {
        self.inner.state.lock().unwrap().last_exit
    }

    /// Idempotent: safe to call never-started, N times, and concurrently
    /// with the shutdown hook.
    pub fn stop(&self) {
        self.inner.shutdown();
    }

    #[cfg(test)]
    pub(crate) fn inject_for_tests(&self, process: ProcessHandle, channel: ControlChannel) {
        let mut state = self.inner.state.lock().unwrap();
        state.process = Some(process);
        state.channel = Some(channel);
        state.phase = Phase::Running;
        drop(state);
        shutdown::register(&self.inner);
    }

    #[cfg(test)]
    pub(crate) fn is_registered(&self) -> bool {
        shutdown::active_is(&self.inner)
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

/// Logical action -> mpv command array. Quit-flavored actions all end the
/// current process; the control loop decides what happens next.
fn wire_command(action: Action, player: &PlayerConfig) -> serde_json::Value {
    match action {
        Action::PauseToggle => json!(["cycle", "pause"]),
        Action::VolUp => json!(["add", "volume", player.volume_step]),
        Action::VolDown => json!(["add", "volume", -player.volume_step]),
        Action::SeekForward => json!(["seek", player.seek_step_secs, "relative"]),
        Action::SeekBackward => json!(["seek", -player.seek_step_secs, "relative"]),
        Action::NextTrack | Action::PrevTrack | Action::Stop | Action::QuitPlayer => {
            json!(["quit"])
        }
    }
}

/// Duration is advisory but must never go backwards once known.
fn merge_duration(prev: f64, new: f64) -> f64 {
    if !new.is_finite() || new < 0.0 {
        return prev;
    }
    new.max(prev)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex as StdMutex;

    // session tests share the process-wide active-session slot
    static REGISTRY_GUARD: StdMutex<()> = StdMutex::new(());

    fn test_player() -> PlayerConfig {
        PlayerConfig {
            binary: "mpv".to_string(),
            extra_args: Vec::new(),
            ipc_dir: None,
            seek_step_secs: 5.0,
            volume_step: 5,
            poll_interval_ms: 200,
        }
    }

    fn test_session() -> PlaybackSession {
        PlaybackSession::new(
            test_player(),
            std::env::temp_dir(),
            Arc::new(KeyBindings::default()),
        )
    }

    #[cfg(unix)]
    fn spawn_sleeper(secs: &str) -> ProcessHandle {
        let mut cmd = std::process::Command::new("sleep");
        cmd.arg(secs)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        ProcessHandle::spawn(cmd).unwrap()
    }

    fn dead_channel() -> ControlChannel {
        ControlChannel::new(Path::new("/nonexistent/cadenza-session-test.sock").to_path_buf())
    }

    #[test]
    fn stop_before_start_is_safe_and_idempotent() {
        let _guard = REGISTRY_GUARD.lock().unwrap();
        let session = test_session();

        session.stop();
        session.stop();
        session.stop();
        assert!(!session.is_running());
        assert_eq!(session.exit_code(), None);
    }

    #[test]
    fn launch_failure_retains_nothing() {
        let _guard = REGISTRY_GUARD.lock().unwrap();
        let mut player = test_player();
        player.binary = "/nonexistent/cadenza-test-player".to_string();
        let session = PlaybackSession::new(
            player,
            std::env::temp_dir(),
            Arc::new(KeyBindings::default()),
        );

        let err = session.start("https://example.com/stream").unwrap_err();
        assert!(matches!(err, PlayerError::Launch { .. }));
        assert!(!session.is_running());
        assert!(!session.is_registered());
    }

    #[test]
    fn empty_url_is_rejected() {
        let session = test_session();
        assert!(matches!(session.start(""), Err(PlayerError::EmptyUrl)));
    }

    #[cfg(unix)]
    #[test]
    fn commands_before_channel_ready_are_dropped_without_blocking() {
        let _guard = REGISTRY_GUARD.lock().unwrap();
        let session = test_session();
        session.inject_for_tests(spawn_sleeper("5"), dead_channel());

        let started = std::time::Instant::now();
        session.send_command(Action::PauseToggle);
        session.send_command(Action::VolUp);
        session.send_command(Action::SeekForward);
        assert!(started.elapsed() < Duration::from_millis(250));

        assert_eq!(session.poll_progress(), (0.0, 0.0));
        session.stop();
    }

    #[cfg(unix)]
    #[test]
    fn self_exit_is_observed_without_stop() {
        let _guard = REGISTRY_GUARD.lock().unwrap();
        let session = test_session();
        session.inject_for_tests(spawn_sleeper("0.2"), dead_channel());
        assert!(session.is_running());

        let deadline = std::time::Instant::now() + Duration::from_secs(3);
        while session.is_running() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(50));
        }
        assert!(!session.is_running());
        assert_eq!(session.exit_code(), Some(0));
        assert!(!session.is_registered());
    }

    #[cfg(unix)]
    #[test]
    fn stop_terminates_and_unregisters() {
        let _guard = REGISTRY_GUARD.lock().unwrap();
        let session = test_session();
        session.inject_for_tests(spawn_sleeper("30"), dead_channel());
        assert!(session.is_running());
        assert!(session.is_registered());

        session.stop();
        assert!(!session.is_running());
        assert!(!session.is_registered());

        // second stop is a no-op
        session.stop();
        assert!(!session.is_running());
    }

    #[cfg(unix)]
    #[test]
    fn concurrent_stops_resolve_to_one_teardown() {
        let _guard = REGISTRY_GUARD.lock().unwrap();
        let session = Arc::new(test_session());
        session.inject_for_tests(spawn_sleeper("30"), dead_channel());

        let a = {
            let s = Arc::clone(&session);
            std::thread::spawn(move || s.stop())
        };
        let b = {
            let s = Arc::clone(&session);
            std::thread::spawn(move || s.stop())
        };
        a.join().unwrap();
        b.join().unwrap();

        assert!(!session.is_running());
        assert!(!session.is_registered());
    }

    #[cfg(unix)]
    #[test]
    fn restart_stops_previous_process_first() {
        let _guard = REGISTRY_GUARD.lock().unwrap();
        let mut player = test_player();
        player.binary = "/nonexistent/cadenza-test-player".to_string();
        let session = PlaybackSession::new(
            player,
            std::env::temp_dir(),
            Arc::new(KeyBindings::default()),
        );
        session.inject_for_tests(spawn_sleeper("30"), dead_channel());
        assert!(session.is_running());

        // the new launch fails, but the old process must already be gone
        assert!(session.start("https://example.com/b").is_err());
        assert!(!session.is_running());
        assert!(!session.is_registered());
    }

    #[test]
    fn key_dispatch_follows_bindings() {
        let session = test_session();
        assert_eq!(session.send_key(' '), Some(KeyOutcome::Forwarded(Action::PauseToggle)));
        assert_eq!(session.send_key('q'), Some(KeyOutcome::QuitRequested));
        assert_eq!(session.send_key('n'), Some(KeyOutcome::NextRequested));
        assert_eq!(session.send_key('b'), Some(KeyOutcome::PrevRequested));
        assert_eq!(session.send_key('s'), Some(KeyOutcome::StopRequested));
        assert_eq!(session.send_key(CTRL_C), Some(KeyOutcome::QuitRequested));
        assert_eq!(session.send_key('z'), None);
    }

    #[test]
    fn wire_commands_match_the_mpv_protocol() {
        let player = test_player();
        assert_eq!(
            wire_command(Action::PauseToggle, &player),
            json!(["cycle", "pause"])
        );
        assert_eq!(
            wire_command(Action::VolUp, &player),
            json!(["add", "volume", 5])
        );
        assert_eq!(
            wire_command(Action::VolDown, &player),
            json!(["add", "volume", -5])
        );
        assert_eq!(
            wire_command(Action::SeekForward, &player),
            json!(["seek", 5.0, "relative"])
        );
        assert_eq!(
            wire_command(Action::SeekBackward, &player),
            json!(["seek", -5.0, "relative"])
        );
        assert_eq!(wire_command(Action::QuitPlayer, &player), json!(["quit"]));
    }

    #[test]
    fn duration_never_decreases_once_known() {
        assert_eq!(merge_duration(0.0, 180.0), 180.0);
        assert_eq!(merge_duration(180.0, 179.5), 180.0);
        assert_eq!(merge_duration(180.0, 181.0), 181.0);
        assert_eq!(merge_duration(180.0, f64::NAN), 180.0);
        assert_eq!(merge_duration(180.0, -1.0), 180.0);
    }
}
