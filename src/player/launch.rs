// Process Launcher: builds the mpv invocation and owns the spawned child.
// The argument set keeps mpv headless (no window, quiet, auto-exit at EOF)
// with a JSON IPC endpoint attached for runtime control.

use crate::config::PlayerConfig;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static ENDPOINT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Predictable, per-launch unique IPC endpoint path.
#[cfg(unix)]
pub fn ipc_endpoint(dir: &Path) -> PathBuf {
    let seq = ENDPOINT_SEQ.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("cadenza-mpv-{}-{}.sock", std::process::id(), seq))
}

/// On Windows mpv exposes the endpoint as a named pipe; the dir is unused.
#[cfg(windows)]
pub fn ipc_endpoint(_dir: &Path) -> PathBuf {
    let seq = ENDPOINT_SEQ.fetch_add(1, Ordering::Relaxed);
    PathBuf::from(format!(
        r"\\.\pipe\cadenza-mpv-{}-{}",
        std::process::id(),
        seq
    ))
}

/// Minimal, predictable argument set: audio only, quiet, exit when the
/// track ends, IPC server attached, then any user extras, then the URL.
pub fn build_player_command(player: &PlayerConfig, stream_url: &str, endpoint: &Path) -> Command {
    let mut cmd = Command::new(&player.binary);
    cmd.arg("--no-video")
        .arg("--really-quiet")
        .arg(format!("--input-ipc-server={}", endpoint.display()))
        .args(&player.extra_args)
        .arg(stream_url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

/// Owned handle to the spawned player. At most one live handle per session;
/// the exit status is retained after the process goes away so callers can
/// distinguish "ended" from "failed".
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    exit: Option<ExitStatus>,
}

impl ProcessHandle {
    pub fn spawn(mut cmd: Command) -> std::io::Result<Self> {
        let child = cmd.spawn()?;
        debug!(pid = child.id(), "spawned player process");
        Ok(Self { child, exit: None })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Real liveness, not a cached flag: the process can exit on its own
    /// when the track finishes.
    pub fn is_alive(&mut self) -> bool {
        if self.exit.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exit = Some(status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("liveness check failed, treating process as gone: {}", e);
                false
            }
        }
    }

    /// Exit code once the process has been observed to exit. None while
    /// alive, and None after a signal kill on unix.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit.and_then(|s| s.code())
    }

    /// Forced termination. Errors are ignored: the process may already be
    /// gone, which is the outcome we want anyway.
    pub fn terminate(&mut self) {
        if self.exit.is_none() {
            let _ = self.child.kill();
        }
    }

    /// Poll-wait for exit with a deadline. Returns true if the process
    /// exited within the window.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.is_alive() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_unique_per_launch() {
        let dir = std::env::temp_dir();
        let a = ipc_endpoint(&dir);
        let b = ipc_endpoint(&dir);
        assert_ne!(a, b);
    }

    #[test]
    fn command_carries_headless_flags_and_url_last() {
        let player = PlayerConfig {
            binary: "mpv".to_string(),
            extra_args: vec!["--volume=70".to_string()],
            ipc_dir: None,
            seek_step_secs: 5.0,
            volume_step: 5,
            poll_interval_ms: 200,
        };
        let endpoint = PathBuf::from("/tmp/cadenza-test.sock");
        let cmd = build_player_command(&player, "https://example.com/a.m4a", &endpoint);

        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[0], "--no-video");
        assert_eq!(args[1], "--really-quiet");
        assert!(args[2].starts_with("--input-ipc-server="));
        assert_eq!(args[3], "--volume=70");
        assert_eq!(args.last().unwrap(), "https://example.com/a.m4a");
    }

    #[cfg(unix)]
    #[test]
    fn liveness_tracks_natural_exit() {
        let mut cmd = Command::new("true");
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        let mut handle = ProcessHandle::spawn(cmd).unwrap();

        assert!(handle.wait_timeout(Duration::from_secs(2)));
        assert!(!handle.is_alive());
        assert_eq!(handle.exit_code(), Some(0));
    }

    #[cfg(unix)]
    #[test]
    fn terminate_reaps_a_long_runner() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30").stdout(Stdio::null()).stderr(Stdio::null());
        let mut handle = ProcessHandle::spawn(cmd).unwrap();

        assert!(handle.is_alive());
        handle.terminate();
        assert!(handle.wait_timeout(Duration::from_secs(2)));
        assert!(!handle.is_alive());
        // killed by signal: no exit code on unix
        assert_eq!(handle.exit_code(), None);
    }
}
