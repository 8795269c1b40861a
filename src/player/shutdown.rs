// Shutdown Hook: a single-slot, process-wide weak registry of the active
// session plus a signal task that stops it when the host pulls the rug
// (Ctrl+C outside raw mode, SIGTERM/SIGHUP, console close on Windows).
//
// The hook only signals — it never owns the session, and the stop it
// triggers is the same idempotent teardown the control loop uses.

use super::session::SessionInner;
use std::sync::{Arc, Mutex, Weak};
use tracing::info;

static ACTIVE: Mutex<Weak<SessionInner>> = Mutex::new(Weak::new());

/// Written only by PlaybackSession::start.
pub(crate) fn register(inner: &Arc<SessionInner>) {
    *ACTIVE.lock().unwrap() = Arc::downgrade(inner);
}

/// Written only by session teardown; clears the slot only if it still
/// refers to the session being torn down.
pub(crate) fn clear_if(inner: &SessionInner) {
    let mut slot = ACTIVE.lock().unwrap();
    match slot.upgrade() {
        Some(current) if std::ptr::eq(current.as_ref(), inner) => *slot = Weak::new(),
        Some(_) => {}
        None => *slot = Weak::new(),
    }
}

#[cfg(test)]
pub(crate) fn active_is(inner: &Arc<SessionInner>) -> bool {
    ACTIVE
        .lock()
        .unwrap()
        .upgrade()
        .map(|current| std::ptr::eq(current.as_ref(), inner.as_ref()))
        .unwrap_or(false)
}

/// Stop whatever session is currently active. Returns true if one was
/// found. The slot lock is released before stopping so teardown's own
/// clear_if cannot deadlock against us.
pub fn stop_active() -> bool {
    let session = ACTIVE.lock().unwrap().upgrade();
    match session {
        Some(inner) => {
            inner.shutdown();
            true
        }
        None => false,
    }
}

/// Install the process-wide hook once at startup. On a host close signal:
/// stop the active session (polite quit, bounded grace, forced kill), put
/// the terminal back, and exit 0 — handled, nothing left for the host to
/// kill.
pub fn install() {
    tokio::spawn(async {
        wait_for_close_signal().await;
        info!("host shutdown signal received, stopping active session");
        stop_active();
        crate::ui::keys::restore_terminal();
        std::process::exit(0);
    });
}

#[cfg(unix)]
async fn wait_for_close_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(mut term), Ok(mut hup)) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
                _ = hup.recv() => {}
            }
        }
        _ => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(windows)]
async fn wait_for_close_signal() {
    use tokio::signal::windows::{ctrl_c, ctrl_close};

    match (ctrl_c(), ctrl_close()) {
        (Ok(mut c), Ok(mut close)) => {
            tokio::select! {
                _ = c.recv() => {}
                _ = close.recv() => {}
            }
        }
        _ => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}
