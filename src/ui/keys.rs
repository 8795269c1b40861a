// Key Reader: per-keystroke terminal input without echo or Enter.
// Raw mode is a scoped acquisition - the guard restores the previous mode
// when dropped, so a panicking flow still leaves the terminal usable.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io;
use std::time::Duration;

/// Raw mode swallows the interrupt signal; Ctrl+C surfaces as ETX so the
/// control loop can treat it as quit.
pub const CTRL_C: char = '\u{3}';

pub struct KeyReader {
    was_raw: bool,
}

impl KeyReader {
    pub fn new() -> io::Result<Self> {
        let was_raw = terminal::is_raw_mode_enabled()?;
        if !was_raw {
            terminal::enable_raw_mode()?;
        }
        Ok(Self { was_raw })
    }

    /// Returns immediately whether or not a key is waiting. Only character
    /// presses are reported; everything else is swallowed.
    pub fn read_key_nonblocking(&self) -> Option<char> {
        if !event::poll(Duration::ZERO).unwrap_or(false) {
            return None;
        }
        match event::read() {
            Ok(Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                modifiers,
                ..
            })) => match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(CTRL_C),
                KeyCode::Char(c) => Some(c),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Drop for KeyReader {
    fn drop(&mut self) {
        if !self.was_raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Block until any key press. Used by "press any key to continue" pauses.
pub fn wait_for_any_key() {
    let Ok(reader) = KeyReader::new() else {
        // no terminal - fall back to a line read
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);
        return;
    };
    loop {
        if event::poll(Duration::from_millis(100)).unwrap_or(false) {
            if let Ok(Event::Key(KeyEvent {
                kind: KeyEventKind::Press,
                ..
            })) = event::read()
            {
                break;
            }
        }
    }
    drop(reader);
}

/// Best-effort terminal restore for abnormal exit paths (shutdown hook).
pub fn restore_terminal() {
    let _ = terminal::disable_raw_mode();
    let _ = crossterm::execute!(io::stdout(), crossterm::cursor::Show);
}
