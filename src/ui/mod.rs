// Terminal shell primitives for the line-oriented menu UI.

pub mod app;
pub mod keys;
pub mod progress;
pub mod theme;

pub use app::App;

use crossterm::{cursor, execute, terminal};
use std::io::{self, Write};

pub fn clear_screen() {
    let _ = execute!(
        io::stdout(),
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    );
}

pub fn set_console_title(title: &str) {
    let _ = execute!(io::stdout(), terminal::SetTitle(title));
}

pub fn terminal_size() -> (u16, u16) {
    terminal::size().unwrap_or((80, 24))
}

/// Print a label and read one trimmed line. I/O failure reads as empty,
/// which every flow already treats as "cancel".
pub fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim().to_string()
}

pub fn wait_keypress(message: &str) {
    println!("{}", message);
    keys::wait_for_any_key();
}

/// Numbered pick list; 0, empty, or junk input cancels.
pub fn select_from_list(items: &[String], header: &str) -> Option<usize> {
    println!("{}", theme::paint(header, theme::current().accent));
    for (i, item) in items.iter().enumerate() {
        println!("{:2}) {}", i + 1, item);
    }
    println!(" 0) Back");

    let choice = prompt("Select: ");
    match choice.parse::<usize>() {
        Ok(n) if n >= 1 && n <= items.len() => Some(n - 1),
        _ => None,
    }
}

pub fn render_center_block(lines: &[String]) {
    let (width, _) = terminal_size();
    for line in lines {
        let pad = (width as usize).saturating_sub(console_width(line)) / 2;
        println!("{}{}", " ".repeat(pad), line);
    }
}

/// Visible width, ignoring ANSI escape sequences from themed text.
fn console_width(line: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in line.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == '\u{1b}' {
            in_escape = true;
        } else {
            width += 1;
        }
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_width_ignores_ansi_escapes() {
        assert_eq!(console_width("hello"), 5);
        assert_eq!(console_width("\u{1b}[92mhello\u{1b}[0m"), 5);
    }
}
