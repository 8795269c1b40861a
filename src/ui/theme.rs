// Terminal color themes. One global current theme, selected from Settings
// and switchable at runtime from the Themes menu.

use crossterm::style::{Color, Stylize};
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    /// Progress bar and body text highlights.
    pub primary: Color,
    /// Logo second half, control hints, menu headers.
    pub accent: Color,
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "default",
        primary: Color::White,
        accent: Color::Green,
    },
    Theme {
        name: "emerald",
        primary: Color::Green,
        accent: Color::DarkGreen,
    },
    Theme {
        name: "amber",
        primary: Color::Yellow,
        accent: Color::DarkYellow,
    },
    Theme {
        name: "crimson",
        primary: Color::Red,
        accent: Color::DarkRed,
    },
    Theme {
        name: "mono",
        primary: Color::White,
        accent: Color::Grey,
    },
];

static CURRENT: RwLock<Theme> = RwLock::new(Theme {
    name: "default",
    primary: Color::White,
    accent: Color::Green,
});

pub fn current() -> Theme {
    *CURRENT.read().unwrap()
}

/// Select a theme by name. Unknown names leave the current theme alone.
pub fn set_theme(name: &str) -> bool {
    match THEMES.iter().find(|t| t.name == name) {
        Some(theme) => {
            *CURRENT.write().unwrap() = *theme;
            true
        }
        None => false,
    }
}

pub fn theme_names() -> Vec<&'static str> {
    THEMES.iter().map(|t| t.name).collect()
}

/// Styled text for line-oriented output.
pub fn paint(text: &str, color: Color) -> String {
    text.with(color).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_theme_is_selected_unknown_is_ignored() {
        assert!(set_theme("amber"));
        assert_eq!(current().name, "amber");

        assert!(!set_theme("neon-zebra"));
        assert_eq!(current().name, "amber");

        // leave the default behind for other tests
        assert!(set_theme("default"));
    }

    #[test]
    fn painted_text_keeps_the_content() {
        let out = paint("hello", Color::Green);
        assert!(out.contains("hello"));
    }
}
