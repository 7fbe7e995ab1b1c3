//! Colors and shared styles.

use ratatui::style::{Color, Modifier, Style};

pub const ACCENT: Color = Color::Rgb(99, 102, 241);
pub const CYAN: Color = Color::Rgb(34, 211, 238);
pub const GREEN: Color = Color::Rgb(74, 222, 128);
pub const YELLOW: Color = Color::Rgb(250, 204, 21);
pub const RED: Color = Color::Rgb(248, 113, 113);
pub const PURPLE: Color = Color::Rgb(192, 132, 252);
pub const TEXT: Color = Color::Rgb(226, 232, 240);
pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184);
pub const TEXT_TERTIARY: Color = Color::Rgb(100, 116, 139);
pub const BG_CARD: Color = Color::Rgb(30, 41, 59);
pub const BG_SELECTED: Color = Color::Rgb(51, 65, 85);

pub const SPINNER_FRAMES: &[&str] = &[
    "\u{280b}", "\u{2819}", "\u{2839}", "\u{2838}", "\u{283c}", "\u{2834}", "\u{2826}", "\u{2827}",
    "\u{2807}", "\u{280f}",
];

pub fn title_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn dim_style() -> Style {
    Style::default().fg(TEXT_SECONDARY)
}

pub fn hint_style() -> Style {
    Style::default().fg(TEXT_TERTIARY)
}

pub fn selected_style() -> Style {
    Style::default()
        .fg(TEXT)
        .bg(BG_SELECTED)
        .add_modifier(Modifier::BOLD)
}

pub fn label_style() -> Style {
    Style::default().fg(CYAN).add_modifier(Modifier::BOLD)
}

pub fn tab_active() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(ACCENT)
        .add_modifier(Modifier::BOLD)
}

pub fn tab_inactive() -> Style {
    Style::default().fg(TEXT_SECONDARY)
}

/// Badge color for a backend status word.
pub fn status_style(status: &str) -> Style {
    match status {
        "ready" | "online" | "healthy" | "active" => Style::default().fg(GREEN),
        "training" | "loading" => Style::default().fg(YELLOW),
        "failed" | "offline" | "error" => Style::default().fg(RED),
        _ => dim_style(),
    }
}
