//! Drawing helpers shared across screens: modals, form fields, status lines.

use super::state::{Alert, LoadState, TextField};
use super::theme;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::Frame;

pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let w = (u32::from(area.width) * u32::from(percent_x.min(100)) / 100) as u16;
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, w, height.min(area.height))
}

/// Bordered modal cleared over `area`; returns the inner rect.
pub fn modal(f: &mut Frame, area: Rect, title: &str, percent_x: u16, height: u16) -> Rect {
    let rect = centered_rect(percent_x, height, area);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .title(Span::styled(format!(" {title} "), theme::title_style()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::ACCENT))
        .padding(Padding::horizontal(1));
    let inner = block.inner(rect);
    f.render_widget(block, rect);
    inner
}

pub fn draw_alert(f: &mut Frame, area: Rect, alert: &Alert) {
    let inner = modal(f, area, &alert.title, 60, 7);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                alert.message.clone(),
                Style::default().fg(theme::RED),
            )),
            Line::from(""),
            Line::from(Span::styled("[Enter/Esc] dismiss", theme::hint_style())),
        ])
        .wrap(Wrap { trim: true }),
        inner,
    );
}

pub fn draw_confirm(f: &mut Frame, area: Rect, prompt: &str) {
    let inner = modal(f, area, "Confirm", 50, 6);
    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                prompt.to_string(),
                Style::default().fg(theme::YELLOW),
            )),
            Line::from(""),
            Line::from(Span::styled("[y] confirm  [any key] cancel", theme::hint_style())),
        ])
        .wrap(Wrap { trim: true }),
        inner,
    );
}

/// Label + value line pair for a form field.
pub fn field_lines<'a>(label: &'a str, value: &str, focused: bool) -> [Line<'a>; 2] {
    let label_style = if focused {
        Style::default()
            .fg(theme::CYAN)
            .add_modifier(Modifier::BOLD)
    } else {
        theme::dim_style()
    };
    let cursor = if focused { "\u{2588}" } else { "" };
    [
        Line::from(Span::styled(label, label_style)),
        Line::from(Span::styled(
            format!("  {value}{cursor}"),
            Style::default().fg(theme::TEXT),
        )),
    ]
}

pub fn text_field_lines<'a>(label: &'a str, field: &TextField, focused: bool) -> [Line<'a>; 2] {
    field_lines(label, &field.value, focused)
}

/// Selector field rendered as `< value >`.
pub fn choice_lines<'a>(label: &'a str, value: &str, focused: bool) -> [Line<'a>; 2] {
    field_lines(label, &format!("\u{25c0} {value} \u{25b6}"), focused)
}

/// One dim line describing the load state, or `None` when idle/loaded.
pub fn status_line(load: &LoadState, tick: usize) -> Option<Line<'static>> {
    match load {
        LoadState::Loading | LoadState::Submitting => {
            let spinner = theme::SPINNER_FRAMES[tick % theme::SPINNER_FRAMES.len()];
            let what = if load.is_loading() {
                "Loading\u{2026}"
            } else {
                "Submitting\u{2026}"
            };
            Some(Line::from(vec![
                Span::styled(format!("  {spinner} "), Style::default().fg(theme::CYAN)),
                Span::styled(what, theme::dim_style()),
            ]))
        }
        LoadState::Error(e) => Some(Line::from(Span::styled(
            format!("  unavailable: {e}"),
            theme::dim_style(),
        ))),
        LoadState::Idle | LoadState::Loaded => None,
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!(
            "{}\u{2026}",
            homevoice_types::truncate_str(s, max.saturating_sub(1))
        )
    }
}

/// Titled panel block used by every screen.
pub fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(Line::from(vec![Span::styled(
            format!(" {title} "),
            theme::title_style(),
        )]))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::ACCENT))
        .padding(Padding::horizontal(1))
}
