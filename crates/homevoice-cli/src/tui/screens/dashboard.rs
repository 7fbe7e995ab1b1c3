//! Dashboard: read-only overview built from four independent fetches.

use crate::tui::state::{Fetched, LoadState};
use crate::tui::theme;
use crate::tui::widgets;
use homevoice_types::chat::ChatStatistics;
use homevoice_types::device::DeviceStatistics;
use homevoice_types::training::TrainingStatistics;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const TOP_INTENTS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Health {
    #[default]
    Unknown,
    Healthy,
    Error,
}

impl Health {
    fn label(self) -> &'static str {
        match self {
            Health::Unknown => "checking",
            Health::Healthy => "healthy",
            Health::Error => "error",
        }
    }
}

pub struct DashboardState {
    pub training: Fetched<TrainingStatistics>,
    pub devices: Fetched<DeviceStatistics>,
    pub chat: Fetched<ChatStatistics>,
    pub health: Fetched<Option<Health>>,
    pub tick: usize,
}

/// Sequence numbers for one dashboard refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSeqs {
    pub training: u64,
    pub devices: u64,
    pub chat: u64,
    pub health: u64,
}

pub enum DashboardAction {
    Continue,
    Refresh(DashboardSeqs),
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            training: Fetched::default(),
            devices: Fetched::default(),
            chat: Fetched::default(),
            health: Fetched::default(),
            tick: 0,
        }
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn refresh(&mut self) -> DashboardAction {
        DashboardAction::Refresh(DashboardSeqs {
            training: self.training.begin(),
            devices: self.devices.begin(),
            chat: self.chat.begin(),
            health: self.health.begin(),
        })
    }

    pub fn health(&self) -> Health {
        match (&self.health.load, self.health.data) {
            (LoadState::Error(_), _) => Health::Error,
            (_, Some(h)) => h,
            _ => Health::Unknown,
        }
    }

    /// Any successful health response counts as healthy.
    pub fn apply_health(&mut self, seq: u64, result: Result<(), String>) {
        self.health.apply(seq, result.map(|()| Some(Health::Healthy)));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DashboardAction {
        match key.code {
            KeyCode::Char('r') => self.refresh(),
            _ => DashboardAction::Continue,
        }
    }
}

fn card<'a>(title: &'a str) -> Block<'a> {
    Block::default()
        .title(Span::styled(format!(" {title} "), theme::label_style()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BG_SELECTED))
}

fn big_number(value: String, label: &str) -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            value,
            Style::default()
                .fg(theme::TEXT)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(label.to_string(), theme::dim_style())),
    ]
}

pub fn draw(f: &mut Frame, area: Rect, state: &mut DashboardState) {
    let block = widgets::panel("Dashboard");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::vertical([
        Constraint::Length(5), // headline cards
        Constraint::Min(6),    // distributions
        Constraint::Length(1), // hints
    ])
    .split(inner);

    let cards = Layout::horizontal([
        Constraint::Ratio(1, 4),
        Constraint::Ratio(1, 4),
        Constraint::Ratio(1, 4),
        Constraint::Ratio(1, 4),
    ])
    .split(rows[0]);

    let t = &state.training.data;
    let d = &state.devices.data;
    let c = &state.chat.data;

    f.render_widget(
        Paragraph::new(big_number(
            t.total_training_data.to_string(),
            &format!("examples / {} intents", t.total_intents),
        ))
        .block(card("Training")),
        cards[0],
    );
    f.render_widget(
        Paragraph::new(big_number(
            format!("{}/{}", d.online(), d.total_devices),
            "devices online",
        ))
        .block(card("Devices")),
        cards[1],
    );
    f.render_widget(
        Paragraph::new(big_number(
            c.total_conversations.to_string(),
            &format!("conversations, avg {}", c.confidence_label()),
        ))
        .block(card("Chat")),
        cards[2],
    );
    let health = state.health();
    f.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                health.label(),
                theme::status_style(health.label()).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled("backend", theme::dim_style())),
        ])
        .block(card("System")),
        cards[3],
    );

    let lower = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let mut intent_lines: Vec<Line> = Vec::new();
    let top = t.top_intents(TOP_INTENTS);
    if top.is_empty() {
        intent_lines.push(Line::from(Span::styled("No data", theme::dim_style())));
    }
    let max = top.first().map_or(1, |(_, n)| (*n).max(1));
    for (name, n) in &top {
        let bar_len = (*n * 20 / max) as usize;
        intent_lines.push(Line::from(vec![
            Span::styled(format!("{:<18}", widgets::truncate(name, 16)), theme::dim_style()),
            Span::styled("\u{2588}".repeat(bar_len.max(1)), Style::default().fg(theme::PURPLE)),
            Span::styled(format!(" {n}"), Style::default().fg(theme::TEXT)),
        ]));
    }
    if let Some(line) = widgets::status_line(&state.training.load, state.tick) {
        intent_lines.push(line);
    }
    f.render_widget(
        Paragraph::new(intent_lines).block(card("Top Intents")),
        lower[0],
    );

    let mut device_lines: Vec<Line> = d
        .status_distribution
        .iter()
        .map(|(status, n)| {
            Line::from(vec![
                Span::styled(format!("{status:<10}"), theme::status_style(status)),
                Span::styled(n.to_string(), Style::default().fg(theme::TEXT)),
            ])
        })
        .collect();
    device_lines.push(Line::from(vec![
        Span::styled("types     ", theme::dim_style()),
        Span::styled(
            d.type_distribution.len().to_string(),
            Style::default().fg(theme::TEXT),
        ),
    ]));
    device_lines.push(Line::from(vec![
        Span::styled("locations ", theme::dim_style()),
        Span::styled(
            d.location_distribution.len().to_string(),
            Style::default().fg(theme::TEXT),
        ),
    ]));
    for fetched in [&state.devices.load, &state.chat.load] {
        if let Some(line) = widgets::status_line(fetched, state.tick) {
            device_lines.push(line);
        }
    }
    f.render_widget(
        Paragraph::new(device_lines).block(card("Device Status")),
        lower[1],
    );

    f.render_widget(
        Paragraph::new(Span::styled("  [r] refresh", theme::hint_style())),
        rows[2],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_card_degrades_independently() {
        let mut st = DashboardState::new();
        let DashboardAction::Refresh(seqs) = st.refresh() else {
            panic!("expected refresh");
        };
        st.training.apply(
            seqs.training,
            Ok(TrainingStatistics {
                total_training_data: 42,
                ..TrainingStatistics::default()
            }),
        );
        st.devices.apply(seqs.devices, Err("HTTP 500".into()));
        st.chat.apply(seqs.chat, Err("timeout".into()));
        st.apply_health(seqs.health, Ok(()));

        assert_eq!(st.training.data.total_training_data, 42);
        assert_eq!(st.devices.data, DeviceStatistics::default());
        assert_eq!(st.health(), Health::Healthy);
    }

    #[test]
    fn failed_health_is_error() {
        let mut st = DashboardState::new();
        assert_eq!(st.health(), Health::Unknown);
        let DashboardAction::Refresh(seqs) = st.refresh() else {
            panic!()
        };
        st.apply_health(seqs.health, Err("connection refused".into()));
        assert_eq!(st.health(), Health::Error);
    }

    #[test]
    fn stale_refresh_ignored() {
        let mut st = DashboardState::new();
        let DashboardAction::Refresh(old) = st.refresh() else { panic!() };
        let DashboardAction::Refresh(new) = st.refresh() else { panic!() };
        st.chat.apply(
            new.chat,
            Ok(ChatStatistics {
                total_conversations: 9,
                ..ChatStatistics::default()
            }),
        );
        assert!(!st.chat.apply(old.chat, Ok(ChatStatistics::default())));
        assert_eq!(st.chat.data.total_conversations, 9);
    }
}
