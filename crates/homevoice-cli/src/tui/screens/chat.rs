//! Chat test view: a local conversation log against the backend pipeline.
//!
//! The log lives only in this view. Statistics are derived from it on every
//! render, and a backend failure becomes a single apology message rather than
//! an alert.

use crate::tui::state::{Alert, Confirm, LoadState, Mutation, TextField};
use crate::tui::theme;
use crate::tui::widgets;
use chrono::{Local, Utc};
use homevoice_types::chat::{ChatMessage, ChatReply, ChatRequest, Sender, QUICK_PHRASES};
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;

/// Counts derived from the log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatCounts {
    pub total: usize,
    pub user: usize,
    pub bot: usize,
    pub rasa: usize,
    pub llm: usize,
}

pub struct ChatState {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    last_id: i64,
    pub input: TextField,
    pub load: LoadState,
    pub phrase: Option<usize>,
    /// Lines scrolled up from the bottom.
    pub scroll_up: u16,
    pub confirm: Option<Confirm<String>>,
    pub alert: Option<Alert>,
    pub status_msg: String,
    pub tick: usize,
}

pub enum ChatAction {
    Continue,
    Send(ChatRequest),
    ClearHistory(String),
}

impl ChatState {
    pub fn new() -> Self {
        Self::with_session(format!("session_{}", Utc::now().timestamp_millis()))
    }

    pub fn with_session(session_id: String) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            last_id: 0,
            input: TextField::default(),
            load: LoadState::Idle,
            phrase: None,
            scroll_up: 0,
            confirm: None,
            alert: None,
            status_msg: String::new(),
            tick: 0,
        }
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn is_pending(&self) -> bool {
        self.load.is_submitting()
    }

    fn next_id(&mut self) -> i64 {
        // wall-clock ids can collide within one millisecond
        let now = Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    pub fn counts(&self) -> ChatCounts {
        let mut c = ChatCounts {
            total: self.messages.len(),
            ..ChatCounts::default()
        };
        for m in &self.messages {
            match m.sender {
                Sender::User => c.user += 1,
                Sender::Bot => c.bot += 1,
            }
            if m.handled_by_rasa() {
                c.rasa += 1;
            }
            if m.handled_by_llm() {
                c.llm += 1;
            }
        }
        c
    }

    /// Queue the current input for sending. Blank input or a send already in
    /// flight changes nothing.
    pub fn send(&mut self) -> ChatAction {
        let text = self.input.trimmed().to_string();
        if text.is_empty() || self.is_pending() {
            return ChatAction::Continue;
        }
        let id = self.next_id();
        self.messages.push(ChatMessage::user(id, text.clone()));
        self.input.clear();
        self.phrase = None;
        self.scroll_up = 0;
        self.load = LoadState::Submitting;
        ChatAction::Send(ChatRequest {
            text,
            session_id: self.session_id.clone(),
        })
    }

    pub fn apply_reply(&mut self, result: Result<ChatReply, String>) {
        self.load = LoadState::Loaded;
        let id = self.next_id();
        let msg = match result {
            Ok(reply) => ChatMessage::bot(id, reply),
            Err(_) => ChatMessage::apology(id),
        };
        self.messages.push(msg);
        self.scroll_up = 0;
    }

    pub fn apply_history_cleared(&mut self, result: Result<String, String>) {
        match result {
            Ok(msg) => self.status_msg = msg,
            Err(e) => self.alert = Some(Alert::failure(Mutation::ClearHistory.label(), &e)),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ChatAction {
        if self.alert.is_some() {
            if Alert::dismisses(&key) {
                self.alert = None;
            }
            return ChatAction::Continue;
        }
        if let Some(confirm) = self.confirm.take() {
            return match confirm.resolve(&key) {
                Some(session) => ChatAction::ClearHistory(session),
                None => ChatAction::Continue,
            };
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => return self.send(),
            KeyCode::Char('l') if ctrl => {
                self.messages.clear();
                self.scroll_up = 0;
                self.status_msg = "Conversation cleared".to_string();
            }
            KeyCode::Char('d') if ctrl => {
                self.confirm = Some(Confirm::new(
                    format!("Delete stored history for {}?", self.session_id),
                    self.session_id.clone(),
                ));
            }
            KeyCode::Char('p') if ctrl => {
                let next = self.phrase.map_or(0, |i| (i + 1) % QUICK_PHRASES.len());
                self.phrase = Some(next);
                self.input.set(QUICK_PHRASES[next]);
            }
            KeyCode::PageUp | KeyCode::Up => {
                self.scroll_up = self.scroll_up.saturating_add(if key.code == KeyCode::Up { 1 } else { 10 });
            }
            KeyCode::PageDown | KeyCode::Down => {
                self.scroll_up = self.scroll_up.saturating_sub(if key.code == KeyCode::Down { 1 } else { 10 });
            }
            _ if ctrl => {}
            _ => {
                self.input.handle_key(&key);
            }
        }
        ChatAction::Continue
    }
}

/// Color band for a classification confidence.
pub fn confidence_color(confidence: f64) -> Color {
    if confidence >= 0.8 {
        theme::GREEN
    } else if confidence >= 0.6 {
        theme::YELLOW
    } else {
        theme::RED
    }
}

// ── Drawing ─────────────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, area: Rect, state: &mut ChatState) {
    let cols = Layout::horizontal([Constraint::Min(40), Constraint::Length(30)]).split(area);

    let block = widgets::panel("Chat Test");
    let inner = block.inner(cols[0]);
    f.render_widget(block, cols[0]);

    let rows = Layout::vertical([
        Constraint::Min(3),    // log
        Constraint::Length(1), // status
        Constraint::Length(2), // input
        Constraint::Length(1), // hints
    ])
    .split(inner);

    draw_log(f, rows[0], state);

    let status = if state.is_pending() {
        let spinner = theme::SPINNER_FRAMES[state.tick % theme::SPINNER_FRAMES.len()];
        Line::from(vec![
            Span::styled(format!("{spinner} "), Style::default().fg(theme::CYAN)),
            Span::styled("Thinking\u{2026}", theme::dim_style()),
        ])
    } else {
        Line::from(Span::styled(state.status_msg.clone(), theme::dim_style()))
    };
    f.render_widget(Paragraph::new(status), rows[1]);

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("> ", theme::label_style()),
            Span::styled(
                format!("{}\u{2588}", state.input.value),
                Style::default().fg(theme::TEXT),
            ),
        ]))
        .wrap(Wrap { trim: false }),
        rows[2],
    );

    f.render_widget(
        Paragraph::new(Span::styled(
            "[Enter] send  [Ctrl+P] quick phrase  [Ctrl+L] clear  [Ctrl+D] delete stored  [\u{2191}\u{2193}] scroll",
            theme::hint_style(),
        )),
        rows[3],
    );

    draw_sidebar(f, cols[1], state);

    if let Some(c) = &state.confirm {
        widgets::draw_confirm(f, area, &c.prompt);
    }
    if let Some(a) = &state.alert {
        widgets::draw_alert(f, area, a);
    }
}

fn draw_log(f: &mut Frame, area: Rect, state: &ChatState) {
    if state.messages.is_empty() {
        f.render_widget(
            Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "  Type a command, e.g. 打开客厅灯, or press Ctrl+P.",
                    theme::dim_style(),
                )),
            ]),
            area,
        );
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for m in &state.messages {
        let time = m.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string();
        match m.sender {
            Sender::User => {
                lines.push(Line::from(vec![
                    Span::styled(
                        "You ",
                        Style::default()
                            .fg(theme::CYAN)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(time, theme::hint_style()),
                ]));
                lines.push(Line::from(Span::styled(
                    format!("  {}", m.text),
                    Style::default().fg(theme::TEXT),
                )));
            }
            Sender::Bot => {
                let mut header = vec![
                    Span::styled(
                        "Bot ",
                        Style::default()
                            .fg(theme::PURPLE)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(time, theme::hint_style()),
                ];
                if let Some(model) = &m.model_used {
                    header.push(Span::styled(format!("  [{model}]"), theme::dim_style()));
                }
                lines.push(Line::from(header));
                let text_style = if m.error {
                    Style::default().fg(theme::RED)
                } else {
                    Style::default().fg(theme::TEXT)
                };
                lines.push(Line::from(Span::styled(format!("  {}", m.text), text_style)));

                let mut meta = Vec::new();
                if let Some(intent) = &m.intent {
                    meta.push(Span::styled(format!("  intent: {intent}"), theme::dim_style()));
                }
                if let Some(c) = m.confidence {
                    meta.push(Span::styled(
                        format!("  {:.1}%", c * 100.0),
                        Style::default().fg(confidence_color(c)),
                    ));
                }
                if !m.entities.is_empty() {
                    let ents: Vec<String> = m
                        .entities
                        .iter()
                        .map(|e| format!("{}={}", e.entity, e.value))
                        .collect();
                    meta.push(Span::styled(format!("  {}", ents.join(" ")), theme::hint_style()));
                }
                if !meta.is_empty() {
                    lines.push(Line::from(meta));
                }
            }
        }
        lines.push(Line::from(""));
    }

    // Approximate wrapped height for bottom anchoring.
    let width = area.width.max(1) as usize;
    let height: usize = lines
        .iter()
        .map(|l| l.width().max(1).div_ceil(width))
        .sum();
    let overflow = height.saturating_sub(area.height as usize);
    let offset = (overflow as u16).saturating_sub(state.scroll_up);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((offset, 0)),
        area,
    );
}

fn draw_sidebar(f: &mut Frame, area: Rect, state: &ChatState) {
    let block = widgets::panel("Session");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let c = state.counts();
    let row = |label: &'static str, n: usize, color: Color| {
        Line::from(vec![
            Span::styled(format!("{label:<10}"), theme::dim_style()),
            Span::styled(n.to_string(), Style::default().fg(color)),
        ])
    };
    let mut lines = vec![
        Line::from(Span::styled(
            widgets::truncate(&state.session_id, inner.width as usize),
            theme::hint_style(),
        )),
        Line::from(""),
        row("Messages", c.total, theme::TEXT),
        row("You", c.user, theme::CYAN),
        row("Bot", c.bot, theme::PURPLE),
        row("RASA", c.rasa, theme::GREEN),
        row("LLM", c.llm, theme::YELLOW),
        Line::from(""),
        Line::from(Span::styled("Quick phrases", theme::label_style())),
    ];
    for (i, p) in QUICK_PHRASES.iter().enumerate() {
        let style = if state.phrase == Some(i) {
            theme::selected_style()
        } else {
            theme::dim_style()
        };
        lines.push(Line::from(Span::styled(format!("  {p}"), style)));
    }
    f.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use homevoice_types::chat::APOLOGY;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn typed(st: &mut ChatState, text: &str) {
        for c in text.chars() {
            st.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn blank_send_is_noop() {
        let mut st = ChatState::with_session("session_1".into());
        typed(&mut st, "   ");
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), ChatAction::Continue));
        assert!(st.messages.is_empty());
        assert!(!st.is_pending());
    }

    #[test]
    fn second_send_while_pending_is_noop() {
        let mut st = ChatState::with_session("session_1".into());
        typed(&mut st, "打开客厅灯");
        match st.handle_key(key(KeyCode::Enter)) {
            ChatAction::Send(req) => {
                assert_eq!(req.text, "打开客厅灯");
                assert_eq!(req.session_id, "session_1");
            }
            _ => panic!("expected send"),
        }
        assert_eq!(st.messages.len(), 1);
        assert!(st.input.value.is_empty());

        typed(&mut st, "再见");
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), ChatAction::Continue));
        assert_eq!(st.messages.len(), 1);
        assert_eq!(st.input.value, "再见");
    }

    #[test]
    fn failure_appends_one_apology() {
        let mut st = ChatState::with_session("session_1".into());
        typed(&mut st, "你好");
        st.send();
        st.apply_reply(Err("HTTP 500".into()));
        assert_eq!(st.messages.len(), 2);
        let bot = &st.messages[1];
        assert_eq!(bot.sender, Sender::Bot);
        assert!(bot.error);
        assert_eq!(bot.text, APOLOGY);
        assert!(!st.is_pending());
    }

    #[test]
    fn reply_counts_by_handler() {
        let mut st = ChatState::with_session("s".into());
        typed(&mut st, "你好");
        st.send();
        st.apply_reply(Ok(ChatReply {
            response: "您好".into(),
            intent: Some("greet".into()),
            confidence: Some(0.95),
            model_used: Some("rasa".into()),
            ..ChatReply::default()
        }));
        typed(&mut st, "讲个笑话");
        st.send();
        st.apply_reply(Ok(ChatReply {
            response: "好的".into(),
            model_used: Some("llm_qwen".into()),
            ..ChatReply::default()
        }));
        assert_eq!(
            st.counts(),
            ChatCounts {
                total: 4,
                user: 2,
                bot: 2,
                rasa: 1,
                llm: 1
            }
        );
    }

    #[test]
    fn ids_strictly_increase() {
        let mut st = ChatState::with_session("s".into());
        for _ in 0..5 {
            typed(&mut st, "x");
            st.send();
            st.apply_reply(Err(String::new()));
        }
        assert!(st.messages.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn ctrl_l_clears_locally_and_ctrl_d_confirms() {
        let mut st = ChatState::with_session("session_9".into());
        typed(&mut st, "你好");
        st.send();
        st.apply_reply(Err(String::new()));
        assert!(matches!(st.handle_key(ctrl('l')), ChatAction::Continue));
        assert!(st.messages.is_empty());

        st.handle_key(ctrl('d'));
        match st.handle_key(key(KeyCode::Char('y'))) {
            ChatAction::ClearHistory(id) => assert_eq!(id, "session_9"),
            _ => panic!("expected clear"),
        }
    }

    #[test]
    fn quick_phrases_cycle() {
        let mut st = ChatState::with_session("s".into());
        st.handle_key(ctrl('p'));
        assert_eq!(st.input.value, QUICK_PHRASES[0]);
        st.handle_key(ctrl('p'));
        assert_eq!(st.input.value, QUICK_PHRASES[1]);
    }

    #[test]
    fn session_id_is_prefixed() {
        assert!(ChatState::new().session_id.starts_with("session_"));
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(confidence_color(0.8), theme::GREEN);
        assert_eq!(confidence_color(0.65), theme::YELLOW);
        assert_eq!(confidence_color(0.3), theme::RED);
    }
}
