//! LLM fallback configuration screen.

use crate::tui::state::{step, Alert, Confirm, Fetched, LoadState, Mutation, RequestSeq, TextField};
use crate::tui::theme;
use crate::tui::widgets;
use homevoice_types::llm::{
    mask_key, LlmConfig, LlmConfigInput, LlmStatus, LlmTestResult, Provider, DEFAULT_PRIORITY,
};
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

const FIELD_PROVIDER: usize = 0;
const FIELD_MODEL: usize = 1;
const FIELD_KEY: usize = 2;
const FIELD_BASE_URL: usize = 3;
const FIELD_PRIORITY: usize = 4;
const FIELD_ACTIVE: usize = 5;
const FIELD_COUNT: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct LlmForm {
    pub editing: Option<i64>,
    pub provider: String,
    pub model: TextField,
    pub api_key: TextField,
    pub base_url: TextField,
    pub priority: TextField,
    pub is_active: bool,
    pub field: usize,
}

impl LlmForm {
    fn from_input(editing: Option<i64>, input: LlmConfigInput) -> Self {
        Self {
            editing,
            provider: input.provider,
            model: TextField::with(input.model_name),
            api_key: TextField::with(input.api_key),
            base_url: TextField::with(input.base_url),
            priority: TextField::with(input.priority.to_string()),
            is_active: input.is_active,
            field: FIELD_PROVIDER,
        }
    }

    /// Collect the payload; an unparsable priority falls back to the default.
    pub fn input(&self) -> LlmConfigInput {
        LlmConfigInput {
            provider: self.provider.clone(),
            model_name: self.model.trimmed().to_string(),
            api_key: self.api_key.trimmed().to_string(),
            base_url: self.base_url.trimmed().to_string(),
            is_active: self.is_active,
            priority: self.priority.trimmed().parse().unwrap_or(DEFAULT_PRIORITY),
        }
    }
}

impl Default for LlmForm {
    fn default() -> Self {
        Self::from_input(None, LlmConfigInput::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Form,
    Test,
}

pub struct LlmState {
    pub configs: Vec<LlmConfig>,
    pub list_state: ListState,
    pub load: LoadState,
    pub seq: RequestSeq,
    pub status: Fetched<LlmStatus>,
    pub providers: Vec<Provider>,
    pub dialog: Option<Dialog>,
    pub form: LlmForm,
    pub confirm: Option<Confirm<i64>>,
    pub test_input: TextField,
    /// The test-console request stream, tracked apart from list loads.
    pub test: LoadState,
    pub test_result: Option<LlmTestResult>,
    pub alert: Option<Alert>,
    pub status_msg: String,
    pub tick: usize,
}

pub enum LlmAction {
    Continue,
    Refresh { list_seq: u64, status_seq: u64 },
    Create(LlmConfigInput),
    Update(i64, LlmConfigInput),
    Delete(i64),
    Toggle(i64),
    Test(String),
    Reload,
}

impl LlmState {
    pub fn new() -> Self {
        Self {
            configs: Vec::new(),
            list_state: ListState::default(),
            load: LoadState::Idle,
            seq: RequestSeq::default(),
            status: Fetched::default(),
            providers: Vec::new(),
            dialog: None,
            form: LlmForm::default(),
            confirm: None,
            test_input: TextField::default(),
            test: LoadState::Idle,
            test_result: None,
            alert: None,
            status_msg: String::new(),
            tick: 0,
        }
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn refresh(&mut self) -> LlmAction {
        self.load = LoadState::Loading;
        LlmAction::Refresh {
            list_seq: self.seq.next(),
            status_seq: self.status.begin(),
        }
    }

    pub fn apply_list(&mut self, seq: u64, result: Result<Vec<LlmConfig>, String>) {
        if !self.seq.accept(seq) {
            return;
        }
        match result {
            Ok(mut configs) => {
                configs.sort_by_key(|c| c.priority);
                self.configs = configs;
                if self.seq.settled() {
                    self.load = LoadState::Loaded;
                }
            }
            Err(e) => {
                self.configs.clear();
                self.load = LoadState::Error(e);
            }
        }
        let n = self.configs.len();
        self.list_state.select(match self.list_state.selected() {
            _ if n == 0 => None,
            Some(i) => Some(i.min(n - 1)),
            None => Some(0),
        });
    }

    pub fn apply_status(&mut self, seq: u64, result: Result<LlmStatus, String>) {
        self.status.apply(seq, result);
    }

    pub fn apply_providers(&mut self, result: Result<Vec<Provider>, String>) {
        self.providers = result.unwrap_or_default();
    }

    pub fn apply_test(&mut self, result: Result<LlmTestResult, String>) {
        match result {
            Ok(r) => {
                self.test_result = Some(r);
                self.test = LoadState::Loaded;
            }
            Err(e) => {
                self.test_result = None;
                self.test = LoadState::Error(e);
            }
        }
    }

    /// Returns `true` when list and status should be re-fetched.
    pub fn apply_mutation(&mut self, op: Mutation, result: Result<String, String>) -> bool {
        self.load = LoadState::Loaded;
        match result {
            Ok(msg) => {
                self.status_msg = msg;
                true
            }
            Err(e) => {
                self.alert = Some(Alert::failure(op.label(), &e));
                false
            }
        }
    }

    pub fn selected(&self) -> Option<&LlmConfig> {
        self.list_state.selected().and_then(|i| self.configs.get(i))
    }

    fn provider(&self, name: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Display name for a provider key, or the key itself when unlisted.
    pub fn provider_label<'a>(&'a self, name: &'a str) -> &'a str {
        self.provider(name).map_or(name, Provider::label)
    }

    pub fn open_create(&mut self) {
        self.form = LlmForm::default();
        self.dialog = Some(Dialog::Form);
    }

    pub fn open_edit(&mut self) {
        if let Some(c) = self.selected() {
            self.form = LlmForm::from_input(Some(c.id), LlmConfigInput::from(c));
            self.dialog = Some(Dialog::Form);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> LlmAction {
        if self.alert.is_some() {
            if Alert::dismisses(&key) {
                self.alert = None;
            }
            return LlmAction::Continue;
        }
        if let Some(confirm) = self.confirm.take() {
            return match confirm.resolve(&key) {
                Some(id) => {
                    self.load = LoadState::Submitting;
                    LlmAction::Delete(id)
                }
                None => LlmAction::Continue,
            };
        }
        match self.dialog {
            Some(Dialog::Form) => return self.handle_form_key(key),
            Some(Dialog::Test) => return self.handle_test_key(key),
            None => {}
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                let next = step(self.list_state.selected(), self.configs.len(), false);
                self.list_state.select(next);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let next = step(self.list_state.selected(), self.configs.len(), true);
                self.list_state.select(next);
            }
            KeyCode::Char('n') => self.open_create(),
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit(),
            KeyCode::Char('d') => {
                if let Some(c) = self.selected() {
                    self.confirm = Some(Confirm::new(
                        format!(
                            "Delete {} / {}?",
                            self.provider_label(&c.provider),
                            c.model_name
                        ),
                        c.id,
                    ));
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('a') => {
                if let Some(c) = self.selected() {
                    let id = c.id;
                    self.load = LoadState::Submitting;
                    return LlmAction::Toggle(id);
                }
            }
            KeyCode::Char('t') => self.dialog = Some(Dialog::Test),
            KeyCode::Char('R') => {
                self.load = LoadState::Submitting;
                return LlmAction::Reload;
            }
            KeyCode::Char('r') => return self.refresh(),
            _ => {}
        }
        LlmAction::Continue
    }

    fn cycle_provider(&mut self, forward: bool) {
        let cur = self.providers.iter().position(|p| p.name == self.form.provider);
        let Some(i) = step(cur, self.providers.len(), forward) else {
            return;
        };
        let p = &self.providers[i];
        self.form.provider = p.name.clone();
        if let Some(url) = &p.default_base_url {
            self.form.base_url.set(url.clone());
        }
        self.form.model.set(p.models.first().cloned().unwrap_or_default());
    }

    fn cycle_model(&mut self, forward: bool) {
        let Some(models) = self.provider(&self.form.provider).map(|p| p.models.clone()) else {
            return;
        };
        let cur = models.iter().position(|m| m == self.form.model.trimmed());
        if let Some(i) = step(cur, models.len(), forward) {
            self.form.model.set(models[i].clone());
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> LlmAction {
        let field = self.form.field;
        match key.code {
            KeyCode::Esc => self.dialog = None,
            KeyCode::Tab | KeyCode::Down => self.form.field = (field + 1) % FIELD_COUNT,
            KeyCode::BackTab | KeyCode::Up => {
                self.form.field = (field + FIELD_COUNT - 1) % FIELD_COUNT;
            }
            KeyCode::Left | KeyCode::Right => {
                let forward = key.code == KeyCode::Right;
                match field {
                    FIELD_PROVIDER => self.cycle_provider(forward),
                    FIELD_MODEL => self.cycle_model(forward),
                    FIELD_ACTIVE => self.form.is_active = !self.form.is_active,
                    _ => {}
                }
            }
            KeyCode::Char(' ') if field == FIELD_ACTIVE => {
                self.form.is_active = !self.form.is_active;
            }
            KeyCode::Enter => {
                let input = self.form.input();
                if input.provider.is_empty() || input.model_name.is_empty() {
                    self.alert = Some(Alert::new("Invalid input", "Provider and model are required"));
                    return LlmAction::Continue;
                }
                self.dialog = None;
                self.load = LoadState::Submitting;
                return match self.form.editing {
                    Some(id) => LlmAction::Update(id, input),
                    None => LlmAction::Create(input),
                };
            }
            _ => {
                let target = match field {
                    FIELD_MODEL => Some(&mut self.form.model),
                    FIELD_KEY => Some(&mut self.form.api_key),
                    FIELD_BASE_URL => Some(&mut self.form.base_url),
                    FIELD_PRIORITY => Some(&mut self.form.priority),
                    _ => None,
                };
                if let Some(t) = target {
                    t.handle_key(&key);
                }
            }
        }
        LlmAction::Continue
    }

    fn handle_test_key(&mut self, key: KeyEvent) -> LlmAction {
        match key.code {
            KeyCode::Esc => self.dialog = None,
            KeyCode::Enter => {
                let text = self.test_input.trimmed().to_string();
                if text.is_empty() {
                    self.alert = Some(Alert::new("Invalid input", "Please enter test text"));
                    return LlmAction::Continue;
                }
                if self.test.is_submitting() {
                    return LlmAction::Continue;
                }
                self.test = LoadState::Submitting;
                self.test_result = None;
                return LlmAction::Test(text);
            }
            _ => {
                self.test_input.handle_key(&key);
            }
        }
        LlmAction::Continue
    }
}

// ── Drawing ─────────────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, area: Rect, state: &mut LlmState) {
    let block = widgets::panel("LLM Configuration");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(2), // status
        Constraint::Length(1), // header
        Constraint::Min(3),    // list
        Constraint::Length(1), // status msg
        Constraint::Length(1), // hints
    ])
    .split(inner);

    let st = &state.status.data;
    let mut status_lines = vec![Line::from(vec![
        Span::styled("Active configs: ", theme::dim_style()),
        Span::styled(
            st.active_configs_count.to_string(),
            Style::default().fg(theme::GREEN),
        ),
        Span::styled("   Providers: ", theme::dim_style()),
        Span::styled(
            if st.active_providers.is_empty() {
                "-".to_string()
            } else {
                st.active_providers.join(", ")
            },
            Style::default().fg(theme::CYAN),
        ),
    ])];
    if let Some(line) = widgets::status_line(&state.status.load, state.tick) {
        status_lines.push(line);
    }
    f.render_widget(Paragraph::new(status_lines), chunks[0]);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(
                "  {:<4} {:<14} {:<24} {:<16} {:<8} {}",
                "PRI", "PROVIDER", "MODEL", "API KEY", "STATE", "BASE URL"
            ),
            theme::label_style(),
        ))),
        chunks[1],
    );

    if state.configs.is_empty() {
        let msg = if state.load.is_loading() {
            "  Loading\u{2026}"
        } else {
            "  No LLM configs. Press [n] to add one."
        };
        f.render_widget(Paragraph::new(Span::styled(msg, theme::dim_style())), chunks[2]);
    } else {
        let items: Vec<ListItem> = state
            .configs
            .iter()
            .map(|c| {
                let active = if c.is_active { "active" } else { "off" };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<4} ", c.priority), theme::dim_style()),
                    Span::styled(
                        format!(
                            "{:<14} ",
                            widgets::truncate(state.provider_label(&c.provider), 12)
                        ),
                        Style::default().fg(theme::PURPLE),
                    ),
                    Span::styled(
                        format!("{:<24} ", widgets::truncate(&c.model_name, 22)),
                        Style::default().fg(theme::TEXT),
                    ),
                    Span::styled(
                        format!("{:<16} ", widgets::truncate(&mask_key(&c.api_key), 14)),
                        theme::dim_style(),
                    ),
                    Span::styled(format!("{active:<8} "), theme::status_style(active)),
                    Span::styled(widgets::truncate(&c.base_url, 40), theme::hint_style()),
                ]))
            })
            .collect();
        let list = List::new(items)
            .highlight_style(theme::selected_style())
            .highlight_symbol("> ");
        f.render_stateful_widget(list, chunks[2], &mut state.list_state);
    }

    let status = widgets::status_line(&state.load, state.tick).unwrap_or_else(|| {
        Line::from(Span::styled(
            format!("  {}", state.status_msg),
            Style::default().fg(theme::GREEN),
        ))
    });
    f.render_widget(Paragraph::new(status), chunks[3]);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "  [n]ew  [e]dit  [d]elete  [space] toggle  [t]est  [R]eload  [r]efresh",
            theme::hint_style(),
        ))),
        chunks[4],
    );

    match state.dialog {
        Some(Dialog::Form) => draw_form(f, area, state),
        Some(Dialog::Test) => draw_test(f, area, state),
        None => {}
    }
    if let Some(c) = &state.confirm {
        widgets::draw_confirm(f, area, &c.prompt);
    }
    if let Some(a) = &state.alert {
        widgets::draw_alert(f, area, a);
    }
}

fn draw_form(f: &mut Frame, area: Rect, state: &LlmState) {
    let form = &state.form;
    let title = if form.editing.is_some() {
        "Edit LLM Config"
    } else {
        "New LLM Config"
    };
    let inner = widgets::modal(f, area, title, 60, 17);
    let provider_label = if form.provider.is_empty() {
        "(select)"
    } else {
        state.provider_label(&form.provider)
    };
    let mut lines = Vec::new();
    lines.extend(widgets::choice_lines(
        "Provider:",
        provider_label,
        form.field == FIELD_PROVIDER,
    ));
    lines.extend(widgets::text_field_lines(
        "Model (\u{2190}\u{2192} pick or type):",
        &form.model,
        form.field == FIELD_MODEL,
    ));
    lines.extend(widgets::field_lines(
        "API key:",
        &mask_key(&form.api_key.value),
        form.field == FIELD_KEY,
    ));
    lines.extend(widgets::text_field_lines(
        "Base URL:",
        &form.base_url,
        form.field == FIELD_BASE_URL,
    ));
    lines.extend(widgets::text_field_lines(
        "Priority:",
        &form.priority,
        form.field == FIELD_PRIORITY,
    ));
    lines.extend(widgets::choice_lines(
        "Active:",
        if form.is_active { "yes" } else { "no" },
        form.field == FIELD_ACTIVE,
    ));
    lines.push(Line::from(Span::styled(
        "[Tab] field  [Enter] save  [Esc] cancel",
        theme::hint_style(),
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_test(f: &mut Frame, area: Rect, state: &LlmState) {
    let inner = widgets::modal(f, area, "Test LLM", 70, 14);
    let mut lines = Vec::new();
    lines.extend(widgets::text_field_lines("Text:", &state.test_input, true));
    lines.push(Line::from(""));
    match (&state.test, &state.test_result) {
        (LoadState::Submitting, _) => {
            lines.push(Line::from(Span::styled("Waiting for reply\u{2026}", theme::dim_style())));
        }
        (LoadState::Error(e), _) => {
            lines.push(Line::from(Span::styled(
                format!("Test failed: {e}"),
                Style::default().fg(theme::RED),
            )));
        }
        (_, Some(r)) => {
            let via = [r.provider.as_deref(), r.model.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" / ");
            if !via.is_empty() {
                lines.push(Line::from(Span::styled(format!("via {via}"), theme::dim_style())));
            }
            lines.push(Line::from(Span::styled(
                r.response.clone().unwrap_or_default(),
                Style::default().fg(theme::TEXT),
            )));
        }
        (_, None) => {}
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("[Enter] send  [Esc] close", theme::hint_style())));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn config(id: i64, provider: &str, priority: i64) -> LlmConfig {
        LlmConfig {
            id,
            provider: provider.into(),
            model_name: "qwen-turbo".into(),
            api_key: "sk-abcdef123456".into(),
            base_url: "https://dashscope.aliyuncs.com".into(),
            is_active: true,
            priority,
            created_at: None,
        }
    }

    fn providers() -> Vec<Provider> {
        vec![
            Provider {
                name: "qwen".into(),
                display_name: "通义千问".into(),
                default_base_url: Some("https://dashscope.aliyuncs.com/api/v1".into()),
                models: vec!["qwen-turbo".into(), "qwen-plus".into()],
            },
            Provider {
                name: "deepseek".into(),
                display_name: String::new(),
                default_base_url: Some("https://api.deepseek.com".into()),
                models: vec!["deepseek-chat".into()],
            },
        ]
    }

    fn loaded(configs: Vec<LlmConfig>) -> LlmState {
        let mut st = LlmState::new();
        st.apply_providers(Ok(providers()));
        let LlmAction::Refresh { list_seq, .. } = st.refresh() else {
            panic!("expected refresh");
        };
        st.apply_list(list_seq, Ok(configs));
        st
    }

    #[test]
    fn create_form_uses_defaults() {
        let mut st = loaded(vec![config(1, "qwen", 1)]);
        st.handle_key(key(KeyCode::Char('e')));
        assert_eq!(st.form.editing, Some(1));
        st.handle_key(key(KeyCode::Esc));
        st.handle_key(key(KeyCode::Char('n')));
        assert_eq!(st.form, LlmForm::default());
        assert_eq!(st.form.priority.value, "10");
        assert!(st.form.is_active);
        assert!(st.form.provider.is_empty());
    }

    #[test]
    fn provider_cycle_prefills_base_url_and_model() {
        let mut st = loaded(vec![]);
        st.handle_key(key(KeyCode::Char('n')));
        st.handle_key(key(KeyCode::Right));
        assert_eq!(st.form.provider, "deepseek");
        assert_eq!(st.form.base_url.value, "https://api.deepseek.com");
        assert_eq!(st.form.model.value, "deepseek-chat");
    }

    #[test]
    fn bad_priority_falls_back() {
        let mut form = LlmForm::default();
        form.provider = "qwen".into();
        form.model.set("qwen-plus");
        form.priority.set("high");
        assert_eq!(form.input().priority, DEFAULT_PRIORITY);
        form.priority.set(" 3 ");
        assert_eq!(form.input().priority, 3);
    }

    #[test]
    fn rows_show_provider_display_names() {
        let mut st = loaded(vec![config(1, "qwen", 1), config(2, "local", 2)]);
        assert_eq!(st.provider_label("qwen"), "通义千问");
        assert_eq!(st.provider_label("deepseek"), "deepseek");
        assert_eq!(st.provider_label("local"), "local");
        st.handle_key(key(KeyCode::Char('d')));
        assert_eq!(st.confirm.as_ref().unwrap().prompt, "Delete 通义千问 / qwen-turbo?");
    }

    #[test]
    fn list_sorted_by_priority() {
        let st = loaded(vec![config(1, "qwen", 5), config(2, "deepseek", 1)]);
        assert_eq!(st.configs[0].id, 2);
    }

    #[test]
    fn toggle_and_delete_flow() {
        let mut st = loaded(vec![config(7, "qwen", 1)]);
        assert!(matches!(st.handle_key(key(KeyCode::Char(' '))), LlmAction::Toggle(7)));
        st.handle_key(key(KeyCode::Char('d')));
        assert!(matches!(st.handle_key(key(KeyCode::Esc)), LlmAction::Continue));
        st.handle_key(key(KeyCode::Char('d')));
        assert!(matches!(st.handle_key(key(KeyCode::Char('y'))), LlmAction::Delete(7)));
    }

    #[test]
    fn blank_test_text_alerts() {
        let mut st = LlmState::new();
        st.handle_key(key(KeyCode::Char('t')));
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), LlmAction::Continue));
        assert!(st.alert.is_some());
    }

    #[test]
    fn test_error_is_inline() {
        let mut st = LlmState::new();
        st.handle_key(key(KeyCode::Char('t')));
        for c in "你好".chars() {
            st.handle_key(key(KeyCode::Char(c)));
        }
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), LlmAction::Test(_)));
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), LlmAction::Continue));
        st.apply_test(Err("no active LLM".into()));
        assert!(st.alert.is_none());
        assert_eq!(st.test.error(), Some("no active LLM"));
        assert_eq!(st.load, LoadState::Idle);
    }
}
