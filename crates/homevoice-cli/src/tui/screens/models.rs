//! Model management: RASA status, trained models, training, loading,
//! a prediction console and the generated-artifact viewer.

use crate::tui::state::{step, Alert, Fetched, LoadState, Mutation, RequestSeq, TextField};
use crate::tui::theme;
use crate::tui::widgets;
use homevoice_types::model::{Artifact, Model, ModelStatus, Prediction, RasaStatus, TrainRequest};
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Train,
    Predict,
    Artifacts,
}

pub struct ModelsState {
    pub models: Vec<Model>,
    pub list_state: ListState,
    pub load: LoadState,
    pub seq: RequestSeq,
    pub rasa: Fetched<RasaStatus>,
    pub dialog: Option<Dialog>,
    pub train_name: TextField,
    /// The train request stream, tracked apart from list loads.
    pub train: LoadState,
    pub predict_input: TextField,
    pub predict: LoadState,
    pub prediction: Option<Prediction>,
    pub artifact: Artifact,
    pub artifact_body: Option<Result<String, String>>,
    pub artifact_scroll: u16,
    pub alert: Option<Alert>,
    pub status_msg: String,
    pub tick: usize,
}

pub enum ModelsAction {
    Continue,
    Refresh { list_seq: u64, status_seq: u64 },
    Train(TrainRequest),
    Load(i64),
    Predict(String),
    Generate(Artifact),
}

impl ModelsState {
    pub fn new() -> Self {
        Self {
            models: Vec::new(),
            list_state: ListState::default(),
            load: LoadState::Idle,
            seq: RequestSeq::default(),
            rasa: Fetched::default(),
            dialog: None,
            train_name: TextField::default(),
            train: LoadState::Idle,
            predict_input: TextField::default(),
            predict: LoadState::Idle,
            prediction: None,
            artifact: Artifact::Config,
            artifact_body: None,
            artifact_scroll: 0,
            alert: None,
            status_msg: String::new(),
            tick: 0,
        }
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn refresh(&mut self) -> ModelsAction {
        if !self.load.is_submitting() {
            self.load = LoadState::Loading;
        }
        ModelsAction::Refresh {
            list_seq: self.seq.next(),
            status_seq: self.rasa.begin(),
        }
    }

    /// Poll while a train request is outstanding or any model is training.
    pub fn should_poll(&self) -> bool {
        self.train.is_submitting() || self.models.iter().any(|m| m.status == ModelStatus::Training)
    }

    pub fn apply_list(&mut self, seq: u64, result: Result<Vec<Model>, String>) {
        if !self.seq.accept(seq) {
            return;
        }
        match result {
            Ok(models) => {
                self.models = models;
                if self.seq.settled() && !self.load.is_submitting() {
                    self.load = LoadState::Loaded;
                }
            }
            Err(e) => {
                self.models.clear();
                self.load = LoadState::Error(e);
            }
        }
        let n = self.models.len();
        self.list_state.select(match self.list_state.selected() {
            _ if n == 0 => None,
            Some(i) => Some(i.min(n - 1)),
            None => Some(0),
        });
    }

    pub fn apply_status(&mut self, seq: u64, result: Result<RasaStatus, String>) {
        self.rasa.apply(seq, result);
    }

    pub fn apply_prediction(&mut self, result: Result<Prediction, String>) {
        match result {
            Ok(p) => {
                self.prediction = Some(p);
                self.predict = LoadState::Loaded;
            }
            Err(e) => {
                self.prediction = None;
                self.predict = LoadState::Error(e);
            }
        }
    }

    pub fn apply_artifact(&mut self, artifact: Artifact, result: Result<String, String>) {
        // a newer selection supersedes this one
        if artifact == self.artifact {
            self.artifact_body = Some(result);
            self.artifact_scroll = 0;
        }
    }

    /// Returns `true` when list and status should be re-fetched.
    pub fn apply_mutation(&mut self, op: Mutation, result: Result<String, String>) -> bool {
        if op == Mutation::Train {
            self.train = match &result {
                Ok(_) => LoadState::Loaded,
                Err(e) => LoadState::Error(e.clone()),
            };
        } else {
            self.load = LoadState::Loaded;
        }
        match result {
            Ok(msg) => {
                self.status_msg = msg;
                true
            }
            Err(e) => {
                self.alert = Some(Alert::failure(op.label(), &e));
                // a failed train may still have left a model record behind
                op == Mutation::Train
            }
        }
    }

    pub fn selected(&self) -> Option<&Model> {
        self.list_state.selected().and_then(|i| self.models.get(i))
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ModelsAction {
        if self.alert.is_some() {
            if Alert::dismisses(&key) {
                self.alert = None;
            }
            return ModelsAction::Continue;
        }
        match self.dialog {
            Some(Dialog::Train) => return self.handle_train_key(key),
            Some(Dialog::Predict) => return self.handle_predict_key(key),
            Some(Dialog::Artifacts) => return self.handle_artifact_key(key),
            None => {}
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                let next = step(self.list_state.selected(), self.models.len(), false);
                self.list_state.select(next);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let next = step(self.list_state.selected(), self.models.len(), true);
                self.list_state.select(next);
            }
            KeyCode::Char('t') => {
                if self.train.is_submitting() {
                    self.alert = Some(Alert::new("Busy", "A training run is already in progress"));
                } else {
                    self.train_name.clear();
                    self.dialog = Some(Dialog::Train);
                }
            }
            KeyCode::Char('l') | KeyCode::Enter => {
                if let Some(m) = self.selected() {
                    if m.status != ModelStatus::Ready {
                        self.alert = Some(Alert::new(
                            "Not ready",
                            format!("Model '{}' is {}; only ready models can be loaded", m.name, m.status.label()),
                        ));
                    } else {
                        let id = m.id;
                        self.load = LoadState::Submitting;
                        return ModelsAction::Load(id);
                    }
                }
            }
            KeyCode::Char('p') => {
                self.dialog = Some(Dialog::Predict);
            }
            KeyCode::Char('g') => {
                self.dialog = Some(Dialog::Artifacts);
                if self.artifact_body.is_none() {
                    return ModelsAction::Generate(self.artifact);
                }
            }
            KeyCode::Char('r') => return self.refresh(),
            _ => {}
        }
        ModelsAction::Continue
    }

    fn handle_train_key(&mut self, key: KeyEvent) -> ModelsAction {
        match key.code {
            KeyCode::Esc => self.dialog = None,
            KeyCode::Enter => {
                let name = self.train_name.trimmed().to_string();
                if name.is_empty() {
                    self.alert = Some(Alert::new("Invalid input", "Please enter a model name"));
                    return ModelsAction::Continue;
                }
                self.dialog = None;
                self.train = LoadState::Submitting;
                return ModelsAction::Train(TrainRequest { model_name: name });
            }
            _ => {
                self.train_name.handle_key(&key);
            }
        }
        ModelsAction::Continue
    }

    fn handle_predict_key(&mut self, key: KeyEvent) -> ModelsAction {
        match key.code {
            KeyCode::Esc => self.dialog = None,
            KeyCode::Enter => {
                let text = self.predict_input.trimmed().to_string();
                if text.is_empty() || self.predict.is_submitting() {
                    return ModelsAction::Continue;
                }
                self.predict = LoadState::Submitting;
                return ModelsAction::Predict(text);
            }
            _ => {
                self.predict_input.handle_key(&key);
            }
        }
        ModelsAction::Continue
    }

    fn handle_artifact_key(&mut self, key: KeyEvent) -> ModelsAction {
        match key.code {
            KeyCode::Esc => self.dialog = None,
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                let cur = Artifact::ALL.iter().position(|a| *a == self.artifact);
                if let Some(i) = step(cur, Artifact::ALL.len(), key.code != KeyCode::Left) {
                    self.artifact = Artifact::ALL[i];
                    self.artifact_body = None;
                    return ModelsAction::Generate(self.artifact);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.artifact_scroll = self.artifact_scroll.saturating_add(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.artifact_scroll = self.artifact_scroll.saturating_sub(1);
            }
            KeyCode::Char('r') => {
                self.artifact_body = None;
                return ModelsAction::Generate(self.artifact);
            }
            _ => {}
        }
        ModelsAction::Continue
    }
}

// ── Drawing ─────────────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, area: Rect, state: &mut ModelsState) {
    let block = widgets::panel("Models");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(4), // rasa status
        Constraint::Length(1), // header
        Constraint::Min(3),    // list
        Constraint::Length(1), // status
        Constraint::Length(1), // hints
    ])
    .split(inner);

    draw_rasa_status(f, chunks[0], state);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!("  {:<6} {:<28} {:<10} {:<12} {}", "ID", "NAME", "STATUS", "SIZE", "CREATED"),
            theme::label_style(),
        ))),
        chunks[1],
    );

    if state.models.is_empty() {
        let msg = if state.load.is_loading() {
            "  Loading\u{2026}"
        } else {
            "  No trained models. Press [t] to train one."
        };
        f.render_widget(Paragraph::new(Span::styled(msg, theme::dim_style())), chunks[2]);
    } else {
        let items: Vec<ListItem> = state
            .models
            .iter()
            .map(|m| {
                let status = m.status.label();
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<6} ", m.id), theme::dim_style()),
                    Span::styled(
                        format!("{:<28} ", widgets::truncate(&m.name, 26)),
                        Style::default().fg(theme::TEXT),
                    ),
                    Span::styled(format!("{status:<10} "), theme::status_style(status)),
                    Span::styled(format!("{:<12} ", m.size_label()), theme::dim_style()),
                    Span::styled(
                        m.created_at.clone().unwrap_or_default(),
                        theme::hint_style(),
                    ),
                ]))
            })
            .collect();
        let list = List::new(items)
            .highlight_style(theme::selected_style())
            .highlight_symbol("> ");
        f.render_stateful_widget(list, chunks[2], &mut state.list_state);
    }

    let status = if state.train.is_submitting() {
        let spinner = theme::SPINNER_FRAMES[state.tick % theme::SPINNER_FRAMES.len()];
        Line::from(vec![
            Span::styled(format!("  {spinner} "), Style::default().fg(theme::YELLOW)),
            Span::styled("Training\u{2026}", theme::dim_style()),
        ])
    } else {
        widgets::status_line(&state.load, state.tick).unwrap_or_else(|| {
            Line::from(Span::styled(
                format!("  {}", state.status_msg),
                Style::default().fg(theme::GREEN),
            ))
        })
    };
    f.render_widget(Paragraph::new(status), chunks[3]);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "  [t]rain  [l]oad  [p]redict  [g]enerated files  [r]efresh",
            theme::hint_style(),
        ))),
        chunks[4],
    );

    match state.dialog {
        Some(Dialog::Train) => {
            let inner = widgets::modal(f, area, "Train Model", 50, 7);
            let mut lines = Vec::new();
            lines.extend(widgets::text_field_lines("Model name:", &state.train_name, true));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "[Enter] train  [Esc] cancel",
                theme::hint_style(),
            )));
            f.render_widget(Paragraph::new(lines), inner);
        }
        Some(Dialog::Predict) => draw_predict(f, area, state),
        Some(Dialog::Artifacts) => draw_artifacts(f, area, state),
        None => {}
    }
    if let Some(a) = &state.alert {
        widgets::draw_alert(f, area, a);
    }
}

fn draw_rasa_status(f: &mut Frame, area: Rect, state: &ModelsState) {
    let s = &state.rasa.data;
    let flag = |on: bool| {
        if on {
            Span::styled("yes", Style::default().fg(theme::GREEN))
        } else {
            Span::styled("no", Style::default().fg(theme::RED))
        }
    };
    let mut lines = vec![
        Line::from(vec![
            Span::styled("RASA  loaded: ", theme::dim_style()),
            flag(s.model_loaded),
            Span::styled("   ready: ", theme::dim_style()),
            flag(s.model_ready),
            Span::styled("   threshold: ", theme::dim_style()),
            Span::styled(
                format!("{:.2}", s.confidence_threshold),
                Style::default().fg(theme::CYAN),
            ),
        ]),
        Line::from(vec![
            Span::styled("model: ", theme::dim_style()),
            Span::styled(
                s.model_path.clone().unwrap_or_else(|| "-".to_string()),
                Style::default().fg(theme::TEXT),
            ),
        ]),
    ];
    if let Some(line) = widgets::status_line(&state.rasa.load, state.tick) {
        lines.push(line);
    }
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_predict(f: &mut Frame, area: Rect, state: &ModelsState) {
    let inner = widgets::modal(f, area, "Test Model", 70, 14);
    let mut lines = Vec::new();
    lines.extend(widgets::text_field_lines("Text:", &state.predict_input, true));
    lines.push(Line::from(""));
    match (&state.predict, &state.prediction) {
        (LoadState::Submitting, _) => {
            lines.push(Line::from(Span::styled("Predicting\u{2026}", theme::dim_style())));
        }
        (LoadState::Error(e), _) => {
            lines.push(Line::from(Span::styled(
                format!("Prediction failed: {e}"),
                Style::default().fg(theme::RED),
            )));
        }
        (_, Some(p)) => {
            lines.push(Line::from(vec![
                Span::styled("Intent: ", theme::dim_style()),
                Span::styled(
                    p.intent.clone().unwrap_or_else(|| "-".into()),
                    Style::default()
                        .fg(theme::PURPLE)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("   Confidence: ", theme::dim_style()),
                Span::styled(
                    p.confidence
                        .map(|c| format!("{:.1}%", c * 100.0))
                        .unwrap_or_else(|| "N/A".into()),
                    Style::default().fg(theme::CYAN),
                ),
            ]));
            if p.entities.is_empty() {
                lines.push(Line::from(Span::styled("No entities", theme::hint_style())));
            }
            for e in &p.entities {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {}: ", e.entity), theme::dim_style()),
                    Span::styled(e.value.clone(), Style::default().fg(theme::TEXT)),
                ]));
            }
        }
        (_, None) => {}
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("[Enter] predict  [Esc] close", theme::hint_style())));
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_artifacts(f: &mut Frame, area: Rect, state: &ModelsState) {
    let rect_h = area.height.saturating_sub(4).max(8);
    let inner = widgets::modal(f, area, "Generated Files", 80, rect_h);
    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .split(inner);

    let tabs: Vec<Span> = Artifact::ALL
        .iter()
        .flat_map(|a| {
            let style = if *a == state.artifact {
                theme::tab_active()
            } else {
                theme::tab_inactive()
            };
            [Span::styled(format!(" {} ", a.label()), style), Span::raw(" ")]
        })
        .collect();
    f.render_widget(Paragraph::new(Line::from(tabs)), rows[0]);

    let body = match &state.artifact_body {
        None => Paragraph::new(Span::styled("Generating\u{2026}", theme::dim_style())),
        Some(Ok(text)) => Paragraph::new(text.clone())
            .style(Style::default().fg(theme::TEXT))
            .scroll((state.artifact_scroll, 0)),
        Some(Err(e)) => Paragraph::new(Span::styled(
            format!("Generation failed: {e}"),
            Style::default().fg(theme::RED),
        ))
        .wrap(Wrap { trim: true }),
    };
    f.render_widget(body, rows[1]);

    f.render_widget(
        Paragraph::new(Span::styled(
            "[\u{2190}\u{2192}] file  [j/k] scroll  [r]egenerate  [Esc] close",
            theme::hint_style(),
        )),
        rows[2],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn model(id: i64, status: ModelStatus) -> Model {
        Model {
            id,
            name: format!("model_{id}"),
            status,
            file_size: Some(3 * 1024 * 1024),
            created_at: None,
        }
    }

    fn with_models(models: Vec<Model>) -> ModelsState {
        let mut st = ModelsState::new();
        let ModelsAction::Refresh { list_seq, status_seq } = st.refresh() else {
            panic!("expected refresh");
        };
        st.apply_list(list_seq, Ok(models));
        st.apply_status(status_seq, Ok(RasaStatus::default()));
        st
    }

    #[test]
    fn blank_model_name_alerts() {
        let mut st = ModelsState::new();
        st.handle_key(key(KeyCode::Char('t')));
        st.handle_key(key(KeyCode::Char(' ')));
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), ModelsAction::Continue));
        assert!(st.alert.is_some());
        assert_eq!(st.train, LoadState::Idle);
    }

    #[test]
    fn train_marks_in_flight_and_polls() {
        let mut st = ModelsState::new();
        st.handle_key(key(KeyCode::Char('t')));
        for c in "home_v2".chars() {
            st.handle_key(key(KeyCode::Char(c)));
        }
        match st.handle_key(key(KeyCode::Enter)) {
            ModelsAction::Train(req) => assert_eq!(req.model_name, "home_v2"),
            _ => panic!("expected train"),
        }
        assert!(st.should_poll());
        assert!(st.apply_mutation(Mutation::Train, Ok("Training finished".into())));
        assert!(!st.should_poll());
    }

    #[test]
    fn polls_while_a_model_is_training() {
        let st = with_models(vec![model(1, ModelStatus::Ready), model(2, ModelStatus::Training)]);
        assert!(st.should_poll());
        let idle = with_models(vec![model(1, ModelStatus::Ready)]);
        assert!(!idle.should_poll());
    }

    #[test]
    fn only_ready_models_load() {
        let mut st = with_models(vec![model(1, ModelStatus::Failed), model(2, ModelStatus::Ready)]);
        assert!(matches!(st.handle_key(key(KeyCode::Char('l'))), ModelsAction::Continue));
        assert!(st.alert.take().is_some());
        st.handle_key(key(KeyCode::Down));
        assert!(matches!(st.handle_key(key(KeyCode::Char('l'))), ModelsAction::Load(2)));
    }

    #[test]
    fn rejected_train_raises_alert() {
        let mut st = ModelsState::new();
        st.train = LoadState::Submitting;
        st.apply_mutation(Mutation::Train, Err("no training data".into()));
        assert_eq!(st.alert.unwrap().message, "Train failed: no training data");
        assert_eq!(st.train.error(), Some("no training data"));
    }

    #[test]
    fn predict_is_single_flight() {
        let mut st = ModelsState::new();
        st.handle_key(key(KeyCode::Char('p')));
        st.handle_key(key(KeyCode::Char('x')));
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), ModelsAction::Predict(_)));
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), ModelsAction::Continue));
        st.apply_prediction(Ok(Prediction::default()));
        assert_eq!(st.predict, LoadState::Loaded);
        st.apply_prediction(Err("RASA unavailable".into()));
        assert_eq!(st.predict.error(), Some("RASA unavailable"));
        assert!(st.prediction.is_none());
    }

    #[test]
    fn load_finishing_leaves_train_in_flight() {
        let mut st = with_models(vec![model(1, ModelStatus::Ready)]);
        st.train = LoadState::Submitting;
        assert!(matches!(st.handle_key(key(KeyCode::Char('l'))), ModelsAction::Load(1)));
        assert!(st.load.is_submitting());
        assert!(st.apply_mutation(Mutation::Load, Ok("Loaded model_1".into())));
        assert_eq!(st.load, LoadState::Loaded);
        assert!(st.train.is_submitting());
        assert!(st.should_poll());
        assert!(matches!(st.handle_key(key(KeyCode::Char('t'))), ModelsAction::Continue));
        assert!(st.alert.is_some());
    }

    #[test]
    fn stale_artifact_is_dropped() {
        let mut st = ModelsState::new();
        st.handle_key(key(KeyCode::Char('g')));
        st.handle_key(key(KeyCode::Right));
        assert_eq!(st.artifact, Artifact::TrainingData);
        st.apply_artifact(Artifact::Config, Ok("language: zh".into()));
        assert!(st.artifact_body.is_none());
        st.apply_artifact(Artifact::TrainingData, Ok("nlu: []".into()));
        assert_eq!(st.artifact_body, Some(Ok("nlu: []".to_string())));
    }
}
