//! Interactive console: tab bar over six screens, blocking gateway calls on
//! worker threads, results folded back in on the UI thread.

pub mod event;
pub mod screens;
pub mod state;
pub mod theme;
pub mod widgets;

use event::AppEvent;
use homevoice_client::Gateway;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use screens::chat::{ChatAction, ChatState};
use screens::dashboard::{DashboardAction, DashboardState};
use screens::devices::{DevicesAction, DevicesState};
use screens::llm::{LlmAction, LlmState};
use screens::models::{ModelsAction, ModelsState};
use screens::training::{TrainingAction, TrainingState};
use state::POLL_TICKS;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Dashboard,
    Training,
    Models,
    Llm,
    Devices,
    Chat,
}

const TABS: &[Tab] = &[
    Tab::Dashboard,
    Tab::Training,
    Tab::Models,
    Tab::Llm,
    Tab::Devices,
    Tab::Chat,
];

impl Tab {
    fn label(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Training => "Training",
            Tab::Models => "Models",
            Tab::Llm => "LLM",
            Tab::Devices => "Devices",
            Tab::Chat => "Chat",
        }
    }

    fn index(self) -> usize {
        TABS.iter().position(|&t| t == self).unwrap_or(0)
    }
}

struct App {
    gw: Arc<Gateway>,
    tx: mpsc::Sender<AppEvent>,
    export_dir: PathBuf,
    active_tab: Tab,
    should_quit: bool,
    ctrl_c_pending: bool,
    ctrl_c_tick: usize,
    tick_count: usize,
    last_poll: usize,

    dashboard: DashboardState,
    training: TrainingState,
    models: ModelsState,
    llm: LlmState,
    devices: DevicesState,
    chat: ChatState,
}

impl App {
    fn new(gw: Arc<Gateway>, export_dir: PathBuf, tx: mpsc::Sender<AppEvent>) -> Self {
        Self {
            gw,
            tx,
            export_dir,
            active_tab: Tab::Dashboard,
            should_quit: false,
            ctrl_c_pending: false,
            ctrl_c_tick: 0,
            tick_count: 0,
            last_poll: 0,
            dashboard: DashboardState::new(),
            training: TrainingState::new(),
            models: ModelsState::new(),
            llm: LlmState::new(),
            devices: DevicesState::new(),
            chat: ChatState::new(),
        }
    }

    // ─── Events ──────────────────────────────────────────────────────────────

    fn handle_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => self.handle_tick(),

            AppEvent::DashTraining { seq, result } => {
                self.dashboard.training.apply(seq, result);
            }
            AppEvent::DashDevices { seq, result } => {
                self.dashboard.devices.apply(seq, result);
            }
            AppEvent::DashChat { seq, result } => {
                self.dashboard.chat.apply(seq, result);
            }
            AppEvent::DashHealth { seq, result } => self.dashboard.apply_health(seq, result),

            AppEvent::ExamplesLoaded { seq, result } => self.training.apply_list(seq, result),
            AppEvent::IntentsLoaded(result) => self.training.apply_intents(result),
            AppEvent::TrainingMutated { op, result } => {
                if self.training.apply_mutation(op, result) {
                    self.refresh_training();
                }
            }

            AppEvent::ModelsLoaded { seq, result } => self.models.apply_list(seq, result),
            AppEvent::RasaStatusLoaded { seq, result } => self.models.apply_status(seq, result),
            AppEvent::PredictionReady(result) => self.models.apply_prediction(result),
            AppEvent::ArtifactReady { artifact, result } => {
                self.models.apply_artifact(artifact, result);
            }
            AppEvent::ModelsMutated { op, result } => {
                if self.models.apply_mutation(op, result) {
                    self.refresh_models();
                }
            }

            AppEvent::LlmConfigsLoaded { seq, result } => self.llm.apply_list(seq, result),
            AppEvent::LlmStatusLoaded { seq, result } => self.llm.apply_status(seq, result),
            AppEvent::ProvidersLoaded(result) => self.llm.apply_providers(result),
            AppEvent::LlmTested(result) => self.llm.apply_test(result),
            AppEvent::LlmMutated { op, result } => {
                if self.llm.apply_mutation(op, result) {
                    self.refresh_llm();
                }
            }

            AppEvent::DevicesLoaded { seq, result } => self.devices.apply_list(seq, result),
            AppEvent::DeviceStatsLoaded { seq, result } => self.devices.apply_stats(seq, result),
            AppEvent::LocationsLoaded(result) => self.devices.apply_locations(result),
            AppEvent::DevicesMutated { op, result } => {
                if self.devices.apply_mutation(op, result) {
                    self.refresh_devices();
                }
            }

            AppEvent::ChatReplied(result) => self.chat.apply_reply(result),
            AppEvent::ChatHistoryCleared(result) => self.chat.apply_history_cleared(result),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        // ── Global: double Ctrl+C to quit ──
        let is_ctrl_c =
            key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if is_ctrl_c {
            if self.ctrl_c_pending {
                self.should_quit = true;
                return;
            }
            self.ctrl_c_pending = true;
            self.ctrl_c_tick = self.tick_count;
            return;
        }
        self.ctrl_c_pending = false;

        if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        // ── Tab switching ──
        // A pending confirm or alert owns the keyboard until it is answered.
        if self.screen_has_modal() {
            self.dispatch_key(key);
            return;
        }
        if let KeyCode::F(n @ 1..=6) = key.code {
            self.switch_tab(TABS[n as usize - 1]);
            return;
        }
        if key.modifiers.contains(KeyModifiers::ALT) {
            if let KeyCode::Char(c @ '1'..='6') = key.code {
                self.switch_tab(TABS[c as usize - '1' as usize]);
                return;
            }
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Right => {
                    self.next_tab();
                    return;
                }
                KeyCode::Left => {
                    self.prev_tab();
                    return;
                }
                _ => {}
            }
        }
        // Tab/BackTab cycle tabs only when the screen has no dialog open,
        // since forms use them to move between fields.
        if !self.screen_has_dialog() {
            if key.code == KeyCode::Tab && key.modifiers.is_empty() {
                self.next_tab();
                return;
            }
            if key.code == KeyCode::BackTab {
                self.prev_tab();
                return;
            }
        }
        self.dispatch_key(key);
    }

    fn dispatch_key(&mut self, key: KeyEvent) {
        match self.active_tab {
            Tab::Dashboard => {
                let action = self.dashboard.handle_key(key);
                self.handle_dashboard_action(action);
            }
            Tab::Training => {
                let action = self.training.handle_key(key);
                self.handle_training_action(action);
            }
            Tab::Models => {
                let action = self.models.handle_key(key);
                self.handle_models_action(action);
            }
            Tab::Llm => {
                let action = self.llm.handle_key(key);
                self.handle_llm_action(action);
            }
            Tab::Devices => {
                let action = self.devices.handle_key(key);
                self.handle_devices_action(action);
            }
            Tab::Chat => {
                let action = self.chat.handle_key(key);
                self.handle_chat_action(action);
            }
        }
    }

    fn screen_has_modal(&self) -> bool {
        match self.active_tab {
            Tab::Dashboard => false,
            Tab::Training => self.training.confirm.is_some() || self.training.alert.is_some(),
            Tab::Models => self.models.alert.is_some(),
            Tab::Llm => self.llm.confirm.is_some() || self.llm.alert.is_some(),
            Tab::Devices => self.devices.confirm.is_some() || self.devices.alert.is_some(),
            Tab::Chat => self.chat.confirm.is_some() || self.chat.alert.is_some(),
        }
    }

    fn screen_has_dialog(&self) -> bool {
        match self.active_tab {
            Tab::Dashboard | Tab::Chat => false,
            Tab::Training => self.training.dialog.is_some() || self.training.search_focus,
            Tab::Models => self.models.dialog.is_some(),
            Tab::Llm => self.llm.dialog.is_some(),
            Tab::Devices => self.devices.dialog.is_some() || self.devices.search_focus,
        }
    }

    fn handle_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
        // Auto-reset Ctrl+C pending after ~2s (40 ticks at 50ms)
        if self.ctrl_c_pending && self.tick_count.wrapping_sub(self.ctrl_c_tick) > 40 {
            self.ctrl_c_pending = false;
        }
        self.dashboard.tick();
        self.training.tick();
        self.models.tick();
        self.llm.tick();
        self.devices.tick();
        self.chat.tick();

        if self.models.should_poll() && self.tick_count.wrapping_sub(self.last_poll) >= POLL_TICKS {
            self.last_poll = self.tick_count;
            self.refresh_models();
        }
    }

    // ─── Tab navigation ──────────────────────────────────────────────────────

    fn next_tab(&mut self) {
        let next = (self.active_tab.index() + 1) % TABS.len();
        self.switch_tab(TABS[next]);
    }

    fn prev_tab(&mut self) {
        let idx = self.active_tab.index();
        let prev = if idx == 0 { TABS.len() - 1 } else { idx - 1 };
        self.switch_tab(TABS[prev]);
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
        self.on_tab_enter(tab);
    }

    /// Called when a tab becomes active; reloads its data.
    fn on_tab_enter(&mut self, tab: Tab) {
        match tab {
            Tab::Dashboard => self.refresh_dashboard(),
            Tab::Training => {
                event::spawn_fetch_intents(&self.gw, &self.tx);
                self.refresh_training();
            }
            Tab::Models => self.refresh_models(),
            Tab::Llm => {
                event::spawn_fetch_providers(&self.gw, &self.tx);
                self.refresh_llm();
            }
            Tab::Devices => self.refresh_devices(),
            Tab::Chat => {}
        }
    }

    // ─── Refresh ─────────────────────────────────────────────────────────────

    fn refresh_dashboard(&mut self) {
        let action = self.dashboard.refresh();
        self.handle_dashboard_action(action);
    }

    fn refresh_training(&mut self) {
        let action = self.training.fetch();
        self.handle_training_action(action);
    }

    fn refresh_models(&mut self) {
        let action = self.models.refresh();
        self.handle_models_action(action);
    }

    fn refresh_llm(&mut self) {
        let action = self.llm.refresh();
        self.handle_llm_action(action);
    }

    fn refresh_devices(&mut self) {
        let action = self.devices.refresh();
        self.handle_devices_action(action);
    }

    // ─── Action dispatch ─────────────────────────────────────────────────────

    fn handle_dashboard_action(&mut self, action: DashboardAction) {
        match action {
            DashboardAction::Continue => {}
            DashboardAction::Refresh(seqs) => event::spawn_dashboard(&self.gw, &self.tx, seqs),
        }
    }

    fn handle_training_action(&mut self, action: TrainingAction) {
        let (gw, tx) = (&self.gw, &self.tx);
        match action {
            TrainingAction::Continue => {}
            TrainingAction::Fetch { seq, query } => event::spawn_fetch_examples(gw, tx, seq, query),
            TrainingAction::Create(input) => event::spawn_create_example(gw, tx, input),
            TrainingAction::Update(id, input) => event::spawn_update_example(gw, tx, id, input),
            TrainingAction::Delete(id) => event::spawn_delete_example(gw, tx, id),
            TrainingAction::Import(req) => event::spawn_import(gw, tx, req),
            TrainingAction::Export => {
                event::spawn_export(gw, tx, self.export_dir.clone());
            }
        }
    }

    fn handle_models_action(&mut self, action: ModelsAction) {
        let (gw, tx) = (&self.gw, &self.tx);
        match action {
            ModelsAction::Continue => {}
            ModelsAction::Refresh { list_seq, status_seq } => {
                event::spawn_fetch_models(gw, tx, list_seq, status_seq);
            }
            ModelsAction::Train(req) => {
                info!(model = %req.model_name, "Training requested");
                self.last_poll = self.tick_count;
                event::spawn_train(gw, tx, req);
            }
            ModelsAction::Load(id) => event::spawn_load_model(gw, tx, id),
            ModelsAction::Predict(text) => event::spawn_predict(gw, tx, text),
            ModelsAction::Generate(artifact) => event::spawn_generate(gw, tx, artifact),
        }
    }

    fn handle_llm_action(&mut self, action: LlmAction) {
        let (gw, tx) = (&self.gw, &self.tx);
        match action {
            LlmAction::Continue => {}
            LlmAction::Refresh { list_seq, status_seq } => {
                event::spawn_fetch_llm(gw, tx, list_seq, status_seq);
            }
            LlmAction::Create(input) => event::spawn_create_llm(gw, tx, input),
            LlmAction::Update(id, input) => event::spawn_update_llm(gw, tx, id, input),
            LlmAction::Delete(id) => event::spawn_delete_llm(gw, tx, id),
            LlmAction::Toggle(id) => event::spawn_toggle_llm(gw, tx, id),
            LlmAction::Test(text) => event::spawn_test_llm(gw, tx, text),
            LlmAction::Reload => event::spawn_reload_llm(gw, tx),
        }
    }

    fn handle_devices_action(&mut self, action: DevicesAction) {
        let (gw, tx) = (&self.gw, &self.tx);
        match action {
            DevicesAction::Continue => {}
            DevicesAction::Fetch { seq, query } => event::spawn_fetch_devices(gw, tx, seq, query),
            DevicesAction::Refresh {
                list_seq,
                query,
                stats_seq,
            } => {
                event::spawn_fetch_devices(gw, tx, list_seq, query);
                event::spawn_fetch_device_stats(gw, tx, stats_seq);
                event::spawn_fetch_locations(gw, tx);
            }
            DevicesAction::Create(input) => event::spawn_create_device(gw, tx, input),
            DevicesAction::Update(id, input) => event::spawn_update_device(gw, tx, id, input),
            DevicesAction::Delete(id) => event::spawn_delete_device(gw, tx, id),
            DevicesAction::Initialize => event::spawn_initialize_devices(gw, tx),
            DevicesAction::Control(id, cmd) => {
                info!(device = id, action = %cmd.action, "Device control");
                event::spawn_control_device(gw, tx, id, cmd);
            }
        }
    }

    fn handle_chat_action(&mut self, action: ChatAction) {
        match action {
            ChatAction::Continue => {}
            ChatAction::Send(req) => event::spawn_chat_send(&self.gw, &self.tx, req),
            ChatAction::ClearHistory(session) => {
                event::spawn_clear_session(&self.gw, &self.tx, session);
            }
        }
    }

    // ─── Drawing ─────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        let chunks = Layout::vertical([
            Constraint::Length(1), // tab bar
            Constraint::Min(1),    // content
        ])
        .split(area);

        self.draw_tab_bar(frame, chunks[0]);

        match self.active_tab {
            Tab::Dashboard => screens::dashboard::draw(frame, chunks[1], &mut self.dashboard),
            Tab::Training => screens::training::draw(frame, chunks[1], &mut self.training),
            Tab::Models => screens::models::draw(frame, chunks[1], &mut self.models),
            Tab::Llm => screens::llm::draw(frame, chunks[1], &mut self.llm),
            Tab::Devices => screens::devices::draw(frame, chunks[1], &mut self.devices),
            Tab::Chat => screens::chat::draw(frame, chunks[1], &mut self.chat),
        }
    }

    fn draw_tab_bar(&self, frame: &mut ratatui::Frame, area: Rect) {
        let mut spans: Vec<Span> = vec![Span::raw(" ")];
        for (i, &tab) in TABS.iter().enumerate() {
            let label = format!(" F{} {} ", i + 1, tab.label());
            let style = if tab == self.active_tab {
                theme::tab_active()
            } else {
                theme::tab_inactive()
            };
            spans.push(Span::styled(label, style));
            spans.push(Span::raw(" "));
        }

        let hint = if self.ctrl_c_pending {
            "Press Ctrl+C again to quit"
        } else {
            "Ctrl+C\u{00d7}2 quit  Tab/Ctrl+\u{2190}\u{2192} switch"
        };
        let hint_style = if self.ctrl_c_pending {
            Style::default()
                .fg(theme::YELLOW)
                .add_modifier(Modifier::BOLD)
        } else {
            theme::hint_style()
        };
        let spans_width: usize = spans.iter().map(|s| s.width()).sum();
        let padding = (area.width as usize).saturating_sub(spans_width + hint.chars().count());
        if padding > 0 {
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::styled(hint, hint_style));
        }

        let bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme::BG_CARD));
        frame.render_widget(bar, area);
    }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Run the interactive console until the user quits.
pub fn run(gateway: Gateway, export_dir: PathBuf) -> std::io::Result<()> {
    // Panic hook: always restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        original_hook(info);
    }));

    info!(base_url = %gateway.base_url(), "Starting console");
    let mut terminal = ratatui::init();

    // 50ms tick → 20fps spinner animation, snappy key response
    let (tx, rx) = event::spawn_event_thread(Duration::from_millis(50));
    let mut app = App::new(Arc::new(gateway), export_dir, tx);
    app.on_tab_enter(Tab::Dashboard);

    // Draw first, then block on events, so the first frame appears immediately.
    let result = loop {
        if app.should_quit {
            break Ok(());
        }
        if let Err(e) = terminal.draw(|frame| app.draw(frame)) {
            break Err(e);
        }

        match rx.recv_timeout(Duration::from_millis(33)) {
            Ok(ev) => app.handle_event(ev),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break Ok(()),
        }
        // Drain all queued events immediately (batch processing)
        while let Ok(ev) = rx.try_recv() {
            app.handle_event(ev);
        }
    };

    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use homevoice_client::GatewayConfig;
    use state::{Alert, Confirm};

    fn app() -> (App, mpsc::Receiver<AppEvent>) {
        let gw = Gateway::new(GatewayConfig {
            base_url: "http://127.0.0.1:9/api".into(),
            timeout: Duration::from_millis(100),
        })
        .unwrap();
        let (tx, rx) = mpsc::channel();
        (App::new(Arc::new(gw), PathBuf::from("."), tx), rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn pending_confirm_blocks_tab_switching() {
        let (mut app, _rx) = app();
        app.active_tab = Tab::Training;
        app.training.confirm = Some(Confirm::new("Delete example #1?", 1));

        app.handle_key(key(KeyCode::F(1)));
        assert_eq!(app.active_tab, Tab::Training);
        // any key other than y answers the prompt with "no"
        assert!(app.training.confirm.is_none());

        app.active_tab = Tab::Llm;
        app.llm.confirm = Some(Confirm::new("Delete config #2?", 2));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.active_tab, Tab::Llm);
        assert!(app.llm.confirm.is_none());
    }

    #[test]
    fn alert_holds_the_tab_until_dismissed() {
        let (mut app, _rx) = app();
        app.active_tab = Tab::Models;
        app.models.alert = Some(Alert::failure("Load", "HTTP 500"));

        app.handle_key(key(KeyCode::BackTab));
        app.handle_key(KeyEvent::new(KeyCode::Char('3'), KeyModifiers::ALT));
        assert_eq!(app.active_tab, Tab::Models);
        assert!(app.models.alert.is_some());

        app.handle_key(key(KeyCode::Esc));
        assert!(app.models.alert.is_none());
    }
}
