//! Device management: statistics, filtered list, CRUD, bulk initialize and
//! the per-device control dialog.

use crate::tui::state::{step, Alert, Confirm, Fetched, LoadState, Mutation, RequestSeq, TextField};
use crate::tui::theme;
use crate::tui::widgets;
use homevoice_types::device::{
    ActionSpec, ControlCommand, Device, DeviceInput, DeviceQuery, DeviceStatistics, DeviceType,
    OnlineFilter,
};
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph};
use ratatui::Frame;

const FIELD_NAME: usize = 0;
const FIELD_TYPE: usize = 1;
const FIELD_LOCATION: usize = 2;
const FIELD_DESCRIPTION: usize = 3;
const FIELD_ONLINE: usize = 4;
const FIELD_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceForm {
    pub editing: Option<i64>,
    pub name: TextField,
    pub device_type: Option<DeviceType>,
    pub location: TextField,
    pub description: TextField,
    pub is_online: bool,
    pub field: usize,
}

impl DeviceForm {
    fn from_input(editing: Option<i64>, input: DeviceInput) -> Self {
        Self {
            editing,
            name: TextField::with(input.name),
            device_type: input.device_type,
            location: TextField::with(input.location),
            description: TextField::with(input.description),
            is_online: input.is_online,
            field: FIELD_NAME,
        }
    }

    fn input(&self) -> DeviceInput {
        DeviceInput {
            name: self.name.trimmed().to_string(),
            device_type: self.device_type,
            location: self.location.trimmed().to_string(),
            description: self.description.trimmed().to_string(),
            is_online: self.is_online,
        }
    }
}

impl Default for DeviceForm {
    fn default() -> Self {
        Self::from_input(None, DeviceInput::default())
    }
}

/// Control dialog for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlForm {
    pub device_id: i64,
    pub device_name: String,
    pub device_type: DeviceType,
    pub action: usize,
    pub value: TextField,
}

impl ControlForm {
    pub fn spec(&self) -> Option<&'static ActionSpec> {
        self.device_type.actions().get(self.action)
    }

    /// Value inputs revealed for the selected action (0 or 1).
    pub fn value_inputs(&self) -> usize {
        self.spec().map_or(0, ActionSpec::value_inputs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    Delete(i64),
    Initialize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Form,
    Control,
}

pub struct DevicesState {
    pub devices: Vec<Device>,
    pub list_state: ListState,
    pub load: LoadState,
    pub seq: RequestSeq,
    pub stats: Fetched<DeviceStatistics>,
    pub locations: Vec<String>,
    pub type_filter: Option<DeviceType>,
    pub location_filter: Option<String>,
    pub online_filter: Option<OnlineFilter>,
    pub search: TextField,
    applied_search: String,
    pub search_focus: bool,
    pub dialog: Option<Dialog>,
    pub form: DeviceForm,
    pub control: Option<ControlForm>,
    pub confirm: Option<Confirm<Pending>>,
    pub alert: Option<Alert>,
    pub status_msg: String,
    pub tick: usize,
}

pub enum DevicesAction {
    Continue,
    Fetch { seq: u64, query: DeviceQuery },
    Refresh { list_seq: u64, query: DeviceQuery, stats_seq: u64 },
    Create(DeviceInput),
    Update(i64, DeviceInput),
    Delete(i64),
    Initialize,
    Control(i64, ControlCommand),
}

impl DevicesState {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            list_state: ListState::default(),
            load: LoadState::Idle,
            seq: RequestSeq::default(),
            stats: Fetched::default(),
            locations: Vec::new(),
            type_filter: None,
            location_filter: None,
            online_filter: None,
            search: TextField::default(),
            applied_search: String::new(),
            search_focus: false,
            dialog: None,
            form: DeviceForm::default(),
            control: None,
            confirm: None,
            alert: None,
            status_msg: String::new(),
            tick: 0,
        }
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn query(&self) -> DeviceQuery {
        DeviceQuery {
            device_type: self.type_filter,
            location: self.location_filter.clone(),
            status: self.online_filter,
            search: Some(self.applied_search.clone()).filter(|s| !s.is_empty()),
        }
    }

    pub fn fetch(&mut self) -> DevicesAction {
        self.load = LoadState::Loading;
        DevicesAction::Fetch {
            seq: self.seq.next(),
            query: self.query(),
        }
    }

    /// List, statistics and locations.
    pub fn refresh(&mut self) -> DevicesAction {
        self.load = LoadState::Loading;
        DevicesAction::Refresh {
            list_seq: self.seq.next(),
            query: self.query(),
            stats_seq: self.stats.begin(),
        }
    }

    pub fn apply_list(&mut self, seq: u64, result: Result<Vec<Device>, String>) {
        if !self.seq.accept(seq) {
            return;
        }
        match result {
            Ok(devices) => {
                self.devices = devices;
                if self.seq.settled() {
                    self.load = LoadState::Loaded;
                }
            }
            Err(e) => {
                self.devices.clear();
                self.load = LoadState::Error(e);
            }
        }
        let n = self.devices.len();
        self.list_state.select(match self.list_state.selected() {
            _ if n == 0 => None,
            Some(i) => Some(i.min(n - 1)),
            None => Some(0),
        });
    }

    pub fn apply_stats(&mut self, seq: u64, result: Result<DeviceStatistics, String>) {
        self.stats.apply(seq, result);
    }

    pub fn apply_locations(&mut self, result: Result<Vec<String>, String>) {
        self.locations = result.unwrap_or_default();
        if let Some(loc) = &self.location_filter {
            if !self.locations.contains(loc) {
                self.location_filter = None;
            }
        }
    }

    /// Returns `true` when list, statistics and locations should be re-fetched.
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

    pub fn selected(&self) -> Option<&Device> {
        self.list_state.selected().and_then(|i| self.devices.get(i))
    }

    pub fn open_create(&mut self) {
        self.form = DeviceForm::default();
        self.dialog = Some(Dialog::Form);
    }

    pub fn open_edit(&mut self) {
        if let Some(d) = self.selected() {
            self.form = DeviceForm::from_input(Some(d.id), DeviceInput::from(d));
            self.dialog = Some(Dialog::Form);
        }
    }

    pub fn open_control(&mut self) {
        let Some(d) = self.selected() else {
            return;
        };
        if !d.is_online {
            self.alert = Some(Alert::new(
                "Offline",
                format!("'{}' is offline and cannot be controlled", d.name),
            ));
            return;
        }
        if d.device_type.actions().is_empty() {
            self.alert = Some(Alert::new(
                "No actions",
                format!("{} devices have no control actions", d.device_type.label()),
            ));
            return;
        }
        self.control = Some(ControlForm {
            device_id: d.id,
            device_name: d.name.clone(),
            device_type: d.device_type,
            action: 0,
            value: TextField::default(),
        });
        self.dialog = Some(Dialog::Control);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DevicesAction {
        if self.alert.is_some() {
            if Alert::dismisses(&key) {
                self.alert = None;
            }
            return DevicesAction::Continue;
        }
        if let Some(confirm) = self.confirm.take() {
            return match confirm.resolve(&key) {
                Some(Pending::Delete(id)) => {
                    self.load = LoadState::Submitting;
                    DevicesAction::Delete(id)
                }
                Some(Pending::Initialize) => {
                    self.load = LoadState::Submitting;
                    DevicesAction::Initialize
                }
                None => DevicesAction::Continue,
            };
        }
        match self.dialog {
            Some(Dialog::Form) => return self.handle_form_key(key),
            Some(Dialog::Control) => return self.handle_control_key(key),
            None => {}
        }
        if self.search_focus {
            return self.handle_search_key(key);
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                let next = step(self.list_state.selected(), self.devices.len(), false);
                self.list_state.select(next);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let next = step(self.list_state.selected(), self.devices.len(), true);
                self.list_state.select(next);
            }
            KeyCode::Char('t') => {
                self.type_filter = cycle_option(&DeviceType::ALL, self.type_filter);
                return self.fetch();
            }
            KeyCode::Char('o') => {
                self.location_filter =
                    cycle_option(&self.locations, self.location_filter.clone());
                return self.fetch();
            }
            KeyCode::Char('s') => {
                self.online_filter =
                    cycle_option(&[OnlineFilter::Online, OnlineFilter::Offline], self.online_filter);
                return self.fetch();
            }
            KeyCode::Char('/') => self.search_focus = true,
            KeyCode::Char('n') => self.open_create(),
            KeyCode::Char('e') => self.open_edit(),
            KeyCode::Char('c') | KeyCode::Enter => self.open_control(),
            KeyCode::Char('d') => {
                if let Some(d) = self.selected() {
                    self.confirm = Some(Confirm::new(
                        format!("Delete device '{}'?", d.name),
                        Pending::Delete(d.id),
                    ));
                }
            }
            KeyCode::Char('I') => {
                self.confirm = Some(Confirm::new(
                    "Create the default device set?",
                    Pending::Initialize,
                ));
            }
            KeyCode::Char('r') => return self.refresh(),
            _ => {}
        }
        DevicesAction::Continue
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> DevicesAction {
        match key.code {
            KeyCode::Enter => {
                self.search_focus = false;
                self.applied_search = self.search.trimmed().to_string();
                return self.fetch();
            }
            KeyCode::Esc => {
                self.search_focus = false;
                self.search.set(self.applied_search.clone());
            }
            _ => {
                self.search.handle_key(&key);
            }
        }
        DevicesAction::Continue
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> DevicesAction {
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
                    FIELD_TYPE => {
                        let cur = self
                            .form
                            .device_type
                            .and_then(|t| DeviceType::ALL.iter().position(|x| *x == t));
                        if let Some(i) = step(cur, DeviceType::ALL.len(), forward) {
                            self.form.device_type = Some(DeviceType::ALL[i]);
                        }
                    }
                    FIELD_LOCATION => {
                        let cur = self
                            .locations
                            .iter()
                            .position(|l| l == self.form.location.trimmed());
                        if let Some(i) = step(cur, self.locations.len(), forward) {
                            self.form.location.set(self.locations[i].clone());
                        }
                    }
                    FIELD_ONLINE => self.form.is_online = !self.form.is_online,
                    _ => {}
                }
            }
            KeyCode::Char(' ') if field == FIELD_ONLINE => {
                self.form.is_online = !self.form.is_online;
            }
            KeyCode::Enter => {
                let input = self.form.input();
                if input.name.is_empty() || input.device_type.is_none() {
                    self.alert = Some(Alert::new("Invalid input", "Name and type are required"));
                    return DevicesAction::Continue;
                }
                self.dialog = None;
                self.load = LoadState::Submitting;
                return match self.form.editing {
                    Some(id) => DevicesAction::Update(id, input),
                    None => DevicesAction::Create(input),
                };
            }
            _ => {
                let target = match field {
                    FIELD_NAME => Some(&mut self.form.name),
                    FIELD_LOCATION => Some(&mut self.form.location),
                    FIELD_DESCRIPTION => Some(&mut self.form.description),
                    _ => None,
                };
                if let Some(t) = target {
                    t.handle_key(&key);
                }
            }
        }
        DevicesAction::Continue
    }

    fn handle_control_key(&mut self, key: KeyEvent) -> DevicesAction {
        let Some(form) = self.control.as_mut() else {
            self.dialog = None;
            return DevicesAction::Continue;
        };
        let count = form.device_type.actions().len();
        match key.code {
            KeyCode::Esc => {
                self.control = None;
                self.dialog = None;
            }
            KeyCode::Up | KeyCode::Down | KeyCode::Tab => {
                if let Some(i) = step(Some(form.action), count, key.code != KeyCode::Up) {
                    form.action = i;
                    form.value.clear();
                }
            }
            KeyCode::Enter => {
                let Some(spec) = form.spec() else {
                    return DevicesAction::Continue;
                };
                match spec.command(&form.value.value) {
                    Ok(cmd) => {
                        let id = form.device_id;
                        self.control = None;
                        self.dialog = None;
                        self.load = LoadState::Submitting;
                        return DevicesAction::Control(id, cmd);
                    }
                    Err(e) => {
                        self.alert = Some(Alert::new("Invalid value", e.to_string()));
                    }
                }
            }
            KeyCode::Char(c) if form.value_inputs() == 1 => {
                if c.is_ascii_digit() || c == '-' {
                    form.value.value.push(c);
                }
            }
            KeyCode::Backspace => {
                form.value.value.pop();
            }
            _ => {}
        }
        DevicesAction::Continue
    }
}

/// `None → first → … → last → None`.
fn cycle_option<T: Clone + PartialEq>(options: &[T], current: Option<T>) -> Option<T> {
    match current {
        None => options.first().cloned(),
        Some(cur) => match options.iter().position(|o| *o == cur) {
            Some(i) if i + 1 < options.len() => Some(options[i + 1].clone()),
            _ => None,
        },
    }
}

fn state_summary(d: &Device) -> String {
    match &d.state {
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                serde_json::Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

// ── Drawing ─────────────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, area: Rect, state: &mut DevicesState) {
    let block = widgets::panel("Devices");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(1), // stats
        Constraint::Length(1), // filters
        Constraint::Length(1), // header
        Constraint::Min(3),    // list
        Constraint::Length(1), // status
        Constraint::Length(1), // hints
    ])
    .split(inner);

    let s = &state.stats.data;
    let stats_line = if state.stats.load.error().is_some() {
        widgets::status_line(&state.stats.load, state.tick).unwrap_or_default()
    } else {
        Line::from(vec![
            Span::styled("Total ", theme::dim_style()),
            Span::styled(s.total_devices.to_string(), theme::label_style()),
            Span::styled("   Online ", theme::dim_style()),
            Span::styled(s.online().to_string(), Style::default().fg(theme::GREEN)),
            Span::styled("   Types ", theme::dim_style()),
            Span::styled(s.type_distribution.len().to_string(), theme::label_style()),
            Span::styled("   Locations ", theme::dim_style()),
            Span::styled(s.location_distribution.len().to_string(), theme::label_style()),
        ])
    };
    f.render_widget(Paragraph::new(stats_line), chunks[0]);

    let search_style = if state.search_focus {
        Style::default().fg(theme::CYAN)
    } else {
        Style::default().fg(theme::TEXT)
    };
    let cursor = if state.search_focus { "\u{2588}" } else { "" };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Type: ", theme::dim_style()),
            Span::styled(
                state.type_filter.map_or("all", DeviceType::label),
                Style::default().fg(theme::PURPLE),
            ),
            Span::styled("  Location: ", theme::dim_style()),
            Span::styled(
                state.location_filter.clone().unwrap_or_else(|| "all".into()),
                Style::default().fg(theme::PURPLE),
            ),
            Span::styled("  Status: ", theme::dim_style()),
            Span::styled(
                state.online_filter.map_or("all", OnlineFilter::tag),
                Style::default().fg(theme::PURPLE),
            ),
            Span::styled("  Search: ", theme::dim_style()),
            Span::styled(format!("{}{cursor}", state.search.value), search_style),
        ])),
        chunks[1],
    );

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(
                "  {:<5} {:<18} {:<16} {:<12} {:<8} {}",
                "ID", "NAME", "TYPE", "LOCATION", "STATUS", "STATE"
            ),
            theme::label_style(),
        ))),
        chunks[2],
    );

    if state.devices.is_empty() {
        let msg = if state.load.is_loading() {
            "  Loading\u{2026}"
        } else {
            "  No devices. Press [I] to create the default set."
        };
        f.render_widget(Paragraph::new(Span::styled(msg, theme::dim_style())), chunks[3]);
    } else {
        let items: Vec<ListItem> = state
            .devices
            .iter()
            .map(|d| {
                let online = if d.is_online { "online" } else { "offline" };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<5} ", d.id), theme::dim_style()),
                    Span::styled(
                        format!("{:<18} ", widgets::truncate(&d.name, 16)),
                        Style::default().fg(theme::TEXT),
                    ),
                    Span::styled(
                        format!("{:<16} ", d.device_type.label()),
                        Style::default().fg(theme::PURPLE),
                    ),
                    Span::styled(
                        format!("{:<12} ", widgets::truncate(&d.location, 10)),
                        theme::dim_style(),
                    ),
                    Span::styled(format!("{online:<8} "), theme::status_style(online)),
                    Span::styled(widgets::truncate(&state_summary(d), 40), theme::hint_style()),
                ]))
            })
            .collect();
        let list = List::new(items)
            .highlight_style(theme::selected_style())
            .highlight_symbol("> ");
        f.render_stateful_widget(list, chunks[3], &mut state.list_state);
    }

    let status = widgets::status_line(&state.load, state.tick).unwrap_or_else(|| {
        Line::from(Span::styled(
            format!("  {}", state.status_msg),
            Style::default().fg(theme::GREEN),
        ))
    });
    f.render_widget(Paragraph::new(status), chunks[4]);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "  [c]ontrol  [n]ew  [e]dit  [d]elete  [I]nit  [t]ype  l[o]cation  [s]tatus  [/]search  [r]efresh",
            theme::hint_style(),
        ))),
        chunks[5],
    );

    match state.dialog {
        Some(Dialog::Form) => draw_form(f, area, state),
        Some(Dialog::Control) => {
            if let Some(c) = &state.control {
                draw_control(f, area, c);
            }
        }
        None => {}
    }
    if let Some(c) = &state.confirm {
        widgets::draw_confirm(f, area, &c.prompt);
    }
    if let Some(a) = &state.alert {
        widgets::draw_alert(f, area, a);
    }
}

fn draw_form(f: &mut Frame, area: Rect, state: &DevicesState) {
    let form = &state.form;
    let title = if form.editing.is_some() {
        "Edit Device"
    } else {
        "New Device"
    };
    let inner = widgets::modal(f, area, title, 60, 15);
    let mut lines = Vec::new();
    lines.extend(widgets::text_field_lines("Name:", &form.name, form.field == FIELD_NAME));
    lines.extend(widgets::choice_lines(
        "Type:",
        form.device_type.map_or("(select)", DeviceType::label),
        form.field == FIELD_TYPE,
    ));
    lines.extend(widgets::text_field_lines(
        "Location (\u{2190}\u{2192} pick or type):",
        &form.location,
        form.field == FIELD_LOCATION,
    ));
    lines.extend(widgets::text_field_lines(
        "Description:",
        &form.description,
        form.field == FIELD_DESCRIPTION,
    ));
    lines.extend(widgets::choice_lines(
        "Online:",
        if form.is_online { "yes" } else { "no" },
        form.field == FIELD_ONLINE,
    ));
    lines.push(Line::from(Span::styled(
        "[Tab] field  [Enter] save  [Esc] cancel",
        theme::hint_style(),
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_control(f: &mut Frame, area: Rect, form: &ControlForm) {
    let actions = form.device_type.actions();
    let height = actions.len() as u16 + 8;
    let inner = widgets::modal(f, area, &format!("Control: {}", form.device_name), 50, height);
    let mut lines = vec![Line::from(Span::styled(
        format!("Type: {}", form.device_type.label()),
        theme::dim_style(),
    ))];
    for (i, a) in actions.iter().enumerate() {
        let (marker, style) = if i == form.action {
            (
                "\u{25b8} ",
                Style::default()
                    .fg(theme::CYAN)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            ("  ", Style::default().fg(theme::TEXT))
        };
        lines.push(Line::from(Span::styled(format!("{marker}{}", a.label), style)));
    }
    lines.push(Line::from(""));
    if let Some(placeholder) = form.spec().and_then(ActionSpec::placeholder) {
        lines.extend(widgets::field_lines("Value:", &form.value.value, true));
        lines.push(Line::from(Span::styled(placeholder, theme::hint_style())));
    }
    lines.push(Line::from(Span::styled(
        "[\u{2191}\u{2193}] action  [Enter] send  [Esc] cancel",
        theme::hint_style(),
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn device(id: i64, device_type: DeviceType, online: bool) -> Device {
        Device {
            id,
            name: format!("device {id}"),
            device_type,
            location: "客厅".into(),
            description: Some("desc".into()),
            is_online: online,
            state: None,
            updated_at: None,
        }
    }

    fn loaded(devices: Vec<Device>) -> DevicesState {
        let mut st = DevicesState::new();
        let DevicesAction::Refresh { list_seq, stats_seq, .. } = st.refresh() else {
            panic!("expected refresh");
        };
        st.apply_list(list_seq, Ok(devices));
        st.apply_stats(stats_seq, Ok(DeviceStatistics::default()));
        st
    }

    #[test]
    fn brightness_reveals_one_input_and_validates() {
        let mut st = loaded(vec![device(1, DeviceType::Light, true)]);
        st.handle_key(key(KeyCode::Char('c')));
        assert_eq!(st.control.as_ref().unwrap().value_inputs(), 0); // turn_on
        st.handle_key(key(KeyCode::Down));
        assert_eq!(st.control.as_ref().unwrap().value_inputs(), 0); // turn_off
        st.handle_key(key(KeyCode::Down));
        let form = st.control.as_ref().unwrap();
        assert_eq!(form.spec().unwrap().name, "set_brightness");
        assert_eq!(form.value_inputs(), 1);

        for c in "150".chars() {
            st.handle_key(key(KeyCode::Char(c)));
        }
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), DevicesAction::Continue));
        assert!(st.alert.take().is_some());
        assert_eq!(st.dialog, Some(Dialog::Control));

        for _ in 0..3 {
            st.handle_key(key(KeyCode::Backspace));
        }
        for c in "60".chars() {
            st.handle_key(key(KeyCode::Char(c)));
        }
        match st.handle_key(key(KeyCode::Enter)) {
            DevicesAction::Control(id, cmd) => {
                assert_eq!(id, 1);
                assert_eq!(cmd.action, "set_brightness");
                assert_eq!(cmd.value, Some(serde_json::json!(60)));
            }
            _ => panic!("expected control"),
        }
        assert!(st.control.is_none());
    }

    #[test]
    fn plain_action_ignores_typed_value() {
        let mut st = loaded(vec![device(1, DeviceType::Light, true)]);
        st.handle_key(key(KeyCode::Char('c')));
        st.handle_key(key(KeyCode::Char('5')));
        assert!(st.control.as_ref().unwrap().value.value.is_empty());
        match st.handle_key(key(KeyCode::Enter)) {
            DevicesAction::Control(_, cmd) => {
                assert_eq!(cmd.action, "turn_on");
                assert!(cmd.value.is_none());
            }
            _ => panic!("expected control"),
        }
    }

    #[test]
    fn offline_and_sensor_cannot_be_controlled() {
        let mut st = loaded(vec![
            device(1, DeviceType::Light, false),
            device(2, DeviceType::Sensor, true),
        ]);
        st.handle_key(key(KeyCode::Char('c')));
        assert!(st.control.is_none());
        assert!(st.alert.take().is_some());
        st.handle_key(key(KeyCode::Down));
        st.handle_key(key(KeyCode::Char('c')));
        assert!(st.control.is_none());
        assert!(st.alert.is_some());
    }

    #[test]
    fn unrecognized_type_is_listed_but_not_controllable() {
        let mut st = loaded(vec![device(7, DeviceType::Unknown, true)]);
        assert_eq!(st.devices.len(), 1);
        st.handle_key(key(KeyCode::Char('c')));
        assert!(st.control.is_none());
        assert!(st.alert.take().is_some());

        // the edit form will not write the placeholder type back
        st.handle_key(key(KeyCode::Char('e')));
        assert_eq!(st.form.device_type, None);
        assert!(matches!(st.handle_key(key(KeyCode::Enter)), DevicesAction::Continue));
        assert!(st.alert.is_some());
    }

    #[test]
    fn create_after_edit_resets_form() {
        let mut st = loaded(vec![device(4, DeviceType::Curtain, false)]);
        st.handle_key(key(KeyCode::Char('e')));
        assert_eq!(st.form.device_type, Some(DeviceType::Curtain));
        assert!(!st.form.is_online);
        st.handle_key(key(KeyCode::Esc));
        st.handle_key(key(KeyCode::Char('n')));
        assert_eq!(st.form, DeviceForm::default());
        assert!(st.form.is_online);
        assert!(st.form.description.value.is_empty());
    }

    #[test]
    fn initialize_needs_confirmation() {
        let mut st = loaded(vec![]);
        st.handle_key(key(KeyCode::Char('I')));
        assert!(matches!(st.handle_key(key(KeyCode::Char('n'))), DevicesAction::Continue));
        st.handle_key(key(KeyCode::Char('I')));
        assert!(matches!(st.handle_key(key(KeyCode::Char('y'))), DevicesAction::Initialize));
    }

    #[test]
    fn filters_flow_into_query() {
        let mut st = loaded(vec![]);
        st.apply_locations(Ok(vec!["客厅".into(), "卧室".into()]));
        st.handle_key(key(KeyCode::Char('t')));
        st.handle_key(key(KeyCode::Char('o')));
        match st.handle_key(key(KeyCode::Char('s'))) {
            DevicesAction::Fetch { query, .. } => {
                assert_eq!(query.device_type, Some(DeviceType::Light));
                assert_eq!(query.location.as_deref(), Some("客厅"));
                assert_eq!(query.status, Some(OnlineFilter::Online));
                assert_eq!(query.search, None);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn cycle_option_wraps_through_none() {
        let opts = [1, 2];
        assert_eq!(cycle_option(&opts, None), Some(1));
        assert_eq!(cycle_option(&opts, Some(1)), Some(2));
        assert_eq!(cycle_option(&opts, Some(2)), None);
    }

    #[test]
    fn stale_device_list_dropped() {
        let mut st = DevicesState::new();
        let DevicesAction::Fetch { seq: a, .. } = st.fetch() else { panic!() };
        let DevicesAction::Fetch { seq: b, .. } = st.fetch() else { panic!() };
        st.apply_list(b, Ok(vec![device(2, DeviceType::Tv, true)]));
        st.apply_list(a, Ok(vec![device(1, DeviceType::Tv, true)]));
        assert_eq!(st.devices.len(), 1);
        assert_eq!(st.devices[0].id, 2);
    }
}
