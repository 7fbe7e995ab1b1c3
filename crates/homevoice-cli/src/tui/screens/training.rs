//! Training data screen: paginated example list, intent filter, search,
//! create/edit form, bulk import and export.

use crate::tui::state::{step, Alert, Confirm, LoadState, Mutation, RequestSeq, TextField};
use crate::tui::theme;
use crate::tui::widgets;
use homevoice_client::training::parse_import_json;
use homevoice_client::Page;
use homevoice_types::training::{
    EntitySpan, ExampleQuery, ImportFormat, ImportRequest, IntentDef, TrainingExample,
    TrainingExampleInput,
};
use homevoice_types::Pagination;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

pub const PAGE_SIZE: u32 = 20;

// ── Form buffer ─────────────────────────────────────────────────────────────

const FIELD_TEXT: usize = 0;
const FIELD_INTENT: usize = 1;

/// Shared create/edit buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleForm {
    /// `Some(id)` while editing an existing example.
    pub editing: Option<i64>,
    pub text: TextField,
    pub intent: TextField,
    /// Spans carried over from the edit target; not editable here.
    pub entities: Vec<EntitySpan>,
    pub field: usize,
}

impl ExampleForm {
    fn for_edit(ex: &TrainingExample) -> Self {
        Self {
            editing: Some(ex.id),
            text: TextField::with(&ex.text),
            intent: TextField::with(&ex.intent),
            entities: ex.entities.clone(),
            field: FIELD_TEXT,
        }
    }

    fn input(&self) -> TrainingExampleInput {
        TrainingExampleInput {
            text: self.text.trimmed().to_string(),
            intent: self.intent.trimmed().to_string(),
            entities: self.entities.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportForm {
    pub format: ImportFormat,
    pub raw: TextField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    Form,
    Import,
}

// ── State ───────────────────────────────────────────────────────────────────

pub struct TrainingState {
    pub examples: Vec<TrainingExample>,
    pub pagination: Pagination,
    pub list_state: ListState,
    pub load: LoadState,
    pub seq: RequestSeq,
    pub intents: Vec<IntentDef>,
    pub intent_filter: Option<String>,
    pub search: TextField,
    applied_search: String,
    pub search_focus: bool,
    pub page: u32,
    pub dialog: Option<Dialog>,
    pub form: ExampleForm,
    pub import: ImportForm,
    pub confirm: Option<Confirm<i64>>,
    pub alert: Option<Alert>,
    pub status_msg: String,
    pub tick: usize,
}

pub enum TrainingAction {
    Continue,
    Fetch { seq: u64, query: ExampleQuery },
    Create(TrainingExampleInput),
    Update(i64, TrainingExampleInput),
    Delete(i64),
    Import(ImportRequest),
    Export,
}

impl TrainingState {
    pub fn new() -> Self {
        Self {
            examples: Vec::new(),
            pagination: Pagination::default(),
            list_state: ListState::default(),
            load: LoadState::Idle,
            seq: RequestSeq::default(),
            intents: Vec::new(),
            intent_filter: None,
            search: TextField::default(),
            applied_search: String::new(),
            search_focus: false,
            page: 1,
            dialog: None,
            form: ExampleForm::default(),
            import: ImportForm::default(),
            confirm: None,
            alert: None,
            status_msg: String::new(),
            tick: 0,
        }
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn query(&self) -> ExampleQuery {
        ExampleQuery {
            page: self.page,
            per_page: PAGE_SIZE,
            intent: self.intent_filter.clone(),
            search: Some(self.applied_search.clone()).filter(|s| !s.is_empty()),
        }
    }

    /// Issue a list fetch with the current filters.
    pub fn fetch(&mut self) -> TrainingAction {
        self.load = LoadState::Loading;
        TrainingAction::Fetch {
            seq: self.seq.next(),
            query: self.query(),
        }
    }

    // ── Results ──

    pub fn apply_list(&mut self, seq: u64, result: Result<Page<TrainingExample>, String>) {
        if !self.seq.accept(seq) {
            return;
        }
        match result {
            Ok(page) => {
                let total = page.items.len() as u64;
                self.pagination = page.pagination.unwrap_or(Pagination {
                    page: self.page,
                    per_page: PAGE_SIZE,
                    total,
                    pages: u32::from(total > 0),
                });
                self.examples = page.items;
                if self.seq.settled() {
                    self.load = LoadState::Loaded;
                }
            }
            Err(e) => {
                self.examples.clear();
                self.pagination = Pagination::default();
                self.load = LoadState::Error(e);
            }
        }
        let sel = self.list_state.selected();
        self.list_state.select(match (sel, self.examples.len()) {
            (_, 0) => None,
            (Some(i), n) => Some(i.min(n - 1)),
            (None, _) => Some(0),
        });
    }

    pub fn apply_intents(&mut self, result: Result<Vec<IntentDef>, String>) {
        // failures leave the selector empty
        self.intents = result.unwrap_or_default();
    }

    /// Returns `true` when the list should be re-fetched.
    pub fn apply_mutation(&mut self, op: Mutation, result: Result<String, String>) -> bool {
        match result {
            Ok(msg) => {
                self.status_msg = msg;
                if op == Mutation::Delete && self.examples.len() == 1 && self.page > 1 {
                    self.page -= 1;
                }
                op != Mutation::Export
            }
            Err(e) => {
                self.load = LoadState::Loaded;
                self.alert = Some(Alert::failure(op.label(), &e));
                false
            }
        }
    }

    pub fn selected(&self) -> Option<&TrainingExample> {
        self.list_state.selected().and_then(|i| self.examples.get(i))
    }

    // ── Dialog openers ──

    pub fn open_create(&mut self) {
        self.form = ExampleForm::default();
        self.dialog = Some(Dialog::Form);
    }

    pub fn open_edit(&mut self) {
        if let Some(ex) = self.selected() {
            self.form = ExampleForm::for_edit(ex);
            self.dialog = Some(Dialog::Form);
        }
    }

    // ── Keys ──

    pub fn handle_key(&mut self, key: KeyEvent) -> TrainingAction {
        if self.alert.is_some() {
            if Alert::dismisses(&key) {
                self.alert = None;
            }
            return TrainingAction::Continue;
        }
        if let Some(confirm) = self.confirm.take() {
            return match confirm.resolve(&key) {
                Some(id) => {
                    self.load = LoadState::Submitting;
                    TrainingAction::Delete(id)
                }
                None => TrainingAction::Continue,
            };
        }
        match self.dialog {
            Some(Dialog::Form) => return self.handle_form_key(key),
            Some(Dialog::Import) => return self.handle_import_key(key),
            None => {}
        }
        if self.search_focus {
            return self.handle_search_key(key);
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                let next = step(self.list_state.selected(), self.examples.len(), false);
                self.list_state.select(next);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let next = step(self.list_state.selected(), self.examples.len(), true);
                self.list_state.select(next);
            }
            KeyCode::Left | KeyCode::Char('h') if self.pagination.has_prev() => {
                self.page = self.pagination.page - 1;
                return self.fetch();
            }
            KeyCode::Right | KeyCode::Char('l') if self.pagination.has_next() => {
                self.page = self.pagination.page + 1;
                return self.fetch();
            }
            KeyCode::Char('n') => self.open_create(),
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit(),
            KeyCode::Char('d') => {
                if let Some(ex) = self.selected() {
                    self.confirm = Some(Confirm::new(
                        format!("Delete example #{} \"{}\"?", ex.id, widgets::truncate(&ex.text, 24)),
                        ex.id,
                    ));
                }
            }
            KeyCode::Char('i') => {
                self.cycle_intent_filter();
                self.page = 1;
                return self.fetch();
            }
            KeyCode::Char('/') => self.search_focus = true,
            KeyCode::Char('m') => {
                self.import = ImportForm::default();
                self.dialog = Some(Dialog::Import);
            }
            KeyCode::Char('x') => return TrainingAction::Export,
            KeyCode::Char('r') => return self.fetch(),
            _ => {}
        }
        TrainingAction::Continue
    }

    fn cycle_intent_filter(&mut self) {
        let names: Vec<&str> = self.intents.iter().map(|i| i.name.as_str()).collect();
        self.intent_filter = match &self.intent_filter {
            None => names.first().map(|s| s.to_string()),
            Some(cur) => match names.iter().position(|n| n == cur) {
                Some(i) if i + 1 < names.len() => Some(names[i + 1].to_string()),
                _ => None,
            },
        };
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> TrainingAction {
        match key.code {
            KeyCode::Enter => {
                self.search_focus = false;
                self.applied_search = self.search.trimmed().to_string();
                self.page = 1;
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
        TrainingAction::Continue
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> TrainingAction {
        match key.code {
            KeyCode::Esc => self.dialog = None,
            KeyCode::Tab | KeyCode::BackTab => {
                self.form.field = if self.form.field == FIELD_TEXT {
                    FIELD_INTENT
                } else {
                    FIELD_TEXT
                };
            }
            KeyCode::Left | KeyCode::Right if self.form.field == FIELD_INTENT => {
                let names: Vec<&str> = self.intents.iter().map(|i| i.name.as_str()).collect();
                let cur = names.iter().position(|n| *n == self.form.intent.trimmed());
                if let Some(i) = step(cur, names.len(), key.code == KeyCode::Right) {
                    let name = names[i].to_string();
                    self.form.intent.set(name);
                }
            }
            KeyCode::Enter => {
                let input = self.form.input();
                if input.text.is_empty() || input.intent.is_empty() {
                    self.alert = Some(Alert::new("Invalid input", "Text and intent are required"));
                    return TrainingAction::Continue;
                }
                self.dialog = None;
                self.load = LoadState::Submitting;
                return match self.form.editing {
                    Some(id) => TrainingAction::Update(id, input),
                    None => TrainingAction::Create(input),
                };
            }
            _ => {
                let field = if self.form.field == FIELD_TEXT {
                    &mut self.form.text
                } else {
                    &mut self.form.intent
                };
                field.handle_key(&key);
            }
        }
        TrainingAction::Continue
    }

    fn handle_import_key(&mut self, key: KeyEvent) -> TrainingAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => self.dialog = None,
            KeyCode::Tab => self.import.format = self.import.format.toggle(),
            KeyCode::Enter if !ctrl => self.import.raw.value.push('\n'),
            KeyCode::Char('s') if ctrl => return self.submit_import(),
            _ => {
                self.import.raw.handle_key(&key);
            }
        }
        TrainingAction::Continue
    }

    fn submit_import(&mut self) -> TrainingAction {
        let raw = self.import.raw.value.trim();
        if raw.is_empty() {
            self.alert = Some(Alert::new("Invalid input", "Import data is empty"));
            return TrainingAction::Continue;
        }
        let data = match self.import.format {
            ImportFormat::Json => match parse_import_json(raw) {
                Ok(v) => v,
                Err(e) => {
                    self.alert = Some(Alert::failure("Import", &e.detail()));
                    return TrainingAction::Continue;
                }
            },
            ImportFormat::Csv => serde_json::Value::String(raw.to_string()),
        };
        self.dialog = None;
        self.load = LoadState::Submitting;
        TrainingAction::Import(ImportRequest {
            format: self.import.format,
            data,
        })
    }
}

// ── Drawing ─────────────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, area: Rect, state: &mut TrainingState) {
    let block = widgets::panel("Training Data");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::vertical([
        Constraint::Length(1), // filters
        Constraint::Length(1), // column header
        Constraint::Min(3),    // list
        Constraint::Length(1), // pagination
        Constraint::Length(1), // status
        Constraint::Length(1), // hints
    ])
    .split(inner);

    let search_style = if state.search_focus {
        Style::default().fg(theme::CYAN)
    } else {
        Style::default().fg(theme::TEXT)
    };
    let cursor = if state.search_focus { "\u{2588}" } else { "" };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Intent: ", theme::dim_style()),
            Span::styled(
                state.intent_filter.as_deref().unwrap_or("all").to_string(),
                Style::default().fg(theme::PURPLE),
            ),
            Span::styled("   Search: ", theme::dim_style()),
            Span::styled(format!("{}{cursor}", state.search.value), search_style),
        ])),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!("  {:<6} {:<32} {:<20} {:<4}", "ID", "TEXT", "INTENT", "ENT"),
            theme::label_style(),
        ))),
        chunks[1],
    );

    if state.examples.is_empty() {
        let msg = if state.load.is_loading() {
            "  Loading\u{2026}"
        } else {
            "  No training examples."
        };
        f.render_widget(
            Paragraph::new(Span::styled(msg, theme::dim_style())),
            chunks[2],
        );
    } else {
        let items: Vec<ListItem> = state
            .examples
            .iter()
            .map(|ex| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<6} ", ex.id), theme::dim_style()),
                    Span::styled(
                        format!("{:<32} ", widgets::truncate(&ex.text, 30)),
                        Style::default().fg(theme::TEXT),
                    ),
                    Span::styled(
                        format!("{:<20} ", widgets::truncate(&ex.intent, 18)),
                        Style::default().fg(theme::PURPLE),
                    ),
                    Span::styled(format!("{:<4}", ex.entities.len()), theme::dim_style()),
                ]))
            })
            .collect();
        let list = List::new(items)
            .highlight_style(theme::selected_style())
            .highlight_symbol("> ");
        f.render_stateful_widget(list, chunks[2], &mut state.list_state);
    }

    let p = &state.pagination;
    let range = match p.visible_range() {
        Some((a, b)) => format!("showing {a}\u{2013}{b} of {}", p.total),
        None => "showing 0 of 0".to_string(),
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("  {range}"), theme::dim_style()),
            Span::styled(
                format!("   page {}/{}", p.page, p.pages.max(1)),
                theme::dim_style(),
            ),
        ])),
        chunks[3],
    );

    let status = widgets::status_line(&state.load, state.tick).unwrap_or_else(|| {
        Line::from(Span::styled(
            format!("  {}", state.status_msg),
            Style::default().fg(theme::GREEN),
        ))
    });
    f.render_widget(Paragraph::new(status), chunks[4]);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            "  [n]ew  [e]dit  [d]elete  [i]ntent  [/]search  [\u{2190}\u{2192}] page  i[m]port  e[x]port  [r]efresh",
            theme::hint_style(),
        ))),
        chunks[5],
    );

    match state.dialog {
        Some(Dialog::Form) => draw_form(f, area, state),
        Some(Dialog::Import) => draw_import(f, area, state),
        None => {}
    }
    if let Some(c) = &state.confirm {
        widgets::draw_confirm(f, area, &c.prompt);
    }
    if let Some(a) = &state.alert {
        widgets::draw_alert(f, area, a);
    }
}

fn draw_form(f: &mut Frame, area: Rect, state: &TrainingState) {
    let title = if state.form.editing.is_some() {
        "Edit Example"
    } else {
        "New Example"
    };
    let inner = widgets::modal(f, area, title, 60, 10);
    let mut lines = Vec::new();
    lines.extend(widgets::text_field_lines(
        "Text:",
        &state.form.text,
        state.form.field == FIELD_TEXT,
    ));
    lines.extend(widgets::text_field_lines(
        "Intent (\u{2190}\u{2192} pick):",
        &state.form.intent,
        state.form.field == FIELD_INTENT,
    ));
    if !state.form.entities.is_empty() {
        let spans: Vec<String> = state
            .form
            .entities
            .iter()
            .map(|e| format!("{}={}", e.entity, e.value))
            .collect();
        lines.push(Line::from(Span::styled(
            format!("Entities: {}", spans.join(", ")),
            theme::dim_style(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "[Tab] field  [Enter] save  [Esc] cancel",
        theme::hint_style(),
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_import(f: &mut Frame, area: Rect, state: &TrainingState) {
    let inner = widgets::modal(f, area, "Import Training Data", 70, 14);
    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .split(inner);
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("Format: ", theme::dim_style()),
            Span::styled(
                state.import.format.label(),
                Style::default()
                    .fg(theme::CYAN)
                    .add_modifier(Modifier::BOLD),
            ),
        ])),
        rows[0],
    );
    f.render_widget(
        Paragraph::new(format!("{}\u{2588}", state.import.raw.value))
            .style(Style::default().fg(theme::TEXT))
            .wrap(Wrap { trim: false }),
        rows[1],
    );
    f.render_widget(
        Paragraph::new(Span::styled(
            "[Tab] format  [Ctrl+S] import  [Esc] cancel",
            theme::hint_style(),
        )),
        rows[2],
    );
}
