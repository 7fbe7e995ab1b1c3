//! State primitives shared by every screen.

use ratatui::crossterm::event::{KeyCode, KeyEvent};

/// Lifecycle of a screen's data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// The last read failed; views render empty/zero data.
    Error(String),
    /// A mutation is in flight.
    Submitting,
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, LoadState::Submitting)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Monotonic request numbering for one fetch stream.
///
/// Responses can arrive out of order. Only a response newer than the last
/// applied one is accepted, and the stream is settled once the most recently
/// issued request has been applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSeq {
    issued: u64,
    applied: u64,
}

impl RequestSeq {
    pub fn next(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Record `seq` as applied if it is newer than anything applied so far.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied || seq > self.issued {
            return false;
        }
        self.applied = seq;
        true
    }

    pub fn settled(&self) -> bool {
        self.applied == self.issued
    }
}

/// A value fetched in the background with its own load state and sequencing.
#[derive(Debug, Clone, Default)]
pub struct Fetched<T> {
    pub data: T,
    pub load: LoadState,
    seq: RequestSeq,
}

impl<T: Default> Fetched<T> {
    /// Mark a fetch as started and return its sequence number.
    pub fn begin(&mut self) -> u64 {
        self.load = LoadState::Loading;
        self.seq.next()
    }

    /// Apply a fetch result. Stale results are dropped and `false` returned.
    /// Failures reset the data to its empty value.
    pub fn apply(&mut self, seq: u64, result: Result<T, String>) -> bool {
        if !self.seq.accept(seq) {
            return false;
        }
        match result {
            Ok(data) => {
                self.data = data;
                if self.seq.settled() {
                    self.load = LoadState::Loaded;
                }
            }
            Err(e) => {
                self.data = T::default();
                self.load = LoadState::Error(e);
            }
        }
        true
    }
}

/// Modal message; swallows input until dismissed with Enter or Esc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// `"<Action> failed: <detail>"`.
    pub fn failure(action: &str, detail: &str) -> Self {
        Self::new("Error", format!("{action} failed: {detail}"))
    }

    pub fn dismisses(key: &KeyEvent) -> bool {
        matches!(key.code, KeyCode::Enter | KeyCode::Esc)
    }
}

/// Pending destructive operation awaiting `y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirm<T> {
    pub prompt: String,
    pub target: T,
}

impl<T> Confirm<T> {
    pub fn new(prompt: impl Into<String>, target: T) -> Self {
        Self {
            prompt: prompt.into(),
            target,
        }
    }

    /// `y` yields the target, any other key aborts.
    pub fn resolve(self, key: &KeyEvent) -> Option<T> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(self.target),
            _ => None,
        }
    }
}

/// Completed mutation kinds, for alert and status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Create,
    Update,
    Delete,
    Import,
    Export,
    Toggle,
    Control,
    Initialize,
    Train,
    Load,
    Reload,
    ClearHistory,
}

impl Mutation {
    pub fn label(self) -> &'static str {
        match self {
            Mutation::Create => "Create",
            Mutation::Update => "Update",
            Mutation::Delete => "Delete",
            Mutation::Import => "Import",
            Mutation::Export => "Export",
            Mutation::Toggle => "Toggle",
            Mutation::Control => "Control",
            Mutation::Initialize => "Initialize",
            Mutation::Train => "Train",
            Mutation::Load => "Load",
            Mutation::Reload => "Reload",
            Mutation::ClearHistory => "Clear history",
        }
    }
}

/// Single-line text input with a cursor at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    pub value: String,
}

impl TextField {
    pub fn with(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn trimmed(&self) -> &str {
        self.value.trim()
    }

    /// Returns `true` when the key edited the field.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                self.value.push(c);
                true
            }
            KeyCode::Backspace => {
                self.value.pop();
                true
            }
            _ => false,
        }
    }
}

/// Wrapping list cursor.
pub fn step(selected: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let i = selected.unwrap_or(0).min(len - 1);
    Some(if forward {
        (i + 1) % len
    } else if i == 0 {
        len - 1
    } else {
        i - 1
    })
}

/// Ticks per poll at the 50 ms tick rate (~5 s).
pub const POLL_TICKS: usize = 100;

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn late_response_is_discarded() {
        let mut seq = RequestSeq::default();
        let first = seq.next();
        let second = seq.next();
        assert!(seq.accept(second));
        assert!(seq.settled());
        assert!(!seq.accept(first));
    }

    #[test]
    fn early_older_response_does_not_settle() {
        let mut seq = RequestSeq::default();
        let first = seq.next();
        let second = seq.next();
        assert!(seq.accept(first));
        assert!(!seq.settled());
        assert!(seq.accept(second));
        assert!(seq.settled());
    }

    #[test]
    fn never_issued_seq_rejected() {
        let mut seq = RequestSeq::default();
        assert!(!seq.accept(1));
    }

    #[test]
    fn fetched_stays_loading_until_latest() {
        let mut f: Fetched<Vec<u32>> = Fetched::default();
        let a = f.begin();
        let b = f.begin();
        assert!(f.apply(a, Ok(vec![1])));
        assert_eq!(f.load, LoadState::Loading);
        assert!(f.apply(b, Ok(vec![2])));
        assert_eq!(f.load, LoadState::Loaded);
        assert!(!f.apply(a, Ok(vec![3])));
        assert_eq!(f.data, vec![2]);
    }

    #[test]
    fn fetch_failure_degrades_to_empty() {
        let mut f: Fetched<Vec<u32>> = Fetched::default();
        let a = f.begin();
        f.apply(a, Ok(vec![1, 2]));
        let b = f.begin();
        f.apply(b, Err("HTTP 500".into()));
        assert!(f.data.is_empty());
        assert_eq!(f.load.error(), Some("HTTP 500"));
    }

    #[test]
    fn confirm_only_on_y() {
        assert_eq!(Confirm::new("Delete?", 7).resolve(&key('y')), Some(7));
        assert_eq!(Confirm::new("Delete?", 7).resolve(&key('n')), None);
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(Confirm::new("Delete?", 7).resolve(&esc), None);
    }

    #[test]
    fn failure_alert_text() {
        let a = Alert::failure("Delete", "HTTP 404");
        assert_eq!(a.message, "Delete failed: HTTP 404");
    }

    #[test]
    fn step_wraps() {
        assert_eq!(step(Some(2), 3, true), Some(0));
        assert_eq!(step(Some(0), 3, false), Some(2));
        assert_eq!(step(None, 0, true), None);
    }
}
