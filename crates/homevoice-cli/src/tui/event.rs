//! Event system: crossterm polling, tick timer, background gateway calls.

use homevoice_client::{ClientError, Gateway, Page};
use homevoice_types::chat::{ChatReply, ChatRequest, ChatStatistics};
use homevoice_types::device::{
    ControlCommand, Device, DeviceInput, DeviceQuery, DeviceStatistics,
};
use homevoice_types::llm::{LlmConfig, LlmConfigInput, LlmStatus, LlmTestResult, Provider};
use homevoice_types::model::{Artifact, Model, Prediction, RasaStatus, TrainRequest};
use homevoice_types::training::{
    ExampleQuery, ImportRequest, IntentDef, TrainingExample, TrainingExampleInput,
    TrainingStatistics,
};
use ratatui::crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{debug, warn};

use super::state::Mutation;

type Tx = mpsc::Sender<AppEvent>;

// ── AppEvent ────────────────────────────────────────────────────────────────

/// Unified application event. Worker failures arrive as display strings.
pub enum AppEvent {
    /// A crossterm key press event (filtered to Press only).
    Key(KeyEvent),
    /// Periodic tick for spinners and polling.
    Tick,

    // ── Dashboard ──
    DashTraining { seq: u64, result: Result<TrainingStatistics, String> },
    DashDevices { seq: u64, result: Result<DeviceStatistics, String> },
    DashChat { seq: u64, result: Result<ChatStatistics, String> },
    DashHealth { seq: u64, result: Result<(), String> },

    // ── Training ──
    ExamplesLoaded { seq: u64, result: Result<Page<TrainingExample>, String> },
    IntentsLoaded(Result<Vec<IntentDef>, String>),
    TrainingMutated { op: Mutation, result: Result<String, String> },

    // ── Models ──
    ModelsLoaded { seq: u64, result: Result<Vec<Model>, String> },
    RasaStatusLoaded { seq: u64, result: Result<RasaStatus, String> },
    PredictionReady(Result<Prediction, String>),
    ArtifactReady { artifact: Artifact, result: Result<String, String> },
    ModelsMutated { op: Mutation, result: Result<String, String> },

    // ── LLM ──
    LlmConfigsLoaded { seq: u64, result: Result<Vec<LlmConfig>, String> },
    LlmStatusLoaded { seq: u64, result: Result<LlmStatus, String> },
    ProvidersLoaded(Result<Vec<Provider>, String>),
    LlmTested(Result<LlmTestResult, String>),
    LlmMutated { op: Mutation, result: Result<String, String> },

    // ── Devices ──
    DevicesLoaded { seq: u64, result: Result<Vec<Device>, String> },
    DeviceStatsLoaded { seq: u64, result: Result<DeviceStatistics, String> },
    LocationsLoaded(Result<Vec<String>, String>),
    DevicesMutated { op: Mutation, result: Result<String, String> },

    // ── Chat ──
    ChatReplied(Result<ChatReply, String>),
    ChatHistoryCleared(Result<String, String>),
}

// ── Spawn functions ─────────────────────────────────────────────────────────

/// Spawn the crossterm polling + tick thread.
pub fn spawn_event_thread(tick_rate: Duration) -> (mpsc::Sender<AppEvent>, mpsc::Receiver<AppEvent>) {
    let (tx, rx) = mpsc::channel();
    let poll_tx = tx.clone();

    std::thread::spawn(move || {
        loop {
            if event::poll(tick_rate).unwrap_or(false) {
                if let Ok(ev) = event::read() {
                    match ev {
                        // CRITICAL: only forward Press events, otherwise every
                        // key registers twice on Windows.
                        CtEvent::Key(key) if key.kind == KeyEventKind::Press => {
                            if poll_tx.send(AppEvent::Key(key)).is_err() {
                                return;
                            }
                        }
                        _ => {}
                    }
                }
            } else if poll_tx.send(AppEvent::Tick).is_err() {
                return;
            }
        }
    });

    (tx, rx)
}

/// Run one blocking gateway call on a worker thread and post its result.
fn run<T, F, W>(gw: &Arc<Gateway>, tx: &Tx, what: &'static str, call: F, wrap: W)
where
    T: 'static,
    F: FnOnce(&Gateway) -> Result<T, ClientError> + Send + 'static,
    W: FnOnce(Result<T, String>) -> AppEvent + Send + 'static,
{
    let gw = Arc::clone(gw);
    let tx = tx.clone();
    std::thread::spawn(move || {
        debug!(request = what, "Worker started");
        let result = call(&gw).map_err(|e| {
            warn!(request = what, error = %e, "Request failed");
            e.detail()
        });
        let _ = tx.send(wrap(result));
    });
}

// ── Dashboard ──

pub fn spawn_dashboard(gw: &Arc<Gateway>, tx: &Tx, seqs: super::screens::dashboard::DashboardSeqs) {
    run(gw, tx, "training.statistics", |g| g.training().statistics(), move |result| {
        AppEvent::DashTraining { seq: seqs.training, result }
    });
    run(gw, tx, "devices.statistics", |g| g.devices().statistics(), move |result| {
        AppEvent::DashDevices { seq: seqs.devices, result }
    });
    run(gw, tx, "chat.statistics", |g| g.chat().statistics(), move |result| {
        AppEvent::DashChat { seq: seqs.chat, result }
    });
    run(gw, tx, "system.health", |g| g.system().health().map(|_| ()), move |result| {
        AppEvent::DashHealth { seq: seqs.health, result }
    });
}

// ── Training ──

pub fn spawn_fetch_examples(gw: &Arc<Gateway>, tx: &Tx, seq: u64, query: ExampleQuery) {
    run(gw, tx, "training.list", move |g| g.training().list(&query), move |result| {
        AppEvent::ExamplesLoaded { seq, result }
    });
}

pub fn spawn_fetch_intents(gw: &Arc<Gateway>, tx: &Tx) {
    run(gw, tx, "training.intents", |g| g.training().intents(), AppEvent::IntentsLoaded);
}

pub fn spawn_create_example(gw: &Arc<Gateway>, tx: &Tx, input: TrainingExampleInput) {
    run(
        gw,
        tx,
        "training.create",
        move |g| {
            g.training().create(&input).map(|saved| match saved {
                Some(ex) => format!("Created example #{}", ex.id),
                None => format!("Created example '{}'", input.text),
            })
        },
        |result| AppEvent::TrainingMutated { op: Mutation::Create, result },
    );
}

pub fn spawn_update_example(gw: &Arc<Gateway>, tx: &Tx, id: i64, input: TrainingExampleInput) {
    run(
        gw,
        tx,
        "training.update",
        move |g| g.training().update(id, &input).map(|_| format!("Updated example #{id}")),
        |result| AppEvent::TrainingMutated { op: Mutation::Update, result },
    );
}

pub fn spawn_delete_example(gw: &Arc<Gateway>, tx: &Tx, id: i64) {
    run(
        gw,
        tx,
        "training.delete",
        move |g| g.training().delete(id).map(|()| format!("Deleted example #{id}")),
        |result| AppEvent::TrainingMutated { op: Mutation::Delete, result },
    );
}

pub fn spawn_import(gw: &Arc<Gateway>, tx: &Tx, req: ImportRequest) {
    run(
        gw,
        tx,
        "training.import",
        move |g| {
            g.training().import(&req).map(|data| {
                let count = ["imported_count", "imported", "count"]
                    .iter()
                    .find_map(|k| data.get(*k).and_then(|v| v.as_u64()));
                match count {
                    Some(n) => format!("Imported {n} examples"),
                    None => "Import complete".to_string(),
                }
            })
        },
        |result| AppEvent::TrainingMutated { op: Mutation::Import, result },
    );
}

/// Fetch the JSON export and write it under `export_dir`.
pub fn spawn_export(gw: &Arc<Gateway>, tx: &Tx, export_dir: PathBuf) {
    let gw = Arc::clone(gw);
    let tx = tx.clone();
    std::thread::spawn(move || {
        let path = crate::export::default_path(&export_dir, "json");
        let result = match gw.training().export("json") {
            Ok(payload) => crate::export::write(&path, &payload)
                .map(|()| format!("Exported to {}", path.display()))
                .map_err(|e| {
                    warn!(path = %path.display(), error = %e, "Export write failed");
                    format!("cannot write {}: {e}", path.display())
                }),
            Err(e) => {
                warn!(request = "training.export", error = %e, "Request failed");
                Err(e.detail())
            }
        };
        let _ = tx.send(AppEvent::TrainingMutated {
            op: Mutation::Export,
            result,
        });
    });
}

// ── Models ──

pub fn spawn_fetch_models(gw: &Arc<Gateway>, tx: &Tx, list_seq: u64, status_seq: u64) {
    run(gw, tx, "rasa.models", |g| g.models().list(), move |result| {
        AppEvent::ModelsLoaded { seq: list_seq, result }
    });
    run(gw, tx, "rasa.status", |g| g.models().status(), move |result| {
        AppEvent::RasaStatusLoaded { seq: status_seq, result }
    });
}

pub fn spawn_train(gw: &Arc<Gateway>, tx: &Tx, req: TrainRequest) {
    run(
        gw,
        tx,
        "rasa.train",
        move |g| g.models().train(&req).map(|_| format!("Trained model '{}'", req.model_name)),
        |result| AppEvent::ModelsMutated { op: Mutation::Train, result },
    );
}

pub fn spawn_load_model(gw: &Arc<Gateway>, tx: &Tx, id: i64) {
    run(
        gw,
        tx,
        "rasa.load",
        move |g| g.models().load(id).map(|_| format!("Loaded model #{id}")),
        |result| AppEvent::ModelsMutated { op: Mutation::Load, result },
    );
}

pub fn spawn_predict(gw: &Arc<Gateway>, tx: &Tx, text: String) {
    run(gw, tx, "rasa.predict", move |g| g.models().predict(&text), AppEvent::PredictionReady);
}

pub fn spawn_generate(gw: &Arc<Gateway>, tx: &Tx, artifact: Artifact) {
    run(
        gw,
        tx,
        "rasa.generate",
        move |g| {
            g.models().generate(artifact).map(|v| match v {
                serde_json::Value::String(s) => s,
                other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
            })
        },
        move |result| AppEvent::ArtifactReady { artifact, result },
    );
}

// ── LLM ──

pub fn spawn_fetch_llm(gw: &Arc<Gateway>, tx: &Tx, list_seq: u64, status_seq: u64) {
    run(gw, tx, "llm.configs", |g| g.llm().list(), move |result| {
        AppEvent::LlmConfigsLoaded { seq: list_seq, result }
    });
    run(gw, tx, "llm.status", |g| g.llm().status(), move |result| {
        AppEvent::LlmStatusLoaded { seq: status_seq, result }
    });
}

pub fn spawn_fetch_providers(gw: &Arc<Gateway>, tx: &Tx) {
    run(gw, tx, "llm.providers", |g| g.llm().providers(), AppEvent::ProvidersLoaded);
}

pub fn spawn_create_llm(gw: &Arc<Gateway>, tx: &Tx, input: LlmConfigInput) {
    run(
        gw,
        tx,
        "llm.create",
        move |g| {
            g.llm().create(&input).map(|saved| {
                let (provider, model) = saved
                    .map(|c| (c.provider, c.model_name))
                    .unwrap_or_else(|| (input.provider.clone(), input.model_name.clone()));
                format!("Added {provider} / {model}")
            })
        },
        |result| AppEvent::LlmMutated { op: Mutation::Create, result },
    );
}

pub fn spawn_update_llm(gw: &Arc<Gateway>, tx: &Tx, id: i64, input: LlmConfigInput) {
    run(
        gw,
        tx,
        "llm.update",
        move |g| g.llm().update(id, &input).map(|_| format!("Updated config #{id}")),
        |result| AppEvent::LlmMutated { op: Mutation::Update, result },
    );
}

pub fn spawn_delete_llm(gw: &Arc<Gateway>, tx: &Tx, id: i64) {
    run(
        gw,
        tx,
        "llm.delete",
        move |g| g.llm().delete(id).map(|()| format!("Deleted config #{id}")),
        |result| AppEvent::LlmMutated { op: Mutation::Delete, result },
    );
}

pub fn spawn_toggle_llm(gw: &Arc<Gateway>, tx: &Tx, id: i64) {
    run(
        gw,
        tx,
        "llm.toggle",
        move |g| g.llm().toggle(id).map(|_| format!("Toggled config #{id}")),
        |result| AppEvent::LlmMutated { op: Mutation::Toggle, result },
    );
}

pub fn spawn_reload_llm(gw: &Arc<Gateway>, tx: &Tx) {
    run(
        gw,
        tx,
        "llm.reload",
        |g| g.llm().reload().map(|_| "LLM configs reloaded".to_string()),
        |result| AppEvent::LlmMutated { op: Mutation::Reload, result },
    );
}

pub fn spawn_test_llm(gw: &Arc<Gateway>, tx: &Tx, text: String) {
    run(gw, tx, "llm.test", move |g| g.llm().test(&text), AppEvent::LlmTested);
}

// ── Devices ──

pub fn spawn_fetch_devices(gw: &Arc<Gateway>, tx: &Tx, seq: u64, query: DeviceQuery) {
    run(gw, tx, "devices.list", move |g| g.devices().list(&query), move |result| {
        AppEvent::DevicesLoaded { seq, result }
    });
}

pub fn spawn_fetch_device_stats(gw: &Arc<Gateway>, tx: &Tx, seq: u64) {
    run(gw, tx, "devices.statistics", |g| g.devices().statistics(), move |result| {
        AppEvent::DeviceStatsLoaded { seq, result }
    });
}

pub fn spawn_fetch_locations(gw: &Arc<Gateway>, tx: &Tx) {
    run(gw, tx, "devices.locations", |g| g.devices().locations(), AppEvent::LocationsLoaded);
}

pub fn spawn_create_device(gw: &Arc<Gateway>, tx: &Tx, input: DeviceInput) {
    run(
        gw,
        tx,
        "devices.create",
        move |g| {
            g.devices().create(&input).map(|saved| {
                let name = saved.map_or_else(|| input.name.clone(), |d| d.name);
                format!("Created '{name}'")
            })
        },
        |result| AppEvent::DevicesMutated { op: Mutation::Create, result },
    );
}

pub fn spawn_update_device(gw: &Arc<Gateway>, tx: &Tx, id: i64, input: DeviceInput) {
    run(
        gw,
        tx,
        "devices.update",
        move |g| {
            g.devices().update(id, &input).map(|saved| {
                let name = saved.map_or_else(|| input.name.clone(), |d| d.name);
                format!("Updated '{name}'")
            })
        },
        |result| AppEvent::DevicesMutated { op: Mutation::Update, result },
    );
}

pub fn spawn_delete_device(gw: &Arc<Gateway>, tx: &Tx, id: i64) {
    run(
        gw,
        tx,
        "devices.delete",
        move |g| g.devices().delete(id).map(|()| format!("Deleted device #{id}")),
        |result| AppEvent::DevicesMutated { op: Mutation::Delete, result },
    );
}

pub fn spawn_initialize_devices(gw: &Arc<Gateway>, tx: &Tx) {
    run(
        gw,
        tx,
        "devices.initialize",
        |g| g.devices().initialize().map(|_| "Default devices created".to_string()),
        |result| AppEvent::DevicesMutated { op: Mutation::Initialize, result },
    );
}

pub fn spawn_control_device(gw: &Arc<Gateway>, tx: &Tx, id: i64, cmd: ControlCommand) {
    run(
        gw,
        tx,
        "devices.control",
        move |g| {
            g.devices()
                .control_by_id(id, &cmd)
                .map(|_| format!("Control succeeded: {}", cmd.action))
        },
        |result| AppEvent::DevicesMutated { op: Mutation::Control, result },
    );
}

// ── Chat ──

pub fn spawn_chat_send(gw: &Arc<Gateway>, tx: &Tx, req: ChatRequest) {
    run(gw, tx, "chat.send", move |g| g.chat().send(&req), AppEvent::ChatReplied);
}

pub fn spawn_clear_session(gw: &Arc<Gateway>, tx: &Tx, session_id: String) {
    run(
        gw,
        tx,
        "chat.clear_session",
        move |g| {
            g.chat()
                .clear_session(&session_id)
                .map(|()| format!("Stored history for {session_id} deleted"))
        },
        AppEvent::ChatHistoryCleared,
    );
}
