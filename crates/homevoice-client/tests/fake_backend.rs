//! End-to-end tests against an in-process fake backend.
//!
//! The fake runs axum on its own tokio runtime thread, bound to an ephemeral
//! port; the blocking client is driven from the test thread.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use homevoice_client::{ClientError, Gateway, GatewayConfig};
use homevoice_types::chat::ChatRequest;
use homevoice_types::device::{DeviceQuery, DeviceType, OnlineFilter};
use homevoice_types::model::TrainRequest;
use homevoice_types::training::{ExampleQuery, TrainingExampleInput};
use homevoice_types::Envelope;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Store {
    examples: Vec<Value>,
    next_id: i64,
    llm: Vec<Value>,
    devices: Vec<Value>,
    imports: usize,
    controls: Vec<Value>,
}

impl Store {
    fn seeded() -> Self {
        Self {
            examples: vec![
                json!({"id": 1, "text": "你好", "intent": "greet", "entities": []}),
                json!({"id": 2, "text": "再见", "intent": "goodbye", "entities": []}),
            ],
            next_id: 3,
            llm: vec![
                json!({"id": 1, "provider": "openai", "model_name": "gpt-4o", "api_key": "sk-1", "base_url": "", "is_active": true, "priority": 1}),
                json!({"id": 2, "provider": "qwen", "model_name": "qwen-max", "api_key": "sk-2", "base_url": "", "is_active": true, "priority": 2}),
            ],
            devices: vec![
                json!({"id": 1, "name": "客厅灯", "type": "light", "location": "客厅", "is_online": true}),
                json!({"id": 2, "name": "卧室空调", "type": "air_conditioner", "location": "卧室", "is_online": true}),
                json!({"id": 3, "name": "书房灯", "type": "light", "location": "书房", "is_online": false}),
                json!({"id": 4, "name": "阳台风扇", "type": "fan", "location": "阳台", "is_online": true}),
            ],
            ..Default::default()
        }
    }
}

#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<Store>>,
    health_delay: Duration,
}

fn ok(data: Value) -> Response {
    Json(Envelope::ok(data)).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    (status, Json(Envelope::<Value>::failure(message))).into_response()
}

async fn list_examples(
    State(st): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let store = st.store.lock().unwrap();
    let page: usize = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page: usize = q.get("per_page").and_then(|p| p.parse().ok()).unwrap_or(20);
    let rows: Vec<Value> = store
        .examples
        .iter()
        .filter(|e| q.get("intent").map_or(true, |i| e["intent"] == i.as_str()))
        .filter(|e| {
            q.get("search")
                .map_or(true, |s| e["text"].as_str().unwrap_or("").contains(s.as_str()))
        })
        .cloned()
        .collect();
    let total = rows.len();
    let pages = total.div_ceil(per_page);
    let data: Vec<Value> = rows
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();
    Json(json!({
        "success": true,
        "data": data,
        "pagination": {"page": page, "per_page": per_page, "total": total, "pages": pages}
    }))
    .into_response()
}

async fn create_example(State(st): State<AppState>, Json(body): Json<Value>) -> Response {
    let mut store = st.store.lock().unwrap();
    let id = store.next_id;
    store.next_id += 1;
    let row = json!({
        "id": id,
        "text": body["text"],
        "intent": body["intent"],
        "entities": body.get("entities").cloned().unwrap_or(json!([])),
        "created_at": "2025-08-06T12:00:00",
    });
    store.examples.push(row.clone());
    (StatusCode::CREATED, Json(Envelope::ok(row))).into_response()
}

// Confirms without echoing the row, like the production backend on updates.
async fn update_example(
    State(st): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut store = st.store.lock().unwrap();
    match store.examples.iter_mut().find(|e| e["id"] == id) {
        Some(row) => {
            row["text"] = body["text"].clone();
            row["intent"] = body["intent"].clone();
            Json(json!({"success": true, "message": "updated"})).into_response()
        }
        None => fail(StatusCode::NOT_FOUND, "training data not found"),
    }
}

async fn delete_example(State(st): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut store = st.store.lock().unwrap();
    let before = store.examples.len();
    store.examples.retain(|e| e["id"] != id);
    if store.examples.len() == before {
        return fail(StatusCode::NOT_FOUND, "training data not found");
    }
    ok(Value::Null)
}

async fn import_examples(State(st): State<AppState>, Json(body): Json<Value>) -> Response {
    let mut store = st.store.lock().unwrap();
    store.imports += 1;
    let n = body["data"].as_array().map(Vec::len).unwrap_or(0);
    ok(json!({"imported": n}))
}

async fn list_llm(State(st): State<AppState>) -> Response {
    ok(Value::Array(st.store.lock().unwrap().llm.clone()))
}

async fn toggle_llm(State(st): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut store = st.store.lock().unwrap();
    match store.llm.iter_mut().find(|c| c["id"] == id) {
        Some(cfg) => {
            let active = cfg["is_active"].as_bool().unwrap_or(false);
            cfg["is_active"] = json!(!active);
            ok(cfg.clone())
        }
        None => fail(StatusCode::NOT_FOUND, "config not found"),
    }
}

async fn llm_status(State(st): State<AppState>) -> Response {
    let store = st.store.lock().unwrap();
    let active: Vec<&Value> = store.llm.iter().filter(|c| c["is_active"] == true).collect();
    ok(json!({
        "active_configs_count": active.len(),
        "total_configs": store.llm.len(),
        "active_providers": active.iter().map(|c| c["provider"].clone()).collect::<Vec<_>>(),
    }))
}

async fn list_devices(
    State(st): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let store = st.store.lock().unwrap();
    let rows: Vec<Value> = store
        .devices
        .iter()
        .filter(|d| q.get("type").map_or(true, |t| d["type"] == t.as_str()))
        .filter(|d| match q.get("status").map(String::as_str) {
            Some("online") => d["is_online"] == true,
            Some("offline") => d["is_online"] == false,
            _ => true,
        })
        .cloned()
        .collect();
    ok(Value::Array(rows))
}

async fn control_device(
    State(st): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut store = st.store.lock().unwrap();
    store.controls.push(json!({"id": id, "body": body}));
    ok(json!({"device_id": id, "state": {"power": "on"}}))
}

async fn get_model(Path(id): Path<i64>) -> Response {
    if id == 1 {
        ok(json!({"id": 1, "name": "model_20250806", "status": "ready", "file_size": 1048576}))
    } else {
        fail(StatusCode::NOT_FOUND, "model not found")
    }
}

async fn train(Json(body): Json<Value>) -> Response {
    if body["model_name"] == "taken" {
        // 200 with a failed envelope
        return Json(Envelope::<Value>::failure("model name already exists")).into_response();
    }
    ok(json!({"status": "training"}))
}

async fn rasa_status() -> Response {
    (StatusCode::OK, "<html>bad gateway</html>").into_response()
}

async fn chat_message(Json(body): Json<Value>) -> Response {
    ok(json!({
        "response": format!("收到: {}", body["text"].as_str().unwrap_or("")),
        "intent": "turn_on_light",
        "confidence": 0.91,
        "entities": [{"entity": "location", "value": "客厅"}],
        "model_used": "rasa",
        "session_id": body["session_id"],
    }))
}

async fn health(State(st): State<AppState>) -> Response {
    if !st.health_delay.is_zero() {
        tokio::time::sleep(st.health_delay).await;
    }
    Json(json!({"status": "healthy"})).into_response()
}

struct FakeBackend {
    base_url: String,
    store: Arc<Mutex<Store>>,
}

impl FakeBackend {
    fn start() -> Self {
        Self::start_with_health_delay(Duration::ZERO)
    }

    fn start_with_health_delay(health_delay: Duration) -> Self {
        let store = Arc::new(Mutex::new(Store::seeded()));
        let state = AppState {
            store: store.clone(),
            health_delay,
        };
        let app = Router::new()
            .route("/api/training/data", get(list_examples).post(create_example))
            .route(
                "/api/training/data/{id}",
                put(update_example).delete(delete_example),
            )
            .route("/api/training/data/import", post(import_examples))
            .route("/api/llm/configs", get(list_llm))
            .route("/api/llm/configs/{id}/toggle", post(toggle_llm))
            .route("/api/llm/status", get(llm_status))
            .route("/api/devices", get(list_devices))
            .route("/api/devices/{id}/control", post(control_device))
            .route("/api/rasa/models/{id}", get(get_model))
            .route("/api/rasa/train", post(train))
            .route("/api/rasa/status", get(rasa_status))
            .route("/api/chat/message", post(chat_message))
            .route("/api/health", get(health))
            .with_state(state);

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });
        let addr = rx.recv().unwrap();
        Self {
            base_url: format!("http://{addr}/api"),
            store,
        }
    }

    fn gateway(&self) -> Gateway {
        self.gateway_with_timeout(Duration::from_secs(5))
    }

    fn gateway_with_timeout(&self, timeout: Duration) -> Gateway {
        Gateway::new(GatewayConfig {
            base_url: self.base_url.clone(),
            timeout,
        })
        .unwrap()
    }
}

#[test]
fn created_example_appears_once_in_next_list() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    let created = gw
        .training()
        .create(&TrainingExampleInput {
            text: "打开客厅灯".into(),
            intent: "turn_on_light".into(),
            entities: vec![],
        })
        .unwrap()
        .expect("backend echoes the created row");
    assert_eq!(created.intent, "turn_on_light");

    let page = gw.training().list(&ExampleQuery::default()).unwrap();
    let matches = page
        .items
        .iter()
        .filter(|e| e.text == "打开客厅灯" && e.intent == "turn_on_light")
        .count();
    assert_eq!(matches, 1);
    assert_eq!(page.pagination.map(|p| p.total), Some(3));
}

#[test]
fn update_confirmed_without_data_is_success() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    let echoed = gw
        .training()
        .update(
            1,
            &TrainingExampleInput {
                text: "早上好".into(),
                intent: "greet".into(),
                entities: vec![],
            },
        )
        .unwrap();
    assert!(echoed.is_none());

    let page = gw.training().list(&ExampleQuery::default()).unwrap();
    assert!(page.items.iter().any(|e| e.id == 1 && e.text == "早上好"));
}

#[test]
fn deleted_example_never_returns() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    gw.training().delete(1).unwrap();
    let page = gw.training().list(&ExampleQuery::default()).unwrap();
    assert!(page.items.iter().all(|e| e.id != 1));

    let err = gw.training().delete(1).unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[test]
fn list_passes_filters_to_backend() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    let page = gw
        .training()
        .list(&ExampleQuery {
            intent: Some("greet".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].text, "你好");

    let lights = gw
        .devices()
        .list(&DeviceQuery {
            device_type: Some(DeviceType::Light),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(lights.len(), 2);
    assert!(lights.iter().all(|d| d.device_type == DeviceType::Light));
}

#[test]
fn unrecognized_device_type_keeps_the_list() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    let online = gw
        .devices()
        .list(&DeviceQuery {
            status: Some(OnlineFilter::Online),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(online.len(), 3);
    let fan = online.iter().find(|d| d.id == 4).unwrap();
    assert_eq!(fan.device_type, DeviceType::Unknown);
    assert!(fan.device_type.actions().is_empty());
}

#[test]
fn toggling_active_config_lowers_active_count_by_one() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    let before = gw.llm().status().unwrap().active_configs_count;
    let target = gw
        .llm()
        .list()
        .unwrap()
        .into_iter()
        .find(|c| c.is_active)
        .unwrap();
    gw.llm().toggle(target.id).unwrap();
    let after = gw.llm().status().unwrap().active_configs_count;
    assert_eq!(after, before - 1);
}

#[test]
fn not_found_maps_to_transport_with_body() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    let model = gw.models().get(1).unwrap();
    assert_eq!(model.size_label(), "1.00 MB");

    match gw.models().get(99).unwrap_err() {
        ClientError::Transport { status, url, body } => {
            assert_eq!(status, Some(404));
            assert!(url.ends_with("/api/rasa/models/99"));
            assert!(body.contains("model not found"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[test]
fn failed_envelope_maps_to_rejected() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    let err = gw
        .models()
        .train(&TrainRequest {
            model_name: "taken".into(),
        })
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected { ref message, .. } if message == "model name already exists"));
}

#[test]
fn blank_model_name_rejected_locally() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();
    let err = gw
        .models()
        .train(&TrainRequest {
            model_name: "  ".into(),
        })
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
}

#[test]
fn non_envelope_body_maps_to_decode() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();
    assert!(matches!(
        gw.models().status().unwrap_err(),
        ClientError::Decode { .. }
    ));
}

#[test]
fn slow_backend_times_out() {
    let backend = FakeBackend::start_with_health_delay(Duration::from_secs(3));
    let gw = backend.gateway_with_timeout(Duration::from_millis(200));
    let err = gw.system().health().unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err:?}");
}

#[test]
fn health_accepts_plain_json() {
    let backend = FakeBackend::start();
    let body = backend.gateway().system().health().unwrap();
    assert_eq!(body["status"], "healthy");
}

#[test]
fn malformed_import_never_reaches_backend() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    let err = gw.training().import_json("[{\"text\": ").unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(backend.store.lock().unwrap().imports, 0);

    let summary = gw
        .training()
        .import_json(r#"[{"text":"关闭空调","intent":"turn_off_ac"}]"#)
        .unwrap();
    assert_eq!(summary["imported"], 1);
    assert_eq!(backend.store.lock().unwrap().imports, 1);
}

#[test]
fn control_by_id_sends_action_and_value() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();

    let spec = DeviceType::Light.action("set_brightness").unwrap();
    let cmd = spec.command("60").unwrap();
    gw.devices().control_by_id(1, &cmd).unwrap();

    let store = backend.store.lock().unwrap();
    assert_eq!(store.controls.len(), 1);
    assert_eq!(
        store.controls[0]["body"],
        json!({"action": "set_brightness", "value": 60})
    );
}

#[test]
fn chat_reply_carries_classification() {
    let backend = FakeBackend::start();
    let gw = backend.gateway();
    let reply = gw
        .chat()
        .send(&ChatRequest {
            text: "打开客厅灯".into(),
            session_id: "session_1".into(),
        })
        .unwrap();
    assert_eq!(reply.intent.as_deref(), Some("turn_on_light"));
    assert_eq!(reply.model_used.as_deref(), Some("rasa"));
    assert_eq!(reply.entities.len(), 1);
}

#[test]
fn unreachable_backend_is_transport_without_status() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gw = Gateway::new(GatewayConfig {
        base_url: format!("http://{addr}/api"),
        timeout: Duration::from_secs(2),
    })
    .unwrap();
    let err = gw.system().health().unwrap_err();
    assert!(matches!(err, ClientError::Transport { status: None, .. }));
}
