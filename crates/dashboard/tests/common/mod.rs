//! In-process stand-in for the REST backend, the live socket and the AI
//! service, all served from one axum router.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

/// Behaviour switches and recorded traffic.
#[derive(Clone, Default)]
pub struct Backend {
    /// `/auth/logout` answers 500.
    pub logout_fails: bool,
    /// Frames pushed to a live client when it sends to `/app/replay`.
    pub push: Vec<String>,
    /// Identify frames received on the live socket.
    pub identified: Arc<Mutex<Vec<Value>>>,
    /// Admin users, as JSON.
    pub users: Arc<Mutex<Vec<Value>>>,
}

pub struct Stub {
    addr: String,
    pub backend: Backend,
}

impl Stub {
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn ai_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

pub const VALID_TOKEN: &str = "tok-1";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {VALID_TOKEN}"))
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"})))
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == "alice" && body["password"] == "secret123" {
        (
            StatusCode::OK,
            Json(json!({"accessToken": VALID_TOKEN, "username": "alice", "tokenType": "Bearer"})),
        )
    } else if body["username"] == "mute" {
        (StatusCode::UNAUTHORIZED, Json(json!({})))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Bad credentials", "success": false})),
        )
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == "taken" {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "Username already exists", "success": false})),
        );
    }
    (StatusCode::OK, Json(json!({"message": "User registered", "success": true})))
}

async fn logout(State(backend): State<Backend>) -> (StatusCode, Json<Value>) {
    if backend.logout_fails {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "down"})))
    } else {
        (StatusCode::OK, Json(json!({"message": "Logged out", "success": true})))
    }
}

async fn active_devices(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!([
            {"id": "d-0", "mqttUsername": "bin-00", "brokerUrl": "tcp://broker:1883", "isActive": false},
            {"id": "d-1", "mqttUsername": "bin-01", "brokerUrl": "tcp://broker:1883", "isActive": true}
        ])),
    )
}

async fn broker_status(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(json!({"isConnected": true, "brokerUrl": "tcp://broker:1883"})))
}

async fn register_device(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "id": "d-2",
            "mqttUsername": body["mqttUsername"],
            "brokerUrl": body["brokerUrl"],
            "isActive": true
        })),
    )
}

async fn deactivate_device(Path(id): Path<String>) -> Json<Value> {
    Json(json!({"message": format!("Device {id} deactivated"), "success": true}))
}

async fn list_users(
    State(backend): State<Backend>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let users = backend.users.lock().unwrap().clone();
    let search = q.get("search").cloned().unwrap_or_default();
    let content: Vec<Value> = users
        .into_iter()
        .filter(|u| u["username"].as_str().is_some_and(|name| name.contains(&search)))
        .collect();
    let total = content.len();
    Json(json!({
        "content": content,
        "totalPages": 1,
        "totalElements": total,
        "currentPage": 0,
        "pageSize": 20
    }))
}

async fn update_user_status(
    State(backend): State<Backend>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut users = backend.users.lock().unwrap();
    match users.iter_mut().find(|u| u["id"] == id.as_str()) {
        Some(user) => {
            user["isActive"] = body["isActive"].clone();
            (StatusCode::OK, Json(json!({"message": "Status updated", "success": true})))
        }
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "User not found"}))),
    }
}

async fn latest_readings() -> Json<Value> {
    Json(json!({"data": [
        {"id": "1", "nodeName": "node1", "latitude": 16.071, "longitude": 108.221,
         "distance": 30.0, "gas": 110, "timestamp": "2024-05-01T10:00:00"},
        {"id": "2", "nodeName": "node2", "latitude": 16.072, "longitude": 108.223,
         "distance": 140.0, "gas": 90, "timestamp": "2024-05-01T10:00:00"}
    ]}))
}

async fn history_readings(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({"data": [
            {"id": "9", "nodeName": "node1", "distance": 30.0, "gas": 110, "timestamp": "2024-05-01T10:05:00"},
            {"id": "8", "nodeName": "node1", "distance": 90.0, "gas": 100, "timestamp": "2024-05-01T10:00:00"},
            {"id": "7", "nodeName": "node2", "distance": 140.0, "gas": 90, "timestamp": "2024-05-01T09:55:00"}
        ]})),
    )
}

async fn predict(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["node_id"] == "bad" {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "model error"})));
    }
    let fill = body["fill_percentage"].as_f64().unwrap_or_default();
    let (urgency, hours) = if fill >= 95.0 { ("critical", 1.0) } else { ("low", 40.0) };
    (
        StatusCode::OK,
        Json(json!({
            "node_id": body["node_id"],
            "hours_until_full": hours,
            "predicted_full_at": "2024-05-01T12:00:00",
            "confidence": 0.9,
            "recommendation": "",
            "urgency": urgency
        })),
    )
}

async fn ws_route(ws: WebSocketUpgrade, State(backend): State<Backend>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, backend))
}

async fn handle_socket(mut socket: WebSocket, backend: Backend) {
    while let Some(Ok(msg)) = socket.recv().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let value: Value = serde_json::from_str(text.as_str()).unwrap_or(Value::Null);
        if value["type"] == "CONNECT" {
            backend.identified.lock().unwrap().push(value);
        } else if value["destination"] == "/app/replay" {
            for frame in &backend.push {
                if socket.send(Message::Text(frame.clone().into())).await.is_err() {
                    return;
                }
            }
        }
    }
}

pub async fn start(backend: Backend) -> Stub {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/mqtt/active", get(active_devices))
        .route("/api/mqtt/broker-status", get(broker_status))
        .route("/api/mqtt/register", post(register_device))
        .route("/api/mqtt/{id}/deactivate", post(deactivate_device))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}/status", patch(update_user_status))
        .route("/api/sensor-data/latest", get(latest_readings))
        .route("/api/sensor-data/history", get(history_readings))
        .route("/api/ai/predict-fullness", post(predict))
        .route("/ws", get(ws_route))
        .with_state(backend.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Stub {
        addr: addr.to_string(),
        backend,
    }
}

/// Await `fut`, failing the test after five seconds.
pub async fn within<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}

/// A live endpoint that accepts TCP connections and never completes the
/// WebSocket upgrade. Returns its `ws://` URL.
pub async fn silent_socket() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    format!("ws://{addr}/ws")
}
