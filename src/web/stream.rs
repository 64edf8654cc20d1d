use axum::extract::ws::Message;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::magnitude::Magnitude;
use crate::web::history::{AlertHistory, AlertRecord, SharedHistory};

/// Event published to every connected dashboard, serialized as
/// `{"type": ..., "data": ...}` with the event kinds the dashboard listens
/// for: `alert`, `sensorData`, `systemMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum WsMessage {
    Alert { magnitude: Magnitude },
    SensorData { vibration: f64, tilt: f64, piezo: f64 },
    SystemMessage(String),
}

/// Shared dashboard state: one broadcast writer (the fan-out coordinator),
/// any number of subscribed sockets. Delivery is fire-and-forget; a send
/// with no subscribers is not an error.
#[derive(Clone)]
pub struct WebState {
    pub tx: broadcast::Sender<WsMessage>,
    pub history: SharedHistory,
}

impl WebState {
    pub fn new(history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(100);
        Self {
            tx,
            history: AlertHistory::shared(history_capacity),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.tx.subscribe()
    }

    pub fn broadcast_alert(&self, magnitude: Magnitude) {
        let _ = self.tx.send(WsMessage::Alert { magnitude });
    }

    pub fn broadcast_sensor_data(&self, vibration: f64, tilt: f64, piezo: f64) {
        let _ = self.tx.send(WsMessage::SensorData {
            vibration,
            tilt,
            piezo,
        });
    }

    pub fn broadcast_system_message(&self, text: String) {
        let _ = self.tx.send(WsMessage::SystemMessage(text));
    }

    pub fn record_alert(&self, magnitude: Magnitude, samples_used: usize) {
        self.history
            .lock()
            .unwrap()
            .add(AlertRecord::new(magnitude, samples_used));
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: axum::extract::ws::WebSocket, state: WebState) {
    debug!("Dashboard connected");
    let (mut sender, _) = socket.split();
    let mut rx = state.subscribe();

    while let Ok(msg) = rx.recv().await {
        if let Ok(json) = serde_json::to_string(&msg) {
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    }
}
