//! WebSocket bridge between the browser (dumb microphone and speaker) and
//! the live session. Text frames carry control and events, binary frames
//! carry raw little-endian f32 samples at 16 kHz mono.

use super::state::AppState;
use crate::audio::{codec, AudioInput, MonotonicClock, ScheduledChunk};
use crate::error::AppError;
use crate::live::{EndpointTransport, LiveSession, LiveSessionConfig, SessionEvent};
use crate::tariff::queries;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    /// Microphone permission granted; begin the conversation
    Start,
    Stop,
    /// Microphone permission refused
    Denied { reason: String },
    /// A scheduled chunk finished playing
    Played { id: u64 },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ServerEvent {
    Status {
        session_id: String,
        status: crate::live::LiveStatus,
    },
    Turn {
        speaker: crate::live::Speaker,
        text: String,
    },
    Audio {
        id: u64,
        start_time: f64,
        duration: f64,
        /// Base64 PCM16 at the output sample rate
        data: String,
    },
    Cancel {
        ids: Vec<u64>,
    },
    Error {
        message: String,
    },
}

type PermissionGate = oneshot::Receiver<Result<mpsc::Receiver<Vec<f32>>, String>>;

/// Input whose acquisition is the browser's permission decision: the bridge
/// resolves the gate with a sample channel on grant or a reason on refusal.
struct BridgeInput {
    name: String,
    gate: Option<PermissionGate>,
}

#[async_trait::async_trait]
impl AudioInput for BridgeInput {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, AppError> {
        let gate = self.gate.take().ok_or_else(|| {
            AppError::PermissionDenied("audio input already acquired".to_string())
        })?;
        match gate.await {
            Ok(Ok(receiver)) => Ok(receiver),
            Ok(Err(reason)) => Err(AppError::PermissionDenied(reason)),
            Err(_) => Err(AppError::PermissionDenied(
                "client disconnected before granting access".to_string(),
            )),
        }
    }

    async fn release(&mut self) {
        self.gate = None;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// GET /live/ws
pub async fn live_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();
    info!("live bridge {session_id} opened");

    let (socket_tx, mut socket_rx) = socket.split();
    let socket_tx = Arc::new(Mutex::new(socket_tx));

    let (gate_tx, gate_rx) = oneshot::channel();
    let (samples_tx, samples_rx) = mpsc::channel::<Vec<f32>>(64);
    let input = BridgeInput {
        name: "browser-microphone".to_string(),
        gate: Some(gate_rx),
    };

    let live = &state.config.live;
    let (session, events) = LiveSession::new(
        LiveSessionConfig {
            session_id: session_id.clone(),
            model: state.config.gemini.live_model.clone(),
            voice: live.voice.clone(),
            system_instruction: queries::LIVE_SYSTEM_INSTRUCTION.to_string(),
            block_size: live.block_size,
            output_sample_rate: live.output_sample_rate,
        },
        Box::new(input),
        Box::new(MonotonicClock::new()),
    );
    state
        .sessions
        .write()
        .await
        .insert(session_id.clone(), Arc::clone(&session));

    let event_task = tokio::spawn(forward_events(
        events,
        Arc::clone(&socket_tx),
        session_id.clone(),
    ));

    // The gate sender and sample feed are single-use; Start or Denied
    // consumes the gate, later control frames find it spent.
    let mut gate_tx = Some(gate_tx);
    let mut samples_rx = Some(samples_rx);

    while let Some(frame) = socket_rx.next().await {
        let frame = match frame {
            Ok(f) => f,
            Err(e) => {
                debug!("live bridge {session_id} read error: {e}");
                break;
            }
        };

        match frame {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Start) => {
                    let (Some(gate), Some(rx)) = (gate_tx.take(), samples_rx.take()) else {
                        warn!("live bridge {session_id}: duplicate start ignored");
                        continue;
                    };
                    let _ = gate.send(Ok(rx));
                    start_session(&state, &session).await;
                }
                Ok(ClientMessage::Denied { reason }) => {
                    let Some(gate) = gate_tx.take() else {
                        continue;
                    };
                    let _ = gate.send(Err(reason));
                    // Walks the same path as a refused device acquisition.
                    start_session(&state, &session).await;
                }
                Ok(ClientMessage::Stop) => session.stop().await,
                Ok(ClientMessage::Played { id }) => session.playback_complete(id).await,
                Err(e) => warn!("live bridge {session_id}: unparseable frame: {e}"),
            },
            Message::Binary(bytes) => {
                if bytes.len() % 4 != 0 {
                    warn!("live bridge {session_id}: misaligned sample frame dropped");
                    continue;
                }
                let samples: Vec<f32> = bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                    .collect();
                // Sample delivery never applies backpressure to the socket.
                if let Err(e) = samples_tx.try_send(samples) {
                    debug!("live bridge {session_id}: sample slab dropped: {e}");
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    // Socket gone: same teardown as an explicit stop.
    session.stop().await;
    event_task.abort();
    info!("live bridge {session_id} closed");
}

async fn start_session(state: &AppState, session: &Arc<LiveSession>) {
    let transport = EndpointTransport::new(state.live_url.clone());
    if let Err(e) = session.start(&transport).await {
        warn!("live session {} failed to start: {e}", session.id());
    }
}

/// Pump session events onto the socket as JSON text frames.
async fn forward_events(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    socket_tx: Arc<Mutex<futures::stream::SplitSink<WebSocket, Message>>>,
    session_id: String,
) {
    while let Some(event) = events.recv().await {
        let frame = match event {
            SessionEvent::Status(status) => ServerEvent::Status {
                session_id: session_id.clone(),
                status,
            },
            SessionEvent::Turn(turn) => ServerEvent::Turn {
                speaker: turn.speaker,
                text: turn.text,
            },
            SessionEvent::Audio(chunk) => match encode_chunk(&chunk) {
                Some(event) => event,
                None => continue,
            },
            SessionEvent::Cancelled(ids) => ServerEvent::Cancel { ids },
            SessionEvent::Error(message) => ServerEvent::Error { message },
        };

        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                warn!("live bridge {session_id}: event serialization failed: {e}");
                continue;
            }
        };
        if socket_tx
            .lock()
            .await
            .send(Message::Text(json))
            .await
            .is_err()
        {
            break;
        }
    }
}

/// Re-encode a scheduled chunk's mono samples as base64 PCM16 for the wire.
fn encode_chunk(chunk: &ScheduledChunk) -> Option<ServerEvent> {
    let samples = chunk.buffer.channels.first()?;
    Some(ServerEvent::Audio {
        id: chunk.id,
        start_time: chunk.start_time,
        duration: chunk.duration,
        data: codec::to_transport_text(&codec::encode_samples(samples)),
    })
}
