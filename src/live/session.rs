//! Live conversation session: owns the lifecycle of one duplex audio
//! exchange with the conversational endpoint, from permission request to
//! teardown.

use crate::audio::capture::{AudioInput, BlockFramer};
use crate::audio::codec;
use crate::audio::playback::{PlaybackClock, PlaybackScheduler, PlaybackSink, ScheduledChunk};
use crate::error::AppError;
use crate::live::transcript::{TranscriptAssembler, TranscriptTurn};
use crate::live::wire::{
    ClientSetup, Content, GenerationConfig, Part, PrebuiltVoiceConfig, RealtimeInput, ServerMessage,
    Setup, SpeechConfig, VoiceConfig,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Connection lifecycle of a session.
///
/// `Errored` and manual stop both fully release resources; there is no
/// automatic reconnect. A new conversation gets a new session object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiveStatus {
    Idle,
    RequestingPermission,
    Connecting,
    Connected,
    Errored,
}

/// Everything a session pushes outward, consumed by the WebSocket bridge.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Status(LiveStatus),
    /// A committed transcript turn (emitted in user, model pairs)
    Turn(TranscriptTurn),
    /// A decoded audio chunk with its playback slot
    Audio(ScheduledChunk),
    /// In-flight chunks cancelled by an interruption
    Cancelled(Vec<u64>),
    Error(String),
}

/// Duplex connection seam; the production implementation dials the hosted
/// endpoint over WebSocket, tests script their own.
#[async_trait::async_trait]
pub trait LiveTransport: Send + Sync {
    async fn connect(&self, setup: ClientSetup) -> Result<LiveConnection, AppError>;
}

pub struct LiveConnection {
    pub sender: Box<dyn LiveSender>,
    pub inbound: mpsc::Receiver<Result<ServerMessage, AppError>>,
}

#[async_trait::async_trait]
pub trait LiveSender: Send {
    async fn send(&mut self, frame: RealtimeInput) -> Result<(), AppError>;
    async fn close(&mut self) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct LiveSessionConfig {
    pub session_id: String,
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
    /// Samples per outbound block
    pub block_size: usize,
    /// Rate of audio streamed back by the model
    pub output_sample_rate: u32,
}

/// Mutable session state. One lock preserves the ordering discipline of a
/// single-threaded event loop: no two inbound events are applied at once.
struct SessionCore {
    assembler: TranscriptAssembler,
    scheduler: PlaybackScheduler,
    turns: Vec<TranscriptTurn>,
}

/// Forwards scheduling decisions onto the session event channel.
struct EventSink {
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl PlaybackSink for EventSink {
    fn play(&mut self, chunk: &ScheduledChunk) {
        let _ = self.events.send(SessionEvent::Audio(chunk.clone()));
    }

    fn cancel(&mut self, ids: &[u64]) {
        let _ = self.events.send(SessionEvent::Cancelled(ids.to_vec()));
    }
}

pub struct LiveSession {
    config: LiveSessionConfig,
    created_at: chrono::DateTime<chrono::Utc>,
    status: RwLock<LiveStatus>,
    core: Mutex<SessionCore>,
    input: Mutex<Box<dyn AudioInput>>,
    sender: Mutex<Option<Box<dyn LiveSender>>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    /// Guards the single teardown path (stop, error and close can race)
    torn_down: AtomicBool,
    started: AtomicBool,
    outbound_task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveSession {
    /// Build a session around an audio input and playback clock. Returns the
    /// session and the receiver its events arrive on.
    pub fn new(
        config: LiveSessionConfig,
        input: Box<dyn AudioInput>,
        clock: Box<dyn PlaybackClock>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let scheduler = PlaybackScheduler::new(
            clock,
            Box::new(EventSink {
                events: events_tx.clone(),
            }),
            config.output_sample_rate,
        );

        let session = Arc::new(Self {
            config,
            created_at: chrono::Utc::now(),
            status: RwLock::new(LiveStatus::Idle),
            core: Mutex::new(SessionCore {
                assembler: TranscriptAssembler::new(),
                scheduler,
                turns: Vec::new(),
            }),
            input: Mutex::new(input),
            sender: Mutex::new(None),
            events: events_tx,
            torn_down: AtomicBool::new(false),
            started: AtomicBool::new(false),
            outbound_task: Mutex::new(None),
        });

        (session, events_rx)
    }

    pub fn id(&self) -> &str {
        &self.config.session_id
    }

    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.created_at
    }

    pub async fn status(&self) -> LiveStatus {
        *self.status.read().await
    }

    /// Committed transcript turns in arrival order.
    pub async fn transcript(&self) -> Vec<TranscriptTurn> {
        self.core.lock().await.turns.clone()
    }

    /// The client finished playing a scheduled chunk.
    pub async fn playback_complete(&self, chunk_id: u64) {
        self.core.lock().await.scheduler.complete(chunk_id);
    }

    fn setup_message(&self) -> ClientSetup {
        ClientSetup {
            setup: Setup {
                model: self.config.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: self.config.voice.clone(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    parts: vec![Part {
                        text: Some(self.config.system_instruction.clone()),
                        inline_data: None,
                    }],
                },
                input_audio_transcription: serde_json::json!({}),
                output_audio_transcription: serde_json::json!({}),
            },
        }
    }

    async fn set_status(&self, status: LiveStatus) {
        *self.status.write().await = status;
        let _ = self.events.send(SessionEvent::Status(status));
    }

    /// Start the conversation. Valid only from `Idle`; a session object is
    /// good for one conversation.
    pub async fn start(
        self: &Arc<Self>,
        transport: &dyn LiveTransport,
    ) -> Result<(), AppError> {
        if self.torn_down.load(Ordering::SeqCst) || self.started.swap(true, Ordering::SeqCst) {
            return Err(AppError::InvalidRequest(
                "live session already started".to_string(),
            ));
        }

        info!("live session {} starting", self.config.session_id);
        self.set_status(LiveStatus::RequestingPermission).await;

        // Guard scope matters: teardown takes the input lock again.
        let acquired = {
            let mut input = self.input.lock().await;
            input.acquire().await
        };
        let capture_rx = match acquired {
            Ok(rx) => rx,
            Err(e) => {
                warn!("live session {}: {}", self.config.session_id, e);
                self.teardown(LiveStatus::Errored, Some(e.to_string())).await;
                return Err(e);
            }
        };

        self.set_status(LiveStatus::Connecting).await;

        let connection = match transport.connect(self.setup_message()).await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("live session {}: {}", self.config.session_id, e);
                self.teardown(LiveStatus::Errored, Some(e.to_string())).await;
                return Err(e);
            }
        };

        *self.sender.lock().await = Some(connection.sender);
        self.set_status(LiveStatus::Connected).await;
        info!("live session {} connected", self.config.session_id);

        self.spawn_outbound(capture_rx).await;
        self.spawn_inbound(connection.inbound);

        Ok(())
    }

    /// Capture pipeline: frame raw samples into fixed blocks, encode, send.
    /// Sends are fire-and-forget; a failed send is logged and dropped.
    async fn spawn_outbound(self: &Arc<Self>, mut capture_rx: mpsc::Receiver<Vec<f32>>) {
        let session = Arc::clone(self);
        let block_size = self.config.block_size;

        let handle = tokio::spawn(async move {
            let mut framer = BlockFramer::new(block_size);

            'capture: while let Some(slab) = capture_rx.recv().await {
                for block in framer.push(&slab) {
                    let encoded = codec::to_transport_text(&codec::encode_samples(&block));
                    let frame = RealtimeInput::audio(encoded);

                    let mut guard = session.sender.lock().await;
                    match guard.as_mut() {
                        Some(sender) => {
                            if let Err(e) = sender.send(frame).await {
                                warn!(
                                    "live session {}: dropped outbound block: {}",
                                    session.config.session_id, e
                                );
                            }
                        }
                        None => break 'capture,
                    }
                }
            }
            // Trailing partial block is discarded with the framer.
        });

        *self.outbound_task.lock().await = Some(handle);
    }

    /// Inbound dispatch runs until the transport errors or closes; either
    /// end funnels into the shared teardown path.
    fn spawn_inbound(
        self: &Arc<Self>,
        mut inbound: mpsc::Receiver<Result<ServerMessage, AppError>>,
    ) {
        let session = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Some(Ok(msg)) => session.handle_server_message(msg).await,
                    Some(Err(e)) => {
                        warn!("live session {}: {}", session.config.session_id, e);
                        session
                            .teardown(LiveStatus::Errored, Some(e.to_string()))
                            .await;
                        break;
                    }
                    None => {
                        session.teardown(LiveStatus::Idle, None).await;
                        break;
                    }
                }
            }
        });
    }

    /// Dispatch one inbound endpoint message: transcript fragments to the
    /// assembler, audio to the scheduler, turn boundaries and interruptions
    /// to both.
    pub async fn handle_server_message(&self, msg: ServerMessage) {
        let Some(content) = msg.server_content else {
            return;
        };

        let mut core = self.core.lock().await;

        if let Some(fragment) = &content.input_transcription {
            core.assembler.push_input(&fragment.text);
        }
        if let Some(fragment) = &content.output_transcription {
            core.assembler.push_output(&fragment.text);
        }

        if content.turn_complete {
            let (user, model) = core.assembler.commit();
            core.turns.push(user.clone());
            core.turns.push(model.clone());
            let _ = self.events.send(SessionEvent::Turn(user));
            let _ = self.events.send(SessionEvent::Turn(model));
        }

        if let Some(encoded) = content.inline_audio() {
            match codec::from_transport_text(encoded) {
                Ok(pcm) => {
                    if let Err(e) = core.scheduler.schedule(&pcm) {
                        warn!(
                            "live session {}: undecodable audio chunk: {}",
                            self.config.session_id, e
                        );
                    }
                }
                Err(e) => warn!(
                    "live session {}: bad transport framing: {}",
                    self.config.session_id, e
                ),
            }
        }

        if content.interrupted {
            core.scheduler.interrupt();
        }
    }

    /// Stop the conversation and release everything. Idempotent; a no-op
    /// once the session is already torn down, and a never-started session
    /// has nothing to release.
    pub async fn stop(&self) {
        if !self.started.load(Ordering::SeqCst) {
            return;
        }
        self.teardown(LiveStatus::Idle, None).await;
    }

    /// Single teardown path shared by stop, transport errors and remote
    /// close, with at-most-once release semantics.
    async fn teardown(&self, final_status: LiveStatus, error: Option<String>) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(mut sender) = self.sender.lock().await.take() {
            let _ = sender.close().await;
        }

        self.input.lock().await.release().await;

        // Halt and discard all scheduled playback; resets the start offset.
        self.core.lock().await.scheduler.interrupt();

        if let Some(handle) = self.outbound_task.lock().await.take() {
            handle.abort();
        }

        if let Some(message) = error {
            let _ = self.events.send(SessionEvent::Error(message));
        }
        self.set_status(final_status).await;
        info!(
            "live session {} torn down ({:?})",
            self.config.session_id, final_status
        );
    }
}
