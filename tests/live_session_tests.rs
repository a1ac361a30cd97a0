//! Tests for the live session state machine, driven through scripted
//! transport and input doubles.

use async_trait::async_trait;
use douane::audio::codec::{encode_samples, to_transport_text};
use douane::audio::{AudioInput, MonotonicClock};
use douane::error::AppError;
use douane::live::wire::{
    ClientSetup, Content, MediaBlob, Part, RealtimeInput, ServerContent, ServerMessage,
    TranscriptionFragment,
};
use douane::live::{
    LiveConnection, LiveSender, LiveSession, LiveSessionConfig, LiveStatus, LiveTransport,
    SessionEvent, Speaker,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Doubles
// ============================================================================

struct TrackingInput {
    receiver: Option<mpsc::Receiver<Vec<f32>>>,
    released: Arc<AtomicBool>,
    deny: bool,
}

impl TrackingInput {
    fn granting() -> (Self, mpsc::Sender<Vec<f32>>, Arc<AtomicBool>) {
        let (tx, rx) = mpsc::channel(16);
        let released = Arc::new(AtomicBool::new(false));
        (
            Self {
                receiver: Some(rx),
                released: Arc::clone(&released),
                deny: false,
            },
            tx,
            released,
        )
    }

    fn denying() -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            Self {
                receiver: None,
                released: Arc::clone(&released),
                deny: true,
            },
            released,
        )
    }
}

#[async_trait]
impl AudioInput for TrackingInput {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, AppError> {
        if self.deny {
            return Err(AppError::PermissionDenied("access refused".to_string()));
        }
        self.receiver
            .take()
            .ok_or_else(|| AppError::PermissionDenied("already acquired".to_string()))
    }

    async fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "test-input"
    }
}

struct RecordingSender {
    sent: Arc<StdMutex<Vec<RealtimeInput>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl LiveSender for RecordingSender {
    async fn send(&mut self, frame: RealtimeInput) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AppError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Replays a fixed message script. With `hold_open` the inbound channel
/// stays alive after the script, so the session only ends on stop.
struct ScriptedTransport {
    script: StdMutex<Vec<ServerMessage>>,
    hold_open: bool,
    fail: bool,
    sent: Arc<StdMutex<Vec<RealtimeInput>>>,
    closed: Arc<AtomicBool>,
    keepalive: StdMutex<Option<mpsc::Sender<Result<ServerMessage, AppError>>>>,
}

impl ScriptedTransport {
    fn new(script: Vec<ServerMessage>, hold_open: bool) -> Self {
        Self {
            script: StdMutex::new(script),
            hold_open,
            fail: false,
            sent: Arc::new(StdMutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
            keepalive: StdMutex::new(None),
        }
    }

    fn failing() -> Self {
        let mut transport = Self::new(Vec::new(), false);
        transport.fail = true;
        transport
    }
}

#[async_trait]
impl LiveTransport for ScriptedTransport {
    async fn connect(&self, _setup: ClientSetup) -> Result<LiveConnection, AppError> {
        if self.fail {
            return Err(AppError::ConnectionFailure("dial refused".to_string()));
        }

        let (tx, rx) = mpsc::channel(64);
        for msg in self.script.lock().unwrap().drain(..) {
            tx.try_send(Ok(msg)).unwrap();
        }
        if self.hold_open {
            *self.keepalive.lock().unwrap() = Some(tx);
        }

        Ok(LiveConnection {
            sender: Box::new(RecordingSender {
                sent: Arc::clone(&self.sent),
                closed: Arc::clone(&self.closed),
            }),
            inbound: rx,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn session_config() -> LiveSessionConfig {
    LiveSessionConfig {
        session_id: "test-session".to_string(),
        model: "models/test".to_string(),
        voice: "Zephyr".to_string(),
        system_instruction: "assist with tariffs".to_string(),
        block_size: 4,
        output_sample_rate: 24000,
    }
}

fn content_msg(content: ServerContent) -> ServerMessage {
    ServerMessage {
        server_content: Some(content),
        ..Default::default()
    }
}

fn input_fragment(text: &str) -> ServerMessage {
    content_msg(ServerContent {
        input_transcription: Some(TranscriptionFragment {
            text: text.to_string(),
        }),
        ..Default::default()
    })
}

fn output_fragment(text: &str) -> ServerMessage {
    content_msg(ServerContent {
        output_transcription: Some(TranscriptionFragment {
            text: text.to_string(),
        }),
        ..Default::default()
    })
}

fn turn_complete() -> ServerMessage {
    content_msg(ServerContent {
        turn_complete: true,
        ..Default::default()
    })
}

fn audio_message(sample_count: usize) -> ServerMessage {
    content_msg(ServerContent {
        model_turn: Some(Content {
            parts: vec![Part {
                text: None,
                inline_data: Some(MediaBlob {
                    mime_type: "audio/pcm;rate=24000".to_string(),
                    data: to_transport_text(&encode_samples(&vec![0.25; sample_count])),
                }),
            }],
        }),
        ..Default::default()
    })
}

fn interrupted() -> ServerMessage {
    content_msg(ServerContent {
        interrupted: true,
        ..Default::default()
    })
}

/// Drain events until the wanted status appears, returning everything seen.
async fn events_until_status(
    events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    want: LiveStatus,
) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("event channel closed early");
        let reached = matches!(&event, SessionEvent::Status(s) if *s == want);
        seen.push(event);
        if reached {
            return seen;
        }
    }
}

fn statuses(events: &[SessionEvent]) -> Vec<LiveStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Status(s) => Some(*s),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn denied_permission_errors_the_session() {
    let (input, released) = TrackingInput::denying();
    let (session, mut events) = LiveSession::new(
        session_config(),
        Box::new(input),
        Box::new(MonotonicClock::new()),
    );
    let transport = ScriptedTransport::new(Vec::new(), true);

    let err = session.start(&transport).await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied(_)));
    assert_eq!(session.status().await, LiveStatus::Errored);
    assert!(released.load(Ordering::SeqCst));

    let seen = events_until_status(&mut events, LiveStatus::Errored).await;
    assert_eq!(
        statuses(&seen),
        vec![LiveStatus::RequestingPermission, LiveStatus::Errored]
    );
    assert!(seen.iter().any(|e| matches!(e, SessionEvent::Error(_))));
}

#[tokio::test]
async fn connect_failure_errors_the_session_and_releases_input() {
    let (input, _tx, released) = TrackingInput::granting();
    let (session, mut events) = LiveSession::new(
        session_config(),
        Box::new(input),
        Box::new(MonotonicClock::new()),
    );
    let transport = ScriptedTransport::failing();

    let err = session.start(&transport).await.unwrap_err();
    assert!(matches!(err, AppError::ConnectionFailure(_)));
    assert_eq!(session.status().await, LiveStatus::Errored);
    assert!(released.load(Ordering::SeqCst));

    let seen = events_until_status(&mut events, LiveStatus::Errored).await;
    assert_eq!(
        statuses(&seen),
        vec![
            LiveStatus::RequestingPermission,
            LiveStatus::Connecting,
            LiveStatus::Errored
        ]
    );
}

#[tokio::test]
async fn fragments_commit_as_ordered_turns_on_turn_complete() {
    let (input, _tx, _released) = TrackingInput::granting();
    let (session, mut events) = LiveSession::new(
        session_config(),
        Box::new(input),
        Box::new(MonotonicClock::new()),
    );
    let transport = ScriptedTransport::new(
        vec![
            input_fragment("Hel"),
            output_fragment("Hi"),
            input_fragment("lo"),
            turn_complete(),
        ],
        false,
    );

    session.start(&transport).await.unwrap();
    // The script ends and the channel closes, which reads as a remote close.
    let seen = events_until_status(&mut events, LiveStatus::Idle).await;

    assert_eq!(
        statuses(&seen),
        vec![
            LiveStatus::RequestingPermission,
            LiveStatus::Connecting,
            LiveStatus::Connected,
            LiveStatus::Idle
        ]
    );

    let turns = session.transcript().await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].speaker, Speaker::User);
    assert_eq!(turns[0].text, "Hello");
    assert_eq!(turns[1].speaker, Speaker::Model);
    assert_eq!(turns[1].text, "Hi");
}

#[tokio::test]
async fn model_audio_is_scheduled_and_interruption_cancels_it() {
    let (input, _tx, _released) = TrackingInput::granting();
    let (session, mut events) = LiveSession::new(
        session_config(),
        Box::new(input),
        Box::new(MonotonicClock::new()),
    );
    let transport = ScriptedTransport::new(
        vec![audio_message(2400), audio_message(2400), interrupted()],
        false,
    );

    session.start(&transport).await.unwrap();
    let seen = events_until_status(&mut events, LiveStatus::Idle).await;

    let chunks: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Audio(chunk) => Some(chunk.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(chunks.len(), 2);
    assert!((chunks[0].duration - 0.1).abs() < 1e-9);
    assert!(chunks[1].start_time >= chunks[0].start_time + chunks[0].duration - 1e-9);

    let mut cancelled: Vec<u64> = seen
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Cancelled(ids) => Some(ids.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    cancelled.sort_unstable();
    assert_eq!(cancelled, vec![chunks[0].id, chunks[1].id]);
}

#[tokio::test]
async fn captured_samples_are_framed_and_sent() {
    let (input, samples_tx, _released) = TrackingInput::granting();
    let (session, mut events) = LiveSession::new(
        session_config(),
        Box::new(input),
        Box::new(MonotonicClock::new()),
    );
    let transport = ScriptedTransport::new(Vec::new(), true);

    session.start(&transport).await.unwrap();
    events_until_status(&mut events, LiveStatus::Connected).await;

    // Six samples at block size four: one full block, two left pending.
    samples_tx
        .send(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6])
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if !transport.sent.lock().unwrap().is_empty() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "no outbound frame arrived"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let chunk = &sent[0].realtime_input.media_chunks[0];
    assert_eq!(chunk.mime_type, "audio/pcm;rate=16000");
    // Four samples of 16-bit PCM, base64 framed.
    assert_eq!(chunk.data, to_transport_text(&encode_samples(&[0.1, 0.2, 0.3, 0.4])));
}

#[tokio::test]
async fn stop_is_idempotent_and_closes_everything() {
    let (input, _tx, released) = TrackingInput::granting();
    let (session, mut events) = LiveSession::new(
        session_config(),
        Box::new(input),
        Box::new(MonotonicClock::new()),
    );
    let transport = ScriptedTransport::new(Vec::new(), true);

    session.start(&transport).await.unwrap();
    events_until_status(&mut events, LiveStatus::Connected).await;

    session.stop().await;
    assert_eq!(session.status().await, LiveStatus::Idle);
    assert!(released.load(Ordering::SeqCst));
    assert!(transport.closed.load(Ordering::SeqCst));

    // A second stop changes nothing and does not fault.
    session.stop().await;
    assert_eq!(session.status().await, LiveStatus::Idle);
}

#[tokio::test]
async fn stop_before_start_does_not_poison_the_session() {
    let (input, _tx, released) = TrackingInput::granting();
    let (session, mut events) = LiveSession::new(
        session_config(),
        Box::new(input),
        Box::new(MonotonicClock::new()),
    );
    let transport = ScriptedTransport::new(Vec::new(), true);

    // Stopping a never-started session releases nothing and blocks nothing.
    session.stop().await;
    assert_eq!(session.status().await, LiveStatus::Idle);
    assert!(!released.load(Ordering::SeqCst));

    session.start(&transport).await.unwrap();
    events_until_status(&mut events, LiveStatus::Connected).await;

    // Teardown must still work after the early stop.
    session.stop().await;
    assert_eq!(session.status().await, LiveStatus::Idle);
    assert!(released.load(Ordering::SeqCst));
    assert!(transport.closed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn a_session_object_is_single_use() {
    let (input, _tx, _released) = TrackingInput::granting();
    let (session, mut events) = LiveSession::new(
        session_config(),
        Box::new(input),
        Box::new(MonotonicClock::new()),
    );
    let transport = ScriptedTransport::new(Vec::new(), true);

    session.start(&transport).await.unwrap();
    events_until_status(&mut events, LiveStatus::Connected).await;
    session.stop().await;

    let err = session.start(&transport).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest(_)));
}
