pub mod audio;
pub mod config;
pub mod error;
pub mod gemini;
pub mod http;
pub mod live;
pub mod tariff;

pub use audio::{
    AudioInput, BlockFramer, ChannelInput, MonotonicClock, PlaybackClock, PlaybackScheduler,
    PlaybackSink, SampleBuffer, ScheduledChunk,
};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use gemini::{ChatRole, ChatTurn, GeminiClient, Schema};
pub use http::{create_router, AppState};
pub use live::{
    LiveSession, LiveSessionConfig, LiveStatus, LiveTransport, SessionEvent, Speaker,
    TranscriptTurn,
};
pub use tariff::{BivacReport, Filters, Suggestion, TariffItem, VehicleReport};
