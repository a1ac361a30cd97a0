pub mod endpoint;
pub mod session;
pub mod transcript;
pub mod wire;

pub use endpoint::EndpointTransport;
pub use session::{
    LiveConnection, LiveSender, LiveSession, LiveSessionConfig, LiveStatus, LiveTransport,
    SessionEvent,
};
pub use transcript::{Speaker, TranscriptAssembler, TranscriptTurn};
