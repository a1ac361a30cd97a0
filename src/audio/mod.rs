pub mod capture;
pub mod codec;
pub mod playback;

pub use capture::{AudioInput, BlockFramer, ChannelInput};
pub use codec::{decode_samples, encode_samples, from_transport_text, to_transport_text, SampleBuffer};
pub use playback::{
    MonotonicClock, PlaybackClock, PlaybackScheduler, PlaybackSink, ScheduledChunk,
};
