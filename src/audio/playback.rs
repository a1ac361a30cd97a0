//! Playback scheduler: plays a stream of arriving audio chunks strictly in
//! order, gapless and without overlap, despite variable arrival timing.

use crate::audio::codec::{self, SampleBuffer};
use anyhow::Result;
use std::collections::HashSet;
use std::time::Instant;
use tracing::debug;

/// Clock the scheduler aligns start times against. Seconds, monotonic.
pub trait PlaybackClock: Send {
    fn now(&self) -> f64;
}

/// Monotonic wall-clock backed by `Instant`.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A decoded chunk with its assigned slot on the playback timeline.
#[derive(Debug, Clone)]
pub struct ScheduledChunk {
    pub id: u64,
    /// Seconds on the playback clock
    pub start_time: f64,
    pub duration: f64,
    pub buffer: SampleBuffer,
}

/// Consumer of scheduling decisions: the live bridge forwards `play` chunks
/// to the client and `cancel` notices for interrupted ones.
pub trait PlaybackSink: Send {
    fn play(&mut self, chunk: &ScheduledChunk);
    fn cancel(&mut self, ids: &[u64]);
}

/// Schedules inbound model audio for sequential playback.
///
/// The in-flight set is exactly the set of chunks eligible for immediate
/// cancellation when an interruption signal arrives. `next_start` never
/// decreases except for the interruption reset, and a chunk never starts
/// before the live clock, so scheduled audio cannot overlap.
pub struct PlaybackScheduler {
    clock: Box<dyn PlaybackClock>,
    sink: Box<dyn PlaybackSink>,
    sample_rate: u32,
    next_start: f64,
    next_id: u64,
    in_flight: HashSet<u64>,
}

impl PlaybackScheduler {
    pub fn new(clock: Box<dyn PlaybackClock>, sink: Box<dyn PlaybackSink>, sample_rate: u32) -> Self {
        Self {
            clock,
            sink,
            sample_rate,
            next_start: 0.0,
            next_id: 0,
            in_flight: HashSet::new(),
        }
    }

    /// Decode one inbound PCM chunk and schedule it after everything already
    /// queued. Returns the chunk id.
    pub fn schedule(&mut self, pcm: &[u8]) -> Result<u64> {
        let buffer = codec::decode_samples(pcm, self.sample_rate, 1)?;
        let duration = buffer.duration_seconds();

        let start_time = self.next_start.max(self.clock.now());
        let id = self.next_id;
        self.next_id += 1;

        let chunk = ScheduledChunk {
            id,
            start_time,
            duration,
            buffer,
        };

        self.sink.play(&chunk);
        self.in_flight.insert(id);
        self.next_start = start_time + duration;

        debug!(
            "scheduled chunk {} at {:.3}s ({:.3}s long, {} in flight)",
            id,
            start_time,
            duration,
            self.in_flight.len()
        );

        Ok(id)
    }

    /// A chunk finished playing naturally; release it.
    pub fn complete(&mut self, id: u64) {
        self.in_flight.remove(&id);
    }

    /// Barge-in: stop every in-flight chunk immediately and rebase the
    /// timeline on the live clock.
    pub fn interrupt(&mut self) {
        if !self.in_flight.is_empty() {
            let ids: Vec<u64> = self.in_flight.drain().collect();
            debug!("interrupted, cancelling {} in-flight chunks", ids.len());
            self.sink.cancel(&ids);
        }
        self.next_start = 0.0;
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn next_start(&self) -> f64 {
        self.next_start
    }
}
