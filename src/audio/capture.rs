//! Capture pipeline: turns a live audio input into fixed-size sample blocks
//! ready for encoding and transmission.

use crate::error::AppError;
use tokio::sync::mpsc;

/// Audio input seam for the live session.
///
/// The production implementation is backed by the browser client feeding
/// raw samples over the live WebSocket bridge; tests script their own.
#[async_trait::async_trait]
pub trait AudioInput: Send + Sync {
    /// Acquire the input device and start receiving raw sample slabs.
    ///
    /// Fails with [`AppError::PermissionDenied`] when the user declines
    /// access or no device exists.
    async fn acquire(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, AppError>;

    /// Release the device. Safe to call more than once.
    async fn release(&mut self);

    /// Input name for logging
    fn name(&self) -> &str;
}

/// Frames an incoming sample stream into exact fixed-size blocks.
///
/// A trailing partial block at stream end is discarded, not zero-padded.
pub struct BlockFramer {
    block_size: usize,
    pending: Vec<f32>,
}

impl BlockFramer {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            pending: Vec::with_capacity(block_size),
        }
    }

    /// Append captured samples, returning every full block now available.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(samples);

        let mut blocks = Vec::new();
        while self.pending.len() >= self.block_size {
            let rest = self.pending.split_off(self.block_size);
            blocks.push(std::mem::replace(&mut self.pending, rest));
        }
        blocks
    }

    /// Samples buffered but not yet forming a full block.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Input fed by an in-process channel (the WebSocket bridge pushes raw
/// samples from the browser into `tx`).
pub struct ChannelInput {
    name: String,
    receiver: Option<mpsc::Receiver<Vec<f32>>>,
    released: bool,
}

impl ChannelInput {
    /// Returns the input plus the sender side the bridge feeds samples into.
    pub fn new(name: impl Into<String>, buffer: usize) -> (Self, mpsc::Sender<Vec<f32>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                name: name.into(),
                receiver: Some(rx),
                released: false,
            },
            tx,
        )
    }
}

#[async_trait::async_trait]
impl AudioInput for ChannelInput {
    async fn acquire(&mut self) -> Result<mpsc::Receiver<Vec<f32>>, AppError> {
        if self.released {
            return Err(AppError::PermissionDenied(
                "audio input already released".to_string(),
            ));
        }
        self.receiver
            .take()
            .ok_or_else(|| AppError::PermissionDenied("audio input already acquired".to_string()))
    }

    async fn release(&mut self) {
        self.released = true;
        self.receiver = None;
    }

    fn name(&self) -> &str {
        &self.name
    }
}
