//! Conversions between raw float samples and the transport encoding used by
//! the live endpoint: 16-bit little-endian PCM wrapped in base64 text.

use anyhow::{bail, Result};
use base64::Engine;

/// Decoded playback audio: planar float samples plus the rate needed to
/// compute durations.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub sample_rate: u32,
    /// One Vec per channel, all the same length
    pub channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// Frames per channel.
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Scale float samples (nominally in [-1, 1]) to signed 16-bit integers and
/// serialize little-endian. Out-of-range inputs saturate at the i16
/// boundaries rather than wrapping.
pub fn encode_samples(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s * 32768.0) as i16;
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Inverse of [`encode_samples`]: interleaved 16-bit little-endian PCM to
/// planar floats, each sample normalized by 1/32768.
pub fn decode_samples(bytes: &[u8], sample_rate: u32, channel_count: usize) -> Result<SampleBuffer> {
    if channel_count == 0 {
        bail!("channel count must be at least 1");
    }
    if bytes.len() % 2 != 0 {
        bail!("PCM data length must be even for 16-bit samples");
    }

    let sample_count = bytes.len() / 2;
    let frame_count = sample_count / channel_count;
    // Trailing samples short of a full frame are dropped so every channel
    // comes out the same length.
    let usable = frame_count * channel_count;

    let mut channels = vec![Vec::with_capacity(frame_count); channel_count];
    for (i, chunk) in bytes.chunks_exact(2).take(usable).enumerate() {
        let v = i16::from_le_bytes([chunk[0], chunk[1]]);
        channels[i % channel_count].push(v as f32 / 32768.0);
    }

    Ok(SampleBuffer {
        sample_rate,
        channels,
    })
}

/// Binary-to-text framing for carrying PCM over a text message channel.
pub fn to_transport_text(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn from_transport_text(text: &str) -> Result<Vec<u8>> {
    Ok(base64::engine::general_purpose::STANDARD.decode(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_odd_byte_count() {
        assert!(decode_samples(&[0u8, 1, 2], 24000, 1).is_err());
    }

    #[test]
    fn decode_deinterleaves_two_channels() {
        // Frames: (1, -1), (2, -2) as i16 LE
        let bytes: Vec<u8> = [1i16, -1, 2, -2]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        let buf = decode_samples(&bytes, 24000, 2).unwrap();
        assert_eq!(buf.frame_count(), 2);
        assert_eq!(buf.channels[0], vec![1.0 / 32768.0, 2.0 / 32768.0]);
        assert_eq!(buf.channels[1], vec![-1.0 / 32768.0, -2.0 / 32768.0]);
    }

    #[test]
    fn decode_drops_samples_short_of_a_full_frame() {
        // Five samples across two channels: the fifth has no pair.
        let bytes: Vec<u8> = [1i16, -1, 2, -2, 3]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();

        let buf = decode_samples(&bytes, 24000, 2).unwrap();
        assert_eq!(buf.frame_count(), 2);
        assert_eq!(buf.channels[0].len(), buf.channels[1].len());
    }
}
