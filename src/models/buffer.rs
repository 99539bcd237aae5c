//! Sample Buffer Model
//!
//! Decoded audio payloads held by the cache: planar per-channel f32 samples
//! plus the metadata records used to plan chunked loads.

use serde::Serialize;

/// A decoded audio segment.
///
/// Samples are stored planar (one `Vec<f32>` per channel) and every channel
/// has the same length. Buffers are immutable once built; the cache shares
/// them as `Arc<SampleBuffer>` so hits never copy sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Creates a silent buffer with the given shape.
    pub fn new(channel_count: u32, sample_length: u64, sample_rate: u32) -> Self {
        let channels = (0..channel_count)
            .map(|_| vec![0.0; sample_length as usize])
            .collect();
        Self {
            channels,
            sample_rate,
        }
    }

    /// Builds a buffer from per-channel sample data.
    ///
    /// Rejects empty channel lists, a zero sample rate, and channels of
    /// unequal length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> anyhow::Result<Self> {
        if channels.is_empty() {
            anyhow::bail!("buffer must have at least one channel");
        }
        if sample_rate == 0 {
            anyhow::bail!("sample_rate must be > 0");
        }
        let expected = channels[0].len();
        for (index, channel) in channels.iter().enumerate() {
            if channel.len() != expected {
                anyhow::bail!(
                    "channel {} has {} samples, expected {}",
                    index,
                    channel.len(),
                    expected
                );
            }
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Number of channels.
    pub fn channel_count(&self) -> u32 {
        self.channels.len() as u32
    }

    /// Samples per channel.
    pub fn sample_length(&self) -> u64 {
        self.channels.first().map_or(0, |c| c.len() as u64)
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_length() as f64 / self.sample_rate as f64
    }

    /// Approximate heap footprint of the sample data in bytes.
    ///
    /// Used as the entry size for cache accounting: channels x samples x 4.
    pub fn size_bytes(&self) -> u64 {
        self.channel_count() as u64 * self.sample_length() * std::mem::size_of::<f32>() as u64
    }

    /// Sample data for one channel.
    pub fn channel(&self, index: u32) -> Option<&[f32]> {
        self.channels.get(index as usize).map(|c| c.as_slice())
    }

    /// Copies out the sample range `[start, start + len)` from every channel.
    ///
    /// The range is clamped to the buffer, so an out-of-bounds request
    /// yields a shorter (possibly empty) buffer instead of panicking.
    pub fn slice(&self, start: u64, len: u64) -> SampleBuffer {
        let total = self.sample_length();
        let start = start.min(total) as usize;
        let end = (start as u64).saturating_add(len).min(total) as usize;
        let channels = self
            .channels
            .iter()
            .map(|c| c[start..end].to_vec())
            .collect();
        SampleBuffer {
            channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Concatenates buffers in order into one contiguous buffer.
    ///
    /// All parts must agree on channel count and sample rate.
    pub fn concat(parts: &[&SampleBuffer]) -> anyhow::Result<SampleBuffer> {
        let first = match parts.first() {
            Some(first) => first,
            None => anyhow::bail!("cannot concatenate zero buffers"),
        };
        let channel_count = first.channel_count();
        let sample_rate = first.sample_rate;
        let total: usize = parts.iter().map(|p| p.sample_length() as usize).sum();

        let mut channels: Vec<Vec<f32>> = (0..channel_count)
            .map(|_| Vec::with_capacity(total))
            .collect();
        for (index, part) in parts.iter().enumerate() {
            if part.channel_count() != channel_count {
                anyhow::bail!(
                    "part {} has {} channels, expected {}",
                    index,
                    part.channel_count(),
                    channel_count
                );
            }
            if part.sample_rate != sample_rate {
                anyhow::bail!(
                    "part {} has sample rate {}, expected {}",
                    index,
                    part.sample_rate,
                    sample_rate
                );
            }
            for (channel, samples) in channels.iter_mut().zip(part.channels.iter()) {
                channel.extend_from_slice(samples);
            }
        }
        Ok(SampleBuffer {
            channels,
            sample_rate,
        })
    }

    /// The metadata record describing this buffer's shape.
    pub fn metadata(&self) -> SegmentMetadata {
        SegmentMetadata {
            channel_count: self.channel_count(),
            sample_length: self.sample_length(),
            sample_rate: self.sample_rate,
        }
    }

    /// True when the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.sample_length() == 0
    }
}

/// Shape of a segment, cached separately so chunked loads can be planned
/// without fetching sample data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentMetadata {
    /// Number of channels
    pub channel_count: u32,
    /// Samples per channel
    pub sample_length: u64,
    /// Samples per second
    pub sample_rate: u32,
}

impl SegmentMetadata {
    /// Number of chunks needed to cover the segment at the given chunk size.
    pub fn chunk_count(&self, chunk_size: u64) -> u64 {
        if chunk_size == 0 {
            return 0;
        }
        self.sample_length.div_ceil(chunk_size)
    }

    /// In-memory size of the metadata record itself, for cache accounting.
    pub fn size_bytes(&self) -> u64 {
        std::mem::size_of::<Self>() as u64
    }
}
