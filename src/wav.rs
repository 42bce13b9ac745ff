//! Audio codec boundary.
//!
//! The pipeline touches audio only through this module: load a WAV into
//! memory, take a millisecond-addressed sub-range, append clips, export. No
//! decoding beyond WAV and no resampling happens here.

use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// An in-memory WAV clip: interleaved 16-bit PCM plus its spec.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    spec: WavSpec,
    samples: Vec<i16>,
}

impl AudioClip {
    /// Load a WAV file into memory.
    ///
    /// Format requirements: 16-bit integer PCM. Any channel count and sample
    /// rate are accepted; enforcing the sample format here keeps slicing and
    /// re-export exact (no float conversion on the way back out).
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = WavReader::open(path)
            .with_context(|| format!("failed to open WAV: {}", path.display()))?;
        let spec = reader.spec();

        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            anyhow::bail!(
                "expected 16-bit integer PCM, got {}-bit {:?}: {}",
                spec.bits_per_sample,
                spec.sample_format,
                path.display()
            );
        }

        let samples = reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("failed to read samples: {}", path.display()))?;

        Ok(Self { spec, samples })
    }

    /// Build a clip from raw interleaved samples.
    pub fn from_samples(spec: WavSpec, samples: Vec<i16>) -> Self {
        Self { spec, samples }
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.spec.channels.max(1) as usize
    }

    pub fn duration_ms(&self) -> u64 {
        (self.frames() as u64 * 1000) / self.spec.sample_rate.max(1) as u64
    }

    /// Extract the `[start_ms, end_ms)` sub-range as a new clip.
    ///
    /// Out-of-range bounds are clamped to the clip length; an inverted range
    /// yields an empty clip.
    pub fn slice_ms(&self, start_ms: u64, end_ms: u64) -> AudioClip {
        let channels = self.spec.channels.max(1) as usize;
        let total_frames = self.frames();

        let start_frame = self.ms_to_frame(start_ms).min(total_frames);
        let end_frame = self.ms_to_frame(end_ms).min(total_frames).max(start_frame);

        let samples = self.samples[start_frame * channels..end_frame * channels].to_vec();
        AudioClip {
            spec: self.spec,
            samples,
        }
    }

    /// Append another clip in-place. Specs must match exactly.
    pub fn append(&mut self, other: &AudioClip) -> Result<()> {
        if self.spec != other.spec {
            anyhow::bail!(
                "cannot concatenate clips with different specs: {:?} vs {:?}",
                self.spec,
                other.spec
            );
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Write the clip to disk as WAV. Output is deterministic for identical
    /// samples and spec.
    pub fn export(&self, path: &Path) -> Result<()> {
        let mut writer = WavWriter::create(path, self.spec)
            .with_context(|| format!("failed to create WAV: {}", path.display()))?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer
            .finalize()
            .with_context(|| format!("failed to finalize WAV: {}", path.display()))?;
        Ok(())
    }

    fn ms_to_frame(&self, ms: u64) -> usize {
        ((ms * self.spec.sample_rate as u64) / 1000) as usize
    }
}
