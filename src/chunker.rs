//! Audio chunking stage.
//!
//! Walks each (audio, subtitle) pair cue by cue and emits one clip + one
//! metadata record per usable cue. Overlap between consecutive cues is
//! resolved by trimming the current cue's end to the next cue's start; cues
//! that end up below the minimum duration, or with no text after cleanup,
//! are skipped and counted. The metadata index is written once, after every
//! pair has been processed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::metadata::{self, SegmentRecord};
use crate::srt;
use crate::wav::AudioClip;

/// One unit of chunking input: a long-form audio file and its subtitle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSrtPair {
    pub audio: PathBuf,
    pub subtitle: PathBuf,
}

/// What the chunking stage produced, for the orchestrator and for logs.
#[derive(Debug, Clone)]
pub struct ChunkSummary {
    pub output_dir: PathBuf,
    pub metadata_path: PathBuf,
    /// Cues seen across all pairs, including skipped ones.
    pub total_cues: usize,
    pub skipped: usize,
    pub records: usize,
}

/// Per-pair result, accumulated into the stage totals.
struct PairOutcome {
    records: Vec<SegmentRecord>,
    cues_seen: usize,
    skipped: usize,
    emitted_ms: u64,
}

#[derive(Debug)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Run chunking over all pairs and write the stage's metadata index.
    ///
    /// A pair that fails to load or parse contributes zero segments and is
    /// logged; the remaining pairs still run.
    pub fn run(&self, pairs: &[AudioSrtPair], output_base: &Path) -> Result<ChunkSummary> {
        let output_dir = output_base.join(&self.config.output_subdir);
        fs::create_dir_all(&output_dir)?;

        let mut all_records = Vec::new();
        let mut total_cues = 0;
        let mut total_skipped = 0;
        let mut total_emitted_ms = 0;

        for pair in pairs {
            match self.process_pair(pair, &output_dir) {
                Ok(outcome) => {
                    total_cues += outcome.cues_seen;
                    total_skipped += outcome.skipped;
                    total_emitted_ms += outcome.emitted_ms;
                    all_records.extend(outcome.records);
                }
                Err(err) => {
                    error!(
                        audio = %pair.audio.display(),
                        "chunking failed for pair; skipping it: {err:#}"
                    );
                }
            }
        }

        let metadata_path = output_dir.join(&self.config.metadata_file);
        metadata::write_index(&metadata_path, &all_records)?;

        info!(
            total_cues,
            created = all_records.len(),
            skipped = total_skipped,
            audio = %format_duration(total_emitted_ms),
            metadata = %metadata_path.display(),
            "chunking complete"
        );

        Ok(ChunkSummary {
            output_dir,
            metadata_path,
            total_cues,
            skipped: total_skipped,
            records: all_records.len(),
        })
    }

    fn process_pair(&self, pair: &AudioSrtPair, output_dir: &Path) -> anyhow::Result<PairOutcome> {
        info!(audio = %pair.audio.display(), "chunking");

        let cues = srt::parse_srt_file(&pair.subtitle)?;
        let audio = AudioClip::load(&pair.audio)?;

        let stem = pair
            .audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let mut records = Vec::new();
        let mut skipped = 0;
        let mut emitted_ms = 0;

        for (i, cue) in cues.iter().enumerate() {
            let start_ms = cue.start_ms;
            let mut end_ms = cue.end_ms;

            // Consecutive clips must never share audio: trim this cue's end
            // to the next cue's start. Only the immediate next cue is
            // consulted; deeper nesting is not resolved here.
            if let Some(next) = cues.get(i + 1) {
                if next.start_ms < end_ms {
                    end_ms = next.start_ms;
                }
            }

            let duration = end_ms.saturating_sub(start_ms);
            if duration < self.config.min_duration_ms {
                debug!(
                    cue = i,
                    duration,
                    min = self.config.min_duration_ms,
                    "skipping cue below minimum duration"
                );
                skipped += 1;
                continue;
            }

            let text = cue.text.replace('\n', " ").trim().to_string();
            if text.is_empty() {
                debug!(cue = i, "skipping cue with empty text");
                skipped += 1;
                continue;
            }

            let clip = audio.slice_ms(start_ms, end_ms);
            let file_name = format!("{stem}_segment_{i:04}.wav");
            clip.export(&output_dir.join(&file_name))?;

            emitted_ms += duration;
            records.push(SegmentRecord::new(file_name, text));
        }

        info!(
            created = records.len(),
            skipped,
            audio = %pair.audio.display(),
            "pair chunked"
        );

        Ok(PairOutcome {
            records,
            cues_seen: cues.len(),
            skipped,
            emitted_ms,
        })
    }
}

/// Render milliseconds as `"1m 30s"` / `"45s"` for summary logs.
fn format_duration(milliseconds: u64) -> String {
    let seconds = milliseconds / 1000;
    let minutes = seconds / 60;
    let seconds = seconds % 60;

    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec};

    fn write_wav(path: &Path, duration_ms: u64) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let frames = (duration_ms * 16_000 / 1000) as usize;
        let samples: Vec<i16> = (0..frames).map(|i| (i % 128) as i16).collect();
        AudioClip::from_samples(spec, samples)
            .export(path)
            .expect("fixture WAV should write");
    }

    fn pair_in(dir: &Path, srt_body: &str) -> AudioSrtPair {
        let audio = dir.join("episode.wav");
        let subtitle = dir.join("episode.srt");
        write_wav(&audio, 10_000);
        fs::write(&subtitle, srt_body).expect("fixture SRT should write");
        AudioSrtPair { audio, subtitle }
    }

    fn chunker(min_duration_ms: u64) -> Chunker {
        Chunker::new(ChunkingConfig {
            min_duration_ms,
            ..ChunkingConfig::default()
        })
    }

    #[test]
    fn emits_records_and_skips_short_cues() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let pair = pair_in(
            dir.path(),
            "1\n00:00:00,000 --> 00:00:01,000\nfirst cue\n\n\
             2\n00:00:01,000 --> 00:00:01,200\ntoo short\n\n\
             3\n00:00:02,000 --> 00:00:03,000\nthird cue\n",
        );

        let summary = chunker(500).run(&[pair], dir.path())?;

        assert_eq!(summary.total_cues, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.records, 2);

        let records = metadata::read_index(&summary.metadata_path)?;
        assert_eq!(records[0].file_name, "episode_segment_0000.wav");
        assert_eq!(records[0].text, "first cue");
        assert_eq!(records[1].file_name, "episode_segment_0002.wav");
        assert!(summary.output_dir.join("episode_segment_0002.wav").exists());
        Ok(())
    }

    #[test]
    fn overlap_trims_clip_to_next_cue_start() -> Result<()> {
        let dir = tempfile::tempdir()?;
        // Cue 1 runs to 3s but cue 2 starts at 2s: the emitted clip must end
        // exactly at 2s.
        let pair = pair_in(
            dir.path(),
            "1\n00:00:00,000 --> 00:00:03,000\noverlapping\n\n\
             2\n00:00:02,000 --> 00:00:04,000\nnext\n",
        );

        let summary = chunker(500).run(&[pair], dir.path())?;
        assert_eq!(summary.records, 2);

        let first = AudioClip::load(&summary.output_dir.join("episode_segment_0000.wav"))?;
        assert_eq!(first.duration_ms(), 2000);
        Ok(())
    }

    #[test]
    fn overlap_collapsed_cue_is_skipped_not_emitted() -> Result<()> {
        let dir = tempfile::tempdir()?;
        // Cue 2 starts where cue 1 starts, collapsing cue 1 to zero length.
        let pair = pair_in(
            dir.path(),
            "1\n00:00:01,000 --> 00:00:02,000\ncollapsed\n\n\
             2\n00:00:01,000 --> 00:00:03,000\nsurvivor\n",
        );

        let summary = chunker(500).run(&[pair], dir.path())?;
        assert_eq!(summary.records, 1);
        assert_eq!(summary.skipped, 1);

        let records = metadata::read_index(&summary.metadata_path)?;
        assert_eq!(records[0].text, "survivor");
        Ok(())
    }

    #[test]
    fn multiline_text_is_flattened_and_blank_text_skipped() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let pair = pair_in(
            dir.path(),
            "1\n00:00:00,000 --> 00:00:01,000\nline one\nline two\n\n\
             2\n00:00:02,000 --> 00:00:03,000\n\n3\n00:00:04,000 --> 00:00:05,000\nlast\n",
        );

        let summary = chunker(500).run(&[pair], dir.path())?;
        let records = metadata::read_index(&summary.metadata_path)?;

        assert_eq!(summary.skipped, 1);
        assert_eq!(records[0].text, "line one line two");
        assert_eq!(records[1].text, "last");
        Ok(())
    }

    #[test]
    fn failing_pair_contributes_nothing_but_run_continues() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let good = pair_in(
            dir.path(),
            "1\n00:00:00,000 --> 00:00:01,000\nhealthy\n",
        );
        let bad = AudioSrtPair {
            audio: dir.path().join("missing.wav"),
            subtitle: dir.path().join("missing.srt"),
        };

        let summary = chunker(500).run(&[bad, good], dir.path())?;
        assert_eq!(summary.records, 1);

        let records = metadata::read_index(&summary.metadata_path)?;
        assert_eq!(records[0].text, "healthy");
        Ok(())
    }

    #[test]
    fn rerun_on_unchanged_input_is_byte_identical() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let pair = pair_in(
            dir.path(),
            "1\n00:00:00,000 --> 00:00:01,000\nalpha\n\n\
             2\n00:00:01,500 --> 00:00:02,500\nbeta\n",
        );

        let out_a = dir.path().join("run_a");
        let out_b = dir.path().join("run_b");
        let a = chunker(500).run(&[pair.clone()], &out_a)?;
        let b = chunker(500).run(&[pair], &out_b)?;

        assert_eq!(fs::read(&a.metadata_path)?, fs::read(&b.metadata_path)?);
        assert_eq!(
            fs::read(a.output_dir.join("episode_segment_0000.wav"))?,
            fs::read(b.output_dir.join("episode_segment_0000.wav"))?
        );
        Ok(())
    }

    #[test]
    fn format_duration_renders_minutes_and_seconds() {
        assert_eq!(format_duration(30_000), "30s");
        assert_eq!(format_duration(90_000), "1m 30s");
        assert_eq!(format_duration(125_000), "2m 5s");
    }
}
