//! Pipeline orchestration.
//!
//! The orchestrator owns the one place the full input set is discovered
//! from the file system, then threads each stage's (directory, metadata)
//! output into the next stage's input. Stages never look upstream on their
//! own.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::chunker::{AudioSrtPair, ChunkSummary, Chunker};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::merger::{MergeSummary, Merger};
use crate::validator::{ValidationSummary, Validator};

/// What a full pipeline run produced, for the caller's summary output.
#[derive(Debug)]
pub struct PipelineReport {
    pub output_dir: PathBuf,
    pub pairs_found: usize,
    pub steps_completed: Vec<&'static str>,
    pub chunking: Option<ChunkSummary>,
    pub merging: Option<MergeSummary>,
    pub validation: Option<ValidationSummary>,
}

#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    chunker: Option<Chunker>,
    merger: Option<Merger>,
    validator: Option<Validator>,
}

impl Pipeline {
    /// Build a pipeline from a resolved configuration.
    ///
    /// Fails fast: configuration problems, a missing input directory, and
    /// unreachable stage construction all surface here, before any stage
    /// touches the output directory.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        if !config.input_dir.is_dir() {
            return Err(Error::MissingInputDir(config.input_dir.clone()));
        }
        fs::create_dir_all(&config.output_dir)?;

        let chunker = config
            .steps
            .chunking
            .then(|| Chunker::new(config.chunking.clone()));
        let merger = config
            .steps
            .merging
            .then(|| Merger::new(config.merging.clone()));
        let validator = config
            .steps
            .validation
            .then(|| Validator::new(config.validation.clone()))
            .transpose()?;

        Ok(Self {
            config,
            chunker,
            merger,
            validator,
        })
    }

    /// Run the enabled stages in order.
    pub fn run(&self) -> Result<PipelineReport> {
        info!(
            input = %self.config.input_dir.display(),
            output = %self.config.output_dir.display(),
            "pipeline started"
        );

        let pairs = find_audio_srt_pairs(&self.config.input_dir)?;
        if pairs.is_empty() {
            return Err(Error::NoPairsFound(self.config.input_dir.clone()));
        }

        let mut report = PipelineReport {
            output_dir: self.config.output_dir.clone(),
            pairs_found: pairs.len(),
            steps_completed: Vec::new(),
            chunking: None,
            merging: None,
            validation: None,
        };

        // Every downstream stage consumes the chunker's output; without it
        // there is nothing to merge or validate.
        let Some(chunker) = &self.chunker else {
            info!("chunking disabled; nothing for downstream stages to consume");
            return Ok(report);
        };

        let chunk = chunker.run(&pairs, &self.config.output_dir)?;
        let mut current_dir = chunk.output_dir.clone();
        let mut current_metadata = chunk.metadata_path.clone();
        report.steps_completed.push("chunking");
        report.chunking = Some(chunk);

        if let Some(merger) = &self.merger {
            let merge = merger.run(&current_dir, &current_metadata, &self.config.output_dir)?;
            current_dir = merge.output_dir.clone();
            current_metadata = merge.metadata_path.clone();
            report.steps_completed.push("merging");
            report.merging = Some(merge);
        } else {
            info!("merging disabled, skipping");
        }

        if let Some(validator) = &self.validator {
            let validation =
                validator.run(&current_dir, &current_metadata, &self.config.output_dir)?;
            report.steps_completed.push("validation");
            report.validation = Some(validation);
        } else {
            info!("validation disabled, skipping");
        }

        info!(
            steps = %report.steps_completed.join(", "),
            "pipeline completed"
        );
        Ok(report)
    }
}

/// Scan `input_dir` for WAV files and pair each with its subtitle file.
///
/// Audio files without a subtitle are logged and skipped. The result is
/// sorted by audio path so downstream artifact naming is deterministic.
pub fn find_audio_srt_pairs(input_dir: &Path) -> Result<Vec<AudioSrtPair>> {
    if !input_dir.is_dir() {
        return Err(Error::MissingInputDir(input_dir.to_path_buf()));
    }

    let mut audio_files: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect();
    audio_files.sort();

    let mut pairs = Vec::new();
    let mut missing = 0;

    for audio in audio_files {
        match find_subtitle_for_audio(&audio) {
            Some(subtitle) => pairs.push(AudioSrtPair { audio, subtitle }),
            None => {
                warn!(audio = %audio.display(), "no subtitle file found; skipping");
                missing += 1;
            }
        }
    }

    info!(pairs = pairs.len(), missing, "input scan complete");
    Ok(pairs)
}

/// Locate the subtitle file for an audio file, trying the plain and
/// language-tagged naming conventions in order.
fn find_subtitle_for_audio(audio: &Path) -> Option<PathBuf> {
    let stem = audio.file_stem()?.to_string_lossy();
    let parent = audio.parent()?;

    for suffix in ["srt", "fa.srt", "en.srt"] {
        let candidate = parent.join(format!("{stem}.{suffix}"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::write(path, b"").expect("fixture file should write");
    }

    #[test]
    fn pairs_audio_with_plain_and_language_tagged_subtitles() -> Result<()> {
        let dir = tempfile::tempdir()?;

        touch(&dir.path().join("a.wav"));
        touch(&dir.path().join("a.srt"));
        touch(&dir.path().join("b.wav"));
        touch(&dir.path().join("b.fa.srt"));
        touch(&dir.path().join("c.wav")); // no subtitle
        touch(&dir.path().join("notes.txt"));

        let pairs = find_audio_srt_pairs(dir.path())?;

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].audio, dir.path().join("a.wav"));
        assert_eq!(pairs[0].subtitle, dir.path().join("a.srt"));
        assert_eq!(pairs[1].subtitle, dir.path().join("b.fa.srt"));
        Ok(())
    }

    #[test]
    fn plain_subtitle_wins_over_language_tagged() -> Result<()> {
        let dir = tempfile::tempdir()?;
        touch(&dir.path().join("a.wav"));
        touch(&dir.path().join("a.srt"));
        touch(&dir.path().join("a.fa.srt"));

        let pairs = find_audio_srt_pairs(dir.path())?;
        assert_eq!(pairs[0].subtitle, dir.path().join("a.srt"));
        Ok(())
    }

    #[test]
    fn discovery_is_sorted_by_audio_path() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["zeta", "alpha", "mid"] {
            touch(&dir.path().join(format!("{name}.wav")));
            touch(&dir.path().join(format!("{name}.srt")));
        }

        let pairs = find_audio_srt_pairs(dir.path())?;
        let names: Vec<_> = pairs
            .iter()
            .map(|p| p.audio.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha.wav", "mid.wav", "zeta.wav"]);
        Ok(())
    }

    #[test]
    fn missing_input_dir_is_a_structural_error() {
        let err = find_audio_srt_pairs(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, Error::MissingInputDir(_)));
    }

    #[test]
    fn pipeline_new_rejects_missing_input_dir() {
        let mut config = Config::default();
        config.input_dir = PathBuf::from("/no/such/dir");
        config.output_dir = PathBuf::from("/tmp/quarry-test-unused");
        config.steps.validation = false;

        let err = Pipeline::new(config).unwrap_err();
        assert!(matches!(err, Error::MissingInputDir(_)));
    }
}
