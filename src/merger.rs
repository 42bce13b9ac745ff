//! Segment merging stage.
//!
//! Rewrites a metadata index by joining adjacent records in fixed pairs:
//! audio clips are concatenated in order and texts joined with a single
//! space. Output filenames are fresh sequential identifiers — the pairing
//! changes the record count, so the input naming scheme does not survive
//! this stage.

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::MergingConfig;
use crate::error::Result;
use crate::metadata::{self, SegmentRecord};
use crate::wav::AudioClip;

/// What the merging stage produced.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub output_dir: PathBuf,
    pub metadata_path: PathBuf,
    pub input_records: usize,
    pub merged_records: usize,
}

#[derive(Debug)]
pub struct Merger {
    config: MergingConfig,
}

impl Merger {
    pub fn new(config: MergingConfig) -> Self {
        Self { config }
    }

    /// Merge the records listed in `input_metadata`, reading clips from
    /// `input_dir` and writing artifacts plus a fresh index under
    /// `output_base`.
    ///
    /// An empty input index yields an empty (header-only) output index.
    pub fn run(
        &self,
        input_dir: &Path,
        input_metadata: &Path,
        output_base: &Path,
    ) -> Result<MergeSummary> {
        let output_dir = output_base.join(&self.config.output_subdir);
        fs::create_dir_all(&output_dir)?;

        let records = metadata::read_index(input_metadata)?;
        let metadata_path = output_dir.join(&self.config.metadata_file);

        if records.is_empty() {
            warn!("input index has no records; writing an empty merged index");
            metadata::write_index(&metadata_path, &[])?;
            return Ok(MergeSummary {
                output_dir,
                metadata_path,
                input_records: 0,
                merged_records: 0,
            });
        }

        let mut merged = Vec::new();
        let mut next_index = 0usize;

        let (first, rest) = records
            .split_first()
            .expect("records checked non-empty above");

        if self.config.keep_first_segment {
            info!(file = %first.file_name, "keeping first segment");
            let clip = AudioClip::load(&input_dir.join(&first.file_name))?;
            let file_name = merged_file_name(next_index);
            next_index += 1;
            clip.export(&output_dir.join(&file_name))?;
            merged.push(SegmentRecord::new(file_name, first.text.clone()));
        } else {
            info!(file = %first.file_name, "discarding first segment");
        }

        info!(count = rest.len(), "merging segments in pairs");
        let progress = ProgressBar::new(rest.chunks(2).len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len}")
                .expect("progress template is valid")
                .progress_chars("#>-"),
        );

        for pair in rest.chunks(2) {
            let (clip, text) = match pair {
                [a, b] => {
                    let mut clip = AudioClip::load(&input_dir.join(&a.file_name))?;
                    let second = AudioClip::load(&input_dir.join(&b.file_name))?;
                    clip.append(&second)?;
                    (clip, format!("{} {}", a.text, b.text))
                }
                // Odd remainder: the trailing record carries through unchanged.
                [a] => (
                    AudioClip::load(&input_dir.join(&a.file_name))?,
                    a.text.clone(),
                ),
                _ => unreachable!("chunks(2) yields one- or two-element slices"),
            };

            let file_name = merged_file_name(next_index);
            next_index += 1;
            clip.export(&output_dir.join(&file_name))?;
            merged.push(SegmentRecord::new(file_name, text));
            progress.inc(1);
        }
        progress.finish_and_clear();

        metadata::write_index(&metadata_path, &merged)?;

        info!(
            input = records.len(),
            merged = merged.len(),
            metadata = %metadata_path.display(),
            "merging complete"
        );

        Ok(MergeSummary {
            output_dir,
            metadata_path,
            input_records: records.len(),
            merged_records: merged.len(),
        })
    }
}

fn merged_file_name(index: usize) -> String {
    format!("merged_{index:04}.wav")
}
