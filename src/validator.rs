//! Dual-model consensus validation stage.
//!
//! Every record is judged independently: normalize the label, transcribe
//! with the primary model, compare boundary fingerprints, and only consult
//! the secondary model when label and primary already disagree. Evaluation
//! runs on a bounded worker pool; outcomes are collected over a channel and
//! partitioned into the accepted/flagged buckets by a single thread, so the
//! output files are never written concurrently.

use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::ValidationConfig;
use crate::error::{Error, Result};
use crate::metadata::{self, FIELD_UNAVAILABLE, FlaggedRecord, SegmentRecord};
use crate::normalize::{TextNormalizer, boundary_words};
use crate::transcribe::TranscriptionClient;

/// Why a record was routed to manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagReason {
    PrimaryFailed,
    SecondaryFailed,
    ModelDisagreement,
}

impl FlagReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FlagReason::PrimaryFailed => "Primary Model Failed",
            FlagReason::SecondaryFailed => "Secondary Model Failed",
            FlagReason::ModelDisagreement => "Model Disagreement",
        }
    }
}

/// Per-record classification result.
///
/// `Valid` text is either the original label (label and primary agreed) or
/// the primary model's transcription (the model pair outvoted the label).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Valid {
        file_name: String,
        text: String,
    },
    Flagged {
        file_name: String,
        srt: String,
        primary: Option<String>,
        secondary: Option<String>,
        reason: FlagReason,
    },
}

/// What the validation stage produced.
#[derive(Debug, Clone)]
pub struct ValidationSummary {
    pub validated_path: PathBuf,
    pub flagged_path: PathBuf,
    pub total_records: usize,
    pub valid: usize,
    pub flagged: usize,
    /// Records whose audio file was missing on disk; they appear in neither
    /// output bucket.
    pub dropped: usize,
}

#[derive(Debug)]
pub struct Validator {
    config: ValidationConfig,
    normalizer: TextNormalizer,
    primary: TranscriptionClient,
    secondary: TranscriptionClient,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Result<Self> {
        let normalizer = TextNormalizer::for_language(&config.language);
        let timeout = Duration::from_secs(config.timeout_secs);

        let primary = TranscriptionClient::new(
            config.primary_base_url(),
            config.primary_model.clone(),
            config.language.clone(),
            timeout,
            normalizer.clone(),
        )?;
        let secondary = TranscriptionClient::new(
            config.secondary_base_url(),
            config.secondary_model.clone(),
            config.language.clone(),
            timeout,
            normalizer.clone(),
        )?;

        info!(
            primary = primary.model(),
            primary_url = %config.primary_base_url(),
            secondary = secondary.model(),
            secondary_url = %config.secondary_base_url(),
            "transcription clients ready"
        );

        Ok(Self {
            config,
            normalizer,
            primary,
            secondary,
        })
    }

    /// Classify every record in `input_metadata`, reading clips from
    /// `input_dir`, and write the two disjoint output indices under
    /// `output_base`.
    pub fn run(
        &self,
        input_dir: &Path,
        input_metadata: &Path,
        output_base: &Path,
    ) -> Result<ValidationSummary> {
        let records = metadata::read_index(input_metadata)?;
        if records.is_empty() {
            return Err(Error::EmptyMetadata(input_metadata.to_path_buf()));
        }

        let total_records = records.len();
        let workers = self.config.max_workers.min(total_records).max(1);
        info!(total = total_records, workers, "validating transcriptions");

        let progress = ProgressBar::new(total_records as u64);
        progress.set_style(
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {eta}")
                .expect("progress template is valid")
                .progress_chars("#>-"),
        );

        let (job_tx, job_rx) = crossbeam_channel::bounded::<SegmentRecord>(workers * 2);
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<Outcome>();

        let outcomes: Vec<Outcome> = std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let outcome_tx = outcome_tx.clone();
                let progress = progress.clone();
                scope.spawn(move || {
                    for record in job_rx.iter() {
                        if let Some(outcome) = self.process_record(&record, input_dir) {
                            // The receiver outlives all workers; a send can
                            // only fail if collection already stopped.
                            let _ = outcome_tx.send(outcome);
                        }
                        progress.inc(1);
                    }
                });
            }
            drop(outcome_tx);

            for record in records {
                job_tx
                    .send(record)
                    .expect("workers hold the receiver until the queue closes");
            }
            drop(job_tx);

            outcome_rx.iter().collect()
        });
        progress.finish_and_clear();

        let (valid, flagged) = partition_outcomes(outcomes);
        let dropped = total_records - valid.len() - flagged.len();

        let validated_path = output_base.join(&self.config.output_metadata);
        let flagged_path = output_base.join(&self.config.flagged_file);
        metadata::write_index(&validated_path, &valid)?;
        metadata::write_flagged(&flagged_path, &flagged)?;

        info!(
            total = total_records,
            valid = valid.len(),
            flagged = flagged.len(),
            dropped,
            success_rate = %format!("{:.1}%", valid.len() as f64 / total_records as f64 * 100.0),
            validated = %validated_path.display(),
            flagged_file = %flagged_path.display(),
            "validation complete"
        );

        Ok(ValidationSummary {
            validated_path,
            flagged_path,
            total_records,
            valid: valid.len(),
            flagged: flagged.len(),
            dropped,
        })
    }

    /// Evaluate one record. Returns `None` when the named audio file does
    /// not exist; such records are dropped from both buckets.
    fn process_record(&self, record: &SegmentRecord, input_dir: &Path) -> Option<Outcome> {
        let clip_path = input_dir.join(&record.file_name);
        if !clip_path.exists() {
            warn!(file = %clip_path.display(), "audio file not found; dropping record");
            return None;
        }

        let srt_norm = self.normalizer.normalize(&record.text);
        let primary = self.primary.transcribe(&clip_path);

        Some(adjudicate(
            record.file_name.clone(),
            &record.text,
            &srt_norm,
            self.config.boundary_window,
            primary,
            || self.secondary.transcribe(&clip_path),
        ))
    }
}

/// The decision core: label vs. primary vs. (lazily obtained) secondary.
///
/// Step order is fixed: the primary result is examined first, fingerprints
/// are compared, and only on disagreement is `secondary` invoked. Keeping
/// the transcriptions as inputs makes the whole protocol testable without a
/// network.
fn adjudicate<F>(
    file_name: String,
    original_text: &str,
    srt_norm: &str,
    window: usize,
    primary: anyhow::Result<String>,
    secondary: F,
) -> Outcome
where
    F: FnOnce() -> anyhow::Result<String>,
{
    let primary = match primary {
        Ok(text) => text,
        Err(err) => {
            warn!(file = file_name.as_str(), "primary transcription failed: {err:#}");
            return Outcome::Flagged {
                file_name,
                srt: original_text.to_string(),
                primary: None,
                secondary: None,
                reason: FlagReason::PrimaryFailed,
            };
        }
    };

    let (srt_start, srt_end) = boundary_words(srt_norm, window);
    let (prim_start, prim_end) = boundary_words(&primary, window);

    let match_start = srt_start == prim_start;
    let match_end = srt_end == prim_end;

    // Both fingerprints agree: strong signal the label is already correct.
    if match_start && match_end {
        return Outcome::Valid {
            file_name,
            text: original_text.to_string(),
        };
    }

    let secondary = match secondary() {
        Ok(text) => text,
        Err(err) => {
            warn!(file = file_name.as_str(), "secondary transcription failed: {err:#}");
            return Outcome::Flagged {
                file_name,
                srt: original_text.to_string(),
                primary: Some(primary),
                secondary: None,
                reason: FlagReason::SecondaryFailed,
            };
        }
    };

    let (sec_start, sec_end) = boundary_words(&secondary, window);
    let models_agree_start = prim_start == sec_start;
    let models_agree_end = prim_end == sec_end;

    // Consensus fails on a side where the label already disagreed with the
    // primary and the models disagree with each other too.
    let mut consensus = true;
    if !match_start && !models_agree_start {
        consensus = false;
    }
    if !match_end && !models_agree_end {
        consensus = false;
    }

    if consensus {
        // The model pair outvotes the label; the primary model's wording is
        // kept as the higher-accuracy transcription.
        Outcome::Valid {
            file_name,
            text: primary,
        }
    } else {
        Outcome::Flagged {
            file_name,
            srt: original_text.to_string(),
            primary: Some(primary),
            secondary: Some(secondary),
            reason: FlagReason::ModelDisagreement,
        }
    }
}

/// Split collected outcomes into the accepted index and the flagged rows.
/// Runs on one thread after all workers finish.
fn partition_outcomes(outcomes: Vec<Outcome>) -> (Vec<SegmentRecord>, Vec<FlaggedRecord>) {
    let mut valid = Vec::new();
    let mut flagged = Vec::new();

    for outcome in outcomes {
        match outcome {
            Outcome::Valid { file_name, text } => {
                valid.push(SegmentRecord::new(file_name, text));
            }
            Outcome::Flagged {
                file_name,
                srt,
                primary,
                secondary,
                reason,
            } => {
                flagged.push(FlaggedRecord {
                    file_name,
                    srt,
                    primary: primary.unwrap_or_else(|| FIELD_UNAVAILABLE.to_string()),
                    secondary: secondary.unwrap_or_else(|| FIELD_UNAVAILABLE.to_string()),
                    reason: reason.as_str().to_string(),
                });
            }
        }
    }

    (valid, flagged)
}
