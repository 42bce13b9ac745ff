//! Metadata index read/write.
//!
//! The index is the sole contract between pipeline stages: pipe-separated
//! rows under a mandatory header. Two schemas exist — the two-column segment
//! index (`file_name|text`) and the five-column flagged-record file written
//! by the validator for human audit. Flagged files are write-only from the
//! pipeline's point of view.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Header of a segment index.
pub const INDEX_HEADER: &str = "file_name|text";

/// Header of a flagged-record file.
pub const FLAGGED_HEADER: &str = "file_name|srt|primary|secondary|reason";

/// Placeholder for a flagged-record field with no value (for example the
/// secondary transcription when the primary model already failed). Keeps the
/// flagged schema fixed-width.
pub const FIELD_UNAVAILABLE: &str = "-";

/// The unit of exchange between stages: an audio artifact name (relative to
/// the stage's output directory) and its label text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRecord {
    pub file_name: String,
    pub text: String,
}

impl SegmentRecord {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            text: text.into(),
        }
    }
}

/// One row of the flagged-record file. All fields are already rendered;
/// unavailable ones hold [`FIELD_UNAVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlaggedRecord {
    pub file_name: String,
    pub srt: String,
    pub primary: String,
    pub secondary: String,
    pub reason: String,
}

/// Write a segment index. The file is written in one pass, header first.
pub fn write_index(path: &Path, records: &[SegmentRecord]) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "{INDEX_HEADER}")?;
    for record in records {
        writeln!(
            w,
            "{}|{}",
            sanitize_field(&record.file_name),
            sanitize_field(&record.text)
        )?;
    }

    w.flush()?;
    Ok(())
}

/// Read a segment index.
///
/// The header row is mandatory; a file without it is structurally broken.
/// Data rows missing the text column are skipped, matching the tolerant read
/// side of the contract. An empty (header-only) index is returned as an
/// empty list; whether that is fatal is the calling stage's decision.
pub fn read_index(path: &Path) -> Result<Vec<SegmentRecord>> {
    let contents = fs::read_to_string(path)?;
    let mut lines = contents.lines().map(|l| l.trim_end_matches('\r'));

    match lines.next() {
        Some(header) if header == INDEX_HEADER => {}
        _ => return Err(Error::MissingHeader(path.to_path_buf())),
    }

    let mut records = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let Some((file_name, text)) = line.split_once('|') else {
            continue;
        };
        records.push(SegmentRecord::new(file_name, text));
    }

    Ok(records)
}

/// Write the flagged-record file for human review.
pub fn write_flagged(path: &Path, records: &[FlaggedRecord]) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "{FLAGGED_HEADER}")?;
    for record in records {
        writeln!(
            w,
            "{}|{}|{}|{}|{}",
            sanitize_field(&record.file_name),
            sanitize_field(&record.srt),
            sanitize_field(&record.primary),
            sanitize_field(&record.secondary),
            sanitize_field(&record.reason)
        )?;
    }

    w.flush()?;
    Ok(())
}

/// Field values must not contain the column separator; embedded pipes become
/// spaces so every row splits back into the same number of columns.
fn sanitize_field(value: &str) -> String {
    value.replace('|', " ")
}
