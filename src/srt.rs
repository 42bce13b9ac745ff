//! Subtitle parser boundary.
//!
//! Reads SubRip (`.srt`) input into an ordered cue list with millisecond
//! timestamps and raw (possibly multi-line) text. The chunker is the only
//! consumer; it resolves overlaps and degenerate durations itself, so this
//! parser stays a faithful reader and does not reorder or repair cues.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

/// A single subtitle entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub start_ms: u64,
    pub end_ms: u64,
    /// Raw cue text. Line breaks inside a cue are preserved here.
    pub text: String,
}

impl Cue {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Parse an SRT file into an ordered cue list.
pub fn parse_srt_file(path: &Path) -> Result<Vec<Cue>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read subtitle file: {}", path.display()))?;
    parse_srt(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

/// Parse SRT text into an ordered cue list.
///
/// Accepted shape per block: an optional numeric counter line, a timing line
/// `HH:MM:SS,mmm --> HH:MM:SS,mmm` (a `.` millisecond separator is also
/// accepted), then text lines until a blank line. Tolerates a UTF-8 BOM and
/// CRLF line endings.
pub fn parse_srt(input: &str) -> Result<Vec<Cue>> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut cues = Vec::new();
    let mut lines = input.lines().map(|l| l.trim_end_matches('\r')).peekable();

    while let Some(line) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }

        // A block may start with a counter line; the timing line is the anchor.
        let timing_line = if line.contains("-->") {
            line
        } else {
            match lines.next() {
                Some(next) if next.contains("-->") => next,
                Some(next) => bail!("expected timing line after '{line}', got '{next}'"),
                None => bail!("unterminated subtitle block starting at '{line}'"),
            }
        };

        let (start_ms, end_ms) = parse_timing_line(timing_line)?;

        let mut text_lines: Vec<&str> = Vec::new();
        while let Some(&text_line) = lines.peek() {
            if text_line.trim().is_empty() {
                break;
            }
            text_lines.push(text_line);
            lines.next();
        }

        cues.push(Cue {
            start_ms,
            end_ms,
            text: text_lines.join("\n"),
        });
    }

    Ok(cues)
}

fn parse_timing_line(line: &str) -> Result<(u64, u64)> {
    let Some((start_raw, end_raw)) = line.split_once("-->") else {
        bail!("not a timing line: '{line}'");
    };

    let start_ms = parse_timestamp(start_raw.trim())?;
    // Coordinate suffixes ("X1:... X2:...") occasionally follow the end stamp.
    let end_field = end_raw.trim().split_whitespace().next().unwrap_or("");
    let end_ms = parse_timestamp(end_field)?;

    Ok((start_ms, end_ms))
}

/// Parse `HH:MM:SS,mmm` (or `HH:MM:SS.mmm`) into milliseconds.
fn parse_timestamp(stamp: &str) -> Result<u64> {
    let parts: Vec<&str> = stamp.split(':').collect();
    if parts.len() != 3 {
        bail!("invalid timestamp '{stamp}'");
    }

    let (secs_raw, millis_raw) = parts[2]
        .split_once([',', '.'])
        .with_context(|| format!("timestamp '{stamp}' is missing milliseconds"))?;

    let hours: u64 = parse_component(parts[0], stamp)?;
    let minutes: u64 = parse_component(parts[1], stamp)?;
    let seconds: u64 = parse_component(secs_raw, stamp)?;
    let millis: u64 = parse_component(millis_raw, stamp)?;

    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        bail!("timestamp '{stamp}' has out-of-range components");
    }

    Ok(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}

fn parse_component(raw: &str, stamp: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .with_context(|| format!("invalid timestamp '{stamp}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_cues_in_order() -> Result<()> {
        let cues = parse_srt(
            "1\n00:00:01,000 --> 00:00:02,500\nhello there\n\n2\n00:00:03,000 --> 00:00:04,000\nsecond cue\n",
        )?;

        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].start_ms, 1000);
        assert_eq!(cues[0].end_ms, 2500);
        assert_eq!(cues[0].text, "hello there");
        assert_eq!(cues[1].start_ms, 3000);
        assert_eq!(cues[1].duration_ms(), 1000);
        Ok(())
    }

    #[test]
    fn preserves_multiline_cue_text() -> Result<()> {
        let cues = parse_srt("1\n00:00:00,000 --> 00:00:01,000\nline one\nline two\n")?;
        assert_eq!(cues[0].text, "line one\nline two");
        Ok(())
    }

    #[test]
    fn tolerates_bom_crlf_and_missing_counter() -> Result<()> {
        let cues = parse_srt("\u{feff}00:00:00,100 --> 00:00:00,900\r\ntext\r\n\r\n")?;
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].start_ms, 100);
        assert_eq!(cues[0].end_ms, 900);
        Ok(())
    }

    #[test]
    fn accepts_dot_millisecond_separator() -> Result<()> {
        let cues = parse_srt("1\n01:02:03.004 --> 01:02:04.000\nx\n")?;
        assert_eq!(cues[0].start_ms, ((62 * 60) + 3) * 1000 + 4);
        Ok(())
    }

    #[test]
    fn empty_input_yields_no_cues() -> Result<()> {
        assert!(parse_srt("")?.is_empty());
        assert!(parse_srt("\n\n\n")?.is_empty());
        Ok(())
    }

    #[test]
    fn cue_without_text_yields_empty_text() -> Result<()> {
        let cues = parse_srt("1\n00:00:00,000 --> 00:00:01,000\n\n2\n00:00:02,000 --> 00:00:03,000\nok\n")?;
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "");
        assert_eq!(cues[1].text, "ok");
        Ok(())
    }

    #[test]
    fn rejects_malformed_timing() {
        assert!(parse_srt("1\nnot a timing line\ntext\n").is_err());
        assert!(parse_srt("1\n00:00:00 --> 00:00:01,000\nx\n").is_err());
        assert!(parse_srt("1\n00:99:00,000 --> 00:00:01,000\nx\n").is_err());
    }
}
