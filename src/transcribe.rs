//! Transcription client boundary.
//!
//! One blocking HTTP call per audio file against an OpenAI-Whisper-compatible
//! endpoint (`POST {base}/audio/transcriptions`, multipart). The client
//! carries an explicit per-request timeout and never retries: a timed-out or
//! failed call surfaces as an error so the validator can flag the record
//! with an auditable reason instead of silently re-asking the model.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, multipart};
use serde::Deserialize;

use crate::normalize::TextNormalizer;

/// JSON body returned by `response_format=json`.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// A client bound to one endpoint and one model.
pub struct TranscriptionClient {
    http: Client,
    base_url: String,
    model: String,
    language: String,
    normalizer: TextNormalizer,
}

impl TranscriptionClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
        normalizer: TextNormalizer,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            language: language.into(),
            normalizer,
        })
    }

    /// Model identifier this client submits.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Transcribe one audio file and return the normalized text.
    ///
    /// Any failure (unreadable file, connection error, non-2xx status,
    /// malformed body, timeout) is returned as an error.
    pub fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let bytes = fs::read(audio_path)
            .with_context(|| format!("failed to read audio: {}", audio_path.display()))?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .context("failed to build multipart file part")?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "json");

        let response = self
            .http
            .post(self.endpoint())
            .multipart(form)
            .send()
            .with_context(|| format!("transcription request failed: {}", self.endpoint()))?
            .error_for_status()
            .with_context(|| format!("transcription rejected by {} ({})", self.endpoint(), self.model))?;

        let body = response
            .text()
            .context("failed to read transcription response body")?;
        let parsed: TranscriptionResponse = serde_json::from_str(&body)
            .with_context(|| format!("transcription response was not valid JSON: {body:.120}"))?;

        Ok(self.normalizer.normalize(&parsed.text))
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }
}

impl std::fmt::Debug for TranscriptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}
