//! `quarry` — a pipeline that mines labeled ASR training corpora out of
//! long-form audio paired with subtitle files.
//!
//! This crate provides:
//! - Subtitle-aligned audio chunking with overlap resolution
//! - Pairwise segment merging to reshape utterance lengths
//! - Dual-model consensus validation against Whisper-compatible endpoints
//! - Pipe-delimited metadata indices as the contract between stages
//!
//! The library is designed to be driven by the `quarry-cli` binary or
//! embedded in other tooling: construct a [`config::Config`], hand it to
//! [`pipeline::Pipeline`], and run.

// High-level API (most consumers should start here).
pub mod config;
pub mod pipeline;

// Pipeline stages.
pub mod chunker;
pub mod merger;
pub mod validator;

// Shared primitives: text normalization and boundary fingerprints.
pub mod normalize;

// External collaborators: subtitles, audio, metadata, transcription.
pub mod metadata;
pub mod srt;
pub mod transcribe;
pub mod wav;

// Error types.
pub mod error;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use error::{Error, Result};
