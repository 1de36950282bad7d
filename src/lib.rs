//! Douyin Transcript - resolve Douyin share links and transcribe them
//!
//! This library turns a Douyin share link (or share text containing one) into a
//! direct media URL, submits it to the DashScope recording-file recognition service
//! and normalizes the returned transcript into plain text, subtitle entries and SRT.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod http;
pub mod output;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::{Config, CredentialStore};
pub use extractors::{DouyinExtractor, VideoId, VideoMetadata};
pub use http::{HttpTransport, ReqwestTransport};
pub use transcribe::processor::{SubtitleEntry, TranscriptResult};
pub use transcribe::{InputItem, Operation, OutputRecord, RecognitionModel, TranscriptionPipeline};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TranscriptorError>;

/// Error types specific to the transcriptor
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("Failed to resolve video id: {0}")]
    Resolution(String),

    #[error("Failed to fetch video metadata: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Recognition task {task_id} did not finish after {attempts} status checks")]
    Timeout { task_id: String, attempts: u32 },

    #[error("{operation} failed: {source}")]
    Operation {
        operation: Operation,
        #[source]
        source: Box<TranscriptorError>,
    },
}

impl TranscriptorError {
    /// Innermost error, skipping any operation wrappers
    pub fn root_cause(&self) -> &TranscriptorError {
        match self {
            TranscriptorError::Operation { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
