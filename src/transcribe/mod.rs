use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::config::{Config, CredentialStore};
use crate::extractors::{DouyinExtractor, VideoMetadata};
use crate::http::HttpTransport;
use crate::{Result, TranscriptorError};

pub mod job;
pub mod processor;

pub use job::{DashscopeClient, JobStatus, PollPolicy, RecognitionJob};
pub use processor::{normalize, normalize_value, SubtitleEntry, TranscriptResult};

/// DashScope recording-file recognition models
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RecognitionModel {
    ParaformerV1,
    #[default]
    ParaformerV2,
    FunAsr,
    /// Any other model name, passed through verbatim
    Custom(String),
}

impl RecognitionModel {
    /// Models offered out of the box
    pub const KNOWN: [RecognitionModel; 3] = [
        RecognitionModel::ParaformerV1,
        RecognitionModel::ParaformerV2,
        RecognitionModel::FunAsr,
    ];

    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "" | "paraformer-v2" => RecognitionModel::ParaformerV2,
            "paraformer-v1" => RecognitionModel::ParaformerV1,
            "fun-asr" => RecognitionModel::FunAsr,
            other => RecognitionModel::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecognitionModel::ParaformerV1 => "paraformer-v1",
            RecognitionModel::ParaformerV2 => "paraformer-v2",
            RecognitionModel::FunAsr => "fun-asr",
            RecognitionModel::Custom(name) => name,
        }
    }
}

impl fmt::Display for RecognitionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with one input item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operation {
    /// Resolve the share link and return video metadata
    ParseVideoInfo,
    /// Metadata plus speech recognition of the video
    ExtractText,
}

impl TryFrom<String> for Operation {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.as_str() {
            "parseVideoInfo" => Ok(Operation::ParseVideoInfo),
            "extractText" => Ok(Operation::ExtractText),
            other => Err(format!("unknown operation: {}", other)),
        }
    }
}

impl From<Operation> for String {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::ParseVideoInfo => "parseVideoInfo".to_string(),
            Operation::ExtractText => "extractText".to_string(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ParseVideoInfo => write!(f, "parse video info"),
            Operation::ExtractText => write!(f, "extract text"),
        }
    }
}

/// One unit of work as supplied by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputItem {
    pub operation: Operation,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognition_model: Option<String>,
}

/// Transcript half of an `extractText` record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptFields {
    pub success: bool,
    pub author: String,
    pub duration: u64,
    pub full_text: String,
    pub subtitle_entries: Vec<SubtitleEntry>,
    pub srt_subtitle: String,
    pub audio_format: String,
    pub sampling_rate: u64,
    pub channels: Vec<Value>,
}

/// Record handed back to the host for one item
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    #[serde(flatten)]
    pub metadata: VideoMetadata,

    #[serde(rename = "shareUrl")]
    pub share_url: String,

    #[serde(flatten)]
    pub transcript: Option<TranscriptFields>,
}

/// Sequences id resolution, page scraping, recognition and normalization per item
pub struct TranscriptionPipeline {
    extractor: DouyinExtractor,
    client: DashscopeClient,
    credentials: Box<dyn CredentialStore>,
    default_model: RecognitionModel,
}

impl TranscriptionPipeline {
    pub fn new(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        credentials: Box<dyn CredentialStore>,
    ) -> Self {
        Self {
            extractor: DouyinExtractor::new(transport.clone(), config),
            client: DashscopeClient::new(transport, config),
            credentials,
            default_model: RecognitionModel::from_name(&config.dashscope.default_model),
        }
    }

    /// Show a spinner while waiting on recognition tasks
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.client = self.client.with_progress(show_progress);
        self
    }

    /// Run one item; any stage failure fails the item with an operation-prefixed error
    pub async fn process(&self, item: &InputItem) -> Result<OutputRecord> {
        let result = match item.operation {
            Operation::ParseVideoInfo => self.parse_video_info(&item.video_url).await,
            Operation::ExtractText => {
                self.extract_text(&item.video_url, item.recognition_model.as_deref())
                    .await
            }
        };

        result.map_err(|source| TranscriptorError::Operation {
            operation: item.operation,
            source: Box::new(source),
        })
    }

    async fn parse_video_info(&self, share: &str) -> Result<OutputRecord> {
        let metadata = self.extractor.extract(share).await?;

        Ok(OutputRecord {
            metadata,
            share_url: share.to_string(),
            transcript: None,
        })
    }

    async fn extract_text(&self, share: &str, model: Option<&str>) -> Result<OutputRecord> {
        let api_key = self.credentials.api_key().ok_or_else(|| {
            TranscriptorError::Configuration("no DashScope API key configured".to_string())
        })?;

        let metadata = self.extractor.extract(share).await?;

        let model = model
            .map(RecognitionModel::from_name)
            .unwrap_or_else(|| self.default_model.clone());
        let raw = self
            .client
            .transcribe(&metadata.download_url, &api_key, &model)
            .await?;

        let transcript = processor::normalize(&raw);
        if !transcript.is_success() {
            return Err(TranscriptorError::Transcription(
                transcript
                    .error
                    .unwrap_or_else(|| "transcript could not be parsed".to_string()),
            ));
        }

        tracing::info!(
            "Transcribed \"{}\": {} subtitle entries",
            metadata.title,
            transcript.subtitle_entries.len()
        );

        let fields = TranscriptFields {
            success: true,
            author: metadata.author.clone(),
            duration: transcript.duration,
            full_text: transcript.full_text,
            subtitle_entries: transcript.subtitle_entries,
            srt_subtitle: transcript.srt_subtitle,
            audio_format: transcript.audio_format,
            sampling_rate: transcript.sampling_rate,
            channels: transcript.channels,
        };

        Ok(OutputRecord {
            metadata,
            share_url: share.to_string(),
            transcript: Some(fields),
        })
    }
}
