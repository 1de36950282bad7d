use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::transcribe::InputItem;

#[derive(Parser)]
#[command(
    name = "douyin-transcript",
    about = "Douyin Transcript - Resolve Douyin share links and transcribe them with DashScope",
    version,
    long_about = "Resolves Douyin share links or share text to the direct video URL, and optionally transcribes the video with the DashScope recording-file recognition service, producing plain text, subtitle entries and SRT."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to ./douyin-transcript.yaml or the user config directory)
    #[arg(long, global = true, value_name = "FILE", env = "DOUYIN_TRANSCRIPT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output file path (prints to console if not specified)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (defaults to app.default_output_format from the config)
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a share link and print the video metadata
    Info {
        /// Share URL or share text containing one
        #[arg(value_name = "SHARE")]
        share: String,
    },

    /// Resolve a share link and transcribe the video
    Transcribe {
        /// Share URL or share text containing one
        #[arg(value_name = "SHARE")]
        share: String,

        /// Recognition model (paraformer-v1, paraformer-v2, fun-asr or any DashScope model name)
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,
    },

    /// Process a JSON array or JSON-lines file of input items, one at a time
    Batch {
        /// File with items like {"operation": "extractText", "videoUrl": "..."}
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Keep going after an item fails
        #[arg(long)]
        continue_on_error: bool,
    },

    /// List supported recognition models
    Models,

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON records
    Json,
    /// Plain text transcript with a short header
    Text,
    /// SRT subtitle format
    Srt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Srt => write!(f, "srt"),
        }
    }
}

/// Parse batch input: a JSON array of items, or one JSON item per line
pub fn parse_batch(content: &str) -> Result<Vec<InputItem>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse batch file as a JSON array");
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Failed to parse batch item on line {}", index + 1))
        })
        .collect()
}
