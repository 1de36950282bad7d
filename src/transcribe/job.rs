use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::RecognitionModel;
use crate::config::Config;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::{Result, TranscriptorError};

/// Remote task status; anything but SUCCEEDED and FAILED keeps the task alive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl From<&str> for JobStatus {
    fn from(status: &str) -> Self {
        match status {
            "PENDING" => JobStatus::Pending,
            "RUNNING" => JobStatus::Running,
            "SUCCEEDED" => JobStatus::Succeeded,
            "FAILED" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Succeeded => write!(f, "SUCCEEDED"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Other(status) => write!(f, "{}", status),
        }
    }
}

/// Last observed state of a submitted recognition task
#[derive(Debug, Clone)]
pub struct RecognitionJob {
    pub task_id: String,
    pub status: JobStatus,
    transcription_url: Option<String>,
}

/// How long to wait on a task
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    output: Option<TaskOutput>,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    task_id: Option<String>,
    task_status: Option<String>,
    #[serde(default)]
    results: Vec<TaskResult>,
}

#[derive(Debug, Deserialize)]
struct TaskResult {
    transcription_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

fn transcription_error(message: impl Into<String>) -> TranscriptorError {
    TranscriptorError::Transcription(message.into())
}

/// Describe a non-2xx answer, using the vendor's code and message when present
fn http_failure(what: &str, response: &HttpResponse) -> TranscriptorError {
    let detail = match response.json::<ApiError>() {
        Ok(ApiError {
            code: Some(code),
            message,
        }) => format!("{} ({})", code, message.unwrap_or_default()),
        _ => response.body.chars().take(200).collect(),
    };

    transcription_error(format!("{} answered HTTP {}: {}", what, response.status, detail))
}

/// Client for the DashScope recording-file recognition API
pub struct DashscopeClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    policy: PollPolicy,
    show_progress: bool,
}

impl DashscopeClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        Self {
            transport,
            base_url: config.dashscope.base_url.trim_end_matches('/').to_string(),
            policy: PollPolicy {
                interval: config.poll_interval(),
                max_attempts: config.dashscope.max_poll_attempts,
            },
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Submit `media_url`, wait for the task to finish and download the raw transcript document
    pub async fn transcribe(
        &self,
        media_url: &str,
        api_key: &str,
        model: &RecognitionModel,
    ) -> Result<String> {
        if api_key.trim().is_empty() {
            return Err(transcription_error("no API key configured"));
        }

        let job = self.submit(media_url, api_key, model).await?;
        let job = self.wait_for_completion(job, api_key).await?;

        match (&job.status, &job.transcription_url) {
            (JobStatus::Succeeded, Some(url)) => self.download_transcript(url).await,
            (JobStatus::Succeeded, None) => Err(transcription_error(format!(
                "task {} SUCCEEDED without a transcription URL",
                job.task_id
            ))),
            (status, _) => Err(transcription_error(format!(
                "recognition task {} ended with status {}",
                job.task_id, status
            ))),
        }
    }

    /// Create a recognition task
    pub async fn submit(
        &self,
        media_url: &str,
        api_key: &str,
        model: &RecognitionModel,
    ) -> Result<RecognitionJob> {
        tracing::info!("Submitting recognition task with model {}", model);

        let request = HttpRequest::post(format!("{}/services/audio/asr/transcription", self.base_url))
            .bearer_auth(api_key)
            .header("X-Dashscope-Async", "enable")
            .json(json!({
                "model": model.as_str(),
                "input": { "file_urls": [media_url] },
                "parameters": {
                    "timestamp_alignment_enabled": false,
                    "diarization_enabled": false,
                },
            }));

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| transcription_error(e.to_string()))?;
        if !response.is_success() {
            return Err(http_failure("task submission", &response));
        }

        let envelope: TaskEnvelope = response.json().map_err(|e| {
            transcription_error(format!("unexpected task submission response: {}", e))
        })?;
        let output = envelope
            .output
            .ok_or_else(|| transcription_error("task submission response has no output"))?;
        let task_id = output
            .task_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| transcription_error("task submission response has no task_id"))?;

        tracing::info!("Recognition task submitted: {}", task_id);

        Ok(RecognitionJob {
            task_id,
            status: output
                .task_status
                .as_deref()
                .map(JobStatus::from)
                .unwrap_or(JobStatus::Pending),
            transcription_url: None,
        })
    }

    /// Re-read the task state
    pub async fn query(&self, task_id: &str, api_key: &str) -> Result<RecognitionJob> {
        let request = HttpRequest::post(format!("{}/tasks/{}", self.base_url, task_id))
            .bearer_auth(api_key);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| transcription_error(e.to_string()))?;
        if !response.is_success() {
            return Err(http_failure("task status query", &response));
        }

        let envelope: TaskEnvelope = response
            .json()
            .map_err(|e| transcription_error(format!("unexpected task status response: {}", e)))?;
        let output = envelope
            .output
            .ok_or_else(|| transcription_error("task status response has no output"))?;

        let status = output
            .task_status
            .as_deref()
            .map(JobStatus::from)
            .unwrap_or_else(|| JobStatus::Other("UNKNOWN".to_string()));
        let transcription_url = output
            .results
            .into_iter()
            .next()
            .and_then(|result| result.transcription_url)
            .filter(|url| !url.is_empty());

        Ok(RecognitionJob {
            task_id: task_id.to_string(),
            status,
            transcription_url,
        })
    }

    /// Poll every `interval` until the task is terminal or `max_attempts` checks were made
    pub async fn wait_for_completion(&self, mut job: RecognitionJob, api_key: &str) -> Result<RecognitionJob> {
        let progress = if self.show_progress {
            let progress = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
                progress.set_style(style);
            }
            progress
        } else {
            ProgressBar::hidden()
        };
        progress.set_message("Waiting for recognition task...");

        let start_time = tokio::time::Instant::now();
        let task_id = job.task_id.clone();

        for attempt in 1..=self.policy.max_attempts {
            sleep(self.policy.interval).await;

            job = self.query(&task_id, api_key).await?;
            tracing::debug!("Task {} status {} (check #{})", job.task_id, job.status, attempt);

            if job.status.is_terminal() {
                progress.finish_with_message(format!("Recognition task {}", job.status));
                return Ok(job);
            }

            progress.set_message(format!(
                "Transcribing... ({}s elapsed, check #{}, {})",
                start_time.elapsed().as_secs(),
                attempt,
                job.status
            ));
        }

        progress.finish_with_message("Recognition task timed out");
        Err(TranscriptorError::Timeout {
            task_id,
            attempts: self.policy.max_attempts,
        })
    }

    /// Download the transcript document produced by a finished task
    async fn download_transcript(&self, url: &str) -> Result<String> {
        tracing::info!("Downloading transcript");

        let response = self
            .transport
            .send(HttpRequest::get(url))
            .await
            .map_err(|e| transcription_error(e.to_string()))?;
        if !response.is_success() {
            return Err(http_failure("transcript download", &response));
        }

        Ok(response.body)
    }
}
