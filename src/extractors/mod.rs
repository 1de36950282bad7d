use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub mod douyin;
pub mod resolver;

use crate::config::Config;
use crate::http::{HttpRequest, HttpTransport};
use crate::{Result, TranscriptorError};

/// Minimum number of digits in a Douyin video id
pub const MIN_VIDEO_ID_LEN: usize = 10;

/// Canonical numeric Douyin video id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Accepts only all-digit strings of at least ten characters
    pub fn parse(candidate: &str) -> Result<Self> {
        let valid = candidate.len() >= MIN_VIDEO_ID_LEN
            && candidate.bytes().all(|b| b.is_ascii_digit());

        if valid {
            Ok(Self(candidate.to_string()))
        } else {
            Err(TranscriptorError::Resolution(format!(
                "invalid id: {:?} is not a numeric id of at least {} digits",
                candidate, MIN_VIDEO_ID_LEN
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Information recovered from a video's share page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Direct, unwatermarked media URL
    pub download_url: String,

    /// Description with file-name-illegal characters replaced
    pub title: String,

    pub video_id: VideoId,

    /// Author nickname, empty when the page does not carry one
    #[serde(skip)]
    pub author: String,
}

/// Resolves share links and scrapes video pages through an [`HttpTransport`]
pub struct DouyinExtractor {
    transport: Arc<dyn HttpTransport>,
    user_agent: String,
    share_page_url: String,
    request_timeout: Duration,
}

impl DouyinExtractor {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &Config) -> Self {
        Self {
            transport,
            user_agent: config.douyin.user_agent.clone(),
            share_page_url: config.douyin.share_page_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
        }
    }

    /// Resolve a share reference and fetch the video's metadata
    pub async fn extract(&self, share: &str) -> Result<VideoMetadata> {
        let video_id = self.resolve_video_id(share).await?;
        self.fetch_metadata(&video_id).await
    }

    fn mobile_get(&self, url: &str) -> HttpRequest {
        HttpRequest::get(url).header("User-Agent", self.user_agent.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_validation() {
        assert!(VideoId::parse("7372484719365098803").is_ok());
        assert!(VideoId::parse("1234567890").is_ok());
        assert!(VideoId::parse("123456789").is_err());
        assert!(VideoId::parse("73724847x9365098803").is_err());
        assert!(VideoId::parse("").is_err());
    }

    #[test]
    fn test_video_id_serializes_as_plain_string() {
        let id = VideoId::parse("7372484719365098803").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7372484719365098803\"");
        assert_eq!(id.to_string(), "7372484719365098803");
    }
}
