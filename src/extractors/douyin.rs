use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{DouyinExtractor, VideoId, VideoMetadata};
use crate::utils::sanitize_filename;
use crate::{Result, TranscriptorError};

const VIDEO_PAGE_KEY: &str = "video_(id)/page";
const NOTE_PAGE_KEY: &str = "note_(id)/page";

/// `window._ROUTER_DATA` as embedded in the share page
#[derive(Debug, Deserialize)]
struct RouterData {
    #[serde(rename = "loaderData", default)]
    loader_data: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PageData {
    #[serde(rename = "videoInfoRes")]
    video_info_res: VideoInfoRes,
}

#[derive(Debug, Deserialize)]
struct VideoInfoRes {
    #[serde(default)]
    item_list: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    desc: Option<String>,
    video: Option<VideoDetail>,
    author: Option<Author>,
}

#[derive(Debug, Deserialize)]
struct VideoDetail {
    play_addr: Option<PlayAddr>,
}

#[derive(Debug, Deserialize)]
struct PlayAddr {
    #[serde(default)]
    url_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Author {
    nickname: Option<String>,
}

fn metadata_error(message: impl Into<String>) -> TranscriptorError {
    TranscriptorError::Metadata(message.into())
}

/// Text assigned to `window._ROUTER_DATA`, up to the closing script tag
fn extract_router_data(html: &str) -> Option<&str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"(?s)window\._ROUTER_DATA\s*=\s*(.*?)</script>").expect("valid regex")
    });

    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Swap the watermarked stream for the clean one and make the URL absolute
fn unwatermarked_url(url: &str) -> String {
    let url = url.replacen("playwm", "play", 1);
    if url.starts_with("http") {
        url
    } else {
        format!("https:{}", url)
    }
}

/// Parse a share page body into metadata for `video_id`
pub fn parse_share_page(html: &str, video_id: &VideoId) -> Result<VideoMetadata> {
    let raw = extract_router_data(html)
        .ok_or_else(|| metadata_error("page does not contain window._ROUTER_DATA"))?;

    let router: RouterData = serde_json::from_str(raw)
        .map_err(|e| metadata_error(format!("embedded page state is not valid JSON: {}", e)))?;

    let (page_kind, page) = [VIDEO_PAGE_KEY, NOTE_PAGE_KEY]
        .into_iter()
        .find_map(|key| router.loader_data.get(key).map(|page| (key, page)))
        .ok_or_else(|| metadata_error("no video or note page data in embedded state"))?;
    tracing::debug!("Share page data found under {}", page_kind);

    let page: PageData = serde_json::from_value(page.clone())
        .map_err(|e| metadata_error(format!("unexpected page data shape: {}", e)))?;

    let item = page
        .video_info_res
        .item_list
        .into_iter()
        .next()
        .ok_or_else(|| metadata_error("item list is empty"))?;

    let play_url = item
        .video
        .and_then(|video| video.play_addr)
        .and_then(|addr| addr.url_list.into_iter().next())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| metadata_error("item has no playable video URL"))?;

    let title = item
        .desc
        .as_deref()
        .map(str::trim)
        .filter(|desc| !desc.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("douyin_{}", video_id));

    Ok(VideoMetadata {
        download_url: unwatermarked_url(&play_url),
        title: sanitize_filename(&title),
        video_id: video_id.clone(),
        author: item.author.and_then(|a| a.nickname).unwrap_or_default(),
    })
}

impl DouyinExtractor {
    /// Fetch the share page for `video_id` and recover the media URL and title
    pub async fn fetch_metadata(&self, video_id: &VideoId) -> Result<VideoMetadata> {
        let page_url = format!("{}/{}", self.share_page_url, video_id);
        tracing::info!("Fetching video page: {}", page_url);

        let response = self
            .transport
            .send(self.mobile_get(&page_url))
            .await
            .map_err(|e| metadata_error(e.to_string()))?;

        if !response.is_success() {
            return Err(metadata_error(format!("share page answered HTTP {}", response.status)));
        }

        let metadata = parse_share_page(&response.body, video_id)?;
        tracing::info!("Found video \"{}\"", metadata.title);

        Ok(metadata)
    }
}
