use regex::Regex;
use std::sync::OnceLock;

use super::{DouyinExtractor, VideoId};
use crate::utils::{extract_domain, extract_first_url};
use crate::{Result, TranscriptorError};

fn video_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/video/(\d+)").expect("valid regex"))
}

/// Last path segment of a URL, ignoring the query string and a trailing slash
fn last_path_segment(url: &str) -> &str {
    let without_query = url.split('?').next().unwrap_or(url);
    let trimmed = without_query.strip_suffix('/').unwrap_or(without_query);
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

impl DouyinExtractor {
    /// Turn a share link, or share text containing one, into a video id.
    ///
    /// Full `/video/<id>` URLs are answered locally. Short links are requested once
    /// with redirects disabled and the id is read from the `Location` header.
    pub async fn resolve_video_id(&self, share: &str) -> Result<VideoId> {
        let trimmed = share.trim();
        let share_url = extract_first_url(trimmed).unwrap_or(trimmed);

        if let Some(caps) = video_path_pattern().captures(share_url) {
            tracing::debug!("Video id found directly in {}", share_url);
            return VideoId::parse(&caps[1]);
        }

        tracing::info!(
            "Resolving share link on {}",
            extract_domain(share_url).unwrap_or_else(|| share_url.to_string())
        );

        let request = self
            .mobile_get(share_url)
            .no_redirects()
            .timeout(self.request_timeout);

        let response = match self.transport.send(request).await {
            Ok(response) if response.is_success() || response.is_redirect() => response,
            Ok(response) => {
                tracing::debug!("Share link answered HTTP {}", response.status);
                return Err(TranscriptorError::Resolution(format!(
                    "no response: share link answered HTTP {}",
                    response.status
                )));
            }
            Err(failure) => {
                tracing::debug!("Share link request failed: {}", failure);
                return Err(TranscriptorError::Resolution(format!("no response: {}", failure)));
            }
        };

        let final_url = response.header("location").unwrap_or(share_url);
        tracing::debug!("Share link resolved to {}", final_url);

        VideoId::parse(last_path_segment(final_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::{HttpResponse, MockHttpTransport, TransportFailure};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn extractor(mock: MockHttpTransport) -> DouyinExtractor {
        DouyinExtractor::new(Arc::new(mock), &Config::default())
    }

    fn redirect_to(location: &str) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert("location".to_string(), location.to_string());
        HttpResponse {
            status: 302,
            headers,
            body: String::new(),
        }
    }

    #[test]
    fn test_last_path_segment() {
        assert_eq!(last_path_segment("https://a.com/share/video/123/?x=1"), "123");
        assert_eq!(last_path_segment("https://a.com/share/video/123"), "123");
        assert_eq!(last_path_segment("https://a.com/share/video/123/"), "123");
    }

    #[tokio::test]
    async fn test_full_video_url_needs_no_request() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().never();

        let id = extractor(mock)
            .resolve_video_id("https://www.douyin.com/video/7372484719365098803?modal_id=1")
            .await
            .unwrap();
        assert_eq!(id.as_str(), "7372484719365098803");
    }

    #[tokio::test]
    async fn test_short_link_follows_one_redirect() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .withf(|req| {
                req.url == "https://v.douyin.com/iRNBho6u/"
                    && !req.follow_redirects
                    && req.timeout == Some(Duration::from_secs(10))
                    && req.headers.iter().any(|(name, value)| name == "User-Agent" && value.contains("iPhone"))
            })
            .times(1)
            .returning(|_| {
                Ok(redirect_to(
                    "https://www.iesdouyin.com/share/video/7372484719365098803/?region=CN&mid=1",
                ))
            });

        let share = "7.43 复制打开抖音，看看【作品】 https://v.douyin.com/iRNBho6u/ 02/10 XyZ:/";
        let id = extractor(mock).resolve_video_id(share).await.unwrap();
        assert_eq!(id.as_str(), "7372484719365098803");
    }

    #[tokio::test]
    async fn test_short_resolved_id_is_rejected() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Ok(redirect_to("https://www.iesdouyin.com/share/video/12345/")));

        let err = extractor(mock)
            .resolve_video_id("https://v.douyin.com/abc/")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptorError::Resolution(ref msg) if msg.starts_with("invalid id")));
    }

    #[tokio::test]
    async fn test_non_numeric_location_is_rejected() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Ok(redirect_to("https://www.douyin.com/user/MS4wLjABAAAA")));

        let result = extractor(mock).resolve_video_id("https://v.douyin.com/abc/").await;
        assert!(matches!(result, Err(TranscriptorError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_transport_failure_is_no_response() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(|req| {
            Err(TransportFailure {
                url: req.url,
                reason: "connection reset".to_string(),
            })
        });

        let err = extractor(mock)
            .resolve_video_id("https://v.douyin.com/abc/")
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptorError::Resolution(ref msg) if msg.starts_with("no response")));
    }

    #[tokio::test]
    async fn test_plain_success_falls_back_to_share_url() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(|_| {
            Ok(HttpResponse {
                status: 200,
                ..Default::default()
            })
        });

        let id = extractor(mock)
            .resolve_video_id("https://m.example.com/share/7372484719365098803/")
            .await
            .unwrap();
        assert_eq!(id.as_str(), "7372484719365098803");
    }
}
