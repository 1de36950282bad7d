use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> anyhow::Result<String> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

/// Pull the first http(s) URL token out of free-form share text
pub fn extract_first_url(text: &str) -> Option<&str> {
    static URL_TOKEN: OnceLock<Regex> = OnceLock::new();
    let re = URL_TOKEN.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("valid regex"));

    re.find(text).map(|m| m.as_str())
}

/// Format a millisecond duration in human-readable format
pub fn format_duration(milliseconds: u64) -> String {
    let total_seconds = milliseconds / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Replace characters that are illegal in file names with underscores
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect()
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30_000), "30s");
        assert_eq!(format_duration(90_500), "1m 30s");
        assert_eq!(format_duration(3_661_000), "1h 1m 1s");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b:c*d"), "a_b_c_d");
        assert_eq!(sanitize_filename(r#"x\y?"z"<w>|"#), "x_y__z__w__");
        assert_eq!(sanitize_filename("今天 天气不错 #日常"), "今天 天气不错 #日常");
    }

    #[test]
    fn test_extract_first_url() {
        let share = "7.43 复制打开抖音，看看【作品】 https://v.douyin.com/iRNBho6u/ a@b.cn 02/10 XyZ:/";
        assert_eq!(extract_first_url(share), Some("https://v.douyin.com/iRNBho6u/"));
        assert_eq!(extract_first_url("no link here"), None);
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(extract_domain("https://www.douyin.com/video/7372484719365098803"), Some("douyin.com".to_string()));
        assert_eq!(extract_domain("https://v.douyin.com/iRNBho6u/"), Some("v.douyin.com".to_string()));
        assert_eq!(extract_domain("invalid-url"), None);
    }

    #[test]
    fn test_validate_and_normalize_url() {
        assert_ok!(validate_and_normalize_url("https://example.com"));
        assert_ok!(validate_and_normalize_url("http://example.com"));
        assert_err!(validate_and_normalize_url("ftp://example.com"));
        assert_err!(validate_and_normalize_url("not-a-url"));
    }
}
