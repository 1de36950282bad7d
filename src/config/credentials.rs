/// Environment variable consulted before the config file
pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

/// Source of the recognition service API key, consulted once per item
pub trait CredentialStore: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// Reads `DASHSCOPE_API_KEY`, falling back to the key from the config file
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    configured_key: Option<String>,
}

impl EnvCredentials {
    pub fn new(configured_key: Option<String>) -> Self {
        Self { configured_key }
    }
}

impl CredentialStore for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.configured_key.clone())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

/// Fixed key, useful for embedding and tests
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub Option<String>);

impl CredentialStore for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.0.clone().filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_credentials_treat_blank_as_missing() {
        assert_eq!(StaticCredentials(Some("  ".to_string())).api_key(), None);
        assert_eq!(StaticCredentials(None).api_key(), None);
        assert_eq!(
            StaticCredentials(Some("sk-1".to_string())).api_key().as_deref(),
            Some("sk-1")
        );
    }
}
