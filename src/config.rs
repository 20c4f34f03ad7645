use serde::{Deserialize, Serialize};

/// Controller configuration. `Default` matches the deployment the UI ships
/// with; embedders can also deserialize this from their own settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub refresh_debounce_ms: u64,
    /// Screens on which background synchronization may run.
    pub allowed_routes: Vec<String>,
    pub notification_duration_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 30,
            refresh_debounce_ms: 100,
            allowed_routes: vec![
                "/".to_string(),
                "/dashboard".to_string(),
                "/settings".to_string(),
            ],
            notification_duration_ms: 5000,
        }
    }
}

impl SyncConfig {
    /// Defaults with the API endpoint taken from `STUDENT_RISK_API_URL`
    /// when set.
    pub fn from_env() -> Self {
        let mut config = SyncConfig::default();
        if let Ok(url) = std::env::var("STUDENT_RISK_API_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_the_sync_screens() {
        let config = SyncConfig::default();
        assert!(config.allowed_routes.contains(&"/dashboard".to_string()));
        assert_eq!(config.refresh_debounce_ms, 100);
        assert_eq!(config.notification_duration_ms, 5000);
    }

    #[test]
    fn deserializes_partial_overrides() {
        let raw = r#"{"base_url":"https://tracker.example/api"}"#;
        let config: SyncConfig = serde_json::from_str(raw).expect("config");
        assert_eq!(config.base_url, "https://tracker.example/api");
        assert_eq!(config.request_timeout_secs, 30);
    }
}
