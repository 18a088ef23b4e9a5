use crate::error::{ReviewError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const BRIDGE_ENV: &str = "FEMORAL_REVIEW_BRIDGE";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub bridge: BridgeConfig,
    pub downloads: DownloadConfig,
    pub timing: TimingConfig,
}

/// Registry project coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Versioned application path, e.g. `/redcap_v15.5.34`
    pub base_path: String,
    pub project_id: String,
    pub event_id: String,
    pub form_page: String,
    pub demographics_page: String,
    pub procedure_page: String,
    pub dashboard_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_path: "/redcap_v15.5.34".into(),
            project_id: "2423".into(),
            event_id: "26763".into(),
            form_page: "femoral_access_imaging".into(),
            demographics_page: "demographics".into(),
            procedure_page: "procedure".into(),
            dashboard_url:
                "https://redcap.med.yale.edu/redcap_v15.5.34/DataEntry/record_status_dashboard.php?pid=2423"
                    .into(),
        }
    }
}

/// External automation bridge executable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_seconds: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command: "femoral-bridge".into(),
            args: Vec::new(),
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub directory: PathBuf,
    pub artifact_prefix: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: dirs::download_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
                .unwrap_or_else(|| PathBuf::from("Downloads")),
            artifact_prefix: "Nil_downloaded_image_".into(),
        }
    }
}

/// Settle delays and polling bounds, in milliseconds.
///
/// Fixed delays stand in for completion signals the viewer does not expose;
/// they are best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub search_poll_interval_ms: u64,
    pub search_poll_attempts: u32,
    pub expand_settle_ms: u64,
    pub results_settle_ms: u64,
    pub export_panel_settle_ms: u64,
    pub download_settle_ms: u64,
    pub return_settle_ms: u64,
    pub dashboard_settle_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            search_poll_interval_ms: 2500,
            search_poll_attempts: 6,
            expand_settle_ms: 1500,
            results_settle_ms: 3000,
            export_panel_settle_ms: 1500,
            download_settle_ms: 10_000,
            return_settle_ms: 1500,
            dashboard_settle_ms: 3000,
        }
    }
}

impl TimingConfig {
    /// All delays zero; used by tests and dry runs
    pub fn immediate() -> Self {
        Self {
            search_poll_interval_ms: 0,
            search_poll_attempts: 6,
            expand_settle_ms: 0,
            results_settle_ms: 0,
            export_panel_settle_ms: 0,
            download_settle_ms: 0,
            return_settle_ms: 0,
            dashboard_settle_ms: 0,
        }
    }
}

/// Sleep for a configured number of milliseconds (no-op for zero)
pub async fn settle(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        // environment wins over the file
        if let Ok(command) = std::env::var(BRIDGE_ENV) {
            if !command.trim().is_empty() {
                config.bridge.command = command;
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ReviewError::Config("home directory not found".into()))?;
        Ok(home.join(".config").join("femoral-review").join("config.json"))
    }
}

impl RegistryConfig {
    /// Build a registry page path (`DataEntry/index.php?...`) for one record.
    pub fn record_page_path(&self, record_id: &str, page: &str) -> String {
        format!(
            "{}/DataEntry/index.php?pid={}&id={}&page={}&event_id={}&instance=1",
            self.base_path,
            self.project_id,
            urlencoding::encode(record_id),
            page,
            self.event_id
        )
    }

    /// Form submission path (record id travels in the body)
    pub fn form_submit_path(&self) -> String {
        format!(
            "{}/DataEntry/index.php?pid={}&event_id={}&page={}&instance=1",
            self.base_path, self.project_id, self.event_id, self.form_page
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"registry": {"project_id": "99"}}"#).unwrap();
        assert_eq!(config.registry.project_id, "99");
        assert_eq!(config.registry.form_page, "femoral_access_imaging");
        assert_eq!(config.timing.search_poll_attempts, 6);
        assert_eq!(config.bridge.timeout_seconds, 15);
    }

    #[test]
    fn test_record_page_path() {
        let config = Config::default();
        let path = config.registry.record_page_path("100", "procedure");
        assert_eq!(
            path,
            "/redcap_v15.5.34/DataEntry/index.php?pid=2423&id=100&page=procedure&event_id=26763&instance=1"
        );
    }

    #[test]
    fn test_form_submit_path() {
        let config = Config::default();
        assert!(config
            .registry
            .form_submit_path()
            .ends_with("event_id=26763&page=femoral_access_imaging&instance=1"));
    }

    #[test]
    fn test_search_timeout_is_about_fifteen_seconds() {
        let t = TimingConfig::default();
        assert_eq!(t.search_poll_interval_ms * t.search_poll_attempts as u64, 15_000);
    }
}
