use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use core_types::UiLanguage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_AVATAR_BUCKET: &str = "knowledge-files";

pub const ENV_BACKEND_URL: &str = "AGENT_STUDIO_BACKEND_URL";
pub const ENV_PLATFORM_URL: &str = "AGENT_STUDIO_PLATFORM_URL";
pub const ENV_PLATFORM_ANON_KEY: &str = "AGENT_STUDIO_PLATFORM_ANON_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_avatar_bucket")]
    pub avatar_bucket: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            avatar_bucket: default_avatar_bucket(),
        }
    }
}

impl PlatformConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }
}

fn default_avatar_bucket() -> String {
    DEFAULT_AVATAR_BUCKET.to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}

const fn default_heartbeat_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Move items whose extraction failed to `error` instead of leaving them
    /// in `processing`.
    #[serde(default)]
    pub mark_failed_items: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub schema_version: u32,
    #[serde(default)]
    pub language: UiLanguage,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            language: UiLanguage::EnUs,
            backend: BackendConfig::default(),
            platform: PlatformConfig::default(),
            realtime: RealtimeConfig::default(),
            ingestion: IngestionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Applies `AGENT_STUDIO_*` overrides. Blank values are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        if let Some(url) = read(ENV_BACKEND_URL) {
            debug!(url = %url, "backend url overridden from environment");
            self.backend.url = url;
        }
        if let Some(url) = read(ENV_PLATFORM_URL) {
            self.platform.url = url;
        }
        if let Some(key) = read(ENV_PLATFORM_ANON_KEY) {
            self.platform.anon_key = key;
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join("config.json"),
        }
    }

    pub fn from_default_location() -> Result<Self> {
        let mut dir = dirs::config_dir().context("failed to resolve config_dir")?;
        dir.push("agent-studio");
        Ok(Self::from_dir(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        if !self.path.exists() {
            let config = AppConfig::default();
            self.save(&config)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let mut config: AppConfig =
            serde_json::from_str(&raw).context("failed to parse app config json")?;
        if self.migrate(&mut config) {
            self.save(&config)?;
        }
        Ok(config)
    }

    /// Loads the file, then layers environment overrides on top without
    /// writing them back.
    pub fn load_with_env(&self) -> Result<AppConfig> {
        let mut config = self.load_or_init()?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let text = serde_json::to_string_pretty(config).context("failed to serialize config")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    fn migrate(&self, config: &mut AppConfig) -> bool {
        if config.schema_version >= CURRENT_SCHEMA_VERSION {
            return false;
        }

        warn!(
            from = config.schema_version,
            to = CURRENT_SCHEMA_VERSION,
            "migrating app config schema"
        );

        if config.backend.url.trim().is_empty() {
            config.backend = BackendConfig::default();
        }
        if config.platform.avatar_bucket.trim().is_empty() {
            config.platform.avatar_bucket = default_avatar_bucket();
        }
        config.schema_version = CURRENT_SCHEMA_VERSION;
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn creates_default_config_when_missing() {
        let dir = tempdir().expect("tempdir");
        let store = ConfigStore::from_dir(dir.path());
        let config = store.load_or_init().expect("load default");
        assert_eq!(config.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(config.backend.url, DEFAULT_BACKEND_URL);
        assert_eq!(config.platform.avatar_bucket, DEFAULT_AVATAR_BUCKET);
        assert!(!config.ingestion.mark_failed_items);
        assert!(store.path().exists());
    }

    #[test]
    fn migrates_old_schema_and_fills_defaults() {
        let dir = tempdir().expect("tempdir");
        let store = ConfigStore::from_dir(dir.path());
        fs::write(
            store.path(),
            r#"{"schema_version": 1, "backend": {"url": ""}, "platform": {"url": "https://demo.supabase.co", "anon_key": "anon"}}"#,
        )
        .expect("write old config");

        let config = store.load_or_init().expect("load");
        assert_eq!(config.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(config.backend.url, DEFAULT_BACKEND_URL);
        assert!(config.platform.is_configured());
        assert!(config.realtime.enabled);
        assert_eq!(config.realtime.heartbeat_secs, 30);

        let reread = fs::read_to_string(store.path()).expect("reread");
        assert!(reread.contains("\"schema_version\": 2"));
    }

    #[test]
    fn env_overrides_skip_blank_values() {
        let vars = HashMap::from([
            (ENV_BACKEND_URL, "http://extract.internal:9000"),
            (ENV_PLATFORM_URL, "   "),
            (ENV_PLATFORM_ANON_KEY, "public-anon"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.backend.url, "http://extract.internal:9000");
        assert_eq!(config.platform.url, "");
        assert_eq!(config.platform.anon_key, "public-anon");
    }
}
