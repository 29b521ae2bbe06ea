use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "FilmTui";
const APP_NAME: &str = "filmtui";

pub const DEFAULT_ENDPOINT: &str = "https://swapi.dev/api/films/";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Reads `config.toml` if there is one; otherwise the defaults. Nothing is
    /// written back.
    pub fn load_or_default(&self) -> Result<AppConfig> {
        if !self.paths.config_file.exists() {
            tracing::debug!(
                path = %self.paths.config_file.display(),
                "no config file, using defaults"
            );
            let mut cfg = AppConfig::default();
            cfg.post_load();
            return Ok(cfg);
        }
        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub state_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("FILMTUI_CONFIG").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_dirs.data_local_dir().join("state"));

        Ok(Self::rooted(config_dir, config_file, state_dir))
    }

    pub fn rooted(config_dir: PathBuf, config_file: PathBuf, state_dir: PathBuf) -> Self {
        let log_dir = state_dir.join("logs");
        Self {
            config_dir,
            config_file,
            state_dir,
            log_dir,
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("filmtui.log")
    }

    pub fn ensure_log_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.log_dir)
            .with_context(|| format!("creating log directory {}", self.log_dir.display()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetch: FetchOptions,
    pub ui: UiOptions,
}

impl AppConfig {
    fn post_load(&mut self) {
        if self.fetch.endpoint.trim().is_empty() {
            tracing::warn!("empty films endpoint in config, falling back to {DEFAULT_ENDPOINT}");
            self.fetch.endpoint = DEFAULT_ENDPOINT.to_string();
        }
        if self.ui.tick_rate_ms == 0 {
            tracing::warn!("tick_rate_ms must be positive, using default");
            self.ui.tick_rate_ms = UiOptions::default().tick_rate_ms;
        }
    }

    pub fn override_endpoint(&mut self, endpoint: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.fetch.endpoint = endpoint;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchOptions {
    pub endpoint: String,
    pub fetch_on_start: bool,
    /// Seconds before a request is abandoned (0 = wait indefinitely)
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            fetch_on_start: true,
            timeout_secs: 0,
            user_agent: format!("filmtui/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub tick_rate_ms: u64,
    pub show_opening_text: bool,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            tick_rate_ms: 250,
            show_opening_text: true,
        }
    }
}

impl UiOptions {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }
}
