use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::config::themes::{ThemeRegistry, ThemeSpec};

pub mod themes;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "ThemeFeed";
const APP_NAME: &str = "themefeed";

pub const DATASET_FILE_NAME: &str = "scored_tweets.json";
pub const DEFAULT_AVATAR_URL: &str =
    "https://abs.twimg.com/sticky/default_profile_images/default_profile_normal.png";

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

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load(&self.paths)?;
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load(&self.paths)?;
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub dataset_path: PathBuf,
    pub log_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("THEMEFEED_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("THEMEFEED_DATA").ok().map(PathBuf::from);

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

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let dataset_path = data_root.join(DATASET_FILE_NAME);

        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));
        let log_dir = state_dir.join("logs");

        Ok(Self {
            config_dir,
            config_file,
            data_dir: data_root,
            dataset_path,
            log_dir,
            state_dir,
        })
    }

    /// Lays every path out under one root; used by tests and `--data-dir` style setups.
    pub fn rooted_at(root: &Path) -> Self {
        let config_dir = root.join("config");
        let data_dir = root.join("data");
        let state_dir = root.join("state");
        Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
            dataset_path: data_dir.join(DATASET_FILE_NAME),
            data_dir,
            log_dir: state_dir.join("logs"),
            state_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.config_dir,
            &self.data_dir,
            &self.log_dir,
            &self.state_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub default_theme: String,
    /// Minimum time a load stays in the loading state; 0 commits on the next poll.
    pub load_delay_ms: u64,
    pub tick_rate_ms: u64,
    pub dataset_path: Option<PathBuf>,
    pub display: DisplayOptions,
    pub themes: Vec<ThemeSpec>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_theme: "productivity".to_string(),
            load_delay_ms: 300,
            tick_rate_ms: 250,
            dataset_path: None,
            display: DisplayOptions::default(),
            themes: Vec::new(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self, paths: &ConfigPaths) -> Result<()> {
        if self.dataset_path.is_none() {
            self.dataset_path = Some(paths.dataset_path.clone());
        }
        self.display.normalize();
        let registry = self.theme_registry();
        if !registry.contains(&self.default_theme) {
            let fallback = registry
                .first()
                .map(|theme| theme.id.clone())
                .context("theme registry is empty")?;
            tracing::warn!(
                theme = %self.default_theme,
                fallback = %fallback,
                "unknown default theme in config, falling back"
            );
            self.default_theme = fallback;
        }
        Ok(())
    }

    pub fn theme_registry(&self) -> ThemeRegistry {
        ThemeRegistry::with_extra(&self.themes)
    }

    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(10))
    }

    pub fn dataset_path(&self, paths: &ConfigPaths) -> PathBuf {
        self.dataset_path
            .clone()
            .unwrap_or_else(|| paths.dataset_path.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    pub max_images: usize,
    pub fallback_avatar_url: String,
    pub show_score_reason: bool,
    pub text_preview_lines: u16,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            max_images: 4,
            fallback_avatar_url: DEFAULT_AVATAR_URL.to_string(),
            show_score_reason: true,
            text_preview_lines: 6,
        }
    }
}

impl DisplayOptions {
    fn normalize(&mut self) {
        if self.fallback_avatar_url.trim().is_empty() {
            self.fallback_avatar_url = DEFAULT_AVATAR_URL.to_string();
        }
        if self.max_images > 4 {
            tracing::warn!(max_images = self.max_images, "clamping max_images to 4");
            self.max_images = 4;
        }
    }
}
