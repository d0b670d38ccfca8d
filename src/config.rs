use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown savings source {0:?} (expected auto, input or build)")]
    UnknownSavingsSource(String),

    #[error("Build savings source needs build.{0} to be set")]
    MissingBuildSetting(&'static str),
}

/// Top-level configuration loaded from .port-score.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// External tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Where byte savings come from
    #[serde(default)]
    pub savings: SavingsConfig,

    /// Baseline and per-pull-request build settings
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// git executable
    pub git: String,
    /// GitHub CLI executable
    pub gh: String,
    /// Per-invocation timeout. None waits forever.
    pub timeout_secs: Option<u64>,
    /// Check out and pull each repository's target branch before collecting
    pub update_before_run: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            gh: "gh".to_string(),
            timeout_secs: None,
            update_before_run: true,
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavingsSource {
    /// `input` for tables that carry savings, `build` for plain lists
    #[default]
    Auto,
    /// Take "Bytes saved" from the input table
    Input,
    /// Build every pull request and compare against the baseline build
    Build,
}

impl std::str::FromStr for SavingsSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(SavingsSource::Auto),
            "input" => Ok(SavingsSource::Input),
            "build" => Ok(SavingsSource::Build),
            _ => Err(ConfigError::UnknownSavingsSource(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavingsConfig {
    #[serde(default)]
    pub source: SavingsSource,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    /// Historical ref whose build is the size baseline
    pub reference: Option<String>,
    /// Run before every build (e.g. ["make", "clean"])
    #[serde(default)]
    pub clean: Vec<String>,
    /// Builds the library artifact
    #[serde(default)]
    pub command: Vec<String>,
    /// Prints the size report of the artifact
    #[serde(default)]
    pub size: Vec<String>,
    /// Extra environment for clean, build and size commands
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl BuildConfig {
    /// Make sure everything the build savings source relies on is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference.as_deref().map_or(true, |r| r.trim().is_empty()) {
            return Err(ConfigError::MissingBuildSetting("reference"));
        }
        if self.command.is_empty() {
            return Err(ConfigError::MissingBuildSetting("command"));
        }
        if self.size.is_empty() {
            return Err(ConfigError::MissingBuildSetting("size"));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from .port-score.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".port-score.toml");
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// PORT_SCORE_SAVINGS overrides savings.source.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(source) = std::env::var("PORT_SCORE_SAVINGS") {
            self.savings.source = source.parse()?;
        }
        Ok(())
    }
}
