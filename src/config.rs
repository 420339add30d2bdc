//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::catalog::pages::DEFAULT_BASE_URL;
use crate::catalog::selectors::Selectors;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Catalog root every page path is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory receiving the `<page>.csv` files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// What to do when a page fails
    #[serde(default)]
    pub on_error: FailurePolicy,

    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Load-more expansion settings
    #[serde(default)]
    pub expansion: ExpansionConfig,

    /// Site selectors
    #[serde(default)]
    pub selectors: Selectors,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            output_dir: default_output_dir(),
            on_error: FailurePolicy::Abort,
            browser: BrowserConfig::default(),
            expansion: ExpansionConfig::default(),
            selectors: Selectors::default(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("catalog-scraper").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(base_url) = std::env::var("CATALOG_BASE_URL") {
            if !base_url.trim().is_empty() {
                self.base_url = base_url;
            }
        }

        if let Ok(dir) = std::env::var("CATALOG_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output_dir = PathBuf::from(dir);
            }
        }

        if let Ok(path) = std::env::var("CATALOG_CHROME_PATH") {
            if !path.trim().is_empty() {
                self.browser.chrome_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(policy) = std::env::var("CATALOG_ON_ERROR") {
            if let Ok(p) = policy.parse() {
                self.on_error = p;
            }
        }

        self
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Explicit Chromium/Chrome binary; auto-detected when unset
    pub chrome_path: Option<PathBuf>,
    /// Viewport width in pixels
    pub window_width: u32,
    /// Viewport height in pixels
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self { headless: true, chrome_path: None, window_width: 1920, window_height: 1080 }
    }
}

/// Settings for the load-more loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// First wait between checks after a click
    pub poll_initial_ms: u64,
    /// Longest single wait between checks
    pub poll_max_ms: u64,
    /// Random jitter added to each wait
    pub poll_jitter_ms: u64,
    /// How long a click may take to show an effect
    pub settle_timeout_ms: u64,
    /// Upper bound on load-more clicks per page
    pub max_clicks: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            poll_initial_ms: 100,
            poll_max_ms: 1000,
            poll_jitter_ms: 50,
            settle_timeout_ms: 15_000,
            max_clicks: 500,
        }
    }
}

/// How the scrape run reacts to a failing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failing page.
    #[default]
    Abort,
    /// Log the failure, skip the page and carry on.
    Continue,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" | "abort-all" => Ok(FailurePolicy::Abort),
            "continue" | "continue-on-error" => Ok(FailurePolicy::Continue),
            _ => Err(format!("Unknown failure policy: {}. Use: abort, continue", s)),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.on_error, FailurePolicy::Abort);
        assert!(config.browser.headless);
        assert!(config.browser.chrome_path.is_none());
        assert_eq!(config.expansion.max_clicks, 500);
        assert_eq!(config.expansion.settle_timeout_ms, 15_000);
        assert_eq!(config.selectors, Selectors::default());
    }

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!("abort".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert_eq!("ABORT-ALL".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert_eq!("continue".parse::<FailurePolicy>().unwrap(), FailurePolicy::Continue);
        assert_eq!(
            "continue-on-error".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::Continue
        );

        let err = "retry".parse::<FailurePolicy>().unwrap_err();
        assert!(err.contains("Unknown failure policy"));
    }

    #[test]
    fn test_failure_policy_display_and_serde() {
        assert_eq!(FailurePolicy::Abort.to_string(), "abort");
        assert_eq!(FailurePolicy::Continue.to_string(), "continue");

        let json = serde_json::to_string(&FailurePolicy::Continue).unwrap();
        assert_eq!(json, "\"continue\"");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            base_url = "http://localhost:8080/more/"
            output_dir = "out"
            on_error = "continue"

            [browser]
            headless = false

            [expansion]
            settle_timeout_ms = 2000

            [selectors]
            expand = ".load-more"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/more/");
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.on_error, FailurePolicy::Continue);
        assert!(!config.browser.headless);
        assert_eq!(config.browser.window_width, 1920);
        assert_eq!(config.expansion.settle_timeout_ms, 2000);
        assert_eq!(config.expansion.poll_initial_ms, 100);
        assert_eq!(config.selectors.expand, ".load-more");
        assert_eq!(config.selectors.item, ".product-wrapper");
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            output_dir = "/tmp/catalog"
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/catalog"));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_config_from_file_not_found() {
        let result = Config::from_file("/nonexistent/path/config.toml");
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let result = Config::from_file(file.path());
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            on_error = "continue"
            [expansion]
            max_clicks = 3
            "#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.on_error, FailurePolicy::Continue);
        assert_eq!(config.expansion.max_clicks, 3);
    }

    #[test]
    fn test_config_with_env() {
        let orig_base = std::env::var("CATALOG_BASE_URL").ok();
        let orig_dir = std::env::var("CATALOG_OUTPUT_DIR").ok();
        let orig_policy = std::env::var("CATALOG_ON_ERROR").ok();

        std::env::set_var("CATALOG_BASE_URL", "http://mirror.local/more/");
        std::env::set_var("CATALOG_OUTPUT_DIR", "/data/csv");
        std::env::set_var("CATALOG_ON_ERROR", "bogus");

        let config = Config::new().with_env();
        assert_eq!(config.base_url, "http://mirror.local/more/");
        assert_eq!(config.output_dir, PathBuf::from("/data/csv"));
        // Invalid policy is ignored
        assert_eq!(config.on_error, FailurePolicy::Abort);

        for (key, value) in [
            ("CATALOG_BASE_URL", orig_base),
            ("CATALOG_OUTPUT_DIR", orig_dir),
            ("CATALOG_ON_ERROR", orig_policy),
        ] {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.on_error = FailurePolicy::Continue;
        config.browser.chrome_path = Some(PathBuf::from("/usr/bin/chromium"));
        config.selectors.price_prefix = "£".to_string();

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.on_error, config.on_error);
        assert_eq!(parsed.browser.chrome_path, config.browser.chrome_path);
        assert_eq!(parsed.selectors, config.selectors);
        assert_eq!(parsed.expansion, config.expansion);
    }
}
