//! Configuration management
//!
//! Configuration is loaded from a `config.yml` file, then individual values
//! may be overridden through `EXERCISE_BLOG_*` environment variables.
//! Missing sections and keys are filled with defaults.

use crate::models::MAX_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Theme configuration
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Hosted image service configuration
    #[serde(default)]
    pub images: ImageConfig,
    /// Site behaviour
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/exercise_blog.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Theme configuration
///
/// Templates are embedded in the binary; a theme directory only needs to
/// contain the templates it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Path to the override directory
    #[serde(default = "default_theme_path")]
    pub path: PathBuf,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            path: default_theme_path(),
        }
    }
}

fn default_theme_path() -> PathBuf {
    PathBuf::from("themes/default")
}

/// Hosted image service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Cloud name used in delivery URLs
    #[serde(default = "default_cloud_name")]
    pub cloud_name: String,
    /// Build https URLs
    #[serde(default = "default_secure")]
    pub secure: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            cloud_name: default_cloud_name(),
            secure: default_secure(),
        }
    }
}

fn default_cloud_name() -> String {
    "demo".to_string()
}

fn default_secure() -> bool {
    true
}

/// Site behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name shown in page titles
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Where unauthenticated visitors are sent
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Exercises per page on the home page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            login_url: default_login_url(),
            page_size: default_page_size(),
            session_days: default_session_days(),
        }
    }
}

fn default_site_name() -> String {
    "Exercise Blog".to_string()
}

fn default_login_url() -> String {
    "/accounts/login/".to_string()
}

fn default_page_size() -> u32 {
    6
}

fn default_session_days() -> i64 {
    14
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration. A file
    /// that exists but is not valid YAML is an error.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - EXERCISE_BLOG_SERVER_HOST
    /// - EXERCISE_BLOG_SERVER_PORT
    /// - EXERCISE_BLOG_DATABASE_DRIVER
    /// - EXERCISE_BLOG_DATABASE_URL
    /// - EXERCISE_BLOG_THEME_PATH
    /// - EXERCISE_BLOG_IMAGES_CLOUD_NAME
    /// - EXERCISE_BLOG_IMAGES_SECURE
    /// - EXERCISE_BLOG_SITE_NAME
    /// - EXERCISE_BLOG_SITE_LOGIN_URL
    /// - EXERCISE_BLOG_SITE_PAGE_SIZE
    /// - EXERCISE_BLOG_SITE_SESSION_DAYS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("EXERCISE_BLOG_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("EXERCISE_BLOG_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        if let Ok(driver) = std::env::var("EXERCISE_BLOG_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("EXERCISE_BLOG_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(path) = std::env::var("EXERCISE_BLOG_THEME_PATH") {
            self.theme.path = PathBuf::from(path);
        }

        if let Ok(cloud_name) = std::env::var("EXERCISE_BLOG_IMAGES_CLOUD_NAME") {
            self.images.cloud_name = cloud_name;
        }
        if let Ok(secure) = std::env::var("EXERCISE_BLOG_IMAGES_SECURE") {
            if let Ok(secure) = secure.to_lowercase().parse::<bool>() {
                self.images.secure = secure;
            }
        }

        if let Ok(name) = std::env::var("EXERCISE_BLOG_SITE_NAME") {
            self.site.name = name;
        }
        if let Ok(login_url) = std::env::var("EXERCISE_BLOG_SITE_LOGIN_URL") {
            self.site.login_url = login_url;
        }
        if let Ok(page_size) = std::env::var("EXERCISE_BLOG_SITE_PAGE_SIZE") {
            if let Ok(page_size) = page_size.parse::<u32>() {
                self.site.page_size = page_size;
            }
        }
        if let Ok(days) = std::env::var("EXERCISE_BLOG_SITE_SESSION_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                self.site.session_days = days;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.site.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "site.page_size must be at least 1".to_string(),
            ));
        }
        if self.site.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "site.page_size must be at most {}, got {}",
                MAX_PAGE_SIZE, self.site.page_size
            )));
        }
        if self.site.session_days <= 0 {
            return Err(ConfigError::ValidationError(
                "site.session_days must be positive".to_string(),
            ));
        }
        if !self.site.login_url.starts_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "site.login_url must be a path, got '{}'",
                self.site.login_url
            )));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches the process environment.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
