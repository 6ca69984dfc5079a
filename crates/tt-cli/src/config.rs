//! # Configuration
//!
//! Optional TOML file, then `TT_BASE_URL` / `TT_API_KEY`, then flags.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_solution_name")]
    pub solution_name: String,
    #[serde(default = "default_follow_interval_seconds")]
    pub follow_interval_seconds: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            solution_name: default_solution_name(),
            follow_interval_seconds: default_follow_interval_seconds(),
        }
    }
}

impl QueryConfig {
    pub fn follow_interval(&self) -> Duration {
        Duration::from_secs(self.follow_interval_seconds)
    }
}

fn default_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_timeout_seconds() -> u64 {
    60
}
fn default_solution_name() -> String {
    tt_core::criteria::DEFAULT_SOLUTION.to_string()
}
fn default_follow_interval_seconds() -> u64 {
    tt_engine::follow::DEFAULT_FOLLOW_INTERVAL.as_secs()
}

impl Config {
    /// Read `path` if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Self::parse(&content).with_context(|| format!("parsing config {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("TT_BASE_URL").filter(|v| !v.is_empty()) {
            self.service.url = url;
        }
        if let Some(token) = var("TT_API_KEY").filter(|v| !v.is_empty()) {
            self.service.token = Some(token);
        }
    }
}
