use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Environment override for `analysis.server_url`.
pub const API_URL_ENV: &str = "ANALYSIS_API_URL";

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults. The
    /// `ANALYSIS_API_URL` environment variable wins over both.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let config = Self::load(path)?;
            info!("✓ Configuration loaded from {}", path.display());
            config
        } else {
            warn!(
                "Config {} not found, using built-in defaults",
                path.display()
            );
            Self::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.analysis.server_url = url;
        }

        Ok(config)
    }
}
