use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub server: ServerConfig,
}

/// Remote endpoints supplying raw geometry, scores, population and census
/// attributes. Their content is opaque to the core; only the response shape
/// matters.
#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub nation_geometry_url: String,
    pub county_geometry_url: String,
    pub state_scores_url: String,
    pub county_scores_url: String,
    pub population_url: String,
    /// Template with a `{state}` placeholder, e.g.
    /// `http://host/api/state-census/{state}`.
    pub census_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Optional directory of presenter assets to mount at `/static`.
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config_and_defaults_the_timeout() {
        let config: AppConfig = toml::from_str(
            r#"
            [sources]
            nation_geometry_url = "http://localhost/us_states.json"
            county_geometry_url = "http://localhost/us_counties.json"
            state_scores_url = "http://localhost/api/state-scores"
            county_scores_url = "http://localhost/api/county-scores"
            population_url = "http://localhost/population"
            census_url = "http://localhost/api/state-census/{state}"

            [server]
            port = 8000
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.fetch.timeout_secs, 20);
        assert!(config.server.static_dir.is_none());
        assert!(config.sources.census_url.contains("{state}"));
    }
}
