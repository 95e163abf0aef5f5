use anyhow::Context;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    /// Field overrides applied to every track, before command-line ones
    #[serde(default)]
    pub overrides: BTreeMap<String, Vec<String>>,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            scan: ScanConfig::default(),
            batch: BatchConfig::default(),
            overrides: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config TOML")
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    #[serde(default = "default_track_extensions")]
    pub track_extensions: Vec<String>,
    #[serde(default = "default_cover_extensions")]
    pub cover_extensions: Vec<String>,
}

fn default_track_extensions() -> Vec<String> {
    vec!["mp3".to_string()]
}

fn default_cover_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "png".to_string()]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            track_extensions: default_track_extensions(),
            cover_extensions: default_cover_extensions(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of tracks processed at the same time
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

fn default_jobs() -> usize {
    1
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_toml() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[scan]
track_extensions = ["mp3", "MP3"]
cover_extensions = ["jpg", "jpeg", "png"]

[batch]
jobs = 4

[overrides]
artist = ["A", "B"]
year = ["1999"]
"#;

        let cfg: Config = toml::from_str(toml_str)?;

        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.scan.track_extensions, vec!["mp3", "MP3"]);
        assert_eq!(cfg.scan.cover_extensions.len(), 3);
        assert_eq!(cfg.batch.jobs, 4);
        assert_eq!(cfg.overrides["artist"], vec!["A", "B"]);
        assert_eq!(cfg.overrides["year"], vec!["1999"]);

        Ok(())
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() -> anyhow::Result<()> {
        let cfg: Config = toml::from_str("")?;

        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.scan, ScanConfig::default());
        assert_eq!(cfg.batch.jobs, 1);
        assert!(cfg.overrides.is_empty());

        Ok(())
    }

    #[test]
    fn test_load_reports_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = Config::load(&tmp.path().join("config.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
