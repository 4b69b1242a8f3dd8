use anyhow::{Context, bail};
use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::{
    play::{DEFAULT_PLAY_THRESHOLD_SECS, PlayPolicy},
    royalty::{DEFAULT_REVENUE_PER_PLAY, RoyaltyCalculator, ShareBasis},
};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: u32,
    pub database: Database,
    #[serde(default)]
    pub royalty: RoyaltyConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub public_endpoint: PublicEndpoint,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.to_string_lossy()))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Config> {
        let cfg: Config = toml::from_str(contents).with_context(|| "Failed to parse config TOML")?;
        if cfg.version != CONFIG_VERSION {
            bail!(
                "unsupported config version {}, expected {CONFIG_VERSION}",
                cfg.version
            );
        }
        Ok(cfg)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub in_memory: bool,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RoyaltyConfig {
    /// dollars earned by one counted play
    pub revenue_per_play: f64,
    pub share_basis: ShareBasis,
}

impl Default for RoyaltyConfig {
    fn default() -> Self {
        Self {
            revenue_per_play: DEFAULT_REVENUE_PER_PLAY,
            share_basis: ShareBasis::Current,
        }
    }
}

impl RoyaltyConfig {
    pub fn calculator(&self) -> RoyaltyCalculator {
        RoyaltyCalculator {
            revenue_per_play: self.revenue_per_play,
            share_basis: self.share_basis,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PlaybackConfig {
    pub threshold_secs: u32,
    pub count_completion_after_threshold: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            threshold_secs: DEFAULT_PLAY_THRESHOLD_SECS,
            count_completion_after_threshold: false,
        }
    }
}

impl PlaybackConfig {
    pub fn policy(&self) -> PlayPolicy {
        PlayPolicy {
            threshold: Duration::seconds(i64::from(self.threshold_secs)),
            count_completion_after_threshold: self.count_completion_after_threshold,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PublicEndpoint {
    pub base_url: String,
}

impl Default for PublicEndpoint {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_config_toml() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[database]
in_memory = true

[royalty]
revenue_per_play = 0.02
share_basis = "at_investment"

[playback]
threshold_secs = 45
count_completion_after_threshold = true

[http]
bind_addr = "127.0.0.1"
port = 8080

[public_endpoint]
base_url = "http://tunecent.local:8080"
"#;

        let cfg = Config::parse(toml_str)?;

        assert_eq!(cfg.version, 1);
        assert!(cfg.database.in_memory);
        assert_eq!(cfg.royalty.revenue_per_play, 0.02);
        assert_eq!(cfg.royalty.share_basis, ShareBasis::AtInvestment);

        let policy = cfg.playback.policy();
        assert_eq!(policy.threshold, Duration::seconds(45));
        assert!(policy.count_completion_after_threshold);
        assert_eq!(cfg.public_endpoint.base_url, "http://tunecent.local:8080");

        Ok(())
    }

    #[test]
    fn test_optional_sections_default() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[database]
in_memory = false
path = "/tmp/tunecent.db"

[http]
bind_addr = "127.0.0.1"
port = 8080
"#;

        let cfg = Config::parse(toml_str)?;

        assert!(!cfg.database.in_memory);
        assert_eq!(cfg.database.path, Some(PathBuf::from("/tmp/tunecent.db")));
        assert_eq!(cfg.royalty.revenue_per_play, DEFAULT_REVENUE_PER_PLAY);
        assert_eq!(cfg.royalty.share_basis, ShareBasis::Current);
        assert_eq!(cfg.playback.threshold_secs, 30);
        assert!(!cfg.playback.count_completion_after_threshold);

        Ok(())
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() -> anyhow::Result<()> {
        let toml_str = r#"
version = 1

[database]
in_memory = true

[royalty]
share_basis = "current"

[http]
bind_addr = "0.0.0.0"
port = 9000
"#;

        let cfg = Config::parse(toml_str)?;
        assert_eq!(cfg.royalty.revenue_per_play, DEFAULT_REVENUE_PER_PLAY);
        assert_eq!(cfg.http.port, 9000);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Config::load(Path::new("/definitely/not/here.toml")).is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let toml_str = r#"
version = 2

[database]
in_memory = true

[http]
bind_addr = "127.0.0.1"
port = 8080
"#;

        let err = Config::parse(toml_str).unwrap_err();
        assert!(err.to_string().contains("unsupported config version 2"));
    }

    #[test]
    fn test_load_from_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "version = 1\n[database]\nin_memory = true\n[http]\nbind_addr = \"127.0.0.1\"\nport = 8080\n",
        )?;

        let cfg = Config::load(&path)?;
        assert!(cfg.database.in_memory);
        Ok(())
    }
}
