use serde::Deserialize;
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: General,
    pub provider: Provider,
    #[serde(default)]
    pub poll: Poll,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Provider {
    /// Base URL of the session/bid provider, e.g.
    /// `http://localhost:8081/api/bets`.
    pub base_url: String,
}

/// Refresh cadence for the two polling loops.
#[derive(Debug, Clone, Deserialize)]
pub struct Poll {
    #[serde(default = "default_bids_interval_ms")]
    pub bids_interval_ms: u64,
    #[serde(default = "default_session_interval_ms")]
    pub session_interval_ms: u64,
}

fn default_bids_interval_ms() -> u64 {
    3000
}

fn default_session_interval_ms() -> u64 {
    5000
}

impl Default for Poll {
    fn default() -> Self {
        Self {
            bids_interval_ms: default_bids_interval_ms(),
            session_interval_ms: default_session_interval_ms(),
        }
    }
}

impl Poll {
    pub fn bids_interval(&self) -> Duration {
        Duration::from_millis(self.bids_interval_ms)
    }

    pub fn session_interval(&self) -> Duration {
        Duration::from_millis(self.session_interval_ms)
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_defaults() {
        let poll = Poll::default();
        assert_eq!(poll.bids_interval(), Duration::from_millis(3000));
        assert_eq!(poll.session_interval(), Duration::from_millis(5000));
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [general]
            log_level = "info"

            [provider]
            base_url = "http://localhost:8081/api/bets"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.poll.bids_interval_ms, 3000);
        assert_eq!(config.poll.session_interval_ms, 5000);
    }

    #[test]
    fn test_parse_poll_overrides() {
        let toml = r#"
            [general]
            log_level = "debug"

            [provider]
            base_url = "http://localhost:8081/api/bets"

            [poll]
            bids_interval_ms = 1000
            session_interval_ms = 2000
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.poll.bids_interval(), Duration::from_millis(1000));
        assert_eq!(config.poll.session_interval(), Duration::from_millis(2000));
    }
}
