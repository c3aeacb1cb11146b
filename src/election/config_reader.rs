use std::fs;
use std::path::PathBuf;

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::{ensure, ResultExt};

use crate::election::*;

pub const DEFAULT_STORE_DIRECTORY: &str = "./elections";

/// The optional configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct LunchConfig {
    #[serde(rename = "storeDirectory")]
    pub store_directory: Option<String>,
    #[serde(rename = "votingWindowMinutes")]
    pub voting_window_minutes: Option<u32>,
}

pub fn read_config(path: &str) -> ElectionResult<LunchConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: LunchConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// The settings in effect, after applying the defaults and the command line.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub store_directory: PathBuf,
    pub voting_window_ms: i64,
}

impl Settings {
    pub fn resolve(config: &LunchConfig, store_flag: Option<&str>) -> ElectionResult<Settings> {
        let voting_window_ms = match config.voting_window_minutes {
            Some(m) => {
                ensure!(
                    m > 0,
                    InvalidElectionSnafu {
                        reason: "votingWindowMinutes must be positive"
                    }
                );
                i64::from(m) * 60 * 1000
            }
            None => DEFAULT_VOTING_WINDOW_MS,
        };
        let store_directory = store_flag
            .map(|s| s.to_string())
            .or_else(|| config.store_directory.clone())
            .unwrap_or_else(|| DEFAULT_STORE_DIRECTORY.to_string());
        Ok(Settings {
            store_directory: PathBuf::from(store_directory),
            voting_window_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::resolve(&LunchConfig::default(), None).unwrap();
        assert_eq!(s.store_directory, PathBuf::from("./elections"));
        assert_eq!(s.voting_window_ms, 600_000);
    }

    #[test]
    fn flag_overrides_the_file() {
        let config: LunchConfig =
            serde_json::from_str(r#"{"storeDirectory": "/data", "votingWindowMinutes": 30}"#)
                .unwrap();
        let s = Settings::resolve(&config, None).unwrap();
        assert_eq!(s.store_directory, PathBuf::from("/data"));
        assert_eq!(s.voting_window_ms, 30 * 60 * 1000);
        let s = Settings::resolve(&config, Some("/tmp/x")).unwrap();
        assert_eq!(s.store_directory, PathBuf::from("/tmp/x"));
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = LunchConfig {
            store_directory: None,
            voting_window_minutes: Some(0),
        };
        assert!(Settings::resolve(&config, None).is_err());
    }
}
