use chrono::FixedOffset;
use std::env;
use thiserror::Error;

const DEFAULT_API_URL: &str = "https://api.telegram.org/";

/// Hong Kong time.
const DEFAULT_DISPLAY_OFFSET: &str = "8";

// One long poll plus a handful of replies in flight.
const DEFAULT_NUM_THREADS: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TELEGRAM_API_KEY is not set")]
    MissingApiKey,

    #[error("Invalid DISPLAY_UTC_OFFSET `{0}`, expected hours like `8`, `-5` or `+5:30`")]
    DisplayOffset(String),

    #[error("Error parsing RAYON_NUM_THREADS")]
    NumThreads(#[source] std::num::ParseIntError),
}

/// Settings read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    api_key: Option<String>,
    pub api_url: String,
    pub display_offset: FixedOffset,
    pub num_threads: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Read settings through `var`, which returns the value of the named variable when it is set.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = var("TELEGRAM_API_KEY").filter(|key| !key.is_empty());
        let api_url = var("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let display_offset = parse_offset(
            &var("DISPLAY_UTC_OFFSET").unwrap_or_else(|| DEFAULT_DISPLAY_OFFSET.to_string()),
        )?;
        let num_threads = var("RAYON_NUM_THREADS")
            .map_or(Ok(DEFAULT_NUM_THREADS), |threads| threads.parse())
            .map_err(ConfigError::NumThreads)?;

        Ok(Self {
            api_key,
            api_url,
            display_offset,
            num_threads,
        })
    }

    /// The bot token. Only the bot modes need it.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)
    }
}

/// Parse `[+-]H[:MM]`.
fn parse_offset(offset: &str) -> Result<FixedOffset, ConfigError> {
    let err = || ConfigError::DisplayOffset(offset.to_string());
    let trimmed = offset.trim();
    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(unsigned) => (-1, unsigned),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (hours, minutes) = unsigned.split_once(':').unwrap_or((unsigned, "0"));

    let hours: i32 = hours.parse().map_err(|_| err())?;
    let minutes: i32 = minutes.parse().map_err(|_| err())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(err());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
        assert_eq!(config.api_url, "https://api.telegram.org/");
        assert_eq!(config.display_offset.local_minus_utc(), 8 * 3600);
        assert_eq!(config.num_threads, 8);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("TELEGRAM_API_KEY", "123456:ABC-DEF"),
            ("TELEGRAM_API_URL", "http://localhost:8081/"),
            ("DISPLAY_UTC_OFFSET", "-3:30"),
            ("RAYON_NUM_THREADS", "2"),
        ])
        .unwrap();

        assert_eq!(config.api_key().unwrap(), "123456:ABC-DEF");
        assert_eq!(config.api_url, "http://localhost:8081/");
        assert_eq!(config.display_offset.local_minus_utc(), -(3 * 3600 + 30 * 60));
        assert_eq!(config.num_threads, 2);
    }

    #[test]
    fn test_empty_api_key() {
        let config = config(&[("TELEGRAM_API_KEY", "")]).unwrap();

        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_parse_offset() {
        for (input, seconds) in [
            ("0", 0),
            ("8", 8 * 3600),
            ("+8", 8 * 3600),
            (" -5 ", -5 * 3600),
            ("+5:30", 5 * 3600 + 30 * 60),
            ("-0:45", -45 * 60),
        ] {
            assert_eq!(parse_offset(input).unwrap().local_minus_utc(), seconds, "{input}");
        }

        for input in ["", "eight", "8:60", "--8", "+-8", "24", "100000000", "1:2:3"] {
            assert!(
                matches!(parse_offset(input), Err(ConfigError::DisplayOffset(_))),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn test_invalid_vars() {
        assert!(matches!(
            config(&[("DISPLAY_UTC_OFFSET", "HKT")]),
            Err(ConfigError::DisplayOffset(offset)) if offset == "HKT"
        ));
        assert!(matches!(
            config(&[("RAYON_NUM_THREADS", "lots")]),
            Err(ConfigError::NumThreads(_))
        ));
    }
}
