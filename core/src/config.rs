/// Configuration management
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_DATA_DIR: &str = ".botchat";
const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the remote chat service (no trailing slash)
    pub api_url: String,

    /// Directory holding the persisted access token
    pub data_dir: PathBuf,

    /// Per-request timeout. Model replies can be slow, so this is generous.
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl Config {
    /// Create config from command line arguments.
    ///
    /// Recognised flags are removed; everything else is returned as the
    /// remaining positional arguments (command and its operands).
    pub fn from_args(args: &[String]) -> Result<(Self, Vec<String>)> {
        let mut api_url: Option<String> = None;
        let mut data_dir: Option<PathBuf> = None;
        let mut timeout_ms: Option<u64> = None;
        let mut rest = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--api-url" => {
                    let url = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--api-url requires a URL argument".to_string())
                    })?;
                    api_url = Some(url.clone());
                    i += 2;
                }
                "--data-dir" => {
                    let path = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--data-dir requires a path argument".to_string())
                    })?;
                    data_dir = Some(PathBuf::from(path));
                    i += 2;
                }
                "--timeout-ms" => {
                    let t = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--timeout-ms requires a number".to_string())
                    })?;
                    timeout_ms = Some(t.parse::<u64>().map_err(|_| {
                        ChatError::Config("--timeout-ms must be a positive number".to_string())
                    })?);
                    i += 2;
                }
                other => {
                    rest.push(other.to_string());
                    i += 1;
                }
            }
        }

        // Env overrides only fill what the flags left unset
        if api_url.is_none() {
            api_url = std::env::var("BOTCHAT_API_URL").ok();
        }
        if data_dir.is_none() {
            data_dir = std::env::var("BOTCHAT_DATA_DIR").ok().map(PathBuf::from);
        }
        if timeout_ms.is_none() {
            timeout_ms = std::env::var("BOTCHAT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok());
        }

        let defaults = Self::default();
        let config = Self {
            api_url: api_url
                .map(|u| normalize_api_url(&u))
                .transpose()?
                .unwrap_or(defaults.api_url),
            data_dir: data_dir.unwrap_or(defaults.data_dir),
            request_timeout: match timeout_ms {
                Some(0) => {
                    return Err(ChatError::Config(
                        "--timeout-ms must be a positive number".to_string(),
                    ))
                }
                Some(ms) => Duration::from_millis(ms),
                None => defaults.request_timeout,
            },
        };

        Ok((config, rest))
    }

    /// Path of the persisted token file
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("token.json")
    }
}

fn normalize_api_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if !url.starts_with("http://") {
        return Err(ChatError::Config(format!(
            "API URL must start with http:// (got {:?})",
            raw
        )));
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_flags_are_consumed() {
        let (config, rest) = Config::from_args(&args(&[
            "--api-url",
            "http://127.0.0.1:8000/",
            "history",
            "--timeout-ms",
            "2500",
            "3",
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://127.0.0.1:8000");
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(rest, args(&["history", "3"]));
    }

    #[test]
    fn test_missing_flag_value() {
        assert!(Config::from_args(&args(&["--data-dir"])).is_err());
        assert!(Config::from_args(&args(&["--timeout-ms", "soon"])).is_err());
        assert!(Config::from_args(&args(&["--timeout-ms", "0"])).is_err());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = Config::from_args(&args(&["--api-url", "ftp://example"])).unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_token_path() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/bc"),
            ..Default::default()
        };
        assert_eq!(config.token_path(), PathBuf::from("/tmp/bc/token.json"));
    }
}
