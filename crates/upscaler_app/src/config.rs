use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_debug, LogDestination};
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;
use upscaler_core::{ImageRetryPolicy, IntakePolicy, PollPolicy, Settings};
use upscaler_engine::ClientSettings;

pub const DEFAULT_CONFIG_PATH: &str = "./upscaler.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Client configuration, read from a RON file. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub api_base_url: String,
    pub auth_base_url: Option<String>,
    /// Gate uploads on a verified sign-in. Defaults to on when
    /// `auth_base_url` is set.
    pub require_verified_session: Option<bool>,
    pub state_dir: PathBuf,
    pub output_dir: PathBuf,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub image_max_retries: u32,
    pub image_backoff_ms: u64,
    pub max_upload_bytes: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub test_image_url: Option<String>,
    pub log_level: String,
    pub log_destination: String,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            auth_base_url: None,
            require_verified_session: None,
            state_dir: PathBuf::from("./.upscaler"),
            output_dir: PathBuf::from("./output"),
            poll_interval_ms: 2000,
            poll_max_attempts: 30,
            image_max_retries: 3,
            image_backoff_ms: 1000,
            max_upload_bytes: 10 * 1024 * 1024,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            test_image_url: None,
            log_level: "info".to_string(),
            log_destination: "terminal".to_string(),
            log_file: PathBuf::from("./upscaler.log"),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                engine_debug!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        Self::parse(&text).map_err(|message| ConfigError::Parse { path, message })
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        ron::from_str(text).map_err(|err| err.to_string())
    }

    /// Command-line and environment values win over the file.
    pub fn apply_overrides(&mut self, api_base_url: Option<String>, auth_base_url: Option<String>) {
        if let Some(url) = api_base_url {
            self.api_base_url = url;
        }
        if auth_base_url.is_some() {
            self.auth_base_url = auth_base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_http_url("api_base_url", &self.api_base_url)?;
        match &self.auth_base_url {
            Some(url) => check_http_url("auth_base_url", url)?,
            None if self.require_verified_session == Some(true) => {
                return Err(ConfigError::Invalid(
                    "require_verified_session needs auth_base_url".to_string(),
                ));
            }
            None => {}
        }
        if let Some(url) = &self.test_image_url {
            check_http_url("test_image_url", url)?;
        }
        let positive = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("poll_max_attempts", u64::from(self.poll_max_attempts)),
            ("image_max_retries", u64::from(self.image_max_retries)),
            ("max_upload_bytes", self.max_upload_bytes),
            ("request_timeout_ms", self.request_timeout_ms),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be positive")));
        }
        self.level()?;
        self.destination()?;
        Ok(())
    }

    pub fn level(&self) -> Result<LevelFilter, ConfigError> {
        engine_logging::parse_level(&self.log_level)
            .ok_or_else(|| ConfigError::Invalid(format!("unknown log_level {:?}", self.log_level)))
    }

    pub fn destination(&self) -> Result<LogDestination, ConfigError> {
        LogDestination::parse(&self.log_destination).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "unknown log_destination {:?}",
                self.log_destination
            ))
        })
    }

    pub fn settings(&self) -> Settings {
        Settings {
            poll: PollPolicy {
                interval: Duration::from_millis(self.poll_interval_ms),
                max_attempts: self.poll_max_attempts,
            },
            image: ImageRetryPolicy {
                max_retries: self.image_max_retries,
                base_delay: Duration::from_millis(self.image_backoff_ms),
            },
            intake: IntakePolicy {
                max_bytes: self.max_upload_bytes,
            },
            verifier_configured: self.auth_base_url.is_some(),
            require_verified_session: self
                .require_verified_session
                .unwrap_or(self.auth_base_url.is_some()),
            test_image_url: self.test_image_url.clone(),
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_base_url: self.api_base_url.clone(),
            auth_base_url: self.auth_base_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..ClientSettings::default()
        }
    }

    /// Upper bound for one request/response round trip through the engine.
    pub fn round_trip_budget(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms + self.request_timeout_ms)
    }
}

fn check_http_url(name: &str, raw: &str) -> Result<(), ConfigError> {
    let url = url::Url::parse(raw)
        .map_err(|err| ConfigError::Invalid(format!("{name} {raw:?}: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "{name} must use http or https, not {other}"
        ))),
    }
}
