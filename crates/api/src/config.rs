//! Process configuration, read from environment variables.
//!
//! | variable             | default              |
//! |----------------------|----------------------|
//! | `LITEAIDETECT_BIND`  | `0.0.0.0:8080`       |
//! | `LOG_FORMAT`         | `json`               |
//! | `MODEL_VERSION`      | `cnn-1d-onnx@0.1.0`  |
//! | `SIM_QUEUE_DELAY_MS` | `600-1600`           |
//! | `SIM_RUN_DELAY_MS`   | `1200-3000`          |
//! | `SIM_SEED`           | unset (OS entropy)   |
//! | `MAX_UPLOAD_BYTES`   | `26214400`           |

use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;

use liteaidetect_core::DEFAULT_MODEL_VERSION;
use liteaidetect_infra::SimulatorConfig;
use liteaidetect_observability::LogFormat;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
    pub model_version: String,
    pub simulator: SimulatorConfig,
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            log_format: LogFormat::Json,
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            simulator: SimulatorConfig::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or blank keys take their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bind_addr: parse(&get, "LITEAIDETECT_BIND")?.unwrap_or(defaults.bind_addr),
            log_format: parse(&get, "LOG_FORMAT")?.unwrap_or(defaults.log_format),
            model_version: get("MODEL_VERSION")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.model_version),
            simulator: SimulatorConfig {
                queue_delay: parse(&get, "SIM_QUEUE_DELAY_MS")?
                    .unwrap_or(defaults.simulator.queue_delay),
                run_delay: parse(&get, "SIM_RUN_DELAY_MS")?
                    .unwrap_or(defaults.simulator.run_delay),
                seed: parse(&get, "SIM_SEED")?,
            },
            max_upload_bytes: parse(&get, "MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
        })
    }
}

fn parse<T, G>(get: &G, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                message: e.to_string(),
            })
        })
        .transpose()
}
