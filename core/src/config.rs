//! Client settings and endpoint selection.
//!
//! # Design
//! The endpoint is never chosen per call: it is a pure function of the
//! [`ExecutionContext`], which is selected once from the `FALA_CONTEXT`
//! environment variable. Settings are layered the usual way: defaults, then
//! an optional `fala.toml`, then the environment.

use std::env::VarError;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

pub const CONTEXT_ENV_VAR: &str = "FALA_CONTEXT";
pub const CONFIG_FILE: &str = "fala.toml";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const LOCAL_ENDPOINT: &str = "http://localhost:5000/convert";
const DEPLOYED_ENDPOINT: &str = "https://portuguese-converter.vercel.app/api/portuguese_converter";

/// Where the client is running, which decides the service endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ExecutionContext {
    Local,
    #[default]
    Deployed,
}

impl ExecutionContext {
    pub fn endpoint(self) -> &'static str {
        match self {
            ExecutionContext::Local => LOCAL_ENDPOINT,
            ExecutionContext::Deployed => DEPLOYED_ENDPOINT,
        }
    }

    /// Read `FALA_CONTEXT`; `None` when unset.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_var(std::env::var(CONTEXT_ENV_VAR))
    }

    /// A set but non-Unicode value is an error, not a fallback to the default.
    fn from_var(value: Result<String, VarError>) -> Result<Option<Self>, ConfigError> {
        match value {
            Ok(raw) => raw.parse().map(Some),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(raw)) => {
                Err(ConfigError::UnknownContext(raw.to_string_lossy().into_owned()))
            }
        }
    }
}

impl FromStr for ExecutionContext {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "dev" | "development" => Ok(ExecutionContext::Local),
            "deployed" | "production" | "prod" => Ok(ExecutionContext::Deployed),
            _ => Err(ConfigError::UnknownContext(s.to_string())),
        }
    }
}

impl TryFrom<String> for ExecutionContext {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Local => f.write_str("local"),
            ExecutionContext::Deployed => f.write_str("deployed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub context: ExecutionContext,
    pub endpoint_override: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            context: ExecutionContext::default(),
            endpoint_override: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    pub fn for_context(context: ExecutionContext) -> Self {
        Self {
            context,
            ..Self::default()
        }
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint_override
            .as_deref()
            .unwrap_or_else(|| self.context.endpoint())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    context: Option<ExecutionContext>,
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

/// Load settings from `fala.toml` in the working directory and `FALA_CONTEXT`.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let context = ExecutionContext::from_env()?;
    load_settings_from(Path::new(CONFIG_FILE), context)
}

/// Layer `path` (if it exists) and an explicit context over the defaults.
pub fn load_settings_from(
    path: &Path,
    context: Option<ExecutionContext>,
) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    if path.exists() {
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let file: FileSettings = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: display.clone(),
            source,
        })?;
        if let Some(ctx) = file.context {
            settings.context = ctx;
        }
        if let Some(endpoint) = file.endpoint {
            settings.endpoint_override = Some(endpoint);
        }
        if let Some(secs) = file.timeout_secs {
            if secs == 0 {
                return Err(ConfigError::ZeroTimeout { path: display });
            }
            settings.timeout_secs = secs;
        }
    }

    if let Some(ctx) = context {
        settings.context = ctx;
    }

    debug!(context = %settings.context, endpoint = settings.endpoint(), "resolved settings");
    Ok(settings)
}
