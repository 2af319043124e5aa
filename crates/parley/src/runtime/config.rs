//! # Environment-Based Configuration
//!
//! Runtime settings are read from environment variables so a deployment can
//! be tuned without a rebuild.
//!
//! ## Environment Variables
//!
//! ### Session Store
//! - `PARLEY_MEMORY_CAPACITY` - Messages kept per session (default: 100)
//! - `PARLEY_HISTORY_LIMIT` - Newest history messages loaded per request (default: all)
//! - `PARLEY_DEFAULT_SESSION` - Session used when a request names none (default: "default")
//!
//! ### Tool Dispatch
//! - `PARLEY_TOOL_TIMEOUT` - Per-handler time limit, humantime format such as `5s` or `250ms`
//! - `PARLEY_MAX_CONCURRENT_TOOLS` - Upper bound on handlers running at once
//!
//! ### Generation
//! - `PARLEY_TEMPERATURE` - Sampling temperature, 0.0-2.0
//! - `PARLEY_MAX_TOKENS` - Completion token limit
//! - `PARLEY_STOP` - Comma-separated stop sequences

use parley_core::{GenerationParams, LoadOptions, SessionId};
use parley_memory::DEFAULT_CAPACITY;
use parley_tools::DispatcherConfig;
use std::env;
use std::fmt::Display;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Validated runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub memory_capacity: NonZeroUsize,
    pub history_limit: Option<usize>,
    pub default_session: SessionId,
    pub tool_timeout: Option<Duration>,
    pub max_concurrent_tools: Option<NonZeroUsize>,
    pub generation: GenerationParams,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_CAPACITY,
            history_limit: None,
            default_session: SessionId::default(),
            tool_timeout: None,
            max_concurrent_tools: None,
            generation: GenerationParams::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load and validate configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable is malformed or out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        RuntimeConfigBuilder::from_env()?.build()
    }

    /// Dispatcher limits derived from this configuration.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            handler_timeout: self.tool_timeout,
            max_concurrency: self.max_concurrent_tools,
        }
    }

    /// History window loaded for every request.
    pub fn history_window(&self) -> LoadOptions {
        LoadOptions {
            limit: self.history_limit,
            offset: 0,
        }
    }
}

/// Builder for [`RuntimeConfig`] with environment variable support
#[derive(Debug, Clone)]
pub struct RuntimeConfigBuilder {
    memory_capacity: usize,
    history_limit: Option<usize>,
    default_session: String,
    tool_timeout: Option<Duration>,
    max_concurrent_tools: Option<usize>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    stop: Vec<String>,
}

impl Default for RuntimeConfigBuilder {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_CAPACITY.get(),
            history_limit: None,
            default_session: SessionId::default().into_string(),
            tool_timeout: None,
            max_concurrent_tools: None,
            temperature: None,
            max_tokens: None,
            stop: Vec::new(),
        }
    }
}

impl RuntimeConfigBuilder {
    /// Create a new builder with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any environment variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map instead of
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::default();

        // Session store
        if let Some(capacity) = parse_var::<usize>(&lookup, "PARLEY_MEMORY_CAPACITY")? {
            builder = builder.memory_capacity(capacity);
        }
        if let Some(limit) = parse_var::<usize>(&lookup, "PARLEY_HISTORY_LIMIT")? {
            builder = builder.history_limit(limit);
        }
        if let Some(session) = lookup("PARLEY_DEFAULT_SESSION") {
            builder = builder.default_session(session);
        }

        // Tool dispatch
        if let Some(timeout) = duration_var(&lookup, "PARLEY_TOOL_TIMEOUT")? {
            builder = builder.tool_timeout(timeout);
        }
        if let Some(limit) = parse_var::<usize>(&lookup, "PARLEY_MAX_CONCURRENT_TOOLS")? {
            builder = builder.max_concurrent_tools(limit);
        }

        // Generation
        if let Some(temperature) = parse_var::<f32>(&lookup, "PARLEY_TEMPERATURE")? {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = parse_var::<u32>(&lookup, "PARLEY_MAX_TOKENS")? {
            builder = builder.max_tokens(max_tokens);
        }
        if let Some(stop) = lookup("PARLEY_STOP") {
            builder = builder.stop(
                stop.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }

        Ok(builder)
    }

    /// Set the per-session message capacity
    #[must_use]
    pub fn memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    /// Load at most this many history messages per request
    #[must_use]
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Set the session used when a request carries no `session_id`
    #[must_use]
    pub fn default_session(mut self, session: impl Into<String>) -> Self {
        self.default_session = session.into();
        self
    }

    /// Set the per-handler timeout
    #[must_use]
    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Cap the number of handlers running at once
    #[must_use]
    pub fn max_concurrent_tools(mut self, limit: usize) -> Self {
        self.max_concurrent_tools = Some(limit);
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    /// Validate configuration and build [`RuntimeConfig`]
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is invalid.
    pub fn build(self) -> Result<RuntimeConfig, ConfigError> {
        let memory_capacity = NonZeroUsize::new(self.memory_capacity).ok_or_else(|| {
            ConfigError::ValidationError("memory_capacity must be greater than 0".to_string())
        })?;

        let max_concurrent_tools = match self.max_concurrent_tools {
            Some(limit) => Some(NonZeroUsize::new(limit).ok_or_else(|| {
                ConfigError::ValidationError(
                    "max_concurrent_tools must be greater than 0".to_string(),
                )
            })?),
            None => None,
        };

        if self.tool_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ValidationError(
                "tool_timeout must be greater than 0".to_string(),
            ));
        }

        if self
            .temperature
            .is_some_and(|t| !(0.0..=2.0).contains(&t))
        {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.max_tokens == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        let default_session = SessionId::new(&self.default_session).map_err(|e| {
            ConfigError::ValidationError(format!("default_session is invalid: {e}"))
        })?;

        Ok(RuntimeConfig {
            memory_capacity,
            history_limit: self.history_limit,
            default_session,
            tool_timeout: self.tool_timeout,
            max_concurrent_tools,
            generation: GenerationParams {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                stop: self.stop,
            },
        })
    }
}

// Environment variable helper functions

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!(
                    "invalid {} value '{val}': {e}",
                    std::any::type_name::<T>()
                ),
            }),
        None => Ok(None),
    }
}

fn duration_var(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<Duration>, ConfigError> {
    match lookup(key) {
        Some(val) => humantime::parse_duration(val.trim())
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid duration '{val}': {e}"),
            }),
        None => Ok(None),
    }
}
