#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for pdfbuild
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (passed with `--config`)
//! - Environment variables
//! - CLI flags

pub mod constants;

use constants::{
    DEFAULT_ARTIFACT_EXTENSION, DEFAULT_BUILD_PROGRAM, DEFAULT_BUILD_TARGET,
    DEFAULT_BUILD_TIMEOUT_SECS, DEFAULT_DESCRIPTOR, DEFAULT_HOST, DEFAULT_JOB_TTL_SECS,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PORT,
};
use pdfbuild_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub jobs: JobsConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

/// External build tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_descriptor")]
    pub descriptor: String,
    #[serde(default = "default_build_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_artifact_extension")]
    pub artifact_extension: String,
    /// Fixed output path relative to the build directory. When unset the
    /// newest file with `artifact_extension` is served instead.
    #[serde(default)]
    pub artifact_path: Option<PathBuf>,
}

/// Job retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_job_ttl")]
    pub ttl: u64, // seconds
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub work_root: Option<PathBuf>,
}

// Default implementations

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_BUILD_PROGRAM.to_string(),
            target: DEFAULT_BUILD_TARGET.to_string(),
            descriptor: DEFAULT_DESCRIPTOR.to_string(),
            timeout: DEFAULT_BUILD_TIMEOUT_SECS,
            artifact_extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
            artifact_path: None,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_JOB_TTL_SECS,
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_program() -> String {
    DEFAULT_BUILD_PROGRAM.to_string()
}

fn default_target() -> String {
    DEFAULT_BUILD_TARGET.to_string()
}

fn default_descriptor() -> String {
    DEFAULT_DESCRIPTOR.to_string()
}

fn default_build_timeout() -> u64 {
    DEFAULT_BUILD_TIMEOUT_SECS
}

fn default_artifact_extension() -> String {
    DEFAULT_ARTIFACT_EXTENSION.to_string()
}

fn default_job_ttl() -> u64 {
    DEFAULT_JOB_TTL_SECS
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration from an optional path or use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Ok(Self::default()),
        }
    }

    /// Merge with environment variables
    ///
    /// `PORT` is honoured unprefixed so the service works under platforms
    /// that inject it.
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Some(port) = env_parse("PORT")? {
            self.server.port = port;
        }

        if let Ok(host) = std::env::var("PDFBUILD_HOST") {
            self.server.host = host;
        }

        if let Some(limit) = env_parse("PDFBUILD_MAX_UPLOAD_BYTES")? {
            self.server.max_upload_bytes = limit;
        }

        if let Ok(program) = std::env::var("PDFBUILD_BUILD_PROGRAM") {
            self.build.program = program;
        }

        if let Ok(target) = std::env::var("PDFBUILD_BUILD_TARGET") {
            self.build.target = target;
        }

        if let Some(timeout) = env_parse("PDFBUILD_BUILD_TIMEOUT")? {
            self.build.timeout = timeout;
        }

        if let Ok(artifact) = std::env::var("PDFBUILD_ARTIFACT_PATH") {
            self.build.artifact_path = Some(PathBuf::from(artifact));
        }

        if let Some(ttl) = env_parse("PDFBUILD_JOB_TTL")? {
            self.jobs.ttl = ttl;
        }

        if let Ok(root) = std::env::var("PDFBUILD_WORK_ROOT") {
            self.paths.work_root = Some(PathBuf::from(root));
        }

        Ok(())
    }

    /// Check values that deserialize fine but cannot work at runtime
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        let zero = |field: &str| -> Error {
            ConfigError::InvalidValue {
                field: field.to_string(),
                value: "0".to_string(),
            }
            .into()
        };

        if self.server.max_upload_bytes == 0 {
            return Err(zero("server.max_upload_bytes"));
        }
        if self.build.timeout == 0 {
            return Err(zero("build.timeout"));
        }
        if self.jobs.ttl == 0 {
            return Err(zero("jobs.ttl"));
        }

        for (field, value) in [
            ("build.program", &self.build.program),
            ("build.target", &self.build.target),
            ("build.descriptor", &self.build.descriptor),
            ("build.artifact_extension", &self.build.artifact_extension),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    message: format!("{field} must not be empty"),
                }
                .into());
            }
        }

        if let Some(artifact) = &self.build.artifact_path {
            if artifact.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    field: "build.artifact_path".to_string(),
                    value: artifact.display().to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Address the HTTP listener binds to
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Deadline for a single build invocation
    #[must_use]
    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build.timeout)
    }

    /// How long a finished job stays redeemable
    #[must_use]
    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.jobs.ttl)
    }

    /// Directory under which per-request working directories are created
    #[must_use]
    pub fn work_root(&self) -> PathBuf {
        self.paths
            .work_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

fn env_parse<T: FromStr>(var: &str) -> Result<Option<T>, Error> {
    match std::env::var(var) {
        Ok(value) => value.parse().map(Some).map_err(|_| {
            ConfigError::InvalidValue {
                field: var.to_string(),
                value,
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}
