//! Built-in defaults for the build service
//!
//! These mirror the reference deployment: `make pdf` in the directory holding
//! the shallowest Makefile, a two minute deadline and a 10 MiB upload cap.

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_BUILD_PROGRAM: &str = "make";
pub const DEFAULT_BUILD_TARGET: &str = "pdf";
pub const DEFAULT_DESCRIPTOR: &str = "Makefile";
pub const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "pdf";

pub const DEFAULT_JOB_TTL_SECS: u64 = 600;

/// Prefix for per-request working directories under the work root.
pub const WORK_DIR_PREFIX: &str = "job_";
