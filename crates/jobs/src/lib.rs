#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! In-memory job store for completed builds
//!
//! A job links an opaque identifier to the artifact of a finished build. The
//! store owns each job's working directory from creation until the job is
//! swept or purged, at which point the directory is deleted from disk.

mod job;
mod store;

pub use job::{Job, JobId};
pub use store::JobStore;
