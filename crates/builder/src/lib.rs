#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]
//! Archive-to-PDF build pipeline for pdfbuild
//!
//! This crate unpacks an uploaded archive into an isolated working
//! directory, picks the directory to build in, runs the external build tool
//! under a deadline and locates the produced document.

mod execute;
mod extract;
mod locate;
mod pipeline;
mod resolve;
mod workdir;

pub use execute::{BuildCommandResult, BuildExecutor};
pub use extract::{extract, extract_archive};
pub use locate::{locate_artifact, ArtifactStrategy};
pub use pipeline::{BuildPipeline, BuildSettings, CompletedBuild, Upload};
pub use resolve::resolve_build_dir;
pub use workdir::WorkDir;
