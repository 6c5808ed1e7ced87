#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! HTTP surface of the pdfbuild service
//!
//! Uploads are handed to the build pipeline; successful builds become jobs
//! whose artifacts can be downloaded until they expire. Expired jobs are
//! swept at the start of every request.

mod handlers;
mod pages;
pub mod response;
pub mod server;

pub use response::HttpError;
pub use server::{router, serve, AppState};
