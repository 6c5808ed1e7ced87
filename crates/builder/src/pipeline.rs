//! Upload-to-artifact build pipeline
//!
//! Extractor, resolver, executor and locator run in sequence inside a fresh
//! working directory. Any failure drops the [`WorkDir`] guard, so nothing is
//! left on disk unless a build completes and the caller takes ownership of
//! the directory through [`CompletedBuild`].

use crate::execute::BuildExecutor;
use crate::extract::extract;
use crate::locate::{locate_artifact, ArtifactStrategy};
use crate::resolve::resolve_build_dir;
use crate::workdir::WorkDir;
use pdfbuild_config::Config;
use pdfbuild_errors::{BuildError, Error, UploadError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{fs, task};

const ARCHIVE_EXTENSION: &str = ".zip";

/// Settings for one build pipeline, derived from [`Config`]
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub program: String,
    pub target: String,
    pub descriptor: String,
    pub timeout: Duration,
    pub artifact: ArtifactStrategy,
    pub work_root: PathBuf,
    pub max_upload_bytes: u64,
}

impl From<&Config> for BuildSettings {
    fn from(config: &Config) -> Self {
        let artifact = match &config.build.artifact_path {
            Some(path) => ArtifactStrategy::Fixed(path.clone()),
            None => ArtifactStrategy::NewestWithExtension(config.build.artifact_extension.clone()),
        };

        Self {
            program: config.build.program.clone(),
            target: config.build.target.clone(),
            descriptor: config.build.descriptor.clone(),
            timeout: config.build_timeout(),
            artifact,
            work_root: config.work_root(),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

/// An uploaded archive as received from the caller
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A finished build whose working directory now belongs to the caller
#[derive(Debug, Clone)]
pub struct CompletedBuild {
    pub work_dir: PathBuf,
    pub build_dir: PathBuf,
    pub artifact: PathBuf,
    pub log: String,
}

#[derive(Debug, Clone)]
pub struct BuildPipeline {
    settings: BuildSettings,
    executor: BuildExecutor,
}

impl BuildPipeline {
    #[must_use]
    pub fn new(settings: BuildSettings) -> Self {
        let executor = BuildExecutor::new(settings.program.clone(), settings.timeout);
        Self { settings, executor }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(BuildSettings::from(config))
    }

    #[must_use]
    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Reject uploads that must never reach extraction
    ///
    /// # Errors
    ///
    /// Returns an `UploadError` for an empty file name, a name without the
    /// `.zip` extension, or a size above the configured limit.
    pub fn validate_upload(&self, file_name: &str, size: u64) -> Result<(), Error> {
        if file_name.trim().is_empty() {
            return Err(UploadError::NoFileSelected.into());
        }

        if !file_name.to_ascii_lowercase().ends_with(ARCHIVE_EXTENSION) {
            return Err(UploadError::WrongExtension {
                file_name: file_name.to_string(),
            }
            .into());
        }

        if size > self.settings.max_upload_bytes {
            return Err(UploadError::TooLarge {
                limit: self.settings.max_upload_bytes,
            }
            .into());
        }

        Ok(())
    }

    /// Build the uploaded archive into an artifact
    ///
    /// # Errors
    ///
    /// Returns the first failure of any stage. A nonzero exit of the build
    /// tool becomes `BuildError::Failed` carrying the captured log. The
    /// working directory is removed before the error is returned.
    pub async fn run(&self, upload: Upload) -> Result<CompletedBuild, Error> {
        let size = u64::try_from(upload.bytes.len()).unwrap_or(u64::MAX);
        self.validate_upload(&upload.file_name, size)?;

        let work_dir = WorkDir::create(&self.settings.work_root).await?;
        tracing::info!(
            work_dir = %work_dir.path().display(),
            file_name = %upload.file_name,
            size,
            "build requested"
        );

        let upload_path = work_dir.upload_path();
        fs::write(&upload_path, &upload.bytes)
            .await
            .map_err(|e| Error::io_with_path(&e, &upload_path))?;

        let source_dir = work_dir.source_dir();
        fs::create_dir(&source_dir)
            .await
            .map_err(|e| Error::io_with_path(&e, &source_dir))?;

        let entries = extract(&upload_path, &source_dir).await?;
        tracing::debug!(entries, "archive extracted");

        let build_dir = self.resolve(&source_dir).await?;

        let result = self.executor.run(&build_dir, &self.settings.target).await?;
        if !result.success {
            tracing::warn!(
                work_dir = %work_dir.path().display(),
                exit_code = ?result.exit_code,
                "build tool reported failure"
            );
            return Err(BuildError::Failed {
                exit_code: result.exit_code,
                log: result.log,
            }
            .into());
        }

        let artifact = self.locate(&build_dir).await?;

        let work_dir = work_dir.keep();
        tracing::info!(
            work_dir = %work_dir.display(),
            artifact = %artifact.display(),
            "build completed"
        );

        Ok(CompletedBuild {
            work_dir,
            build_dir,
            artifact,
            log: result.log,
        })
    }

    async fn resolve(&self, source_dir: &Path) -> Result<PathBuf, Error> {
        let source_dir = source_dir.to_path_buf();
        let descriptor = self.settings.descriptor.clone();
        task::spawn_blocking(move || resolve_build_dir(&source_dir, &descriptor))
            .await
            .map_err(|e| Error::internal(format!("resolver task failed: {e}")))?
    }

    async fn locate(&self, build_dir: &Path) -> Result<PathBuf, Error> {
        let build_dir = build_dir.to_path_buf();
        let strategy = self.settings.artifact.clone();
        task::spawn_blocking(move || locate_artifact(&build_dir, &strategy))
            .await
            .map_err(|e| Error::internal(format!("locator task failed: {e}")))?
    }
}
