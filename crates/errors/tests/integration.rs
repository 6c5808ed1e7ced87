//! Integration tests for error types

#[cfg(test)]
mod tests {
    use pdfbuild_errors::*;
    use std::time::Duration;

    #[test]
    fn test_error_conversion() {
        let err: Error = ArchiveError::UnsafePath {
            entry: "../evil".into(),
            reason: "parent directory segment".into(),
        }
        .into();
        assert!(matches!(
            err,
            Error::Archive(ArchiveError::UnsafePath { .. })
        ));
        assert_eq!(err.user_code(), Some("archive.unsafe_path"));
    }

    #[test]
    fn test_build_failed_display() {
        let err = BuildError::Failed {
            exit_code: Some(2),
            log: "make: *** [pdf] Error 2".into(),
        };
        assert_eq!(err.to_string(), "build failed with exit code 2");

        let killed = BuildError::Failed {
            exit_code: None,
            log: String::new(),
        };
        assert_eq!(killed.to_string(), "build failed with exit code none");
    }

    #[test]
    fn test_timeout_is_distinct_from_failure() {
        let err: Error = BuildError::Timeout {
            limit: Duration::from_secs(120),
        }
        .into();
        assert_eq!(err.user_code(), Some("build.timeout"));
        assert!(!matches!(err, Error::Build(BuildError::Failed { .. })));
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/tmp/job_x");
        let err = Error::io_with_path(&io_err, "/tmp/job_x");
        assert_eq!(err.user_message(), "internal server error");
        assert_eq!(err.user_code(), Some("error.io"));
    }

    #[test]
    fn test_expired_and_unknown_jobs_look_the_same() {
        let missing = JobError::ArtifactMissing { id: "a".into() };
        let unknown = JobError::NotFound { id: "b".into() };
        assert_eq!(missing.user_message(), unknown.user_message());
    }
}
