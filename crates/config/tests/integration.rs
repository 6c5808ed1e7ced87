//! Integration tests for config

#[cfg(test)]
mod tests {
    use pdfbuild_config::*;
    use std::io::Write;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const ENV_VARS: &[&str] = &[
        "PORT",
        "PDFBUILD_HOST",
        "PDFBUILD_MAX_UPLOAD_BYTES",
        "PDFBUILD_BUILD_PROGRAM",
        "PDFBUILD_BUILD_TARGET",
        "PDFBUILD_BUILD_TIMEOUT",
        "PDFBUILD_ARTIFACT_PATH",
        "PDFBUILD_JOB_TTL",
        "PDFBUILD_WORK_ROOT",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.build.program, "make");
        assert_eq!(config.build.target, "pdf");
        assert_eq!(config.build.descriptor, "Makefile");
        assert_eq!(config.build_timeout(), Duration::from_secs(120));
        assert!(config.build.artifact_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[server]
port = 8080

[build]
target = "all"
timeout = 30
artifact_path = "out/paper.pdf"

[jobs]
ttl = 60
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.build.target, "all");
        assert_eq!(config.build.program, "make");
        assert_eq!(config.build_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.build.artifact_path.as_deref(),
            Some(Path::new("out/paper.pdf"))
        );
        assert_eq!(config.job_ttl(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result =
            Config::load_or_default(Some(Path::new("/nonexistent/pdfbuild.toml"))).await;
        assert!(result.is_err());

        let config = Config::load_or_default(None).await.unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("PORT", "9000");
        std::env::set_var("PDFBUILD_BUILD_TIMEOUT", "5");
        std::env::set_var("PDFBUILD_WORK_ROOT", "/srv/pdfbuild");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.build.timeout, 5);
        assert_eq!(config.work_root(), Path::new("/srv/pdfbuild"));

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("PORT", "not-a-port");

        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let mut config = Config::default();
        config.build.timeout = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.build.descriptor = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.build.artifact_path = Some("/etc/passwd".into());
        assert!(config.validate().is_err());
    }
}
