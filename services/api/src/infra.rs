use metrics_exporter_prometheus::PrometheusHandle;
use scope_advisor::config::AppConfig;
use scope_advisor::error::AppError;
use scope_advisor::ScopeClassifier;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Classifier configured from the layered project files under `project_root`.
pub(crate) fn shared_classifier(config: &AppConfig) -> Result<Arc<ScopeClassifier>, AppError> {
    let project = config.project()?;
    debug!(
        root = %config.project_root.display(),
        sources = ?project.sources(),
        "scope classifier configured"
    );
    Ok(Arc::new(ScopeClassifier::new(project.scope_config()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scope_advisor::config::{AppEnvironment, ServerConfig, TelemetryConfig, CONFIG_DIR};
    use std::fs;
    use std::path::Path;

    fn config_for(root: &Path) -> AppConfig {
        AppConfig {
            environment: AppEnvironment::Test,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
            },
            project_root: root.to_path_buf(),
        }
    }

    #[test]
    fn classifier_picks_up_project_overrides() {
        let root = tempfile::tempdir().expect("temp dir");
        let dir = root.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).expect("config dir created");
        fs::write(
            dir.join("config.yml"),
            "scope_detection:\n  feature_max_score: 20\n  epic_max_score: 50\n",
        )
        .expect("config written");

        let classifier = shared_classifier(&config_for(root.path())).expect("classifier builds");
        assert_eq!(classifier.config().feature_max_score(), 20);
        assert_eq!(classifier.config().epic_max_score(), 50);
    }

    #[test]
    fn inconsistent_bands_fail_startup() {
        let root = tempfile::tempdir().expect("temp dir");
        let dir = root.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).expect("config dir created");
        fs::write(
            dir.join("config.yml"),
            "scope_detection:\n  feature_max_score: 70\n",
        )
        .expect("config written");

        let err = shared_classifier(&config_for(root.path()))
            .map(|_| ())
            .expect_err("feature band above epic band");
        assert!(matches!(err, AppError::Config(_)));
    }
}
