// SPDX-License-Identifier: Apache-2.0

use crate::classifier::LogisticModel;
use std::path::PathBuf;

/// Where classifier artifacts come from: a local directory first, then an
/// optional remote base URL as fallback.
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub artifacts_dir: PathBuf,
    pub remote_base_url: Option<String>,
    pub model_file: String,
    pub threshold_file: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
            remote_base_url: None,
            model_file: "turnover_classifier.json".to_string(),
            threshold_file: "threshold.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactError(pub String);

impl std::fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "artifact error: {}", self.0)
    }
}

impl std::error::Error for ArtifactError {}

/// Reads one artifact file, preferring the local directory.
async fn fetch_artifact(config: &ArtifactConfig, file_name: &str) -> Result<Vec<u8>, ArtifactError> {
    let local = config.artifacts_dir.join(file_name);
    if local.is_file() {
        tracing::debug!(path = %local.display(), "loading artifact from local directory");
        return std::fs::read(&local)
            .map_err(|e| ArtifactError(format!("read {}: {e}", local.display())));
    }
    let base = config.remote_base_url.as_deref().ok_or_else(|| {
        ArtifactError(format!(
            "{} not found in {} and no remote base url configured",
            file_name,
            config.artifacts_dir.display()
        ))
    })?;
    let url = format!("{}/{file_name}", base.trim_end_matches('/'));
    tracing::info!(%url, "downloading artifact");
    let response = reqwest::get(&url)
        .await
        .map_err(|e| ArtifactError(format!("fetch {url}: {e}")))?
        .error_for_status()
        .map_err(|e| ArtifactError(format!("fetch {url}: {e}")))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ArtifactError(format!("fetch {url}: {e}")))?;
    Ok(bytes.to_vec())
}

/// Loads and parses the classifier artifact.
pub async fn load_classifier(config: &ArtifactConfig) -> Result<LogisticModel, ArtifactError> {
    let bytes = fetch_artifact(config, &config.model_file).await?;
    let model: LogisticModel = serde_json::from_slice(&bytes)
        .map_err(|e| ArtifactError(format!("parse {}: {e}", config.model_file)))?;
    tracing::info!(model_version = %model.model_version, "classifier loaded");
    Ok(model)
}

/// Loads the decision threshold from its `{"threshold": x}` artifact.
pub async fn load_threshold(config: &ArtifactConfig) -> Result<f64, ArtifactError> {
    let bytes = fetch_artifact(config, &config.threshold_file).await?;
    let doc: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ArtifactError(format!("parse {}: {e}", config.threshold_file)))?;
    let threshold = doc
        .get("threshold")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| {
            ArtifactError(format!(
                "{} has no numeric \"threshold\" field",
                config.threshold_file
            ))
        })?;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ArtifactError(format!(
            "threshold out of range: {threshold}"
        )));
    }
    Ok(threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config(dir: &std::path::Path) -> ArtifactConfig {
        ArtifactConfig {
            artifacts_dir: dir.to_path_buf(),
            remote_base_url: None,
            ..ArtifactConfig::default()
        }
    }

    #[tokio::test]
    async fn loads_classifier_and_threshold_from_local_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("turnover_classifier.json"),
            r#"{"model_version":"logistic_v1","intercept":0.0,"weights":{},"category_weights":{}}"#,
        )
        .expect("write model");
        std::fs::write(dir.path().join("threshold.json"), r#"{"threshold":0.42}"#)
            .expect("write threshold");

        let config = local_config(dir.path());
        let model = load_classifier(&config).await.expect("model loads");
        assert_eq!(model.model_version, "logistic_v1");
        let threshold = load_threshold(&config).await.expect("threshold loads");
        assert!((threshold - 0.42).abs() < 1e-12);
    }

    #[tokio::test]
    async fn missing_artifact_without_remote_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_threshold(&local_config(dir.path()))
            .await
            .expect_err("nothing to load");
        assert!(err.0.contains("threshold.json"));
    }

    #[tokio::test]
    async fn threshold_outside_unit_interval_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("threshold.json"), r#"{"threshold":1.7}"#)
            .expect("write threshold");
        let err = load_threshold(&local_config(dir.path()))
            .await
            .expect_err("out of range");
        assert!(err.0.contains("out of range"));
    }

    #[tokio::test]
    async fn malformed_threshold_document_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("threshold.json"), r#"{"cutoff":0.5}"#)
            .expect("write threshold");
        let err = load_threshold(&local_config(dir.path()))
            .await
            .expect_err("wrong field name");
        assert!(err.0.contains("threshold"));
    }
}
