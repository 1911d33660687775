//! Adapter for the external binary special-request classifier.
//!
//! The service scores the email body against two competing labels; the
//! predicted class is whichever scores higher and that score is reported as
//! the confidence. No thresholding beyond the comparison.

use std::future::Future;

use serde::Deserialize;

use crate::error::PipelineError;
use crate::types::ClassificationResult;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

pub trait SpecialRequestClassifier {
    fn classify(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<ClassificationResult, PipelineError>> + Send;
}

#[derive(Clone)]
pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    special_label: String,
}

impl HttpClassifier {
    pub fn new(
        http: reqwest::Client,
        endpoint: String,
        api_token: Option<String>,
        special_label: String,
    ) -> Self {
        Self {
            http,
            endpoint,
            api_token,
            special_label,
        }
    }
}

impl SpecialRequestClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, PipelineError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| super::order_parser::upstream("classifier", &err))?;

        if !response.status().is_success() {
            return Err(PipelineError::Upstream {
                service: "classifier",
                reason: format!("unexpected status {}", response.status()),
            });
        }

        // Response shape: [[{label, score}, {label, score}]]
        let batches = response
            .json::<Vec<Vec<LabelScore>>>()
            .await
            .map_err(|err| super::order_parser::upstream("classifier", &err))?;

        let scores = batches.first().map(Vec::as_slice).unwrap_or_default();
        decide(scores, &self.special_label).ok_or(PipelineError::Upstream {
            service: "classifier",
            reason: "empty label scores in response".to_string(),
        })
    }
}

/// Picks the higher-scoring label; `special_request` is whether that label is
/// the configured special class.
pub fn decide(scores: &[LabelScore], special_label: &str) -> Option<ClassificationResult> {
    let predicted = scores
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))?;
    Some(ClassificationResult {
        special_request: predicted.label.eq_ignore_ascii_case(special_label),
        confidence: predicted.score,
    })
}
