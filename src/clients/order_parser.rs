//! Adapter for the external order-content parsing service.
//!
//! The service is seeded with the manufacturer's catalog product names and
//! returns a JSON object mapping product name to a quantity string, possibly
//! including a reserved `flag` key carrying its own special-request hint.
//! Response key order is preserved; reconciliation depends on encounter
//! order for its first-seen-wins policy.

use std::collections::HashMap;
use std::future::Future;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::PipelineError;
use crate::types::{ParsedOrder, ParsedOrderLine, UNKNOWN_QUANTITY};

/// Reserved response key signalling a parser-side special-request hint.
const FLAG_KEY: &str = "flag";

pub trait OrderParser {
    fn parse_order(
        &self,
        products: &[String],
        text: &str,
    ) -> impl Future<Output = Result<Map<String, Value>, PipelineError>> + Send;
}

#[derive(Clone)]
pub struct HttpOrderParser {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpOrderParser {
    pub fn new(http: reqwest::Client, endpoint: String) -> Self {
        Self { http, endpoint }
    }
}

impl OrderParser for HttpOrderParser {
    async fn parse_order(
        &self,
        products: &[String],
        text: &str,
    ) -> Result<Map<String, Value>, PipelineError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&serde_json::json!({ "products": products, "text": text }))
            .send()
            .await
            .map_err(|err| upstream("order-parser", &err))?;

        if !response.status().is_success() {
            return Err(PipelineError::Upstream {
                service: "order-parser",
                reason: format!("unexpected status {}", response.status()),
            });
        }

        response
            .json::<Map<String, Value>>()
            .await
            .map_err(|err| upstream("order-parser", &err))
    }
}

pub(crate) fn upstream(service: &'static str, err: &reqwest::Error) -> PipelineError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    PipelineError::Upstream { service, reason }
}

/// Turns the raw parser response into ordered lines: strips the reserved
/// `flag` key, renders non-string quantities as text, and overlays fallback
/// quantities over entries the parser left as "unknown quantity".
pub fn merge_with_fallback(
    raw: Map<String, Value>,
    fallback: &HashMap<String, String>,
) -> ParsedOrder {
    let mut parsed = ParsedOrder::default();
    for (name, value) in raw {
        if name == FLAG_KEY {
            parsed.parser_flag = Some(value);
            continue;
        }
        let mut quantity = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        if quantity == UNKNOWN_QUANTITY {
            if let Some(backfilled) = fallback.get(&name) {
                debug!(product = %name, quantity = %backfilled, "backfilled unknown quantity from line fallback");
                quantity = backfilled.clone();
            }
        }
        parsed.lines.push(ParsedOrderLine {
            product_name_raw: name,
            quantity_raw: quantity,
        });
    }
    parsed
}
