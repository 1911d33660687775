//! Pipeline artifact types shared across extraction, reconciliation and the
//! HTTP surface.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::EnumIter;
use uuid::Uuid;

/// Sentinel the order-parsing service returns when it saw a product mention
/// but could not extract a quantity for it.
pub const UNKNOWN_QUANTITY: &str = "unknown quantity";

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize, EnumIter)]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Validated,
    Invalid,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Validated => "validated",
            ProcessingStatus::Invalid => "invalid",
            ProcessingStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProcessingStatus::Pending),
            "processing" => Some(ProcessingStatus::Processing),
            "validated" => Some(ProcessingStatus::Validated),
            "invalid" => Some(ProcessingStatus::Invalid),
            "error" => Some(ProcessingStatus::Error),
            _ => None,
        }
    }
}

/// Metadata recovered from the delimited email envelope. Fields the envelope
/// did not carry are empty strings; the party resolver treats empty
/// `from`/`to` as a hard precondition failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmailMetadata {
    pub subject: String,
    pub from: String,
    pub to: String,
    pub received_at: DateTime<Utc>,
}

/// One product mention as extracted from the email body, before catalog
/// reconciliation. `quantity_raw` may still be [`UNKNOWN_QUANTITY`] if
/// neither the parsing service nor the line fallback resolved it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedOrderLine {
    pub product_name_raw: String,
    pub quantity_raw: String,
}

/// Output of the order-content parsing stage: product lines in encounter
/// order, plus the parser's own special-request hint if it sent one.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ParsedOrder {
    pub lines: Vec<ParsedOrderLine>,
    pub parser_flag: Option<serde_json::Value>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub special_request: bool,
    pub confidence: f64,
}

/// A reconciled, priced order line ready for persistence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderItemDraft {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// A product mention that was dropped during reconciliation, with the policy
/// that dropped it. Returned to the caller for operator visibility.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedProduct {
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DuplicateMention,
    NoCatalogMatch,
    UnparseableQuantity,
}

/// Success response of the ingestion endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub items_count: usize,
    pub total_amount: Decimal,
    pub has_special_request: bool,
    pub skipped_products: Vec<SkippedProduct>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub processing_status: String,
}
