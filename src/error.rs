//! Error taxonomy for the ingestion pipeline.
//!
//! Every stage either hands a well-formed artifact to the next stage or
//! aborts the remaining pipeline with one of these variants. The only
//! permitted soft failure is the post-commit total update, which is logged
//! by the commit sequencer and never reaches this type.

use axum::http::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PartyKind {
    Retailer,
    Manufacturer,
}

impl std::fmt::Display for PartyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartyKind::Retailer => write!(f, "retailer"),
            PartyKind::Manufacturer => write!(f, "manufacturer"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or unusable request payload; no side effects.
    #[error("{0}")]
    MalformedInput(String),

    /// Retailer or manufacturer lookup returned zero rows; no writes
    /// performed. An empty extracted address fails here as well.
    #[error("{kind} not found for email address {email:?}")]
    PartyNotFound { kind: PartyKind, email: String },

    /// The order-parsing or classification service returned a non-success
    /// status, an unusable body, or timed out. Full abort, no writes.
    #[error("{service} request failed: {reason}")]
    Upstream {
        service: &'static str,
        reason: String,
    },

    /// Reconciliation dropped every parsed line; an order with no items must
    /// not be committed.
    #[error("no valid products found in order email")]
    NoValidProducts,

    /// Step 1 of the commit sequence failed: no order, no items.
    #[error("order creation failed")]
    OrderCreateFailed(#[source] DbErr),

    /// Step 2 of the commit sequence failed: the pending order row persists
    /// with no items and its id is surfaced for manual remediation.
    #[error("order {order_number} ({order_id}) was created but its line items failed to persist")]
    PartialCommit {
        order_id: Uuid,
        order_number: String,
        #[source]
        source: DbErr,
    },

    #[error("database error")]
    Database(#[from] DbErr),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::MalformedInput(_)
            | PipelineError::PartyNotFound { .. }
            | PipelineError::NoValidProducts => StatusCode::BAD_REQUEST,
            PipelineError::Upstream { .. }
            | PipelineError::OrderCreateFailed(_)
            | PipelineError::PartialCommit { .. }
            | PipelineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Underlying cause, exposed as `details` outside production builds.
    pub fn details(&self) -> Option<String> {
        use std::error::Error;
        self.source().map(|source| source.to_string())
    }
}
