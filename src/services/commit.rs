//! Order commit sequencer.
//!
//! Linear three-step write sequence with compensating reporting rather than
//! rollback: create the pending order, bulk-insert its items, then finalize
//! the total. A step-2 failure leaves the pending order as an audit trail
//! and surfaces its id; a step-3 failure is log-only degraded state (order
//! and items remain valid, total stays zero until remediated).

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::{
    order, order_item,
    prelude::{Order, OrderItem},
};
use crate::error::PipelineError;
use crate::types::{ClassificationResult, OrderItemDraft, ProcessingStatus};

/// Everything the sequencer needs to persist one reconciled order.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub retailer_id: Uuid,
    pub manufacturer_id: Uuid,
    pub email_subject: String,
    pub email_body: String,
    pub email_received_at: DateTime<Utc>,
    pub classification: ClassificationResult,
    pub items: Vec<OrderItemDraft>,
    pub total_amount: Decimal,
    /// Full structured parse snapshot, stored on the order for audit/debug.
    pub audit: serde_json::Value,
}

#[derive(Clone, Debug)]
pub struct CommitOutcome {
    pub order_id: Uuid,
    pub order_number: String,
    pub items_count: usize,
    pub total_amount: Decimal,
}

#[derive(Clone)]
pub struct CommitSequencer {
    db: DatabaseConnection,
}

impl CommitSequencer {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn commit(&self, draft: OrderDraft) -> Result<CommitOutcome, PipelineError> {
        let now = Utc::now();
        let order_number = generate_order_number();

        // Step 1: pending order row with a zero total. The total is only
        // finalized once every item row is committed, so the order never
        // reports amounts that were not persisted.
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(order_number),
            retailer_id: Set(draft.retailer_id),
            manufacturer_id: Set(draft.manufacturer_id),
            total_amount: Set(Decimal::ZERO),
            has_special_request: Set(draft.classification.special_request),
            special_request_confidence: Set(
                Decimal::from_f64_retain(draft.classification.confidence).unwrap_or_default(),
            ),
            processing_status: Set(ProcessingStatus::Pending.as_str().to_string()),
            email_subject: Set(draft.email_subject),
            email_body: Set(draft.email_body),
            email_received_at: Set(draft.email_received_at.into()),
            email_parsed_data: Set(Some(draft.audit)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        let order = order
            .insert(&self.db)
            .await
            .map_err(PipelineError::OrderCreateFailed)?;
        info!(order_id = %order.id, order_number = %order.order_number, "order created");

        // Step 2: bulk insert of the reconciled items.
        debug!(
            order_id = %order.id,
            products = ?draft.items.iter().map(|item| item.product_name.as_str()).collect::<Vec<_>>(),
            "inserting order items"
        );
        let item_models: Vec<order_item::ActiveModel> = draft
            .items
            .iter()
            .map(|item| order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(item.total_price),
                created_at: Set(now.into()),
            })
            .collect();
        OrderItem::insert_many(item_models)
            .exec_without_returning(&self.db)
            .await
            .map_err(|source| PipelineError::PartialCommit {
                order_id: order.id,
                order_number: order.order_number.clone(),
                source,
            })?;
        info!(order_id = %order.id, items = draft.items.len(), "order items committed");

        // Step 3: finalize the total. Non-fatal; the order and items are
        // already valid and an operator can recompute the total later.
        let update = Order::update_many()
            .col_expr(order::Column::TotalAmount, Expr::value(draft.total_amount))
            .col_expr(
                order::Column::UpdatedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(order::Column::Id.eq(order.id))
            .exec(&self.db)
            .await;
        if let Err(err) = update {
            warn!(order_id = %order.id, error = %err, "total update failed, order left with zero total");
        }

        Ok(CommitOutcome {
            order_id: order.id,
            order_number: order.order_number,
            items_count: draft.items.len(),
            total_amount: draft.total_amount,
        })
    }
}

static ORDER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Order numbers combine wall-clock millis, a monotonic sequence and a
/// random suffix. The sequence keeps numbers generated within the same
/// millisecond distinct; the random suffix keeps them unguessable and
/// collision-resistant across process restarts.
pub fn generate_order_number() -> String {
    let seq = ORDER_SEQ.fetch_add(1, Ordering::Relaxed) % 10_000;
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!(
        "PO-{}-{:04}{:06}",
        Utc::now().timestamp_millis(),
        seq,
        suffix
    )
}
