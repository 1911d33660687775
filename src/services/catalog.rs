//! Party resolution and catalog reads.
//!
//! Lookups are exact-match on email address. Either party missing is a hard
//! failure raised before any write; an empty extracted address short-circuits
//! without touching the database.

use sea_orm::*;
use uuid::Uuid;

use crate::entities::{manufacturer, prelude::*, product, retailer};
use crate::error::{PartyKind, PipelineError};

#[derive(Clone)]
pub struct CatalogService {
    db: DatabaseConnection,
}

impl CatalogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolves retailer by the email's `from` address and manufacturer by
    /// its `to` address.
    pub async fn resolve_parties(
        &self,
        from: &str,
        to: &str,
    ) -> Result<(retailer::Model, manufacturer::Model), PipelineError> {
        if from.trim().is_empty() {
            return Err(PipelineError::PartyNotFound {
                kind: PartyKind::Retailer,
                email: from.to_string(),
            });
        }
        if to.trim().is_empty() {
            return Err(PipelineError::PartyNotFound {
                kind: PartyKind::Manufacturer,
                email: to.to_string(),
            });
        }

        let retailer = Retailer::find()
            .filter(retailer::Column::Email.eq(from))
            .one(&self.db)
            .await?
            .ok_or_else(|| PipelineError::PartyNotFound {
                kind: PartyKind::Retailer,
                email: from.to_string(),
            })?;

        let manufacturer = Manufacturer::find()
            .filter(manufacturer::Column::Email.eq(to))
            .one(&self.db)
            .await?
            .ok_or_else(|| PipelineError::PartyNotFound {
                kind: PartyKind::Manufacturer,
                email: to.to_string(),
            })?;

        Ok((retailer, manufacturer))
    }

    /// Full product catalog for one manufacturer, in stable name order.
    pub async fn catalog_for(
        &self,
        manufacturer_id: Uuid,
    ) -> Result<Vec<product::Model>, PipelineError> {
        Product::find()
            .filter(product::Column::ManufacturerId.eq(manufacturer_id))
            .order_by_asc(product::Column::Name)
            .all(&self.db)
            .await
            .map_err(Into::into)
    }
}
