//! `SeaORM` Entity, a committed purchase order parsed from a retailer email.
//!
//! Created in `pending` status together with its email metadata and the full
//! parsed-data audit snapshot. `total_amount` is finalized by a separate
//! update after the line items commit, so a row whose items failed to persist
//! keeps a zero total rather than reporting amounts that were never written.

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub retailer_id: Uuid,
    pub manufacturer_id: Uuid,
    pub total_amount: Decimal,
    pub has_special_request: bool,
    pub special_request_confidence: Decimal,
    pub processing_status: String,
    pub email_subject: String,
    pub email_body: String,
    pub email_received_at: DateTimeWithTimeZone,
    pub email_parsed_data: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::retailer::Entity",
        from = "Column::RetailerId",
        to = "super::retailer::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Retailer,
    #[sea_orm(
        belongs_to = "super::manufacturer::Entity",
        from = "Column::ManufacturerId",
        to = "super::manufacturer::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Manufacturer,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::retailer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Retailer.def()
    }
}

impl Related<super::manufacturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manufacturer.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
