//! Product reconciliation and pricing.
//!
//! Pure over the parsed lines (encounter order) and the manufacturer's
//! catalog. Three skip policies, all non-fatal and surfaced to the caller:
//! duplicate mention (first-seen wins, case-insensitive), no exact catalog
//! match, unparseable or non-positive quantity. Zero surviving lines is the
//! one fatal outcome here, since an order with no items must not be
//! committed.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use tracing::warn;

use crate::entities::product;
use crate::error::PipelineError;
use crate::types::{OrderItemDraft, ParsedOrderLine, SkipReason, SkippedProduct};

#[derive(Clone, Debug)]
pub struct Reconciliation {
    pub items: Vec<OrderItemDraft>,
    pub total_amount: Decimal,
    pub skipped: Vec<SkippedProduct>,
}

pub fn reconcile(
    lines: &[ParsedOrderLine],
    catalog: &[product::Model],
) -> Result<Reconciliation, PipelineError> {
    let by_name: HashMap<&str, &product::Model> =
        catalog.iter().map(|p| (p.name.as_str(), p)).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();
    let mut skipped = Vec::new();
    let mut total_amount = Decimal::ZERO;

    for line in lines {
        let name = line.product_name_raw.trim();

        if !seen.insert(name.to_lowercase()) {
            warn!(product = %name, "duplicate product mention, keeping first occurrence");
            skipped.push(SkippedProduct {
                name: name.to_string(),
                reason: SkipReason::DuplicateMention,
            });
            continue;
        }

        let Some(product) = by_name.get(name) else {
            warn!(product = %name, "no catalog match, dropping line");
            skipped.push(SkippedProduct {
                name: name.to_string(),
                reason: SkipReason::NoCatalogMatch,
            });
            continue;
        };

        let Some(quantity) = leading_quantity(&line.quantity_raw) else {
            warn!(product = %name, quantity = %line.quantity_raw, "unparseable quantity, dropping line");
            skipped.push(SkippedProduct {
                name: name.to_string(),
                reason: SkipReason::UnparseableQuantity,
            });
            continue;
        };

        let total_price = product.price * Decimal::from(quantity);
        total_amount += total_price;
        items.push(OrderItemDraft {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            total_price,
        });
    }

    if items.is_empty() {
        return Err(PipelineError::NoValidProducts);
    }

    Ok(Reconciliation {
        items,
        total_amount,
        skipped,
    })
}

/// First whitespace-separated token of the quantity string, parsed as a
/// positive integer.
fn leading_quantity(quantity_raw: &str) -> Option<i32> {
    let quantity = quantity_raw.split_whitespace().next()?.parse::<i32>().ok()?;
    (quantity > 0).then_some(quantity)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn catalog_entry(name: &str, price: Decimal) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            manufacturer_id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            created_at: Utc::now().into(),
        }
    }

    fn line(name: &str, quantity: &str) -> ParsedOrderLine {
        ParsedOrderLine {
            product_name_raw: name.to_string(),
            quantity_raw: quantity.to_string(),
        }
    }

    #[test]
    fn prices_matched_lines_and_totals_them() {
        let catalog = vec![
            catalog_entry("Widget A", Decimal::new(1050, 2)),
            catalog_entry("Widget B", Decimal::new(200, 0)),
        ];
        let recon = reconcile(
            &[line("Widget A", "12 units"), line("Widget B", "3 units")],
            &catalog,
        )
        .unwrap();

        assert_eq!(recon.items.len(), 2);
        assert_eq!(recon.items[0].quantity, 12);
        assert_eq!(recon.items[0].total_price, Decimal::new(12600, 2));
        assert_eq!(recon.total_amount, Decimal::new(73200, 2)); // 126.00 + 600.00
        assert!(recon.skipped.is_empty());
    }

    #[test]
    fn unmatched_products_are_skipped_not_fatal() {
        let catalog = vec![catalog_entry("Widget A", Decimal::ONE)];
        let recon = reconcile(
            &[line("Widget A", "1 units"), line("Mystery Item", "2 units")],
            &catalog,
        )
        .unwrap();

        assert_eq!(recon.items.len(), 1);
        assert_eq!(
            recon.skipped,
            vec![SkippedProduct {
                name: "Mystery Item".to_string(),
                reason: SkipReason::NoCatalogMatch,
            }]
        );
    }

    #[test]
    fn duplicate_mentions_keep_first_occurrence_case_insensitively() {
        let catalog = vec![
            catalog_entry("Widget A", Decimal::new(5, 0)),
            catalog_entry("widget a", Decimal::new(7, 0)),
        ];
        let recon = reconcile(
            &[line("Widget A", "2 units"), line("widget a", "9 units")],
            &catalog,
        )
        .unwrap();

        assert_eq!(recon.items.len(), 1);
        assert_eq!(recon.items[0].product_name, "Widget A");
        assert_eq!(recon.total_amount, Decimal::new(10, 0));
        assert_eq!(recon.skipped[0].reason, SkipReason::DuplicateMention);
    }

    #[test]
    fn unparseable_and_non_positive_quantities_are_skipped() {
        let catalog = vec![
            catalog_entry("Widget A", Decimal::ONE),
            catalog_entry("Widget B", Decimal::ONE),
            catalog_entry("Widget C", Decimal::ONE),
        ];
        let recon = reconcile(
            &[
                line("Widget A", "unknown quantity"),
                line("Widget B", "0 units"),
                line("Widget C", "5 units"),
            ],
            &catalog,
        )
        .unwrap();

        assert_eq!(recon.items.len(), 1);
        assert_eq!(recon.items[0].product_name, "Widget C");
        assert_eq!(recon.skipped.len(), 2);
    }

    #[test]
    fn zero_surviving_lines_is_fatal() {
        let catalog = vec![catalog_entry("Widget A", Decimal::ONE)];
        let err = reconcile(&[line("Nope", "1 units")], &catalog).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidProducts));
    }

    #[test]
    fn leading_token_is_parsed_from_quantity_string() {
        let catalog = vec![catalog_entry("Widget A", Decimal::new(3, 0))];
        let recon = reconcile(&[line("Widget A", "4 units (approx)")], &catalog).unwrap();
        assert_eq!(recon.items[0].quantity, 4);
        assert_eq!(recon.total_amount, Decimal::new(12, 0));
    }
}
