//! The email-to-order pipeline.
//!
//! Stages run in strict sequence because each stage's output feeds the next:
//! envelope extraction, party resolution (early exit before any write),
//! delegated content parsing with line fallback, special-request
//! classification, catalog reconciliation, and the commit sequence. The
//! parser and classifier are injected behind narrow traits so the pipeline
//! can be exercised with fakes.

use sea_orm::DatabaseConnection;
use tracing::info;

use crate::clients::{merge_with_fallback, OrderParser, SpecialRequestClassifier};
use crate::error::PipelineError;
use crate::extract::{parse_envelope, parse_quantity_lines};
use crate::services::catalog::CatalogService;
use crate::services::commit::{CommitSequencer, OrderDraft};
use crate::services::reconcile::reconcile;
use crate::types::{EmailMetadata, IngestResponse};

#[derive(Clone)]
pub struct OrderPipeline<P, C> {
    catalog: CatalogService,
    committer: CommitSequencer,
    parser: P,
    classifier: C,
}

impl<P, C> OrderPipeline<P, C>
where
    P: OrderParser,
    C: SpecialRequestClassifier,
{
    pub fn new(db: DatabaseConnection, parser: P, classifier: C) -> Self {
        Self {
            catalog: CatalogService::new(db.clone()),
            committer: CommitSequencer::new(db),
            parser,
            classifier,
        }
    }

    /// Runs one submission end to end and commits the resulting order.
    pub async fn process(&self, raw_email: &str) -> Result<IngestResponse, PipelineError> {
        if raw_email.trim().is_empty() {
            return Err(PipelineError::MalformedInput(
                "emailDetails must not be empty".to_string(),
            ));
        }

        let envelope = parse_envelope(raw_email);
        let metadata = EmailMetadata {
            subject: envelope.subject,
            from: envelope.from,
            to: envelope.to,
            received_at: chrono::Utc::now(),
        };
        info!(from = %metadata.from, to = %metadata.to, subject = %metadata.subject, "envelope extracted");

        let (retailer, manufacturer) = self
            .catalog
            .resolve_parties(&metadata.from, &metadata.to)
            .await?;

        let catalog = self.catalog.catalog_for(manufacturer.id).await?;
        let product_names: Vec<String> = catalog.iter().map(|p| p.name.clone()).collect();

        let fallback = parse_quantity_lines(&envelope.body);
        let raw_map = self
            .parser
            .parse_order(&product_names, &envelope.body)
            .await?;
        let parsed = merge_with_fallback(raw_map, &fallback);
        info!(lines = parsed.lines.len(), parser_flag = parsed.parser_flag.is_some(), "order content parsed");

        let classification = self.classifier.classify(&envelope.body).await?;
        info!(
            special_request = classification.special_request,
            confidence = classification.confidence,
            "email classified"
        );

        let reconciliation = reconcile(&parsed.lines, &catalog)?;
        info!(
            items = reconciliation.items.len(),
            skipped = reconciliation.skipped.len(),
            total = %reconciliation.total_amount,
            "catalog reconciliation finished"
        );

        let audit = serde_json::json!({
            "metadata": &metadata,
            "parsedLines": &parsed.lines,
            "parserFlag": &parsed.parser_flag,
            "classification": classification,
            "skippedProducts": &reconciliation.skipped,
        });

        let outcome = self
            .committer
            .commit(OrderDraft {
                retailer_id: retailer.id,
                manufacturer_id: manufacturer.id,
                email_subject: metadata.subject,
                email_body: envelope.body,
                email_received_at: metadata.received_at,
                classification,
                items: reconciliation.items,
                total_amount: reconciliation.total_amount,
                audit,
            })
            .await?;

        Ok(IngestResponse {
            order_id: outcome.order_id,
            order_number: outcome.order_number,
            items_count: outcome.items_count,
            total_amount: outcome.total_amount,
            has_special_request: classification.special_request,
            skipped_products: reconciliation.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use serde_json::{Map, Value};
    use uuid::Uuid;

    use super::*;
    use crate::entities::{manufacturer, order, product, retailer};
    use crate::error::PartyKind;
    use crate::types::{ClassificationResult, SkipReason};

    struct FakeParser {
        response: Value,
    }

    impl OrderParser for FakeParser {
        async fn parse_order(
            &self,
            _products: &[String],
            _text: &str,
        ) -> Result<Map<String, Value>, PipelineError> {
            Ok(self.response.as_object().unwrap().clone())
        }
    }

    struct FailingParser;

    impl OrderParser for FailingParser {
        async fn parse_order(
            &self,
            _products: &[String],
            _text: &str,
        ) -> Result<Map<String, Value>, PipelineError> {
            Err(PipelineError::Upstream {
                service: "order-parser",
                reason: "request timed out".to_string(),
            })
        }
    }

    struct FakeClassifier {
        result: ClassificationResult,
    }

    impl SpecialRequestClassifier for FakeClassifier {
        async fn classify(&self, _text: &str) -> Result<ClassificationResult, PipelineError> {
            Ok(self.result)
        }
    }

    fn classifier() -> FakeClassifier {
        FakeClassifier {
            result: ClassificationResult {
                special_request: true,
                confidence: 0.83,
            },
        }
    }

    const MANUFACTURER_EMAIL: &str = "sales@millworks.example";
    const RETAILER_EMAIL: &str = "orders@acmeretail.example";

    fn envelope() -> String {
        format!(
            "@#Subject - Purchase Order 4417@# @#From - Acme <{}>@# \
             @#Body- Widget A - 12 units\nplease expedite@# @#To - {}",
            RETAILER_EMAIL, MANUFACTURER_EMAIL
        )
    }

    fn retailer_row() -> retailer::Model {
        retailer::Model {
            id: Uuid::new_v4(),
            business_name: "Acme Retail".to_string(),
            email: RETAILER_EMAIL.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn manufacturer_row() -> manufacturer::Model {
        manufacturer::Model {
            id: Uuid::new_v4(),
            name: "Millworks".to_string(),
            email: MANUFACTURER_EMAIL.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn product_row(manufacturer_id: Uuid, name: &str, price: Decimal) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            manufacturer_id,
            name: name.to_string(),
            price,
            created_at: Utc::now().into(),
        }
    }

    fn persisted_order(retailer_id: Uuid, manufacturer_id: Uuid) -> order::Model {
        order::Model {
            id: Uuid::new_v4(),
            order_number: "PO-1700000000000-0001000042".to_string(),
            retailer_id,
            manufacturer_id,
            total_amount: Decimal::ZERO,
            has_special_request: true,
            special_request_confidence: Decimal::new(83, 2),
            processing_status: "pending".to_string(),
            email_subject: "Purchase Order 4417".to_string(),
            email_body: String::new(),
            email_received_at: Utc::now().into(),
            email_parsed_data: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn processes_a_well_formed_submission_end_to_end() {
        let retailer = retailer_row();
        let manufacturer = manufacturer_row();
        let widget_a = product_row(manufacturer.id, "Widget A", Decimal::new(1050, 2));
        let widget_b = product_row(manufacturer.id, "Widget B", Decimal::new(200, 0));
        let order = persisted_order(retailer.id, manufacturer.id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![retailer]])
            .append_query_results([vec![manufacturer]])
            .append_query_results([vec![widget_a, widget_b]])
            .append_query_results([vec![order.clone()]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ])
            .into_connection();

        // Parser resolves Widget A confidently; Widget B comes back unknown
        // and is left unresolved (no fallback line for it), so it is skipped
        // at reconciliation.
        let parser = FakeParser {
            response: serde_json::json!({
                "Widget A": "unknown quantity",
                "Widget B": "unknown quantity",
                "flag": 1,
            }),
        };

        let pipeline = OrderPipeline::new(db, parser, classifier());
        let response = pipeline.process(&envelope()).await.unwrap();

        assert_eq!(response.order_id, order.id);
        assert_eq!(response.order_number, order.order_number);
        assert_eq!(response.items_count, 1);
        // Widget A backfilled to 12 units at 10.50 each.
        assert_eq!(response.total_amount, Decimal::new(12600, 2));
        assert!(response.has_special_request);
        assert_eq!(response.skipped_products.len(), 1);
        assert_eq!(response.skipped_products[0].name, "Widget B");
        assert_eq!(
            response.skipped_products[0].reason,
            SkipReason::UnparseableQuantity
        );
    }

    #[tokio::test]
    async fn empty_payload_is_malformed_input() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let pipeline = OrderPipeline::new(
            db,
            FakeParser {
                response: serde_json::json!({}),
            },
            classifier(),
        );
        let err = pipeline.process("   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn missing_to_section_aborts_before_any_database_access() {
        // No mock results appended: any query would fail loudly, so the
        // PartyNotFound below proves the pipeline never reached the database.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let pipeline = OrderPipeline::new(
            db,
            FakeParser {
                response: serde_json::json!({}),
            },
            classifier(),
        );

        let raw = format!(
            "@#Subject - order@# @#From - {}@# @#Body- Widget A - 1 units",
            RETAILER_EMAIL
        );
        let err = pipeline.process(&raw).await.unwrap_err();
        match err {
            PipelineError::PartyNotFound { kind, email } => {
                assert_eq!(kind, PartyKind::Manufacturer);
                assert_eq!(email, "");
            }
            other => panic!("expected PartyNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_retailer_aborts_with_its_address() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<retailer::Model>::new()])
            .into_connection();
        let pipeline = OrderPipeline::new(
            db,
            FakeParser {
                response: serde_json::json!({}),
            },
            classifier(),
        );

        let err = pipeline.process(&envelope()).await.unwrap_err();
        match err {
            PipelineError::PartyNotFound { kind, email } => {
                assert_eq!(kind, PartyKind::Retailer);
                assert_eq!(email, RETAILER_EMAIL);
            }
            other => panic!("expected PartyNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn parser_failure_aborts_with_no_writes() {
        let retailer = retailer_row();
        let manufacturer = manufacturer_row();
        let widget_a = product_row(manufacturer.id, "Widget A", Decimal::ONE);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![retailer]])
            .append_query_results([vec![manufacturer]])
            .append_query_results([vec![widget_a]])
            .into_connection();

        let pipeline = OrderPipeline::new(db, FailingParser, classifier());
        let err = pipeline.process(&envelope()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Upstream {
                service: "order-parser",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn zero_catalog_matches_abort_before_the_commit_sequence() {
        let retailer = retailer_row();
        let manufacturer = manufacturer_row();
        let widget_a = product_row(manufacturer.id, "Widget A", Decimal::ONE);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![retailer]])
            .append_query_results([vec![manufacturer]])
            .append_query_results([vec![widget_a]])
            .into_connection();

        let parser = FakeParser {
            response: serde_json::json!({"Discontinued Gizmo": "5 units"}),
        };
        let pipeline = OrderPipeline::new(db, parser, classifier());
        let err = pipeline.process(&envelope()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoValidProducts));
    }

    #[tokio::test]
    async fn item_insert_failure_reports_partial_commit() {
        let retailer = retailer_row();
        let manufacturer = manufacturer_row();
        let widget_a = product_row(manufacturer.id, "Widget A", Decimal::new(1050, 2));
        let order = persisted_order(retailer.id, manufacturer.id);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![retailer]])
            .append_query_results([vec![manufacturer]])
            .append_query_results([vec![widget_a]])
            .append_query_results([vec![order.clone()]])
            .append_exec_errors([DbErr::Custom("items refused".to_string())])
            .into_connection();

        let parser = FakeParser {
            response: serde_json::json!({"Widget A": "12 units"}),
        };
        let pipeline = OrderPipeline::new(db, parser, classifier());
        let err = pipeline.process(&envelope()).await.unwrap_err();
        match err {
            PipelineError::PartialCommit { order_id, .. } => assert_eq!(order_id, order.id),
            other => panic!("expected PartialCommit, got {other:?}"),
        }
    }
}
