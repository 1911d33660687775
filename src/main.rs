use std::env;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use dotenvy::dotenv;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, Set};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod clients;
mod entities;
mod error;
mod extract;
mod services;
mod types;

use clients::{HttpClassifier, HttpOrderParser};
use entities::{order, prelude::Order};
use error::PipelineError;
use services::OrderPipeline;
use types::{ProcessingStatus, StatusUpdateRequest};

#[derive(Clone)]
struct AppState {
    pipeline: OrderPipeline<HttpOrderParser, HttpClassifier>,
    db: DatabaseConnection,
    environment: String,
}

// Webhook endpoint for inbound purchase-order emails
async fn ingest_order_webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let Some(email_details) = payload.get("emailDetails").and_then(|v| v.as_str()) else {
        return pipeline_error_response(
            PipelineError::MalformedInput("missing required field: emailDetails".to_string()),
            &state.environment,
        );
    };

    info!("📧 Received order email submission");
    match state.pipeline.process(email_details).await {
        Ok(response) => {
            info!(
                order_number = %response.order_number,
                items = response.items_count,
                total = %response.total_amount,
                "✅ Order committed"
            );
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(err) => pipeline_error_response(err, &state.environment),
    }
}

// Explicit status transition, driven by the downstream validation step
async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Response {
    let Some(status) = ProcessingStatus::from_str(&payload.processing_status) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("unknown processing status: {}", payload.processing_status)
            })),
        )
            .into_response();
    };

    match Order::find_by_id(order_id).one(&state.db).await {
        Ok(Some(existing)) => {
            let mut active: order::ActiveModel = existing.into();
            active.processing_status = Set(status.as_str().to_string());
            active.updated_at = Set(Utc::now().into());
            match active.update(&state.db).await {
                Ok(updated) => Json(serde_json::json!({
                    "id": updated.id,
                    "orderNumber": updated.order_number,
                    "processingStatus": updated.processing_status,
                }))
                .into_response(),
                Err(err) => {
                    error!(order_id = %order_id, "status update failed: {err}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(serde_json::json!({ "error": "status update failed" })),
                    )
                        .into_response()
                }
            }
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "order not found" })),
        )
            .into_response(),
        Err(err) => {
            error!(order_id = %order_id, "order lookup failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "order lookup failed" })),
            )
                .into_response()
        }
    }
}

async fn health() -> impl IntoResponse {
    "OK"
}

fn pipeline_error_response(err: PipelineError, environment: &str) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!("❌ Order ingestion failed: {err}");
    } else {
        warn!("Order submission rejected: {err}");
    }

    let mut body = serde_json::json!({ "error": err.to_string() });
    if let PipelineError::PartialCommit { order_id, .. } = &err {
        // Surfaced so an operator can retry or reconcile the orphaned order.
        body["orderId"] = serde_json::json!(order_id);
    }
    if environment != "production" {
        if let Some(details) = err.details() {
            body["details"] = serde_json::json!(details);
        }
    }

    (status, Json(body)).into_response()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ordermill=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get configuration from environment
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let parser_url = env::var("ORDER_PARSER_URL").unwrap_or_else(|_| {
        warn!("ORDER_PARSER_URL not set, using local default");
        "http://localhost:8000/parse-order".to_string()
    });
    let classifier_url = env::var("CLASSIFIER_URL").unwrap_or_else(|_| {
        warn!("CLASSIFIER_URL not set, using local default");
        "http://localhost:8001/classify".to_string()
    });
    let classifier_token = env::var("CLASSIFIER_API_TOKEN").ok();
    let special_label =
        env::var("CLASSIFIER_SPECIAL_LABEL").unwrap_or_else(|_| "special".to_string());
    let upstream_timeout_secs = env::var("UPSTREAM_TIMEOUT_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .parse::<u64>()
        .unwrap_or(10);
    let cors_origins =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    info!("🚀 Starting ordermill in {} environment", environment);

    // Connect to database
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected successfully");

    // Shared HTTP client; the timeout bounds every upstream call so a hung
    // parser or classifier fails the pipeline instead of stalling it.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(upstream_timeout_secs))
        .build()?;

    let parser = HttpOrderParser::new(http.clone(), parser_url);
    let classifier = HttpClassifier::new(http, classifier_url, classifier_token, special_label);
    let pipeline = OrderPipeline::new(db.clone(), parser, classifier);

    let app_state = AppState {
        pipeline,
        db,
        environment,
    };

    // Setup CORS
    let cors = if cors_origins.trim() == "*" {
        warn!("🚨 CORS set to accept ANY origin (*) - only use in development!");
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS, Method::PATCH])
            .allow_headers([
                CONTENT_TYPE,
                AUTHORIZATION,
                HeaderName::from_static("x-requested-with"),
            ])
            .allow_credentials(true)
    };

    // Create router
    let app = Router::new()
        .route("/api/orders/ingest", post(ingest_order_webhook))
        .route("/api/orders/{id}/status", patch(update_order_status))
        .route("/health", get(health))
        .layer(cors)
        .with_state(app_state);

    // Start server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    info!("🚀 Server starting on http://{}", addr);
    info!("🏥 Health check available at http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
