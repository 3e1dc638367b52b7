//! Demonstrates a notarization gateway endpoint: issue a 402 payment
//! requirement, then verify and settle an `X-PAYMENT` authorization on
//! retry.
//!
//! Run with:
//! ```bash
//! cargo run --example server
//! ```
//!
//! Environment variables:
//! - PAY_TO: Address to receive payments
//! - FACILITATOR_URL: Base URL of the facilitator to settle against
//! - PORT: Server port (default: 3000)

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use x402_notary_engine::config::{DomainParamsTemplate, EngineConfig, NetworkProfile};
use x402_notary_engine::{
    Authorization, AuthorizationVerifier, PaymentRequirementIssuer, SettlementCache,
    SettlementClient,
};

struct AppState {
    config: EngineConfig,
    cache: SettlementCache,
}

async fn notarize_handler(
    headers: HeaderMap,
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    if let Some(payment_header) = headers.get("X-PAYMENT") {
        let payment_json = payment_header
            .to_str()
            .map_err(|_| AppError::BadRequest("X-PAYMENT header is not valid UTF-8".to_string()))?;
        let auth: Authorization = serde_json::from_str(payment_json)
            .map_err(|e| AppError::BadRequest(format!("malformed authorization: {e}")))?;

        let verifier = AuthorizationVerifier::new(&state.config);
        let verification = verifier.verify(&auth, "8453", now);
        if !verification.is_valid() {
            return Err(AppError::PaymentFailed(format!("{verification:?}")));
        }

        let client = SettlementClient::new(&state.config, &state.cache);
        let record = client
            .settle(&auth, "8453", now)
            .await
            .map_err(|e| AppError::PaymentFailed(e.to_string()))?;

        Ok((
            StatusCode::OK,
            Json(json!({ "notarized": true, "settlement": record })),
        )
            .into_response())
    } else {
        let issuer = PaymentRequirementIssuer::new(&state.config);
        let requirement = issuer
            .issue(
                "8453",
                "10000",
                "/notarize",
                "Notarize one document",
                "application/json",
                300,
                chrono::Utc::now(),
            )
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        Ok((StatusCode::PAYMENT_REQUIRED, Json(requirement)).into_response())
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "protocol": "x402", "version": 1 }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let pay_to = std::env::var("PAY_TO")
        .unwrap_or_else(|_| "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEbb".to_string());
    let facilitator_url =
        std::env::var("FACILITATOR_URL").unwrap_or_else(|_| "http://localhost:3001/".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()?;

    let mut networks = HashMap::new();
    networks.insert(
        "8453".to_string(),
        NetworkProfile {
            chain_id: 8453,
            asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse()?,
            facilitator_url: facilitator_url.parse()?,
            pay_to: pay_to.parse()?,
            rpc_url: "https://mainnet.base.org".parse()?,
        },
    );
    let config = EngineConfig {
        networks,
        domain: DomainParamsTemplate {
            name: "USD Coin".to_string(),
            version: "2".to_string(),
        },
        cache_ttl: Duration::from_secs(600),
        settlement_timeout: Duration::from_secs(5),
        log_verbosity: tracing::Level::INFO,
    };
    let cache = SettlementCache::new(config.cache_ttl);
    let state = Arc::new(AppState { config, cache });

    let app = Router::new()
        .route("/notarize", get(notarize_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("notarization gateway listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

enum AppError {
    BadRequest(String),
    PaymentFailed(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PaymentFailed(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
