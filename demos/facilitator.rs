//! A stub facilitator for exercising `SettlementClient` against a real HTTP
//! server locally. This is not a facilitator implementation — running a
//! facilitator service is outside this engine's scope — it only echoes back
//! a `settled` response so `demos/client.rs`-style authorizations have
//! somewhere to be POSTed during local testing.
//!
//! Run with:
//! ```bash
//! cargo run --example facilitator
//! ```
//!
//! Environment variables:
//! - PORT: Server port (default: 3001)

use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct SettleRequest {
    network: String,
    authorization: serde_json::Value,
}

async fn settle_handler(Json(request): Json<SettleRequest>) -> Json<serde_json::Value> {
    tracing::info!(network = %request.network, authorization = %request.authorization, "stub-settling authorization");
    Json(json!({
        "status": "settled",
        "txHash": format!("0x{}", "ab".repeat(32)),
        "blockNumber": 12345678,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse::<u16>()?;

    let app = Router::new().route("/settle", post(settle_handler));

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    println!("stub facilitator listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
