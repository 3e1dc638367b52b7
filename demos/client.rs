//! Demonstrates the payer side: signing an EIP-3009 authorization against a
//! quoted payment requirement.
//!
//! Run with:
//! ```bash
//! cargo run --example client
//! ```
//!
//! Environment variables:
//! - PRIVATE_KEY: Payer's private key (DO NOT use a funded key for this demo)

use ethers::signers::{LocalWallet, Signer};
use ethers::types::U256;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use x402_notary_engine::config::{DomainParamsTemplate, EngineConfig, NetworkProfile};
use x402_notary_engine::hash::typed_data_digest;
use x402_notary_engine::{Authorization, AuthorizationVerifier, PaymentRequirementIssuer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let private_key = std::env::var("PRIVATE_KEY").unwrap_or_else(|_| {
        println!("no PRIVATE_KEY set, using a throwaway example key");
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string()
    });
    let wallet: LocalWallet = private_key.parse()?;

    let mut networks = HashMap::new();
    networks.insert(
        "8453".to_string(),
        NetworkProfile {
            chain_id: 8453,
            asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse()?,
            facilitator_url: "https://facilitator.example.com".parse()?,
            pay_to: "0x742d35Cc6634C0532925a3b844Bc9e7595f0bEbb".parse()?,
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

    let now = chrono::Utc::now();
    let issuer = PaymentRequirementIssuer::new(&config);
    let requirement = issuer.issue(
        "8453",
        "10000",
        "/notarize",
        "Notarize one document",
        "application/json",
        300,
        now,
    )?;
    println!("received payment requirement: {requirement:#?}");

    let now_secs = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let network = config.network(&requirement.network)?;
    let mut auth = Authorization {
        from: wallet.address(),
        to: requirement.pay_to,
        value: U256::from_dec_str(&requirement.max_amount_required)?,
        valid_after: now_secs.saturating_sub(60),
        valid_before: now_secs + requirement.max_timeout_seconds,
        nonce: rand::random(),
        v: 27,
        r: [0u8; 32],
        s: [0u8; 32],
    };
    let digest = typed_data_digest(&config.domain, network, &auth);
    let signature = wallet.sign_hash(digest.into())?;
    signature.r.to_big_endian(&mut auth.r);
    signature.s.to_big_endian(&mut auth.s);
    auth.v = signature.v as u8;

    let verifier = AuthorizationVerifier::new(&config);
    let result = verifier.verify(&auth, &requirement.network, now_secs);
    println!("self-check before submitting: {result:?}");

    Ok(())
}
