//! Minimal example: fetch configuration with local fallback, then mint and
//! check a signed token.
//!
//! Run with: `SCONFIG_KEY=... cargo run --example fetch_demo`
//!
//! - The payload is cached in a temp file, so a second run still works
//!   while the service is unreachable.
//! - If `SCONFIG_SECRET` is set, the payload is decrypted with it.

use sconfig::{sign_token, token_expiration, verify_token, Client, FetchOptions, Secret, SyncMode};
use serde_json::json;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Setup: defaults come from SCONFIG_KEY / SCONFIG_SECRET / SCONFIG_VERSION.
    let client = Client::http()?;
    let cache_path = std::env::temp_dir().join("sconfig_demo.cache");

    // 2. Fetch, persisting locally.
    let options = FetchOptions::new().with_sync(SyncMode::Path(cache_path.clone()));
    match client.fetch_raw(&options).await {
        Ok(fetched) => println!(
            "Fetched {} bytes from {:?} (cache: {})",
            fetched.payload.len(),
            fetched.source,
            cache_path.display()
        ),
        Err(err) => println!("Fetch failed: {}", err),
    }

    // 3. Tokens.
    let secret = Secret::from("0123456789abcdef0123456789abcdef");
    let payload = json!({"user": "alice"});
    let token = sign_token(&payload, &secret, 60)?;
    println!("Token: {}", token);
    println!("Expires at (ms): {:?}", token_expiration(&token));
    println!("Valid: {}", verify_token(&token, &payload, &secret));

    Ok(())
}
