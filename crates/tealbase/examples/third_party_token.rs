//! Using tokens from an external identity provider.
//!
//! Run with: cargo run --example third_party_token -p tealbase
//!
//! Set TEALBASE_URL, TEALBASE_ANON_KEY and EXTERNAL_JWT.

use tealbase::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::var("TEALBASE_URL")?;
    let key = std::env::var("TEALBASE_ANON_KEY")?;

    let options = ClientOptions::new()
        .header("x-app", "third-party-demo")
        .access_token(access_token_provider(|| async {
            Ok(std::env::var("EXTERNAL_JWT").ok())
        }));
    let client = create_client(&url, &key, options)?;

    // Native auth is unavailable with an external provider.
    match client.auth().get_session().await {
        Err(e) => println!("auth disabled: {e}"),
        Ok(_) => println!("unexpected session"),
    }

    // Every request carries the provider's token.
    let response = client.from("profiles").select("*").await;
    match response.error {
        Some(e) => println!("query failed: {e}"),
        None => println!("{} profiles", response.data.len()),
    }

    let channel = client.channel("profile-changes", ChannelConfig::new()).await;
    println!("channel {} registered; socket {}", channel.topic(), client.realtime_url());
    client.remove_channel(&channel).await?;

    Ok(())
}
