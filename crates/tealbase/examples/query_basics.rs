//! Basic queries and procedure calls against a local tealbase instance.
//!
//! Run with: cargo run --example query_basics -p tealbase
//!
//! Requires a running tealbase stack; set TEALBASE_URL and TEALBASE_ANON_KEY.

use serde_json::json;
use tealbase::prelude::*;

const DEFAULT_URL: &str = "http://127.0.0.1:54321";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::var("TEALBASE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let key = std::env::var("TEALBASE_ANON_KEY")?;
    let client = create_client(&url, &key, ClientOptions::default())?;

    // ── Select with filters ──
    println!("=== Cities in New Zealand ===");
    let response = client
        .from("cities")
        .eq("country", "NZ")
        .gt("population", 100_000)
        .order("population")
        .range(0, 9)
        .select("name, population")
        .await;
    for row in response.into_result()? {
        println!("  {:?}", row.get_value("name"));
    }

    // ── Insert ──
    println!("\n=== Insert ===");
    let row: Row = [("name", json!("Nelson")), ("country", json!("NZ"))]
        .into_iter()
        .collect();
    let inserted = client.from("cities").insert([row]).await;
    println!("  status: {}, error: {:?}", inserted.status, inserted.error);

    // ── RPC ──
    println!("\n=== RPC ===");
    let sum = client
        .rpc("add_numbers", json!({"a": 1, "b": 2}), RpcOptions::default())
        .await;
    println!("  add_numbers(1, 2) = {:?}", sum.first());

    Ok(())
}
