/*
[INPUT]:  Credentials from the default chain (static, env, file)
[OUTPUT]: One signed, retried GET against the finlink API
[POS]:    Examples - outbound client flow demonstration
[UPDATE]: When client construction or send API changes
*/

use finlink_client::*;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

/// Example: resolve credentials and send a signed request
///
/// Set ACCESS_KEY / SECRET_KEY (or SANDBOX=true) or provide
/// ~/.finlink/credentials before running.
#[tokio::main]
async fn main() {
    println!("=== finlink Signed Request Example ===\n");

    let client = match ApiClient::from_default_chain(StaticProvider::empty(), ClientConfig::default()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };
    println!(
        "✓ Client ready for {} ({})",
        client.base_url(),
        client.transport().authenticator().scheme()
    );

    let cancel = CancellationToken::new();
    let builder = match client.request(Method::GET, "/v1/accounts") {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to build request: {}", e);
            return;
        }
    };

    match client.send_json::<serde_json::Value>(builder, &cancel).await {
        Ok(accounts) => println!("✓ Accounts: {}", accounts),
        Err(FinlinkError::Transport(e)) => {
            eprintln!("Request failed after {} attempt(s): {}", e.attempts(), e)
        }
        Err(e) => eprintln!("Request failed: {}", e),
    }
}
