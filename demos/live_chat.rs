//! Sends one text turn to the vendor named by `LIVE_PROVIDER` and prints what comes back.
//!
//! ```sh
//! LIVE_PROVIDER=openai OPENAI_API_KEY=sk-... cargo run --example live_chat -- "Hello there"
//! ```

use anyhow::Context;
use futures::StreamExt;
use polylive::{ClientMessage, EventPayload, LiveConfig, LiveModel, Modality};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Say hello in one short sentence.".to_string());

    let model = LiveModel::from_env().context("Failed to load live model configuration")?;
    let config = LiveConfig::new()
        .with_instructions("You are a concise assistant.")
        .with_modalities([Modality::Text]);
    let session = model
        .connect_with_config(config)
        .await
        .context("Failed to connect")?;
    info!(session_id = session.id(), provider = session.provider_name(), "Connected");

    let mut events = session.events().context("event stream already taken")?;
    session.send(ClientMessage::Text(prompt)).await?;
    session.send(ClientMessage::CreateResponse).await?;

    loop {
        let next = match tokio::time::timeout(Duration::from_secs(30), events.next()).await {
            Ok(Some(next)) => next,
            Ok(None) => break,
            Err(_) => {
                warn!("No event for 30s; giving up");
                break;
            }
        };
        let event = next?;
        match event.payload {
            EventPayload::Content(delta) => {
                if let Some(text) = delta.text {
                    print!("{text}");
                }
                if delta.end_of_turn {
                    println!();
                    break;
                }
            }
            EventPayload::Transcript { role, text, is_final: true } => {
                println!("[{}] {text}", role.as_str());
            }
            EventPayload::TurnComplete => {
                println!();
                break;
            }
            EventPayload::Error { code, message } => {
                warn!(?code, %message, "Server reported an error");
            }
            other => info!(kind = ?other.kind(), "Event"),
        }
    }

    session.close().await;
    if let Some(reason) = session.disconnect_reason() {
        info!(%reason, "Disconnected");
    }
    Ok(())
}
