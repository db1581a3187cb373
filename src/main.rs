use std::sync::Arc;

use signal_bridge::config::BridgeConfig;
use signal_bridge::error::{Error, Result};
use signal_bridge::forwarder::{Forwarder, HttpTransport};
use signal_bridge::mail::GmailClient;
use signal_bridge::pipeline::SignalProcessor;
use signal_bridge::webhook::{AppState, webhook_routes};

const USAGE: &str = "Usage: signal-bridge [start|test-api]

  start     Start the webhook server (default)
  test-api  Send a test signal to the configured API";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "start".to_string());
    if !matches!(command.as_str(), "start" | "test-api") {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    if let Err(e) = run(&command).await {
        eprintln!("{e}");
        if matches!(e, Error::Config(_)) {
            eprintln!("  Copy .env.example to .env and fill in the required values");
        }
        std::process::exit(1);
    }
}

async fn run(command: &str) -> Result<()> {
    let config = BridgeConfig::from_env()?;

    let forwarder = Arc::new(Forwarder::new(
        Arc::new(HttpTransport::new()),
        config.api_url.clone(),
        config.forward_timeout,
    ));

    if command == "test-api" {
        let outcome = forwarder.send_test_signal(&config.signal).await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        if !outcome.success {
            eprintln!("API connection test failed");
            std::process::exit(1);
        }
        eprintln!("API connection test successful");
        return Ok(());
    }

    eprintln!("📨 Signal Bridge v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Strategy: {}", config.signal.strategy_name);
    eprintln!("   Signal identifier: {}", config.signal.identifier);
    eprintln!("   API URL: {}", forwarder.api_url());
    eprintln!("   Webhook: http://{}/webhook\n", config.bind_addr());

    let mail = Arc::new(GmailClient::new(config.mail.clone()));
    let processor = Arc::new(SignalProcessor::new(
        mail,
        Arc::clone(&forwarder),
        config.signal.clone(),
    ));
    let app = webhook_routes(AppState::new(processor));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %config.bind_addr(), "Webhook server started");
    axum::serve(listener, app).await?;

    Ok(())
}
