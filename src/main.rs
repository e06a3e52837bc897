mod discord;
mod routes;
mod state;
mod worker;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rsvp_core::config::RsvpConfig;
use rsvp_core::scheduler::Scheduler;
use rsvp_core::state::StateStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::discord::oauth::{OAuthClient, generate_state};
use crate::discord::verify::SignatureVerifier;
use crate::discord::webhooks::WebhookClient;
use crate::state::AppState;
use crate::worker::Worker;

const DEFAULT_FILTER: &str = "discord_rsvp=info,rsvp_core=info";

#[derive(Parser)]
#[command(name = "discord-rsvp")]
#[command(about = "Post recurring events to a Discord channel and collect RSVPs through buttons")]
struct Cli {
    /// Port to listen on for interactions and the OAuth redirect
    #[arg(short, long, default_value_t = 80)]
    port: u16,

    /// Path to the configuration file
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Path to the persisted state file
    #[arg(long, default_value = "data/state.json")]
    state: PathBuf,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = RsvpConfig::load(&cli.config)?;
    let verifier = SignatureVerifier::from_hex(&config.public_key)?;

    let store = StateStore::load(&cli.state);
    if store.clear_expired_credentials(Utc::now()).await? {
        warn!("Stored access token has expired, the webhook has to be authorized again");
    }

    let oauth = Arc::new(OAuthClient::new(
        &config.client_id,
        &config.client_secret,
        &config.instance_url,
    )?);
    let oauth_state = generate_state();
    if !store.credentials().await.has_access_token() {
        let url = oauth.authorize_url(&oauth_state)?;
        info!("Authorize the webhook by visiting {}", url);
    }

    let webhooks = WebhookClient::new(&config.instance_url)?;
    let scheduler = Scheduler::new(config.event_definitions(), config.activities.clone());
    info!(
        events = scheduler.definitions().len(),
        activities = config.activities.len(),
        "Loaded configuration"
    );
    Worker::new(store.clone(), scheduler, Arc::new(webhooks), oauth.clone()).spawn();

    let app = routes::app(AppState::new(store, verifier, oauth, oauth_state));

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Could not bind to {addr}"))?;
    info!("discord-rsvp listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
