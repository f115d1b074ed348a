//! Webhook Applier
//!
//! Reads a payment provider webhook payload and writes the resulting
//! premium flag to the hosted store.

use clap::Parser;
use odrna::core::config::AppConfig;
use odrna::core::error::{OdrnaError, Result};
use odrna::premium::{apply_webhook, WebhookDecision, WebhookSource};
use odrna::sync::RestHostedStore;
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Apply a payment webhook payload to the hosted store
#[derive(Parser, Debug)]
#[command(name = "apply_webhook")]
struct Args {
    /// Payment provider: stripe or mercadopago
    #[arg(long, default_value = "stripe")]
    source: String,

    /// Payload file; reads stdin when omitted
    #[arg(long)]
    payload: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the decision without writing it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("odrna=info")))
        .init();

    let args = Args::parse();
    let source: WebhookSource = args.source.parse().map_err(OdrnaError::Config)?;

    let raw = match &args.payload {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let payload: Value = serde_json::from_str(&raw)?;

    if args.dry_run {
        println!("{:?}", odrna::premium::decide(source, &payload));
        return Ok(());
    }

    let config = AppConfig::load(args.config.as_deref())?;
    let (Some(url), Some(key)) = (&config.sync.url, &config.sync.api_key) else {
        return Err(OdrnaError::Config(
            "hosted store not configured (SUPABASE_URL, SUPABASE_ANON_KEY)".into(),
        ));
    };
    let store = RestHostedStore::new(url.clone(), key.clone(), Duration::from_secs(config.sync.timeout_secs))?;

    match apply_webhook(&store, source, &payload).await? {
        WebhookDecision::Apply(change) => {
            println!("{} -> premium={} ({})", change.email, change.is_premium, change.trigger)
        }
        WebhookDecision::Ignored(reason) => println!("ignored: {}", reason),
    }
    Ok(())
}
