//! Follows a wallet's jail status and prints the countdown until release.

use anyhow::{Context, Result};
use clap::Parser;
use maffisol_client::{
    sync::JailFeed, Client, Endpoints, ReconnectPolicy, Socket, Synced,
};
use maffisol_types::{format_remaining, Identity};
use std::str::FromStr;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Watch a wallet's jail status")]
struct Args {
    /// Wallet address to follow
    #[arg(long)]
    wallet: String,

    /// Serve every backend from this origin instead of the MAFFISOL_*_URL variables
    #[arg(long)]
    origin: Option<String>,

    /// Reconnect attempts before giving up (overrides MAFFISOL_RECONNECT_ATTEMPTS)
    #[arg(long)]
    reconnect_attempts: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = Level::from_str(&args.log_level).context("invalid log level")?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let endpoints = match &args.origin {
        Some(origin) => Endpoints::single(origin),
        None => Endpoints::from_env(),
    }
    .context("invalid endpoint configuration")?;
    let mut policy = ReconnectPolicy::from_env();
    if let Some(attempts) = args.reconnect_attempts {
        policy.max_attempts = attempts;
    }
    let wallet = Identity::new(args.wallet).context("invalid wallet")?;

    let client = Client::new(endpoints.clone()).context("failed to build client")?;
    let socket = Socket::connect(endpoints.socket.clone(), policy);
    let jail = Synced::spawn(JailFeed::new(client), socket.clone());
    jail.track(wallet.clone());
    info!(wallet = %wallet, socket = %endpoints.socket, "watching jail status");

    let mut views = jail.watch();
    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if view.value.is_active() {
                    println!("{wallet}: in jail, {} left", format_remaining(view.remaining));
                } else {
                    println!("{wallet}: free");
                }
            }
            _ = socket.closed() => {
                warn!("connection abandoned, push updates stopped");
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
