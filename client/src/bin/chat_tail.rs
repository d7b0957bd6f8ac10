//! Prints a chat room's history and then follows it live.

use anyhow::{Context, Result};
use clap::Parser;
use maffisol_client::{
    chat::{FamilyChat, PublicChat},
    Client, Endpoints, ReconnectPolicy, Socket,
};
use std::str::FromStr;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Tail the public chat or a family room")]
struct Args {
    /// Serve every backend from this origin instead of the MAFFISOL_*_URL variables
    #[arg(long)]
    origin: Option<String>,

    /// Follow this family's room instead of the public chat
    #[arg(long)]
    family: Option<String>,

    /// Sender id used with --say
    #[arg(long, requires = "say")]
    sender: Option<String>,

    /// Post one message before tailing
    #[arg(long, requires = "sender")]
    say: Option<String>,

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
    let client = Client::new(endpoints.clone()).context("failed to build client")?;
    let socket = Socket::connect(endpoints.socket.clone(), ReconnectPolicy::from_env());
    let outgoing = args.sender.as_deref().zip(args.say.as_deref());

    match &args.family {
        Some(family) => {
            let mut chat = FamilyChat::open(client, socket, family)
                .await
                .context("failed to load family chat")?;
            for message in chat.messages() {
                println!("{}: {}", message.sender, message.content);
            }
            if let Some((sender, say)) = outgoing {
                chat.send(sender, say).context("failed to send")?;
            }
            info!(family = %family, "following family chat");
            while let Some(message) = chat.next_message().await {
                println!("{}: {}", message.sender, message.content);
            }
        }
        None => {
            let mut chat = PublicChat::open(client, socket)
                .await
                .context("failed to load chat")?;
            for message in chat.messages() {
                println!("{}: {}", message.sender_id, message.message);
            }
            if let Some((sender, say)) = outgoing {
                chat.send(sender, say).await.context("failed to send")?;
            }
            info!("following public chat");
            while let Some(message) = chat.next_message().await {
                println!("{}: {}", message.sender_id, message.message);
            }
        }
    }
    Ok(())
}
