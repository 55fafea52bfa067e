use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::{signal, sync::watch};

mod cdm;
mod config;
mod error;
mod passkey;
mod server;
mod store;

use crate::config::Config;
use crate::passkey::Tier;
use crate::server::AppState;
use crate::store::Store;

#[derive(Parser, Debug)]
#[command(name = "remote-wv")]
#[command(about = "Widevine license key issuance gateway")]
pub struct Args {
    /// Path to the provisioned device RSA private key (PEM or DER)
    #[arg(long, env = "WV_PRIVATE_KEY")]
    pub private_key: PathBuf,

    /// Path to the provisioned device client ID blob
    #[arg(long, env = "WV_CLIENT_ID")]
    pub client_id: PathBuf,

    /// Path to the SQLite database
    #[arg(long, env = "REMOTE_WV_DB", default_value = "remote-wv.db")]
    pub db: PathBuf,

    /// HTTP server port
    #[arg(short, long, default_value = "8080")]
    pub port: u16,

    /// Mint a superuser passkey, print it, and exit. Intended for first
    /// boot, when no passkey exists yet to call /su/passkey with.
    #[arg(long)]
    pub issue_root_passkey: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let store = Store::open(&args.db)?;

    if args.issue_root_passkey {
        let token = passkey::generate()?;
        store.insert_passkey(token.clone(), Tier::Superuser).await?;
        println!("Superuser passkey: {token}");
        println!("Save the passkey, without it you won't be able to request for keys");
        return Ok(());
    }

    let config = Config {
        private_key_path: args.private_key,
        client_id_path: args.client_id,
    };

    // Fail fast on unreadable or malformed credentials instead of
    // surfacing them on the first license request.
    config.load_device().await?;

    let state = AppState {
        config: Arc::new(config),
        store,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(addr, state, shutdown_rx).await {
            eprintln!("[server] Error: {e}");
        }
    });

    signal::ctrl_c().await?;
    println!("\nShutting down...");
    let _ = shutdown_tx.send(true);
    let _ = server_handle.await;

    println!("Done.");
    Ok(())
}
