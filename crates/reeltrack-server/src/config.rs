use std::net::SocketAddr;

use clap::Parser;
use reeltrack_client::{ServiceArgs, SyncArgs};

/// ReelTrack web front end
#[derive(Parser, Debug, Clone)]
#[command(name = "reeltrack-server")]
#[command(about = "Media catalog front end backed by the auth, clock, calendar and counter services")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "REELTRACK_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// SQLite catalog path
    #[arg(long, env = "DATABASE_URL", default_value = "reeltrack.db")]
    pub database_url: String,

    #[command(flatten)]
    pub services: ServiceArgs,

    #[command(flatten)]
    pub sync: SyncArgs,
}
