use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reeltrack_client::{
    CatalogCoordinator, CounterSync, LoginReply, RegisterReply, ServiceArgs, ServiceHub, SyncArgs,
};
use reeltrack_core::{CatalogStore, TimeFormat};
use reeltrack_db::DbCatalog;
use tokio::net::TcpStream;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reeltrack")]
#[command(about = "ReelTrack administrative CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL", default_value = "reeltrack.db")]
    db: String,

    /// Address of the web front end sharing this catalog
    #[arg(long, env = "REELTRACK_LISTEN", default_value = "127.0.0.1:3000")]
    listen: SocketAddr,

    #[command(flatten)]
    services: ServiceArgs,

    #[command(flatten)]
    sync: SyncArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Remote item counter
    Counter {
        #[command(subcommand)]
        sub: CounterCommands,
    },
    /// Accounts on the auth service
    Auth {
        #[command(subcommand)]
        sub: AuthCommands,
    },
    /// Catalog contents
    Items {
        #[command(subcommand)]
        sub: ItemCommands,
    },
    /// Ask the clock service for the current time
    Time {
        #[arg(long, default_value = "24")]
        format: TimeFormat,
    },
    /// Ask the calendar service for today's date
    Date {
        #[arg(long)]
        format: Option<String>,
    },
}

#[derive(Subcommand)]
enum CounterCommands {
    /// Print the remote count
    Get,
    /// Set the remote count to zero
    Reset {
        /// Skip the running-server check
        #[arg(long)]
        force: bool,
    },
    /// Recompute the remote count from the local catalog
    Resync {
        /// Skip the running-server check
        #[arg(long)]
        force: bool,
    },
    /// Compare the remote count with the catalog size
    Status,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Check credentials against the auth service
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// List catalog items
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let hub = ServiceHub::new(cli.services.hub_config());
    let counter_name = cli.sync.counter_name.clone();

    match cli.command {
        Commands::Counter { sub } => match sub {
            CounterCommands::Get => {
                let count = hub.counter().get(&counter_name).await?;
                println!("{}: {}", counter_name, count);
            }
            CounterCommands::Reset { force } => {
                ensure_server_stopped(cli.listen, force).await?;
                hub.counter().reset(&counter_name).await?;
                println!("Counter reset: {}", counter_name);
            }
            CounterCommands::Resync { force } => {
                ensure_server_stopped(cli.listen, force).await?;
                let coordinator = coordinator(&cli.db, &hub, &cli.sync)?;
                match coordinator.resync().await? {
                    CounterSync::Synced { count } => println!("{} resynchronized to {}", counter_name, count),
                    CounterSync::Drift { expected, detail } => {
                        return Err(format!("resync to {} failed: {}", expected, detail).into());
                    }
                    CounterSync::Skipped => println!("Nothing to do"),
                }
            }
            CounterCommands::Status => {
                let coordinator = coordinator(&cli.db, &hub, &cli.sync)?;
                let status = coordinator.counter_status().await?;
                println!("Counter Status: {}", counter_name);
                println!("{}", "=".repeat(35));
                println!("Remote count:    {}", status.count);
                println!("Catalog size:    {}", status.catalog_size);
                println!("In sync:         {}", if status.in_sync { "yes" } else { "no" });
            }
        },
        Commands::Auth { sub } => match sub {
            AuthCommands::Login { username, password } => {
                match hub.auth().login(&username, &password).await? {
                    LoginReply::Accepted { message, .. } => {
                        println!("{}", message.unwrap_or_else(|| format!("Login accepted: {}", username)));
                    }
                    LoginReply::Rejected { message } => return Err(message.into()),
                }
            }
            AuthCommands::Register { username, password } => {
                match hub.auth().register(&username, &password).await? {
                    RegisterReply::Registered { message } => {
                        println!("{}", message.unwrap_or_else(|| format!("Account created: {}", username)));
                    }
                    RegisterReply::Rejected { message } => return Err(message.into()),
                }
            }
        },
        Commands::Items { sub } => match sub {
            ItemCommands::List { json } => {
                let db = DbCatalog::new(&cli.db)?;
                let items = db.list()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&items)?);
                } else {
                    println!("Catalog Items:");
                    println!("{:<6} {:<30} {:<8} {:<14} {:<10} {:<12}", "ID", "Title", "Type", "Status", "Progress", "Added");
                    println!("{}", "-".repeat(84));
                    for item in items {
                        println!("{:<6} {:<30} {:<8} {:<14} {:<10} {:<12}",
                            item.id,
                            item.title,
                            item.kind,
                            item.status.label(),
                            format!("{}/{}", item.progress, item.runtime),
                            item.date_added
                        );
                    }
                }
            }
        },
        Commands::Time { format } => {
            println!("{}", hub.clock().get_time(format).await?);
        }
        Commands::Date { format } => {
            let format = format.unwrap_or_else(|| cli.sync.date_format.clone());
            println!("{}", hub.calendar().get_date(&format).await?);
        }
    }

    hub.shutdown().await;
    Ok(())
}

fn coordinator(
    db: &str,
    hub: &ServiceHub,
    sync: &SyncArgs,
) -> Result<CatalogCoordinator, Box<dyn std::error::Error>> {
    let store = Arc::new(DbCatalog::new(db)?);
    Ok(CatalogCoordinator::new(
        store,
        hub.counter().clone(),
        hub.calendar().clone(),
        sync.coordinator_config(),
    ))
}

/// The server serializes counter writes with a lock local to its own process.
/// Writing from here while it is up could interleave with one of its replays.
async fn ensure_server_stopped(listen: SocketAddr, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if force {
        return Ok(());
    }
    let probe = tokio::time::timeout(Duration::from_millis(500), TcpStream::connect(listen)).await;
    if matches!(probe, Ok(Ok(_))) {
        return Err(format!(
            "a server is listening on {}; use POST /counter/resync there or stop it first (--force skips this check)",
            listen
        )
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn counter_writes_refused_while_server_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        assert!(ensure_server_stopped(addr, false).await.is_err());
        assert!(ensure_server_stopped(addr, true).await.is_ok());

        drop(listener);
        assert!(ensure_server_stopped(addr, false).await.is_ok());
    }
}
