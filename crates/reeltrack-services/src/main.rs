use std::sync::Arc;

use clap::Parser;
use reeltrack_services::{spawn, AuthService, CalendarService, ClockService, CounterService};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "reeltrack-services")]
#[command(about = "Runs the ReelTrack auth, calendar, clock and counter services", long_about = None)]
struct Cli {
    #[arg(long, env = "REELTRACK_AUTH_ADDR", default_value = "127.0.0.1:5555")]
    auth_addr: String,

    #[arg(long, env = "REELTRACK_CALENDAR_ADDR", default_value = "127.0.0.1:5556")]
    calendar_addr: String,

    #[arg(long, env = "REELTRACK_CLOCK_ADDR", default_value = "127.0.0.1:5557")]
    clock_addr: String,

    #[arg(long, env = "REELTRACK_COUNTER_ADDR", default_value = "127.0.0.1:5558")]
    counter_addr: String,

    /// Secret used to sign session tokens
    #[arg(long, env = "JWT_SECRET", default_value = "super-secret-key")]
    jwt_secret: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let handles = vec![
        spawn(
            TcpListener::bind(&cli.auth_addr).await?,
            Arc::new(AuthService::new(cli.jwt_secret)),
        ),
        spawn(TcpListener::bind(&cli.calendar_addr).await?, Arc::new(CalendarService)),
        spawn(TcpListener::bind(&cli.clock_addr).await?, Arc::new(ClockService)),
        spawn(TcpListener::bind(&cli.counter_addr).await?, Arc::new(CounterService::new())),
    ];

    tokio::signal::ctrl_c().await?;
    tracing::info!("signal received, stopping services");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}
