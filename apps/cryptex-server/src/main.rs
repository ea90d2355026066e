mod handlers;
mod server;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tonic::transport::Server;
use tracing::info;

use cryptex_audit::{AuditRecorder, StoreAuditLog};
use cryptex_crypto::{EncryptionKey, EnvelopeCipher};
use cryptex_engine::{Engine, RetentionSweeper};
use cryptex_proto::cryptex_service_server::CryptexServiceServer;
use cryptex_store_sqlite::SqliteStore;
use server::CryptexServer;

// ────────────────────────────────────── CLI Types ──────────────────────────────────────

#[derive(Parser)]
#[command(name = "cryptex-server")]
#[command(about = "Secret lifecycle service: encrypted, versioned, audited")]
struct Cli {
    /// Database URL (sqlite://path/to/db.db)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the gRPC server
    Serve {
        /// Server address
        #[arg(long, default_value = "0.0.0.0:50051")]
        addr: String,

        /// Encryption key for secret values (base64 or raw 32 bytes)
        #[arg(long, env = "SECRET_ENCRYPTION_KEY", hide_env_values = true)]
        encryption_key: String,

        /// Days a soft-deleted row survives before the sweeper purges it
        #[arg(long, env = "PURGE_DAYS", default_value_t = 7)]
        retention_days: i64,

        /// Hours between sweeper ticks
        #[arg(long, default_value_t = 24)]
        sweep_interval_hours: u64,
    },
}

async fn open_store(database_url: Option<String>) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    match database_url {
        Some(url) => Ok(SqliteStore::open(&url).await?),
        None => Ok(SqliteStore::open_default().await?),
    }
}

async fn cmd_serve(
    database_url: Option<String>,
    addr: &str,
    encryption_key: &str,
    retention_days: i64,
    sweep_interval_hours: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    // both of these are fatal: no partially-initialized state serves traffic
    let key = EncryptionKey::from_encoded(encryption_key)?;
    let store = Arc::new(open_store(database_url).await?);

    let cipher = Arc::new(EnvelopeCipher::new(&key));
    let (audit, _audit_worker) = AuditRecorder::spawn(Arc::new(StoreAuditLog::new(store.clone())));
    let engine = Arc::new(Engine::new(store.clone(), cipher, audit));

    let sweeper = RetentionSweeper::new(store)
        .with_retention(chrono::Duration::days(retention_days))
        .with_interval(Duration::from_secs(sweep_interval_hours * 3600));
    tokio::spawn(sweeper.run());

    let addr = addr.parse()?;
    info!(%addr, retention_days, "cryptex-server listening");

    Server::builder()
        .add_service(CryptexServiceServer::new(CryptexServer::new(engine)))
        .serve(addr)
        .await?;

    Ok(())
}

// ────────────────────────────────────── Main ──────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            addr,
            encryption_key,
            retention_days,
            sweep_interval_hours,
        } => {
            cmd_serve(
                cli.database_url,
                &addr,
                &encryption_key,
                retention_days,
                sweep_interval_hours,
            )
            .await?;
        }
    }

    Ok(())
}
