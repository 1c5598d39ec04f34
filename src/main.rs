use clap::Parser;
use eventpay::application::marketplace::Marketplace;
use eventpay::config::Settings;
use eventpay::domain::ports::{SharedGateway, SharedStore};
use eventpay::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use eventpay::infrastructure::rocksdb::RocksDbStore;
use eventpay::infrastructure::simulated::SimulatedGateway;
use eventpay::infrastructure::stripe::StripeGateway;
use eventpay::interfaces::csv::wallet_writer::WalletWriter;
use eventpay::interfaces::jsonl::command_reader::CommandReader;
use eventpay::interfaces::jsonl::dispatch;
use eventpay::telemetry;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input command file, one JSON command per line
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(flatten)]
    settings: Settings,
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<SharedStore> {
    match db_path {
        Some(path) => {
            info!(path = %path.display(), "opening persistent store");
            Ok(Arc::new(RocksDbStore::open(path).into_diagnostic()?))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<SharedStore> {
    if db_path.is_some() {
        warn!(
            "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
        );
    }
    Ok(Arc::new(InMemoryStore::new()))
}

fn open_gateway(settings: &Settings) -> Result<SharedGateway> {
    match &settings.gateway.stripe_secret_key {
        Some(key) => Ok(Arc::new(
            StripeGateway::new(&settings.gateway, key.as_str()).into_diagnostic()?,
        )),
        None => {
            info!("no Stripe key configured, using the simulated gateway");
            Ok(Arc::new(SimulatedGateway::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.settings.log);

    let store = open_store(cli.db_path)?;
    let gateway = open_gateway(&cli.settings)?;
    let market = Marketplace::new(store, gateway, &cli.settings).into_diagnostic()?;

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(BufReader::new(file));
    for (line, command) in reader.commands() {
        let command = match command {
            Ok(command) => command,
            Err(e) => {
                warn!(line, error = %e, "skipping unreadable command");
                continue;
            }
        };
        match dispatch::execute(&market, command).await {
            Ok(reply) => info!(line, %reply, "command applied"),
            Err(e) => warn!(line, code = ?e.code(), error = %e, "command failed"),
        }
    }

    let wallets = market.queries().all_wallets().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = WalletWriter::new(stdout.lock());
    writer.write_wallets(&wallets).into_diagnostic()?;

    Ok(())
}
