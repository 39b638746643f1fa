//! whistle: command-line companion for the anonymous reporting program
//!
//! Queries the public ledger, inspects and maintains the local mirror, and
//! follows submissions to confirmation. Submitting calls needs a wallet and
//! goes through the library.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use whistle_client::codec::REPORT_CONTENT_MAX_BYTES;
use whistle_client::model::format_address;
use whistle_client::tracker::ConfirmationTracker;
use whistle_client::{
    decode_text, encode_text, normalize_scalar, ClientConfig, DashboardStats, FileBackend,
    LedgerReadClient, LocalLedgerStore, ReadEndpoint, ScalarKind, ScalarValue, StructValue,
    SubmissionHandle, TrackerOutcome,
};

#[derive(Parser)]
#[command(name = "whistle")]
#[command(about = "Anonymous reporting client for the zkwhistle program")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "whistle.toml")]
    config: String,

    /// Data directory for the local mirror (overrides config file)
    #[arg(short, long, env = "WHISTLE_DATA_DIR")]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Network counters and block height
    Stats,
    /// Look up an organization on chain
    Org { id: String },
    /// Look up a report on chain
    Report { id: String },
    /// Check whether a membership hash is registered
    Member { hash: String },
    /// Recent local activity
    Activity,
    /// Encode text as a field literal
    Encode {
        text: String,
        #[arg(long, default_value_t = REPORT_CONTENT_MAX_BYTES, value_parser = parse_max_bytes)]
        max_bytes: usize,
    },
    /// Decode a field literal back to text
    Decode { scalar: String },
    /// Follow a submission handle until it confirms or times out
    Track { handle: String },
    /// Drop the local mirror
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("whistle_client=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config))?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }
    config.validate()?;

    match cli.command {
        Command::Stats => {
            let reader = LedgerReadClient::new(&config)?;
            let stats = DashboardStats::fetch(&reader).await;
            println!("Organizations: {}", stats.org_count);
            println!("Reports:       {}", stats.total_reports);
            println!("Block height:  {}", stats.block_height);
        }
        Command::Org { id } => {
            let reader = LedgerReadClient::new(&config)?;
            let id = field_arg(&id)?;
            print_record("Organization", &id, reader.organization(&id).await);
        }
        Command::Report { id } => {
            let reader = LedgerReadClient::new(&config)?;
            let id = field_arg(&id)?;
            print_record("Report", &id, reader.report(&id).await);
        }
        Command::Member { hash } => {
            let reader = LedgerReadClient::new(&config)?;
            let hash = field_arg(&hash)?;
            if reader.is_member(&hash).await {
                println!("{hash} is a registered member");
            } else {
                println!("{hash} is not a registered member");
            }
        }
        Command::Activity => {
            let store = open_store(&config);
            let activity = store.list_activity();
            if activity.is_empty() {
                println!("No activity yet");
            }
            for entry in activity {
                match entry.ref_id {
                    Some(ref_id) => println!(
                        "{}  {}  ({})",
                        entry.timestamp,
                        entry.message,
                        format_address(&ref_id)
                    ),
                    None => println!("{}  {}", entry.timestamp, entry.message),
                }
            }
        }
        Command::Encode { text, max_bytes } => {
            println!("{}", encode_text(&text, max_bytes));
        }
        Command::Decode { scalar } => {
            let scalar = field_arg(&scalar)?;
            match decode_text(&scalar) {
                Some(text) => println!("{text}"),
                None => bail!("{scalar} does not decode to UTF-8 text"),
            }
        }
        Command::Track { handle } => {
            let reader: Arc<dyn ReadEndpoint> = Arc::new(LedgerReadClient::new(&config)?);
            let store = Arc::new(open_store(&config));
            let handle = SubmissionHandle::new(handle);

            info!(handle = %handle, "Tracking submission");
            let mut tracker =
                ConfirmationTracker::new(handle, config.tracker_config(), CancellationToken::new())
                    .with_store(store);
            match tracker.run(reader.as_ref()).await {
                TrackerOutcome::Finished(state) => {
                    println!("{:?} after {} attempt(s)", state, tracker.attempts())
                }
                TrackerOutcome::Cancelled => println!("Tracking cancelled"),
            }
        }
        Command::Reset => {
            open_store(&config).reset();
            println!("Local mirror cleared in {}", config.data_dir.display());
        }
    }

    Ok(())
}

fn open_store(config: &ClientConfig) -> LocalLedgerStore {
    LocalLedgerStore::new(FileBackend::new(&config.data_dir))
}

/// Byte budget for `encode`; more than one field element's worth would
/// exceed the field modulus
fn parse_max_bytes(raw: &str) -> Result<usize, String> {
    let value: usize = raw
        .parse()
        .map_err(|_| format!("{raw} is not a byte count"))?;
    if value > REPORT_CONTENT_MAX_BYTES {
        return Err(format!("at most {REPORT_CONTENT_MAX_BYTES} bytes fit in a field"));
    }
    Ok(value)
}

fn field_arg(raw: &str) -> anyhow::Result<ScalarValue> {
    let normalized = normalize_scalar(raw, ScalarKind::Field);
    match ScalarValue::parse(normalized.as_str()) {
        Some(value) if value.kind() == ScalarKind::Field => Ok(value),
        _ => bail!("{} is not a field value", raw.trim()),
    }
}

fn print_record(label: &str, id: &ScalarValue, record: Option<StructValue>) {
    match record {
        Some(record) => {
            println!("{label} {id}");
            for (key, value) in record.iter() {
                println!("  {key}: {value}");
            }
        }
        None => println!("{label} {id} not found"),
    }
}
