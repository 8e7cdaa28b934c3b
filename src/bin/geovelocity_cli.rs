use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use structopt::StructOpt;

use geovelocity::config::Config;
use geovelocity::geolocation::MaxMindResolver;
use geovelocity::persistence::{EventStore, SqliteEventStore};
use geovelocity::{AnomalyResponse, LoginRequest, TravelAnomalyService};

/// Impossible-travel detection command line interface
#[derive(StructOpt, Debug)]
#[structopt(name = "geovelocity", about = "Impossible-travel detection CLI")]
pub enum Cli {
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Evaluate a single login event and print the verdict
    Evaluate {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        #[structopt(short, long)]
        username: String,
        #[structopt(short, long)]
        ip: String,
        /// Opaque event identifier
        #[structopt(long)]
        uuid: String,
        /// Seconds since the Unix epoch
        #[structopt(short, long)]
        timestamp: i64,
    },
    /// Show the stored logins for a user
    History {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        #[structopt(short, long)]
        username: String,
        /// Number of records to show
        #[structopt(short, long, default_value = "20")]
        limit: usize,
    },
    /// Delete old login records
    Prune {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Delete records older than this Unix timestamp (defaults to the retention window)
        #[structopt(short, long)]
        before: Option<i64>,
    },
}

fn load_config(path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        Config::from_file(path)
    } else {
        log::warn!("Config file {:?} not found, using defaults", path);
        Ok(Config::default())
    }
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::from_args();

    match cli {
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Evaluate {
            config,
            username,
            ip,
            uuid,
            timestamp,
        } => {
            let config = load_config(&config)?;
            let resolver = MaxMindResolver::new(&config.geolocation.database_path)?;
            let store = SqliteEventStore::new(&config.persistence.database_path)?;
            let service =
                TravelAnomalyService::from_config(Arc::new(resolver), Arc::new(store), &config);

            let request = LoginRequest {
                username: Some(username),
                ip_address: Some(ip),
                event_uuid: Some(uuid),
                unix_timestamp: Some(timestamp),
            };
            let result = service.evaluate_request(&request).await?;
            let response = AnomalyResponse::from(&result);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Cli::History {
            config,
            username,
            limit,
        } => {
            let config = load_config(&config)?;
            let store = SqliteEventStore::new(&config.persistence.database_path)?;
            let records = store.history(&username, limit)?;

            println!("{} login(s) for '{}':\n", records.len(), username);
            for record in records {
                println!(
                    "  {}  {:<39}  ({:.4}, {:.4}) +/- {} km  [{}]",
                    format_timestamp(record.timestamp),
                    record.ip_address,
                    record.location.latitude,
                    record.location.longitude,
                    record.location.accuracy_radius_km,
                    record.event_uuid
                );
            }
        }
        Cli::Prune { config, before } => {
            let config = load_config(&config)?;
            let cutoff = match (before, config.persistence.retention_days) {
                (Some(ts), _) => ts,
                (None, Some(days)) => Utc::now().timestamp() - i64::from(days) * 24 * 3600,
                (None, None) => {
                    eprintln!("No --before given and no retention_days configured");
                    std::process::exit(1);
                }
            };

            let store = SqliteEventStore::new(&config.persistence.database_path)?;
            let deleted = store.prune_before(cutoff)?;
            println!("Deleted {} record(s) older than {}", deleted, format_timestamp(cutoff));
        }
    }

    Ok(())
}
