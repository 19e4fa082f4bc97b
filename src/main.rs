//! zonectl - DNS record management CLI
//!
//! Architecture:
//! - Pure reconciliation engine decides what to change before any mutation
//! - Typed SOAP/WSDL codec and envelope layer for the legacy wire format
//! - Injected transport (reqwest with rustls) with a generous timeout
//! - Explicit overwrite policy against accidental record replacement

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use zonectl::client::ApiClient;
use zonectl::config::Config;
use zonectl::constants::DEFAULT_TTL_SECS;
use zonectl::reconcile::DesiredState;
use zonectl::record::{format_ttl, RecordType};
use zonectl::sync::{run_converge, run_get, ConvergeOutcome};

/// Application version
const VERSION: &str = "0.3.0";

//==============================================================================
// Main
//==============================================================================

#[derive(Debug, Parser)]
#[command(name = "zonectl")]
#[command(version = VERSION)]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging (also via config file or RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the records of one record group
    Get {
        /// DNS zone the record lives in
        zone: String,
        /// Fully-qualified record name
        record: String,
        /// Record type (A, AAAA, CNAME, MX, TXT, PTR, SRV, SPF, NS, CAA)
        rtype: String,
    },
    /// Converge a record group to the given values
    Set {
        zone: String,
        record: String,
        rtype: String,
        /// TTL in seconds
        #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
        ttl: u32,
        /// Desired value; repeat for multiple values. Priority-bearing
        /// types (MX, PTR) use "priority target".
        #[arg(long = "value", required = true)]
        values: Vec<String>,
        /// Replace existing records that do not match
        #[arg(long)]
        overwrite: bool,
        /// Compute and log the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// Remove a record group (must match the given values exactly)
    Remove {
        zone: String,
        record: String,
        rtype: String,
        #[arg(long, default_value_t = DEFAULT_TTL_SECS)]
        ttl: u32,
        #[arg(long = "value", required = true)]
        values: Vec<String>,
        /// Compute and log the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the number of zones of the authenticated user
    Zones,
    /// Replace an IP across all records of the user
    ChangeIp {
        /// Current IP address
        from: String,
        /// New IP address
        to: String,
    },
    /// Replace the TTL of all records pointing at an IP
    ChangeTtl {
        /// IP address whose records to change
        ip: String,
        /// New TTL in seconds
        ttl: u32,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = Config::load(args.config.clone()).context("Config load failed")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if args.verbose || config.verbose {
            "debug"
        } else {
            "info"
        })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = ApiClient::connect(
        &config.endpoint,
        config.username.as_str(),
        config.password.as_str(),
        config.timeout,
    )
    .context("API client failed")?;

    run(&client, args.command).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
    match command {
        Command::Get {
            zone,
            record,
            rtype,
        } => {
            let rtype: RecordType = rtype.parse()?;
            match run_get(client, &zone, &record, rtype).await? {
                Some(set) => {
                    println!("{} {}", set.name, set.rtype);
                    println!("  ttl: {} ({})", set.ttl, format_ttl(set.ttl));
                    if let Some(ttls) = &set.ttls {
                        let all: Vec<String> = ttls.iter().map(u32::to_string).collect();
                        println!("  ttls differ across records: {}", all.join(", "));
                    }
                    for value in &set.values {
                        println!("  value: {value}");
                    }
                }
                None => println!("no matching records"),
            }
        }
        Command::Set {
            zone,
            record,
            rtype,
            ttl,
            values,
            overwrite,
            dry_run,
        } => {
            let rtype: RecordType = rtype.parse()?;
            let outcome = run_converge(
                client,
                &zone,
                &record,
                rtype,
                ttl,
                &values,
                overwrite,
                DesiredState::Present,
                dry_run,
            )
            .await?;
            report(outcome, dry_run);
        }
        Command::Remove {
            zone,
            record,
            rtype,
            ttl,
            values,
            dry_run,
        } => {
            let rtype: RecordType = rtype.parse()?;
            let outcome = run_converge(
                client,
                &zone,
                &record,
                rtype,
                ttl,
                &values,
                false,
                DesiredState::Absent,
                dry_run,
            )
            .await?;
            report(outcome, dry_run);
        }
        Command::Zones => {
            let count = client.count_zones().await?;
            println!("{count}");
        }
        Command::ChangeIp { from, to } => {
            let changed = client.change_ip(&from, &to).await?;
            println!("changed {changed} record(s)");
        }
        Command::ChangeTtl { ip, ttl } => {
            let changed = client.change_ttl(&ip, ttl).await?;
            println!("changed {changed} record(s)");
        }
    }
    Ok(())
}

fn report(outcome: ConvergeOutcome, dry_run: bool) {
    let prefix = if dry_run { "would have " } else { "" };
    if outcome.deleted == 0 && outcome.updated == 0 && outcome.created == 0 {
        println!("already converged, nothing to do");
    } else {
        println!(
            "{prefix}deleted {}, updated {}, created {}",
            outcome.deleted, outcome.updated, outcome.created
        );
    }
}
