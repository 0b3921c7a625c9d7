use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dhcpd_leases::{Config, Lease, Leases, Result};

#[derive(Parser)]
#[command(name = "dhcpd-leases")]
#[command(author, version, about = "Inspect an ISC dhcpd lease database", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "dhcpd-leases.json")]
    config: PathBuf,

    /// Lease file to read (overrides the config file).
    #[arg(short = 'f', long)]
    leases_file: Option<PathBuf>,

    /// Read the lease file as gzip (implied by a `.gz` extension).
    #[arg(long)]
    gzip: bool,

    /// Evaluate leases at this RFC 3339 time instead of now.
    #[arg(long)]
    now: Option<String>,

    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Every lease in the file, in file order.
    List,
    /// Current lease per client.
    Current,
    /// Current leases as JSON.
    Json,
    /// Re-read the file periodically and print current leases on change.
    Watch,
    ShowConfig,
}

async fn read_leases(config: &Config) -> Result<Leases> {
    let bytes = tokio::fs::read(&config.leases_file).await?;
    if config.is_gzip() {
        Leases::parse_gzip(&bytes)
    } else {
        Leases::parse_bytes(&bytes)
    }
}

fn format_ends(lease: &Lease) -> String {
    lease
        .ends_at()
        .map(|end| end.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn render_current(current: &HashMap<String, &Lease>) -> String {
    if current.is_empty() {
        return "No current leases.\n".to_string();
    }

    let mut keys: Vec<&String> = current.keys().collect();
    keys.sort();

    let mut output = format!(
        "{:<48} {:<40} {:<24}\n{}\n",
        "Client",
        "Address",
        "Expires At",
        "-".repeat(114)
    );
    for key in keys {
        let lease = current[key];
        output.push_str(&format!(
            "{:<48} {:<40} {:<24}\n",
            key,
            lease.ip(),
            format_ends(lease)
        ));
    }
    output
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let mut config = Config::load(&cli.config)?;
    if let Some(leases_file) = cli.leases_file {
        config.leases_file = leases_file;
    }
    if cli.gzip {
        config.gzip = true;
    }
    if let Some(now) = cli.now {
        config.reference_time = Some(now);
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Current) {
        Commands::List => {
            let leases = read_leases(&config).await?;
            let now = config.now()?;

            if leases.is_empty() {
                println!("No leases.");
            } else {
                println!(
                    "{:<40} {:<20} {:<10} {:<6} {:<24}",
                    "Address", "Client", "State", "Valid", "Expires At"
                );
                println!("{}", "-".repeat(104));

                for lease in &leases {
                    let client = match lease {
                        Lease::V4(lease) => lease.hardware_address.clone(),
                        Lease::V6(lease) => format!("{} iaid {}", lease.kind, lease.iaid),
                    };
                    println!(
                        "{:<40} {:<20} {:<10} {:<6} {:<24}",
                        lease.ip(),
                        client,
                        lease.binding_state(),
                        if lease.is_valid(now) { "yes" } else { "no" },
                        format_ends(lease)
                    );
                }
            }

            Ok(())
        }
        Commands::Current => {
            let leases = read_leases(&config).await?;
            let current = leases.current(config.now()?);
            print!("{}", render_current(&current));
            Ok(())
        }
        Commands::Json => {
            let leases = read_leases(&config).await?;
            let current = leases.current(config.now()?);
            println!("{}", serde_json::to_string_pretty(&current)?);
            Ok(())
        }
        Commands::Watch => {
            info!(
                "Watching {:?} every {}s",
                config.leases_file, config.poll_interval_seconds
            );
            let mut interval = tokio::time::interval(config.poll_interval());
            let mut last_output = String::new();

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let leases = match read_leases(&config).await {
                            Ok(leases) => leases,
                            Err(error) => {
                                warn!("Failed to read {:?}: {}", config.leases_file, error);
                                continue;
                            }
                        };
                        let output = render_current(&leases.current(config.now()?));
                        if output != last_output {
                            print!("{}", output);
                            last_output = output;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Received shutdown signal, stopping watch...");
                        return Ok(());
                    }
                }
            }
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
