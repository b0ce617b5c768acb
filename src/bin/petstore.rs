//! Pet Store CLI
//!
//! Serves the versioned pet store API and inspects its version registry.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use versioned_petstore::{app, logging, AppBuilder, ApiVersion, Registries, ServiceConfig};

#[derive(Parser)]
#[command(name = "petstore")]
#[command(about = "Header-versioned pet store API")]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the listen address
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Start with an empty store
        #[arg(long)]
        no_sample_data: bool,
    },

    /// List endpoints, their versions and any missing shims
    Routes {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ServiceConfig::load_from(cli.config.as_deref().and_then(|p| p.to_str()))?;

    match cli.command {
        Commands::Serve { bind, no_sample_data } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if no_sample_data {
                config.server.seed_sample_data = false;
            }
            logging::init(&config.logging);
            app::serve(config).await?;
        }

        Commands::Routes { json } => {
            // Fail on the same config errors `serve` would
            AppBuilder::new(config).validate()?;
            let registries = Registries::populated();
            let missing = registries.audit();

            if json {
                let endpoints: Vec<_> = registries
                    .versions
                    .endpoints()
                    .map(|endpoint| {
                        serde_json::json!({
                            "path": endpoint.path(),
                            "versions": endpoint.versions().iter().map(|v| v.to_string()).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                let report = serde_json::json!({ "endpoints": endpoints, "missing_shims": missing });
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("📋 Registered endpoints:");
            for endpoint in registries.versions.endpoints() {
                let versions = endpoint.versions();
                println!("   {:<20} {}", endpoint.path(), ApiVersion::join_readable(&versions));
            }

            if missing.is_empty() {
                println!("\n✅ Every adjacent version pair has a shim");
            } else {
                println!("\n⚠️  Missing shims:");
                for link in &missing {
                    println!("   {}", link);
                }
            }
        }

        Commands::Config { output } => {
            match output {
                Some(path) => {
                    config.save(&path)?;
                    println!("✅ Wrote config to {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
        }
    }

    Ok(())
}
