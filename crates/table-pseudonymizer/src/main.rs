//! Table pseudonymizer command-line interface

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use table_pseudonymizer_core::Config;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(long, help = "Address to bind the HTTP server to (overrides the config file)")]
    pub host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides the config file)")]
    pub port: Option<u16>,

    #[arg(long, help = "Number of HTTP worker threads (overrides the config file)")]
    pub workers: Option<usize>,

    #[arg(long, help = "Seed for synthetic values, for reproducible output")]
    pub seed: Option<u64>,

    #[arg(long, default_value = "info", help = "Log level (error, warn, info, debug, trace)")]
    pub log_level: String,

    #[arg(long, help = "Path to configuration file")]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(workers) = self.workers {
            config.server.workers = Some(workers);
        }
        if let Some(seed) = self.seed {
            config.faker.seed = Some(seed);
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    match args.config.as_ref() {
        Some(config_path) => {
            info!("Loading configuration from: {}", config_path.display());
            Config::from_file(config_path)
        }
        None => match Config::get_default_config_path() {
            Ok(default_path) if default_path.exists() => {
                info!("Loading configuration from default location: {}", default_path.display());
                Config::from_file(&default_path)
            }
            Ok(default_path) => {
                info!("Creating default configuration at: {}", default_path.display());
                let config = Config::default();
                config.to_file(&default_path)?;
                Ok(config)
            }
            Err(_) => {
                info!("Using default configuration (could not determine config directory)");
                Ok(Config::default())
            }
        },
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.parse::<tracing::Level>()
        .unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', defaulting to 'info'", args.log_level);
            tracing::Level::INFO
        });

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting table-pseudonymizer");

    let mut config = load_config(&args)?;
    args.apply_overrides(&mut config);

    config.validate()?;
    info!("Configuration validated successfully");
    if config.faker.seed.is_some() {
        info!("Synthetic values are seeded; output will repeat across restarts");
    }

    table_pseudonymizer_core::server::run(config).await
}
