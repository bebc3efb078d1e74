// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tidewire - webhook ingestion and outbound dispatch for social channels.
//!
//! This is the binary entry point for the Tidewire service.

use clap::{Parser, Subcommand};

mod serve;
mod shutdown;

/// Tidewire - webhook ingestion and outbound dispatch for social channels.
#[derive(Parser, Debug)]
#[command(name = "tidewire", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook server and job worker.
    Serve,
    /// Print the resolved configuration with secrets redacted.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match tidewire_config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tidewire: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("tidewire serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            print_config(config);
        }
        None => {
            println!("tidewire: use --help for available commands");
        }
    }
}

fn print_config(mut config: tidewire_config::TidewireConfig) {
    if config.meta.app_secret.is_some() {
        config.meta.app_secret = Some("<redacted>".to_string());
    }
    if config.meta.verify_token.is_some() {
        config.meta.verify_token = Some("<redacted>".to_string());
    }
    if config.vault.master_key.is_some() {
        config.vault.master_key = Some("<redacted>".to_string());
    }
    match toml::to_string_pretty(&config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("tidewire config: {e}"),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        let config = tidewire_config::load_config_from_str("").unwrap();
        assert_eq!(config.service.name, "tidewire");
        assert_eq!(config.server.port, 8743);
    }
}
