// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cabline - WhatsApp cab booking service.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use cabline_config::CablineConfig;
use clap::{Parser, Subcommand};

/// Cabline - WhatsApp cab booking service.
#[derive(Parser, Debug)]
#[command(name = "cabline", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook server, admin API and assignment sweep.
    Serve,
    /// Load and validate the configuration, then print a summary.
    CheckConfig,
    /// Check the database and every external service.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> Option<CablineConfig> {
    let loaded = match path {
        Some(path) => cabline_config::load_and_validate_path(path),
        None => cabline_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            cabline_config::render_errors(&errors);
            None
        }
    }
}

/// One line per section; secrets are reported as set or unset only.
fn config_summary(config: &CablineConfig) -> Vec<String> {
    let set = |value: &Option<String>| if value.is_some() { "set" } else { "unset" };
    vec![
        format!(
            "service     name={} log_level={} utc_offset_minutes={}",
            config.service.name, config.service.log_level, config.service.utc_offset_minutes
        ),
        format!("storage     database_path={}", config.storage.database_path),
        format!(
            "whatsapp    access_token={} app_secret={} verify_token={}",
            set(&config.whatsapp.access_token),
            set(&config.whatsapp.app_secret),
            set(&config.whatsapp.verify_token)
        ),
        format!(
            "maps        api_key={} localities={}",
            set(&config.maps.api_key),
            config.maps.service_localities.join(", ")
        ),
        format!(
            "gateway     listen={}:{} bearer_token={}",
            config.gateway.host,
            config.gateway.port,
            set(&config.gateway.bearer_token)
        ),
        format!(
            "booking     immediate_window_minutes={} tax_rate_percent={} admin_phones={}",
            config.booking.immediate_window_minutes,
            config.booking.tax_rate_percent,
            config.booking.admin_phones.len()
        ),
        format!(
            "assignment  sweep_interval_secs={} lookahead_minutes={}",
            config.assignment.sweep_interval_secs, config.assignment.lookahead_minutes
        ),
        format!(
            "payment     upi_vpa={} webhook_secret={}",
            config.payment.upi_vpa,
            set(&config.payment.webhook_secret)
        ),
        format!(
            "email       smtp_host={}",
            config.email.smtp_host.as_deref().unwrap_or("unset")
        ),
    ]
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(config) = load_config(cli.config.as_ref()) else {
        return ExitCode::FAILURE;
    };

    match cli.command {
        Some(Commands::Serve) => {
            serve::init_tracing(&config.service.log_level);
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        }
        Some(Commands::CheckConfig) => {
            println!("cabline: configuration is valid");
            for line in config_summary(&config) {
                println!("  {line}");
            }
        }
        Some(Commands::Doctor { plain }) => match doctor::run_doctor(&config, plain).await {
            Ok(0) => {}
            Ok(_) => return ExitCode::FAILURE,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            println!("cabline: use --help for available commands");
        }
    }
    ExitCode::SUCCESS
}
