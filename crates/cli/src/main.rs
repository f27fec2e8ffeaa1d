use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use staybook_kernel::settings::Settings;

#[derive(Parser, Debug)]
#[command(author, version, about = "Staybook rental marketplace backend")]
struct Cli {
    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// local, staging or production
    #[arg(long = "env", global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server until ctrl-c or SIGTERM
    Serve,
    /// Load the configuration, print the effective values, and exit
    CheckConfig,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        if self.config_dir.is_none() && self.environment.is_none() {
            return Settings::load();
        }

        let dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };
        let environment = self.environment.as_deref().unwrap_or("local");
        Settings::load_from(&dir, environment)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli
        .settings()
        .with_context(|| "failed to load Staybook settings")?;

    match cli.command {
        Command::CheckConfig => {
            print_settings(&settings);
            Ok(())
        }
        Command::Serve => {
            staybook_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "staybook starting");

            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to build tokio runtime")?
                .block_on(staybook_app::run(settings))
        }
    }
}

fn print_settings(settings: &Settings) {
    println!("environment: {:?}", settings.environment);
    println!(
        "server: {}:{} (timeout {} ms)",
        settings.server.host, settings.server.port, settings.server.request_timeout_ms
    );
    match &settings.database.journal_dir {
        Some(dir) => println!(
            "storage: journal at {} (fsync: {})",
            dir.display(),
            settings.database.fsync
        ),
        None => println!("storage: memory only"),
    }
    println!(
        "telemetry: {:?} format, filter {:?}",
        settings.telemetry.log_format, settings.telemetry.filter
    );
    println!(
        "auth: session ttl {} s, bcrypt cost {}",
        settings.auth.session_ttl_secs, settings.auth.bcrypt_cost
    );
    println!(
        "bookings: completion sweep every {} s",
        settings.bookings.completion_sweep_secs
    );
}
