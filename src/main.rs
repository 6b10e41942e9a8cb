use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{debug, error};
use mimalloc::MiMalloc;

use geoprovd::{marshal, params, provider};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(name = "geoprovd", version, about = "Data provider registry daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the configuration descriptor of provider kinds as JSON
    Describe {
        /// Only describe this kind
        #[arg(long)]
        kind: Option<String>,
    },

    /// Bring up every provider listed in a configuration file
    Check {
        /// Provider configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Creation deadline per provider, in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let registry = match provider::Registry::with_builtin_factories() {
        Ok(r) => r,
        Err(e) => {
            error!("unable to register built-in providers: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Describe { kind } => describe(&registry, kind.as_deref()),
        Commands::Check { config, timeout } => check(&registry, config, timeout).await,
    }
}

fn describe(registry: &provider::Registry, kind: Option<&str>) -> ExitCode {
    let kinds: Vec<&str> = match kind {
        Some(k) => vec![k],
        None => registry.kinds(),
    };

    let mut descriptors = Vec::new();
    for k in kinds {
        match registry.descriptor(k) {
            Some(d) => descriptors.push(d),
            None => {
                eprintln!("{} unknown provider kind `{}`", "error:".red().bold(), k);
                return ExitCode::FAILURE;
            }
        }
    }

    match serde_json::to_string_pretty(&descriptors) {
        Ok(s) => {
            println!("{}", s);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("unable to serialize descriptors: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn check(registry: &provider::Registry, config: PathBuf, timeout: Option<u64>) -> ExitCode {
    let file = match marshal::ProvidersFile::read(&config).await {
        Ok(f) => f,
        Err(e) => {
            eprintln!(
                "{} unable to read {}: {}",
                "error:".red().bold(),
                config.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let mut configurables = params::configurables().clone();
    if let Some(secs) = timeout {
        configurables.creation_timeout = Duration::from_secs(secs);
    }
    debug!("{:?}", configurables);

    let report = provider::bring_up_with(registry, &file.providers, &configurables).await;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(_) => println!(
                "{} {} ({})",
                "  live".green().bold(),
                outcome.id,
                outcome.kind
            ),
            Err(e) => {
                println!(
                    "{} {} ({}): {}",
                    "failed".red().bold(),
                    outcome.id,
                    outcome.kind,
                    e
                );
                for violation in e.violations() {
                    println!("         {}", violation.to_string().yellow());
                }
            }
        }
    }

    println!(
        "{} of {} providers live",
        report.live_count(),
        report.outcomes.len()
    );

    for id in registry.provider_ids() {
        if let Err(e) = registry.shutdown_provider(&id) {
            debug!("{}", e);
        }
    }

    if report.all_live() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
