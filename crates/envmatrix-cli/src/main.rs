mod cmd;
mod output;
mod root;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::matrix::Credentials;
use envmatrix_core::config::Config;
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "envmatrix",
    about = "Compare required config vars across the local env, CircleCI, and Heroku apps",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest envmatrix.yaml, else built-in defaults)
    #[arg(long, global = true, env = "ENVMATRIX_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Heroku app to compare; repeat for several (overrides heroku.apps)
    #[arg(long = "app", value_name = "APP")]
    apps: Vec<String>,

    /// List only the required variables that are unset, per source
    #[arg(long)]
    missing: bool,

    /// Heroku Platform API key
    #[arg(long, env = "HEROKU_API_KEY", hide_env_values = true)]
    heroku_api_key: Option<String>,

    /// CircleCI personal API token
    #[arg(long, env = "CIRCLECI_PERSONAL_API_TOKEN", hide_env_values = true)]
    circleci_token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let path = root::resolve_config(cli.config.as_deref());
    if let Some(p) = &path {
        tracing::debug!(path = %p.display(), "loading config");
    }
    let mut config = Config::load_or_default(path.as_deref()).context("failed to load config")?;
    if !cli.apps.is_empty() {
        config.heroku.apps = cli.apps;
    }

    match cli.command {
        Some(Commands::Config { subcommand }) => cmd::config::run(&config, subcommand, cli.json),
        None => cmd::matrix::run(
            &config,
            Credentials {
                heroku_api_key: cli.heroku_api_key,
                circleci_token: cli.circleci_token,
            },
            cli.missing,
            cli.json,
        ),
    }
}
