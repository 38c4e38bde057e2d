/*
[INPUT]:  CLI arguments, YAML listener configuration, OS shutdown signals
[OUTPUT]: Credential diagnostics or a running webhook listener with graceful shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use finlink_cli::{credentials, serve, ListenerConfig};

#[derive(Parser, Debug)]
#[command(name = "finlink", version, about = "finlink API credential check and webhook listener")]
struct Cli {
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve credentials through the default chain and report the source
    CheckCredentials {
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        #[arg(long = "credentials-file", value_name = "PATH")]
        credentials_file: Option<PathBuf>,
    },
    /// Run the webhook listener
    Listen {
        #[arg(long = "config", value_name = "PATH")]
        config_path: PathBuf,
        /// Validate the configuration and exit
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    match args.command {
        Command::CheckCredentials {
            profile,
            credentials_file,
        } => {
            let chain = credentials::build_chain(profile, credentials_file);
            match credentials::check(&chain) {
                Ok(report) => {
                    println!("{report}");
                    Ok(())
                }
                Err(err) => {
                    error!(error = %format!("{err:#}"), "no usable credentials");
                    Err(err)
                }
            }
        }
        Command::Listen {
            config_path,
            dry_run,
        } => {
            info!(config_path = %config_path.display(), dry_run, "starting finlink listener");

            let config = load_config(&config_path)?;
            config.webhook_config().context("validate webhook settings")?;
            info!(bind = %config.bind, path = %config.path, "configuration loaded");

            if dry_run {
                info!("dry-run requested; configuration validated");
                return Ok(());
            }

            let shutdown = CancellationToken::new();
            setup_signal_handlers(shutdown.clone());

            serve(&config, shutdown).await?;
            info!("shutdown complete");
            Ok(())
        }
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: &PathBuf) -> Result<ListenerConfig> {
    let path_str = path
        .to_str()
        .context("config path must be valid utf-8")?;
    ListenerConfig::from_file(path_str).context("load config")
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
