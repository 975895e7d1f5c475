use anyhow::{anyhow, Context, Result};
use clap::Parser;
use mpsync_core::{default_port, Pattern, SyncConfig, Synchronizer};
use mpsync_remote_serial::{SerialRemote, DEFAULT_BAUD, DEFAULT_TIMEOUT};
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mpsync", version, about = "Continuously synchronize a folder to a MicroPython board")]
struct Cli {
    /// Folder to synchronize. Defaults to the current working directory.
    #[arg(short, long)]
    folder: Option<PathBuf>,

    /// Serial port of the MicroPython board.
    #[arg(short, long)]
    port: Option<PathBuf>,

    /// Log every lifecycle and per-file decision.
    #[arg(short, long)]
    verbose: bool,

    /// Optional YAML config file; flags given on the command line win.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Glob (relative to the folder) to leave out; repeatable.
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Upload every existing file once before watching.
    #[arg(long)]
    initial_sync: bool,

    #[arg(long, default_value_t = DEFAULT_BAUD)]
    baud: u32,
}

impl Cli {
    fn into_config(self) -> Result<SyncConfig> {
        let mut cfg = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| anyhow!("read config {} failed: {e}", path.display()))?;
                SyncConfig::from_yaml(&text)?
            }
            None => {
                let cwd = std::env::current_dir().context("current directory")?;
                SyncConfig::new(cwd, default_port())
            }
        };
        if let Some(folder) = self.folder {
            cfg.folder = folder;
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        cfg.verbose |= self.verbose;
        cfg.initial_sync |= self.initial_sync;
        cfg.exclude.extend(self.exclude.into_iter().map(Pattern));
        Ok(cfg)
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug and the default
/// shows only what was copied, created or deleted plus retry notices.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let baud = cli.baud;
    let cfg = cli.into_config()?;
    init_tracing(cfg.verbose);

    let remote = SerialRemote::new(baud, DEFAULT_TIMEOUT);
    let sync = Synchronizer::start(&cfg, remote)?;
    info!(
        "Start syncing folder '{}' to board at '{}'",
        cfg.folder.display(),
        cfg.port.display()
    );

    tokio::signal::ctrl_c().await?;
    info!("Stopping");
    let pending = sync.stop().await?;
    if pending > 0 {
        info!("{pending} changes were not synced");
    }
    Ok(())
}
