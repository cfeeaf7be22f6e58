use anyhow::{Context, Result};
use audio_companion::AudioTrack;
use clap::{Parser, Subcommand, ValueEnum};
use content_tree::ContentProvider;
use earmark_app::{AppConfig, AppState};
use earmark_cache::SharedBlobStore;
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;
use storage::ProgressStore;
use viewer_core::{
    classify_capability, DeviceTier, HardwareSignals, LoadProfile, NetworkClass, SessionPhase,
};

/// How long `open` waits for the document to reach the cache before exiting.
const CACHE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "earmark-cli")]
#[command(about = "Earmark listening-practice CLI")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Root of the local content tree.
    #[arg(long, global = true, value_name = "DIR")]
    content_root: Option<PathBuf>,
    /// Directory holding the reading history.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Document cache directory.
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
    /// Disable the document cache.
    #[arg(long, global = true)]
    no_cache: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a directory of the content tree as JSON.
    Ls {
        #[arg(value_name = "DIR", default_value = "")]
        dir: String,
    },
    /// Load a document as the viewer would and print a JSON summary.
    Open {
        #[arg(value_name = "PDF")]
        pdf: String,
        #[arg(long, value_enum, default_value_t = DeviceArg::Desktop)]
        device: DeviceArg,
        /// Logical CPU cores to report.
        #[arg(long)]
        cores: Option<u32>,
        /// Device memory to report, in GB.
        #[arg(long)]
        memory_gb: Option<f32>,
        #[arg(long, value_enum, default_value_t = NetworkArg::Fast)]
        network: NetworkArg,
    },
    /// Print or clear the reading history.
    History {
        #[arg(long)]
        clear: bool,
    },
    /// Inspect the document cache.
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Entry count, total size and lookup counters.
    Stats,
    /// Cached document keys.
    List,
    /// Drop one cached document.
    Remove {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Drop every cached document.
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeviceArg {
    Mobile,
    Tablet,
    Desktop,
}

impl From<DeviceArg> for DeviceTier {
    fn from(device: DeviceArg) -> Self {
        match device {
            DeviceArg::Mobile => Self::Mobile,
            DeviceArg::Tablet => Self::Tablet,
            DeviceArg::Desktop => Self::Desktop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NetworkArg {
    Fast,
    Slow,
}

impl From<NetworkArg> for NetworkClass {
    fn from(network: NetworkArg) -> Self {
        match network {
            NetworkArg::Fast => Self::Fast,
            NetworkArg::Slow => Self::Slow,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenOutput {
    path: String,
    page_count: u32,
    current_page: u32,
    visible_pages: Vec<u32>,
    is_lazy_loading: bool,
    from_cache: bool,
    related_audio: Vec<AudioTrack>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    if let Commands::Version = cli.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async {
        match cli.command {
            Commands::Ls { dir } => run_ls(&config, &dir).await,
            Commands::Open { pdf, device, cores, memory_gb, network } => {
                let tier = DeviceTier::from(device);
                let capability = classify_capability(&HardwareSignals {
                    logical_cores: cores,
                    memory_gb,
                    mobile: tier == DeviceTier::Mobile,
                });
                let profile = LoadProfile::new(tier, capability, network.into());
                run_open(&config, profile, &pdf).await
            }
            Commands::History { clear } => run_history(&config, clear),
            Commands::Cache { action } => run_cache(&config, action).await,
            Commands::Version => Ok(()),
        }
    })
}

/// Defaults, then the config file, then the environment, then flags.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    if let Some(root) = &cli.content_root {
        config.content_root = root.clone();
        config.origin_url = None;
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache.dir = dir.clone();
    }
    if cli.no_cache {
        config.cache.enabled = false;
    }

    tracing::debug!(
        content_root = %config.content_root.display(),
        origin = config.origin_url.as_deref(),
        data_dir = %config.data_dir.display(),
        cache_enabled = config.cache.enabled,
        "configuration resolved"
    );
    Ok(config)
}

async fn run_ls(config: &AppConfig, dir: &str) -> Result<()> {
    let content = config.content_provider()?;
    let listing = content
        .list_directory(dir)
        .await
        .with_context(|| format!("failed to list directory {dir:?}"))?;

    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

async fn run_open(config: &AppConfig, profile: LoadProfile, pdf: &str) -> Result<()> {
    let mut state = AppState::from_config(config, profile).await?;
    state.open_document(pdf).await.context("failed to open document")?;

    let viewer = state.viewer();
    if viewer.phase() != SessionPhase::Interactive {
        anyhow::bail!(
            "failed to load {pdf}: {}",
            viewer.last_error().unwrap_or("document did not become ready")
        );
    }

    let output = OpenOutput {
        path: viewer.path().unwrap_or(pdf).to_owned(),
        page_count: viewer.page_count().unwrap_or(0),
        current_page: viewer.current_page(),
        visible_pages: viewer.mounted_pages(),
        is_lazy_loading: viewer.is_lazy_loading(),
        from_cache: viewer.from_cache(),
        related_audio: state.related_audio().await?,
    };

    state.flush_cache_writes(tokio::time::Instant::now() + CACHE_FLUSH_TIMEOUT).await;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_history(config: &AppConfig, clear: bool) -> Result<()> {
    let mut store = ProgressStore::open(config.storage());

    if clear {
        store.clear_history().context("failed to clear reading history")?;
        println!("history cleared");
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(store.recent())?);
    Ok(())
}

async fn run_cache(config: &AppConfig, action: CacheCommand) -> Result<()> {
    let cache = open_cache(config).await?;

    match action {
        CacheCommand::Stats => {
            let stats = cache.stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        CacheCommand::List => {
            let mut keys = cache.list_keys().await;
            keys.sort();
            println!("{}", serde_json::to_string_pretty(&keys)?);
        }
        CacheCommand::Remove { key } => {
            cache.remove(&key).await.with_context(|| format!("failed to remove {key}"))?;
            println!("removed {key}");
        }
        CacheCommand::Clear => {
            cache.clear().await.context("failed to clear cache")?;
            println!("cache cleared");
        }
    }
    Ok(())
}

async fn open_cache(config: &AppConfig) -> Result<SharedBlobStore> {
    match earmark_cache::open_cache(&config.cache).await {
        Some(cache) => Ok(cache),
        None => anyhow::bail!("document cache is disabled"),
    }
}
