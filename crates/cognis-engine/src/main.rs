//! cognis — run the cognitive-state simulation core
//!
//! Usage:
//!   cognis --ticks 20 --sentiment 0.4
//!   cognis --state ./cognis-state.json --drive-secs 10
//!   cognis --dump-config > cognis.toml

use clap::Parser;
use cognis_engine::persist::{FileStore, Persister, StateStore};
use cognis_engine::version::SCHEMA_VERSION;
use cognis_engine::{BackgroundDriver, CognitiveEngine, CoreState, EngineConfig, EngineHandle, Interaction};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cognis", about = "Cognitive-state simulation core")]
struct Cli {
    /// Path to config file (TOML)
    #[arg(long, default_value = "cognis.toml")]
    config: PathBuf,

    /// Dump default config as TOML and exit.
    #[arg(long)]
    dump_config: bool,

    /// State file. Overrides `persistence.path` from the config.
    #[arg(long)]
    state: Option<PathBuf>,

    /// PRNG seed. Overrides `seed` from the config.
    #[arg(long)]
    seed: Option<u64>,

    /// Interactions to run.
    #[arg(long, default_value_t = 0)]
    ticks: u64,

    /// Sentiment for every interaction, in [-1, 1].
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    sentiment: f64,

    /// Run the background driver for this many seconds.
    #[arg(long, default_value_t = 0)]
    drive_secs: u64,

    /// Also write daily-rotated logs to this directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Show version and persisted schema version, then exit
    #[arg(long = "version")]
    show_version: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.show_version {
        println!("cognis v{}", env!("CARGO_PKG_VERSION"));
        println!("state schema version: {}", SCHEMA_VERSION);
        return Ok(());
    }

    if cli.dump_config {
        println!("{}", EngineConfig::default().to_toml());
        return Ok(());
    }

    let _log_guard = init_tracing(cli.log_dir.as_deref());

    let mut config = EngineConfig::load(&cli.config);
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(path) = cli.state.clone() {
        config.persistence.path = Some(path);
    }

    let (state, persister) = match config.persistence.path.clone() {
        Some(path) => {
            let store: Arc<dyn StateStore> = Arc::new(FileStore::new(&path));
            let state = match store.load().await? {
                Some(persisted) => {
                    info!(
                        "Restored state from {} (iteration {}, saved {})",
                        path.display(),
                        persisted.state.iteration(),
                        persisted.saved_at
                    );
                    persisted.state
                }
                None => {
                    info!("No state at {}, starting fresh", path.display());
                    CoreState::default()
                }
            };
            let persister = Arc::new(Persister::spawn(store, config.persistence.clone()));
            (state, Some(persister))
        }
        None => (CoreState::default(), None),
    };

    let interval = Duration::from_millis(config.driver.tick_interval_ms);
    let mut handle = EngineHandle::new(CognitiveEngine::from_state(state, config));
    if let Some(p) = &persister {
        handle = handle.with_persister(p.clone());
    }

    for _ in 0..cli.ticks {
        let report = handle.interact(Interaction::new(cli.sentiment, 0.0, 0.0)).await;
        if let Some(decision) = report.quantum.volitional {
            info!("tick {}: volitional collapse toward {}", report.iteration, decision.basis);
        }
    }

    if cli.drive_secs > 0 {
        let cancel = CancellationToken::new();
        let driver = BackgroundDriver::spawn(handle.clone(), interval, cancel.clone());
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(cli.drive_secs)) => {}
            _ = tokio::signal::ctrl_c() => warn!("Interrupted"),
        }
        let ticks = driver.stop().await;
        info!("Background driver ran {} ticks", ticks);
    }

    if let Some(p) = &persister {
        p.shutdown().await;
    }

    println!("{}", serde_json::to_string_pretty(&handle.snapshot().await)?);
    Ok(())
}

fn init_tracing(log_dir: Option<&std::path::Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cognis=info,cognis_engine=info".into());
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cognis.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}
