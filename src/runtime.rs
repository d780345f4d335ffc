//! Process-level wiring: logging, signals, startup and the fatal path.
//!
//! Every way out of [`run`] is treated as fatal: both endpoints are
//! disconnected best-effort and the process should exit non-zero.

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::bridge::endpoint::Endpoint;
use crate::bridge::orchestrator::Relay;
use crate::common::reconnect::ReconnectConfig;
use crate::common::ChatLog;
use crate::config::{self, Config, LoggingConfig};
use crate::discord::DiscordEndpoint;
use crate::grid::{GridClient, GridEndpoint};

/// Why the relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Connecting or subscribing failed at startup.
    StartupFailed,
    /// A termination signal arrived.
    Signal,
    /// The connection supervisor ended or panicked.
    SupervisorStopped,
    /// A panic escaped somewhere in the process.
    Fault,
}

impl Exit {
    /// Process exit code. The relay never terminates normally.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::FAILURE
    }
}

/// Install the fmt subscriber. `debug` raises the default level to DEBUG.
pub fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let result = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init();
    if let Err(e) = result {
        debug!("Tracing subscriber already installed: {}", e);
    }
}

/// Latched once an uncaught fault has been seen.
#[derive(Debug, Clone)]
pub struct FaultSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for FaultSignal {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }
}

impl FaultSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once [`raise`](Self::raise) has been called.
    pub async fn raised(&self) {
        let mut rx = self.tx.subscribe();
        let closed = rx.wait_for(|raised| *raised).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Report panics through tracing and raise `faults`, then run the default hook.
///
/// Tokio catches panics in spawned tasks, so the hook is the only place every
/// uncaught fault passes through.
pub fn install_panic_hook(faults: FaultSignal) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        error!("Fatal error: {}", panic_info);
        faults.raise();
        default_hook(panic_info);
    }));
}

/// Resolve on Ctrl+C, SIGTERM, SIGUSR1 or SIGUSR2.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let unix_signals = async {
        use signal::unix::{signal, SignalKind};

        let kinds = [
            ("SIGTERM", SignalKind::terminate()),
            ("SIGUSR1", SignalKind::user_defined1()),
            ("SIGUSR2", SignalKind::user_defined2()),
        ];
        let mut waits = Vec::new();
        for (name, kind) in kinds {
            match signal(kind) {
                Ok(mut stream) => waits.push(Box::pin(async move {
                    stream.recv().await;
                    name
                })),
                Err(e) => error!("Failed to install {} handler: {}", name, e),
            }
        }
        if waits.is_empty() {
            return std::future::pending::<&str>().await;
        }
        futures::future::select_all(waits).await.0
    };

    #[cfg(not(unix))]
    let unix_signals = std::future::pending::<&str>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        name = unix_signals => info!("Received {}", name),
    }
}

fn open_chat_log(logging: &LoggingConfig) -> anyhow::Result<Option<Arc<ChatLog>>> {
    let Some(path) = logging.chat_log.as_ref() else {
        return Ok(None);
    };
    let log = ChatLog::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open chat log {}: {}", path.display(), e))?;
    info!("Logging chat to {}", path.display());
    Ok(Some(Arc::new(log)))
}

/// Build both endpoints and pair them.
pub fn build_relay(config: &Config, grid: Arc<dyn GridClient>) -> anyhow::Result<Relay> {
    let chat_log = open_chat_log(&config.logging)?;

    let grid_endpoint: Arc<dyn Endpoint> = Arc::new(GridEndpoint::new(grid, &config.grid, chat_log.clone()));
    let discord_endpoint: Arc<dyn Endpoint> = Arc::new(DiscordEndpoint::new(&config.discord, chat_log));

    Ok(Relay::pair(
        grid_endpoint,
        discord_endpoint,
        ReconnectConfig::new(config.relay.reconnect_delay),
    ))
}

/// Start the relay and supervise it until `shutdown` resolves, a fault is
/// raised or the supervisor dies, then disconnect everything.
pub async fn run_until<F>(relay: Arc<Relay>, shutdown: F, faults: &FaultSignal) -> Exit
where
    F: Future<Output = ()>,
{
    if let Err(e) = relay.start().await {
        error!("Failed to start relay: {}", e);
        relay.shutdown().await;
        return Exit::StartupFailed;
    }
    info!("Relay running");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut supervisor = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.supervise(shutdown_rx).await })
    };

    let exit = tokio::select! {
        biased;
        _ = shutdown => {
            info!("Shutdown signal received - disconnecting...");
            Exit::Signal
        }
        _ = faults.raised() => {
            error!("Uncaught fault - disconnecting...");
            Exit::Fault
        }
        result = &mut supervisor => {
            match result {
                Ok(()) => warn!("Connection supervisor stopped"),
                Err(e) => error!("Connection supervisor panicked: {}", e),
            }
            Exit::SupervisorStopped
        }
    };

    if let Err(e) = shutdown_tx.send(true) {
        debug!("Supervisor already gone: {}", e);
    }
    supervisor.abort();
    relay.shutdown().await;

    info!("Exiting...");
    exit
}

/// Run the bridge with an already loaded configuration.
///
/// `faults` should be the signal handed to [`install_panic_hook`].
pub async fn run(config: Config, grid: Arc<dyn GridClient>, faults: FaultSignal) -> ExitCode {
    info!("gridcord v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("  Grid account: {} {}", config.grid.first_name, config.grid.last_name);
    info!("  Discord guild: {}", config.discord.guild_id);
    info!("  Topics: {}", config.grid.groups.len());

    let relay = match build_relay(&config, grid) {
        Ok(relay) => Arc::new(relay),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    run_until(relay, shutdown_signal(), &faults).await.exit_code()
}

/// Load configuration from the environment (and `.env`), set up logging and run.
pub async fn run_from_env(grid: Arc<dyn GridClient>) -> ExitCode {
    let config = match config::load_from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(false);
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.logging.debug);
    let faults = FaultSignal::new();
    install_panic_hook(faults.clone());
    run(config, grid, faults).await
}
