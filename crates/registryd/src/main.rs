// # registryd - Registry Update Daemon
//
// Thin integration layer around registry-core. All reconciliation and billing
// logic lives in the library; this binary only wires it up.
//
// The registryd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing tracing and the runtime
// 3. Building the entity store, DNS refresh queue and coordinator
// 4. Applying requests read from stdin, one JSON object per line
//
// ## Configuration
//
// - `REGISTRY_CONFIG_PATH`: Path to the JSON registry configuration (required)
// - `REGISTRY_STORE_PATH`: Ledger file path; overrides the configured store
// - `REGISTRY_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
// - `REGISTRY_RECOVER_LEDGER`: set to `true` to restore a corrupted ledger
//   from its backup, losing the last committed batch (default: false)
//
// ## Requests
//
// ```json
// {"command": "import", "domain": {...}, "billing_events": [...]}
// {"command": "update", "domain_name": "example.app", "registrar_id": "TheRegistrar",
//  "edits": {"add_nameservers": ["ns1.example.net"]}}
// ```
//
// Each request produces one JSON line on stdout.
//
// ## Example
//
// ```bash
// export REGISTRY_CONFIG_PATH=/etc/registry/config.json
// export REGISTRY_STORE_PATH=/var/lib/registry/ledger.json
//
// registryd < requests.jsonl
// ```

use anyhow::{Context, Result};
use registry_core::coordinator::{CoordinatorEvent, UpdateCoordinator, UpdateRequest};
use registry_core::queue::ChannelDnsQueue;
use registry_core::traits::{CommitBatch, EntityStore, SystemClock};
use registry_core::{FileEntityStore, MemoryEntityStore, RegistryConfig, StoreConfig};
use serde::Deserialize;
use std::env;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum RegistryExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<RegistryExitCode> for ExitCode {
    fn from(code: RegistryExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration
struct Config {
    registry: RegistryConfig,
    recover_ledger: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let config_path = env::var("REGISTRY_CONFIG_PATH").context(
            "REGISTRY_CONFIG_PATH is required. \
            Set it via: export REGISTRY_CONFIG_PATH=/etc/registry/config.json",
        )?;

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path))?;
        let mut registry: RegistryConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path))?;

        if let Ok(path) = env::var("REGISTRY_STORE_PATH") {
            registry.store = StoreConfig::File { path };
        }

        let recover_ledger = match env::var("REGISTRY_RECOVER_LEDGER") {
            Ok(value) => value
                .parse::<bool>()
                .with_context(|| format!("REGISTRY_RECOVER_LEDGER must be true or false. Got: {}", value))?,
            Err(_) => false,
        };

        Ok(Self {
            registry,
            recover_ledger,
            log_level: env::var("REGISTRY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.registry.validate()?;

        if let StoreConfig::File { path } = &self.registry.store
            && let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "Ledger parent directory does not exist: {}. \
                    Create it first: sudo mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "REGISTRY_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

/// One line of input
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum Command {
    /// Apply an update request
    Update(UpdateRequest),
    /// Commit a domain and its billing events as-is
    Import(CommitBatch),
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return RegistryExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return RegistryExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr; stdout carries the responses
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RegistryExitCode::ConfigError.into();
    }

    info!("Starting registryd");
    info!("Configuration loaded: {} tld(s)", config.registry.tlds.len());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RegistryExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            RegistryExitCode::RuntimeError
        } else {
            RegistryExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Build the entity store selected by the configuration
async fn create_store(config: &StoreConfig, recover_ledger: bool) -> Result<Box<dyn EntityStore>> {
    match config {
        StoreConfig::File { path } if recover_ledger => {
            warn!("Opening file entity store at {} with backup recovery enabled", path);
            Ok(Box::new(FileEntityStore::recover(path).await?))
        }
        StoreConfig::File { path } => {
            info!("Using file entity store at {}", path);
            Ok(Box::new(FileEntityStore::new(path).await?))
        }
        StoreConfig::Memory => {
            warn!("Using in-memory entity store; nothing survives a restart");
            Ok(Box::new(MemoryEntityStore::new()))
        }
    }
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let store = create_store(&config.registry.store, config.recover_ledger).await?;
    let (dns_queue, mut refreshes) = ChannelDnsQueue::new();

    let (coordinator, mut events) = UpdateCoordinator::new(
        store,
        Box::new(dns_queue),
        Box::new(SystemClock),
        config.registry,
    )?;

    // Zone publishing is out of process; log what would be published
    tokio::spawn(async move {
        while let Some(domain) = refreshes.recv().await {
            info!("DNS refresh requested for {}", domain);
        }
    });

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CoordinatorEvent::UpdateRejected { domain, error } => {
                    debug!("Rejected update of {}: {}", domain, error)
                }
                other => debug!("Coordinator event: {:?}", other),
            }
        }
    });

    info!("Ready to accept requests on stdin");

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let response = handle_line(&coordinator, &line).await;
                    println!("{}", response);
                }
                Some(Err(e)) => {
                    error!("Failed to read stdin: {}", e);
                    coordinator.shutdown().await?;
                    return Err(e.into());
                }
                None => {
                    info!("End of input");
                    break;
                }
            },

            signal = &mut shutdown => {
                info!("Received shutdown signal: {}", signal?);
                break;
            }
        }
    }

    coordinator.shutdown().await?;
    info!("Shutting down daemon");
    Ok(())
}

/// Apply one request line and render the response line
async fn handle_line(coordinator: &UpdateCoordinator, line: &str) -> serde_json::Value {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(e) => {
            warn!("Ignoring malformed request: {}", e);
            return serde_json::json!({ "status": "error", "error": format!("Malformed request: {}", e) });
        }
    };

    let result = match command {
        Command::Update(request) => coordinator
            .update(request)
            .await
            .and_then(|outcome| serde_json::to_value(outcome).map_err(Into::into)),
        Command::Import(batch) => {
            let domain = batch.domain.fully_qualified_name.clone();
            coordinator
                .import(batch)
                .await
                .map(|()| serde_json::json!({ "imported": domain }))
        }
    };

    match result {
        Ok(value) => serde_json::json!({ "status": "ok", "result": value }),
        Err(e) => serde_json::json!({ "status": "error", "error": e.to_string() }),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
