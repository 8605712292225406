// # File Entity Store
//
// File-based implementation of EntityStore with crash recovery.
//
// ## Purpose
//
// Persists committed domains and the billing ledger across restarts.
//
// ## Crash Recovery
//
// - Atomic writes: every commit writes the whole ledger to a temporary file,
//   then renames it over the ledger file
// - Automatic backup: keeps a .backup of the previous ledger
// - Fail closed: a ledger that does not parse refuses to open
// - Recovery: `recover` falls back to the backup explicitly, losing the last
//   committed batch
//
// A commit that fails to write leaves both the file and the in-memory view
// untouched, so a batch is never half-visible.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "domains": [ { "fully_qualified_name": "example.app", ... } ],
//   "billing_events": [ { "type": "charge", "id": "...", ... } ]
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::billing::{BillingEvent, BillingEventId, Charge};
use crate::error::{Error, Result};
use crate::model::DomainSnapshot;
use crate::state::ledger::Ledger;
use crate::traits::entity_store::{CommitBatch, EntityStore};

/// Ledger file format version
const LEDGER_FILE_VERSION: &str = "1.0";

/// File-based entity store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use registry_core::state::FileEntityStore;
/// use registry_core::traits::EntityStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileEntityStore::new("/var/lib/registry/ledger.json").await?;
///
///     let domain = store.load_domain("example.app").await?;
///     println!("{:?}", domain);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileEntityStore {
    path: PathBuf,
    ledger: Arc<RwLock<Ledger>>,
}

/// Serializable ledger file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct LedgerFileFormat {
    version: String,
    #[serde(default)]
    domains: Vec<DomainSnapshot>,
    #[serde(default)]
    billing_events: Vec<BillingEvent>,
}

impl FileEntityStore {
    /// Open or create a file entity store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing ledger file, or start empty if there is none
    ///
    /// A ledger file that exists but does not parse is an error; the store
    /// never starts empty over committed billing events. Use
    /// [`FileEntityStore::recover`] to fall back to the backup explicitly.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = Self::prepare(path.as_ref()).await?;

        let ledger = match Self::load(&path).await {
            Ok(ledger) => ledger,
            Err(Error::Json(e)) => {
                return Err(Error::entity_store(format!(
                    "Ledger file {} is corrupted: {}. Restore it or recover from {}",
                    path.display(),
                    e,
                    Self::backup_path(&path).display()
                )));
            }
            Err(e) => return Err(e),
        };
        tracing::debug!(
            "Loaded ledger from file: {} domains, {} billing events",
            ledger.domain_count(),
            ledger.billing_event_count()
        );

        Ok(Self {
            path,
            ledger: Arc::new(RwLock::new(ledger)),
        })
    }

    /// Open a file entity store, restoring a corrupted ledger from its backup
    ///
    /// The backup holds the ledger as it was before the last commit, so that
    /// commit is lost. Fails if the ledger is corrupted and the backup is
    /// missing or unusable.
    pub async fn recover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = Self::prepare(path.as_ref()).await?;

        let ledger = match Self::load(&path).await {
            Ok(ledger) => ledger,
            Err(Error::Json(e)) => Self::load_backup(&path, e).await?,
            Err(e) => return Err(e),
        };

        Ok(Self {
            path,
            ledger: Arc::new(RwLock::new(ledger)),
        })
    }

    /// Create the ledger directory if needed
    async fn prepare(path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create ledger directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(path.to_path_buf())
    }

    /// Load the backup of a corrupted ledger and restore it over the ledger
    async fn load_backup(path: &Path, cause: serde_json::Error) -> Result<Ledger> {
        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            return Err(Error::entity_store(format!(
                "Ledger file {} is corrupted ({}) and no backup exists",
                path.display(),
                cause
            )));
        }

        let ledger = Self::load(&backup_path).await.map_err(|backup_err| {
            Error::entity_store(format!(
                "Ledger file {} is corrupted ({}) and its backup is unusable: {}",
                path.display(),
                cause,
                backup_err
            ))
        })?;

        tracing::error!(
            "Ledger file {} is corrupted ({}). Recovered {} billing events from backup; \
             the last committed batch is lost",
            path.display(),
            cause,
            ledger.billing_event_count()
        );

        fs::copy(&backup_path, path).await.map_err(|e| {
            Error::entity_store(format!(
                "Failed to restore ledger file {} from backup: {}",
                path.display(),
                e
            ))
        })?;

        Ok(ledger)
    }

    /// Load the ledger from file
    async fn load(path: &Path) -> Result<Ledger> {
        if !path.exists() {
            tracing::debug!("Ledger file does not exist: {}", path.display());
            return Ok(Ledger::default());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::entity_store(format!(
                "Failed to read ledger file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: LedgerFileFormat = serde_json::from_str(&content)?;

        if file.version != LEDGER_FILE_VERSION {
            tracing::warn!(
                "Ledger file version mismatch: expected {}, got {}. Attempting to load anyway.",
                LEDGER_FILE_VERSION,
                file.version
            );
        }

        Ok(Ledger::from_parts(file.domains, file.billing_events))
    }

    /// Write a ledger to file atomically
    async fn write(&self, ledger: &Ledger) -> Result<()> {
        let (domains, billing_events) = ledger.to_parts();
        let file = LedgerFileFormat {
            version: LEDGER_FILE_VERSION.to_string(),
            domains,
            billing_events,
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await.map_err(|e| {
                Error::entity_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.write_all(json.as_bytes()).await.map_err(|e| {
                Error::entity_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.sync_all().await.map_err(|e| {
                Error::entity_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::entity_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Ledger written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl EntityStore for FileEntityStore {
    async fn load_domain(&self, fully_qualified_name: &str) -> Result<Option<DomainSnapshot>> {
        let guard = self.ledger.read().await;
        Ok(guard.domain(fully_qualified_name).cloned())
    }

    async fn load_charge(&self, id: &BillingEventId) -> Result<Option<Charge>> {
        let guard = self.ledger.read().await;
        Ok(guard.charge(id).cloned())
    }

    async fn billing_events_for(&self, fully_qualified_name: &str) -> Result<Vec<BillingEvent>> {
        let guard = self.ledger.read().await;
        Ok(guard.events_for(fully_qualified_name))
    }

    async fn commit(&self, batch: &CommitBatch) -> Result<()> {
        // Hold the write lock across the file write so commits are serialized
        let mut guard = self.ledger.write().await;

        let mut next = guard.clone();
        next.apply(batch)?;
        self.write(&next).await?;

        *guard = next;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        // Every commit is written through
        Ok(())
    }
}
