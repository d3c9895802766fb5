//! Audit storage backends.

use crate::error::AuditError;
use crate::event::AuditEvent;
use crate::logger::AuditFilter;
use async_trait::async_trait;
use engineo_core::config::audit::{AuditConfig, StorageBackend};
use std::sync::RwLock;
use uuid::Uuid;

/// Trait for audit storage backends.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Store an audit event.
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError>;

    /// Query audit events with filters.
    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError>;

    /// Count events matching a filter (ignores limit/offset).
    async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError>;

    /// Get an audit event by ID.
    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError>;
}

/// Create a storage backend based on configuration.
pub fn create_storage(config: &AuditConfig) -> Result<Box<dyn AuditStorage>, AuditError> {
    match config.storage.backend {
        StorageBackend::Console => Ok(Box::new(ConsoleStorage::new())),
        StorageBackend::File => {
            let path = config.storage.file_path.as_deref().unwrap_or("audit.log");
            if config.stdout {
                Ok(Box::new(DualStorage::new(path)?))
            } else {
                Ok(Box::new(FileStorage::new(path)?))
            }
        }
    }
}

fn matches(event: &AuditEvent, filter: &AuditFilter) -> bool {
    if let Some(ref project) = filter.project_id {
        if &event.project_id != project {
            return false;
        }
    }
    if let Some(ref run) = filter.run_id {
        if &event.run_id != run {
            return false;
        }
    }
    if let Some(ref playbook) = filter.playbook {
        if &event.playbook != playbook {
            return false;
        }
    }
    if let Some(event_type) = filter.event_type {
        if event.event_type != event_type {
            return false;
        }
    }
    if let Some(start) = filter.start_time {
        if event.occurred_at < start {
            return false;
        }
    }
    if let Some(end) = filter.end_time {
        if event.occurred_at > end {
            return false;
        }
    }
    true
}

fn sort_and_page(mut results: Vec<AuditEvent>, filter: &AuditFilter) -> Vec<AuditEvent> {
    let desc = filter.sort_desc.unwrap_or(true);
    results.sort_by(|a, b| {
        let ord = a.occurred_at.cmp(&b.occurred_at);
        if desc { ord.reverse() } else { ord }
    });

    if let Some(offset) = filter.offset {
        results = results.into_iter().skip(offset).collect();
    }
    if let Some(limit) = filter.limit {
        results.truncate(limit);
    }
    results
}

/// No-op storage for a disabled logger.
pub struct NullStorage;

impl NullStorage {
    /// Create a new null storage.
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStorage for NullStorage {
    async fn store(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(vec![])
    }

    async fn count(&self, _filter: AuditFilter) -> Result<usize, AuditError> {
        Ok(0)
    }

    async fn get(&self, _event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        Ok(None)
    }
}

/// Console storage (human-readable lines on stdout).
pub struct ConsoleStorage;

impl ConsoleStorage {
    /// Create a new console storage.
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStorage for ConsoleStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        println!("{}", event.to_log_line());
        Ok(())
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        // Console storage doesn't support querying
        Ok(vec![])
    }

    async fn count(&self, _filter: AuditFilter) -> Result<usize, AuditError> {
        Ok(0)
    }

    async fn get(&self, _event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        Ok(None)
    }
}

/// In-memory storage, used by tests and the library's embedded mode.
pub struct MemoryStorage {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut events = self
            .events
            .write()
            .map_err(|e| AuditError::Storage(format!("failed to acquire write lock: {}", e)))?;
        events.push(event);
        Ok(())
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::Storage(format!("failed to acquire read lock: {}", e)))?;
        let results: Vec<_> = events.iter().filter(|e| matches(e, &filter)).cloned().collect();
        Ok(sort_and_page(results, &filter))
    }

    async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::Storage(format!("failed to acquire read lock: {}", e)))?;
        Ok(events.iter().filter(|e| matches(e, &filter)).count())
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::Storage(format!("failed to acquire read lock: {}", e)))?;
        Ok(events.iter().find(|e| e.event_id == event_id).cloned())
    }
}

/// File storage (appends JSON lines to a log file).
pub struct FileStorage {
    path: String,
    // In-memory cache for querying; the file is the durable record.
    events: RwLock<Vec<AuditEvent>>,
}

impl FileStorage {
    /// Create a new file storage.
    pub fn new(path: &str) -> Result<Self, AuditError> {
        Ok(Self {
            path: path.to_string(),
            events: RwLock::new(Vec::new()),
        })
    }

    /// The log file path this storage appends to.
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        let json = serde_json::to_string(&event)?;

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;

        let mut events = self
            .events
            .write()
            .map_err(|e| AuditError::Storage(format!("failed to acquire write lock: {}", e)))?;
        events.push(event);

        Ok(())
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::Storage(format!("failed to acquire read lock: {}", e)))?;
        let results: Vec<_> = events.iter().filter(|e| matches(e, &filter)).cloned().collect();
        Ok(sort_and_page(results, &filter))
    }

    async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::Storage(format!("failed to acquire read lock: {}", e)))?;
        Ok(events.iter().filter(|e| matches(e, &filter)).count())
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        let events = self
            .events
            .read()
            .map_err(|e| AuditError::Storage(format!("failed to acquire read lock: {}", e)))?;
        Ok(events.iter().find(|e| e.event_id == event_id).cloned())
    }
}

/// Dual storage: file for the durable trail, console for visibility.
pub struct DualStorage {
    file: FileStorage,
    console: ConsoleStorage,
}

impl DualStorage {
    /// Create a new dual storage writing to the given file path.
    pub fn new(path: &str) -> Result<Self, AuditError> {
        Ok(Self {
            file: FileStorage::new(path)?,
            console: ConsoleStorage::new(),
        })
    }
}

#[async_trait]
impl AuditStorage for DualStorage {
    async fn store(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.console.store(event.clone()).await?;
        self.file.store(event).await
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.file.query(filter).await
    }

    async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError> {
        self.file.count(filter).await
    }

    async fn get(&self, event_id: Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.file.get(event_id).await
    }
}
