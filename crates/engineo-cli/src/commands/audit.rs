//! `engineo audit` - inspect the audit trail.
//!
//! Reads the JSON-lines file written by the file backend. Console-only
//! configurations have no queryable trail.

use engineo_audit::{AuditEvent, AuditEventType};
use engineo_core::{EngineoConfig, StorageBackend};

pub fn run(
    config: &EngineoConfig,
    run_id: Option<&str>,
    event_type: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    if config.audit.storage.backend != StorageBackend::File {
        return Err(anyhow::anyhow!(
            "audit queries need the file backend (audit.storage.backend: file)"
        ));
    }
    let path = config
        .audit
        .storage
        .file_path
        .as_deref()
        .unwrap_or("audit.log");

    let wanted_type: Option<AuditEventType> = match event_type {
        Some(name) => Some(
            serde_json::from_value(serde_json::Value::String(name.to_string()))
                .map_err(|_| anyhow::anyhow!("unknown event type '{}'", name))?,
        ),
        None => None,
    };

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read audit log '{}': {}", path, e))?;

    let mut events: Vec<AuditEvent> = Vec::new();
    for (number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AuditEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) => tracing::warn!(line = number + 1, error = %e, "skipping malformed audit line"),
        }
    }

    events.retain(|e| {
        run_id.is_none_or(|r| e.run_id == r) && wanted_type.is_none_or(|t| e.event_type == t)
    });

    // Newest first, like the storage backends.
    events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    events.truncate(limit);

    if events.is_empty() {
        println!("no matching audit events");
        return Ok(());
    }
    for event in &events {
        println!("{}", event.to_log_line());
    }
    Ok(())
}
