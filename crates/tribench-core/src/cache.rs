use crate::backend::SqlBackend;
use crate::model::Row;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

struct CacheRecord {
    rows: Vec<Row>,
    stored_at: Instant,
}

/// Read-through cache over `SqlBackend::execute`, keyed by exact query
/// text. A record older than the TTL is treated as absent: the lookup
/// falls through to live execution and overwrites it. Writes to the
/// underlying store never pass through here, so a backing-store
/// mutation stays invisible to cached readers for up to TTL seconds.
///
/// Syntactically different but semantically identical queries never
/// share an entry.
pub struct ResultCache {
    backend: Arc<dyn SqlBackend>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheRecord>>,
}

impl ResultCache {
    pub fn new(backend: Arc<dyn SqlBackend>) -> Self {
        Self::with_ttl(backend, DEFAULT_TTL)
    }

    pub fn with_ttl(backend: Arc<dyn SqlBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn execute(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        // Lock held across execution so check-then-fill stays atomic.
        let mut entries = self.entries.lock().unwrap();

        if let Some(record) = entries.get(sql) {
            if record.stored_at.elapsed() < self.ttl {
                debug!(query = sql, "result cache hit");
                return Ok(record.rows.clone());
            }
        }

        let rows = self.backend.execute(sql)?;
        entries.insert(
            sql.to_string(),
            CacheRecord {
                rows: rows.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(rows)
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}
