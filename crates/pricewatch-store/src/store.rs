//! Threshold configuration store.
//!
//! Concurrent `set` calls for the same client are serialized by the
//! map's entry lock: a replacement is committed as a whole (all fields
//! plus a version bump) under that lock, so the last committed write
//! wins and readers never observe a half-applied record.

use crate::error::{StoreError, StoreResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use pricewatch_core::{ClientId, Price, Symbol, ThresholdConfig};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Per-client threshold configuration store.
pub struct ThresholdStore {
    entries: DashMap<ClientId, ThresholdConfig>,
    /// Snapshot file carrying records across restarts. None = in-memory only.
    snapshot_path: Option<PathBuf>,
    /// Serializes snapshot writes; the in-memory record stays authoritative.
    persist_lock: Mutex<()>,
}

impl ThresholdStore {
    /// Create an in-memory store with no snapshot file.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            snapshot_path: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Create a store backed by a JSON snapshot file.
    ///
    /// A missing file is not an error; it is created on the first
    /// successful `set`.
    pub fn with_snapshot(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = DashMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let records: BTreeMap<String, ThresholdConfig> = serde_json::from_str(&content)?;
            for (client, config) in records {
                entries.insert(ClientId::new(client), config);
            }
            info!(path = %path.display(), clients = entries.len(), "Loaded threshold snapshot");
        } else {
            debug!(path = %path.display(), "No threshold snapshot found, starting empty");
        }

        Ok(Self {
            entries,
            snapshot_path: Some(path),
            persist_lock: Mutex::new(()),
        })
    }

    /// Get the stored configuration for a client.
    ///
    /// Never fails on absence: returns the hard-coded fallback when no
    /// record exists, without inserting it.
    pub fn get(&self, client: &ClientId) -> ThresholdConfig {
        self.entries
            .get(client)
            .map(|entry| entry.clone())
            .unwrap_or_else(ThresholdConfig::fallback)
    }

    /// Replace a client's configuration.
    ///
    /// Validates before touching stored state: a non-empty symbol and
    /// `lower <= upper`, or the stored record is left untouched and the
    /// violation is returned. On success all three fields are replaced
    /// and the version is bumped (a first write commits version 1).
    pub fn set(
        &self,
        client: &ClientId,
        symbol: &str,
        lower: Price,
        upper: Price,
    ) -> StoreResult<ThresholdConfig> {
        let symbol =
            Symbol::parse(symbol).map_err(|_| StoreError::InvalidSymbol(symbol.to_string()))?;
        if lower > upper {
            return Err(StoreError::InvalidBounds {
                lower: lower.inner(),
                upper: upper.inner(),
            });
        }

        let committed = match self.entries.entry(client.clone()) {
            Entry::Occupied(mut occupied) => {
                let config = ThresholdConfig {
                    symbol,
                    lower_bound: lower,
                    upper_bound: upper,
                    version: occupied.get().version + 1,
                };
                occupied.insert(config.clone());
                config
            }
            Entry::Vacant(vacant) => {
                let config = ThresholdConfig {
                    symbol,
                    lower_bound: lower,
                    upper_bound: upper,
                    version: 1,
                };
                vacant.insert(config.clone());
                config
            }
        };

        debug!(
            client = %client,
            symbol = %committed.symbol,
            version = committed.version,
            "Threshold configuration replaced"
        );

        self.persist();
        Ok(committed)
    }

    /// Distinct symbols currently configured across all clients.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .entries
            .iter()
            .map(|entry| entry.symbol.clone())
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the full record map to the snapshot file, if one is set.
    ///
    /// Failures are logged, never propagated: the in-memory record is
    /// authoritative and a lost snapshot only costs restart continuity.
    fn persist(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };

        let _guard = self.persist_lock.lock();
        let records: BTreeMap<String, ThresholdConfig> = self
            .entries
            .iter()
            .map(|entry| (entry.key().as_str().to_string(), entry.value().clone()))
            .collect();

        match serde_json::to_string_pretty(&records) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    warn!(path = %path.display(), error = %e, "Failed to write threshold snapshot");
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to serialize threshold snapshot");
            }
        }
    }

    /// Snapshot file path, if configured.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }
}

impl Default for ThresholdStore {
    fn default() -> Self {
        Self::new()
    }
}
