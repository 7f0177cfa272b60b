//! Identifiers and market-data value objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisId(Uuid);

impl AnalysisId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (e.g. one loaded from storage)
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AnalysisId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable description of the stock under analysis
///
/// A snapshot is attached to an analysis at creation time and never
/// changes afterwards; `data_as_of` records how fresh the underlying
/// market data was when the run was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub symbol: String,
    pub name: String,
    pub data_as_of: DateTime<Utc>,
}

impl StockSnapshot {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            data_as_of: Utc::now(),
        }
    }

    pub fn with_data_as_of(mut self, at: DateTime<Utc>) -> Self {
        self.data_as_of = at;
        self
    }
}

/// Data handed to analyst agents alongside the snapshot
///
/// The engine treats the payload as opaque; concrete `AgentPort`
/// implementations decide which entries they read (price history,
/// indicators, news, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataBundle {
    pub snapshot: Option<StockSnapshot>,
    pub payload: HashMap<String, serde_json::Value>,
}

impl DataBundle {
    pub fn new(snapshot: StockSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            payload: HashMap::new(),
        }
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn entry(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }
}
