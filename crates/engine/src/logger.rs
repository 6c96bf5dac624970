//! Structured, leveled log buffer handed to the caller at the end of a run.
//!
//! Every entry is also mirrored to `tracing` so hosts see the same events
//! in their regular logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::models::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
}

/// Accumulates the log of a single run.
#[derive(Debug, Default)]
pub struct RunLogger {
    entries: Vec<RunLogEntry>,
}

impl RunLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.append(LogLevel::Debug, message.into(), None);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.append(LogLevel::Warn, message.into(), None);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.append(LogLevel::Error, message.into(), None);
    }

    pub fn node_debug(&mut self, node: &Node, message: impl Into<String>) {
        self.append(LogLevel::Debug, message.into(), Some(node));
    }

    pub fn node_warn(&mut self, node: &Node, message: impl Into<String>) {
        self.append(LogLevel::Warn, message.into(), Some(node));
    }

    pub fn node_error(&mut self, node: &Node, message: impl Into<String>) {
        self.append(LogLevel::Error, message.into(), Some(node));
    }

    pub fn into_entries(self) -> Vec<RunLogEntry> {
        self.entries
    }

    fn append(&mut self, level: LogLevel, message: String, node: Option<&Node>) {
        match (level, node) {
            (LogLevel::Debug, Some(n)) => {
                debug!(node_id = %n.id, node_name = n.label(), "{message}")
            }
            (LogLevel::Warn, Some(n)) => {
                warn!(node_id = %n.id, node_name = n.label(), "{message}")
            }
            (LogLevel::Error, Some(n)) => {
                error!(node_id = %n.id, node_name = n.label(), "{message}")
            }
            (LogLevel::Debug, None) => debug!("{message}"),
            (LogLevel::Warn, None) => warn!("{message}"),
            (LogLevel::Error, None) => error!("{message}"),
        }

        self.entries.push(RunLogEntry {
            timestamp: Utc::now(),
            level,
            message,
            node_id: node.map(|n| n.id.clone()),
            node_name: node
                .map(|n| n.name.trim())
                .filter(|name| !name.is_empty())
                .map(str::to_owned),
        });
    }
}
