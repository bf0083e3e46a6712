// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail for custody-backed operations.
//!
//! Every submission that leaves the service (claims, transfers,
//! redemptions, mining solutions) is appended to a daily JSONL file so
//! operators can reconstruct what was sent on whose behalf.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::custody::Chain;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ClaimSubmitted,
    TransferSubmitted,
    RedemptionSubmitted,
    SolutionFound,
    SolutionSubmitted,
    AddressRegistered,
    DonationSubmitted,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub vault_account_id: Option<String>,
    pub chain: Option<Chain>,
    pub address: Option<String>,
    /// Additional details as JSON.
    pub details: Option<serde_json::Value>,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            vault_account_id: None,
            chain: None,
            address: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_vault(mut self, vault_account_id: impl Into<String>, chain: Chain) -> Self {
        self.vault_account_id = Some(vault_account_id.into());
        self.chain = Some(chain);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only JSONL audit store rooted at the data directory.
#[derive(Debug, Clone)]
pub struct AuditStore {
    root: PathBuf,
}

impl AuditStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_for(&self, date: &str) -> PathBuf {
        self.root.join("audit").join(format!("{date}.jsonl"))
    }

    /// Append an event to today's log file.
    pub fn log(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.file_for(&date);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Read all events logged on a specific date (`YYYY-MM-DD`).
    pub fn read_events(&self, date: &str) -> Result<Vec<AuditEvent>, AuditError> {
        let content = fs::read_to_string(self.file_for(date))?;
        let mut events = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AuditStore) {
        let temp = TempDir::new().unwrap();
        let store = AuditStore::new(temp.path());
        (temp, store)
    }

    #[test]
    fn builder_populates_event_fields() {
        let event = AuditEvent::new(AuditEventType::RedemptionSubmitted)
            .with_vault("va-1", Chain::Cardano)
            .with_address("addr_test1qz")
            .with_details(serde_json::json!({ "tx_hash": "abc" }));

        assert_eq!(event.event_type, AuditEventType::RedemptionSubmitted);
        assert_eq!(event.vault_account_id.as_deref(), Some("va-1"));
        assert_eq!(event.chain, Some(Chain::Cardano));
        assert!(event.success);
    }

    #[test]
    fn failed_event_records_the_error() {
        let event = AuditEvent::new(AuditEventType::ClaimSubmitted).failed("rejected upstream");
        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("rejected upstream"));
    }

    #[test]
    fn log_and_read_round_trip() {
        let (_temp, store) = setup();

        store
            .log(&AuditEvent::new(AuditEventType::TransferSubmitted).with_address("addr-1"))
            .unwrap();
        store
            .log(&AuditEvent::new(AuditEventType::SolutionFound).with_address("addr-2"))
            .unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = store.read_events(&today).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::TransferSubmitted);
        assert_eq!(events[1].event_type, AuditEventType::SolutionFound);
    }

    #[test]
    fn events_append_across_store_instances() {
        let (temp, store) = setup();
        store
            .log(&AuditEvent::new(AuditEventType::ClaimSubmitted))
            .unwrap();

        let reopened = AuditStore::new(temp.path());
        reopened
            .log(&AuditEvent::new(AuditEventType::ClaimSubmitted))
            .unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(reopened.read_events(&today).unwrap().len(), 2);
    }
}
