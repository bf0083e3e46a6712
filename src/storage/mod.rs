// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! On-disk persistence: the operation audit trail.

pub mod audit;

pub use audit::{AuditError, AuditEvent, AuditEventType, AuditStore};
