// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification delivery seam.

use async_trait::async_trait;

use crate::error::Result;

/// A single outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub user_id: String,
    /// Machine-readable kind, e.g. `shift_invite`.
    pub kind: String,
    pub title: String,
    pub body: String,
    /// Suppresses duplicate delivery for retried operations.
    pub dedupe_key: Option<String>,
}

/// Adapter for the external notification service.
///
/// Contract: at-least-once, caller does not block on delivery. Callers in
/// this engine always swallow errors with a warning; a failed notification
/// must never fail the operation that produced it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}
