// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound collaborator traits.
//!
//! Notifications and trust/reputation signals are best-effort side channels:
//! the engine enqueues them fire-and-forget and never lets a delivery
//! failure roll back a state transition. All traits use `#[async_trait]`
//! for dynamic dispatch across crate boundaries.

pub mod notify;
pub mod trust;

pub use notify::{Notification, Notifier};
pub use trust::TrustSignals;

use crate::error::Result;
use async_trait::async_trait;

/// Production default until a delivery backend is wired in: accepts every
/// event and drops it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutbound;

#[async_trait]
impl Notifier for NullOutbound {
    async fn notify(&self, _notification: Notification) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl TrustSignals for NullOutbound {
    async fn record_policy_event(
        &self,
        _user_id: &str,
        _kind: &str,
        _context_type: &str,
        _context_id: &str,
    ) -> Result<()> {
        Ok(())
    }
}
