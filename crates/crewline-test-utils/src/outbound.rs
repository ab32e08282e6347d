// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock outbound adapters for deterministic testing.
//!
//! `RecordingOutbound` implements both outbound traits with captured calls
//! retrievable for assertion; `FailingOutbound` always errors, which tests
//! use to prove that delivery failures never fail the producing operation.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crewline_core::{CrewlineError, Notification, Notifier, Result, TrustSignals};

/// One captured trust signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEvent {
    pub user_id: String,
    pub kind: String,
    pub context_type: String,
    pub context_id: String,
}

/// Records every outbound call for later assertion.
#[derive(Debug, Default)]
pub struct RecordingOutbound {
    notifications: Mutex<Vec<Notification>>,
    policy_events: Mutex<Vec<PolicyEvent>>,
}

impl RecordingOutbound {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured notifications, in delivery order.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().await.clone()
    }

    /// Count of captured notifications.
    pub async fn sent_count(&self) -> usize {
        self.notifications.lock().await.len()
    }

    /// All captured trust signals, in delivery order.
    pub async fn policy_events(&self) -> Vec<PolicyEvent> {
        self.policy_events.lock().await.clone()
    }

    /// Drop everything captured so far.
    pub async fn clear(&self) {
        self.notifications.lock().await.clear();
        self.policy_events.lock().await.clear();
    }
}

#[async_trait]
impl Notifier for RecordingOutbound {
    async fn notify(&self, notification: Notification) -> Result<()> {
        self.notifications.lock().await.push(notification);
        Ok(())
    }
}

#[async_trait]
impl TrustSignals for RecordingOutbound {
    async fn record_policy_event(
        &self,
        user_id: &str,
        kind: &str,
        context_type: &str,
        context_id: &str,
    ) -> Result<()> {
        self.policy_events.lock().await.push(PolicyEvent {
            user_id: user_id.to_string(),
            kind: kind.to_string(),
            context_type: context_type.to_string(),
            context_id: context_id.to_string(),
        });
        Ok(())
    }
}

/// Fails every outbound call.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingOutbound;

#[async_trait]
impl Notifier for FailingOutbound {
    async fn notify(&self, _notification: Notification) -> Result<()> {
        Err(CrewlineError::Internal(
            "notification backend unavailable".to_string(),
        ))
    }
}

#[async_trait]
impl TrustSignals for FailingOutbound {
    async fn record_policy_event(
        &self,
        _user_id: &str,
        _kind: &str,
        _context_type: &str,
        _context_id: &str,
    ) -> Result<()> {
        Err(CrewlineError::Internal(
            "trust backend unavailable".to_string(),
        ))
    }
}
