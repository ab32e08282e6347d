// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trust/reputation service seam.

use async_trait::async_trait;

use crate::error::Result;

/// Adapter for the external trust/reputation collaborator.
///
/// A confirmed no-show emits a reliability-penalty event here. Same
/// fire-and-forget contract as notifications: failures are swallowed and
/// never roll back the state transition that triggered them.
#[async_trait]
pub trait TrustSignals: Send + Sync {
    async fn record_policy_event(
        &self,
        user_id: &str,
        kind: &str,
        context_type: &str,
        context_id: &str,
    ) -> Result<()>;
}
