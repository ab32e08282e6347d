// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Crewline integration tests.
//!
//! Provides mock outbound adapters and database fixture builders for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`RecordingOutbound`] - Captures notifications and trust signals for assertion
//! - [`FailingOutbound`] - Always errors, for proving fire-and-forget contracts
//! - [`fixtures`] - Temp database plus seeded company/template/series/pool builders

pub mod fixtures;
pub mod outbound;

pub use outbound::{FailingOutbound, PolicyEvent, RecordingOutbound};
