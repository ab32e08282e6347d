// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Crewline scheduling engine.
//!
//! One [`Database`] per process wraps a single serialized writer connection;
//! idempotent writes (shift materialization, invitations) ride on unique
//! indexes plus `INSERT OR IGNORE`, and multi-step state changes run inside
//! per-call transactions.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
