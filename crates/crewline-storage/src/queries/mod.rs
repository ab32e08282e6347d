// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL query modules, one per entity family. Every function takes
//! `&Database` and runs inside the single writer's `call` closure.

pub mod assignments;
pub mod ops;
pub mod series;
pub mod shifts;
pub mod templates;
pub mod workers;
