// SPDX-FileCopyrightText: 2026 Crosspost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the storage tables.

pub mod batches;
pub mod pending;
pub mod seen;
pub mod stats;
