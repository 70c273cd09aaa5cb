// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Example job handlers for the jobtrack engine.
//!
//! The binaries in `src/bin` embed a [`jobtrack_core::TrackerEngine`] over a
//! SQLite store and run these handlers end to end.

pub mod handlers;
