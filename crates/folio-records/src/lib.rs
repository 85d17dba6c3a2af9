// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-records — Persistent history of completed scans.

pub mod history;

pub use history::{ScanHistory, ScanRecord, hash_bytes};
