// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — working raster representation, colour-space conversion, and
// neighbourhood filters.

pub mod color;
pub mod filter;
pub mod raster;

pub use raster::{ColorLayout, Raster};
