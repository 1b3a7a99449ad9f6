// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Custodia — Core types, configuration, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod findings;
pub mod types;

pub use config::{CoreConfig, Secrets};
pub use error::{CustodiaError, IntegrityError, ValidationError};
pub use types::*;
