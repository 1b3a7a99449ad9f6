// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Custodia — forensic evidence preservation engine
//
// Entry point. Initialises logging, parses arguments, runs one command, and
// maps the outcome to an exit code.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use custodia_core::findings::{self, Severity};

use commands::Outcome;

/// Verification failed or a ledger entry no longer validates.
const EXIT_TAMPER: u8 = 3;
/// The request was refused; nothing changed.
const EXIT_REFUSED: u8 = 2;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();
    match commands::run_command(cli) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::TamperDetected) => ExitCode::from(EXIT_TAMPER),
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            let finding = findings::describe(&e);
            eprintln!("{}", finding.headline);
            eprintln!("{}", finding.detail);
            match finding.severity {
                Severity::TamperEvidence => ExitCode::from(EXIT_TAMPER),
                Severity::ActionRequired => ExitCode::from(EXIT_REFUSED),
                Severity::Fatal | Severity::Transient => ExitCode::FAILURE,
            }
        }
    }
}
