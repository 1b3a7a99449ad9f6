// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use custodia_core::types::{
    AcquisitionInfo, Actor, ActorId, CaseContext, CaseId, EntryId, EvidenceId,
};
use custodia_evidence::AccessKind;

#[derive(Parser)]
#[command(
    name = "custodia",
    about = "Custodia — forensic evidence preservation engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Data directory (overrides CUSTODIA_DATA_DIR).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Encrypt and register a file as evidence
    Upload(UploadArgs),
    /// Re-hash an item against its recorded digests
    Verify(ItemActionArgs),
    /// Show an item's record
    Show(ItemArgs),
    /// Show an item's chain of custody
    Custody(ItemArgs),
    /// Log a view, download, or preview of an item
    Access(AccessArgs),
    /// Log a metadata extraction request
    Extract(ItemActionArgs),
    /// Show audit log entries
    Audit(AuditArgs),
    /// Re-verify ledger hashes and signatures
    CheckLedger(CheckLedgerArgs),
    /// Soft-delete an item
    Delete(ItemActionArgs),
    /// Show evidence statistics
    Stats(StatsArgs),
}

/// The operator performing the action.
#[derive(Args, Debug, Clone)]
pub struct ActorArgs {
    #[arg(long)]
    pub actor_id: ActorId,
    #[arg(long)]
    pub actor_email: String,
}

impl ActorArgs {
    pub fn actor(&self) -> Actor {
        Actor::new(self.actor_id, self.actor_email.clone())
    }
}

/// Case gating flags, as reported by the case component.
#[derive(Args, Debug, Clone)]
pub struct CaseArgs {
    #[arg(long)]
    pub case_id: CaseId,
    #[arg(long)]
    pub case_number: String,
    #[arg(long)]
    pub legitimacy_validated: bool,
    #[arg(long)]
    pub crime_detected: bool,
    #[arg(long)]
    pub crime_reported: bool,
}

impl CaseArgs {
    pub fn context(&self) -> CaseContext {
        CaseContext {
            case_id: self.case_id,
            case_number: self.case_number.clone(),
            legitimacy_validated: self.legitimacy_validated,
            crime_detected: self.crime_detected,
            crime_reported: self.crime_reported,
        }
    }
}

#[derive(Args)]
pub struct UploadArgs {
    pub path: PathBuf,
    #[command(flatten)]
    pub case: CaseArgs,
    #[command(flatten)]
    pub actor: ActorArgs,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub acquisition_method: Option<String>,
    #[arg(long)]
    pub acquisition_tool: Option<String>,
    #[arg(long)]
    pub acquisition_notes: Option<String>,
    #[arg(long)]
    pub source_device: Option<String>,
    #[arg(long)]
    pub source_location: Option<String>,
}

impl UploadArgs {
    pub fn acquisition(&self) -> AcquisitionInfo {
        AcquisitionInfo {
            method: self.acquisition_method.clone(),
            tool: self.acquisition_tool.clone(),
            notes: self.acquisition_notes.clone(),
            source_device: self.source_device.clone(),
            source_location: self.source_location.clone(),
            ..AcquisitionInfo::default()
        }
    }
}

#[derive(Args)]
pub struct ItemArgs {
    pub id: EvidenceId,
}

#[derive(Args)]
pub struct ItemActionArgs {
    pub id: EvidenceId,
    #[command(flatten)]
    pub actor: ActorArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum AccessArg {
    View,
    Download,
    Preview,
}

impl From<AccessArg> for AccessKind {
    fn from(arg: AccessArg) -> Self {
        match arg {
            AccessArg::View => AccessKind::Viewed,
            AccessArg::Download => AccessKind::Downloaded,
            AccessArg::Preview => AccessKind::Previewed,
        }
    }
}

#[derive(Args)]
pub struct AccessArgs {
    pub id: EvidenceId,
    #[arg(long, value_enum, default_value = "view")]
    pub kind: AccessArg,
    #[command(flatten)]
    pub actor: ActorArgs,
}

#[derive(Args)]
pub struct AuditArgs {
    /// Only entries recorded against this actor.
    #[arg(long, conflicts_with = "evidence")]
    pub actor: Option<ActorId>,
    /// Only entries about this evidence item.
    #[arg(long)]
    pub evidence: Option<EvidenceId>,
    #[arg(short = 'n', long, default_value = "50")]
    pub limit: u32,
}

#[derive(Args)]
pub struct CheckLedgerArgs {
    /// Verify a single entry from either ledger.
    #[arg(long)]
    pub entry: Option<EntryId>,
}

#[derive(Args)]
pub struct StatsArgs {
    #[arg(long)]
    pub case_id: Option<CaseId>,
}
