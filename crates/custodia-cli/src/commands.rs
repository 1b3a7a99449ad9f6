// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command dispatch. Each command opens the service, performs one workflow
// step, and prints either a text summary or JSON.

use custodia_core::config::{CoreConfig, Secrets};
use custodia_core::error::{CustodiaError, Result};
use custodia_core::types::{AuditLogEntry, ChainOfCustodyEntry, RequestContext};
use custodia_evidence::{EvidenceService, UploadDetails};
use custodia_security::{LedgerReport, SignatureCheck};
use serde::Serialize;
use tracing::debug;

use crate::cli::*;

const TOOL: &str = "custodia-cli";

/// Whether the command saw anything an investigator must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Clean,
    TamperDetected,
}

pub fn run_command(cli: Cli) -> Result<Outcome> {
    let svc = open_service(&cli)?;
    let out = Printer { json: cli.json };
    let ctx = RequestContext::local(TOOL);

    match cli.command {
        Command::Upload(args) => cmd_upload(&svc, &out, &ctx, args),
        Command::Verify(args) => cmd_verify(&svc, &out, &ctx, args),
        Command::Show(args) => {
            let item = svc.get(&args.id)?;
            out.emit(&item, || {
                println!("Evidence {}", item.id);
                println!("  Case:      {}", item.case_id);
                println!("  File:      {} ({} bytes)", item.original_filename, item.file_size);
                println!("  Stored as: {}", item.stored_filename);
                println!("  Type:      {}", item.evidence_type);
                println!("  SHA-256:   {}", item.digests.sha256);
                println!("  SHA-512:   {}", item.digests.sha512);
                println!("  Encrypted: {}", item.is_encrypted());
                println!("  Verified:  {}", item.integrity_verified);
                if let Some(at) = item.last_verified_at {
                    println!("  Last check: {}", at.to_rfc3339());
                }
                if let Some(del) = &item.deleted {
                    println!("  Deleted:   {} by {}", del.deleted_at.to_rfc3339(), del.deleted_by);
                }
            })?;
            Ok(Outcome::Clean)
        }
        Command::Custody(args) => {
            let chain = svc.custody_chain(&args.id)?;
            out.emit(&chain, || print_custody(&chain))?;
            Ok(Outcome::Clean)
        }
        Command::Access(args) => {
            let entry = svc.record_access(&args.id, args.kind.into(), &args.actor.actor(), &ctx)?;
            out.emit(&entry, || println!("Logged {} as entry {}", entry.action, entry.id))?;
            Ok(Outcome::Clean)
        }
        Command::Extract(args) => {
            let request = svc.request_metadata_extraction(&args.id, &args.actor.actor(), &ctx)?;
            out.emit(&request, || {
                println!("Extraction requested for {} (entry {})", request.evidence_id, request.custody_entry)
            })?;
            Ok(Outcome::Clean)
        }
        Command::Audit(args) => {
            let entries = if let Some(actor) = args.actor {
                svc.audit().entries_for_actor(&actor)?
            } else if let Some(id) = args.evidence {
                svc.audit().entries_for_resource("evidence", &id.to_string())?
            } else {
                svc.audit().recent(args.limit)?
            };
            out.emit(&entries, || print_audit(&entries))?;
            Ok(Outcome::Clean)
        }
        Command::CheckLedger(args) => cmd_check_ledger(&svc, &out, args),
        Command::Delete(args) => {
            let item = svc.soft_delete(&args.id, &args.actor.actor(), &ctx)?;
            out.emit(&item, || println!("Evidence {} soft-deleted; record and blob retained", item.id))?;
            Ok(Outcome::Clean)
        }
        Command::Stats(args) => {
            let stats = svc.stats(args.case_id.as_ref())?;
            out.emit(&stats, || {
                println!("Items:     {}", stats.total_count);
                println!("Size:      {} bytes", stats.total_size_bytes);
                println!("Verified:  {} ({}%)", stats.verified_count, stats.verification_rate);
                for (tag, count) in stats.by_type.iter().filter(|(_, c)| **c > 0) {
                    println!("  {tag:<16} {count}");
                }
            })?;
            Ok(Outcome::Clean)
        }
    }
}

fn open_service(cli: &Cli) -> Result<EvidenceService> {
    let config = match &cli.data_dir {
        Some(dir) => {
            let mut config = CoreConfig::read_file(dir)?.unwrap_or_else(|| CoreConfig::with_data_dir(dir));
            config.data_dir = dir.clone();
            config.validate()?;
            config
        }
        None => CoreConfig::load()?,
    };
    debug!(data_dir = %config.data_dir.display(), "configuration resolved");
    EvidenceService::open(config, &Secrets::from_env()?)
}

fn cmd_upload(
    svc: &EvidenceService,
    out: &Printer,
    ctx: &RequestContext,
    args: UploadArgs,
) -> Result<Outcome> {
    let details = UploadDetails {
        description: args.description.clone(),
        acquisition: args.acquisition(),
    };
    let item = svc.upload_file(&args.path, &args.case.context(), &args.actor.actor(), ctx, details)?;
    out.emit(&item, || {
        println!("Uploaded {} as evidence {}", item.original_filename, item.id);
        println!("  SHA-256: {}", item.digests.sha256);
        println!("  SHA-512: {}", item.digests.sha512);
    })?;
    Ok(Outcome::Clean)
}

fn cmd_verify(
    svc: &EvidenceService,
    out: &Printer,
    ctx: &RequestContext,
    args: ItemActionArgs,
) -> Result<Outcome> {
    let result = svc.verify(&args.id, &args.actor.actor(), ctx)?;
    out.emit(&result, || {
        if result.verified {
            println!("Evidence {} verified: both digests match", result.evidence_id);
        } else {
            println!("Evidence {} FAILED verification", result.evidence_id);
            println!("  sha256 match: {}", result.sha256_match);
            println!("  sha512 match: {}", result.sha512_match);
            if let Some(failure) = &result.failure {
                println!("  {failure}");
            }
        }
        println!("  Recorded as custody entry {}", result.custody_entry);
    })?;
    Ok(if result.verified {
        Outcome::Clean
    } else {
        Outcome::TamperDetected
    })
}

fn cmd_check_ledger(svc: &EvidenceService, out: &Printer, args: CheckLedgerArgs) -> Result<Outcome> {
    if let Some(id) = args.entry {
        let check = match svc.custody().verify(&id) {
            Err(CustodiaError::NotFound { .. }) => svc.audit().verify(&id)?,
            other => other?,
        };
        out.emit(&check, || print_check(&id.to_string(), &check))?;
        return Ok(if check.valid {
            Outcome::Clean
        } else {
            Outcome::TamperDetected
        });
    }

    let reports = [svc.custody().verify_all()?, svc.audit().verify_all()?];
    out.emit(&reports, || {
        for report in &reports {
            print_report(report);
        }
    })?;
    Ok(if reports.iter().all(LedgerReport::is_clean) {
        Outcome::Clean
    } else {
        Outcome::TamperDetected
    })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

struct Printer {
    json: bool,
}

impl Printer {
    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text();
        }
        Ok(())
    }
}

fn print_custody(chain: &[ChainOfCustodyEntry]) {
    if chain.is_empty() {
        println!("No custody entries.");
        return;
    }
    for e in chain {
        let check = match e.hash_check.hash_match {
            Some(true) => " [hash ok]",
            Some(false) => " [HASH MISMATCH]",
            None => "",
        };
        println!("{}  {:<30} {}{}", e.timestamp.to_rfc3339(), e.action.as_str(), e.actor, check);
        if let Some(notes) = &e.notes {
            println!("    {notes}");
        }
    }
}

fn print_audit(entries: &[AuditLogEntry]) {
    if entries.is_empty() {
        println!("No audit entries.");
        return;
    }
    for e in entries {
        let who = e.actor.as_ref().map(|a| a.email.as_str()).unwrap_or("anonymous");
        println!(
            "{}  {:<26} {:<28} {}",
            e.timestamp.to_rfc3339(),
            e.action.as_str(),
            who,
            e.description.as_deref().unwrap_or("")
        );
    }
}

fn print_check(id: &str, check: &SignatureCheck) {
    match check.failure {
        None => println!("Entry {id}: signature valid ({})", check.timestamp),
        Some(failure) => println!("Entry {id}: INVALID, {failure}"),
    }
}

fn print_report(report: &LedgerReport) {
    println!(
        "{}: {} checked, {} valid, {} tampered",
        report.table,
        report.checked,
        report.valid,
        report.tampered.len()
    );
    for (id, check) in &report.tampered {
        print!("  ");
        print_check(id, check);
    }
}
