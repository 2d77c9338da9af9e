//! Check a socketry workspace.
//!
//! Resolves every module of a workspace manifest and reports diagnostics.
//!
//! Usage: `socketry-check <manifest.json> [--json]`

use std::path::PathBuf;
use std::process;

use clap::Parser;
use socketry_model::{has_errors, DiagnosticFormatter, Severity};
use socketry_resolve::GenerationError;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "socketry-check")]
#[command(about = "Resolve a socketry workspace and report diagnostics")]
struct Args {
    /// Path to the workspace manifest (JSON)
    manifest: PathBuf,

    /// Print the generation report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Hide warnings and notes
    #[arg(long)]
    errors_only: bool,
}

fn main() {
    socketry_tools::init_logging();

    let args = Args::parse();

    if !args.manifest.is_file() {
        error!("'{}' is not a file", args.manifest.display());
        process::exit(1);
    }

    info!("Loading workspace from: {}", args.manifest.display());
    let manifest = match socketry_tools::load_manifest(&args.manifest) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    let formatter = if args.errors_only {
        DiagnosticFormatter::new().with_min_severity(Severity::Error)
    } else {
        DiagnosticFormatter::new()
    };

    let report = match socketry_tools::check(manifest) {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            if let GenerationError::Stalled { pending, .. } = &e {
                for stalled in pending {
                    error!("  - {}", stalled);
                }
            }
            if let Some(report) = e.report() {
                let diagnostics: Vec<_> = report.all_diagnostics().cloned().collect();
                if !diagnostics.is_empty() {
                    error!("Diagnostics so far:\n{}", formatter.format_all(&diagnostics));
                }
            }
            process::exit(1);
        }
    };

    let diagnostics: Vec<_> = report.all_diagnostics().cloned().collect();
    let rendered = formatter.format_all(&diagnostics);
    if has_errors(&diagnostics) {
        error!("Errors found:\n{}", rendered);
    } else if !rendered.is_empty() {
        warn!("Warnings found:\n{}", rendered);
    }

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                process::exit(1);
            }
        }
    }

    if !report.is_success() {
        error!(
            "{} of {} module(s) faulty",
            report.faulty.len(),
            report.finish_order.len()
        );
        process::exit(1);
    }

    info!("Successfully resolved workspace");
    info!("  - Modules: {}", report.modules.len());
    info!("  - Rounds: {}", report.rounds);
}
