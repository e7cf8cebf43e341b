//! `shortly-migrate run` — load the legacy exports, consolidate, write.

use std::path::{Path, PathBuf};

use serde::Serialize;
use shortly_migrate::load::{parse_assignments, parse_parcels, parse_users};
use shortly_migrate::model::{MigrationInput, MigrationReport};
use shortly_migrate::{validate_assignments, MigrateConfig, MigrateError, ValidationReport};

use crate::console;
use crate::exit_codes::{EXIT_ERROR, EXIT_LOAD_FAILED, EXIT_VALIDATION_FAILED, EXIT_WRITE_FAILED};
use crate::CliError;

/// Shape of `--json` stdout and of the `--report` file.
#[derive(Serialize)]
struct RunReport<'a> {
    output: &'a str,
    #[serde(flatten)]
    migration: &'a MigrationReport,
    validation: &'a ValidationReport,
}

fn run_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError {
        code,
        message: msg.into(),
        hint: None,
    }
}

pub fn cmd_run(config: MigrateConfig, json_output: bool, strict: bool, quiet: bool) -> Result<(), CliError> {
    let input = load_input(&config)?;

    let outcome = shortly_migrate::run(&config, &input);

    let output_path = PathBuf::from(&config.paths.output);
    let output_json = serde_json::to_string_pretty(&outcome.assignments)
        .map_err(|e| run_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    write_atomic(&output_path, &output_json)?;
    tracing::info!(path = %output_path.display(), assignments = outcome.assignments.len(), "output written");

    let validation = validate_assignments(&outcome.assignments, config.heuristics.amount_tolerance)
        .map_err(|e| run_err(EXIT_ERROR, e.to_string()))?;

    let report = RunReport {
        output: &config.paths.output,
        migration: &outcome.report,
        validation: &validation,
    };
    let report_json = serde_json::to_string_pretty(&report)
        .map_err(|e| run_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = config.paths.report {
        write_atomic(Path::new(path), &report_json)?;
        tracing::info!(path = %path, "report written");
    }

    if json_output {
        println!("{report_json}");
    }

    if !quiet {
        console::print_migration_summary(&outcome.report.summary, &config.paths.output);
        console::print_validation(&validation);
    }

    if strict && !validation.passed() {
        return Err(run_err(
            EXIT_VALIDATION_FAILED,
            format!("validation failed with {} errors", validation.errors.len()),
        )
        .with_hint("output was written; inspect it with `shortly-migrate validate`"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn read_input(label: &str, path: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| {
        run_err(EXIT_LOAD_FAILED, format!("cannot read {label} file {path}: {e}"))
            .with_hint(format!("set --{label} or the [paths] {label} key in the config file"))
    })
}

fn load_err(e: MigrateError) -> CliError {
    run_err(EXIT_LOAD_FAILED, e.to_string())
}

fn require_records<T>(label: &str, path: &str, records: Vec<T>) -> Result<Vec<T>, CliError> {
    if records.is_empty() {
        return Err(run_err(EXIT_LOAD_FAILED, format!("{label} file {path} contains no records")));
    }
    Ok(records)
}

/// Read all three exports. Any failure aborts before anything is written.
pub fn load_input(config: &MigrateConfig) -> Result<MigrationInput, CliError> {
    let paths = &config.paths;

    let users = parse_users(&read_input("users", &paths.users)?).map_err(load_err)?;
    let users = require_records("users", &paths.users, users)?;
    let parcels = parse_parcels(&read_input("parcels", &paths.parcels)?).map_err(load_err)?;
    let parcels = require_records("parcels", &paths.parcels, parcels)?;
    let assignments = parse_assignments(&read_input("assignments", &paths.assignments)?).map_err(load_err)?;
    let assignments = require_records("assignments", &paths.assignments, assignments)?;

    tracing::info!(
        users = users.len(),
        parcels = parcels.len(),
        assignments = assignments.len(),
        "inputs loaded"
    );
    Ok(MigrationInput {
        assignments,
        parcels,
        users,
    })
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `.tmp` next to the target, then rename over it.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), CliError> {
    let tmp = tmp_path(path);
    if let Err(e) = std::fs::write(&tmp, contents) {
        let _ = std::fs::remove_file(&tmp);
        return Err(run_err(EXIT_WRITE_FAILED, format!("cannot write {}: {e}", tmp.display())));
    }
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        run_err(EXIT_WRITE_FAILED, format!("failed to rename tmp to {}: {e}", path.display()))
    })
}
