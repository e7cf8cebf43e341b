//! `shortly-migrate validate` — check a migrated output file.

use std::path::Path;

use shortly_migrate::validate_json;

use crate::console;
use crate::exit_codes::{EXIT_ERROR, EXIT_LOAD_FAILED, EXIT_VALIDATION_FAILED};
use crate::CliError;

pub fn cmd_validate(file: &Path, tolerance: f64, json_output: bool, quiet: bool) -> Result<(), CliError> {
    let text = std::fs::read_to_string(file).map_err(|e| CliError {
        code: EXIT_LOAD_FAILED,
        message: format!("cannot read {}: {e}", file.display()),
        hint: Some("pass the migrated file path, or run `shortly-migrate run` first".into()),
    })?;

    let report = validate_json(&text, tolerance).map_err(|e| CliError {
        code: EXIT_LOAD_FAILED,
        message: e.to_string(),
        hint: None,
    })?;
    tracing::info!(
        path = %file.display(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated"
    );

    if json_output {
        let json = serde_json::to_string_pretty(&report).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{json}");
    }

    if !quiet {
        console::print_validation(&report);
        console::print_statistics(&report);
    }

    if !report.passed() {
        return Err(CliError {
            code: EXIT_VALIDATION_FAILED,
            message: format!("validation failed with {} errors", report.errors.len()),
            hint: Some("fix the listed records before importing".into()),
        });
    }
    Ok(())
}
