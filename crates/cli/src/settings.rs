//! Effective configuration: built-in defaults, then `--config FILE`, then
//! environment variables, then flags. clap folds the environment into the
//! flag values, so only two layers are merged here.

use std::path::{Path, PathBuf};

use shortly_migrate::MigrateConfig;

use crate::exit_codes::EXIT_INVALID_CONFIG;
use crate::CliError;

/// Path settings given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub assignments: Option<PathBuf>,
    pub parcels: Option<PathBuf>,
    pub users: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
}

fn config_err(msg: impl Into<String>) -> CliError {
    CliError {
        code: EXIT_INVALID_CONFIG,
        message: msg.into(),
        hint: None,
    }
}

/// Read and validate a config file. Relative paths inside it are taken
/// relative to the file's directory.
pub fn load_config_file(path: &Path) -> Result<MigrateConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_err(format!("cannot read config {}: {e}", path.display())))?;
    let mut config = MigrateConfig::from_toml(&text).map_err(|e| {
        config_err(format!("{}: {e}", path.display()))
            .with_hint("see `shortly-migrate config` for the recognised keys")
    })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let paths = &mut config.paths;
    paths.assignments = rebase(base, &paths.assignments);
    paths.parcels = rebase(base, &paths.parcels);
    paths.users = rebase(base, &paths.users);
    paths.output = rebase(base, &paths.output);
    if let Some(report) = paths.report.as_mut() {
        *report = rebase(base, report);
    }
    Ok(config)
}

fn rebase(base: &Path, value: &str) -> String {
    let p = Path::new(value);
    if p.is_absolute() || base.as_os_str().is_empty() {
        value.to_string()
    } else {
        base.join(p).to_string_lossy().into_owned()
    }
}

/// Defaults or the config file, with overrides applied and the result
/// validated.
pub fn resolve(config_path: Option<&Path>, overrides: &PathOverrides) -> Result<MigrateConfig, CliError> {
    let mut config = match config_path {
        Some(path) => load_config_file(path)?,
        None => MigrateConfig::default(),
    };

    let paths = &mut config.paths;
    let set = |slot: &mut String, value: &Option<PathBuf>| {
        if let Some(v) = value {
            *slot = v.to_string_lossy().into_owned();
        }
    };
    set(&mut paths.assignments, &overrides.assignments);
    set(&mut paths.parcels, &overrides.parcels);
    set(&mut paths.users, &overrides.users);
    set(&mut paths.output, &overrides.output);
    if let Some(report) = &overrides.report {
        paths.report = Some(report.to_string_lossy().into_owned());
    }

    config.validate().map_err(|e| config_err(e.to_string()))?;
    tracing::debug!(
        assignments = %config.paths.assignments,
        parcels = %config.paths.parcels,
        users = %config.paths.users,
        output = %config.paths.output,
        order = %config.heuristics.resolution_order,
        "configuration resolved"
    );
    Ok(config)
}
