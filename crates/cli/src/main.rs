// Shortly assignment migration CLI
// Consolidates legacy assignment/parcel/user exports into the new schema.

mod console;
mod exit_codes;
mod logging;
mod run;
mod settings;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use logging::Verbosity;
use settings::PathOverrides;

#[derive(Parser)]
#[command(name = "shortly-migrate")]
#[command(about = "Consolidate legacy Shortly assignments into the new schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate the legacy exports and write the consolidated assignments
    #[command(after_help = "\
Examples:
  shortly-migrate run
  shortly-migrate run --config migrate.toml --strict
  shortly-migrate run --assignments a.json --parcels p.json --users u.json -o out.json
  shortly-migrate run --json --report run-report.json")]
    Run {
        #[command(flatten)]
        paths: PathArgs,

        /// Print the run report (summary, mappings, validation) as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Exit non-zero when validation of the output finds errors
        #[arg(long)]
        strict: bool,

        #[command(flatten)]
        verbosity: VerbosityArgs,
    },

    /// Validate a migrated assignments file
    #[command(after_help = "\
Examples:
  shortly-migrate validate
  shortly-migrate validate migrated_assignments_final.json --json")]
    Validate {
        /// File to check (defaults to the configured output path)
        file: Option<PathBuf>,

        /// TOML config file
        #[arg(long, env = "SHORTLY_CONFIG")]
        config: Option<PathBuf>,

        /// Migrated output path used when FILE is omitted
        #[arg(long, short = 'o', env = "SHORTLY_OUTPUT_PATH")]
        output: Option<PathBuf>,

        /// Print the validation report as JSON to stdout
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        verbosity: VerbosityArgs,
    },

    /// Print the effective configuration as TOML
    Config {
        #[command(flatten)]
        paths: PathArgs,
    },
}

#[derive(Args)]
struct PathArgs {
    /// TOML config file
    #[arg(long, env = "SHORTLY_CONFIG")]
    config: Option<PathBuf>,

    /// Legacy assignments export
    #[arg(long, env = "SHORTLY_ASSIGNMENTS_PATH")]
    assignments: Option<PathBuf>,

    /// Legacy parcels export
    #[arg(long, env = "SHORTLY_PARCELS_PATH")]
    parcels: Option<PathBuf>,

    /// Legacy users export
    #[arg(long, env = "SHORTLY_USERS_PATH")]
    users: Option<PathBuf>,

    /// Where to write the migrated assignments
    #[arg(long, short = 'o', env = "SHORTLY_OUTPUT_PATH")]
    output: Option<PathBuf>,

    /// Also write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl PathArgs {
    fn overrides(&self) -> PathOverrides {
        PathOverrides {
            assignments: self.assignments.clone(),
            parcels: self.parcels.clone(),
            users: self.users.clone(),
            output: self.output.clone(),
            report: self.report.clone(),
        }
    }
}

#[derive(Args)]
struct VerbosityArgs {
    /// Only log warnings and errors; no human summary
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    quiet: bool,

    /// Log debug detail (each mapping and group)
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl VerbosityArgs {
    fn level(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version also land here, on stdout
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };

    let result = match cli.command {
        Commands::Run {
            paths,
            json,
            strict,
            verbosity,
        } => {
            logging::init_tracing_subscriber(verbosity.level());
            settings::resolve(paths.config.as_deref(), &paths.overrides())
                .and_then(|config| run::cmd_run(config, json, strict, verbosity.quiet))
        }
        Commands::Validate {
            file,
            config,
            output,
            json,
            verbosity,
        } => {
            logging::init_tracing_subscriber(verbosity.level());
            let overrides = PathOverrides {
                output,
                ..PathOverrides::default()
            };
            settings::resolve(config.as_deref(), &overrides).and_then(|cfg| {
                let target = file.unwrap_or_else(|| PathBuf::from(&cfg.paths.output));
                validate::cmd_validate(&target, cfg.heuristics.amount_tolerance, json, verbosity.quiet)
            })
        }
        Commands::Config { paths } => {
            logging::init_tracing_subscriber(Verbosity::Quiet);
            settings::resolve(paths.config.as_deref(), &paths.overrides()).and_then(|config| {
                let text = config.to_toml().map_err(|e| CliError {
                    code: EXIT_ERROR,
                    message: e.to_string(),
                    hint: None,
                })?;
                print!("{text}");
                Ok(())
            })
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
