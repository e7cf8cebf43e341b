//! `shortly-migrate` — Legacy assignment consolidation engine.
//!
//! Pure engine crate: receives pre-loaded users, parcels and assignment
//! rows, returns normalized assignments plus a run report. JSON parsing of
//! the legacy exports lives here too; file IO and the CLI do not.

pub mod associate;
pub mod config;
pub mod engine;
pub mod error;
pub mod group;
pub mod load;
pub mod lookup;
pub mod model;
pub mod resolver;
pub mod validate;

pub use config::{MigrateConfig, ResolutionOrder};
pub use engine::run;
pub use error::MigrateError;
pub use model::{MigrationInput, MigrationOutcome, MigrationReport, NormalizedAssignment};
pub use validate::{validate_assignments, validate_json, validate_records, ValidationReport};
