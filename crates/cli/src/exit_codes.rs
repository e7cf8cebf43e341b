//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                                     |
//! |------|-------------------------------------------------------------|
//! | 0    | Success, including "completed with warnings"                |
//! | 1    | General error (unspecified)                                 |
//! | 2    | CLI usage error (bad args)                                  |
//! | 3    | Load failure: input missing, unreadable or not a JSON array |
//! | 4    | Output or report could not be written                       |
//! | 5    | Validation found errors (`validate`, or `run --strict`)     |
//! | 6    | Invalid configuration file                                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed. Warnings do not change this.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// An input export could not be read or parsed. No output is written.
pub const EXIT_LOAD_FAILED: u8 = 3;

/// The migrated output or the run report could not be written.
pub const EXIT_WRITE_FAILED: u8 = 4;

/// Validation reported at least one error.
pub const EXIT_VALIDATION_FAILED: u8 = 5;

/// Config file unreadable, unparseable or rejected by validation.
pub const EXIT_INVALID_CONFIG: u8 = 6;
