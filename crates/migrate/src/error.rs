use std::fmt;

#[derive(Debug)]
pub enum MigrateError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty path, bad tolerance, etc.).
    ConfigValidation(String),
    /// Input text is not a JSON array of records.
    InputParse { source: String, message: String },
    /// Output serialization error.
    Serialize(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for MigrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InputParse { source, message } => {
                write!(f, "cannot parse {source}: {message}")
            }
            Self::Serialize(msg) => write!(f, "serialization error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for MigrateError {}
