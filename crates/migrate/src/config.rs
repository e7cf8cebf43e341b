use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

/// Validator epsilon for `amount == Σ parcelAmount`.
pub const DEFAULT_AMOUNT_TOLERANCE: f64 = 0.01;

/// Largest candidate pool the empty-group fallback will draw from.
pub const DEFAULT_FALLBACK_BATCH_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MigrateConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub heuristics: HeuristicsConfig,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Input and output locations. Defaults are the file names the legacy
/// export job wrote, resolved against the working directory.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub assignments: String,
    pub parcels: String,
    pub users: String,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            assignments: "assignment.txt".into(),
            parcels: "parcels.txt".into(),
            users: "users.txt".into(),
            output: "migrated_assignments_final.json".into(),
            report: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeuristicsConfig {
    pub resolution_order: ResolutionOrder,
    pub fallback_batch_limit: usize,
    pub amount_tolerance: f64,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            resolution_order: ResolutionOrder::default(),
            fallback_batch_limit: DEFAULT_FALLBACK_BATCH_LIMIT,
            amount_tolerance: DEFAULT_AMOUNT_TOLERANCE,
        }
    }
}

/// Order in which the driver resolver consults its phone-based tiers.
/// Office and any-rider fallbacks always come last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOrder {
    /// Frequency mapping, then exact, then substring.
    #[default]
    FrequencyFirst,
    /// Exact, then substring, then frequency mapping.
    DirectFirst,
}

impl std::fmt::Display for ResolutionOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrequencyFirst => write!(f, "frequency_first"),
            Self::DirectFirst => write!(f, "direct_first"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl MigrateConfig {
    pub fn from_toml(input: &str) -> Result<Self, MigrateError> {
        let config: MigrateConfig =
            toml::from_str(input).map_err(|e| MigrateError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, MigrateError> {
        toml::to_string_pretty(self).map_err(|e| MigrateError::Serialize(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), MigrateError> {
        let paths = [
            ("assignments", &self.paths.assignments),
            ("parcels", &self.paths.parcels),
            ("users", &self.paths.users),
            ("output", &self.paths.output),
        ];
        for (name, value) in paths {
            if value.trim().is_empty() {
                return Err(MigrateError::ConfigValidation(format!(
                    "paths.{name} must not be empty"
                )));
            }
        }
        if let Some(ref report) = self.paths.report {
            if report.trim().is_empty() {
                return Err(MigrateError::ConfigValidation(
                    "paths.report must not be empty when set".into(),
                ));
            }
        }

        let tol = self.heuristics.amount_tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(MigrateError::ConfigValidation(format!(
                "heuristics.amount_tolerance must be a non-negative number, got {tol}"
            )));
        }

        if self.heuristics.fallback_batch_limit == 0 {
            return Err(MigrateError::ConfigValidation(
                "heuristics.fallback_batch_limit must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_uses_legacy_defaults() {
        let config = MigrateConfig::from_toml("").unwrap();
        assert_eq!(config.paths.assignments, "assignment.txt");
        assert_eq!(config.paths.parcels, "parcels.txt");
        assert_eq!(config.paths.users, "users.txt");
        assert_eq!(config.paths.output, "migrated_assignments_final.json");
        assert!(config.paths.report.is_none());
        assert_eq!(config.heuristics.resolution_order, ResolutionOrder::FrequencyFirst);
        assert_eq!(config.heuristics.fallback_batch_limit, 5);
        assert_eq!(config.heuristics.amount_tolerance, 0.01);
    }

    #[test]
    fn parse_full_config() {
        let input = r#"
[paths]
assignments = "in/assignments.json"
parcels     = "in/parcels.json"
users       = "in/users.json"
output      = "out/assignments.json"
report      = "out/report.json"

[heuristics]
resolution_order     = "direct_first"
fallback_batch_limit = 3
amount_tolerance     = 0.05
"#;
        let config = MigrateConfig::from_toml(input).unwrap();
        assert_eq!(config.paths.assignments, "in/assignments.json");
        assert_eq!(config.paths.report.as_deref(), Some("out/report.json"));
        assert_eq!(config.heuristics.resolution_order, ResolutionOrder::DirectFirst);
        assert_eq!(config.heuristics.fallback_batch_limit, 3);
        assert_eq!(config.heuristics.amount_tolerance, 0.05);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let input = r#"
[paths]
output = "custom.json"
"#;
        let config = MigrateConfig::from_toml(input).unwrap();
        assert_eq!(config.paths.output, "custom.json");
        assert_eq!(config.paths.users, "users.txt");
    }

    #[test]
    fn reject_unknown_resolution_order() {
        let input = r#"
[heuristics]
resolution_order = "majority_vote"
"#;
        assert!(MigrateConfig::from_toml(input).is_err());
    }

    #[test]
    fn reject_unknown_key() {
        let input = r#"
[paths]
assignmnets = "typo.json"
"#;
        let err = MigrateConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, MigrateError::ConfigParse(_)));
    }

    #[test]
    fn reject_empty_path() {
        let input = r#"
[paths]
parcels = "  "
"#;
        let err = MigrateConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("paths.parcels"));
    }

    #[test]
    fn reject_negative_tolerance() {
        let input = r#"
[heuristics]
amount_tolerance = -0.5
"#;
        let err = MigrateConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("amount_tolerance"));
    }

    #[test]
    fn reject_zero_batch_limit() {
        let input = r#"
[heuristics]
fallback_batch_limit = 0
"#;
        let err = MigrateConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("fallback_batch_limit"));
    }

    #[test]
    fn toml_output_parses_back() {
        let mut config = MigrateConfig::default();
        config.heuristics.resolution_order = ResolutionOrder::DirectFirst;
        let text = config.to_toml().unwrap();
        let back = MigrateConfig::from_toml(&text).unwrap();
        assert_eq!(back.heuristics.resolution_order, ResolutionOrder::DirectFirst);
        assert_eq!(back.paths.output, config.paths.output);
    }
}
