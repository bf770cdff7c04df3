//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use sliceflow_config::ConfigError;
use sliceflow_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const PROVISIONING: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Scenario ─────────────────────────────────────────────────────

    #[error("Invalid scenario: {message}")]
    #[diagnostic(
        code(sliceflow::scenario),
        help("Fix the scenario file and re-run: sliceflow check <path>")
    )]
    Scenario { message: String },

    #[error("No scenario configured")]
    #[diagnostic(
        code(sliceflow::no_scenario),
        help(
            "Pass --scenario <path>, set SLICEFLOW_SCENARIO,\n\
             or add `scenario = \"...\"` to profile '{profile}'."
        )
    )]
    NoScenario { profile: String },

    // ── Lookup ───────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(sliceflow::not_found),
        help("Run: sliceflow {list_command} to see what the scenario defines")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(sliceflow::validation))]
    Validation { field: String, reason: String },

    // ── Provisioning ─────────────────────────────────────────────────

    #[error("Queue provisioning failed: {message}")]
    #[diagnostic(
        code(sliceflow::provisioning),
        help("Check the provisioner program and arguments in your profile.")
    )]
    Provisioning { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(sliceflow::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: sliceflow config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(sliceflow::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(sliceflow::config))]
    Config(Box<figment::Error>),

    // ── Runtime ──────────────────────────────────────────────────────

    #[error("Controller error: {message}")]
    #[diagnostic(code(sliceflow::runtime))]
    Runtime { message: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot render output: {0}")]
    #[diagnostic(code(sliceflow::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Scenario { .. }
            | Self::NoScenario { .. }
            | Self::Validation { .. }
            | Self::ConfigExists { .. }
            | Self::Config(_) => exit_code::USAGE,
            Self::Provisioning { .. } => exit_code::PROVISIONING,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Scenario(e) => CliError::Scenario {
                message: e.to_string(),
            },

            CoreError::SliceNotFound { name } => CliError::NotFound {
                resource_type: "slice".into(),
                identifier: name,
                list_command: "slices".into(),
            },

            CoreError::InvalidBandwidthSplit { reason } => CliError::Validation {
                field: "bandwidth".into(),
                reason,
            },

            CoreError::ProvisionerBusy => CliError::Provisioning {
                message: "a previous provisioning run is still in progress".into(),
            },

            CoreError::ProvisioningFailed { message } => CliError::Provisioning { message },

            CoreError::Config { message } => CliError::Validation {
                field: "configuration".into(),
                reason: message,
            },

            err @ (CoreError::TransportClosed
            | CoreError::ControllerStopped
            | CoreError::Internal(_)) => CliError::Runtime {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Io(e) => CliError::Io(e),
            ConfigError::Serialization(e) => CliError::Render(e.to_string()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_documented_exit_codes() {
        let cases = [
            (
                CoreError::SliceNotFound {
                    name: "fourth".into(),
                },
                exit_code::NOT_FOUND,
            ),
            (
                CoreError::InvalidBandwidthSplit {
                    reason: "sum".into(),
                },
                exit_code::USAGE,
            ),
            (CoreError::ProvisionerBusy, exit_code::PROVISIONING),
            (CoreError::TransportClosed, exit_code::GENERAL),
        ];
        for (core, code) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let err = CliError::from(ConfigError::UnknownProfile { name: "lab".into() });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }
}
