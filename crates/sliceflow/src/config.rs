//! CLI configuration: thin wrapper around `sliceflow_config`.
//!
//! Adds the `GlobalOpts` overrides (--profile, --scenario,
//! --address-mode) and loads the scenario a command runs against.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sliceflow_config::ConfigError;
use sliceflow_core::{AddressMode, EngineConfig, SliceId, SliceRegistry};

use crate::cli::{AddressModeArg, GlobalOpts};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use sliceflow_config::{
    Config, Profile, config_path, load_config_or_default, profile_to_provisioner, save_config,
};

// ── Profile resolution ──────────────────────────────────────────────

/// The selected profile plus the scenario it points at.
pub struct Workspace {
    pub profile_name: String,
    pub profile: Profile,
    pub scenario: PathBuf,
    pub registry: Arc<SliceRegistry>,
}

/// Pick the profile named by `--profile`, else the configured default.
pub fn active_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    cfg.profile(global.profile.as_deref()).map_err(|e| match e {
        ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
            name,
            available: available_profiles(cfg),
        },
        other => other.into(),
    })
}

fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

pub fn address_mode(global: &GlobalOpts, profile: &Profile) -> AddressMode {
    match global.address_mode {
        Some(AddressModeArg::Link) => AddressMode::Link,
        Some(AddressModeArg::Network) => AddressMode::Network,
        None => profile.address_mode,
    }
}

/// Load the profile and validate its scenario.
///
/// `explicit` (a positional path) beats `--scenario`, which beats the
/// profile's `scenario` key.
pub fn open_workspace(global: &GlobalOpts, explicit: Option<&Path>) -> Result<Workspace, CliError> {
    let cfg = load_config_or_default();
    let (profile_name, profile) = active_profile(global, &cfg)?;

    let scenario = explicit
        .map(Path::to_path_buf)
        .or_else(|| global.scenario.clone())
        .or_else(|| profile.scenario.clone())
        .ok_or_else(|| CliError::NoScenario {
            profile: profile_name.clone(),
        })?;

    let mode = address_mode(global, &profile);
    tracing::debug!(path = %scenario.display(), %mode, "loading scenario");
    let registry = SliceRegistry::load(&scenario, mode)?;

    Ok(Workspace {
        profile_name,
        profile,
        scenario,
        registry: Arc::new(registry),
    })
}

impl Workspace {
    /// Engine settings from the profile, with the mode actually used to
    /// load the scenario and an optional override of the startup slices.
    pub fn engine_config(&self, active: Option<&[String]>) -> Result<EngineConfig, CliError> {
        let mut engine = sliceflow_config::profile_to_engine_config(&self.profile)?;
        engine.address_mode = self.registry.mode();
        if let Some(names) = active {
            engine.initial_slices = self.slice_ids(names)?;
        }
        Ok(engine)
    }

    /// Validate slice names against the scenario.
    pub fn slice_ids(&self, names: &[String]) -> Result<Vec<SliceId>, CliError> {
        names
            .iter()
            .map(|name| {
                let id = SliceId::new(name.trim());
                if self.registry.contains_slice(&id) {
                    Ok(id)
                } else {
                    Err(CliError::NotFound {
                        resource_type: "slice".into(),
                        identifier: name.clone(),
                        list_command: "slices".into(),
                    })
                }
            })
            .collect()
    }
}
