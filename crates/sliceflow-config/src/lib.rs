//! Configuration for the sliceflow controller.
//!
//! TOML profiles, environment overrides, and translation to
//! `sliceflow_core::EngineConfig` plus the optional queue provisioner.
//! The CLI layers its own flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sliceflow_core::{AddressMode, EngineConfig, ProcessProvisioner, QueueId, QueuePlan, SliceId};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' is not defined")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Profile by explicit name, else `default_profile`.
    ///
    /// A missing profile is only an error when it was asked for by name;
    /// the implicit default falls back to `Profile::default()`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        if let Some(name) = name {
            return self
                .profiles
                .get(name)
                .cloned()
                .map(|p| (name.to_owned(), p))
                .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() });
        }
        let name = self
            .default_profile
            .clone()
            .unwrap_or_else(|| "default".into());
        let profile = self.profiles.get(&name).cloned().unwrap_or_default();
        Ok((name, profile))
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// A named controller profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Scenario file (TOML, JSON or YAML).
    pub scenario: Option<PathBuf>,

    /// `link` matches on MAC addresses, `network` on IPv4.
    #[serde(default)]
    pub address_mode: AddressMode,

    /// Slices enabled at startup, in activation order.
    #[serde(default)]
    pub initial_slices: Vec<String>,

    #[serde(default)]
    pub queues: QueueSettings,

    #[serde(default)]
    pub provisioner: ProvisionerSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueueSettings {
    #[serde(default = "default_http_queue")]
    pub http: u32,
    #[serde(default = "default_dns_queue")]
    pub dns: u32,
    #[serde(default = "default_icmp_queue")]
    pub icmp: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            http: default_http_queue(),
            dns: default_dns_queue(),
            icmp: default_icmp_queue(),
        }
    }
}

fn default_http_queue() -> u32 {
    123
}
fn default_dns_queue() -> u32 {
    234
}
fn default_icmp_queue() -> u32 {
    345
}

/// External program that sizes the queues. No program, no provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProvisionerSettings {
    pub program: Option<String>,

    /// Passed before the three scaled values.
    #[serde(default)]
    pub args: Vec<String>,

    /// Split values are multiplied by this before being passed on.
    #[serde(default = "default_unit_multiplier")]
    pub unit_multiplier: u32,
}

impl Default for ProvisionerSettings {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            unit_multiplier: default_unit_multiplier(),
        }
    }
}

fn default_unit_multiplier() -> u32 {
    1_000_000
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "sliceflow", "sliceflow").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sliceflow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = figment_for(path).extract()?;
    Ok(config)
}

/// Load config, returning a default if anything goes wrong.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SLICEFLOW_").split("__"))
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to core types ───────────────────────────────────────

/// Build an `EngineConfig` from a profile. Slice names are checked for
/// shape only; whether they exist is the registry's call.
pub fn profile_to_engine_config(profile: &Profile) -> Result<EngineConfig, ConfigError> {
    let QueueSettings { http, dns, icmp } = profile.queues;
    if http == dns || http == icmp || dns == icmp {
        return Err(ConfigError::Validation {
            field: "queues".into(),
            reason: format!("queue ids must be distinct, got {http}/{dns}/{icmp}"),
        });
    }

    let mut initial_slices = Vec::with_capacity(profile.initial_slices.len());
    for name in &profile.initial_slices {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Validation {
                field: "initial_slices".into(),
                reason: "slice names cannot be empty".into(),
            });
        }
        initial_slices.push(SliceId::new(trimmed));
    }

    Ok(EngineConfig {
        address_mode: profile.address_mode,
        queues: QueuePlan {
            http: QueueId::new(http),
            dns: QueueId::new(dns),
            icmp: QueueId::new(icmp),
        },
        initial_slices,
        ..EngineConfig::default()
    })
}

/// The profile's provisioner, if it names a program.
pub fn profile_to_provisioner(
    profile: &Profile,
) -> Result<Option<ProcessProvisioner>, ConfigError> {
    let settings = &profile.provisioner;
    let Some(program) = settings.program.as_deref() else {
        return Ok(None);
    };
    if program.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "provisioner.program".into(),
            reason: "program cannot be empty".into(),
        });
    }
    if settings.unit_multiplier == 0 {
        return Err(ConfigError::Validation {
            field: "provisioner.unit_multiplier".into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Some(ProcessProvisioner::new(
        program,
        settings.args.clone(),
        settings.unit_multiplier,
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "lab"

[defaults]
output = "json"

[profiles.lab]
scenario = "/srv/sliceflow/four_switch.toml"
address_mode = "network"
initial_slices = ["first", "third"]

[profiles.lab.queues]
http = 1
dns = 2
icmp = 3

[profiles.lab.provisioner]
program = "qos.sh"
args = ["--iface", "eth1"]
"#;

    fn sample_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        (dir, path)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.output, "table");
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn parses_profile_sections() {
        let (_dir, path) = sample_file();
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.color, "auto");

        let (name, lab) = cfg.profile(None).unwrap();
        assert_eq!(name, "lab");
        assert_eq!(lab.address_mode, AddressMode::Network);
        assert_eq!(lab.initial_slices, vec!["first", "third"]);
        assert_eq!(lab.queues, QueueSettings { http: 1, dns: 2, icmp: 3 });
        assert_eq!(lab.provisioner.program.as_deref(), Some("qos.sh"));
        assert_eq!(lab.provisioner.unit_multiplier, 1_000_000);
    }

    #[test]
    fn named_profile_must_exist() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.profile(Some("nope")),
            Err(ConfigError::UnknownProfile { .. })
        ));
        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "default");
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "default".into(),
            Profile {
                initial_slices: vec!["second".into()],
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profiles["default"].initial_slices, vec!["second"]);
        assert_eq!(loaded.profiles["default"].queues, QueueSettings::default());
    }

    #[test]
    fn engine_config_carries_queue_plan_and_slices() {
        let profile = Profile {
            address_mode: AddressMode::Network,
            initial_slices: vec![" first ".into()],
            ..Profile::default()
        };
        let engine = profile_to_engine_config(&profile).unwrap();
        assert_eq!(engine.address_mode, AddressMode::Network);
        assert_eq!(engine.queues, QueuePlan::default());
        assert_eq!(engine.initial_slices, vec![SliceId::new("first")]);
    }

    #[test]
    fn engine_config_rejects_shared_queue_ids() {
        let profile = Profile {
            queues: QueueSettings {
                http: 7,
                dns: 7,
                icmp: 8,
            },
            ..Profile::default()
        };
        assert!(matches!(
            profile_to_engine_config(&profile),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn provisioner_only_when_program_set() {
        assert!(profile_to_provisioner(&Profile::default()).unwrap().is_none());

        let mut profile = Profile::default();
        profile.provisioner.program = Some("qos.sh".into());
        let provisioner = profile_to_provisioner(&profile).unwrap().unwrap();
        assert_eq!(provisioner.program(), "qos.sh");

        profile.provisioner.unit_multiplier = 0;
        assert!(profile_to_provisioner(&profile).is_err());
    }
}
