// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generator configuration (`vbind.toml`).
//!
//! Every key has a default, so an empty file is a valid configuration.
//! Relative paths are resolved against the directory holding the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenConfig {
    #[serde(default)]
    pub inputs: InputsConfig,

    #[serde(default)]
    pub outputs: OutputsConfig,

    /// The platform selected by `cfg`.
    #[serde(default = "default_platform_a")]
    pub platform_a: PlatformConfig,

    /// Every other target.
    #[serde(default = "default_platform_b")]
    pub platform_b: PlatformConfig,

    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub shim: ShimConfig,

    #[serde(default)]
    pub filters: FiltersConfig,

    /// Raw type string -> replacement raw type string, applied before parsing.
    #[serde(default)]
    pub type_overrides: BTreeMap<String, String>,

    /// Field retyping rules.
    #[serde(default = "default_field_patches")]
    pub field_patches: Vec<FieldPatch>,

    /// Typedefs the descriptor relies on but does not declare.
    #[serde(default)]
    pub extra_typedefs: BTreeMap<String, String>,

    /// Types only ever used behind a pointer.
    #[serde(default)]
    pub opaque_types: Vec<String>,

    /// Native library to link the extern block against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_name: Option<String>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            inputs: InputsConfig::default(),
            outputs: OutputsConfig::default(),
            platform_a: default_platform_a(),
            platform_b: default_platform_b(),
            naming: NamingConfig::default(),
            shim: ShimConfig::default(),
            filters: FiltersConfig::default(),
            type_overrides: BTreeMap::new(),
            field_patches: default_field_patches(),
            extra_typedefs: BTreeMap::new(),
            opaque_types: Vec::new(),
            link_name: None,
        }
    }
}

impl GenConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// The `cfg` predicate selecting platform A.
    pub fn platform_cfg(&self) -> &str {
        self.platform_a.cfg.as_deref().unwrap_or("windows")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (label, platform) in [("platform_a", &self.platform_a), ("platform_b", &self.platform_b)] {
            if platform.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{label} has an empty name")));
            }
            if !platform.pack_size.is_power_of_two() {
                return Err(ConfigError::Invalid(format!(
                    "{label} pack_size {} is not a power of two",
                    platform.pack_size
                )));
            }
        }
        if self.platform_cfg().trim().is_empty() {
            return Err(ConfigError::Invalid("platform_a has an empty cfg".into()));
        }
        if self.platform_b.cfg.is_some() {
            return Err(ConfigError::Invalid(
                "platform_b is the complement of platform_a and takes no cfg".into(),
            ));
        }

        if !is_c_identifier(&self.naming.shim_prefix) {
            return Err(ConfigError::Invalid(format!(
                "shim_prefix `{}` is not a C identifier",
                self.naming.shim_prefix
            )));
        }

        for patch in &self.field_patches {
            if patch.to_type.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "field patch `{}` has an empty to_type",
                    patch.pattern
                )));
            }
            Regex::new(&patch.pattern).map_err(|e| {
                ConfigError::Invalid(format!("field patch `{}`: {}", patch.pattern, e))
            })?;
        }

        for name in self.extra_typedefs.keys().chain(&self.opaque_types) {
            if !is_c_identifier(name) {
                return Err(ConfigError::Invalid(format!(
                    "`{name}` is not a valid type name"
                )));
            }
        }

        Ok(())
    }

    /// Resolve a configured path against `base`.
    pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }

    /// Example configuration written by `vbind-gen gen-config`.
    pub fn example() -> Self {
        let mut config = Self::default();
        config.shim.includes = vec!["steam_api.h".into(), "steam_gameserver.h".into()];
        config.shim.root_accessor = Some("SteamClient".into());
        config.shim.root_interface = Some("ISteamClient".into());
        config.shim.deny = vec!["SteamNetworkingFakeIPResult_t".into()];
        config.filters.excluded_callbacks =
            vec!["PS3TrophiesInstalled_t".into(), "GSStatsUnloaded_t".into()];
        config.filters.skip_constants = vec![
            "k_SteamDatagramPOPID_dev".into(),
            "k_SteamItemInstanceIDInvalid".into(),
        ];
        config.type_overrides.insert(
            "RequestPlayersForGameResultCallback_t::PlayerAcceptState_t".into(),
            "int".into(),
        );
        config.type_overrides.insert(
            "const ScePadTriggerEffectParam *".into(),
            "const void *".into(),
        );
        config
            .extra_typedefs
            .insert("CSteamID".into(), "uint64_t".into());
        config
            .extra_typedefs
            .insert("CGameID".into(), "uint64_t".into());
        config.extra_typedefs.insert(
            "SteamAPIWarningMessageHook_t".into(),
            "void (*)(int, const char *)".into(),
        );
        config.opaque_types = vec![
            "SteamDatagramRelayAuthTicket".into(),
            "ISteamNetworkingConnectionSignaling".into(),
            "ISteamNetworkingSignalingRecvContext".into(),
        ];
        config.link_name = Some("steam_api".into());
        config
    }
}

fn is_c_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Input file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    #[serde(default = "default_api")]
    pub api: PathBuf,

    /// Layout report captured on platform A.
    #[serde(default = "default_layout_a")]
    pub layout_a: PathBuf,

    /// Layout report captured on platform B.
    #[serde(default = "default_layout_b")]
    pub layout_b: PathBuf,
}

fn default_api() -> PathBuf {
    PathBuf::from("steam_api.json")
}

fn default_layout_a() -> PathBuf {
    PathBuf::from("align-info-windows.json")
}

fn default_layout_b() -> PathBuf {
    PathBuf::from("align-info-macos.json")
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            api: default_api(),
            layout_a: default_layout_a(),
            layout_b: default_layout_b(),
        }
    }
}

/// Output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputsConfig {
    #[serde(default = "default_rust_output")]
    pub rust: PathBuf,

    #[serde(default = "default_shim_output")]
    pub shim: PathBuf,
}

fn default_rust_output() -> PathBuf {
    PathBuf::from("src/bindings.rs")
}

fn default_shim_output() -> PathBuf {
    PathBuf::from("src/shim.cpp")
}

impl Default for OutputsConfig {
    fn default() -> Self {
        Self {
            rust: default_rust_output(),
            shim: default_shim_output(),
        }
    }
}

/// One ABI family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConfig {
    pub name: String,

    /// `cfg` predicate; platform A only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg: Option<String>,

    /// Default struct packing of the family.
    pub pack_size: usize,
}

fn default_platform_a() -> PlatformConfig {
    PlatformConfig {
        name: "windows".into(),
        cfg: Some("windows".into()),
        pack_size: 8,
    }
}

fn default_platform_b() -> PlatformConfig {
    PlatformConfig {
        name: "unix".into(),
        cfg: None,
        pack_size: 4,
    }
}

/// Naming conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Prefix of the C++ shim's exported symbols.
    #[serde(default = "default_shim_prefix")]
    pub shim_prefix: String,

    /// Fields starting with this prefix are typed `bool`.
    #[serde(default = "default_bool_prefix")]
    pub bool_field_prefix: String,
}

fn default_shim_prefix() -> String {
    "vbind".to_string()
}

fn default_bool_prefix() -> String {
    "m_b".to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            shim_prefix: default_shim_prefix(),
            bool_field_prefix: default_bool_prefix(),
        }
    }
}

/// C++ shim settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShimConfig {
    /// Headers included by the shim.
    #[serde(default)]
    pub includes: Vec<String>,

    /// Native function returning the root client object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_accessor: Option<String>,

    /// Interface type of the root client object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_interface: Option<String>,

    /// Callback structs the shim must not mention.
    #[serde(default)]
    pub deny: Vec<String>,
}

/// Entities left out of the output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FiltersConfig {
    #[serde(default)]
    pub excluded_callbacks: Vec<String>,

    #[serde(default)]
    pub skip_constants: Vec<String>,
}

/// Retype fields whose name matches `pattern` and whose declared type is
/// `from_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPatch {
    pub pattern: String,
    pub from_type: String,
    pub to_type: String,
}

fn default_field_patches() -> Vec<FieldPatch> {
    vec![
        FieldPatch {
            pattern: "(?i)steamid".into(),
            from_type: "uint64".into(),
            to_type: "CSteamID".into(),
        },
        FieldPatch {
            pattern: "(?i)gameid".into(),
            from_type: "uint64".into(),
            to_type: "CGameID".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        let config: GenConfig = toml::from_str("").expect("empty config");
        assert_eq!(config.platform_a.pack_size, 8);
        assert_eq!(config.platform_b.pack_size, 4);
        assert_eq!(config.platform_cfg(), "windows");
        assert_eq!(config.naming.bool_field_prefix, "m_b");
        assert_eq!(config.field_patches.len(), 2);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_partial_sections() {
        let config: GenConfig = toml::from_str(
            r#"
            link_name = "steam_api"

            [platform_a]
            name = "win64"
            cfg = "target_os = \"windows\""
            pack_size = 8

            [filters]
            excluded_callbacks = ["GSStatsUnloaded_t"]

            [type_overrides]
            "const ScePadTriggerEffectParam *" = "const void *"
            "#,
        )
        .expect("config");
        assert_eq!(config.platform_cfg(), "target_os = \"windows\"");
        assert_eq!(config.platform_b.name, "unix");
        assert_eq!(config.filters.excluded_callbacks, vec!["GSStatsUnloaded_t"]);
        assert_eq!(config.type_overrides.len(), 1);
        assert_eq!(config.link_name.as_deref(), Some("steam_api"));
        config.validate().expect("valid");
    }

    #[test]
    fn test_validate_rejects_bad_pack_size() {
        let mut config = GenConfig::default();
        config.platform_b.pack_size = 6;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_cfg_on_platform_b() {
        let mut config = GenConfig::default();
        config.platform_b.cfg = Some("unix".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_patch_regex() {
        let mut config = GenConfig::default();
        config.field_patches.push(FieldPatch {
            pattern: "(".into(),
            from_type: "uint64".into(),
            to_type: "CSteamID".into(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_shim_prefix() {
        let mut config = GenConfig::default();
        config.naming.shim_prefix = "9lives".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_round_trips_through_toml() {
        let example = GenConfig::example();
        example.validate().expect("example is valid");
        let text = toml::to_string_pretty(&example).expect("serialize");
        let parsed: GenConfig = toml::from_str(&text).expect("parse");
        assert_eq!(parsed.shim.deny, example.shim.deny);
        assert_eq!(parsed.extra_typedefs, example.extra_typedefs);
        assert_eq!(parsed.field_patches, example.field_patches);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vbind.toml");
        std::fs::write(&path, "[naming]\nshim_prefix = \"steam\"\n").expect("write");
        let config = GenConfig::from_file(&path).expect("load");
        assert_eq!(config.naming.shim_prefix, "steam");
    }

    #[test]
    fn test_resolve_path() {
        let base = Path::new("/work");
        assert_eq!(
            GenConfig::resolve_path(base, Path::new("api.json")),
            PathBuf::from("/work/api.json")
        );
        assert_eq!(
            GenConfig::resolve_path(base, Path::new("/abs/api.json")),
            PathBuf::from("/abs/api.json")
        );
    }
}
