// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gateway Configuration Types
//
// Defines the configuration schema for a dirgate node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Network and observability settings
// - Mounts, with their identities, command allow-lists and path rules

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::identity::{AccessRule, Identity, PathMatcher};
use super::mount::{path_matches, Mount, DEFAULT_COMMAND_TIMEOUT, DEFAULT_IDENTITY_NAME, DEFAULT_TOKEN_TTL};
use super::mount_registry::MountRegistry;

pub const API_VERSION: &str = "dirgate/v1";
pub const KIND: &str = "GatewayConfig";

/// Top-level Kubernetes-style gateway configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfigManifest {
    /// API version (must be "dirgate/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "GatewayConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: GatewayConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfigSpec {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,

    /// Directory with the UI asset bundle, served under every mount's asset prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,

    /// Mounts, matched in declaration order
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network bind address (e.g. "0.0.0.0" or "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// URL prefix the mount answers to (e.g. "/files")
    pub base_path: String,

    /// Filesystem root the mount is confined to (absolute)
    pub path_scope: PathBuf,

    /// Defaults to "<base_path>/webdav"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_transfer_prefix: Option<String>,

    /// Defaults to "<base_path>/_internal"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_prefix: Option<String>,

    /// Prefix prepended to redirect targets when the gateway sits behind a
    /// path-rewriting proxy
    #[serde(default)]
    pub address_prefix: String,

    #[serde(default = "default_true")]
    pub csrf_protection: bool,

    #[serde(default = "default_token_ttl", with = "humantime_serde")]
    pub token_ttl: Duration,

    /// `null` disables the limit
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Option<Duration>,

    #[serde(default)]
    pub default_identity: IdentityConfig,

    /// Per-user identities keyed by basic-auth user name
    #[serde(default)]
    pub identities: BTreeMap<String, IdentityConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub allow_edit: bool,

    #[serde(default)]
    pub allow_new: bool,

    #[serde(default)]
    pub allow_commands: bool,

    /// Program names runnable when `allow_commands` is set
    #[serde(default)]
    pub commands: Vec<String>,

    /// Path rules; the last matching rule wins
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    pub allow: bool,
}

impl RuleConfig {
    fn to_rule(&self) -> anyhow::Result<AccessRule> {
        match (&self.path, &self.regex) {
            (Some(path), None) => Ok(AccessRule {
                matcher: PathMatcher::Prefix(path.clone()),
                allow: self.allow,
            }),
            (None, Some(pattern)) => {
                let regex = Regex::new(pattern)
                    .with_context(|| format!("Invalid rule regex '{}'", pattern))?;
                Ok(AccessRule::pattern(regex, self.allow))
            }
            _ => anyhow::bail!("A rule must set exactly one of 'path' or 'regex'"),
        }
    }
}

impl IdentityConfig {
    fn to_identity(&self, name: &str) -> anyhow::Result<Identity> {
        let rules = self
            .rules
            .iter()
            .map(RuleConfig::to_rule)
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("Identity '{}'", name))?;

        Ok(Identity {
            name: name.to_string(),
            allow_edit: self.allow_edit,
            allow_new: self.allow_new,
            allow_command_execution: self.allow_commands,
            allowed_commands: self.commands.iter().cloned().collect(),
            rules,
        })
    }
}

impl MountConfig {
    pub fn new(base_path: impl Into<String>, path_scope: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            path_scope: path_scope.into(),
            file_transfer_prefix: None,
            asset_prefix: None,
            address_prefix: String::new(),
            csrf_protection: true,
            token_ttl: DEFAULT_TOKEN_TTL,
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            default_identity: IdentityConfig::default(),
            identities: BTreeMap::new(),
        }
    }

    pub fn to_mount(&self) -> anyhow::Result<Mount> {
        let mut mount = Mount::new(self.base_path.clone(), self.path_scope.clone())
            .with_address_prefix(self.address_prefix.clone())
            .with_csrf_protection(self.csrf_protection)
            .with_token_ttl(self.token_ttl)
            .with_command_timeout(self.command_timeout)
            .with_default_identity(self.default_identity.to_identity(DEFAULT_IDENTITY_NAME)?);

        if let Some(prefix) = &self.file_transfer_prefix {
            mount = mount.with_file_transfer_prefix(prefix.clone());
        }
        if let Some(prefix) = &self.asset_prefix {
            mount = mount.with_asset_prefix(prefix.clone());
        }
        for (name, identity) in &self.identities {
            mount = mount.with_identity(identity.to_identity(name)?);
        }

        Ok(mount)
    }
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_token_ttl() -> Duration {
    DEFAULT_TOKEN_TTL
}

fn default_command_timeout() -> Option<Duration> {
    Some(DEFAULT_COMMAND_TIMEOUT)
}

impl Default for GatewayConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "dirgate".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: GatewayConfigSpec::default(),
        }
    }
}

impl GatewayConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. DIRGATE_CONFIG_PATH environment variable
    /// 2. ./dirgate-config.yaml (working directory)
    /// 3. ~/.dirgate/config.yaml (user home)
    /// 4. /etc/dirgate/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("DIRGATE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./dirgate-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".dirgate").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/dirgate/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .with_context(|| format!("Failed to load config at {:?}", path))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using empty defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DIRGATE_CSRF_PROTECTION") {
            match parse_bool(&val) {
                Some(enabled) => {
                    tracing::info!("Environment override: DIRGATE_CSRF_PROTECTION={}", enabled);
                    for mount in &mut self.spec.mounts {
                        mount.csrf_protection = enabled;
                    }
                }
                None => {
                    tracing::warn!(
                        "Invalid value for DIRGATE_CSRF_PROTECTION: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let mut seen = HashSet::new();
        for mount in &self.spec.mounts {
            if !mount.base_path.starts_with('/') {
                anyhow::bail!("Mount base_path must start with '/': '{}'", mount.base_path);
            }

            let base = mount.base_path.trim_end_matches('/').to_string();
            if !seen.insert(base) {
                anyhow::bail!("Duplicate mount base_path: '{}'", mount.base_path);
            }

            if !mount.path_scope.is_absolute() {
                anyhow::bail!(
                    "Mount path_scope must be absolute for '{}': {:?}",
                    mount.base_path,
                    mount.path_scope
                );
            }

            for (field, prefix) in [
                ("file_transfer_prefix", &mount.file_transfer_prefix),
                ("asset_prefix", &mount.asset_prefix),
            ] {
                if let Some(prefix) = prefix {
                    if !path_matches(prefix, &mount.base_path) {
                        anyhow::bail!(
                            "Mount '{}' {} '{}' must lie under the base path",
                            mount.base_path,
                            field,
                            prefix
                        );
                    }
                }
            }

            mount
                .to_mount()
                .with_context(|| format!("Invalid mount '{}'", mount.base_path))?;
        }

        Ok(())
    }

    /// Build the immutable mount registry, preserving declaration order.
    pub fn into_registry(&self) -> anyhow::Result<MountRegistry> {
        let mut registry = MountRegistry::new();
        for config in &self.spec.mounts {
            let mount = config
                .to_mount()
                .with_context(|| format!("Invalid mount '{}'", config.base_path))?;
            registry.register(mount)?;
        }
        Ok(registry)
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: dirgate/v1
kind: GatewayConfig
metadata:
  name: test-gateway
spec:
  network:
    port: 9000
  mounts:
    - base_path: /fm
      path_scope: /srv/files
      token_ttl: 30m
      command_timeout: 10s
      default_identity:
        rules:
          - path: /private
            allow: false
      identities:
        alice:
          allow_edit: true
          allow_new: true
          allow_commands: true
          commands: [git, svn]
          rules:
            - regex: '\.env$'
              allow: false
"#;

    #[test]
    fn test_parse_sample() {
        let config = GatewayConfigManifest::from_yaml_str(SAMPLE).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.spec.network.port, 9000);
        assert_eq!(config.spec.network.bind_address, "127.0.0.1");

        let mount = &config.spec.mounts[0];
        assert_eq!(mount.token_ttl, Duration::from_secs(30 * 60));
        assert_eq!(mount.command_timeout, Some(Duration::from_secs(10)));
        assert!(mount.csrf_protection);
    }

    #[test]
    fn test_into_registry() {
        let config = GatewayConfigManifest::from_yaml_str(SAMPLE).unwrap();
        let registry = config.into_registry().unwrap();
        let mount = registry.resolve("/fm/docs").unwrap();

        assert_eq!(mount.file_transfer_prefix, "/fm/webdav");
        let alice = mount.resolve_identity(Some("alice"));
        assert!(alice.allow_edit);
        assert!(alice.may_run("git"));
        assert!(!alice.path_allowed("/app/.env"));

        let anon = mount.resolve_identity(None);
        assert!(!anon.allow_edit);
        assert!(!anon.path_allowed("/private/x"));
    }

    #[test]
    fn test_default_manifest_is_valid() {
        let manifest = GatewayConfigManifest::default();
        assert!(manifest.validate().is_ok());
        assert!(manifest.spec.mounts.is_empty());
    }

    #[test]
    fn test_validation() {
        let mut manifest = GatewayConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.kind = "WrongKind".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.mounts.push(MountConfig::new("/fm", "relative/dir"));
        assert!(manifest.validate().is_err());
        manifest.spec.mounts[0].path_scope = PathBuf::from("/srv");
        assert!(manifest.validate().is_ok());

        manifest.spec.mounts.push(MountConfig::new("/fm/", "/other"));
        assert!(manifest.validate().is_err());
        manifest.spec.mounts.pop();

        manifest.spec.mounts[0].file_transfer_prefix = Some("/dav".to_string());
        assert!(manifest.validate().is_err());
        manifest.spec.mounts[0].file_transfer_prefix = Some("/fm/dav".to_string());
        assert!(manifest.validate().is_ok());

        manifest.spec.mounts[0].default_identity.rules.push(RuleConfig {
            path: None,
            regex: Some("([".to_string()),
            allow: false,
        });
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip_keeps_durations() {
        let config = GatewayConfigManifest::from_yaml_str(SAMPLE).unwrap();
        let yaml = config.to_yaml_string().unwrap();
        let parsed = GatewayConfigManifest::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.spec.mounts[0].command_timeout, Some(Duration::from_secs(10)));
        assert_eq!(parsed.spec.mounts[0].identities["alice"].commands, vec!["git", "svn"]);
    }
}
