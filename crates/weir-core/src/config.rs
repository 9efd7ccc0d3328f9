//! Realm and role configuration.
//!
//! Configuration arrives as TOML (or any serde source) and is validated by
//! [`RouterFactory::start_realm`](crate::factory::RouterFactory::start_realm)
//! and [`RouterFactory::add_role`](crate::factory::RouterFactory::add_role).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::role::PermissionRule;

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Volatile in-process store, always available.
    Memory,
    /// LMDB-backed store; requires the `lmdb` cargo feature.
    Lmdb,
}

fn default_event_limit() -> usize {
    1024
}

/// Realm store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(rename = "type")]
    pub kind: StoreKind,

    /// Environment directory (LMDB only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Maximum retained events per topic.
    #[serde(default = "default_event_limit")]
    pub event_limit: usize,

    /// Maximum map size in bytes (LMDB only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_size: Option<usize>,
}

/// Payload treatment for MQTT bridges attached to a realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MqttPayloadFormat {
    /// Pass payloads through untouched.
    #[default]
    Opaque,
    Json,
    Cbor,
}

impl FromStr for MqttPayloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opaque" => Ok(Self::Opaque),
            "json" => Ok(Self::Json),
            "cbor" => Ok(Self::Cbor),
            other => Err(format!("'{other}' is not a valid mqtt_payload_format")),
        }
    }
}

/// Configuration for one realm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealmConfig {
    /// Realm URI.
    pub name: String,

    /// Optional persistence backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Payload format for MQTT bridges; validated against
    /// [`MqttPayloadFormat`] at realm startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mqtt_payload_format: Option<String>,
}

impl RealmConfig {
    /// A plain realm with no store and default payload format.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: None,
            mqtt_payload_format: None,
        }
    }

    /// Parse a realm configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text is not valid TOML for this
    /// shape.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a realm configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

/// Configuration for one role on a realm.
///
/// The variant is selected by shape: `permissions` present selects a
/// static-permission role, `authorizer` present selects a dynamic role,
/// neither selects a blanket role governed by `allow-by-default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Role URI.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<PermissionRule>>,

    /// Authorizer procedure URI for dynamic roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizer: Option<String>,

    #[serde(
        default,
        rename = "allow-by-default",
        skip_serializing_if = "Option::is_none"
    )]
    pub allow_by_default: Option<bool>,
}

impl RoleConfig {
    /// A blanket role config with the given default decision.
    #[must_use]
    pub fn blanket(name: impl Into<String>, allow_by_default: bool) -> Self {
        Self {
            name: name.into(),
            permissions: None,
            authorizer: None,
            allow_by_default: Some(allow_by_default),
        }
    }
}
