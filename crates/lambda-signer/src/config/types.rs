/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// How the deployment platform treats artifacts that fail signature checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningPolicy {
    #[default]
    Enforce,
    Warn,
}

impl SigningPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningPolicy::Enforce => "Enforce",
            SigningPolicy::Warn => "Warn",
        }
    }
}

impl fmt::Display for SigningPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the unsigned artifact is uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub bucket: String,
    pub key: String,
    /// Version id returned by the upload; set by the pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_version: Option<String>,
}

/// Where the signing service writes the signed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationLocation {
    pub bucket: String,
    pub key_prefix: String,
}

/// Fully merged signing configuration for one deployable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningConfiguration {
    pub source: SourceLocation,
    pub destination: DestinationLocation,
    pub profile_name: String,
    pub signing_policy: SigningPolicy,
    pub retain: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
}

/// Partial signing configuration as written in a manifest.
///
/// Every field is optional; set fields replace the corresponding field of
/// the configuration they are applied to, unset fields leave it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigningOverrides {
    #[serde(default)]
    pub source: SourceOverrides,
    #[serde(default)]
    pub destination: DestinationOverrides,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_policy: Option<SigningPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retain: Option<bool>,
}

impl SigningOverrides {
    /// Apply the set fields onto `config`.
    pub fn apply_to(&self, config: &mut SigningConfiguration) {
        if let Some(bucket) = &self.source.bucket {
            config.source.bucket = bucket.clone();
        }
        if let Some(key) = &self.source.key {
            config.source.key = key.clone();
        }
        if let Some(bucket) = &self.destination.bucket {
            config.destination.bucket = bucket.clone();
        }
        if let Some(prefix) = &self.destination.key_prefix {
            config.destination.key_prefix = prefix.clone();
        }
        if let Some(profile_name) = &self.profile_name {
            config.profile_name = profile_name.clone();
        }
        if let Some(policy) = self.signing_policy {
            config.signing_policy = policy;
        }
        if let Some(retain) = self.retain {
            config.retain = retain;
        }
    }
}

/// A function or layer entry of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitManifest {
    pub artifact: PathBuf,
    #[serde(default)]
    pub signer: SigningOverrides,
}

/// Polling behaviour while waiting for signing jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

/// Service description consumed by the batch driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceManifest {
    pub service: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Each function and layer ships its own artifact.
    #[serde(default)]
    pub per_unit_packaging: bool,
    /// Service-wide artifact, used when packaging is not per unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    #[serde(default)]
    pub signer: SigningOverrides,
    #[serde(default)]
    pub functions: BTreeMap<String, UnitManifest>,
    #[serde(default)]
    pub layers: BTreeMap<String, UnitManifest>,
    #[serde(default)]
    pub polling: PollingConfig,
}

fn default_region() -> String {
    crate::provider::DEFAULT_REGION.to_string()
}
