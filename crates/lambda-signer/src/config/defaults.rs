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

use crate::config::types::*;
use crate::pipeline::PollPolicy;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Prefix prepended to signed object keys.
pub const DEFAULT_KEY_PREFIX: &str = "signed-";

/// Default retention of provisioned infrastructure on removal.
pub const DEFAULT_RETAIN: bool = true;

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 1000,
            max_interval_ms: 10_000,
            multiplier: 2.0,
            max_wait_secs: Some(900), // 15 minutes
            max_attempts: None,
        }
    }
}

impl PollingConfig {
    pub fn to_policy(&self) -> PollPolicy {
        PollPolicy {
            initial_interval: Duration::from_millis(self.initial_interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            multiplier: self.multiplier,
            max_wait: self.max_wait_secs.map(Duration::from_secs),
            max_attempts: self.max_attempts,
        }
    }
}

impl ServiceManifest {
    /// Starter manifest written by `lambda-signer config init`.
    pub fn example() -> Self {
        let mut functions = BTreeMap::new();
        functions.insert(
            "api".to_string(),
            UnitManifest {
                artifact: PathBuf::from(".serverless/api.zip"),
                signer: SigningOverrides::default(),
            },
        );

        Self {
            service: "my-service".to_string(),
            region: crate::provider::DEFAULT_REGION.to_string(),
            per_unit_packaging: true,
            artifact: None,
            signer: SigningOverrides {
                source: SourceOverrides {
                    bucket: Some("${LAMBDA_SIGNER_BUCKET:-my-service-signing}".to_string()),
                    key: None,
                },
                ..SigningOverrides::default()
            },
            functions,
            layers: BTreeMap::new(),
            polling: PollingConfig::default(),
        }
    }
}

/// Generate a starter manifest as a TOML string.
pub fn generate_default_manifest_toml() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&ServiceManifest::example())
}
