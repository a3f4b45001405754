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

//! Merging of signing configuration.
//!
//! Resolution order, later wins, field by field:
//!
//! 1. built-in defaults (constructed fresh for every call)
//! 2. service-wide overrides
//! 3. per-unit overrides
//!
//! After merging, the source bucket is required and the destination bucket
//! falls back to the source bucket.

use super::defaults::{DEFAULT_KEY_PREFIX, DEFAULT_RETAIN};
use super::types::{
    DestinationLocation, SigningConfiguration, SigningOverrides, SigningPolicy, SourceLocation,
};
use crate::error::SignerError;
use tracing::debug;

/// Produces a [`SigningConfiguration`] per deployable unit.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    service_name: String,
    timestamp: Option<i64>,
}

impl ConfigResolver {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            timestamp: None,
        }
    }

    /// Pin the unix timestamp used for default object keys.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Built-in defaults for `unit_name`. Source and destination buckets are
    /// left empty.
    pub fn defaults_for(&self, unit_name: &str) -> SigningConfiguration {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp());

        SigningConfiguration {
            source: SourceLocation {
                bucket: String::new(),
                key: format!("{}-{}", unit_name, timestamp),
                object_version: None,
            },
            destination: DestinationLocation {
                bucket: String::new(),
                key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            },
            profile_name: self.service_name.clone(),
            signing_policy: SigningPolicy::Enforce,
            retain: DEFAULT_RETAIN,
        }
    }

    /// Merge defaults, `global` and `unit` overrides for `unit_name`.
    ///
    /// # Errors
    ///
    /// [`SignerError::Configuration`] when no source bucket is set by either
    /// override layer.
    pub fn resolve(
        &self,
        unit_name: &str,
        unit: &SigningOverrides,
        global: &SigningOverrides,
    ) -> Result<SigningConfiguration, SignerError> {
        let mut config = self.defaults_for(unit_name);
        global.apply_to(&mut config);
        unit.apply_to(&mut config);

        if config.source.bucket.is_empty() {
            return Err(SignerError::configuration(
                unit_name,
                "missing source bucket",
            ));
        }
        if config.destination.bucket.is_empty() {
            config.destination.bucket = config.source.bucket.clone();
        }

        debug!(
            unit = %unit_name,
            source_bucket = %config.source.bucket,
            source_key = %config.source.key,
            destination_bucket = %config.destination.bucket,
            profile = %config.profile_name,
            "Resolved signing configuration"
        );

        Ok(config)
    }
}
