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

use crate::config::{types::*, ValidationError};

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for ServiceManifest {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.service.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName);
        }
        if let Err(e) = self.polling.validate() {
            errors.push(e);
        }

        if self.per_unit_packaging {
            if self.functions.is_empty() && self.layers.is_empty() {
                errors.push(ValidationError::NoUnits);
            }
        } else if self.artifact.is_none() {
            errors.push(ValidationError::MissingServiceArtifact);
        }

        for name in self.functions.keys() {
            if self.layers.contains_key(name) {
                errors.push(ValidationError::DuplicateUnit { name: name.clone() });
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple { errors }),
        }
    }
}

impl Validate for PollingConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.initial_interval_ms == 0 {
            return Err(ValidationError::InvalidPollInterval {
                interval_ms: self.initial_interval_ms,
            });
        }
        if self.max_interval_ms < self.initial_interval_ms {
            return Err(ValidationError::InvalidPollInterval {
                interval_ms: self.max_interval_ms,
            });
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(ValidationError::InvalidMultiplier {
                multiplier: self.multiplier.to_string(),
            });
        }
        Ok(())
    }
}
