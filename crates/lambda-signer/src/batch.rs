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

//! Batch driver over all deployable units of a service.
//!
//! Units are signed one after another. The first failure stops the batch;
//! units signed before it keep their signed artifacts.

use crate::config::{ConfigResolver, ServiceManifest, SigningOverrides};
use crate::error::SignerError;
use crate::pipeline::{SignOutcome, SignPipeline};
use crate::profile::ProfileDirectory;
use crate::provisioning::{ProvisioningManager, TeardownReport};
use crate::template;
use crate::unit::{DeployableUnit, SignItem};
use serde_json::Value;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct SigningBatch {
    items: Vec<SignItem>,
    per_unit: bool,
}

impl SigningBatch {
    pub fn new(items: Vec<SignItem>, per_unit: bool) -> Self {
        Self { items, per_unit }
    }

    /// Resolve one [`SignItem`] per function and layer, or a single item for
    /// the whole service when packaging is not per unit.
    pub fn from_manifest(
        manifest: &ServiceManifest,
        resolver: &ConfigResolver,
    ) -> Result<Self, SignerError> {
        let global = &manifest.signer;

        if !manifest.per_unit_packaging {
            let name = manifest.service.as_str();
            let artifact = manifest.artifact.clone().ok_or_else(|| {
                SignerError::configuration(name, "missing service artifact")
            })?;
            let config = resolver.resolve(name, &SigningOverrides::default(), global)?;
            let item = SignItem::new(DeployableUnit::function(name, artifact), config);
            return Ok(Self::new(vec![item], false));
        }

        let functions = manifest.functions.iter().map(|(name, unit)| {
            (DeployableUnit::function(name, unit.artifact.clone()), &unit.signer)
        });
        let layers = manifest.layers.iter().map(|(name, unit)| {
            (DeployableUnit::layer(name, unit.artifact.clone()), &unit.signer)
        });

        let items = functions
            .chain(layers)
            .map(|(unit, overrides)| {
                let config = resolver.resolve(unit.name(), overrides, global)?;
                Ok(SignItem::new(unit, config))
            })
            .collect::<Result<Vec<_>, SignerError>>()?;

        Ok(Self::new(items, true))
    }

    pub fn items(&self) -> &[SignItem] {
        &self.items
    }

    pub fn is_per_unit(&self) -> bool {
        self.per_unit
    }

    /// Sign every unit in order, stopping at the first failure.
    pub async fn sign_all(
        &mut self,
        pipeline: &SignPipeline,
    ) -> Result<Vec<SignOutcome>, SignerError> {
        info!(units = self.items.len(), "Signing functions");

        let mut outcomes = Vec::with_capacity(self.items.len());
        for item in &mut self.items {
            match pipeline.run(item).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(
                        unit = %item.name(),
                        signed = outcomes.len(),
                        error = %e,
                        "Signing aborted"
                    );
                    return Err(e);
                }
            }
        }

        Ok(outcomes)
    }

    /// Sign the single unit called `name`.
    ///
    /// Without per-unit packaging every function ships in the service
    /// artifact, so that artifact is signed whatever `name` is.
    pub async fn sign_unit(
        &mut self,
        pipeline: &SignPipeline,
        name: &str,
    ) -> Result<SignOutcome, SignerError> {
        let per_unit = self.per_unit;
        let item = match self.items.iter_mut().find(|item| item.name() == name) {
            Some(item) => item,
            None if !per_unit => {
                debug!(function = %name, "Packaging is service-wide; signing the service artifact");
                self.items.first_mut().ok_or_else(|| {
                    SignerError::configuration(name, "missing service artifact")
                })?
            }
            None => return Err(SignerError::configuration(name, "unknown function or layer")),
        };

        pipeline.run(item).await
    }

    /// Add code-signing configurations to a generated template.
    pub async fn annotate(
        &self,
        template: &mut Value,
        profiles: &ProfileDirectory,
    ) -> Result<Vec<String>, SignerError> {
        template::annotate(template, &self.items, profiles, self.per_unit).await
    }

    /// Remove the infrastructure of every non-retained unit.
    pub async fn remove(
        &self,
        provisioning: &ProvisioningManager,
    ) -> Result<TeardownReport, SignerError> {
        let configs: Vec<_> = self.items.iter().map(|item| item.config.clone()).collect();
        provisioning.teardown_all(&configs).await
    }
}
