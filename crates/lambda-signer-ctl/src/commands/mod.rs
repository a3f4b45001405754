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

//! Command implementations and the state they share.

pub mod annotate;
pub mod config;
pub mod remove;
pub mod sign;

use anyhow::{Context, Result};
use lambda_signer::{
    ConfigLoader, ConfigResolver, LocalBackend, ProvisioningManager, ServiceManifest,
    SignPipeline, SigningBatch,
};
use std::path::PathBuf;
use tracing::debug;

/// Options accepted by every command.
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn load_manifest(&self) -> Result<ServiceManifest> {
        let manifest = ConfigLoader::new()
            .load_manifest(self.config.as_deref())
            .context("Failed to load service manifest")?;
        debug!(service = %manifest.service, "Loaded service manifest");
        Ok(manifest)
    }
}

/// Resolve the signing configuration of every unit in `manifest`.
pub fn resolve_batch(manifest: &ServiceManifest) -> Result<SigningBatch> {
    let resolver = ConfigResolver::new(&manifest.service);
    SigningBatch::from_manifest(manifest, &resolver)
        .context("Failed to resolve signing configuration")
}

/// A loaded manifest together with the backend it operates on.
pub struct Session {
    pub manifest: ServiceManifest,
    pub backend: LocalBackend,
}

impl Session {
    pub fn open(options: &GlobalOptions) -> Result<Self> {
        let manifest = options.load_manifest()?;

        let state_dir = options
            .state_dir
            .clone()
            .unwrap_or_else(LocalBackend::default_root);
        let backend = LocalBackend::open(&state_dir, Some(&manifest.region))
            .with_context(|| format!("Failed to open state directory {}", state_dir.display()))?;
        debug!(state_dir = %state_dir.display(), "Opened local backend");

        Ok(Self { manifest, backend })
    }

    pub fn batch(&self) -> Result<SigningBatch> {
        resolve_batch(&self.manifest)
    }

    pub fn provisioning(&self) -> ProvisioningManager {
        ProvisioningManager::new(
            self.backend.object_store(),
            self.backend.signing_service(),
            &self.manifest.region,
        )
    }

    pub fn pipeline(&self) -> SignPipeline {
        SignPipeline::new(self.provisioning(), self.manifest.polling.to_policy())
    }
}
