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

//! # lambda-signer
//!
//! Code-signing orchestration for function and layer deployment artifacts.
//!
//! For every deployable unit of a service the crate uploads the packaged
//! artifact to object storage, submits it to a signing service, waits for
//! the signing job to finish, and replaces the local package with the signed
//! one. It also wires code-signing-configuration resources into a generated
//! CloudFormation template and tears down the supporting infrastructure
//! (buckets, signing profiles) when a service is removed.
//!
//! ## Components
//!
//! - [`config`]: merges defaults, service-wide and per-unit overrides into a
//!   [`SigningConfiguration`], and loads the service manifest.
//! - [`template`]: builds `AWS::Lambda::CodeSigningConfig` resources and
//!   attaches them to function resources.
//! - [`profile`]: [`ProfileDirectory`] looks up signing-profile metadata.
//! - [`provisioning`]: [`ProvisioningManager`] ensures buckets and profiles
//!   exist and tears them down.
//! - [`pipeline`]: [`SignPipeline`] runs upload, job submission, polling and
//!   artifact replacement for one unit.
//! - [`batch`]: [`SigningBatch`] drives the pipeline over every unit.
//! - [`provider`]: the [`ObjectStore`] and [`SigningService`] traits plus an
//!   offline filesystem backend.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lambda_signer::prelude::*;
//!
//! let manifest = ConfigLoader::new().load_manifest(None)?;
//! let resolver = ConfigResolver::new(&manifest.service);
//! let mut batch = SigningBatch::from_manifest(&manifest, &resolver)?;
//!
//! let backend = LocalBackend::open("/var/lib/lambda-signer", Some(&manifest.region))?;
//! let provisioning = ProvisioningManager::new(
//!     backend.object_store(),
//!     backend.signing_service(),
//!     &manifest.region,
//! );
//! let pipeline = SignPipeline::new(provisioning, manifest.polling.to_policy());
//! batch.sign_all(&pipeline).await?;
//! ```

pub mod audit;
pub mod batch;
pub mod config;
pub mod crypto;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod provider;
pub mod provisioning;
pub mod template;
pub mod unit;

pub use batch::SigningBatch;
pub use config::{
    ConfigError, ConfigLoader, ConfigResolver, DestinationOverrides, ServiceManifest,
    SigningConfiguration, SigningOverrides, SigningPolicy, SourceOverrides,
};
pub use error::{SignerError, TemplateError};
pub use pipeline::{JobOutcome, JobPoller, JobState, PollPolicy, SignOutcome, SignPipeline};
pub use profile::{ProfileDirectory, ProfileField};
pub use provider::local::{LocalBackend, LocalObjectStore, LocalSigningService};
pub use provider::{ObjectStore, ProviderError, SigningService};
pub use provisioning::ProvisioningManager;
pub use unit::{DeployableUnit, SignItem, UnitKind};

/// Commonly used types for driving a signing run.
pub mod prelude {
    pub use crate::batch::SigningBatch;
    pub use crate::config::{ConfigLoader, ConfigResolver, ServiceManifest, SigningConfiguration};
    pub use crate::error::SignerError;
    pub use crate::pipeline::{PollPolicy, SignPipeline};
    pub use crate::profile::ProfileDirectory;
    pub use crate::provider::local::LocalBackend;
    pub use crate::provider::{ObjectStore, SigningService};
    pub use crate::provisioning::ProvisioningManager;
    pub use crate::unit::{DeployableUnit, SignItem};
}
