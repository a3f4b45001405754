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

//! Provisioning and teardown of signing infrastructure.
//!
//! Before a unit is signed, [`ProvisioningManager::ensure`] makes sure its
//! signing profile and its source and destination buckets exist. On removal,
//! [`ProvisioningManager::teardown_all`] deletes the buckets of every
//! non-retained configuration first and only then revokes the profiles, so
//! a failure half-way leaves the profiles in place for diagnosis. Anything a
//! retained configuration still names survives removal.
//!
//! # Concurrent deployers
//!
//! Existence checks and creation are two separate calls. When another
//! deployer creates the same bucket between the probe and the create call,
//! the provider's create error is returned unchanged; it is not retried or
//! treated as success.

use crate::audit;
use crate::config::SigningConfiguration;
use crate::error::SignerError;
use crate::profile::{ProfileDirectory, ProfileField};
use crate::provider::{
    ObjectIdentifier, ObjectStore, ProfileStatus, SigningService, DEFAULT_REGION,
    LAMBDA_PARTNER_ID,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Reason recorded when a profile is revoked on removal.
pub const REVOCATION_REASON: &str = "removal";

/// Maximum number of object versions removed per delete call.
pub const DELETE_BATCH_SIZE: usize = 1000;

/// What a teardown actually removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub buckets_deleted: Vec<String>,
    pub profiles_revoked: Vec<String>,
}

#[derive(Clone)]
pub struct ProvisioningManager {
    store: Arc<dyn ObjectStore>,
    signer: Arc<dyn SigningService>,
    profiles: ProfileDirectory,
    region: String,
}

impl ProvisioningManager {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        signer: Arc<dyn SigningService>,
        region: impl Into<String>,
    ) -> Self {
        let profiles = ProfileDirectory::new(signer.clone());
        Self {
            store,
            signer,
            profiles,
            region: region.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn signer(&self) -> &Arc<dyn SigningService> {
        &self.signer
    }

    pub fn profiles(&self) -> &ProfileDirectory {
        &self.profiles
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Location constraint for new buckets; the default region takes none.
    pub fn location_constraint(&self) -> Option<&str> {
        if self.region.is_empty() || self.region == DEFAULT_REGION {
            None
        } else {
            Some(&self.region)
        }
    }

    /// Make sure the profile and both buckets of `config` exist.
    ///
    /// The profile is handled before any bucket call.
    pub async fn ensure(&self, config: &SigningConfiguration) -> Result<(), SignerError> {
        self.ensure_profile(&config.profile_name).await?;

        for bucket in distinct(bucket_names(config)) {
            self.ensure_bucket(bucket).await?;
        }

        Ok(())
    }

    /// Create `profile_name` on the first platform offered for functions,
    /// unless an active profile of that name already exists.
    ///
    /// A revoked or canceled profile is put again under a new version.
    pub async fn ensure_profile(&self, profile_name: &str) -> Result<(), SignerError> {
        match self.profiles.describe(profile_name).await? {
            Some(profile) if profile.status == ProfileStatus::Active => {
                debug!(profile = %profile_name, "Signing profile exists");
                return Ok(());
            }
            Some(profile) => {
                info!(
                    profile = %profile_name,
                    status = %profile.status,
                    "Signing profile is not active; creating a new version"
                );
            }
            None => {}
        }

        let platforms = self.signer.list_platforms(LAMBDA_PARTNER_ID).await?;
        let platform = platforms
            .first()
            .ok_or_else(|| SignerError::NoSigningPlatform {
                partner: LAMBDA_PARTNER_ID.to_string(),
            })?;

        self.signer
            .put_profile(&platform.platform_id, profile_name)
            .await?;
        audit::log_profile_created(profile_name, &platform.platform_id);

        Ok(())
    }

    /// Create `bucket` with versioning enabled unless it already exists.
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<(), SignerError> {
        match self.store.head_bucket(bucket).await {
            Ok(()) => {
                debug!(bucket = %bucket, "Bucket exists");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                let location = self.location_constraint();
                self.store.create_bucket(bucket, location).await?;
                self.store.enable_versioning(bucket).await?;
                audit::log_bucket_created(bucket, location);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Tear down the infrastructure of a single configuration.
    pub async fn teardown(
        &self,
        config: &SigningConfiguration,
    ) -> Result<TeardownReport, SignerError> {
        self.teardown_all(std::slice::from_ref(config)).await
    }

    /// Tear down the infrastructure of every configuration with `retain`
    /// unset.
    ///
    /// Buckets shared between configurations are deleted once. A bucket or
    /// profile that any retained configuration still uses is left in place.
    /// All buckets are removed before any profile is revoked.
    pub async fn teardown_all(
        &self,
        configs: &[SigningConfiguration],
    ) -> Result<TeardownReport, SignerError> {
        let (retained, targets): (Vec<&SigningConfiguration>, Vec<&SigningConfiguration>) =
            configs.iter().partition(|config| config.retain);

        let mut report = TeardownReport::default();
        if targets.is_empty() {
            info!("All signing infrastructure is retained; nothing to remove");
            return Ok(report);
        }

        let kept_buckets: HashSet<&str> = retained
            .iter()
            .copied()
            .flat_map(bucket_names)
            .collect();
        let kept_profiles: HashSet<&str> = retained
            .iter()
            .map(|config| config.profile_name.as_str())
            .collect();

        let buckets = distinct(targets.iter().copied().flat_map(bucket_names));
        for bucket in buckets {
            if kept_buckets.contains(bucket) {
                debug!(bucket = %bucket, "Bucket used by a retained unit; keeping it");
                continue;
            }
            if self.empty_and_delete_bucket(bucket).await? {
                report.buckets_deleted.push(bucket.to_string());
            }
        }

        let profiles = distinct(targets.iter().map(|config| config.profile_name.as_str()));
        for profile_name in profiles {
            if kept_profiles.contains(profile_name) {
                debug!(profile = %profile_name, "Profile used by a retained unit; keeping it");
                continue;
            }
            if self.revoke_profile(profile_name).await? {
                report.profiles_revoked.push(profile_name.to_string());
            }
        }

        Ok(report)
    }

    /// Delete every object version and delete marker in `bucket`, then the
    /// bucket itself.
    ///
    /// Returns `false` when the bucket was already gone.
    pub async fn empty_and_delete_bucket(&self, bucket: &str) -> Result<bool, SignerError> {
        let mut deleted = 0usize;
        let mut marker = None;

        loop {
            let page = match self
                .store
                .list_object_versions(bucket, marker.as_ref())
                .await
            {
                Ok(page) => page,
                Err(e) if e.is_not_found() => {
                    debug!(bucket = %bucket, "Bucket already removed");
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            };

            let objects: Vec<ObjectIdentifier> = page
                .versions
                .into_iter()
                .chain(page.delete_markers)
                .collect();

            for batch in objects.chunks(DELETE_BATCH_SIZE) {
                match self.store.delete_objects(bucket, batch).await {
                    Ok(()) => deleted += batch.len(),
                    Err(e) if e.is_not_found() => {
                        debug!(bucket = %bucket, error = %e, "Objects already removed");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        match self.store.delete_bucket(bucket).await {
            Ok(()) => {
                audit::log_bucket_deleted(bucket, deleted);
                Ok(true)
            }
            Err(e) if e.is_not_found() => {
                debug!(bucket = %bucket, "Bucket already removed");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Revoke the current version of `profile_name`.
    ///
    /// Returns `false` when there was nothing to revoke.
    pub async fn revoke_profile(&self, profile_name: &str) -> Result<bool, SignerError> {
        let Some(version) = self
            .profiles
            .lookup(profile_name, ProfileField::ProfileVersion)
            .await?
        else {
            debug!(profile = %profile_name, "No profile version to revoke");
            return Ok(false);
        };

        match self
            .signer
            .revoke_profile(
                profile_name,
                &version,
                chrono::Utc::now(),
                REVOCATION_REASON,
            )
            .await
        {
            Ok(()) => {
                audit::log_profile_revoked(profile_name, &version, REVOCATION_REASON);
                Ok(true)
            }
            Err(e) if e.is_already_revoked() => {
                debug!(profile = %profile_name, version = %version, "Profile already revoked");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn bucket_names(config: &SigningConfiguration) -> [&str; 2] {
    [
        config.source.bucket.as_str(),
        config.destination.bucket.as_str(),
    ]
}

/// Unique non-empty names in first-seen order.
fn distinct<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .collect()
}
