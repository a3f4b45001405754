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

//! Signing-profile lookups.
//!
//! A profile that does not exist yet is a normal state (it is created on the
//! first signing run), so [`ProfileDirectory`] reports it as `None`. Any
//! other failure from the signing service is returned unchanged.

use crate::provider::{ProviderError, SigningProfile, SigningService};
use std::sync::Arc;
use tracing::debug;

/// Field of a signing profile description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    ProfileName,
    ProfileVersion,
    ProfileVersionArn,
    PlatformId,
    Status,
}

impl ProfileField {
    fn extract(&self, profile: &SigningProfile) -> Option<String> {
        match self {
            ProfileField::ProfileName => Some(profile.profile_name.clone()),
            ProfileField::ProfileVersion => profile.profile_version.clone(),
            ProfileField::ProfileVersionArn => profile.profile_version_arn.clone(),
            ProfileField::PlatformId => Some(profile.platform_id.clone()),
            ProfileField::Status => Some(profile.status.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ProfileDirectory {
    signer: Arc<dyn SigningService>,
}

impl ProfileDirectory {
    pub fn new(signer: Arc<dyn SigningService>) -> Self {
        Self { signer }
    }

    /// Describe `profile_name`, or `None` when the profile does not exist.
    pub async fn describe(
        &self,
        profile_name: &str,
    ) -> Result<Option<SigningProfile>, ProviderError> {
        match self.signer.get_profile(profile_name).await {
            Ok(profile) => Ok(Some(profile)),
            Err(e) if e.is_not_found() => {
                debug!(profile = %profile_name, error = %e, "Signing profile not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Read one field of `profile_name`.
    ///
    /// Returns `None` when the profile does not exist or the field is unset.
    pub async fn lookup(
        &self,
        profile_name: &str,
        field: ProfileField,
    ) -> Result<Option<String>, ProviderError> {
        Ok(self
            .describe(profile_name)
            .await?
            .and_then(|profile| field.extract(&profile)))
    }
}
