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

//! The per-unit signing pipeline.
//!
//! [`SignPipeline::run`] performs, strictly in order:
//!
//! 1. provisioning of the profile and buckets
//! 2. upload of the local artifact, recording the returned object version
//! 3. submission of a signing job for that exact version
//! 4. polling until the job is terminal (see [`poll`])
//! 5. download of the signed object over the local artifact

pub mod poll;

pub use poll::{JobOutcome, JobPoller, JobState, PollPolicy};

use crate::audit;
use crate::error::SignerError;
use crate::provider::{DestinationPrefix, SignedObject, SourceObject, StartJobRequest};
use crate::provisioning::ProvisioningManager;
use crate::unit::SignItem;
use tracing::debug;

/// Result of signing one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOutcome {
    pub unit: String,
    pub job_id: String,
    pub source_version: String,
    pub signed_object: SignedObject,
    pub bytes_written: usize,
    pub polls: u32,
}

#[derive(Clone)]
pub struct SignPipeline {
    provisioning: ProvisioningManager,
    policy: PollPolicy,
}

impl SignPipeline {
    pub fn new(provisioning: ProvisioningManager, policy: PollPolicy) -> Self {
        Self {
            provisioning,
            policy,
        }
    }

    pub fn provisioning(&self) -> &ProvisioningManager {
        &self.provisioning
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Sign one unit and replace its artifact with the signed package.
    ///
    /// The uploaded object version is written back into
    /// `item.config.source.object_version`.
    ///
    /// # Errors
    ///
    /// - [`SignerError::SigningJobFailed`] when the job ends in failure; the
    ///   signed object is never fetched in that case.
    /// - [`SignerError::JobTimedOut`] when the polling budget runs out.
    /// - [`SignerError::Artifact`] when the artifact cannot be read or written.
    /// - [`SignerError::Transport`] for any provider failure.
    pub async fn run(&self, item: &mut SignItem) -> Result<SignOutcome, SignerError> {
        let unit = item.name().to_string();
        let artifact = item.artifact().to_path_buf();

        self.provisioning.ensure(&item.config).await?;

        let body = tokio::fs::read(&artifact)
            .await
            .map_err(|source| SignerError::Artifact {
                path: artifact.clone(),
                source,
            })?;
        let size = body.len();

        let source = &item.config.source;
        let uploaded = self
            .provisioning
            .store()
            .put_object(&source.bucket, &source.key, body)
            .await?;
        audit::log_artifact_uploaded(
            &unit,
            &source.bucket,
            &source.key,
            &uploaded.version_id,
            size,
        );
        item.config.source.object_version = Some(uploaded.version_id.clone());

        let request = StartJobRequest {
            source: SourceObject {
                bucket: item.config.source.bucket.clone(),
                key: item.config.source.key.clone(),
                version: uploaded.version_id.clone(),
            },
            destination: DestinationPrefix {
                bucket: item.config.destination.bucket.clone(),
                prefix: item.config.destination.key_prefix.clone(),
            },
            profile_name: item.config.profile_name.clone(),
        };

        let signer = self.provisioning.signer();
        let job_id = signer.start_job(&request).await?;
        audit::log_job_started(&unit, &job_id, &request.profile_name);

        let outcome = JobPoller::new(signer.as_ref(), &self.policy)
            .wait(&job_id)
            .await?;

        let (signed_object, polls) = match outcome {
            JobOutcome::Succeeded {
                signed_object: Some(signed_object),
                attempts,
            } => (signed_object, attempts),
            JobOutcome::Succeeded {
                signed_object: None,
                ..
            } => {
                return Err(SignerError::MissingSignedObject { unit, job_id });
            }
            JobOutcome::Failed { reason, .. } => {
                audit::log_job_failed(&unit, &job_id, &reason);
                return Err(SignerError::SigningJobFailed {
                    unit,
                    job_id,
                    reason,
                });
            }
            JobOutcome::TimedOut { attempts, waited } => {
                audit::log_job_timed_out(&unit, &job_id, attempts);
                return Err(SignerError::JobTimedOut {
                    unit,
                    job_id,
                    attempts,
                    waited,
                });
            }
        };
        audit::log_job_succeeded(&unit, &job_id, polls);

        let signed = self
            .provisioning
            .store()
            .get_object(&signed_object.bucket, &signed_object.key)
            .await?;
        let bytes_written = signed.len();

        tokio::fs::write(&artifact, &signed)
            .await
            .map_err(|source| SignerError::Artifact {
                path: artifact.clone(),
                source,
            })?;
        audit::log_artifact_replaced(
            &unit,
            &artifact.display().to_string(),
            &signed_object.bucket,
            &signed_object.key,
            bytes_written,
        );
        debug!(unit = %unit, job_id = %job_id, "Unit signed");

        Ok(SignOutcome {
            unit,
            job_id,
            source_version: uploaded.version_id,
            signed_object,
            bytes_written,
            polls,
        })
    }
}
