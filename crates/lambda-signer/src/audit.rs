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

//! Audit logging for signing and infrastructure operations.
//!
//! Every operation that changes remote state or replaces a local artifact
//! emits one structured event:
//! - Artifact uploads and replacements
//! - Signing job submission and outcome
//! - Signing profile creation and revocation
//! - Bucket creation and deletion
//!
//! All events carry an `event_type` field from [`events`] and are logged with
//! the `tracing` crate at appropriate levels.

/// Event types for signing operations.
pub mod events {
    /// Artifact uploaded for signing.
    pub const ARTIFACT_UPLOADED: &str = "artifact.uploaded";
    /// Local artifact replaced with the signed object.
    pub const ARTIFACT_REPLACED: &str = "artifact.replaced";

    /// Signing job submitted.
    pub const JOB_STARTED: &str = "signing.job.started";
    /// Signing job finished successfully.
    pub const JOB_SUCCEEDED: &str = "signing.job.succeeded";
    /// Signing job reported failure.
    pub const JOB_FAILED: &str = "signing.job.failed";
    /// Signing job exceeded the polling budget.
    pub const JOB_TIMED_OUT: &str = "signing.job.timed_out";

    /// Signing profile created.
    pub const PROFILE_CREATED: &str = "profile.created";
    /// Signing profile revoked.
    pub const PROFILE_REVOKED: &str = "profile.revoked";

    /// Bucket created.
    pub const BUCKET_CREATED: &str = "bucket.created";
    /// Bucket emptied and deleted.
    pub const BUCKET_DELETED: &str = "bucket.deleted";
}

pub fn log_artifact_uploaded(unit: &str, bucket: &str, key: &str, version_id: &str, size: usize) {
    tracing::info!(
        event_type = events::ARTIFACT_UPLOADED,
        unit = %unit,
        bucket = %bucket,
        key = %key,
        version_id = %version_id,
        size_bytes = size,
        "Artifact uploaded"
    );
}

pub fn log_artifact_replaced(unit: &str, path: &str, bucket: &str, key: &str, size: usize) {
    tracing::info!(
        event_type = events::ARTIFACT_REPLACED,
        unit = %unit,
        path = %path,
        signed_bucket = %bucket,
        signed_key = %key,
        size_bytes = size,
        "Artifact replaced with signed package"
    );
}

pub fn log_job_started(unit: &str, job_id: &str, profile_name: &str) {
    tracing::info!(
        event_type = events::JOB_STARTED,
        unit = %unit,
        job_id = %job_id,
        profile = %profile_name,
        "Signing job started"
    );
}

pub fn log_job_succeeded(unit: &str, job_id: &str, attempts: u32) {
    tracing::info!(
        event_type = events::JOB_SUCCEEDED,
        unit = %unit,
        job_id = %job_id,
        polls = attempts,
        "Signing job succeeded"
    );
}

pub fn log_job_failed(unit: &str, job_id: &str, reason: &str) {
    tracing::error!(
        event_type = events::JOB_FAILED,
        unit = %unit,
        job_id = %job_id,
        reason = %reason,
        "Signing job failed"
    );
}

pub fn log_job_timed_out(unit: &str, job_id: &str, attempts: u32) {
    tracing::error!(
        event_type = events::JOB_TIMED_OUT,
        unit = %unit,
        job_id = %job_id,
        polls = attempts,
        "Signing job did not finish in time"
    );
}

pub fn log_profile_created(profile_name: &str, platform_id: &str) {
    tracing::warn!(
        event_type = events::PROFILE_CREATED,
        profile = %profile_name,
        platform_id = %platform_id,
        "Signing profile created"
    );
}

pub fn log_profile_revoked(profile_name: &str, profile_version: &str, reason: &str) {
    tracing::warn!(
        event_type = events::PROFILE_REVOKED,
        profile = %profile_name,
        profile_version = %profile_version,
        reason = %reason,
        "Signing profile revoked"
    );
}

pub fn log_bucket_created(bucket: &str, location: Option<&str>) {
    tracing::info!(
        event_type = events::BUCKET_CREATED,
        bucket = %bucket,
        location = location.unwrap_or("<default>"),
        "Bucket created with versioning enabled"
    );
}

pub fn log_bucket_deleted(bucket: &str, objects_deleted: usize) {
    tracing::warn!(
        event_type = events::BUCKET_DELETED,
        bucket = %bucket,
        objects_deleted = objects_deleted,
        "Bucket deleted"
    );
}
