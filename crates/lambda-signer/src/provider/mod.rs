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

//! Object storage and signing service interfaces.
//!
//! The core never talks to a cloud SDK directly. It depends on the
//! [`ObjectStore`] and [`SigningService`] traits, whose errors are classified
//! once at this boundary into [`ProviderError`]. Callers match on
//! [`ProviderError::NotFound`] / [`ProviderError::AlreadyRevoked`] instead of
//! inspecting provider error codes.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Partner filter used when looking up signing platforms for functions.
pub const LAMBDA_PARTNER_ID: &str = "AWSLambda";

/// Region in which buckets are created without a location constraint.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Provider codes that mean the addressed resource does not exist.
const NOT_FOUND_CODES: &[&str] = &[
    "NotFound",
    "NoSuchBucket",
    "NoSuchKey",
    "NoSuchVersion",
    "ResourceNotFoundException",
];

/// Errors reported by an object store or signing service.
///
/// Every variant keeps the provider's original code and message so operators
/// can look them up in the provider's documentation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{operation}: {code}: {message}")]
    NotFound {
        operation: String,
        code: String,
        message: String,
    },

    #[error("{operation}: {code}: {message}")]
    AlreadyRevoked {
        operation: String,
        code: String,
        message: String,
    },

    #[error("{operation}: {code}: {message}")]
    Other {
        operation: String,
        code: String,
        message: String,
    },
}

impl ProviderError {
    /// Classify a raw provider error code.
    pub fn from_code(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let operation = operation.into();
        let code = code.into();
        let message = message.into();

        if NOT_FOUND_CODES.contains(&code.as_str()) {
            ProviderError::NotFound {
                operation,
                code,
                message,
            }
        } else if code == "ValidationException"
            && message.to_ascii_lowercase().contains("already revoked")
        {
            ProviderError::AlreadyRevoked {
                operation,
                code,
                message,
            }
        } else {
            ProviderError::Other {
                operation,
                code,
                message,
            }
        }
    }

    pub fn not_found(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::NotFound {
            operation: operation.into(),
            code: "NotFound".to_string(),
            message: message.into(),
        }
    }

    pub fn other(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ProviderError::Other {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    pub fn is_already_revoked(&self) -> bool {
        matches!(self, ProviderError::AlreadyRevoked { .. })
    }

    /// The provider's original error code.
    pub fn code(&self) -> &str {
        match self {
            ProviderError::NotFound { code, .. }
            | ProviderError::AlreadyRevoked { code, .. }
            | ProviderError::Other { code, .. } => code,
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectOutput {
    pub version_id: String,
}

/// One object version (or delete marker) in a versioned bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectIdentifier {
    pub key: String,
    pub version_id: String,
}

/// Continuation point for [`ObjectStore::list_object_versions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMarker {
    pub key_marker: String,
    pub version_id_marker: Option<String>,
}

/// One page of object versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectVersionPage {
    pub versions: Vec<ObjectIdentifier>,
    pub delete_markers: Vec<ObjectIdentifier>,
    /// Present when more pages remain.
    pub next_marker: Option<VersionMarker>,
}

/// Object storage operations used by provisioning and the sign pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn head_bucket(&self, bucket: &str) -> Result<(), ProviderError>;

    /// Create a bucket. `location` is the region constraint, `None` for the
    /// default region.
    async fn create_bucket(&self, bucket: &str, location: Option<&str>)
        -> Result<(), ProviderError>;

    async fn enable_versioning(&self, bucket: &str) -> Result<(), ProviderError>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<PutObjectOutput, ProviderError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ProviderError>;

    async fn list_object_versions(
        &self,
        bucket: &str,
        marker: Option<&VersionMarker>,
    ) -> Result<ObjectVersionPage, ProviderError>;

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectIdentifier],
    ) -> Result<(), ProviderError>;

    async fn delete_bucket(&self, bucket: &str) -> Result<(), ProviderError>;
}

/// A signing platform offered by the signing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPlatform {
    pub platform_id: String,
    pub partner: String,
    pub display_name: Option<String>,
}

/// Lifecycle status of a signing profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileStatus {
    Active,
    Canceled,
    Revoked,
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileStatus::Active => write!(f, "Active"),
            ProfileStatus::Canceled => write!(f, "Canceled"),
            ProfileStatus::Revoked => write!(f, "Revoked"),
        }
    }
}

/// Description of a signing profile as returned by the signing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningProfile {
    pub profile_name: String,
    pub profile_version: Option<String>,
    pub profile_version_arn: Option<String>,
    pub platform_id: String,
    pub status: ProfileStatus,
}

/// A versioned object used as the input of a signing job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceObject {
    pub bucket: String,
    pub key: String,
    pub version: String,
}

/// Where a signing job writes the signed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationPrefix {
    pub bucket: String,
    pub prefix: String,
}

/// Location of a signed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedObject {
    pub bucket: String,
    pub key: String,
}

/// Signing job submission.
///
/// Carries only what the signing service accepts: the signing policy and
/// the retention flag stay local.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartJobRequest {
    pub source: SourceObject,
    pub destination: DestinationPrefix,
    pub profile_name: String,
}

/// Status reported for a signing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    InProgress,
    Succeeded,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::InProgress => write!(f, "InProgress"),
            JobStatus::Succeeded => write!(f, "Succeeded"),
            JobStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Result of describing a signing job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescription {
    pub job_id: String,
    pub status: JobStatus,
    pub status_reason: Option<String>,
    pub signed_object: Option<SignedObject>,
}

/// Signing service operations.
#[async_trait]
pub trait SigningService: Send + Sync {
    async fn list_platforms(&self, partner: &str) -> Result<Vec<SigningPlatform>, ProviderError>;

    async fn put_profile(&self, platform_id: &str, profile_name: &str)
        -> Result<(), ProviderError>;

    async fn get_profile(&self, profile_name: &str) -> Result<SigningProfile, ProviderError>;

    async fn revoke_profile(
        &self,
        profile_name: &str,
        profile_version: &str,
        effective_time: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), ProviderError>;

    /// Submit a signing job and return its id.
    async fn start_job(&self, request: &StartJobRequest) -> Result<String, ProviderError>;

    async fn describe_job(&self, job_id: &str) -> Result<JobDescription, ProviderError>;
}
