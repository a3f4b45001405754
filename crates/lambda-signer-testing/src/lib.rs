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

//! # lambda-signer-testing
//!
//! Scriptable in-memory fakes of [`ObjectStore`] and [`SigningService`].
//!
//! Both fakes append every call to a shared [`CallLog`], so tests can assert
//! on the order of operations across the two services:
//!
//! ```rust,ignore
//! let log = CallLog::new();
//! let store = Arc::new(FakeObjectStore::new(log.clone()));
//! let signer = Arc::new(FakeSigningService::new(log.clone()));
//!
//! signer.push_job_status(FakeSigningService::in_progress("j1"));
//! signer.push_job_status(FakeSigningService::succeeded("j1", "b1", "signed/api"));
//!
//! // ... run the code under test ...
//!
//! assert!(log.position(|c| matches!(c, Call::PutProfile { .. }))
//!     < log.position(|c| matches!(c, Call::HeadBucket(_))));
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lambda_signer::provider::{
    JobDescription, JobStatus, ObjectIdentifier, ObjectStore, ObjectVersionPage, ProfileStatus,
    ProviderError, PutObjectOutput, SignedObject, SigningPlatform, SigningProfile,
    SigningService, StartJobRequest, VersionMarker, LAMBDA_PARTNER_ID,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

/// A recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    HeadBucket(String),
    CreateBucket {
        bucket: String,
        location: Option<String>,
    },
    EnableVersioning(String),
    PutObject {
        bucket: String,
        key: String,
        size: usize,
    },
    GetObject {
        bucket: String,
        key: String,
    },
    ListObjectVersions(String),
    DeleteObjects {
        bucket: String,
        count: usize,
    },
    DeleteBucket(String),
    ListPlatforms(String),
    PutProfile {
        platform_id: String,
        profile_name: String,
    },
    GetProfile(String),
    RevokeProfile {
        profile_name: String,
        profile_version: String,
        reason: String,
    },
    StartJob(StartJobRequest),
    DescribeJob(String),
}

impl Call {
    /// Whether this call touches an object-store bucket.
    pub fn is_bucket_operation(&self) -> bool {
        matches!(
            self,
            Call::HeadBucket(_)
                | Call::CreateBucket { .. }
                | Call::EnableVersioning(_)
                | Call::PutObject { .. }
                | Call::GetObject { .. }
                | Call::ListObjectVersions(_)
                | Call::DeleteObjects { .. }
                | Call::DeleteBucket(_)
        )
    }
}

/// Ordered record of calls shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Index of the first matching call, if any.
    pub fn position(&self, predicate: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.lock().iter().position(|c| predicate(c))
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

/// Errors queued per operation name, consumed one per call.
#[derive(Debug, Default)]
struct FailureQueue {
    queued: Mutex<HashMap<&'static str, VecDeque<ProviderError>>>,
}

impl FailureQueue {
    fn push(&self, operation: &'static str, error: ProviderError) {
        self.queued
            .lock()
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    fn take(&self, operation: &'static str) -> Result<(), ProviderError> {
        match self
            .queued
            .lock()
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredVersion {
    key: String,
    version_id: String,
    body: Vec<u8>,
    delete_marker: bool,
}

#[derive(Debug, Default)]
struct FakeBucket {
    location: Option<String>,
    versioning: bool,
    versions: Vec<StoredVersion>,
}

fn after_marker(key: &str, version_id: &str, marker: &VersionMarker) -> bool {
    match marker.version_id_marker.as_deref() {
        Some(marker_version) => (key, version_id) > (marker.key_marker.as_str(), marker_version),
        None => key > marker.key_marker.as_str(),
    }
}

/// In-memory object store.
///
/// Operation names accepted by [`FakeObjectStore::fail_next`] are
/// `HeadBucket`, `CreateBucket`, `PutBucketVersioning`, `PutObject`,
/// `GetObject`, `ListObjectVersions`, `DeleteObjects` and `DeleteBucket`.
#[derive(Debug)]
pub struct FakeObjectStore {
    log: CallLog,
    buckets: Mutex<BTreeMap<String, FakeBucket>>,
    version_ids: Mutex<VecDeque<String>>,
    next_version: Mutex<u64>,
    page_size: usize,
    failures: FailureQueue,
}

impl FakeObjectStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            buckets: Mutex::new(BTreeMap::new()),
            version_ids: Mutex::new(VecDeque::new()),
            next_version: Mutex::new(0),
            page_size: 1000,
            failures: FailureQueue::default(),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Create `bucket` without recording a call.
    pub fn add_bucket(&self, bucket: &str) {
        self.buckets.lock().entry(bucket.to_string()).or_default();
    }

    /// Store an object without recording a call.
    pub fn insert_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) -> String {
        let version_id = self.next_version_id();
        self.buckets
            .lock()
            .entry(bucket.to_string())
            .or_default()
            .versions
            .push(StoredVersion {
                key: key.to_string(),
                version_id: version_id.clone(),
                body: body.into(),
                delete_marker: false,
            });
        version_id
    }

    /// Add a delete marker for `key` without recording a call.
    pub fn insert_delete_marker(&self, bucket: &str, key: &str) {
        let version_id = self.next_version_id();
        self.buckets
            .lock()
            .entry(bucket.to_string())
            .or_default()
            .versions
            .push(StoredVersion {
                key: key.to_string(),
                version_id,
                body: Vec::new(),
                delete_marker: true,
            });
    }

    /// Version id returned by the next upload.
    pub fn push_version_id(&self, version_id: impl Into<String>) {
        self.version_ids.lock().push_back(version_id.into());
    }

    /// Fail the next call of `operation` with `error`.
    pub fn fail_next(&self, operation: &'static str, error: ProviderError) {
        self.failures.push(operation, error);
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.lock().contains_key(bucket)
    }

    pub fn bucket_location(&self, bucket: &str) -> Option<String> {
        self.buckets
            .lock()
            .get(bucket)
            .and_then(|b| b.location.clone())
    }

    pub fn is_versioned(&self, bucket: &str) -> bool {
        self.buckets
            .lock()
            .get(bucket)
            .is_some_and(|b| b.versioning)
    }

    /// Number of stored versions and delete markers in `bucket`.
    pub fn version_count(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .get(bucket)
            .map_or(0, |b| b.versions.len())
    }

    /// Latest body stored under `key`, ignoring delete markers.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets.lock().get(bucket).and_then(|b| {
            b.versions
                .iter()
                .rev()
                .find(|v| v.key == key && !v.delete_marker)
                .map(|v| v.body.clone())
        })
    }

    fn next_version_id(&self) -> String {
        if let Some(id) = self.version_ids.lock().pop_front() {
            return id;
        }
        let mut next = self.next_version.lock();
        *next += 1;
        format!("version-{}", *next)
    }

    fn no_such_bucket(operation: &str, bucket: &str) -> ProviderError {
        ProviderError::from_code(operation, "NoSuchBucket", format!("{} does not exist", bucket))
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn head_bucket(&self, bucket: &str) -> Result<(), ProviderError> {
        self.log.record(Call::HeadBucket(bucket.to_string()));
        self.failures.take("HeadBucket")?;

        if self.has_bucket(bucket) {
            Ok(())
        } else {
            Err(ProviderError::from_code("HeadBucket", "NotFound", "Not Found"))
        }
    }

    async fn create_bucket(
        &self,
        bucket: &str,
        location: Option<&str>,
    ) -> Result<(), ProviderError> {
        self.log.record(Call::CreateBucket {
            bucket: bucket.to_string(),
            location: location.map(str::to_string),
        });
        self.failures.take("CreateBucket")?;

        let mut buckets = self.buckets.lock();
        if buckets.contains_key(bucket) {
            return Err(ProviderError::from_code(
                "CreateBucket",
                "BucketAlreadyOwnedByYou",
                "Your previous request to create the named bucket succeeded",
            ));
        }
        buckets.insert(
            bucket.to_string(),
            FakeBucket {
                location: location.map(str::to_string),
                ..FakeBucket::default()
            },
        );
        Ok(())
    }

    async fn enable_versioning(&self, bucket: &str) -> Result<(), ProviderError> {
        self.log.record(Call::EnableVersioning(bucket.to_string()));
        self.failures.take("PutBucketVersioning")?;

        let mut buckets = self.buckets.lock();
        let entry = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket("PutBucketVersioning", bucket))?;
        entry.versioning = true;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<PutObjectOutput, ProviderError> {
        self.log.record(Call::PutObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: body.len(),
        });
        self.failures.take("PutObject")?;

        if !self.has_bucket(bucket) {
            return Err(Self::no_such_bucket("PutObject", bucket));
        }
        let version_id = self.insert_object(bucket, key, body);
        Ok(PutObjectOutput { version_id })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ProviderError> {
        self.log.record(Call::GetObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.failures.take("GetObject")?;

        if !self.has_bucket(bucket) {
            return Err(Self::no_such_bucket("GetObject", bucket));
        }
        self.object(bucket, key).ok_or_else(|| {
            ProviderError::from_code("GetObject", "NoSuchKey", format!("{} does not exist", key))
        })
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        marker: Option<&VersionMarker>,
    ) -> Result<ObjectVersionPage, ProviderError> {
        self.log.record(Call::ListObjectVersions(bucket.to_string()));
        self.failures.take("ListObjectVersions")?;

        let buckets = self.buckets.lock();
        let entry = buckets
            .get(bucket)
            .ok_or_else(|| Self::no_such_bucket("ListObjectVersions", bucket))?;

        // Listings are ordered by key then version id, and resume strictly
        // after the marker even when the marked entry has since been deleted.
        let mut entries: Vec<&StoredVersion> = entry.versions.iter().collect();
        entries.sort_by(|a, b| (&a.key, &a.version_id).cmp(&(&b.key, &b.version_id)));

        let start = match marker {
            None => 0,
            Some(marker) => entries
                .iter()
                .position(|v| after_marker(&v.key, &v.version_id, marker))
                .unwrap_or(entries.len()),
        };
        let end = (start + self.page_size).min(entries.len());

        let mut page = ObjectVersionPage::default();
        for version in &entries[start..end] {
            let id = ObjectIdentifier {
                key: version.key.clone(),
                version_id: version.version_id.clone(),
            };
            if version.delete_marker {
                page.delete_markers.push(id);
            } else {
                page.versions.push(id);
            }
        }
        if end < entries.len() {
            let last = entries[end - 1];
            page.next_marker = Some(VersionMarker {
                key_marker: last.key.clone(),
                version_id_marker: Some(last.version_id.clone()),
            });
        }

        Ok(page)
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectIdentifier],
    ) -> Result<(), ProviderError> {
        self.log.record(Call::DeleteObjects {
            bucket: bucket.to_string(),
            count: objects.len(),
        });
        self.failures.take("DeleteObjects")?;

        let mut buckets = self.buckets.lock();
        let entry = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket("DeleteObjects", bucket))?;
        entry.versions.retain(|v| {
            !objects
                .iter()
                .any(|o| o.key == v.key && o.version_id == v.version_id)
        });
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), ProviderError> {
        self.log.record(Call::DeleteBucket(bucket.to_string()));
        self.failures.take("DeleteBucket")?;

        let mut buckets = self.buckets.lock();
        match buckets.get(bucket) {
            None => Err(Self::no_such_bucket("DeleteBucket", bucket)),
            Some(entry) if !entry.versions.is_empty() => Err(ProviderError::from_code(
                "DeleteBucket",
                "BucketNotEmpty",
                "The bucket you tried to delete is not empty",
            )),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }
}

/// In-memory signing service with scripted job progress.
///
/// `describe_job` pops statuses queued with
/// [`push_job_status`](FakeSigningService::push_job_status); once the queue
/// is empty the last popped status repeats. Operation names accepted by
/// [`fail_next`](FakeSigningService::fail_next) are `ListSigningPlatforms`,
/// `PutSigningProfile`, `GetSigningProfile`, `RevokeSigningProfile`,
/// `StartSigningJob` and `DescribeSigningJob`.
#[derive(Debug)]
pub struct FakeSigningService {
    log: CallLog,
    region: String,
    platforms: Mutex<Vec<SigningPlatform>>,
    profiles: Mutex<BTreeMap<String, SigningProfile>>,
    job_ids: Mutex<VecDeque<String>>,
    statuses: Mutex<VecDeque<JobDescription>>,
    last_status: Mutex<Option<JobDescription>>,
    failures: FailureQueue,
}

impl FakeSigningService {
    pub const DEFAULT_PLATFORM: &'static str = "AWSLambda-SHA384-ECDSA";

    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            region: "us-east-1".to_string(),
            platforms: Mutex::new(vec![SigningPlatform {
                platform_id: Self::DEFAULT_PLATFORM.to_string(),
                partner: LAMBDA_PARTNER_ID.to_string(),
                display_name: Some("AWS Lambda".to_string()),
            }]),
            profiles: Mutex::new(BTreeMap::new()),
            job_ids: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(None),
            failures: FailureQueue::default(),
        }
    }

    /// Replace the platforms offered to the Lambda partner.
    pub fn set_platforms(&self, platform_ids: &[&str]) {
        *self.platforms.lock() = platform_ids
            .iter()
            .map(|id| SigningPlatform {
                platform_id: id.to_string(),
                partner: LAMBDA_PARTNER_ID.to_string(),
                display_name: None,
            })
            .collect();
    }

    /// Register an active profile without recording a call.
    pub fn add_profile(&self, profile_name: &str, profile_version: &str) {
        let profile = SigningProfile {
            profile_name: profile_name.to_string(),
            profile_version: Some(profile_version.to_string()),
            profile_version_arn: Some(self.arn(profile_name, profile_version)),
            platform_id: Self::DEFAULT_PLATFORM.to_string(),
            status: ProfileStatus::Active,
        };
        self.profiles.lock().insert(profile_name.to_string(), profile);
    }

    pub fn profile(&self, profile_name: &str) -> Option<SigningProfile> {
        self.profiles.lock().get(profile_name).cloned()
    }

    /// Job id returned by the next `start_job`.
    pub fn push_job_id(&self, job_id: impl Into<String>) {
        self.job_ids.lock().push_back(job_id.into());
    }

    pub fn push_job_status(&self, description: JobDescription) {
        self.statuses.lock().push_back(description);
    }

    /// Fail the next call of `operation` with `error`.
    pub fn fail_next(&self, operation: &'static str, error: ProviderError) {
        self.failures.push(operation, error);
    }

    pub fn arn(&self, profile_name: &str, profile_version: &str) -> String {
        format!(
            "arn:aws:signer:{}:123456789012:/signing-profiles/{}/{}",
            self.region, profile_name, profile_version
        )
    }

    pub fn in_progress(job_id: &str) -> JobDescription {
        JobDescription {
            job_id: job_id.to_string(),
            status: JobStatus::InProgress,
            status_reason: None,
            signed_object: None,
        }
    }

    pub fn succeeded(job_id: &str, bucket: &str, key: &str) -> JobDescription {
        JobDescription {
            job_id: job_id.to_string(),
            status: JobStatus::Succeeded,
            status_reason: Some("Signing Succeeded".to_string()),
            signed_object: Some(SignedObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
        }
    }

    pub fn failed(job_id: &str, reason: Option<&str>) -> JobDescription {
        JobDescription {
            job_id: job_id.to_string(),
            status: JobStatus::Failed,
            status_reason: reason.map(str::to_string),
            signed_object: None,
        }
    }

    fn profile_not_found(operation: &str, profile_name: &str) -> ProviderError {
        ProviderError::from_code(
            operation,
            "ResourceNotFoundException",
            format!("Profile {} not found", profile_name),
        )
    }
}

#[async_trait]
impl SigningService for FakeSigningService {
    async fn list_platforms(&self, partner: &str) -> Result<Vec<SigningPlatform>, ProviderError> {
        self.log.record(Call::ListPlatforms(partner.to_string()));
        self.failures.take("ListSigningPlatforms")?;

        Ok(self
            .platforms
            .lock()
            .iter()
            .filter(|p| p.partner == partner)
            .cloned()
            .collect())
    }

    async fn put_profile(
        &self,
        platform_id: &str,
        profile_name: &str,
    ) -> Result<(), ProviderError> {
        self.log.record(Call::PutProfile {
            platform_id: platform_id.to_string(),
            profile_name: profile_name.to_string(),
        });
        self.failures.take("PutSigningProfile")?;

        let version = format!("{}-v1", profile_name);
        let profile = SigningProfile {
            profile_name: profile_name.to_string(),
            profile_version: Some(version.clone()),
            profile_version_arn: Some(self.arn(profile_name, &version)),
            platform_id: platform_id.to_string(),
            status: ProfileStatus::Active,
        };
        self.profiles.lock().insert(profile_name.to_string(), profile);
        Ok(())
    }

    async fn get_profile(&self, profile_name: &str) -> Result<SigningProfile, ProviderError> {
        self.log.record(Call::GetProfile(profile_name.to_string()));
        self.failures.take("GetSigningProfile")?;

        self.profile(profile_name)
            .ok_or_else(|| Self::profile_not_found("GetSigningProfile", profile_name))
    }

    async fn revoke_profile(
        &self,
        profile_name: &str,
        profile_version: &str,
        _effective_time: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), ProviderError> {
        self.log.record(Call::RevokeProfile {
            profile_name: profile_name.to_string(),
            profile_version: profile_version.to_string(),
            reason: reason.to_string(),
        });
        self.failures.take("RevokeSigningProfile")?;

        let mut profiles = self.profiles.lock();
        let profile = profiles
            .get_mut(profile_name)
            .ok_or_else(|| Self::profile_not_found("RevokeSigningProfile", profile_name))?;
        if profile.status == ProfileStatus::Revoked {
            return Err(ProviderError::from_code(
                "RevokeSigningProfile",
                "ValidationException",
                format!("Profile {} is already revoked", profile_name),
            ));
        }
        profile.status = ProfileStatus::Revoked;
        Ok(())
    }

    async fn start_job(&self, request: &StartJobRequest) -> Result<String, ProviderError> {
        self.log.record(Call::StartJob(request.clone()));
        self.failures.take("StartSigningJob")?;

        Ok(self
            .job_ids
            .lock()
            .pop_front()
            .unwrap_or_else(|| "job-1".to_string()))
    }

    async fn describe_job(&self, job_id: &str) -> Result<JobDescription, ProviderError> {
        self.log.record(Call::DescribeJob(job_id.to_string()));
        self.failures.take("DescribeSigningJob")?;

        let mut last = self.last_status.lock();
        if let Some(next) = self.statuses.lock().pop_front() {
            *last = Some(next);
        }
        last.clone().ok_or_else(|| {
            ProviderError::from_code(
                "DescribeSigningJob",
                "ResourceNotFoundException",
                format!("Job {} not found", job_id),
            )
        })
    }
}
