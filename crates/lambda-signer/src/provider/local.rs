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

//! Filesystem-backed object store and Ed25519 signing service.
//!
//! Lets the whole signing workflow run offline against a state directory:
//!
//! ```text
//! <root>/
//!   buckets/<bucket>/index.json     versioning flag and object versions
//!   buckets/<bucket>/data/<version> object bytes
//!   profiles/<name>.json            profile record with its keypair
//! ```
//!
//! Signing jobs complete synchronously inside `start_job`; their outcome is
//! kept in memory for `describe_job`.

use super::{
    DestinationPrefix, JobDescription, JobStatus, ObjectIdentifier, ObjectStore,
    ObjectVersionPage, ProfileStatus, ProviderError, PutObjectOutput, SignedObject,
    SigningPlatform, SigningProfile, SigningService, SourceObject, StartJobRequest,
    VersionMarker, DEFAULT_REGION, LAMBDA_PARTNER_ID,
};
use crate::crypto::{generate_signing_keypair, DetachedSignature};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Platform offered by [`LocalSigningService`].
pub const LOCAL_PLATFORM_ID: &str = "AWSLambda-Local-Ed25519";

/// Account id used in locally generated ARNs.
pub const LOCAL_ACCOUNT_ID: &str = "000000000000";

/// Suffix of the detached signature written next to each signed object.
pub const SIGNATURE_SUFFIX: &str = ".sig";

fn io_error(operation: &str, error: impl std::fmt::Display) -> ProviderError {
    ProviderError::other(operation, "InternalError", error.to_string())
}

fn no_such_bucket(operation: &str, bucket: &str) -> ProviderError {
    ProviderError::from_code(
        operation,
        "NoSuchBucket",
        format!("The specified bucket does not exist: {}", bucket),
    )
}

fn validate_name(operation: &str, name: &str) -> Result<(), ProviderError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
        && name != "."
        && name != "..";
    if valid {
        Ok(())
    } else {
        Err(ProviderError::other(
            operation,
            "InvalidName",
            format!("Invalid resource name: {:?}", name),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionEntry {
    version_id: String,
    delete_marker: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BucketIndex {
    location: Option<String>,
    versioning: bool,
    /// Versions per key, oldest first.
    objects: BTreeMap<String, Vec<VersionEntry>>,
}

/// Object store keeping buckets as directories.
pub struct LocalObjectStore {
    root: PathBuf,
    page_size: usize,
    lock: Mutex<()>,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            page_size: 1000,
            lock: Mutex::new(()),
        }
    }

    /// Limit the number of entries per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join("buckets").join(bucket)
    }

    fn data_path(&self, bucket: &str, version_id: &str) -> PathBuf {
        self.bucket_dir(bucket).join("data").join(version_id)
    }

    fn read_index(&self, operation: &str, bucket: &str) -> Result<BucketIndex, ProviderError> {
        validate_name(operation, bucket)?;
        let path = self.bucket_dir(bucket).join("index.json");
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(no_such_bucket(operation, bucket))
            }
            Err(e) => return Err(io_error(operation, e)),
        };
        serde_json::from_slice(&content).map_err(|e| io_error(operation, e))
    }

    fn write_index(
        &self,
        operation: &str,
        bucket: &str,
        index: &BucketIndex,
    ) -> Result<(), ProviderError> {
        let json = serde_json::to_vec_pretty(index).map_err(|e| io_error(operation, e))?;
        fs::write(self.bucket_dir(bucket).join("index.json"), json)
            .map_err(|e| io_error(operation, e))
    }

    fn store_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<PutObjectOutput, ProviderError> {
        const OP: &str = "PutObject";
        let _guard = self.lock.lock();
        let mut index = self.read_index(OP, bucket)?;
        let versioning = index.versioning;

        let versions = index.objects.entry(key.to_string()).or_default();
        let version_id = if versioning {
            uuid::Uuid::new_v4().simple().to_string()
        } else {
            // Unversioned buckets keep a single version per key.
            versions.clear();
            format!("null-{}", crate::crypto::compute_digest(key.as_bytes()))
        };
        versions.push(VersionEntry {
            version_id: version_id.clone(),
            delete_marker: false,
        });

        fs::write(self.data_path(bucket, &version_id), body).map_err(|e| io_error(OP, e))?;
        self.write_index(OP, bucket, &index)?;

        debug!(bucket = %bucket, key = %key, version_id = %version_id, "Stored object");
        Ok(PutObjectOutput { version_id })
    }

    /// Read a specific object version. Delete markers read as missing.
    pub fn get_object_version(
        &self,
        bucket: &str,
        key: &str,
        version_id: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        const OP: &str = "GetObject";
        let _guard = self.lock.lock();
        let index = self.read_index(OP, bucket)?;

        let exists = index
            .objects
            .get(key)
            .and_then(|versions| versions.iter().find(|v| v.version_id == version_id))
            .is_some_and(|v| !v.delete_marker);
        if !exists {
            return Err(ProviderError::from_code(
                OP,
                "NoSuchVersion",
                format!("Version {} of {}/{} does not exist", version_id, bucket, key),
            ));
        }

        fs::read(self.data_path(bucket, version_id)).map_err(|e| io_error(OP, e))
    }

    /// Place a delete marker on `key`, hiding its current version.
    pub fn delete_object(&self, bucket: &str, key: &str) -> Result<String, ProviderError> {
        const OP: &str = "DeleteObject";
        let _guard = self.lock.lock();
        let mut index = self.read_index(OP, bucket)?;

        let version_id = uuid::Uuid::new_v4().simple().to_string();
        index
            .objects
            .entry(key.to_string())
            .or_default()
            .push(VersionEntry {
                version_id: version_id.clone(),
                delete_marker: true,
            });
        self.write_index(OP, bucket, &index)?;
        Ok(version_id)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn head_bucket(&self, bucket: &str) -> Result<(), ProviderError> {
        let _guard = self.lock.lock();
        self.read_index("HeadBucket", bucket).map(|_| ())
    }

    async fn create_bucket(
        &self,
        bucket: &str,
        location: Option<&str>,
    ) -> Result<(), ProviderError> {
        const OP: &str = "CreateBucket";
        validate_name(OP, bucket)?;
        let _guard = self.lock.lock();

        let dir = self.bucket_dir(bucket);
        if dir.join("index.json").exists() {
            return Err(ProviderError::from_code(
                OP,
                "BucketAlreadyOwnedByYou",
                format!("Bucket {} already exists", bucket),
            ));
        }
        fs::create_dir_all(dir.join("data")).map_err(|e| io_error(OP, e))?;

        let index = BucketIndex {
            location: location.map(str::to_string),
            ..BucketIndex::default()
        };
        self.write_index(OP, bucket, &index)
    }

    async fn enable_versioning(&self, bucket: &str) -> Result<(), ProviderError> {
        const OP: &str = "PutBucketVersioning";
        let _guard = self.lock.lock();
        let mut index = self.read_index(OP, bucket)?;
        index.versioning = true;
        self.write_index(OP, bucket, &index)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<PutObjectOutput, ProviderError> {
        self.store_object(bucket, key, body)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ProviderError> {
        const OP: &str = "GetObject";
        let _guard = self.lock.lock();
        let index = self.read_index(OP, bucket)?;

        let latest = index
            .objects
            .get(key)
            .and_then(|versions| versions.last())
            .filter(|v| !v.delete_marker)
            .ok_or_else(|| {
                ProviderError::from_code(
                    OP,
                    "NoSuchKey",
                    format!("The specified key does not exist: {}", key),
                )
            })?;

        fs::read(self.data_path(bucket, &latest.version_id)).map_err(|e| io_error(OP, e))
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        marker: Option<&VersionMarker>,
    ) -> Result<ObjectVersionPage, ProviderError> {
        let _guard = self.lock.lock();
        let index = self.read_index("ListObjectVersions", bucket)?;

        let mut entries: Vec<(&String, &VersionEntry)> = index
            .objects
            .iter()
            .flat_map(|(key, versions)| versions.iter().map(move |v| (key, v)))
            .collect();
        entries.sort_by(|a, b| (a.0, &a.1.version_id).cmp(&(b.0, &b.1.version_id)));

        // Resume strictly after the marker; the marked entry may be gone.
        let start = match marker {
            None => 0,
            Some(marker) => entries
                .iter()
                .position(|(key, v)| match marker.version_id_marker.as_deref() {
                    Some(version) => {
                        (key.as_str(), v.version_id.as_str())
                            > (marker.key_marker.as_str(), version)
                    }
                    None => key.as_str() > marker.key_marker.as_str(),
                })
                .unwrap_or(entries.len()),
        };

        let mut page = ObjectVersionPage::default();
        let end = (start + self.page_size).min(entries.len());
        for (key, entry) in &entries[start..end] {
            let id = ObjectIdentifier {
                key: (*key).clone(),
                version_id: entry.version_id.clone(),
            };
            if entry.delete_marker {
                page.delete_markers.push(id);
            } else {
                page.versions.push(id);
            }
        }

        if end < entries.len() {
            let (key, entry) = entries[end - 1];
            page.next_marker = Some(VersionMarker {
                key_marker: key.clone(),
                version_id_marker: Some(entry.version_id.clone()),
            });
        }

        Ok(page)
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[ObjectIdentifier],
    ) -> Result<(), ProviderError> {
        const OP: &str = "DeleteObjects";
        let _guard = self.lock.lock();
        let mut index = self.read_index(OP, bucket)?;

        for object in objects {
            if let Some(versions) = index.objects.get_mut(&object.key) {
                versions.retain(|v| v.version_id != object.version_id);
                if versions.is_empty() {
                    index.objects.remove(&object.key);
                }
            }
            let path = self.data_path(bucket, &object.version_id);
            if path.exists() {
                fs::remove_file(path).map_err(|e| io_error(OP, e))?;
            }
        }

        self.write_index(OP, bucket, &index)
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), ProviderError> {
        const OP: &str = "DeleteBucket";
        let _guard = self.lock.lock();
        let index = self.read_index(OP, bucket)?;

        if !index.objects.is_empty() {
            return Err(ProviderError::from_code(
                OP,
                "BucketNotEmpty",
                "The bucket you tried to delete is not empty",
            ));
        }
        fs::remove_dir_all(self.bucket_dir(bucket)).map_err(|e| io_error(OP, e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProfileRecord {
    profile_name: String,
    profile_version: String,
    platform_id: String,
    status: ProfileStatus,
    public_key: String,
    private_key: String,
    revocation_reason: Option<String>,
    revoked_at: Option<DateTime<Utc>>,
}

/// Signing service that signs artifacts with per-profile Ed25519 keys.
pub struct LocalSigningService {
    root: PathBuf,
    region: String,
    store: Arc<LocalObjectStore>,
    jobs: Mutex<HashMap<String, JobDescription>>,
}

impl LocalSigningService {
    pub fn new(
        root: impl Into<PathBuf>,
        region: impl Into<String>,
        store: Arc<LocalObjectStore>,
    ) -> Self {
        Self {
            root: root.into(),
            region: region.into(),
            store,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    fn profile_path(&self, profile_name: &str) -> PathBuf {
        self.root
            .join("profiles")
            .join(format!("{}.json", profile_name))
    }

    fn profile_arn(&self, record: &ProfileRecord) -> String {
        format!(
            "arn:aws:signer:{}:{}:/signing-profiles/{}/{}",
            self.region, LOCAL_ACCOUNT_ID, record.profile_name, record.profile_version
        )
    }

    fn read_profile(&self, operation: &str, profile_name: &str) -> Result<ProfileRecord, ProviderError> {
        validate_name(operation, profile_name)?;
        match fs::read(self.profile_path(profile_name)) {
            Ok(content) => serde_json::from_slice(&content).map_err(|e| io_error(operation, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ProviderError::from_code(
                operation,
                "ResourceNotFoundException",
                format!("Signing profile {} does not exist", profile_name),
            )),
            Err(e) => Err(io_error(operation, e)),
        }
    }

    fn write_profile(&self, operation: &str, record: &ProfileRecord) -> Result<(), ProviderError> {
        let path = self.profile_path(&record.profile_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(operation, e))?;
        }
        let json = serde_json::to_vec_pretty(record).map_err(|e| io_error(operation, e))?;
        fs::write(path, json).map_err(|e| io_error(operation, e))
    }

    /// Sign `source` with `record`, writing the signed object and its
    /// detached signature under `destination`.
    fn sign_source(
        &self,
        record: &ProfileRecord,
        source: &SourceObject,
        destination: &DestinationPrefix,
    ) -> Result<SignedObject, String> {
        if record.status != ProfileStatus::Active {
            return Err(format!(
                "Signing profile {} is {}",
                record.profile_name, record.status
            ));
        }

        let artifact = self
            .store
            .get_object_version(&source.bucket, &source.key, &source.version)
            .map_err(|e| e.to_string())?;

        let private_key = BASE64
            .decode(&record.private_key)
            .map_err(|e| e.to_string())?;
        let public_key = BASE64.decode(&record.public_key).map_err(|e| e.to_string())?;
        let document = DetachedSignature::create(
            &artifact,
            &record.profile_name,
            &record.profile_version,
            &private_key,
            &public_key,
        )
        .map_err(|e| e.to_string())?;
        let document = document.to_json().map_err(|e| e.to_string())?;

        let key = format!("{}{}", destination.prefix, source.key);
        self.store
            .store_object(&destination.bucket, &key, artifact)
            .map_err(|e| e.to_string())?;
        self.store
            .store_object(
                &destination.bucket,
                &format!("{}{}", key, SIGNATURE_SUFFIX),
                document,
            )
            .map_err(|e| e.to_string())?;

        Ok(SignedObject {
            bucket: destination.bucket.clone(),
            key,
        })
    }

    /// Verify a signed object against its detached signature and the
    /// profile's public key.
    pub async fn verify_signed_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<DetachedSignature, ProviderError> {
        const OP: &str = "VerifySignedObject";
        let artifact = self.store.get_object(bucket, key).await?;
        let document = self
            .store
            .get_object(bucket, &format!("{}{}", key, SIGNATURE_SUFFIX))
            .await?;
        let document =
            DetachedSignature::from_json(&document).map_err(|e| io_error(OP, e))?;

        let record = self.read_profile(OP, &document.profile_name)?;
        let public_key = BASE64
            .decode(&record.public_key)
            .map_err(|e| io_error(OP, e))?;
        document
            .verify(&artifact, &public_key)
            .map_err(|e| ProviderError::other(OP, "InvalidSignature", e.to_string()))?;

        Ok(document)
    }
}

#[async_trait]
impl SigningService for LocalSigningService {
    async fn list_platforms(&self, partner: &str) -> Result<Vec<SigningPlatform>, ProviderError> {
        if partner != LAMBDA_PARTNER_ID {
            return Ok(Vec::new());
        }
        Ok(vec![SigningPlatform {
            platform_id: LOCAL_PLATFORM_ID.to_string(),
            partner: LAMBDA_PARTNER_ID.to_string(),
            display_name: Some("AWS Lambda (local Ed25519)".to_string()),
        }])
    }

    async fn put_profile(
        &self,
        platform_id: &str,
        profile_name: &str,
    ) -> Result<(), ProviderError> {
        const OP: &str = "PutSigningProfile";
        validate_name(OP, profile_name)?;
        if platform_id != LOCAL_PLATFORM_ID {
            return Err(ProviderError::from_code(
                OP,
                "ValidationException",
                format!("Unknown signing platform {}", platform_id),
            ));
        }

        let keypair = generate_signing_keypair();
        let record = ProfileRecord {
            profile_name: profile_name.to_string(),
            profile_version: keypair.fingerprint[..10].to_string(),
            platform_id: platform_id.to_string(),
            status: ProfileStatus::Active,
            public_key: BASE64.encode(&keypair.public_key),
            private_key: BASE64.encode(&keypair.private_key),
            revocation_reason: None,
            revoked_at: None,
        };
        self.write_profile(OP, &record)
    }

    async fn get_profile(&self, profile_name: &str) -> Result<SigningProfile, ProviderError> {
        let record = self.read_profile("GetSigningProfile", profile_name)?;
        Ok(SigningProfile {
            profile_name: record.profile_name.clone(),
            profile_version: Some(record.profile_version.clone()),
            profile_version_arn: Some(self.profile_arn(&record)),
            platform_id: record.platform_id.clone(),
            status: record.status,
        })
    }

    async fn revoke_profile(
        &self,
        profile_name: &str,
        profile_version: &str,
        effective_time: DateTime<Utc>,
        reason: &str,
    ) -> Result<(), ProviderError> {
        const OP: &str = "RevokeSigningProfile";
        let mut record = self.read_profile(OP, profile_name)?;

        if record.profile_version != profile_version {
            return Err(ProviderError::from_code(
                OP,
                "ValidationException",
                format!(
                    "Profile version {} does not match current version {}",
                    profile_version, record.profile_version
                ),
            ));
        }
        if record.status == ProfileStatus::Revoked {
            return Err(ProviderError::from_code(
                OP,
                "ValidationException",
                format!(
                    "Profile {} version {} is already revoked",
                    profile_name, profile_version
                ),
            ));
        }

        record.status = ProfileStatus::Revoked;
        record.revocation_reason = Some(reason.to_string());
        record.revoked_at = Some(effective_time);
        self.write_profile(OP, &record)
    }

    async fn start_job(&self, request: &StartJobRequest) -> Result<String, ProviderError> {
        const OP: &str = "StartSigningJob";
        let record = self.read_profile(OP, &request.profile_name)?;
        self.store.head_bucket(&request.destination.bucket).await?;

        let job_id = uuid::Uuid::new_v4().to_string();
        let description = match self.sign_source(&record, &request.source, &request.destination)
        {
            Ok(signed_object) => JobDescription {
                job_id: job_id.clone(),
                status: JobStatus::Succeeded,
                status_reason: Some("Signing Succeeded".to_string()),
                signed_object: Some(signed_object),
            },
            Err(reason) => JobDescription {
                job_id: job_id.clone(),
                status: JobStatus::Failed,
                status_reason: Some(reason),
                signed_object: None,
            },
        };

        self.jobs.lock().insert(job_id.clone(), description);
        Ok(job_id)
    }

    async fn describe_job(&self, job_id: &str) -> Result<JobDescription, ProviderError> {
        self.jobs.lock().get(job_id).cloned().ok_or_else(|| {
            ProviderError::from_code(
                "DescribeSigningJob",
                "ResourceNotFoundException",
                format!("Signing job {} does not exist", job_id),
            )
        })
    }
}

/// Object store and signing service sharing one state directory.
#[derive(Clone)]
pub struct LocalBackend {
    store: Arc<LocalObjectStore>,
    signer: Arc<LocalSigningService>,
}

impl LocalBackend {
    /// Open (creating if needed) the state directory at `root`.
    pub fn open(root: impl AsRef<Path>, region: Option<&str>) -> Result<Self, ProviderError> {
        let root = root.as_ref();
        fs::create_dir_all(root.join("buckets"))
            .and_then(|_| fs::create_dir_all(root.join("profiles")))
            .map_err(|e| io_error("OpenBackend", e))?;

        let store = Arc::new(LocalObjectStore::new(root));
        let signer = Arc::new(LocalSigningService::new(
            root,
            region.unwrap_or(DEFAULT_REGION),
            store.clone(),
        ));
        Ok(Self { store, signer })
    }

    /// Default state directory under the user's local data directory.
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lambda-signer")
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    pub fn signing_service(&self) -> Arc<dyn SigningService> {
        self.signer.clone()
    }

    pub fn local_store(&self) -> &Arc<LocalObjectStore> {
        &self.store
    }

    pub fn local_signer(&self) -> &Arc<LocalSigningService> {
        &self.signer
    }
}
