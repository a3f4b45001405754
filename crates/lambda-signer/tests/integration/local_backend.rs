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

//! End-to-end runs against the filesystem backend.

use crate::fixtures::{config, fast_policy};
use lambda_signer::crypto::compute_digest;
use lambda_signer::provider::{ObjectStore, ProfileStatus, SigningService};
use lambda_signer::{
    DeployableUnit, LocalBackend, ProfileDirectory, ProvisioningManager, SignItem, SignPipeline,
    SigningBatch,
};
use serde_json::json;

fn pipeline(backend: &LocalBackend, region: &str) -> SignPipeline {
    SignPipeline::new(
        ProvisioningManager::new(backend.object_store(), backend.signing_service(), region),
        fast_policy(),
    )
}

#[tokio::test]
async fn test_sign_annotate_and_remove() {
    let state = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let backend = LocalBackend::open(state.path(), Some("eu-central-1")).unwrap();
    let pipeline = pipeline(&backend, "eu-central-1");

    let artifact = work.path().join("api.zip");
    std::fs::write(&artifact, b"function package").unwrap();
    let mut config = config("api", "artifacts", false);
    config.destination.bucket = "signed".to_string();
    let item = SignItem::new(DeployableUnit::function("api", &artifact), config);
    let mut batch = SigningBatch::new(vec![item], true);

    let outcomes = batch.sign_all(&pipeline).await.unwrap();
    let outcome = &outcomes[0];
    assert_eq!(outcome.signed_object.bucket, "signed");
    assert_eq!(outcome.signed_object.key, "signed-api-1700000000");
    assert_eq!(std::fs::read(&artifact).unwrap(), b"function package");

    let document = backend
        .local_signer()
        .verify_signed_object(&outcome.signed_object.bucket, &outcome.signed_object.key)
        .await
        .unwrap();
    assert_eq!(document.profile_name, "svc");
    assert_eq!(document.artifact_digest, compute_digest(b"function package"));

    let mut template = json!({
        "Resources": {
            "ApiLambdaFunction": { "Type": "AWS::Lambda::Function", "Properties": {} }
        }
    });
    batch
        .annotate(
            &mut template,
            &ProfileDirectory::new(backend.signing_service()),
        )
        .await
        .unwrap();
    let arn = template["Resources"]["ApiCodeSigningConfig"]["Properties"]["AllowedPublishers"]
        ["SigningProfileVersionArns"][0]
        .as_str()
        .unwrap()
        .to_string();
    assert!(arn.starts_with("arn:aws:signer:eu-central-1:"));
    assert!(arn.contains("/signing-profiles/svc/"));

    let report = batch.remove(pipeline.provisioning()).await.unwrap();
    assert_eq!(
        report.buckets_deleted,
        vec!["artifacts".to_string(), "signed".to_string()]
    );
    assert_eq!(report.profiles_revoked, vec!["svc".to_string()]);

    let store = backend.object_store();
    assert!(store.head_bucket("artifacts").await.unwrap_err().is_not_found());
    let profile = backend.signing_service().get_profile("svc").await.unwrap();
    assert_eq!(profile.status, ProfileStatus::Revoked);
}

#[tokio::test]
async fn test_sign_after_removal_uses_new_profile_version() {
    let state = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let backend = LocalBackend::open(state.path(), None).unwrap();
    let pipeline = pipeline(&backend, "us-east-1");
    let signer = backend.signing_service();

    let artifact = work.path().join("api.zip");
    std::fs::write(&artifact, b"function package").unwrap();
    let mut item = SignItem::new(
        DeployableUnit::function("api", &artifact),
        config("api", "artifacts", true),
    );

    pipeline.run(&mut item).await.unwrap();
    let first = signer.get_profile("svc").await.unwrap().profile_version;
    pipeline.provisioning().revoke_profile("svc").await.unwrap();

    std::fs::write(&artifact, b"function package").unwrap();
    pipeline.run(&mut item).await.unwrap();

    let profile = signer.get_profile("svc").await.unwrap();
    assert_eq!(profile.status, ProfileStatus::Active);
    assert_ne!(profile.profile_version, first);
}

#[tokio::test]
async fn test_state_persists_across_reopen() {
    let state = tempfile::tempdir().unwrap();

    {
        let backend = LocalBackend::open(state.path(), None).unwrap();
        let store = backend.object_store();
        store.create_bucket("b1", None).await.unwrap();
        store.enable_versioning("b1").await.unwrap();
        store.put_object("b1", "k", b"kept".to_vec()).await.unwrap();
    }

    let backend = LocalBackend::open(state.path(), None).unwrap();
    assert_eq!(
        backend.object_store().get_object("b1", "k").await.unwrap(),
        b"kept"
    );
}
