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

//! Batch driver tests over a whole service manifest.

use crate::fixtures::{fast_policy, Harness};
use lambda_signer::config::{SourceOverrides, UnitManifest};
use lambda_signer::{
    ConfigResolver, ProfileDirectory, ServiceManifest, SignerError, SigningBatch,
    SigningOverrides,
};
use lambda_signer_testing::{Call, FakeSigningService};
use serde_json::json;
use std::path::Path;

fn manifest(dir: &Path, functions: &[&str]) -> ServiceManifest {
    let mut manifest = ServiceManifest::example();
    manifest.service = "svc".to_string();
    manifest.signer = SigningOverrides {
        source: SourceOverrides {
            bucket: Some("b1".to_string()),
            key: None,
        },
        ..SigningOverrides::default()
    };
    manifest.functions.clear();

    for name in functions {
        let artifact = dir.join(format!("{}.zip", name));
        std::fs::write(&artifact, format!("unsigned {}", name)).unwrap();
        manifest.functions.insert(
            name.to_string(),
            UnitManifest {
                artifact,
                signer: SigningOverrides::default(),
            },
        );
    }
    manifest
}

fn batch(manifest: &ServiceManifest) -> SigningBatch {
    let resolver = ConfigResolver::new(&manifest.service).with_timestamp(1_700_000_000);
    SigningBatch::from_manifest(manifest, &resolver).unwrap()
}

fn template() -> serde_json::Value {
    json!({
        "Resources": {
            "ApiLambdaFunction": { "Type": "AWS::Lambda::Function", "Properties": {} },
            "WorkerLambdaFunction": { "Type": "AWS::Lambda::Function", "Properties": {} }
        }
    })
}

#[tokio::test]
async fn test_sign_all_signs_every_function() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    harness.signer.add_profile("svc", "p1");
    harness
        .store
        .insert_object("b1", "signed-api-1700000000", b"signed api".to_vec());
    harness
        .store
        .insert_object("b1", "signed-worker-1700000000", b"signed worker".to_vec());
    harness.signer.push_job_id("j1");
    harness.signer.push_job_id("j2");
    harness.signer.push_job_status(FakeSigningService::succeeded(
        "j1",
        "b1",
        "signed-api-1700000000",
    ));
    harness.signer.push_job_status(FakeSigningService::succeeded(
        "j2",
        "b1",
        "signed-worker-1700000000",
    ));

    let manifest = manifest(dir.path(), &["api", "worker"]);
    let mut batch = batch(&manifest);
    let outcomes = batch.sign_all(&harness.pipeline(fast_policy())).await.unwrap();

    let units: Vec<&str> = outcomes.iter().map(|o| o.unit.as_str()).collect();
    assert_eq!(units, vec!["api", "worker"]);
    assert_eq!(
        std::fs::read(dir.path().join("api.zip")).unwrap(),
        b"signed api"
    );
    assert_eq!(
        std::fs::read(dir.path().join("worker.zip")).unwrap(),
        b"signed worker"
    );
    assert!(batch
        .items()
        .iter()
        .all(|item| item.config.source.object_version.is_some()));
}

#[tokio::test]
async fn test_first_failure_aborts_remaining_units() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    harness.signer.push_job_status(FakeSigningService::failed(
        "job-1",
        Some("Source object is not a valid package"),
    ));

    let manifest = manifest(dir.path(), &["api", "worker"]);
    let mut batch = batch(&manifest);
    let err = batch
        .sign_all(&harness.pipeline(fast_policy()))
        .await
        .unwrap_err();

    assert_eq!(err.unit(), Some("api"));
    assert_eq!(harness.log.count(|c| matches!(c, Call::StartJob(_))), 1);
    assert_eq!(
        std::fs::read(dir.path().join("worker.zip")).unwrap(),
        b"unsigned worker"
    );
}

#[tokio::test]
async fn test_sign_unit_targets_one_function() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    harness
        .store
        .insert_object("b1", "signed-worker-1700000000", b"signed worker".to_vec());
    harness.signer.push_job_status(FakeSigningService::succeeded(
        "job-1",
        "b1",
        "signed-worker-1700000000",
    ));

    let manifest = manifest(dir.path(), &["api", "worker"]);
    let mut batch = batch(&manifest);
    let outcome = batch
        .sign_unit(&harness.pipeline(fast_policy()), "worker")
        .await
        .unwrap();

    assert_eq!(outcome.unit, "worker");
    let keys: Vec<String> = harness
        .log
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::StartJob(request) => Some(request.source.key),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec!["worker-1700000000".to_string()]);
    assert_eq!(
        std::fs::read(dir.path().join("api.zip")).unwrap(),
        b"unsigned api"
    );
}

#[tokio::test]
async fn test_sign_unit_with_service_wide_packaging_signs_service_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    harness
        .store
        .insert_object("b1", "signed-svc-1700000000", b"signed svc".to_vec());
    harness.signer.push_job_status(FakeSigningService::succeeded(
        "job-1",
        "b1",
        "signed-svc-1700000000",
    ));

    let mut manifest = manifest(dir.path(), &["api"]);
    manifest.per_unit_packaging = false;
    let artifact = dir.path().join("svc.zip");
    std::fs::write(&artifact, b"unsigned svc").unwrap();
    manifest.artifact = Some(artifact.clone());
    let mut batch = batch(&manifest);

    let outcome = batch
        .sign_unit(&harness.pipeline(fast_policy()), "api")
        .await
        .unwrap();

    assert_eq!(outcome.unit, "svc");
    assert_eq!(std::fs::read(&artifact).unwrap(), b"signed svc");
    assert_eq!(
        std::fs::read(dir.path().join("api.zip")).unwrap(),
        b"unsigned api"
    );
}

#[tokio::test]
async fn test_sign_unknown_unit_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();

    let manifest = manifest(dir.path(), &["api"]);
    let mut batch = batch(&manifest);
    let err = batch
        .sign_unit(&harness.pipeline(fast_policy()), "nope")
        .await
        .unwrap_err();

    assert!(matches!(err, SignerError::Configuration { .. }));
    assert_eq!(err.unit(), Some("nope"));
    assert!(harness.log.calls().is_empty());
}

#[tokio::test]
async fn test_annotate_per_unit_wires_each_function() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    harness.signer.add_profile("svc", "p1");

    let mut manifest = manifest(dir.path(), &["api", "worker"]);
    manifest.layers.insert(
        "deps".to_string(),
        UnitManifest {
            artifact: dir.path().join("deps.zip"),
            signer: SigningOverrides::default(),
        },
    );
    let batch = batch(&manifest);

    let mut template = template();
    let added = batch
        .annotate(&mut template, &ProfileDirectory::new(harness.signer.clone()))
        .await
        .unwrap();

    assert_eq!(
        added,
        vec![
            "ApiCodeSigningConfig".to_string(),
            "WorkerCodeSigningConfig".to_string()
        ]
    );
    let resources = &template["Resources"];
    assert_eq!(
        resources["ApiLambdaFunction"]["Properties"]["CodeSigningConfigArn"],
        json!({ "Ref": "ApiCodeSigningConfig" })
    );
    assert_eq!(
        resources["WorkerLambdaFunction"]["Properties"]["CodeSigningConfigArn"],
        json!({ "Ref": "WorkerCodeSigningConfig" })
    );
    assert_eq!(
        resources["ApiCodeSigningConfig"]["Properties"]["AllowedPublishers"]
            ["SigningProfileVersionArns"][0],
        json!(harness.signer.arn("svc", "p1"))
    );
    assert_eq!(
        resources["ApiCodeSigningConfig"]["Properties"]["Description"],
        "Code signing configuration for api"
    );
}

#[tokio::test]
async fn test_annotate_service_wide_shares_one_resource() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    harness.signer.add_profile("svc", "p1");

    let mut manifest = manifest(dir.path(), &[]);
    manifest.per_unit_packaging = false;
    manifest.artifact = Some(dir.path().join("svc.zip"));
    let batch = batch(&manifest);

    let mut template = template();
    let added = batch
        .annotate(&mut template, &ProfileDirectory::new(harness.signer.clone()))
        .await
        .unwrap();

    assert_eq!(added, vec!["CodeSigningConfig".to_string()]);
    for function in ["ApiLambdaFunction", "WorkerLambdaFunction"] {
        assert_eq!(
            template["Resources"][function]["Properties"]["CodeSigningConfigArn"],
            json!({ "Ref": "CodeSigningConfig" })
        );
    }
    assert_eq!(
        template["Resources"]["CodeSigningConfig"]["Properties"]["CodeSigningPolicies"]
            ["UntrustedArtifactOnDeployment"],
        "Enforce"
    );
}

#[tokio::test]
async fn test_annotate_without_profile_fails() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();

    let manifest = manifest(dir.path(), &["api"]);
    let batch = batch(&manifest);
    let mut template = template();
    let err = batch
        .annotate(&mut template, &ProfileDirectory::new(harness.signer.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, SignerError::ProfileNotFound(ref name) if name == "svc"));
    assert!(template["Resources"].get("ApiCodeSigningConfig").is_none());
}

#[tokio::test]
async fn test_remove_tears_down_unretained_service() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    harness.store.insert_object("b1", "api-1700000000", b"zip".to_vec());
    harness.signer.add_profile("svc", "p1");

    let mut manifest = manifest(dir.path(), &["api", "worker"]);
    manifest.signer.retain = Some(false);
    let batch = batch(&manifest);

    let report = batch
        .remove(&harness.provisioning("us-east-1"))
        .await
        .unwrap();

    assert_eq!(report.buckets_deleted, vec!["b1".to_string()]);
    assert_eq!(report.profiles_revoked, vec!["svc".to_string()]);
}
