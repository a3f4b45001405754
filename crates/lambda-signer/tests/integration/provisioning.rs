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

//! Provisioning and teardown tests.

use crate::fixtures::{config, Harness};
use lambda_signer::provider::{ProfileStatus, ProviderError};
use lambda_signer::provisioning::REVOCATION_REASON;
use lambda_signer::SignerError;
use lambda_signer_testing::{Call, FakeObjectStore};

fn is_deletion(call: &Call) -> bool {
    matches!(
        call,
        Call::DeleteObjects { .. } | Call::DeleteBucket(_) | Call::RevokeProfile { .. }
    )
}

#[tokio::test]
async fn test_missing_profile_is_created_before_any_bucket_operation() {
    let harness = Harness::new();
    let provisioning = harness.provisioning("us-east-1");

    provisioning.ensure(&config("api", "b1", true)).await.unwrap();

    let expected = Call::PutProfile {
        platform_id: "AWSLambda-SHA384-ECDSA".to_string(),
        profile_name: "svc".to_string(),
    };
    assert_eq!(harness.log.count(|c| *c == expected), 1);

    let put_profile = harness.log.position(|c| *c == expected).unwrap();
    let first_bucket_op = harness.log.position(Call::is_bucket_operation).unwrap();
    assert!(put_profile < first_bucket_op);
}

#[tokio::test]
async fn test_existing_profile_is_left_alone() {
    let harness = Harness::new();
    harness.signer.add_profile("svc", "p1");

    harness
        .provisioning("us-east-1")
        .ensure(&config("api", "b1", true))
        .await
        .unwrap();

    assert_eq!(
        harness.log.count(|c| matches!(c, Call::PutProfile { .. } | Call::ListPlatforms(_))),
        0
    );
}

#[tokio::test]
async fn test_revoked_profile_is_put_again() {
    let harness = Harness::new();
    harness.signer.add_profile("svc", "p1");
    let provisioning = harness.provisioning("us-east-1");
    provisioning.revoke_profile("svc").await.unwrap();

    provisioning.ensure(&config("api", "b1", true)).await.unwrap();

    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::PutProfile { profile_name, .. } if profile_name == "svc")),
        1
    );
    let profile = harness.signer.profile("svc").unwrap();
    assert_eq!(profile.status, ProfileStatus::Active);
    assert_eq!(profile.profile_version.as_deref(), Some("svc-v1"));
}

#[tokio::test]
async fn test_no_platform_is_an_error() {
    let harness = Harness::new();
    harness.signer.set_platforms(&[]);

    let err = harness
        .provisioning("us-east-1")
        .ensure(&config("api", "b1", true))
        .await
        .unwrap_err();

    assert!(matches!(err, SignerError::NoSigningPlatform { ref partner } if partner == "AWSLambda"));
    assert!(harness.log.position(Call::is_bucket_operation).is_none());
}

#[tokio::test]
async fn test_first_platform_is_used() {
    let harness = Harness::new();
    harness
        .signer
        .set_platforms(&["AWSLambda-SHA384-ECDSA", "AWSLambda-Other"]);

    harness.provisioning("us-east-1").ensure_profile("svc").await.unwrap();

    assert_eq!(
        harness.signer.profile("svc").unwrap().platform_id,
        "AWSLambda-SHA384-ECDSA"
    );
}

#[tokio::test]
async fn test_missing_bucket_is_created_with_versioning() {
    let harness = Harness::new();
    let provisioning = harness.provisioning("us-east-1");

    provisioning.ensure(&config("api", "b1", true)).await.unwrap();

    assert!(harness.store.has_bucket("b1"));
    assert!(harness.store.is_versioned("b1"));
    assert_eq!(harness.store.bucket_location("b1"), None);
    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::HeadBucket(b) if b == "b1")),
        1
    );
}

#[tokio::test]
async fn test_bucket_created_in_configured_region() {
    let harness = Harness::new();
    let provisioning = harness.provisioning("eu-west-1");

    provisioning.ensure(&config("api", "b1", true)).await.unwrap();

    assert_eq!(
        harness.store.bucket_location("b1").as_deref(),
        Some("eu-west-1")
    );
}

#[tokio::test]
async fn test_distinct_destination_bucket_is_ensured() {
    let harness = Harness::new();
    let mut config = config("api", "b1", true);
    config.destination.bucket = "b2".to_string();

    harness
        .provisioning("us-east-1")
        .ensure(&config)
        .await
        .unwrap();

    assert!(harness.store.has_bucket("b1"));
    assert!(harness.store.has_bucket("b2"));
}

#[tokio::test]
async fn test_existing_bucket_is_not_recreated() {
    let harness = Harness::new();
    harness.store.add_bucket("b1");

    harness
        .provisioning("us-east-1")
        .ensure(&config("api", "b1", true))
        .await
        .unwrap();

    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::CreateBucket { .. } | Call::EnableVersioning(_))),
        0
    );
}

#[tokio::test]
async fn test_bucket_probe_failure_propagates() {
    let harness = Harness::new();
    harness.store.fail_next(
        "HeadBucket",
        ProviderError::from_code("HeadBucket", "Forbidden", "Forbidden"),
    );

    let err = harness
        .provisioning("us-east-1")
        .ensure(&config("api", "b1", true))
        .await
        .unwrap_err();

    assert!(matches!(err, SignerError::Transport(ref e) if e.code() == "Forbidden"));
    assert_eq!(
        harness.log.count(|c| matches!(c, Call::CreateBucket { .. })),
        0
    );
}

#[tokio::test]
async fn test_concurrent_bucket_creation_surfaces() {
    let harness = Harness::new();
    harness.store.fail_next(
        "CreateBucket",
        ProviderError::from_code(
            "CreateBucket",
            "BucketAlreadyOwnedByYou",
            "Your previous request to create the named bucket succeeded",
        ),
    );

    let err = harness
        .provisioning("us-east-1")
        .ensure(&config("api", "b1", true))
        .await
        .unwrap_err();

    assert!(matches!(err, SignerError::Transport(ref e) if e.code() == "BucketAlreadyOwnedByYou"));
}

#[tokio::test]
async fn test_retained_infrastructure_is_not_removed() {
    let harness = Harness::new();
    harness.store.insert_object("b1", "api-1700000000", b"zip".to_vec());
    harness.signer.add_profile("svc", "p1");

    let report = harness
        .provisioning("us-east-1")
        .teardown(&config("api", "b1", true))
        .await
        .unwrap();

    assert!(report.buckets_deleted.is_empty());
    assert!(report.profiles_revoked.is_empty());
    assert_eq!(harness.log.count(is_deletion), 0);
    assert!(harness.store.has_bucket("b1"));
}

#[tokio::test]
async fn test_teardown_empties_bucket_then_revokes_profile() {
    let harness = Harness::new();
    harness.store.insert_object("b1", "api-1", b"one".to_vec());
    harness.store.insert_object("b1", "api-1", b"two".to_vec());
    harness.store.insert_delete_marker("b1", "api-1");
    harness.signer.add_profile("svc", "p1");

    let report = harness
        .provisioning("us-east-1")
        .teardown(&config("api", "b1", false))
        .await
        .unwrap();

    assert_eq!(report.buckets_deleted, vec!["b1".to_string()]);
    assert_eq!(report.profiles_revoked, vec!["svc".to_string()]);
    assert!(!harness.store.has_bucket("b1"));

    assert_eq!(
        harness.log.count(|c| *c
            == Call::RevokeProfile {
                profile_name: "svc".to_string(),
                profile_version: "p1".to_string(),
                reason: REVOCATION_REASON.to_string(),
            }),
        1
    );
    assert!(harness
        .log
        .calls()
        .contains(&Call::DeleteObjects {
            bucket: "b1".to_string(),
            count: 3,
        }));
}

#[tokio::test]
async fn test_teardown_deletes_shared_buckets_once_and_all_before_revocation() {
    let harness = Harness::new();
    harness.store.add_bucket("b1");
    harness.store.add_bucket("b2");
    harness.signer.add_profile("svc", "p1");

    let mut worker = config("worker", "b1", false);
    worker.destination.bucket = "b2".to_string();
    let mut kept = config("kept", "b3", true);
    kept.profile_name = "kept".to_string();
    let configs = vec![
        config("api", "b1", false),
        worker,
        config("deps", "b2", false),
        kept,
    ];

    let report = harness
        .provisioning("us-east-1")
        .teardown_all(&configs)
        .await
        .unwrap();

    assert_eq!(
        report.buckets_deleted,
        vec!["b1".to_string(), "b2".to_string()]
    );
    assert_eq!(report.profiles_revoked, vec!["svc".to_string()]);

    for bucket in ["b1", "b2"] {
        assert_eq!(
            harness
                .log
                .count(|c| matches!(c, Call::DeleteBucket(b) if b == bucket)),
            1
        );
    }
    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::DeleteBucket(b) if b == "b3")),
        0
    );
    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::RevokeProfile { .. })),
        1
    );

    let calls = harness.log.calls();
    let last_delete = calls
        .iter()
        .rposition(|c| matches!(c, Call::DeleteBucket(_)))
        .unwrap();
    let first_revoke = calls
        .iter()
        .position(|c| matches!(c, Call::RevokeProfile { .. }))
        .unwrap();
    assert!(last_delete < first_revoke);
}

#[tokio::test]
async fn test_teardown_keeps_infrastructure_shared_with_retained_unit() {
    let harness = Harness::new();
    harness.store.insert_object("b1", "api-1700000000", b"zip".to_vec());
    harness.store.add_bucket("b2");
    harness.signer.add_profile("svc", "p1");

    let mut worker = config("worker", "b1", false);
    worker.destination.bucket = "b2".to_string();
    let configs = vec![config("api", "b1", true), worker];

    let report = harness
        .provisioning("us-east-1")
        .teardown_all(&configs)
        .await
        .unwrap();

    assert_eq!(report.buckets_deleted, vec!["b2".to_string()]);
    assert!(report.profiles_revoked.is_empty());
    assert!(harness.store.has_bucket("b1"));
    assert!(!harness.store.has_bucket("b2"));
    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::RevokeProfile { .. })),
        0
    );
    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::DeleteObjects { bucket, .. } if bucket == "b1")),
        0
    );
    assert_eq!(
        harness.signer.profile("svc").unwrap().status,
        ProfileStatus::Active
    );
}

#[tokio::test]
async fn test_repeated_teardown_tolerates_missing_and_revoked() {
    let harness = Harness::new();
    harness.store.insert_object("b1", "api-1", b"zip".to_vec());
    harness.signer.add_profile("svc", "p1");
    let provisioning = harness.provisioning("us-east-1");
    let config = config("api", "b1", false);

    provisioning.teardown(&config).await.unwrap();
    let report = provisioning.teardown(&config).await.unwrap();

    assert!(report.buckets_deleted.is_empty());
    assert!(report.profiles_revoked.is_empty());
    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::RevokeProfile { .. })),
        2
    );
}

#[tokio::test]
async fn test_teardown_without_profile_skips_revocation() {
    let harness = Harness::new();
    harness.store.add_bucket("b1");

    let report = harness
        .provisioning("us-east-1")
        .teardown(&config("api", "b1", false))
        .await
        .unwrap();

    assert_eq!(report.buckets_deleted, vec!["b1".to_string()]);
    assert!(report.profiles_revoked.is_empty());
    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::RevokeProfile { .. })),
        0
    );
}

#[tokio::test]
async fn test_teardown_pages_through_large_buckets() {
    let harness = Harness::with_store(|log| FakeObjectStore::new(log).with_page_size(2));
    for i in 0..5 {
        harness
            .store
            .insert_object("b1", &format!("api-{}", i), b"zip".to_vec());
    }

    harness
        .provisioning("us-east-1")
        .teardown(&config("api", "b1", false))
        .await
        .unwrap();

    assert_eq!(
        harness
            .log
            .count(|c| matches!(c, Call::ListObjectVersions(_))),
        3
    );
    assert!(!harness.store.has_bucket("b1"));
}

#[tokio::test]
async fn test_revocation_failure_propagates() {
    let harness = Harness::new();
    harness.signer.add_profile("svc", "p1");
    harness.signer.fail_next(
        "RevokeSigningProfile",
        ProviderError::from_code("RevokeSigningProfile", "AccessDeniedException", "denied"),
    );

    let err = harness
        .provisioning("us-east-1")
        .revoke_profile("svc")
        .await
        .unwrap_err();

    assert!(matches!(err, SignerError::Transport(ref e) if e.code() == "AccessDeniedException"));
    assert_eq!(
        harness.signer.profile("svc").unwrap().status,
        lambda_signer::provider::ProfileStatus::Active
    );
}
