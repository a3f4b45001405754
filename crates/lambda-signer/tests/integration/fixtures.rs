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

//! Shared harness for integration tests.

use lambda_signer::config::{DestinationLocation, SourceLocation};
use lambda_signer::{
    DeployableUnit, PollPolicy, ProvisioningManager, SignItem, SignPipeline, SigningConfiguration,
    SigningPolicy,
};
use lambda_signer_testing::{CallLog, FakeObjectStore, FakeSigningService};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub log: CallLog,
    pub store: Arc<FakeObjectStore>,
    pub signer: Arc<FakeSigningService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(FakeObjectStore::new)
    }

    pub fn with_store(build: impl FnOnce(CallLog) -> FakeObjectStore) -> Self {
        let log = CallLog::new();
        Self {
            store: Arc::new(build(log.clone())),
            signer: Arc::new(FakeSigningService::new(log.clone())),
            log,
        }
    }

    pub fn provisioning(&self, region: &str) -> ProvisioningManager {
        ProvisioningManager::new(self.store.clone(), self.signer.clone(), region)
    }

    pub fn pipeline(&self, policy: PollPolicy) -> SignPipeline {
        SignPipeline::new(self.provisioning("us-east-1"), policy)
    }
}

/// Configuration for `unit` uploading to `bucket` and signing with `svc`.
pub fn config(unit: &str, bucket: &str, retain: bool) -> SigningConfiguration {
    SigningConfiguration {
        source: SourceLocation {
            bucket: bucket.to_string(),
            key: format!("{}-1700000000", unit),
            object_version: None,
        },
        destination: DestinationLocation {
            bucket: bucket.to_string(),
            key_prefix: "signed-".to_string(),
        },
        profile_name: "svc".to_string(),
        signing_policy: SigningPolicy::Enforce,
        retain,
    }
}

/// Write `content` to `<dir>/<unit>.zip` and build a function item for it.
pub fn function_item(dir: &Path, unit: &str, bucket: &str, content: &[u8]) -> SignItem {
    let artifact = dir.join(format!("{}.zip", unit));
    std::fs::write(&artifact, content).unwrap();
    SignItem::new(
        DeployableUnit::function(unit, artifact),
        config(unit, bucket, true),
    )
}

pub fn fast_policy() -> PollPolicy {
    PollPolicy::fixed(Duration::from_millis(1))
}
