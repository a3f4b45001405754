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

//! Implementation of the `remove` command.

use super::{GlobalOptions, Session};
use anyhow::{Context, Result};
use tracing::info;

pub async fn run(options: &GlobalOptions) -> Result<()> {
    let session = Session::open(options)?;
    let batch = session.batch()?;

    let report = batch
        .remove(&session.provisioning())
        .await
        .context("Failed to remove signing infrastructure")?;

    if report.buckets_deleted.is_empty() && report.profiles_revoked.is_empty() {
        info!("Nothing to remove");
    } else {
        info!(
            buckets = ?report.buckets_deleted,
            profiles = ?report.profiles_revoked,
            "Removed signing infrastructure"
        );
    }
    Ok(())
}
