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

//! Implementation of the `sign` command.

use super::{GlobalOptions, Session};
use anyhow::{Context, Result};
use tracing::info;

pub async fn run(options: &GlobalOptions, function: Option<&str>) -> Result<()> {
    let session = Session::open(options)?;
    let mut batch = session.batch()?;
    let pipeline = session.pipeline();

    let outcomes = match function {
        Some(name) => vec![batch
            .sign_unit(&pipeline, name)
            .await
            .with_context(|| format!("Failed to sign {}", name))?],
        None => batch
            .sign_all(&pipeline)
            .await
            .context("Failed to sign service artifacts")?,
    };

    for outcome in &outcomes {
        info!(
            unit = %outcome.unit,
            job_id = %outcome.job_id,
            source_version = %outcome.source_version,
            signed_bucket = %outcome.signed_object.bucket,
            signed_key = %outcome.signed_object.key,
            bytes = outcome.bytes_written,
            "Signed"
        );
    }
    info!("Signed {} unit(s) of {}", outcomes.len(), session.manifest.service);

    Ok(())
}
