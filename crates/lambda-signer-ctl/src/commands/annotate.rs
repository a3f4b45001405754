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

//! Implementation of the `annotate` command.

use super::{GlobalOptions, Session};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub async fn run(options: &GlobalOptions, template: &Path, output: Option<&Path>) -> Result<()> {
    let session = Session::open(options)?;
    let batch = session.batch()?;
    let provisioning = session.provisioning();

    let content = tokio::fs::read(template)
        .await
        .with_context(|| format!("Failed to read template {}", template.display()))?;
    let mut document: serde_json::Value = serde_json::from_slice(&content)
        .with_context(|| format!("Template {} is not valid JSON", template.display()))?;

    let added = batch
        .annotate(&mut document, provisioning.profiles())
        .await
        .context("Failed to add code signing configuration")?;

    let destination = output.unwrap_or(template);
    let rendered = serde_json::to_vec_pretty(&document)?;
    tokio::fs::write(destination, rendered)
        .await
        .with_context(|| format!("Failed to write template {}", destination.display()))?;

    info!(
        resources = added.len(),
        template = %destination.display(),
        "Template updated"
    );
    Ok(())
}
