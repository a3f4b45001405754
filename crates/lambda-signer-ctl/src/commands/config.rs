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

//! Implementation of the `config` commands.

use super::{resolve_batch, GlobalOptions};
use anyhow::{bail, Context, Result};
use lambda_signer::config::generate_default_manifest_toml;
use std::path::Path;
use tracing::info;

/// Write the example manifest to `output`.
pub fn init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            output.display()
        );
    }

    let content = generate_default_manifest_toml().context("Failed to render manifest")?;
    std::fs::write(output, content)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Wrote example manifest to {}", output.display());
    Ok(())
}

/// Print the merged configuration of every unit.
pub fn resolve(options: &GlobalOptions) -> Result<()> {
    let manifest = options.load_manifest()?;
    let batch = resolve_batch(&manifest)?;

    let mut units = serde_json::Map::new();
    for item in batch.items() {
        units.insert(item.name().to_string(), serde_json::to_value(&item.config)?);
    }

    println!("{}", serde_json::to_string_pretty(&units)?);
    Ok(())
}
