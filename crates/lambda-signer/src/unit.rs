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

//! Deployable units and the per-run sign items built from them.

use crate::config::SigningConfiguration;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Function,
    Layer,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Function => write!(f, "function"),
            UnitKind::Layer => write!(f, "layer"),
        }
    }
}

/// A function or layer package subject to signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployableUnit {
    Function { name: String, artifact: PathBuf },
    Layer { name: String, artifact: PathBuf },
}

impl DeployableUnit {
    pub fn function(name: impl Into<String>, artifact: impl Into<PathBuf>) -> Self {
        DeployableUnit::Function {
            name: name.into(),
            artifact: artifact.into(),
        }
    }

    pub fn layer(name: impl Into<String>, artifact: impl Into<PathBuf>) -> Self {
        DeployableUnit::Layer {
            name: name.into(),
            artifact: artifact.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DeployableUnit::Function { name, .. } | DeployableUnit::Layer { name, .. } => name,
        }
    }

    pub fn artifact(&self) -> &Path {
        match self {
            DeployableUnit::Function { artifact, .. }
            | DeployableUnit::Layer { artifact, .. } => artifact,
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            DeployableUnit::Function { .. } => UnitKind::Function,
            DeployableUnit::Layer { .. } => UnitKind::Layer,
        }
    }

    /// Template logical id of the function resource generated for this unit.
    ///
    /// Layers have no function resource and return `None`.
    pub fn function_logical_id(&self) -> Option<String> {
        match self {
            DeployableUnit::Function { name, .. } => {
                Some(format!("{}LambdaFunction", normalize_name(name)))
            }
            DeployableUnit::Layer { .. } => None,
        }
    }
}

/// Normalize a unit name the way the deployment framework builds logical ids:
/// first character upper-cased, `-` spelled `Dash`, `_` spelled `Underscore`.
pub fn normalize_name(name: &str) -> String {
    let mut chars = name.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    capitalized.replace('-', "Dash").replace('_', "Underscore")
}

/// One unit paired with its resolved configuration for a single signing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignItem {
    pub unit: DeployableUnit,
    pub config: SigningConfiguration,
}

impl SignItem {
    pub fn new(unit: DeployableUnit, config: SigningConfiguration) -> Self {
        Self { unit, config }
    }

    pub fn name(&self) -> &str {
        self.unit.name()
    }

    pub fn artifact(&self) -> &Path {
        self.unit.artifact()
    }
}
