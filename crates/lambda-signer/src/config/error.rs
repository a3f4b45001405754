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

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Manifest file not found in any search location")]
    ConfigNotFound,

    #[error("Failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML manifest: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Environment variable substitution failed: {0}")]
    EnvSubstitutionError(String),

    #[error("Manifest validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Unsupported manifest file format: {extension}")]
    UnsupportedFormat { extension: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Service name must not be empty")]
    EmptyServiceName,

    #[error("Invalid polling interval: {interval_ms}ms (must be positive)")]
    InvalidPollInterval { interval_ms: u64 },

    #[error("Invalid polling multiplier: {multiplier} (must be at least 1.0)")]
    InvalidMultiplier { multiplier: String },

    #[error("Per-unit packaging is enabled but no functions or layers are declared")]
    NoUnits,

    #[error("Packaging is not per unit but no service artifact is set")]
    MissingServiceArtifact,

    #[error("Unit name '{name}' is declared as both a function and a layer")]
    DuplicateUnit { name: String },

    #[error("Multiple validation errors: {errors:?}")]
    Multiple { errors: Vec<ValidationError> },
}
