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

//! Error types for signing runs.

use crate::provider::ProviderError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that abort a signing, annotation or removal run.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Configuration error for unit '{unit}': {reason}")]
    Configuration { unit: String, reason: String },

    #[error("Signing job {job_id} for unit '{unit}' has failed with reason: {reason}")]
    SigningJobFailed {
        unit: String,
        job_id: String,
        reason: String,
    },

    #[error(
        "Signing job {job_id} for unit '{unit}' did not finish after {attempts} polls ({waited:?})"
    )]
    JobTimedOut {
        unit: String,
        job_id: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("Signing job {job_id} for unit '{unit}' succeeded without a signed object")]
    MissingSignedObject { unit: String, job_id: String },

    #[error("Signing profile not found: {0}")]
    ProfileNotFound(String),

    #[error("No signing platform available for partner {partner}")]
    NoSigningPlatform { partner: String },

    #[error("Failed to access artifact {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Transport(#[from] ProviderError),
}

impl SignerError {
    pub(crate) fn configuration(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        SignerError::Configuration {
            unit: unit.into(),
            reason: reason.into(),
        }
    }

    /// Name of the unit the error is attributed to, when known.
    pub fn unit(&self) -> Option<&str> {
        match self {
            SignerError::Configuration { unit, .. }
            | SignerError::SigningJobFailed { unit, .. }
            | SignerError::JobTimedOut { unit, .. }
            | SignerError::MissingSignedObject { unit, .. } => Some(unit),
            _ => None,
        }
    }
}

/// Errors raised while editing a generated template.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template root must be a JSON object")]
    NotAnObject,

    #[error("Template 'Resources' must be a JSON object")]
    ResourcesNotAnObject,

    #[error("Function resource not found in template: {0}")]
    FunctionNotFound(String),
}
