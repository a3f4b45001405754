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

use crate::config::validation::Validate;
use crate::config::{ConfigError, ServiceManifest};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable naming an explicit manifest path.
pub const CONFIG_ENV_VAR: &str = "LAMBDA_SIGNER_CONFIG";

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"))
}

pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader with the default search paths
    pub fn new() -> Self {
        let mut search_paths = vec![PathBuf::from("./lambda-signer.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            search_paths.push(config_dir.join("lambda-signer").join("config.toml"));
        }

        search_paths.push(PathBuf::from("/etc/lambda-signer/config.toml"));

        Self { search_paths }
    }

    /// Create a loader with custom search paths
    pub fn with_search_paths(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Load and validate the manifest from `manifest_file` or auto-discover it
    pub fn load_manifest(
        &self,
        manifest_file: Option<&Path>,
    ) -> Result<ServiceManifest, ConfigError> {
        let path = if let Some(path) = manifest_file {
            path.to_path_buf()
        } else if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
            PathBuf::from(env_path)
        } else {
            self.find_manifest_file().ok_or(ConfigError::ConfigNotFound)?
        };

        self.load_manifest_from_file(&path)
    }

    /// Load and validate the manifest at `path`
    pub fn load_manifest_from_file(&self, path: &Path) -> Result<ServiceManifest, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") | None => self.parse_manifest(&content),
            Some(ext) => Err(ConfigError::UnsupportedFormat {
                extension: ext.to_string(),
            }),
        }
    }

    /// Substitute environment variables, parse and validate TOML manifest text
    pub fn parse_manifest(&self, content: &str) -> Result<ServiceManifest, ConfigError> {
        let substituted = self.substitute_env_vars(content)?;
        let manifest = toml::from_str::<ServiceManifest>(&substituted)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Find the first existing manifest file in the search paths
    pub fn find_manifest_file(&self) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .find(|path| path.is_file())
            .cloned()
    }

    /// Substitute `${VAR}`, `${VAR:-default}` and `${VAR:?error}` expressions
    fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();

        for cap in var_pattern().captures_iter(content) {
            let full_match = &cap[0];
            let replacement = self.process_var_expression(&cap[1])?;
            result = result.replace(full_match, &replacement);
        }

        Ok(result)
    }

    fn process_var_expression(&self, expr: &str) -> Result<String, ConfigError> {
        if let Some((var_name, default_value)) = expr.split_once(":-") {
            Ok(env::var(var_name).unwrap_or_else(|_| default_value.to_string()))
        } else if let Some((var_name, error_msg)) = expr.split_once(":?") {
            env::var(var_name).map_err(|_| {
                ConfigError::EnvSubstitutionError(format!(
                    "Required environment variable '{}' is not set: {}",
                    var_name, error_msg
                ))
            })
        } else {
            env::var(expr).map_err(|_| {
                ConfigError::EnvSubstitutionError(format!(
                    "Required environment variable '{}' is not set",
                    expr
                ))
            })
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
