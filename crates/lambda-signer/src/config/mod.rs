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

//! Signing configuration: types, defaults, merging and manifest loading.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod resolver;
pub mod types;
pub mod validation;

pub use defaults::generate_default_manifest_toml;
pub use error::{ConfigError, ValidationError};
pub use loader::ConfigLoader;
pub use resolver::ConfigResolver;
pub use types::*;
pub use validation::Validate;
