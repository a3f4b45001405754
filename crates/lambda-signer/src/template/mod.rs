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

//! Code-signing configuration resources for generated templates.
//!
//! The generated CloudFormation template is handled as a `serde_json::Value`.
//! [`build_resource`] is a pure constructor; [`attach`] and
//! [`attach_to_function`] insert the resource and point function resources
//! at it. Re-running either with the same resource name overwrites the
//! previous entry.

use crate::config::SigningPolicy;
use crate::error::{SignerError, TemplateError};
use crate::profile::{ProfileDirectory, ProfileField};
use crate::unit::{normalize_name, SignItem};
use serde_json::{json, Map, Value};
use tracing::info;

/// Resource type of code-signing configurations.
pub const CODE_SIGNING_CONFIG_TYPE: &str = "AWS::Lambda::CodeSigningConfig";

/// Resource type of functions that receive a code-signing reference.
pub const FUNCTION_TYPE: &str = "AWS::Lambda::Function";

/// Property on a function resource holding the code-signing reference.
pub const CODE_SIGNING_CONFIG_ARN: &str = "CodeSigningConfigArn";

/// Logical id of the shared resource when packaging is not per unit.
pub const SHARED_RESOURCE_NAME: &str = "CodeSigningConfig";

/// Build a code-signing configuration resource.
pub fn build_resource(profile_version_arn: &str, policy: SigningPolicy, description: &str) -> Value {
    json!({
        "Type": CODE_SIGNING_CONFIG_TYPE,
        "Properties": {
            "AllowedPublishers": {
                "SigningProfileVersionArns": [profile_version_arn]
            },
            "CodeSigningPolicies": {
                "UntrustedArtifactOnDeployment": policy.as_str()
            },
            "Description": description
        }
    })
}

/// Insert `resource` as `resource_name` and reference it from every function
/// resource in the template.
pub fn attach(
    template: &mut Value,
    resource_name: &str,
    resource: Value,
) -> Result<(), TemplateError> {
    let resources = resources_mut(template)?;
    resources.insert(resource_name.to_string(), resource);

    for entry in resources.values_mut() {
        if is_function(entry) {
            set_reference(entry, resource_name);
        }
    }

    Ok(())
}

/// Insert `resource` as `resource_name` and reference it from the single
/// function resource `function_logical_id`.
pub fn attach_to_function(
    template: &mut Value,
    resource_name: &str,
    resource: Value,
    function_logical_id: &str,
) -> Result<(), TemplateError> {
    let resources = resources_mut(template)?;

    match resources.get(function_logical_id) {
        Some(entry) if is_function(entry) => {}
        _ => {
            return Err(TemplateError::FunctionNotFound(
                function_logical_id.to_string(),
            ))
        }
    }

    resources.insert(resource_name.to_string(), resource);
    if let Some(entry) = resources.get_mut(function_logical_id) {
        set_reference(entry, resource_name);
    }

    Ok(())
}

/// Add code-signing configurations for `items` to `template`.
///
/// With `per_unit` unset, one shared [`SHARED_RESOURCE_NAME`] resource is
/// built from the first item and attached to every function. With
/// `per_unit` set, each function unit gets `<LogicalId>CodeSigningConfig`
/// wired to its own function resource; layers get none.
///
/// # Errors
///
/// [`SignerError::ProfileNotFound`] when a profile has no version ARN yet.
pub async fn annotate(
    template: &mut Value,
    items: &[SignItem],
    profiles: &ProfileDirectory,
    per_unit: bool,
) -> Result<Vec<String>, SignerError> {
    let mut added = Vec::new();

    if !per_unit {
        let Some(item) = items.first() else {
            return Ok(added);
        };
        let resource = resource_for(item, profiles).await?;
        attach(template, SHARED_RESOURCE_NAME, resource)?;
        added.push(SHARED_RESOURCE_NAME.to_string());
    } else {
        for item in items {
            let Some(function_id) = item.unit.function_logical_id() else {
                continue;
            };
            let resource_name = format!("{}{}", normalize_name(item.name()), SHARED_RESOURCE_NAME);
            let resource = resource_for(item, profiles).await?;
            attach_to_function(template, &resource_name, resource, &function_id)?;
            added.push(resource_name);
        }
    }

    info!(resources = ?added, "Updated signing configuration in template");
    Ok(added)
}

async fn resource_for(item: &SignItem, profiles: &ProfileDirectory) -> Result<Value, SignerError> {
    let profile_name = &item.config.profile_name;
    let arn = profiles
        .lookup(profile_name, ProfileField::ProfileVersionArn)
        .await?
        .ok_or_else(|| SignerError::ProfileNotFound(profile_name.clone()))?;

    let description = format!("Code signing configuration for {}", item.name());
    Ok(build_resource(&arn, item.config.signing_policy, &description))
}

fn resources_mut(template: &mut Value) -> Result<&mut Map<String, Value>, TemplateError> {
    let root = template.as_object_mut().ok_or(TemplateError::NotAnObject)?;
    root.entry("Resources")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or(TemplateError::ResourcesNotAnObject)
}

fn is_function(entry: &Value) -> bool {
    entry.get("Type").and_then(Value::as_str) == Some(FUNCTION_TYPE)
}

fn set_reference(entry: &mut Value, resource_name: &str) {
    let Some(object) = entry.as_object_mut() else {
        return;
    };
    let properties = object
        .entry("Properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(properties) = properties.as_object_mut() {
        properties.insert(
            CODE_SIGNING_CONFIG_ARN.to_string(),
            json!({ "Ref": resource_name }),
        );
    }
}
