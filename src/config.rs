//! Project configuration.
//!
//! `moonpack.json` describes the project; an optional `moonpack.local.json`
//! beside it is shallow-merged on top before validation, so machine-local
//! overrides never have to be committed. Validation collects every
//! violation instead of stopping at the first.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BundleError;

pub const CONFIG_FILE: &str = "moonpack.json";
pub const LOCAL_CONFIG_FILE: &str = "moonpack.local.json";

/// `author` accepts a single name or a list of names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Single(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub name: String,
    pub version: Option<String>,
    pub author: Option<Author>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub entry: String,
    pub out_dir: String,
}

/// Load, merge and validate the configuration of the project at
/// `directory`. Returns the config together with the path it was read
/// from.
pub fn load_config(directory: &Path) -> Result<(Config, PathBuf), BundleError> {
    let config_path = directory.join(CONFIG_FILE);
    if !config_path.is_file() {
        return Err(BundleError::ConfigNotFound {
            directory: directory.display().to_string(),
            config_path: CONFIG_FILE.to_string(),
        });
    }

    let mut value = parse_json_file(&config_path)?;

    let local_path = directory.join(LOCAL_CONFIG_FILE);
    if local_path.is_file() {
        let local = parse_json_file(&local_path)?;
        merge_shallow(&mut value, local);
    }

    let config = validate(&value, &config_path)?;
    Ok((config, config_path))
}

fn parse_json_file(path: &Path) -> Result<Value, BundleError> {
    let text = fs::read_to_string(path).map_err(|e| BundleError::ConfigParseError {
        config_path: path.display().to_string(),
        underlying: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| BundleError::ConfigParseError {
        config_path: path.display().to_string(),
        underlying: e.to_string(),
    })
}

/// Top-level fields of `local` win; nested values are replaced wholesale.
fn merge_shallow(base: &mut Value, local: Value) {
    match (base.as_object_mut(), local) {
        (Some(base_map), Value::Object(local_map)) => {
            for (key, value) in local_map {
                base_map.insert(key, value);
            }
        }
        (_, local) => *base = local,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Check every field and aggregate the violations. Unknown fields are
/// ignored for forward compatibility.
fn validate(value: &Value, config_path: &Path) -> Result<Config, BundleError> {
    let mut errors: Vec<String> = Vec::new();

    let object = match value.as_object() {
        Some(object) => object,
        None => {
            return Err(BundleError::InvalidConfig {
                config_path: config_path.display().to_string(),
                errors: vec!["config root must be a JSON object".to_string()],
            });
        }
    };

    let name = required_string(object, "name", &mut errors);
    let entry = required_string(object, "entry", &mut errors);
    let version = optional_string(object, "version", &mut errors);
    let description = optional_string(object, "description", &mut errors);
    let url = optional_string(object, "url", &mut errors);
    let out_dir = optional_string(object, "outDir", &mut errors);
    let author = author_field(object, &mut errors);

    if !errors.is_empty() {
        return Err(BundleError::InvalidConfig {
            config_path: config_path.display().to_string(),
            errors,
        });
    }

    Ok(Config {
        name: name.unwrap_or_default(),
        version,
        author,
        description,
        url,
        entry: entry.unwrap_or_default(),
        out_dir: out_dir.unwrap_or_else(|| "dist".to_string()),
    })
}

fn required_string(
    object: &serde_json::Map<String, Value>,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match object.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            errors.push(format!("'{field}' must be a non-empty string"));
            None
        }
        Some(_) => {
            errors.push(format!("'{field}' must be a string"));
            None
        }
        None => {
            errors.push(format!("'{field}' is required"));
            None
        }
    }
}

fn optional_string(
    object: &serde_json::Map<String, Value>,
    field: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match object.get(field) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(format!("'{field}' must be a string"));
            None
        }
        None => None,
    }
}

fn author_field(
    object: &serde_json::Map<String, Value>,
    errors: &mut Vec<String>,
) -> Option<Author> {
    match object.get("author") {
        Some(Value::String(s)) => Some(Author::Single(s.clone())),
        Some(Value::Array(items)) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => names.push(s.clone()),
                    _ => {
                        errors.push("'author' list entries must be strings".to_string());
                        return None;
                    }
                }
            }
            Some(Author::Many(names))
        }
        Some(_) => {
            errors.push("'author' must be a string or a list of strings".to_string());
            None
        }
        None => None,
    }
}
