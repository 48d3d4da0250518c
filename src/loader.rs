// src/loader.rs

//! Address file loading.
//!
//! A treasury file is a JSON object holding one address array per category.
//! Single-category files are either such an object or plain text with one
//! address per line.

use crate::address::{Address, Category};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read address file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Treasury file '{0}' must contain a JSON object")]
    NotAnObject(PathBuf),
    #[error("'{key}' in '{path}' must be an array of address strings")]
    NotAnArray { path: PathBuf, key: String },
    #[error("Entry {index} of '{key}' in '{path}' is not a string")]
    InvalidEntry {
        path: PathBuf,
        key: String,
        index: usize,
    },
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn address_array(path: &Path, key: &str, value: &Value) -> Result<Vec<Address>, LoadError> {
    let entries = value.as_array().ok_or_else(|| LoadError::NotAnArray {
        path: path.to_path_buf(),
        key: key.to_string(),
    })?;
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .as_str()
                .map(|s| Address::from(s.trim()))
                .ok_or_else(|| LoadError::InvalidEntry {
                    path: path.to_path_buf(),
                    key: key.to_string(),
                    index,
                })
        })
        .collect()
}

/// Parses treasury JSON content. Missing categories are empty; unknown keys
/// are ignored with a warning.
pub fn parse_treasury(
    path: &Path,
    content: &str,
) -> Result<BTreeMap<Category, Vec<Address>>, LoadError> {
    let value: Value = serde_json::from_str(content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let object = value
        .as_object()
        .ok_or_else(|| LoadError::NotAnObject(path.to_path_buf()))?;

    for key in object.keys() {
        if Category::from_json_key(key).is_none() {
            warn!("Ignoring unknown key '{key}' in {}", path.display());
        }
    }

    let mut categories = BTreeMap::new();
    for category in Category::ALL {
        let addresses = match object.get(category.json_key()) {
            Some(value) => address_array(path, category.json_key(), value)?,
            None => Vec::new(),
        };
        categories.insert(category, addresses);
    }
    Ok(categories)
}

pub fn load_treasury(path: &Path) -> Result<BTreeMap<Category, Vec<Address>>, LoadError> {
    let content = read(path)?;
    let categories = parse_treasury(path, &content)?;
    debug!(
        "Loaded {} addresses from {}",
        categories.values().map(Vec::len).sum::<usize>(),
        path.display()
    );
    Ok(categories)
}

/// Parses a single-category file: the category's array when the content is a
/// JSON object, otherwise one address per non-blank line.
pub fn parse_category(
    path: &Path,
    category: Category,
    content: &str,
) -> Result<Vec<Address>, LoadError> {
    if content.trim_start().starts_with('{') {
        if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(content) {
            return match object.get(category.json_key()) {
                Some(value) => address_array(path, category.json_key(), value),
                None => Ok(Vec::new()),
            };
        }
        debug!("{} is not valid JSON, reading it as plain text", path.display());
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Address::from)
        .collect())
}

pub fn load_category(path: &Path, category: Category) -> Result<Vec<Address>, LoadError> {
    let content = read(path)?;
    parse_category(path, category, &content)
}
