//! YAML file helpers shared by the project store.

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Loads a YAML file whose top level must be a mapping.
///
/// An empty document yields an empty map. Parse failures and non-mapping
/// documents are reported as [`Error::MalformedConfig`].
pub fn load_yaml_map(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }

    let value: Value = serde_yaml::from_str(&content).map_err(|e| Error::malformed(path, e))?;
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(Error::malformed(
            path,
            format!("expected a mapping at the top level, found {}", type_name(&other)),
        )),
    }
}

/// Writes YAML text, creating parent directories as needed.
pub fn write_yaml_file(path: &Path, yaml: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, yaml)?;
    Ok(())
}

/// Recursively collects `.yaml` files below a directory.
///
/// A missing directory yields no files. Hidden entries are skipped.
pub fn yaml_files_under(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        collect_yaml_files(dir, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn collect_yaml_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_yaml_files(&path, files)?;
        } else if file_type.is_file() && path.extension().is_some_and(|ext| ext == "yaml") {
            files.push(path);
        }
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}
