//! YAML definition loader

use rolegen_core::{CoreError, DefinitionSource, RawDefinition, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Accepted shapes of one YAML document
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DefinitionDocument {
    List(Vec<RawDefinition>),
    Wrapped { roles: Vec<RawDefinition> },
}

impl DefinitionDocument {
    fn into_records(self) -> Vec<RawDefinition> {
        match self {
            DefinitionDocument::List(records) => records,
            DefinitionDocument::Wrapped { roles } => roles,
        }
    }
}

/// Loads role definitions from a YAML file or a directory of YAML files
///
/// Directories are read non-recursively in sorted path order so the
/// authoring order, and therefore diagnostics, are stable.
#[derive(Debug, Clone)]
pub struct YamlDefinitionSource {
    path: PathBuf,
}

impl YamlDefinitionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files to read, in load order
    fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.path.exists() {
            return Err(CoreError::not_found(self.path.display().to_string()));
        }
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.is_file() && is_yaml(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Parse every document of one file, tagging records with their origin
fn parse_file(path: &Path, contents: &str) -> Result<Vec<RawDefinition>> {
    let origin = path.display().to_string();
    let mut records = Vec::new();

    if contents.trim().is_empty() {
        return Ok(records);
    }

    for document in serde_yaml::Deserializer::from_str(contents) {
        let parsed = Option::<DefinitionDocument>::deserialize(document).map_err(|e| {
            CoreError::serialization(format!(
                "{}: expected a list of roles or a mapping with a 'roles' list ({})",
                origin, e
            ))
        })?;

        for mut record in parsed.map(DefinitionDocument::into_records).unwrap_or_default() {
            if record.source.is_none() {
                record.source = Some(origin.clone());
            }
            records.push(record);
        }
    }

    Ok(records)
}

impl DefinitionSource for YamlDefinitionSource {
    fn load(&self) -> Result<Vec<RawDefinition>> {
        let mut records = Vec::new();

        for file in self.files()? {
            let contents = std::fs::read_to_string(&file).map_err(|e| {
                CoreError::source_error(format!("failed to read {}: {}", file.display(), e))
            })?;
            let parsed = parse_file(&file, &contents)?;
            debug!(file = %file.display(), records = parsed.len(), "loaded definitions");
            records.extend(parsed);
        }

        Ok(records)
    }
}
