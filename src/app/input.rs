//! Reading host input files.
//!
//! A file holds either one [`SourceFile`] or a list of them, encoded as JSON
//! (`.json`) or YAML (`.yaml`, `.yml`). Any other extension is read as YAML,
//! which also accepts JSON.

use std::{fs::read_to_string, path::Path};

use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{AppResult, file_read_error, input_parse_error},
    host::SourceFile
};

#[derive(Deserialize)]
#[serde(untagged)]
enum HostInput {
    Many(Vec<SourceFile>),
    One(SourceFile)
}

/// Read and decode one host input file.
pub fn read_source_files(path: &Path) -> AppResult<Vec<SourceFile>> {
    let origin = path.display().to_string();
    let content = read_to_string(path).map_err(|e| file_read_error(&origin, e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let files = decode_source_files(&content, is_json, &origin)?;
    debug!(path = %origin, files = files.len(), "host input decoded");
    Ok(files)
}

/// Decode host input text. Files without a path are named after `origin`.
pub fn decode_source_files(content: &str, is_json: bool, origin: &str) -> AppResult<Vec<SourceFile>> {
    let input: HostInput = if is_json {
        serde_json::from_str(content).map_err(|e| input_parse_error(origin, e.to_string()))?
    } else {
        serde_yaml::from_str(content).map_err(|e| input_parse_error(origin, e.to_string()))?
    };
    let mut files = match input {
        HostInput::Many(files) => files,
        HostInput::One(file) => vec![file]
    };
    for file in &mut files {
        if file.path.is_empty() {
            file.path = origin.to_string();
        }
    }
    Ok(files)
}
