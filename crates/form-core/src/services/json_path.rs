//! Dot-path lookup inside JSON documents (`data.folio`, `items.0.id`)

use serde_json::Value;

use crate::error::{FormsError, Result};

/// Why a path did not resolve
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    EmptyPath,
    /// Segment absent from an object, or index out of range
    #[error("segment \"{segment}\" not found")]
    Missing { segment: String },
    /// Tried to descend into a scalar
    #[error("cannot read \"{segment}\" from a non-object value")]
    NotAContainer { segment: String },
}

/// Resolve `path` against `root`; numeric segments index into arrays
pub fn get_by_path<'a>(root: &'a Value, path: &str) -> std::result::Result<&'a Value, PathError> {
    if path.trim().is_empty() {
        return Err(PathError::EmptyPath);
    }

    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment).ok_or_else(|| PathError::Missing {
            segment: segment.to_string(),
        }),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index))
            .ok_or_else(|| PathError::Missing {
                segment: segment.to_string(),
            }),
        _ => Err(PathError::NotAContainer {
            segment: segment.to_string(),
        }),
    })
}

/// Read a folio string at `path`; scalar leaves are stringified
pub fn extract_folio(response: &Value, path: &str) -> Result<String> {
    let extraction_error = |reason: String| FormsError::FolioExtraction {
        path: path.to_string(),
        reason,
    };

    let value = get_by_path(response, path).map_err(|e| extraction_error(e.to_string()))?;

    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(extraction_error("value is null".to_string())),
        Value::Array(_) | Value::Object(_) => {
            Err(extraction_error("value is not a scalar".to_string()))
        }
    }
}
