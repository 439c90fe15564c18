//! Side files written next to downloaded models.
//!
//! - `model.json`: verbatim metadata response, rewritten every run
//! - `<model name>.url`: Internet shortcut to the model page, written once

mod atomic;

pub use atomic::{atomic_write, atomic_write_json};

use crate::{CivitError, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Write the raw metadata snapshot.
pub fn write_snapshot(path: &Path, raw: &Value) -> Result<()> {
    atomic_write_json(path, raw)?;
    info!("- save {}", path.display());
    Ok(())
}

/// Contents of an Internet shortcut pointing at `url`.
pub fn shortcut_contents(url: &str) -> String {
    format!("[InternetShortcut]\nURL={}", url)
}

/// Write the shortcut unless one already exists.
///
/// Returns whether the file was written.
pub fn write_shortcut_if_missing(path: &Path, url: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, shortcut_contents(url).as_bytes())?;
    info!("- save {}", path.display());
    Ok(true)
}

/// Model id recorded in a snapshot file.
///
/// Older snapshots may store the id as a string, so numeric strings are
/// accepted too. Returns `None` when the file has no usable id.
pub fn read_snapshot_id(path: &Path) -> Result<Option<u64>> {
    let contents = std::fs::read_to_string(path).map_err(|e| CivitError::io_with_path(e, path))?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| CivitError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(match value.get("id") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shortcut_written_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Model.url");

        assert!(write_shortcut_if_missing(&path, "https://civitai.com/models/1").unwrap());
        assert!(!write_shortcut_if_missing(&path, "https://civitai.com/models/2").unwrap());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[InternetShortcut]\nURL=https://civitai.com/models/1"
        );
    }

    #[test]
    fn test_read_snapshot_id_variants() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.json");

        std::fs::write(&path, r#"{"id": 42, "name": "x"}"#).unwrap();
        assert_eq!(read_snapshot_id(&path).unwrap(), Some(42));

        std::fs::write(&path, r#"{"id": "43"}"#).unwrap();
        assert_eq!(read_snapshot_id(&path).unwrap(), Some(43));

        std::fs::write(&path, r#"{"name": "x"}"#).unwrap();
        assert_eq!(read_snapshot_id(&path).unwrap(), None);

        std::fs::write(&path, "not json").unwrap();
        assert!(read_snapshot_id(&path).is_err());
    }

    #[test]
    fn test_write_snapshot_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("m").join("model.json");

        write_snapshot(&path, &serde_json::json!({"id": 1})).unwrap();
        write_snapshot(&path, &serde_json::json!({"id": 2})).unwrap();
        assert_eq!(read_snapshot_id(&path).unwrap(), Some(2));
    }
}
