//! Writing training-data exports to disk.

use std::path::{Path, PathBuf};

/// `training_data.<format>` inside `dir`.
pub fn default_path(dir: &Path, format: &str) -> PathBuf {
    dir.join(format!("training_data.{format}"))
}

/// Write an export payload. String payloads (CSV) are written as-is,
/// everything else as pretty-printed JSON.
pub fn write(path: &Path, payload: &serde_json::Value) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let text = match payload {
        serde_json::Value::String(raw) => raw.clone(),
        other => serde_json::to_string_pretty(other)?,
    };
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = default_path(dir.path(), "json");
        assert!(path.ends_with("training_data.json"));

        write(&path, &json!([{"text": "你好", "intent": "greet"}])).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains('\n'));
        let back: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(back[0]["intent"], "greet");
    }

    #[test]
    fn writes_raw_csv_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        write(&path, &json!("text,intent\n你好,greet\n")).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "text,intent\n你好,greet\n"
        );
    }
}
