//! Local record of every image already uploaded.
//!
//! The manifest is a JSON array on disk and a map keyed by source path in
//! memory. It is rewritten in full after each successful upload so a second
//! run over the same folder skips everything that made it to Imgur.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::errors::{AppError, AppResult};

/// One successfully uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Randomized name given to the remote copy
    pub filename: String,
    pub original_name: String,
    #[serde(rename = "link", default)]
    pub remote_link: String,
    #[serde(rename = "deletehash", default)]
    pub delete_handle: String,
    #[serde(rename = "id", default)]
    pub remote_id: String,
    #[serde(rename = "upload_date", default)]
    pub upload_timestamp: String,
    pub filepath: String,
}

/// Key used for a local file in the manifest.
///
/// `.` components are dropped so `./images/a.jpg` and `images/a.jpg` share a
/// key; `Path::components` already folds repeated and trailing separators.
pub fn manifest_key(path: &Path) -> String {
    let normalized: PathBuf = path
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        return ".".to_string();
    }
    normalized.to_string_lossy().to_string()
}

#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Load the manifest at `path`.
    ///
    /// A missing file yields an empty manifest. So does a file that is not a
    /// valid manifest, after a warning; it is overwritten by the next save.
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let mut manifest = Self {
            path,
            entries: BTreeMap::new(),
        };

        if !manifest.path.exists() {
            log::info!(
                "No manifest at {}, starting empty",
                manifest.path.display()
            );
            return Ok(manifest);
        }

        let contents = fs::read_to_string(&manifest.path)?;
        match serde_json::from_str::<Vec<ManifestEntry>>(&contents) {
            Ok(entries) => {
                for entry in entries {
                    let key = manifest_key(Path::new(&entry.filepath));
                    manifest.entries.insert(key, entry);
                }
                log::info!(
                    "Loaded {} manifest entries from {}",
                    manifest.entries.len(),
                    manifest.path.display()
                );
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse manifest {}: {}. Starting empty.",
                    manifest.path.display(),
                    e
                );
            }
        }

        Ok(manifest)
    }

    pub fn is_already_uploaded(&self, filepath: &Path) -> bool {
        self.entries.contains_key(&manifest_key(filepath))
    }

    pub fn get(&self, filepath: &Path) -> Option<&ManifestEntry> {
        self.entries.get(&manifest_key(filepath))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    /// Insert or replace the entry for `entry.filepath` and persist the whole
    /// manifest. A failed write is returned to the caller; the entry stays in
    /// memory and goes out with the next successful save.
    pub fn record_upload(&mut self, entry: ManifestEntry) -> AppResult<()> {
        log::debug!("Recording upload of {}", entry.filepath);
        let key = manifest_key(Path::new(&entry.filepath));
        self.entries.insert(key, entry);
        self.save()
    }

    /// Replace the file on disk with the current entries.
    ///
    /// Writes a sibling temp file and renames it over the target, so an
    /// interrupted save leaves the previous manifest intact.
    pub fn save(&self) -> AppResult<()> {
        let contents = self.to_json()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| AppError::persistence(&self.path, e))?;
            }
        }

        let temp_path = temp_path_for(&self.path);
        fs::write(&temp_path, contents).map_err(|e| AppError::persistence(&self.path, e))?;
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(AppError::persistence(&self.path, e));
        }

        log::debug!(
            "Saved {} manifest entries to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    fn to_json(&self) -> AppResult<Vec<u8>> {
        let entries: Vec<&ManifestEntry> = self.entries.values().collect();

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        entries.serialize(&mut serializer)?;
        Ok(buffer)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(filepath: &str, id: &str) -> ManifestEntry {
        ManifestEntry {
            filename: format!("{}.jpg", id),
            original_name: Path::new(filepath)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string(),
            remote_link: format!("https://i.imgur.com/{}.jpg", id),
            delete_handle: format!("del-{}", id),
            remote_id: id.to_string(),
            upload_timestamp: "2024-05-01T12:30:45.123456".to_string(),
            filepath: filepath.to_string(),
        }
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let manifest = Manifest::load(dir.path().join("imgur_data.json")).unwrap();
        assert!(manifest.is_empty());
        assert!(!manifest.is_already_uploaded(Path::new("images/a.jpg")));
    }

    #[test]
    fn test_invalid_json_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("imgur_data.json");
        fs::write(&path, "{ not json").unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_record_upload_persists_and_marks_uploaded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("imgur_data.json");
        let mut manifest = Manifest::load(&path).unwrap();

        manifest.record_upload(entry("images/a.jpg", "abc")).unwrap();

        assert!(manifest.is_already_uploaded(Path::new("images/a.jpg")));
        assert!(path.exists());
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_round_trip_preserves_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("imgur_data.json");
        let mut manifest = Manifest::load(&path).unwrap();

        let originals = vec![
            entry("images/z.png", "zzz"),
            entry("images/a.jpg", "aaa"),
            entry("images/sub/m.gif", "mmm"),
        ];
        for e in &originals {
            manifest.record_upload(e.clone()).unwrap();
        }

        let reloaded = Manifest::load(&path).unwrap();
        assert_eq!(reloaded.len(), originals.len());
        for e in &originals {
            assert_eq!(reloaded.get(Path::new(&e.filepath)), Some(e));
        }
    }

    #[test]
    fn test_record_upload_overwrites_same_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("imgur_data.json");
        let mut manifest = Manifest::load(&path).unwrap();

        manifest.record_upload(entry("images/a.jpg", "first")).unwrap();
        manifest.record_upload(entry("images/a.jpg", "second")).unwrap();

        let reloaded = Manifest::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            reloaded.get(Path::new("images/a.jpg")).unwrap().remote_id,
            "second"
        );
    }

    #[test]
    fn test_file_format_uses_original_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("imgur_data.json");
        let mut manifest = Manifest::load(&path).unwrap();
        manifest.record_upload(entry("images/a.jpg", "abc")).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let object = value[0].as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
        for key in [
            "filename",
            "original_name",
            "link",
            "deletehash",
            "id",
            "upload_date",
            "filepath",
        ] {
            assert!(keys.contains(&key), "missing key {}", key);
        }
        assert!(raw.contains("\n        \"filename\""), "expected 4-space indent");
    }

    #[test]
    fn test_duplicate_paths_on_disk_keep_last() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("imgur_data.json");
        let entries = vec![entry("images/a.jpg", "old"), entry("images/a.jpg", "new")];
        fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get(Path::new("images/a.jpg")).unwrap().remote_id, "new");
    }

    #[test]
    fn test_key_ignores_current_dir_components() {
        assert_eq!(manifest_key(Path::new("./images/a.jpg")), "images/a.jpg");
        assert_eq!(manifest_key(Path::new("images/./sub//a.jpg")), "images/sub/a.jpg");
        assert_eq!(manifest_key(Path::new("/data/./images/a.jpg")), "/data/images/a.jpg");
        assert_eq!(manifest_key(Path::new("./")), ".");
    }

    #[test]
    fn test_dot_prefixed_entries_on_disk_match_plain_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("imgur_data.json");
        let entries = vec![entry("./images/a.jpg", "abc")];
        fs::write(&path, serde_json::to_string(&entries).unwrap()).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert!(manifest.is_already_uploaded(Path::new("images/a.jpg")));
        assert!(manifest.is_already_uploaded(Path::new("./images/a.jpg")));
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempdir().unwrap();
        // The manifest path is an existing directory, so the rename cannot succeed.
        let path = dir.path().join("taken");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let mut manifest = Manifest {
            path: path.clone(),
            entries: BTreeMap::new(),
        };
        let result = manifest.record_upload(entry("images/a.jpg", "abc"));

        assert!(matches!(result, Err(AppError::Persistence { .. })));
        assert!(manifest.is_already_uploaded(Path::new("images/a.jpg")));
    }
}
