use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use crate::error::StoreError;
use crate::store::kv::KeyValueStore;

const EXTENSION: &str = "json";

/// One JSON file per key under a data directory.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(format!("{key}.{EXTENSION}")))
    }

    /// Remove `.tmp` files left behind by a write that never reached its
    /// rename. Returns true if any were found.
    pub fn clean_interrupted_writes(&self) -> bool {
        let Ok(entries) = fs::read_dir(&self.base_dir) else {
            return false;
        };
        let mut found = false;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().and_then(|x| x.to_str()) == Some("tmp") {
                found = true;
                tracing::warn!(path = %path.display(), "removing interrupted write");
                let _ = fs::remove_file(&path);
            }
        }
        found
    }
}

impl KeyValueStore for JsonStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.file_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temp file and rename so a crash never leaves a
    /// half-written record.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.file_path(key)?;
        let tmp_path = path.with_extension("tmp");

        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.file_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|x| x.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        for key in self.list()? {
            self.remove(&key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_key_reads_as_none() {
        let (_dir, store) = make_test_store();
        assert_eq!(store.get("spelling_history").unwrap(), None);
    }

    #[test]
    fn test_set_get_survives_reopen() {
        let (dir, mut store) = make_test_store();
        store.set("typing_history", r#"{"sessions":[]}"#).unwrap();

        let reopened = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            reopened.get("typing_history").unwrap().as_deref(),
            Some(r#"{"sessions":[]}"#)
        );
    }

    #[test]
    fn test_no_tmp_file_after_write() {
        let (dir, mut store) = make_test_store();
        store.set("k", "v").unwrap();
        let tmp_files: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(tmp_files.is_empty(), "no residual .tmp files");
    }

    #[test]
    fn test_list_remove_clear() {
        let (dir, mut store) = make_test_store();
        store.set("b", "2").unwrap();
        store.set("a", "1").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        assert_eq!(store.list().unwrap(), vec!["a", "b"]);

        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.list().unwrap(), vec!["b"]);

        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let (_dir, mut store) = make_test_store();
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn test_clean_interrupted_writes() {
        let (dir, store) = make_test_store();
        assert!(!store.clean_interrupted_writes());

        fs::write(dir.path().join("spelling_history.tmp"), "{").unwrap();
        assert!(store.clean_interrupted_writes());
        assert!(!dir.path().join("spelling_history.tmp").exists());
    }
}
