use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Replace `path` with `data` via a synced tempfile in the same directory.
/// Readers see either the old contents or the new, never a partial record.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// `None` when the file does not exist.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_yaml::from_str(&data)?))
}

pub fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let data = serde_yaml::to_string(value)?;
    atomic_write(path, data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".chainplan/records/local.yaml");
        atomic_write(&path, b"network: local").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "network: local");
    }

    #[test]
    fn atomic_write_replaces_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("record.yaml");
        atomic_write(&path, b"first version, much longer").unwrap();
        atomic_write(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn write_if_missing_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deploy.yaml");
        std::fs::write(&path, b"original").unwrap();
        assert!(!write_if_missing(&path, b"new").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn yaml_helpers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.yaml");
        assert_eq!(read_yaml::<BTreeMap<String, u64>>(&path).unwrap(), None);

        let map = BTreeMap::from([("nonce".to_string(), 3u64)]);
        write_yaml(&path, &map).unwrap();
        assert_eq!(read_yaml(&path).unwrap(), Some(map));
    }

    #[test]
    fn read_yaml_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "units: [unclosed").unwrap();
        assert!(read_yaml::<serde_yaml::Value>(&path).is_err());
    }
}
