//! Bento store interface and the local filesystem store

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;
use types::utils::has_bento_descriptor;
use types::BentoStoreError;

/// Version alias resolved through the store's `latest` pointer
pub const LATEST: &str = "latest";

/// Trait for bento stores
pub trait BentoStore: Send + Sync {
    /// Resolve a tag to the directory of a built bento
    fn get(&self, tag: &str) -> Result<PathBuf, BentoStoreError>;
}

/// Parsed `name[:version]` bento tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BentoTag {
    pub name: String,
    pub version: String,
}

impl BentoTag {
    /// Parse a tag; a bare name means the latest version
    pub fn parse(tag: &str) -> Result<Self, BentoStoreError> {
        let invalid = |reason: &str| BentoStoreError::InvalidTag {
            tag: tag.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = tag.split(':');
        let name = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or(LATEST);
        if parts.next().is_some() {
            return Err(invalid("expected 'name' or 'name:version'"));
        }
        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if version.is_empty() {
            return Err(invalid("version is empty"));
        }
        if !is_path_segment(name) || !is_path_segment(version) {
            return Err(invalid("name and version must not contain path separators"));
        }

        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    pub fn is_latest(&self) -> bool {
        self.version == LATEST
    }
}

/// True if `part` names exactly one directory below its parent
fn is_path_segment(part: &str) -> bool {
    !part.contains(['/', '\\']) && part != "." && part != ".."
}

impl fmt::Display for BentoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Bento store laid out as `<home>/bentos/<name>/<version>/bento.yaml`.
///
/// `<home>/bentos/<name>/latest` may hold the version that `name` and
/// `name:latest` resolve to; without it the greatest version directory wins.
#[derive(Debug, Clone)]
pub struct LocalBentoStore {
    root: PathBuf,
}

impl LocalBentoStore {
    /// Store rooted at `<home>/bentos`
    pub fn new<P: AsRef<Path>>(home: P) -> Self {
        Self {
            root: home.as_ref().join("bentos"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn latest_version(&self, name: &str) -> Result<Option<String>, BentoStoreError> {
        let name_dir = self.root.join(name);
        let pointer = name_dir.join(LATEST);
        if pointer.is_file() {
            let version = std::fs::read_to_string(&pointer).map_err(|source| {
                BentoStoreError::Io {
                    path: pointer.clone(),
                    source,
                }
            })?;
            let version = version.trim();
            if !version.is_empty() {
                if !is_path_segment(version) {
                    return Err(BentoStoreError::InvalidTag {
                        tag: name.to_string(),
                        reason: format!("'{}' pointer holds invalid version '{}'", LATEST, version),
                    });
                }
                return Ok(Some(version.to_string()));
            }
        }

        if !name_dir.is_dir() {
            return Ok(None);
        }
        let entries = std::fs::read_dir(&name_dir).map_err(|source| BentoStoreError::Io {
            path: name_dir.clone(),
            source,
        })?;

        let latest = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| has_bento_descriptor(&entry.path()))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .max();
        Ok(latest)
    }
}

impl BentoStore for LocalBentoStore {
    fn get(&self, tag: &str) -> Result<PathBuf, BentoStoreError> {
        let parsed = BentoTag::parse(tag)?;
        let version = if parsed.is_latest() {
            self.latest_version(&parsed.name)?
        } else {
            Some(parsed.version.clone())
        };

        let path = version
            .map(|version| self.root.join(&parsed.name).join(version))
            .filter(|path| has_bento_descriptor(path))
            .ok_or_else(|| BentoStoreError::NotFound {
                tag: tag.to_string(),
            })?;

        debug!(tag = %parsed, path = %path.display(), "Resolved bento from store");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use types::BENTO_DESCRIPTOR_FILE;

    fn add_bento(home: &Path, name: &str, version: &str) -> PathBuf {
        let dir = home.join("bentos").join(name).join(version);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(BENTO_DESCRIPTOR_FILE), "service: svc:svc\n").unwrap();
        dir
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            BentoTag::parse("iris:v1").unwrap(),
            BentoTag {
                name: "iris".to_string(),
                version: "v1".to_string()
            }
        );
        assert!(BentoTag::parse("iris").unwrap().is_latest());
        assert_eq!(BentoTag::parse("iris").unwrap().to_string(), "iris:latest");

        for bad in ["", ":v1", "iris:", "a:b:c", "../iris:v1", "iris:../v1"] {
            assert!(
                matches!(BentoTag::parse(bad), Err(BentoStoreError::InvalidTag { .. })),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_get_exact_version() {
        let home = TempDir::new().unwrap();
        let dir = add_bento(home.path(), "iris", "20240101");
        let store = LocalBentoStore::new(home.path());

        assert_eq!(store.get("iris:20240101").unwrap(), dir);
        assert!(matches!(
            store.get("iris:missing"),
            Err(BentoStoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_latest_pointer_wins() {
        let home = TempDir::new().unwrap();
        let older = add_bento(home.path(), "iris", "aaa");
        add_bento(home.path(), "iris", "zzz");
        std::fs::write(home.path().join("bentos/iris").join(LATEST), "aaa\n").unwrap();

        let store = LocalBentoStore::new(home.path());
        assert_eq!(store.get("iris").unwrap(), older);
        assert_eq!(store.get("iris:latest").unwrap(), older);
    }

    #[test]
    fn test_latest_pointer_cannot_leave_name_dir() {
        let home = TempDir::new().unwrap();
        add_bento(home.path(), "iris", "aaa");
        add_bento(home.path(), "other", "v1");
        std::fs::write(home.path().join("bentos/iris").join(LATEST), "../other/v1\n").unwrap();

        let store = LocalBentoStore::new(home.path());
        assert!(matches!(
            store.get("iris"),
            Err(BentoStoreError::InvalidTag { .. })
        ));

        std::fs::write(home.path().join("bentos/iris").join(LATEST), "..\n").unwrap();
        assert!(store.get("iris:latest").is_err());
    }

    #[test]
    fn test_latest_falls_back_to_greatest_version() {
        let home = TempDir::new().unwrap();
        add_bento(home.path(), "iris", "aaa");
        let newest = add_bento(home.path(), "iris", "zzz");
        // not a bento: no descriptor
        std::fs::create_dir_all(home.path().join("bentos/iris/zzzz")).unwrap();

        let store = LocalBentoStore::new(home.path());
        assert_eq!(store.get("iris").unwrap(), newest);
    }

    #[test]
    fn test_unknown_name() {
        let home = TempDir::new().unwrap();
        let store = LocalBentoStore::new(home.path());
        assert!(matches!(
            store.get("unknown"),
            Err(BentoStoreError::NotFound { .. })
        ));
    }
}
