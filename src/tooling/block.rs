use std::path::{Path, PathBuf};

use tracing as log;

const BY_UUID_DIR: &str = "/dev/disk/by-uuid";

/// Lookup of block devices by their stable aliases.
pub trait BlockPort: Send + Sync {
    fn by_uuid(&self, uuid: &str) -> PathBuf;
    fn is_present(&self, dev: &Path) -> bool;
}

pub struct BlockDevs {
    by_uuid_dir: PathBuf,
}

impl BlockDevs {
    pub fn new() -> Self {
        Self::with_dir(BY_UUID_DIR)
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            by_uuid_dir: dir.into(),
        }
    }
}

impl Default for BlockDevs {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockPort for BlockDevs {
    fn by_uuid(&self, uuid: &str) -> PathBuf {
        self.by_uuid_dir.join(uuid)
    }

    fn is_present(&self, dev: &Path) -> bool {
        // by-uuid entries are symlinks; exists() follows them, so a dangling
        // link left behind by udev counts as absent.
        let present = dev.exists();
        log::debug!("[block] {} present={present}", dev.display());
        present
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn default_alias_dir() {
        assert_eq!(
            BlockDevs::new().by_uuid("0b5c-11"),
            PathBuf::from("/dev/disk/by-uuid/0b5c-11")
        );
    }

    #[cfg(unix)]
    #[test]
    fn presence_follows_symlinks() {
        let tmp = TempDir::new().unwrap();
        let devs = BlockDevs::with_dir(tmp.path());
        let node = tmp.path().join("sdz1");
        let alias = devs.by_uuid("0b5c-11");

        std::os::unix::fs::symlink(&node, &alias).unwrap();
        assert!(!devs.is_present(&alias));

        fs::write(&node, "").unwrap();
        assert!(devs.is_present(&alias));
    }
}
