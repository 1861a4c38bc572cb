use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};

use crate::utils::process::{CmdSpec, Runner, StdioSpec};

pub const REQ_BINS: &[&str] = &["mkdir", "rmdir"];

type DynRunner = dyn Runner + Send + Sync;

pub trait FsPort: Send + Sync {
    /// Creates `dir` and missing parents; a no-op if it already is a directory.
    fn ensure_dir(&self, dir: &Path) -> Result<()>;
    /// Removes an empty directory. Fails if anything is left inside.
    fn remove_dir(&self, dir: &Path) -> Result<()>;
}

pub struct FsCli {
    runner: Arc<DynRunner>,
}

impl FsCli {
    pub fn new(runner: Arc<DynRunner>) -> Self {
        Self { runner }
    }

    #[inline]
    fn mkdir_p(&self, dir: &Path) -> CmdSpec {
        CmdSpec::new("mkdir")
            .arg("-p")
            .arg(dir.display().to_string())
            .stdout(StdioSpec::Null)
            .stderr(StdioSpec::Inherit)
    }

    #[inline]
    fn rmdir(&self, dir: &Path) -> CmdSpec {
        CmdSpec::new("rmdir")
            .arg(dir.display().to_string())
            .stdout(StdioSpec::Null)
            .stderr(StdioSpec::Inherit)
    }
}

impl FsPort for FsCli {
    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if dir.is_dir() {
            return Ok(());
        }
        self.runner
            .run(&self.mkdir_p(dir))
            .with_context(|| format!("mkdir -p {}", dir.display()))
    }

    fn remove_dir(&self, dir: &Path) -> Result<()> {
        self.runner
            .run(&self.rmdir(dir))
            .with_context(|| format!("rmdir {}", dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::utils::process::ProcessRunner;

    fn cli() -> FsCli {
        FsCli::new(Arc::new(ProcessRunner::new()))
    }

    #[test]
    fn ensure_dir_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("mnt/usb/backup");
        cli().ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
        cli().ensure_dir(&dir).unwrap();
    }

    #[test]
    fn ensure_dir_fails_on_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("taken");
        fs::write(&file, "").unwrap();
        let err = cli().ensure_dir(&file.join("sub")).unwrap_err();
        assert!(format!("{err:#}").contains("mkdir -p"), "err was: {err:#}");
    }

    #[test]
    fn remove_dir_refuses_non_empty() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("backup");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("daily.0"), "data").unwrap();

        assert!(cli().remove_dir(&dir).is_err());
        assert!(dir.is_dir());

        fs::remove_file(dir.join("daily.0")).unwrap();
        cli().remove_dir(&dir).unwrap();
        assert!(!dir.exists());
    }
}
