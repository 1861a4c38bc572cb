use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;

use crate::utils::process::{CmdSpec, Runner, Status, StdioSpec};

pub const REQ_BINS: &[&str] = &["cryptsetup"];

const MAPPER_DIR: &str = "/dev/mapper";

/// Decryption layer: exposes a LUKS volume as a plain block device under a mapping name.
pub trait CryptPort: Send + Sync {
    fn open(&self, key_file: &Path, device: &Path, mapping: &str) -> Result<Status>;
    fn close(&self, mapping: &str) -> Result<Status>;

    /// Block device that appears once `mapping` is open.
    fn mapped_device(&self, mapping: &str) -> PathBuf {
        Path::new(MAPPER_DIR).join(mapping)
    }
}

type DynRunner = dyn Runner + Send + Sync;

pub struct CryptCli {
    runner: Arc<DynRunner>,
}

impl CryptCli {
    pub fn new(runner: Arc<DynRunner>) -> Self {
        Self { runner }
    }

    #[inline]
    fn cryptsetup(&self) -> CmdSpec {
        CmdSpec::new("cryptsetup")
            .stdout(StdioSpec::Inherit)
            .stderr(StdioSpec::Inherit)
    }

    fn luks_open_cmd(&self, key_file: &Path, device: &Path, mapping: &str) -> CmdSpec {
        self.cryptsetup()
            .arg("luksOpen")
            .arg("--key-file")
            .arg(key_file.display().to_string())
            .arg(device.display().to_string())
            .arg(mapping)
    }

    fn luks_close_cmd(&self, mapping: &str) -> CmdSpec {
        self.cryptsetup().arg("luksClose").arg(mapping)
    }
}

impl CryptPort for CryptCli {
    fn open(&self, key_file: &Path, device: &Path, mapping: &str) -> Result<Status> {
        self.runner
            .status(&self.luks_open_cmd(key_file, device, mapping))
    }

    fn close(&self, mapping: &str) -> Result<Status> {
        self.runner.status(&self.luks_close_cmd(mapping))
    }
}
