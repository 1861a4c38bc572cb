use std::{path::Path, sync::Arc};

use anyhow::Result;

use crate::utils::process::{CmdSpec, Runner, Status, StdioSpec};

pub const REQ_BINS: &[&str] = &["mount", "umount"];

pub trait MountPort: Send + Sync {
    fn mount(&self, device: &Path, target: &Path) -> Result<Status>;
    fn unmount(&self, target: &Path) -> Result<Status>;
}

type DynRunner = dyn Runner + Send + Sync;

pub struct MountCli {
    runner: Arc<DynRunner>,
}

impl MountCli {
    pub fn new(runner: Arc<DynRunner>) -> Self {
        Self { runner }
    }

    #[inline]
    fn mount_cmd(&self, device: &Path, target: &Path) -> CmdSpec {
        CmdSpec::new("mount")
            .arg(device.display().to_string())
            .arg(target.display().to_string())
            .stdout(StdioSpec::Null)
            .stderr(StdioSpec::Inherit)
    }

    #[inline]
    fn umount_cmd(&self, target: &Path) -> CmdSpec {
        CmdSpec::new("umount")
            .arg(target.display().to_string())
            .stdout(StdioSpec::Null)
            .stderr(StdioSpec::Inherit)
    }
}

impl MountPort for MountCli {
    fn mount(&self, device: &Path, target: &Path) -> Result<Status> {
        self.runner.status(&self.mount_cmd(device, target))
    }

    fn unmount(&self, target: &Path) -> Result<Status> {
        self.runner.status(&self.umount_cmd(target))
    }
}
