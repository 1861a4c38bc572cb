use std::{collections::BTreeSet, sync::Arc};

use crate::{config::Config, utils::process::Runner};

pub mod backup;
pub mod block;
pub mod crypt;
pub mod fs;
pub mod mount;

pub use backup::{BackupCli, BackupPort};
pub use block::{BlockDevs, BlockPort};
pub use crypt::{CryptCli, CryptPort};
pub use fs::{FsCli, FsPort};
pub use mount::{MountCli, MountPort};

/// The collaborators one backup cycle talks to.
pub struct Toolbox {
    crypt: Arc<dyn CryptPort>,
    mount: Arc<dyn MountPort>,
    fs: Arc<dyn FsPort>,
    block: Arc<dyn BlockPort>,
    backup: Arc<dyn BackupPort>,
}

impl Toolbox {
    pub fn new(runner: Arc<dyn Runner + Send + Sync>) -> Self {
        Self::from_ports(
            Arc::new(CryptCli::new(runner.clone())),
            Arc::new(MountCli::new(runner.clone())),
            Arc::new(FsCli::new(runner.clone())),
            Arc::new(BlockDevs::new()),
            Arc::new(BackupCli::new(runner)),
        )
    }

    pub fn from_ports(
        crypt: Arc<dyn CryptPort>,
        mount: Arc<dyn MountPort>,
        fs: Arc<dyn FsPort>,
        block: Arc<dyn BlockPort>,
        backup: Arc<dyn BackupPort>,
    ) -> Self {
        Self {
            crypt,
            mount,
            fs,
            block,
            backup,
        }
    }

    #[inline]
    pub fn crypt(&self) -> Arc<dyn CryptPort> {
        self.crypt.clone()
    }
    #[inline]
    pub fn mount(&self) -> Arc<dyn MountPort> {
        self.mount.clone()
    }
    #[inline]
    pub fn fs(&self) -> Arc<dyn FsPort> {
        self.fs.clone()
    }
    #[inline]
    pub fn block(&self) -> Arc<dyn BlockPort> {
        self.block.clone()
    }
    #[inline]
    pub fn backup(&self) -> Arc<dyn BackupPort> {
        self.backup.clone()
    }
}

/// Every executable a cycle may spawn, including the configured backup command.
pub fn required_bins(cfg: &Config) -> BTreeSet<String> {
    crypt::REQ_BINS
        .iter()
        .chain(mount::REQ_BINS)
        .chain(fs::REQ_BINS)
        .map(|b| b.to_string())
        .chain(std::iter::once(cfg.backup.program.clone()))
        .collect()
}
