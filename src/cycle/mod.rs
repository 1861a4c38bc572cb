//! One decrypt → mount → backup → unmount → close cycle.
//!
//! Every step after the mount point check is gated on the previous one.
//! Cleanup owed by a successful step runs no matter how later steps end:
//! a successful open is always paired with a close, a successful mount is
//! always followed by an unmount attempt.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use tracing as log;

use crate::{
    config::{BackupCommand, Config},
    tooling::{CryptPort, Toolbox},
    utils::{
        process::{SPAWN_FAILED, Status},
        time::{fmt_duration, now_utc},
    },
};

pub mod failure;

pub use failure::Failure;


pub const MAPPING_PREFIX: &str = "luks-";

pub type RunResult = Result<(), Failure>;

#[inline]
pub fn mapping_name(volume: &str) -> String {
    format!("{MAPPING_PREFIX}{volume}")
}

pub fn exit_code(result: &RunResult) -> i32 {
    match result {
        Ok(()) => 0,
        Err(f) => f.exit_code(),
    }
}

/// Checks the configuration values every cycle needs.
pub fn check_config(cfg: &Config) -> RunResult {
    Required::from_config(cfg).map(|_| ())
}

struct Required<'a> {
    volume: &'a str,
    key_file: &'a Path,
    mount_point: &'a Path,
}

impl<'a> Required<'a> {
    fn from_config(cfg: &'a Config) -> Result<Self, Failure> {
        let volume = cfg
            .volume
            .uuid
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(Failure::MissingVolume)?;
        if !is_plain_name(volume) {
            return Err(Failure::InvalidVolume {
                volume: volume.to_string(),
            });
        }
        let key_file =
            non_empty_path(cfg.volume.key_file.as_deref()).ok_or(Failure::MissingKeyFile)?;
        let mount_point =
            non_empty_path(cfg.mount.path.as_deref()).ok_or(Failure::MissingMountPoint)?;
        Ok(Self {
            volume,
            key_file,
            mount_point,
        })
    }
}

/// A single path component: no separators, not `.` or `..`.
fn is_plain_name(s: &str) -> bool {
    !s.contains('/') && s != "." && s != ".."
}

#[inline]
fn non_empty_path(p: Option<&Path>) -> Option<&Path> {
    p.filter(|p| !p.as_os_str().is_empty())
}

#[derive(Debug)]
pub struct Cycle<'a> {
    volume: &'a str,
    key_file: &'a Path,
    mount_point: &'a Path,
    cleanup: bool,
    backup: &'a BackupCommand,
    interval: &'a str,
    mapping: String,
}

impl<'a> Cycle<'a> {
    /// Validates everything up front; nothing on the system is touched here.
    pub fn prepare(cfg: &'a Config, interval: Option<&'a str>) -> Result<Self, Failure> {
        let req = Required::from_config(cfg)?;
        let interval = interval
            .filter(|s| !s.trim().is_empty())
            .ok_or(Failure::MissingInterval)?;

        Ok(Self {
            volume: req.volume,
            key_file: req.key_file,
            mount_point: req.mount_point,
            cleanup: cfg.mount.cleanup,
            backup: &cfg.backup,
            interval,
            mapping: mapping_name(req.volume),
        })
    }

    pub fn run(&self, tools: &Toolbox) -> RunResult {
        match now_utc() {
            Ok(ts) => log::info!("[cycle] start {ts}"),
            Err(e) => log::debug!("[cycle] no timestamp: {e:#}"),
        }
        log::info!(
            "[cycle] volume={} mapping={} mount={} interval={} cleanup={}",
            self.volume,
            self.mapping,
            self.mount_point.display(),
            self.interval,
            self.cleanup
        );

        if let Err(e) = tools.fs().ensure_dir(self.mount_point) {
            log::debug!("[mkdir] {e:#}");
            return Err(Failure::MountPointCreation);
        }

        let block = tools.block();
        let device = block.by_uuid(self.volume);
        if !block.is_present(&device) {
            return Err(Failure::VolumeNotFound {
                volume: self.volume.to_string(),
            });
        }

        let mapping = OpenMapping::open(tools.crypt(), self.key_file, &device, &self.mapping)?;
        let result = self.mount_and_backup(tools, mapping.device());
        drop(mapping);

        if result.is_ok() {
            log::info!("[cycle] done");
        }
        result
    }

    fn mount_and_backup(&self, tools: &Toolbox, device: &Path) -> RunResult {
        let mount = tools.mount();

        log::info!(
            "[mount] {} at {}",
            device.display(),
            self.mount_point.display()
        );
        let st = step_status("mount", mount.mount(device, self.mount_point));
        if !st.success() {
            return Err(Failure::Mount {
                device: device.to_path_buf(),
                mount_point: self.mount_point.to_path_buf(),
                code: st.code(),
            });
        }

        self.backup(tools);

        log::info!("[umount] {}", self.mount_point.display());
        let st = step_status("umount", mount.unmount(self.mount_point));
        if !st.success() {
            return Err(Failure::Unmount {
                mount_point: self.mount_point.to_path_buf(),
                code: st.code(),
            });
        }

        if self.cleanup {
            match tools.fs().remove_dir(self.mount_point) {
                Ok(()) => log::debug!("[cleanup] removed {}", self.mount_point.display()),
                Err(e) => log::warn!("[cleanup] {e:#}"),
            }
        }
        Ok(())
    }

    /// The backup command's exit status is reported but never decides the
    /// cycle's result; unmount follows either way.
    fn backup(&self, tools: &Toolbox) {
        log::info!("[backup] {} {}", self.backup.program, self.interval);
        let started = Instant::now();
        let st = step_status("backup", tools.backup().run(self.backup, self.interval));
        let took = fmt_duration(started.elapsed());
        if st.success() {
            log::info!("[backup] finished in {took}");
        } else {
            log::warn!(
                "[backup] {} exited with {st} after {took}",
                self.backup.program
            );
        }
    }
}

/// A decrypted mapping; closed when dropped.
struct OpenMapping {
    crypt: Arc<dyn CryptPort>,
    name: String,
    device: PathBuf,
}

impl OpenMapping {
    fn open(
        crypt: Arc<dyn CryptPort>,
        key_file: &Path,
        device: &Path,
        name: &str,
    ) -> Result<Self, Failure> {
        log::info!("[open] {} as {name}", device.display());
        let st = step_status("open", crypt.open(key_file, device, name));
        if !st.success() {
            return Err(Failure::Open {
                device: device.to_path_buf(),
                key_file: key_file.to_path_buf(),
                code: st.code(),
            });
        }

        let mapped = crypt.mapped_device(name);
        Ok(Self {
            crypt,
            name: name.to_string(),
            device: mapped,
        })
    }

    fn device(&self) -> &Path {
        &self.device
    }
}

impl Drop for OpenMapping {
    fn drop(&mut self) {
        log::info!("[close] {}", self.name);
        let st = step_status("close", self.crypt.close(&self.name));
        if !st.success() {
            log::error!(
                "[close] closing {} failed with {st}; the mapping may still be open",
                self.name
            );
        }
    }
}

/// A collaborator that cannot even be started counts as exit 127, like in a shell.
fn step_status(step: &str, res: anyhow::Result<Status>) -> Status {
    res.unwrap_or_else(|e| {
        log::error!("[{step}] {e:#}");
        Status::from_code(SPAWN_FAILED)
    })
}
