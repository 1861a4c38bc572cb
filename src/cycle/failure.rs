use std::{fmt, path::PathBuf};

/// sysexits(3) codes plus the "volume absent" signal.
pub mod code {
    pub const USAGE: i32 = 64;
    pub const CANT_CREATE: i32 = 73;
    pub const CONFIG: i32 = 78;
    pub const VOLUME_NOT_FOUND: i32 = 33;
}

/// Why a cycle ended early. `Display` is the one diagnostic line shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    MissingVolume,
    MissingKeyFile,
    MissingMountPoint,
    /// Identifier that would not name an entry under the by-uuid directory.
    InvalidVolume {
        volume: String,
    },
    MissingInterval,
    /// Configuration source could not be read or parsed.
    BadConfig(String),
    MountPointCreation,
    VolumeNotFound {
        volume: String,
    },
    Open {
        device: PathBuf,
        key_file: PathBuf,
        code: i32,
    },
    Mount {
        device: PathBuf,
        mount_point: PathBuf,
        code: i32,
    },
    Unmount {
        mount_point: PathBuf,
        code: i32,
    },
}

impl Failure {
    pub fn exit_code(&self) -> i32 {
        match self {
            Failure::MissingVolume
            | Failure::MissingKeyFile
            | Failure::MissingMountPoint
            | Failure::InvalidVolume { .. }
            | Failure::BadConfig(_) => code::CONFIG,
            Failure::MissingInterval => code::USAGE,
            Failure::MountPointCreation => code::CANT_CREATE,
            Failure::VolumeNotFound { .. } => code::VOLUME_NOT_FOUND,
            Failure::Open { code, .. }
            | Failure::Mount { code, .. }
            | Failure::Unmount { code, .. } => *code,
        }
    }

    /// An absent volume is the expected outcome while the disk is unplugged.
    pub fn is_expected(&self) -> bool {
        matches!(self, Failure::VolumeNotFound { .. })
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::MissingVolume => write!(f, "No volume specified."),
            Failure::MissingKeyFile => write!(f, "No key file specified."),
            Failure::MissingMountPoint => write!(f, "No mount point specified."),
            Failure::InvalidVolume { volume } => write!(f, "Invalid volume {volume}."),
            Failure::MissingInterval => write!(f, "No interval specified."),
            Failure::BadConfig(e) => write!(f, "Failed to load configuration: {e}"),
            Failure::MountPointCreation => write!(f, "Failed to create mount point."),
            Failure::VolumeNotFound { volume } => write!(f, "Volume {volume} not found."),
            Failure::Open {
                device, key_file, ..
            } => write!(
                f,
                "Failed to open {} with key {}.",
                device.display(),
                key_file.display()
            ),
            Failure::Mount {
                device,
                mount_point,
                ..
            } => write!(
                f,
                "Failed to mount {} at {}.",
                device.display(),
                mount_point.display()
            ),
            Failure::Unmount { mount_point, .. } => {
                write!(f, "Failed to unmount {}.", mount_point.display())
            }
        }
    }
}

impl std::error::Error for Failure {}
