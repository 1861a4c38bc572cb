use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config as cfg;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "LUKS_BACKUP";

const DEFAULT_BACKUP_PROGRAM: &str = "rsnapshot";

/// Settings for one backup cycle. Built once by [`Config::load`], read-only afterwards.
///
/// Required values stay `None` when unset; the cycle rejects them before
/// touching the system.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub volume: Volume,
    pub mount: Mount,
    pub backup: BackupCommand,
}

#[derive(Debug, Clone, Default)]
pub struct Volume {
    /// Filesystem UUID of the LUKS container.
    pub uuid: Option<String>,
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct Mount {
    pub path: Option<PathBuf>,
    /// Remove `path` after a successful unmount.
    pub cleanup: bool,
}

/// Program and leading arguments; the interval is appended at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for BackupCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_BACKUP_PROGRAM.to_string(),
            args: Vec::new(),
        }
    }
}

impl Config {
    /// Loads `path` (if given) with `LUKS_BACKUP_*` environment variables on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: cfg::Environment) -> Result<Self> {
        let mut builder = cfg::Config::builder();
        if let Some(p) = path {
            builder = builder.add_source(cfg::File::from(p));
        }
        let origin = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let raw: RawConfig = builder
            .add_source(env)
            .build()
            .with_context(|| format!("load {origin}"))?
            .try_deserialize()
            .with_context(|| format!("deserialize {origin}"))?;

        let base_dir = path
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let n = config_helpers::Normalizer { base_dir };

        let backup_default = BackupCommand::default();
        Ok(Self {
            volume: Volume {
                uuid: n.trim_opt(raw.volume.uuid),
                key_file: n.trim_opt(raw.volume.key_file).map(|s| n.resolve(&s)),
            },
            mount: Mount {
                path: n.trim_opt(raw.mount.path).map(|s| n.resolve(&s)),
                cleanup: raw.mount.cleanup.unwrap_or(false),
            },
            backup: BackupCommand {
                program: n
                    .trim_opt(raw.backup.command)
                    .unwrap_or(backup_default.program),
                args: raw.backup.args.unwrap_or(backup_default.args),
            },
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        #[derive(Serialize)]
        struct VolumeOut<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            uuid: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            key_file: Option<String>,
        }
        #[derive(Serialize)]
        struct MountOut {
            #[serde(skip_serializing_if = "Option::is_none")]
            path: Option<String>,
            cleanup: bool,
        }
        #[derive(Serialize)]
        struct BackupOut<'a> {
            command: &'a str,
            args: &'a [String],
        }
        #[derive(Serialize)]
        struct Out<'a> {
            volume: VolumeOut<'a>,
            mount: MountOut,
            backup: BackupOut<'a>,
        }

        let out = Out {
            volume: VolumeOut {
                uuid: self.volume.uuid.as_deref(),
                key_file: self
                    .volume
                    .key_file
                    .as_ref()
                    .map(|p| p.display().to_string()),
            },
            mount: MountOut {
                path: self.mount.path.as_ref().map(|p| p.display().to_string()),
                cleanup: self.mount.cleanup,
            },
            backup: BackupOut {
                command: &self.backup.program,
                args: &self.backup.args,
            },
        };
        Ok(toml::to_string_pretty(&out)?)
    }
}

fn environment() -> cfg::Environment {
    cfg::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    volume: RawVolume,
    #[serde(default)]
    mount: RawMount,
    #[serde(default)]
    backup: RawBackup,
}

#[derive(Debug, Deserialize, Default)]
struct RawVolume {
    uuid: Option<String>,
    key_file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawMount {
    path: Option<String>,
    cleanup: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct RawBackup {
    command: Option<String>,
    args: Option<Vec<String>>,
}

mod config_helpers {
    use std::path::{Path, PathBuf};

    pub(super) struct Normalizer<'a> {
        pub base_dir: &'a Path,
    }

    impl<'a> Normalizer<'a> {
        #[inline]
        pub fn trim_opt(&self, s: Option<String>) -> Option<String> {
            s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        /// Relative paths are taken relative to the config file.
        #[inline]
        pub fn resolve(&self, p: &str) -> PathBuf {
            let pb = PathBuf::from(p.trim());
            if pb.is_absolute() {
                pb
            } else {
                self.base_dir.join(pb)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write(path: &Path, s: &str) {
        fs::write(path, s).unwrap();
    }

    fn env_from(vars: &[(&str, &str)]) -> cfg::Environment {
        let map: cfg::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn load_full_file() {
        let tmp = TempDir::new().unwrap();
        let cfg_path = tmp.path().join("luks-backup.toml");
        write(
            &cfg_path,
            r#"
[volume]
uuid = " 0b5c7d2e-9a41-4c1e-b7a0-5d3e4f6a7b8c "
key_file = "/root/backup.key"

[mount]
path = "/mnt/backup"
cleanup = true

[backup]
command = "/usr/bin/rsnapshot"
args = ["-c", "/etc/rsnapshot.conf"]
"#,
        );

        let cfg = Config::load_with_env(Some(&cfg_path), env_from(&[])).unwrap();
        assert_eq!(
            cfg.volume.uuid.as_deref(),
            Some("0b5c7d2e-9a41-4c1e-b7a0-5d3e4f6a7b8c")
        );
        assert_eq!(cfg.volume.key_file, Some(PathBuf::from("/root/backup.key")));
        assert_eq!(cfg.mount.path, Some(PathBuf::from("/mnt/backup")));
        assert!(cfg.mount.cleanup);
        assert_eq!(cfg.backup.program, "/usr/bin/rsnapshot");
        assert_eq!(cfg.backup.args, vec!["-c", "/etc/rsnapshot.conf"]);
    }

    #[test]
    fn defaults_and_blank_values() {
        let tmp = TempDir::new().unwrap();
        let cfg_path = tmp.path().join("c.toml");
        write(
            &cfg_path,
            r#"
[volume]
uuid = "   "
"#,
        );

        let cfg = Config::load_with_env(Some(&cfg_path), env_from(&[])).unwrap();
        assert_eq!(cfg.volume.uuid, None);
        assert_eq!(cfg.volume.key_file, None);
        assert_eq!(cfg.mount.path, None);
        assert!(!cfg.mount.cleanup);
        assert_eq!(cfg.backup, BackupCommand::default());
    }

    #[test]
    fn relative_paths_follow_config_dir() {
        let tmp = TempDir::new().unwrap();
        let cfg_path = tmp.path().join("c.toml");
        write(
            &cfg_path,
            r#"
[volume]
key_file = "keys/usb.key"
"#,
        );

        let cfg = Config::load_with_env(Some(&cfg_path), env_from(&[])).unwrap();
        assert_eq!(cfg.volume.key_file, Some(tmp.path().join("keys/usb.key")));
    }

    #[test]
    fn environment_overrides_file() {
        let tmp = TempDir::new().unwrap();
        let cfg_path = tmp.path().join("c.toml");
        write(
            &cfg_path,
            r#"
[volume]
uuid = "from-file"

[mount]
path = "/mnt/file"
"#,
        );

        let env = env_from(&[
            ("LUKS_BACKUP_VOLUME__UUID", "from-env"),
            ("LUKS_BACKUP_MOUNT__CLEANUP", "true"),
        ]);
        let cfg = Config::load_with_env(Some(&cfg_path), env).unwrap();
        assert_eq!(cfg.volume.uuid.as_deref(), Some("from-env"));
        assert_eq!(cfg.mount.path, Some(PathBuf::from("/mnt/file")));
        assert!(cfg.mount.cleanup);
    }

    #[test]
    fn environment_only() {
        let env = env_from(&[
            ("LUKS_BACKUP_VOLUME__KEY_FILE", "/etc/keys/ext.key"),
            ("LUKS_BACKUP_BACKUP__COMMAND", "/opt/bin/backup.sh"),
        ]);
        let cfg = Config::load_with_env(None, env).unwrap();
        assert_eq!(cfg.volume.key_file, Some(PathBuf::from("/etc/keys/ext.key")));
        assert_eq!(cfg.backup.program, "/opt/bin/backup.sh");
        assert_eq!(cfg.volume.uuid, None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load_with_env(Some(&tmp.path().join("nope.toml")), env_from(&[]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("nope.toml"), "err was: {err:#}");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let cfg_path = tmp.path().join("c.toml");
        write(&cfg_path, "[mount]\ncleanup = \"sometimes\"\n");
        assert!(Config::load_with_env(Some(&cfg_path), env_from(&[])).is_err());
    }

    #[test]
    fn to_toml_roundtrips_through_loader() {
        let tmp = TempDir::new().unwrap();
        let cfg_path = tmp.path().join("c.toml");
        write(
            &cfg_path,
            r#"
[volume]
uuid = "abc"
key_file = "/k"

[mount]
path = "/mnt/b"
cleanup = true
"#,
        );
        let cfg = Config::load_with_env(Some(&cfg_path), env_from(&[])).unwrap();
        let printed = cfg.to_toml().unwrap();
        assert!(printed.contains("[volume]"));
        assert!(printed.contains(r#"uuid = "abc""#));
        assert!(printed.contains("cleanup = true"));
        assert!(printed.contains(r#"command = "rsnapshot""#));

        let again_path = tmp.path().join("again.toml");
        write(&again_path, &printed);
        let again = Config::load_with_env(Some(&again_path), env_from(&[])).unwrap();
        assert_eq!(again.volume.uuid, cfg.volume.uuid);
        assert_eq!(again.mount.path, cfg.mount.path);
        assert_eq!(again.backup, cfg.backup);
    }
}
