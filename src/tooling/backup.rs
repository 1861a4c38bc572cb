use std::sync::Arc;

use anyhow::Result;

use crate::{
    config::BackupCommand,
    utils::process::{CmdSpec, Runner, Status, StdioSpec},
};

/// The external program doing the actual backup, e.g. `rsnapshot`.
pub trait BackupPort: Send + Sync {
    fn run(&self, cmd: &BackupCommand, interval: &str) -> Result<Status>;
}

type DynRunner = dyn Runner + Send + Sync;

pub struct BackupCli {
    runner: Arc<DynRunner>,
}

impl BackupCli {
    pub fn new(runner: Arc<DynRunner>) -> Self {
        Self { runner }
    }

    fn command(&self, cmd: &BackupCommand, interval: &str) -> CmdSpec {
        CmdSpec::new(cmd.program.as_str())
            .args(cmd.args.iter().cloned())
            .arg(interval)
            .stdout(StdioSpec::Inherit)
            .stderr(StdioSpec::Inherit)
    }
}

impl BackupPort for BackupCli {
    fn run(&self, cmd: &BackupCommand, interval: &str) -> Result<Status> {
        self.runner.status(&self.command(cmd, interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::process::ProcessRunner;

    #[test]
    fn interval_goes_last() {
        let cli = BackupCli::new(Arc::new(ProcessRunner::new()));
        let cmd = BackupCommand {
            program: "/usr/bin/rsnapshot".to_string(),
            args: vec!["-c".to_string(), "/etc/rsnapshot.conf".to_string()],
        };
        assert_eq!(
            cli.command(&cmd, "daily").render(),
            "/usr/bin/rsnapshot -c /etc/rsnapshot.conf daily"
        );
    }

    #[test]
    fn exit_code_is_reported() {
        let cli = BackupCli::new(Arc::new(ProcessRunner::new()));
        let cmd = BackupCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit \"$0\"".to_string()],
        };
        assert_eq!(cli.run(&cmd, "3").unwrap().code(), 3);
    }
}
