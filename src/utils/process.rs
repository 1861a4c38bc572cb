use std::process::{Child, Command, ExitStatus, Stdio};

use anyhow::{Context, Result, bail};

use crate::utils::exec_policy;

/// Shell convention for "command could not be started".
pub const SPAWN_FAILED: i32 = 127;

#[derive(Clone, Debug)]
pub enum StdioSpec {
    Inherit,
    Null,
}

impl StdioSpec {
    #[inline]
    fn to_stdio(&self) -> Stdio {
        match self {
            StdioSpec::Inherit => Stdio::inherit(),
            StdioSpec::Null => Stdio::null(),
        }
    }
}

/// Exit status of an external command, reduced to the number a shell would report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Status(i32);

impl Status {
    pub const SUCCESS: Status = Status(0);

    #[inline]
    pub fn from_code(code: i32) -> Self {
        Self(code)
    }

    #[inline]
    pub fn code(self) -> i32 {
        self.0
    }

    #[inline]
    pub fn success(self) -> bool {
        self.0 == 0
    }
}

impl From<ExitStatus> for Status {
    fn from(st: ExitStatus) -> Self {
        if let Some(code) = st.code() {
            return Self(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = st.signal() {
                return Self(128 + sig);
            }
        }
        Self(1)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "exit code {}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct CmdSpec {
    program: String,
    args: Vec<String>,
    stdout: StdioSpec,
    stderr: StdioSpec,
}

impl CmdSpec {
    #[must_use]
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout: StdioSpec::Inherit,
            stderr: StdioSpec::Inherit,
        }
    }

    #[must_use]
    pub fn arg(mut self, a: impl Into<String>) -> Self {
        self.args.push(a.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, it: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(it.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn stdout(mut self, s: StdioSpec) -> Self {
        self.stdout = s;
        self
    }

    #[must_use]
    pub fn stderr(mut self, s: StdioSpec) -> Self {
        self.stderr = s;
        self
    }

    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(sh_quote(&self.program));
        parts.extend(self.args.iter().map(|a| sh_quote(a)));
        parts.join(" ")
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdout(self.stdout.to_stdio());
        cmd.stderr(self.stderr.to_stdio());
        cmd
    }

    fn spawn(&self) -> Result<Child> {
        self.to_command()
            .spawn()
            .with_context(|| format!("spawn {}", self.render()))
    }
}

/// Synchronous command execution. Every collaborator goes through this seam.
pub trait Runner: Send + Sync {
    /// Runs the command to completion and reports its exit status.
    ///
    /// `Err` means the command could not be started or waited for; a
    /// non-zero exit is a normal `Ok` value.
    fn status(&self, cmd: &CmdSpec) -> Result<Status>;

    /// Runs the command and fails unless it exits with zero.
    fn run(&self, cmd: &CmdSpec) -> Result<()> {
        let st = self.status(cmd)?;
        if !st.success() {
            bail!("command failed: {} with {st}", cmd.render());
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Runner for ProcessRunner {
    fn status(&self, cmd: &CmdSpec) -> Result<Status> {
        if exec_policy::is_dry_run() {
            tracing::info!("[DRY-RUN] {}", cmd.render());
            return Ok(Status::SUCCESS);
        }
        tracing::debug!("exec: {}", cmd.render());

        let mut child = cmd.spawn()?;
        let st = child
            .wait()
            .with_context(|| format!("wait for {}", cmd.render()))?;
        Ok(st.into())
    }
}

fn sh_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".into();
    }
    if !s
        .bytes()
        .any(|b| b == b' ' || b == b'\'' || b == b'"' || b == b'\\')
    {
        return s.to_string();
    }
    let mut out = String::from("'");
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}
