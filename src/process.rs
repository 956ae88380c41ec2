//! Typed external command invocation.
//!
//! Every external tool the pipeline drives (losetup, parted, mkfs.*, tune2fs,
//! mount, cpio, qemu-img) is invoked through [`Cmd`] so argument construction
//! is assembled through one builder instead of ad-hoc strings.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Builder for running an external command with a custom failure message.
///
/// # Example
///
/// ```rust,ignore
/// Cmd::new("mkfs.ext4")
///     .args(["-F", "-L", "ROOT"])
///     .arg_path(&device)
///     .error_msg("mkfs.ext4 failed")
///     .run()?;
/// ```
pub struct Cmd {
    program: String,
    args: Vec<OsString>,
    error_msg: Option<String>,
    allow_fail: bool,
}

impl Cmd {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            error_msg: None,
            allow_fail: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arg_path(mut self, path: impl AsRef<Path>) -> Self {
        self.args.push(path.as_ref().into());
        self
    }

    /// Message used when the command exits non-zero.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    /// Treat a non-zero exit as a normal outcome instead of an error.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Run the command, discarding its output.
    pub fn run(self) -> Result<ExitStatus> {
        debug!("running: {} {:?}", self.program, self.args);
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("failed to run '{}'", self.program))?;

        if !status.success() && !self.allow_fail {
            match self.error_msg {
                Some(msg) => bail!("{} ({})", msg, status),
                None => bail!("'{}' failed with {}", self.program, status),
            }
        }
        Ok(status)
    }

    /// Run the command and capture its trimmed stdout.
    pub fn run_capture(self) -> Result<String> {
        debug!("running: {} {:?}", self.program, self.args);
        let output = Command::new(&self.program)
            .args(&self.args)
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| format!("failed to run '{}'", self.program))?;

        if !output.status.success() && !self.allow_fail {
            match self.error_msg {
                Some(msg) => bail!("{} ({})", msg, output.status),
                None => bail!("'{}' failed with {}", self.program, output.status),
            }
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
