use std::ffi::OsString;
use std::io;
use std::process::{Command, Stdio};

/// Runs the service manager's control binary and returns what it printed.
///
/// A non-zero exit status is *not* an error: `systemctl` exits non-zero for
/// `degraded` and `inactive`, and the text is what matters. `Err` means the
/// command could not be run at all (binary missing, pipe failure, ...).
pub trait ControlCommand {
    fn run(&self, args: &[&str]) -> io::Result<String>;
}

impl<C: ControlCommand + ?Sized> ControlCommand for &C {
    fn run(&self, args: &[&str]) -> io::Result<String> {
        (**self).run(args)
    }
}

/// Spawns the real control binary (`systemctl` by default).
#[derive(Debug, Clone)]
pub struct Systemctl {
    program: OsString,
}

impl Default for Systemctl {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CONTROL_PROGRAM)
    }
}

impl Systemctl {
    pub fn new<S: Into<OsString>>(program: S) -> Self {
        Systemctl { program: program.into() }
    }
}

impl ControlCommand for Systemctl {
    // TODO: bound the query with a timeout once a sensible budget is agreed;
    // a wedged systemctl currently blocks startup.
    fn run(&self, args: &[&str]) -> io::Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()?;

        tracing::trace!(
            program = ?self.program,
            ?args,
            status = %output.status,
            "control command finished"
        );

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
