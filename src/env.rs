use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
#[cfg(unix)]
use std::io;
#[cfg(unix)]
use std::os::fd::RawFd;
#[cfg(unix)]
use std::sync::OnceLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SD_LISTEN_FDS_START;

/// Set once the process has taken over its inherited listener.
static PROCESS_LISTENER_CLAIMED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
static PROCESS_LISTEN_FDS: OnceLock<Vec<(RawFd, String)>> = OnceLock::new();

/// Read access to the handshake the service manager hands down.
///
/// The process environment is the handshake channel between the supervisor
/// and the daemon. Every lookup in this crate goes through this trait so the
/// handshake can be replayed in tests without touching the real environment.
pub trait Environment {
    /// Returns the raw value of `key`, or `None` if it is unset.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Descriptors passed by socket activation, with their `LISTEN_FDNAMES`
    /// entry. Empty when the handshake is missing or meant for another process.
    #[cfg(unix)]
    fn listen_fds(&self) -> io::Result<Vec<(RawFd, String)>>;

    /// Claims the right to own the inherited listener. Returns `true` exactly
    /// once per handshake.
    fn claim_listener(&self) -> bool;

    /// Gives the claim back after a descriptor turned out to be unusable.
    fn release_listener(&self);

    /// Returns the value of `key`, or `None` if it is unset or not valid UTF-8.
    fn var(&self, key: &str) -> Option<String> {
        self.var_os(key).and_then(|v| v.into_string().ok())
    }

    /// `true` if `key` is set to something non-empty, UTF-8 or not.
    fn is_set(&self, key: &str) -> bool {
        self.var_os(key).is_some_and(|v| !v.is_empty())
    }
}

impl<E: Environment + ?Sized> Environment for &E {
    fn var_os(&self, key: &str) -> Option<OsString> {
        (**self).var_os(key)
    }

    #[cfg(unix)]
    fn listen_fds(&self) -> io::Result<Vec<(RawFd, String)>> {
        (**self).listen_fds()
    }

    fn claim_listener(&self) -> bool {
        (**self).claim_listener()
    }

    fn release_listener(&self) {
        (**self).release_listener()
    }
}

/// The environment of the running process.
///
/// The process has a single handshake, so the listener claim is process-wide.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        std::env::var_os(key)
    }

    // The handshake is read once: later calls must not touch descriptors the
    // caller may already have closed.
    #[cfg(unix)]
    fn listen_fds(&self) -> io::Result<Vec<(RawFd, String)>> {
        if let Some(fds) = PROCESS_LISTEN_FDS.get() {
            return Ok(fds.clone());
        }
        // `false`: LISTEN_* stay set so `is_socket_activated` keeps answering the same.
        let fds: Vec<_> = sd_notify::listen_fds_with_names(false)?.collect();
        Ok(PROCESS_LISTEN_FDS.get_or_init(|| fds).clone())
    }

    fn claim_listener(&self) -> bool {
        !PROCESS_LISTENER_CLAIMED.swap(true, Ordering::AcqRel)
    }

    fn release_listener(&self) {
        PROCESS_LISTENER_CLAIMED.store(false, Ordering::Release);
    }
}

/// A fixed set of variables, built up front.
///
/// Descriptors are announced the way the service manager does it, starting
/// at [`SD_LISTEN_FDS_START`] unless moved with
/// [`listen_fds_start`](Self::listen_fds_start). Clones share one listener
/// claim.
///
/// ```
/// use lifecycle_forge::{Environment, StaticEnv};
///
/// let env = StaticEnv::new().set("LISTEN_FDS", "1");
/// assert_eq!(env.var("LISTEN_FDS").as_deref(), Some("1"));
/// assert!(env.var("LISTEN_PID").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct StaticEnv {
    vars: HashMap<String, OsString>,
    first_fd: i32,
    claimed: Arc<AtomicBool>,
}

impl Default for StaticEnv {
    fn default() -> Self {
        StaticEnv {
            vars: HashMap::new(),
            first_fd: SD_LISTEN_FDS_START,
            claimed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl StaticEnv {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or overwrites a variable.
    pub fn set<V: AsRef<OsStr>>(mut self, key: &str, value: V) -> Self {
        self.vars.insert(key.to_owned(), value.as_ref().to_owned());
        self
    }

    /// Sets the number of the first announced descriptor.
    ///
    /// Lets a harness hand over a socket it bound itself, whatever number
    /// the kernel gave it.
    pub fn listen_fds_start(mut self, fd: i32) -> Self {
        self.first_fd = fd;
        self
    }
}

impl Environment for StaticEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    // Same rules as `sd_listen_fds(3)`, which `sd-notify` only applies to the
    // real process environment.
    #[cfg(unix)]
    fn listen_fds(&self) -> io::Result<Vec<(RawFd, String)>> {
        let invalid = |what: &str| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid {what}"));

        let Some(pid) = self.var("LISTEN_PID") else {
            return Ok(Vec::new());
        };
        if pid.parse::<u32>().map_err(|_| invalid("LISTEN_PID"))? != std::process::id() {
            return Ok(Vec::new());
        }
        let Some(count) = self.var("LISTEN_FDS") else {
            return Ok(Vec::new());
        };
        let count = count.parse::<i32>().ok().filter(|c| *c >= 0).ok_or_else(|| invalid("LISTEN_FDS"))?;

        let names: Vec<String> = self
            .var("LISTEN_FDNAMES")
            .map(|n| n.split(':').map(str::to_owned).collect())
            .unwrap_or_default();
        Ok((0..count)
            .map(|i| {
                let name = names.get(i as usize).cloned().unwrap_or_else(|| "unknown".to_owned());
                (self.first_fd + i, name)
            })
            .collect())
    }

    fn claim_listener(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }

    fn release_listener(&self) {
        self.claimed.store(false, Ordering::Release);
    }
}
