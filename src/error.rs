use std::io;

/// Custom error type for LifecycleForge.
/// Every variant is something the hosting service must react to at startup;
/// expected absences (no supervisor, no inherited socket) are never errors.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Standard IO errors (descriptor inspection, subprocess plumbing, etc.)
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    /// More than one socket was passed down. The unit file is misconfigured.
    #[error("Too many listeners passed from the service manager ({count}), expected at most one")]
    TooManyListeners { count: usize },
    /// `LISTEN_PID` or `LISTEN_FDS` is set but unparsable.
    #[error("Invalid socket activation variables: {0}")]
    InvalidHandshake(io::Error),
    /// The inherited listener was already handed out earlier in this process.
    #[error("Inherited socket {fd} was already adopted")]
    AlreadyAdopted { fd: i32 },
    /// The inherited descriptor is not a socket.
    #[error("Inherited descriptor {fd} is not a socket")]
    NotASocket { fd: i32 },
    /// The inherited socket was never put into listening state.
    #[error("Inherited socket {fd} is not listening")]
    NotListening { fd: i32 },
    /// The inherited socket is neither an IP nor a Unix domain socket.
    #[error("Inherited socket {fd} has unsupported address family {family}")]
    UnsupportedFamily { fd: i32, family: i32 },
    /// (Unix) Specific system call failure (fstat, getsockopt, getsockname).
    #[error("Syscall '{call}' failed with errno {errno}")]
    SyscallError { call: &'static str, errno: i32 },
}

impl LifecycleError {
    /// `true` when the error points at a malformed service unit rather than
    /// a runtime fault. Startup must be aborted either way.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LifecycleError::TooManyListeners { .. } | LifecycleError::InvalidHandshake(_)
        )
    }

    #[cfg(unix)]
    pub(crate) fn last_syscall(call: &'static str) -> Self {
        LifecycleError::SyscallError {
            call,
            errno: io::Error::last_os_error().raw_os_error().unwrap_or(0),
        }
    }
}

/// A specialized Result type for LifecycleForge operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
