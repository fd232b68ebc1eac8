//! Socket activation: adopting a listening socket opened by the service manager.
//!
//! The manager passes sockets as consecutive descriptors starting at
//! `SD_LISTEN_FDS_START` and announces them with `LISTEN_FDS` (count) and
//! `LISTEN_PID` (intended receiver). The variables are never unset here, so
//! [`ActivationSocketResolver::is_socket_activated`] gives the same answer for
//! the whole life of the process. Because they stay set, the listener is
//! claimed the first time it is adopted and later attempts fail with
//! [`LifecycleError::AlreadyAdopted`] instead of creating a second owner.

use std::io;
use std::os::fd::RawFd;

use tracing::{debug, info};

use crate::env::{Environment, ProcessEnv};
use crate::error::{LifecycleError, LifecycleResult};
use crate::listener::InheritedListener;
use crate::sys::unix;
use crate::types::ActivationMode;

pub const LISTEN_FDS: &str = "LISTEN_FDS";
pub const LISTEN_PID: &str = "LISTEN_PID";
pub const LISTEN_FDNAMES: &str = "LISTEN_FDNAMES";

/// Finds the single listening socket handed down by the service manager.
#[derive(Debug, Clone, Default)]
pub struct ActivationSocketResolver<E = ProcessEnv> {
    env: E,
}

impl ActivationSocketResolver<ProcessEnv> {
    /// Resolver reading the real process environment.
    pub fn new() -> Self {
        ActivationSocketResolver { env: ProcessEnv }
    }
}

impl<E: Environment> ActivationSocketResolver<E> {
    /// Reads the handshake from `env` instead of the process.
    pub fn with_env<N: Environment>(self, env: N) -> ActivationSocketResolver<N> {
        ActivationSocketResolver { env }
    }

    /// `true` iff `LISTEN_FDS` is set to a non-empty value.
    pub fn is_socket_activated(&self) -> bool {
        self.env.is_set(LISTEN_FDS)
    }

    pub fn activation_mode(&self) -> ActivationMode {
        if self.is_socket_activated() {
            ActivationMode::SocketActivated
        } else {
            ActivationMode::NotActivated
        }
    }

    /// Number of descriptors passed to *this* process.
    ///
    /// Zero when `LISTEN_PID` is missing or names another process: the
    /// variables were inherited from a parent and are not ours to use.
    pub fn inherited_count(&self) -> LifecycleResult<usize> {
        Ok(self.inherited()?.len())
    }

    /// Returns the inherited listener, if there is exactly one.
    ///
    /// - no socket: `Ok(None)`, the caller binds its own.
    /// - one socket: `Ok(Some(listener))`, owned by the caller from now on.
    /// - more: [`LifecycleError::TooManyListeners`]; the unit file is wrong
    ///   and guessing which socket is meant could serve the wrong protocol.
    /// - one socket, already returned by an earlier call:
    ///   [`LifecycleError::AlreadyAdopted`]. Not `Ok(None)`, which would tell
    ///   the caller to bind a second socket for the same service.
    ///
    /// Descriptor faults are returned as errors and are not worth retrying.
    pub fn resolve_listener(&self) -> LifecycleResult<Option<InheritedListener>> {
        let fds = self.inherited()?;
        match fds.as_slice() {
            [] => {
                debug!("no sockets inherited from the service manager");
                Ok(None)
            }
            [(fd, name)] => self.adopt(*fd, name).map(Some),
            _ => Err(LifecycleError::TooManyListeners { count: fds.len() }),
        }
    }

    fn inherited(&self) -> LifecycleResult<Vec<(RawFd, String)>> {
        self.env.listen_fds().map_err(|err| match err.kind() {
            io::ErrorKind::InvalidInput => LifecycleError::InvalidHandshake(err),
            _ => LifecycleError::Io(err),
        })
    }

    fn adopt(&self, fd: RawFd, name: &str) -> LifecycleResult<InheritedListener> {
        if !self.env.claim_listener() {
            return Err(LifecycleError::AlreadyAdopted { fd });
        }
        let family = match unix::inspect_listener(fd) {
            Ok(family) => family,
            Err(err) => {
                self.env.release_listener();
                return Err(err);
            }
        };
        // The manager opened `fd` for us and the claim makes us its only owner.
        let listener = unsafe { InheritedListener::from_inherited(fd, family) };
        info!(fd, name, listener = %listener, "using socket passed by the service manager");
        Ok(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticEnv;
    use crate::listener::ListenerKind;
    use rstest::rstest;
    use std::net::TcpListener;
    use std::os::fd::{AsRawFd, IntoRawFd};
    use std::os::unix::net::UnixListener;

    fn own_pid() -> String {
        std::process::id().to_string()
    }

    fn resolver(env: StaticEnv) -> ActivationSocketResolver<StaticEnv> {
        ActivationSocketResolver::new().with_env(env)
    }

    fn handing_over(fd: RawFd) -> StaticEnv {
        StaticEnv::new()
            .set(LISTEN_PID, own_pid())
            .set(LISTEN_FDS, "1")
            .listen_fds_start(fd)
    }

    #[rstest]
    #[case(StaticEnv::new(), false)]
    #[case(StaticEnv::new().set(LISTEN_FDS, ""), false)]
    #[case(StaticEnv::new().set(LISTEN_FDS, "1"), true)]
    #[case(StaticEnv::new().set(LISTEN_FDS, "garbage"), true)]
    fn activation_follows_listen_fds(#[case] env: StaticEnv, #[case] activated: bool) {
        let resolver = resolver(env);
        assert_eq!(resolver.is_socket_activated(), activated);
        let expected = if activated { ActivationMode::SocketActivated } else { ActivationMode::NotActivated };
        assert_eq!(resolver.activation_mode(), expected);
    }

    #[test]
    fn non_utf8_listen_fds_still_counts_as_activated() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let env = StaticEnv::new().set(LISTEN_FDS, OsStr::from_bytes(b"\xff\xfe"));
        assert!(resolver(env).is_socket_activated());
    }

    #[test]
    fn nothing_inherited_without_variables() {
        assert!(resolver(StaticEnv::new()).resolve_listener().unwrap().is_none());
    }

    #[test]
    fn zero_descriptors_is_not_activated() {
        let env = StaticEnv::new().set(LISTEN_PID, own_pid()).set(LISTEN_FDS, "0");
        assert!(resolver(env).resolve_listener().unwrap().is_none());
    }

    #[rstest]
    #[case(None)]
    #[case(Some("1"))]
    fn foreign_listen_pid_is_ignored(#[case] pid: Option<&str>) {
        let mut env = StaticEnv::new().set(LISTEN_FDS, "2");
        if let Some(pid) = pid {
            env = env.set(LISTEN_PID, pid);
        }
        let resolver = resolver(env);
        assert_eq!(resolver.inherited_count().unwrap(), 0);
        assert!(resolver.resolve_listener().unwrap().is_none());
        assert!(resolver.is_socket_activated());
    }

    #[rstest]
    #[case("2", 2)]
    #[case("5", 5)]
    fn several_descriptors_are_a_configuration_error(#[case] fds: &str, #[case] count: usize) {
        let env = StaticEnv::new().set(LISTEN_PID, own_pid()).set(LISTEN_FDS, fds);
        let err = resolver(env).resolve_listener().unwrap_err();
        assert!(matches!(err, LifecycleError::TooManyListeners { count: c } if c == count));
        assert!(err.is_configuration_error());
    }

    #[rstest]
    #[case("many")]
    #[case("-1")]
    fn malformed_count_is_rejected(#[case] fds: &str) {
        let env = StaticEnv::new().set(LISTEN_PID, own_pid()).set(LISTEN_FDS, fds);
        let err = resolver(env).resolve_listener().unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidHandshake(_)));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn single_tcp_descriptor_is_adopted() {
        let bound = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = bound.local_addr().unwrap();
        let fd = bound.into_raw_fd();
        let resolver = resolver(handing_over(fd).set(LISTEN_FDNAMES, "http"));

        let listener = resolver.resolve_listener().unwrap().expect("one inherited listener");
        assert_eq!(listener.kind(), ListenerKind::Tcp);
        assert_eq!(listener.as_raw_fd(), fd);
        assert_eq!(listener.into_tcp().unwrap().local_addr().unwrap(), addr);
        assert!(resolver.is_socket_activated());
    }

    #[test]
    fn single_unix_descriptor_is_adopted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.sock");
        let fd = UnixListener::bind(&path).unwrap().into_raw_fd();
        let resolver = resolver(handing_over(fd));

        let listener = resolver.resolve_listener().unwrap().expect("one inherited listener");
        assert_eq!(listener.kind(), ListenerKind::Unix);
        assert_eq!(listener.as_raw_fd(), fd);
        let unix = listener.into_unix().unwrap();
        assert_eq!(unix.local_addr().unwrap().as_pathname(), Some(path.as_path()));
    }

    #[test]
    fn second_resolution_does_not_create_another_owner() {
        let fd = TcpListener::bind("127.0.0.1:0").unwrap().into_raw_fd();
        let resolver = resolver(handing_over(fd));

        let first = resolver.resolve_listener().unwrap().expect("one inherited listener");
        let err = resolver.resolve_listener().unwrap_err();
        assert!(matches!(err, LifecycleError::AlreadyAdopted { fd: f } if f == fd));

        // Still refused once the descriptor number is free for reuse.
        drop(first);
        let err = resolver.clone().resolve_listener().unwrap_err();
        assert!(matches!(err, LifecycleError::AlreadyAdopted { .. }));
        assert!(resolver.is_socket_activated());
    }

    #[test]
    fn non_socket_descriptor_is_left_alone() {
        let file = tempfile::tempfile().unwrap();
        let resolver = resolver(handing_over(file.as_raw_fd()));

        let err = resolver.resolve_listener().unwrap_err();
        assert!(matches!(err, LifecycleError::NotASocket { .. }));
        assert!(!err.is_configuration_error());
        // The claim was given back, so the same fault is reported again.
        let err = resolver.resolve_listener().unwrap_err();
        assert!(matches!(err, LifecycleError::NotASocket { .. }));
        // still open and usable
        assert!(file.metadata().is_ok());
    }
}
