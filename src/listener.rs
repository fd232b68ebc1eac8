use std::fmt;
use std::io;
use std::net::TcpListener;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, RawFd};
use std::os::unix::net::UnixListener;

use crate::sys::unix::SocketFamily;

/// Address family of an [`InheritedListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Tcp,
    Unix,
}

/// A listening socket the service manager opened on our behalf.
///
/// The value owns the descriptor: dropping it closes the socket. Nothing else
/// in the crate keeps a copy, so the caller is free to move it to whatever
/// thread or runtime serves connections.
#[derive(Debug)]
pub enum InheritedListener {
    Tcp(TcpListener),
    Unix(UnixListener),
}

impl InheritedListener {
    /// Takes ownership of an inherited descriptor.
    ///
    /// # Safety
    /// `fd` must be an open listening socket of the given family that nothing
    /// else in the process owns or will close.
    pub(crate) unsafe fn from_inherited(fd: RawFd, family: SocketFamily) -> Self {
        match family {
            SocketFamily::Inet => InheritedListener::Tcp(unsafe { TcpListener::from_raw_fd(fd) }),
            SocketFamily::Unix => InheritedListener::Unix(unsafe { UnixListener::from_raw_fd(fd) }),
        }
    }

    pub fn kind(&self) -> ListenerKind {
        match self {
            InheritedListener::Tcp(_) => ListenerKind::Tcp,
            InheritedListener::Unix(_) => ListenerKind::Unix,
        }
    }

    /// Moves the socket in or out of non-blocking mode, as async runtimes require.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            InheritedListener::Tcp(l) => l.set_nonblocking(nonblocking),
            InheritedListener::Unix(l) => l.set_nonblocking(nonblocking),
        }
    }

    pub fn into_tcp(self) -> Option<TcpListener> {
        match self {
            InheritedListener::Tcp(l) => Some(l),
            InheritedListener::Unix(_) => None,
        }
    }

    pub fn into_unix(self) -> Option<UnixListener> {
        match self {
            InheritedListener::Unix(l) => Some(l),
            InheritedListener::Tcp(_) => None,
        }
    }
}

impl fmt::Display for InheritedListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InheritedListener::Tcp(l) => match l.local_addr() {
                Ok(addr) => write!(f, "tcp {addr}"),
                Err(_) => f.write_str("tcp (unknown address)"),
            },
            InheritedListener::Unix(l) => {
                match l.local_addr().ok().and_then(|a| a.as_pathname().map(|p| p.to_path_buf())) {
                    Some(path) => write!(f, "unix {}", path.display()),
                    None => f.write_str("unix (unnamed)"),
                }
            }
        }
    }
}

impl AsRawFd for InheritedListener {
    fn as_raw_fd(&self) -> RawFd {
        match self {
            InheritedListener::Tcp(l) => l.as_raw_fd(),
            InheritedListener::Unix(l) => l.as_raw_fd(),
        }
    }
}

impl AsFd for InheritedListener {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            InheritedListener::Tcp(l) => l.as_fd(),
            InheritedListener::Unix(l) => l.as_fd(),
        }
    }
}

impl IntoRawFd for InheritedListener {
    fn into_raw_fd(self) -> RawFd {
        match self {
            InheritedListener::Tcp(l) => l.into_raw_fd(),
            InheritedListener::Unix(l) => l.into_raw_fd(),
        }
    }
}

impl From<TcpListener> for InheritedListener {
    fn from(l: TcpListener) -> Self {
        InheritedListener::Tcp(l)
    }
}

impl From<UnixListener> for InheritedListener {
    fn from(l: UnixListener) -> Self {
        InheritedListener::Unix(l)
    }
}
