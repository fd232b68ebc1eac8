use crate::error::{LifecycleError, LifecycleResult};
use std::mem;
use std::os::fd::RawFd;

/// Address family of an inherited listening socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SocketFamily {
    Inet,
    Unix,
}

/// Checks that `fd` is a listening socket we know how to wrap.
///
/// Nothing about the descriptor is changed, so a rejected descriptor stays
/// exactly as the service manager passed it.
pub(crate) fn inspect_listener(fd: RawFd) -> LifecycleResult<SocketFamily> {
    if !is_socket(fd)? {
        return Err(LifecycleError::NotASocket { fd });
    }
    if !is_listening(fd)? {
        return Err(LifecycleError::NotListening { fd });
    }

    let family = socket_family(fd)?;
    match family {
        libc::AF_INET | libc::AF_INET6 => Ok(SocketFamily::Inet),
        libc::AF_UNIX => Ok(SocketFamily::Unix),
        _ => Err(LifecycleError::UnsupportedFamily { fd, family }),
    }
}

fn is_socket(fd: RawFd) -> LifecycleResult<bool> {
    let mut stat: libc::stat = unsafe { mem::zeroed() };
    if unsafe { libc::fstat(fd, &mut stat) } < 0 {
        return Err(LifecycleError::last_syscall("fstat"));
    }
    Ok(stat.st_mode & libc::S_IFMT == libc::S_IFSOCK)
}

fn is_listening(fd: RawFd) -> LifecycleResult<bool> {
    let mut accepting: libc::c_int = 0;
    let mut len = mem::size_of::<libc::c_int>() as libc::socklen_t;
    let rc = unsafe {
        libc::getsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_ACCEPTCONN,
            (&mut accepting as *mut libc::c_int).cast::<libc::c_void>(),
            &mut len,
        )
    };
    if rc < 0 {
        return Err(LifecycleError::last_syscall("getsockopt"));
    }
    Ok(accepting != 0)
}

fn socket_family(fd: RawFd) -> LifecycleResult<libc::c_int> {
    let mut storage: libc::sockaddr_storage = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
    let rc = unsafe {
        libc::getsockname(
            fd,
            (&mut storage as *mut libc::sockaddr_storage).cast::<libc::sockaddr>(),
            &mut len,
        )
    };
    if rc < 0 {
        return Err(LifecycleError::last_syscall("getsockname"));
    }
    Ok(libc::c_int::from(storage.ss_family))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream, UdpSocket};
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixListener;

    #[test]
    fn tcp_listener_is_inet() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        assert_eq!(inspect_listener(listener.as_raw_fd()).unwrap(), SocketFamily::Inet);
    }

    #[test]
    fn unix_listener_is_unix() {
        let dir = tempfile::tempdir().unwrap();
        let listener = UnixListener::bind(dir.path().join("sock")).unwrap();
        assert_eq!(inspect_listener(listener.as_raw_fd()).unwrap(), SocketFamily::Unix);
    }

    #[test]
    fn regular_file_is_not_a_socket() {
        let file = tempfile::tempfile().unwrap();
        let fd = file.as_raw_fd();
        assert!(matches!(inspect_listener(fd), Err(LifecycleError::NotASocket { fd: f }) if f == fd));
    }

    #[test]
    fn connected_stream_is_not_listening() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let stream = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let fd = stream.as_raw_fd();
        assert!(matches!(inspect_listener(fd), Err(LifecycleError::NotListening { .. })));
    }

    #[test]
    fn datagram_socket_is_not_listening() {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        assert!(matches!(
            inspect_listener(socket.as_raw_fd()),
            Err(LifecycleError::NotListening { .. })
        ));
    }
}
