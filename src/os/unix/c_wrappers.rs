use {
    super::NativeSocket,
    crate::misc::{retry_interrupted, sockaddr_to_std},
    libc::{c_int, c_void, socklen_t},
    socket2::SockAddr,
    std::{
        io,
        mem::size_of,
        net::{Shutdown, SocketAddr},
        ptr,
        time::Duration,
    },
};

pub(crate) fn socket(family: c_int, ty: c_int, proto: c_int) -> io::Result<NativeSocket> {
    #[allow(unused_mut, clippy::let_and_return)]
    let ty = {
        let mut ty = ty;
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            ty |= libc::SOCK_CLOEXEC;
        }
        ty
    };
    let fd = unsafe { libc::socket(family, ty, proto) };
    let fd = ok_or_errno!(fd != -1 => fd)?;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    {
        if let Err(e) = non_linux::set_cloexec(fd) {
            let _ = close(fd);
            return Err(e);
        }
    }
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    {
        if let Err(e) = setsockopt(fd, libc::SOL_SOCKET, libc::SO_NOSIGPIPE, &(1 as c_int)) {
            let _ = close(fd);
            return Err(e);
        }
    }
    Ok(fd)
}

fn setsockopt<T>(fd: NativeSocket, level: c_int, name: c_int, val: &T) -> io::Result<()> {
    let success = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            ptr::addr_of!(*val).cast::<c_void>(),
            size_of::<T>() as socklen_t,
        ) != -1
    };
    ok_or_errno!(success => ())
}

fn getsockopt_int(fd: NativeSocket, level: c_int, name: c_int) -> io::Result<c_int> {
    let mut val: c_int = 0;
    let mut len = size_of::<c_int>() as socklen_t;
    let success = unsafe {
        libc::getsockopt(fd, level, name, ptr::addr_of_mut!(val).cast(), &mut len) != -1
    };
    ok_or_errno!(success => val)
}

pub(crate) fn is_listening(fd: NativeSocket) -> io::Result<bool> {
    Ok(getsockopt_int(fd, libc::SOL_SOCKET, libc::SO_ACCEPTCONN)? != 0)
}

pub(crate) fn set_reuseaddr(fd: NativeSocket) -> io::Result<()> {
    setsockopt(fd, libc::SOL_SOCKET, libc::SO_REUSEADDR, &(1 as c_int))
}

pub(crate) fn close(fd: NativeSocket) -> io::Result<()> {
    let success = unsafe { libc::close(fd) != -1 };
    ok_or_errno!(success => ())
}

pub(crate) fn bind(fd: NativeSocket, addr: &SocketAddr) -> io::Result<()> {
    let addr = SockAddr::from(*addr);
    let success = unsafe { libc::bind(fd, addr.as_ptr().cast(), addr.len()) != -1 };
    ok_or_errno!(success => ())
}

pub(crate) fn connect(fd: NativeSocket, addr: &SocketAddr) -> io::Result<()> {
    let addr = SockAddr::from(*addr);
    let success = unsafe { libc::connect(fd, addr.as_ptr().cast(), addr.len()) != -1 };
    ok_or_errno!(success => ())
}

pub(crate) fn listen(fd: NativeSocket, backlog: c_int) -> io::Result<()> {
    let success = unsafe { libc::listen(fd, backlog) != -1 };
    ok_or_errno!(success => ())
}

pub(crate) fn accept(fd: NativeSocket) -> io::Result<(NativeSocket, SocketAddr)> {
    // SAFETY: accept writes at most `len` bytes of address into the storage
    let (new_fd, addr) = unsafe {
        SockAddr::try_init(|storage, len| {
            let storage = storage.cast::<libc::sockaddr>();
            retry_interrupted(|| {
                #[cfg(any(target_os = "linux", target_os = "android"))]
                let new_fd = libc::accept4(fd, storage, len, libc::SOCK_CLOEXEC);
                #[cfg(not(any(target_os = "linux", target_os = "android")))]
                let new_fd = libc::accept(fd, storage, len);
                ok_or_errno!(new_fd != -1 => new_fd)
            })
        })
    }?;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    {
        if let Err(e) = non_linux::set_cloexec(new_fd) {
            let _ = close(new_fd);
            return Err(e);
        }
    }
    match sockaddr_to_std(&addr) {
        Ok(peer) => Ok((new_fd, peer)),
        Err(e) => {
            let _ = close(new_fd);
            Err(e)
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const SEND_FLAGS: c_int = libc::MSG_NOSIGNAL;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const SEND_FLAGS: c_int = 0;

fn ssize_to_result(ret: isize) -> io::Result<usize> {
    ok_or_errno!(ret >= 0 => ret as usize)
}

pub(crate) fn send(fd: NativeSocket, buf: &[u8]) -> io::Result<usize> {
    retry_interrupted(|| {
        let ret = unsafe { libc::send(fd, buf.as_ptr().cast(), buf.len(), SEND_FLAGS) };
        ssize_to_result(ret)
    })
}

pub(crate) fn send_to(fd: NativeSocket, buf: &[u8], addr: &SocketAddr) -> io::Result<usize> {
    let addr = SockAddr::from(*addr);
    retry_interrupted(|| {
        let ret = unsafe {
            libc::sendto(
                fd,
                buf.as_ptr().cast(),
                buf.len(),
                SEND_FLAGS,
                addr.as_ptr().cast(),
                addr.len(),
            )
        };
        ssize_to_result(ret)
    })
}

pub(crate) fn recv(fd: NativeSocket, buf: &mut [u8]) -> io::Result<usize> {
    retry_interrupted(|| {
        let ret = unsafe { libc::recv(fd, buf.as_mut_ptr().cast(), buf.len(), 0) };
        ssize_to_result(ret)
    })
}

pub(crate) fn recv_from(fd: NativeSocket, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
    // SAFETY: recvfrom writes at most `len` bytes of address into the storage
    let (n, addr) = unsafe {
        SockAddr::try_init(|storage, len| {
            let storage = storage.cast::<libc::sockaddr>();
            retry_interrupted(|| {
                let ret =
                    libc::recvfrom(fd, buf.as_mut_ptr().cast(), buf.len(), 0, storage, len);
                ssize_to_result(ret)
            })
        })
    }?;
    Ok((n, sockaddr_to_std(&addr)?))
}

pub(crate) fn shutdown(fd: NativeSocket, how: Shutdown) -> io::Result<()> {
    let how = match how {
        Shutdown::Read => libc::SHUT_RD,
        Shutdown::Write => libc::SHUT_WR,
        Shutdown::Both => libc::SHUT_RDWR,
    };
    let success = unsafe { libc::shutdown(fd, how) != -1 };
    ok_or_errno!(success => ())
}

pub(crate) fn set_nonblocking(fd: NativeSocket, nonblocking: bool) -> io::Result<()> {
    let old_flags = unsafe {
        // SAFETY: F_GETFL ignores the third argument
        libc::fcntl(fd, libc::F_GETFL, 0)
    };
    let old_flags = ok_or_errno!(old_flags != -1 => old_flags)?;
    let new_flags = if nonblocking {
        old_flags | libc::O_NONBLOCK
    } else {
        old_flags & !libc::O_NONBLOCK
    };
    let success = unsafe { libc::fcntl(fd, libc::F_SETFL, new_flags) != -1 };
    ok_or_errno!(success => ())
}

fn duration_to_timeval(dur: Duration) -> libc::timeval {
    let secs = libc::time_t::try_from(dur.as_secs()).unwrap_or(libc::time_t::MAX);
    let mut usecs = dur.subsec_micros();
    if secs == 0 && usecs == 0 && dur.subsec_nanos() != 0 {
        // Sub-microsecond timeouts would otherwise turn into "no timeout".
        usecs = 1;
    }
    libc::timeval {
        tv_sec: secs,
        tv_usec: usecs as libc::suseconds_t,
    }
}

pub(crate) fn set_timeout(fd: NativeSocket, timeout: Duration) -> io::Result<()> {
    let tv = duration_to_timeval(timeout);
    setsockopt(fd, libc::SOL_SOCKET, libc::SO_SNDTIMEO, &tv)?;
    setsockopt(fd, libc::SOL_SOCKET, libc::SO_RCVTIMEO, &tv)
}

pub(crate) fn local_addr(fd: NativeSocket) -> io::Result<SocketAddr> {
    // SAFETY: getsockname writes at most `len` bytes of address into the storage
    let ((), addr) = unsafe {
        SockAddr::try_init(|storage, len| {
            let success = libc::getsockname(fd, storage.cast(), len) != -1;
            ok_or_errno!(success => ())
        })
    }?;
    sockaddr_to_std(&addr)
}

/// Waits for at most `timeout` until the descriptor has data to read or a connection to accept.
/// Returns `false` if the time ran out or the wait was interrupted.
pub(crate) fn poll_readable(fd: NativeSocket, timeout: Duration) -> io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let ms = c_int::try_from(timeout.as_millis()).unwrap_or(c_int::MAX);
    let ret = unsafe { libc::poll(&mut pfd, 1, ms) };
    match ret {
        -1 => {
            let e = io::Error::last_os_error();
            if e.kind() == io::ErrorKind::Interrupted {
                Ok(false)
            } else {
                Err(e)
            }
        }
        0 => Ok(false),
        _ if pfd.revents & libc::POLLNVAL != 0 => Err(io::Error::from_raw_os_error(libc::EBADF)),
        _ => Ok(true),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
mod non_linux {
    use {super::*, std::io};

    pub(super) fn set_cloexec(fd: NativeSocket) -> io::Result<()> {
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD, 0) };
        let flags = ok_or_errno!(flags != -1 => flags)?;
        let success = unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) != -1 };
        ok_or_errno!(success => ())
    }
}
