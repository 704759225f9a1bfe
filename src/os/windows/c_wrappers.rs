use {
    super::{init, last_wsa_error, NativeSocket},
    crate::misc::{retry_interrupted, sockaddr_to_std},
    socket2::SockAddr,
    std::{
        io,
        mem::size_of,
        net::{Shutdown, SocketAddr},
        ptr,
        time::Duration,
    },
    windows_sys::Win32::Networking::WinSock::{self, SOCKET, SOCKET_ERROR},
};

macro_rules! ok_or_wsa {
    ($success:expr => $($scb:tt)+) => {
        if $success {
            Ok($($scb)+)
        } else {
            Err(last_wsa_error())
        }
    };
}

#[inline(always)]
fn raw(s: NativeSocket) -> SOCKET { s as SOCKET }

fn clamp_len(len: usize) -> i32 { i32::try_from(len).unwrap_or(i32::MAX) }

pub(crate) fn socket(family: i32, ty: i32, proto: i32) -> io::Result<NativeSocket> {
    init()?;
    let s = unsafe {
        WinSock::WSASocketW(
            family as _,
            ty as _,
            proto as _,
            ptr::null(),
            0,
            WinSock::WSA_FLAG_NO_HANDLE_INHERIT as _,
        )
    };
    ok_or_wsa!(s != WinSock::INVALID_SOCKET => s as NativeSocket)
}

fn setsockopt<T>(s: NativeSocket, level: i32, name: i32, val: &T) -> io::Result<()> {
    let success = unsafe {
        WinSock::setsockopt(
            raw(s),
            level as _,
            name as _,
            ptr::addr_of!(*val).cast(),
            size_of::<T>() as i32,
        ) != SOCKET_ERROR
    };
    ok_or_wsa!(success => ())
}

fn getsockopt_int(s: NativeSocket, level: i32, name: i32) -> io::Result<i32> {
    let mut val: i32 = 0;
    let mut len = size_of::<i32>() as i32;
    let success = unsafe {
        WinSock::getsockopt(raw(s), level, name, ptr::addr_of_mut!(val).cast(), &mut len)
            != SOCKET_ERROR
    };
    ok_or_wsa!(success => val)
}

pub(crate) fn is_listening(s: NativeSocket) -> io::Result<bool> {
    Ok(getsockopt_int(s, WinSock::SOL_SOCKET as _, WinSock::SO_ACCEPTCONN as _)? != 0)
}

pub(crate) fn set_reuseaddr(s: NativeSocket) -> io::Result<()> {
    setsockopt(s, WinSock::SOL_SOCKET as _, WinSock::SO_REUSEADDR as _, &1_i32)
}

pub(crate) fn close(s: NativeSocket) -> io::Result<()> {
    let success = unsafe { WinSock::closesocket(raw(s)) != SOCKET_ERROR };
    ok_or_wsa!(success => ())
}

pub(crate) fn bind(s: NativeSocket, addr: &SocketAddr) -> io::Result<()> {
    let addr = SockAddr::from(*addr);
    let success =
        unsafe { WinSock::bind(raw(s), addr.as_ptr().cast(), addr.len()) != SOCKET_ERROR };
    ok_or_wsa!(success => ())
}

pub(crate) fn connect(s: NativeSocket, addr: &SocketAddr) -> io::Result<()> {
    let addr = SockAddr::from(*addr);
    let success =
        unsafe { WinSock::connect(raw(s), addr.as_ptr().cast(), addr.len()) != SOCKET_ERROR };
    ok_or_wsa!(success => ())
}

pub(crate) fn listen(s: NativeSocket, backlog: i32) -> io::Result<()> {
    let success = unsafe { WinSock::listen(raw(s), backlog) != SOCKET_ERROR };
    ok_or_wsa!(success => ())
}

pub(crate) fn accept(s: NativeSocket) -> io::Result<(NativeSocket, SocketAddr)> {
    // SAFETY: accept writes at most `len` bytes of address into the storage
    let (new_s, addr) = unsafe {
        SockAddr::try_init(|storage, len| {
            let storage = storage.cast::<WinSock::SOCKADDR>();
            retry_interrupted(|| {
                let new_s = WinSock::accept(raw(s), storage, len);
                ok_or_wsa!(new_s != WinSock::INVALID_SOCKET => new_s as NativeSocket)
            })
        })
    }?;
    match sockaddr_to_std(&addr) {
        Ok(peer) => Ok((new_s, peer)),
        Err(e) => {
            let _ = close(new_s);
            Err(e)
        }
    }
}

fn int_to_result(ret: i32) -> io::Result<usize> {
    ok_or_wsa!(ret != SOCKET_ERROR => ret as usize)
}

pub(crate) fn send(s: NativeSocket, buf: &[u8]) -> io::Result<usize> {
    retry_interrupted(|| {
        let ret = unsafe { WinSock::send(raw(s), buf.as_ptr(), clamp_len(buf.len()), 0) };
        int_to_result(ret)
    })
}

pub(crate) fn send_to(s: NativeSocket, buf: &[u8], addr: &SocketAddr) -> io::Result<usize> {
    let addr = SockAddr::from(*addr);
    retry_interrupted(|| {
        let ret = unsafe {
            WinSock::sendto(
                raw(s),
                buf.as_ptr(),
                clamp_len(buf.len()),
                0,
                addr.as_ptr().cast(),
                addr.len(),
            )
        };
        int_to_result(ret)
    })
}

pub(crate) fn recv(s: NativeSocket, buf: &mut [u8]) -> io::Result<usize> {
    retry_interrupted(|| {
        let ret = unsafe { WinSock::recv(raw(s), buf.as_mut_ptr(), clamp_len(buf.len()), 0) };
        int_to_result(ret)
    })
}

pub(crate) fn recv_from(s: NativeSocket, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
    // SAFETY: recvfrom writes at most `len` bytes of address into the storage
    let (n, addr) = unsafe {
        SockAddr::try_init(|storage, len| {
            let storage = storage.cast::<WinSock::SOCKADDR>();
            retry_interrupted(|| {
                let len_buf = clamp_len(buf.len());
                let ret = WinSock::recvfrom(raw(s), buf.as_mut_ptr(), len_buf, 0, storage, len);
                int_to_result(ret)
            })
        })
    }?;
    Ok((n, sockaddr_to_std(&addr)?))
}

pub(crate) fn shutdown(s: NativeSocket, how: Shutdown) -> io::Result<()> {
    let how = match how {
        Shutdown::Read => WinSock::SD_RECEIVE,
        Shutdown::Write => WinSock::SD_SEND,
        Shutdown::Both => WinSock::SD_BOTH,
    };
    let success = unsafe { WinSock::shutdown(raw(s), how as _) != SOCKET_ERROR };
    ok_or_wsa!(success => ())
}

pub(crate) fn set_nonblocking(s: NativeSocket, nonblocking: bool) -> io::Result<()> {
    let mut arg = u32::from(nonblocking);
    let success =
        unsafe { WinSock::ioctlsocket(raw(s), WinSock::FIONBIO as _, &mut arg) != SOCKET_ERROR };
    ok_or_wsa!(success => ())
}

pub(crate) fn set_timeout(s: NativeSocket, timeout: Duration) -> io::Result<()> {
    let mut ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
    if ms == 0 && !timeout.is_zero() {
        ms = 1;
    }
    setsockopt(s, WinSock::SOL_SOCKET as _, WinSock::SO_SNDTIMEO as _, &ms)?;
    setsockopt(s, WinSock::SOL_SOCKET as _, WinSock::SO_RCVTIMEO as _, &ms)
}

pub(crate) fn local_addr(s: NativeSocket) -> io::Result<SocketAddr> {
    // SAFETY: getsockname writes at most `len` bytes of address into the storage
    let ((), addr) = unsafe {
        SockAddr::try_init(|storage, len| {
            let success = WinSock::getsockname(raw(s), storage.cast(), len) != SOCKET_ERROR;
            ok_or_wsa!(success => ())
        })
    }?;
    sockaddr_to_std(&addr)
}

/// Waits for at most `timeout` until the socket has data to read or a connection to accept.
pub(crate) fn poll_readable(s: NativeSocket, timeout: Duration) -> io::Result<bool> {
    let mut pfd = WinSock::WSAPOLLFD {
        fd: raw(s),
        events: WinSock::POLLRDNORM as _,
        revents: 0,
    };
    let ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    let ret = unsafe { WinSock::WSAPoll(&mut pfd, 1, ms) };
    match ret {
        SOCKET_ERROR => Err(last_wsa_error()),
        0 => Ok(false),
        _ if pfd.revents & (WinSock::POLLNVAL as i16) != 0 => Err(io::Error::from_raw_os_error(
            WinSock::WSAENOTSOCK as i32,
        )),
        _ => Ok(true),
    }
}
