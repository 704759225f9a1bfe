//! WinSock backend.
#![cfg_attr(not(windows), allow(warnings))]

pub(crate) mod c_wrappers;

use {
    std::{
        io,
        os::windows::io::RawSocket,
        sync::{atomic::AtomicU64, OnceLock},
    },
    windows_sys::Win32::Networking::WinSock,
};

/// The native descriptor type, a WinSock `SOCKET` widened to the width of [`RawSocket`].
pub type NativeSocket = RawSocket;
pub(crate) type AtomicNativeSocket = AtomicU64;
pub(crate) const INVALID_SOCKET: NativeSocket = WinSock::INVALID_SOCKET as NativeSocket;

pub(crate) const AF_UNSPEC: i32 = WinSock::AF_UNSPEC as i32;
pub(crate) const AF_INET: i32 = WinSock::AF_INET as i32;
pub(crate) const AF_INET6: i32 = WinSock::AF_INET6 as i32;
pub(crate) const SOCK_STREAM: i32 = WinSock::SOCK_STREAM as i32;
pub(crate) const SOCK_DGRAM: i32 = WinSock::SOCK_DGRAM as i32;
pub(crate) const IPPROTO_TCP: i32 = WinSock::IPPROTO_TCP as i32;
pub(crate) const IPPROTO_UDP: i32 = WinSock::IPPROTO_UDP as i32;
pub(crate) const SOMAXCONN: i32 = WinSock::SOMAXCONN as i32;

/// Whether the error was produced by a socket timeout or by the nonblocking mode, as opposed to
/// an actual failure.
pub(crate) fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(c) if c == WinSock::WSAEWOULDBLOCK as i32 || c == WinSock::WSAETIMEDOUT as i32
    )
}

/// Whether `accept` failed because the socket cannot accept connections at all, such as when it
/// is not listening or not a socket.
pub(crate) fn is_fatal_accept(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(c) if c == WinSock::WSAEINVAL as i32
            || c == WinSock::WSAENOTSOCK as i32
            || c == WinSock::WSAEOPNOTSUPP as i32
    )
}

#[inline]
pub(crate) fn last_wsa_error() -> io::Error {
    io::Error::from_raw_os_error(unsafe { WinSock::WSAGetLastError() } as i32)
}

/// Performs `WSAStartup` once per process. The matching `WSACleanup` is left to process exit,
/// since sockets may be alive in detached threads until the very end.
pub(crate) fn init() -> io::Result<()> {
    static STARTUP: OnceLock<i32> = OnceLock::new();
    let rc = *STARTUP.get_or_init(|| {
        // SAFETY: WSADATA is plain data for which all-zero is valid
        let mut data: WinSock::WSADATA = unsafe { std::mem::zeroed() };
        let rc = unsafe { WinSock::WSAStartup(0x202, &mut data) };
        if rc == 0 {
            tracing::debug!("WinSock 2.2 initialized");
        }
        rc as i32
    });
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::from_raw_os_error(rc))
    }
}
