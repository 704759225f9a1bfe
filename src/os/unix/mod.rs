//! BSD socket backend.

pub(crate) mod c_wrappers;

use std::{os::unix::io::RawFd, sync::atomic::AtomicI32};

/// The native descriptor type, a plain file descriptor.
pub type NativeSocket = RawFd;
pub(crate) type AtomicNativeSocket = AtomicI32;
pub(crate) const INVALID_SOCKET: NativeSocket = -1;

pub(crate) const AF_UNSPEC: i32 = libc::AF_UNSPEC;
pub(crate) const AF_INET: i32 = libc::AF_INET;
pub(crate) const AF_INET6: i32 = libc::AF_INET6;
pub(crate) const SOCK_STREAM: i32 = libc::SOCK_STREAM;
pub(crate) const SOCK_DGRAM: i32 = libc::SOCK_DGRAM;
pub(crate) const IPPROTO_TCP: i32 = libc::IPPROTO_TCP;
pub(crate) const IPPROTO_UDP: i32 = libc::IPPROTO_UDP;
pub(crate) const SOMAXCONN: i32 = libc::SOMAXCONN;

/// Whether the error was produced by a socket timeout or by the nonblocking mode, as opposed to
/// an actual failure.
pub(crate) fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(c) if c == libc::EAGAIN
            || c == libc::EWOULDBLOCK
            || c == libc::ETIMEDOUT
            || c == libc::EINPROGRESS
    )
}

/// Whether `accept` failed because the socket cannot accept connections at all, such as when it
/// is not listening or not a socket.
pub(crate) fn is_fatal_accept(e: &std::io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(c) if c == libc::EINVAL
            || c == libc::ENOTSOCK
            || c == libc::EBADF
            || c == libc::EOPNOTSUPP
    )
}
