use {
    crate::sys,
    socket2::SockAddr,
    std::{io, net::SocketAddr, sync::PoisonError},
};

pub(crate) static LOCK_POISON: &str = "unexpected lock poison";
#[inline]
pub(crate) fn unpoison<T>(e: PoisonError<T>) -> T {
    tracing::warn!("{LOCK_POISON}, continuing with the inner state");
    e.into_inner()
}

/// Splits the timeout class of errors off an I/O result.
///
/// Timeout and would-block conditions turn into `Ok(None)`, everything else is passed through.
pub(crate) trait TimeoutExt {
    type Output;
    fn none_on_timeout(self) -> io::Result<Option<Self::Output>>;
}
impl<T> TimeoutExt for io::Result<T> {
    type Output = T;
    #[inline]
    fn none_on_timeout(self) -> io::Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(e) if sys::is_timeout(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Reruns a system call for as long as it fails with `EINTR`.
#[inline]
pub(crate) fn retry_interrupted<T>(mut f: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match f() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            els => return els,
        }
    }
}

/// Converts an address filled in by the OS, which must be IPv4 or IPv6.
pub(crate) fn sockaddr_to_std(addr: &SockAddr) -> io::Result<SocketAddr> {
    addr.as_socket().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("OS returned an address of unsupported family {}", addr.family()),
        )
    })
}

/// Returns the `length` bytes of `buf` starting at `offset`.
///
/// # Panics
/// If the range is not within the buffer.
#[track_caller]
pub(crate) fn io_slice(buf: &[u8], length: usize, offset: usize) -> &[u8] {
    match offset.checked_add(length).and_then(|end| buf.get(offset..end)) {
        Some(slice) => slice,
        None => out_of_bounds(buf.len(), length, offset),
    }
}
/// Mutable counterpart of [`io_slice`].
#[track_caller]
pub(crate) fn io_slice_mut(buf: &mut [u8], length: usize, offset: usize) -> &mut [u8] {
    let buflen = buf.len();
    match offset.checked_add(length).and_then(|end| buf.get_mut(offset..end)) {
        Some(slice) => slice,
        None => out_of_bounds(buflen, length, offset),
    }
}
#[cold]
#[track_caller]
fn out_of_bounds(buflen: usize, length: usize, offset: usize) -> ! {
    panic!("offset {offset} with length {length} is out of bounds for a buffer of {buflen} bytes")
}
