//! The reference-counted socket handle.
//!
//! A [`SocketHandle`] is a cheap, clonable reference to one native socket descriptor. Every clone
//! of a handle belongs to the same *lineage* and observes the same descriptor, address family and
//! blocking mode, including changes made through other clones: closing the socket through one
//! clone closes it for all of them. The descriptor is closed automatically when the last clone of
//! a lineage is dropped, unless it has already been closed explicitly.
//!
//! Misusing a handle, such as opening it twice, closing it twice or binding an IPv6 socket to an
//! IPv4 address, is a bug in the calling code and panics. Failures reported by the OS are
//! returned as [`io::Error`]s, except for timeouts, which are ordinary return values: `Ok(None)`
//! for data transfer and accepting, `Ok(false)` for connecting.

mod options;
mod transfer;

pub use options::*;

use {
    crate::{misc::TimeoutExt, sys, AddressFamily, Endpoint, NativeSocket, SocketType},
    std::{
        fmt::{self, Debug, Formatter},
        io,
        net::{Shutdown, SocketAddr},
        sync::{
            atomic::{AtomicBool, AtomicU8, Ordering::*},
            Arc,
        },
        time::Duration,
    },
};

/// The backlog [`listen`](SocketHandle::listen) is usually given, which is the largest one the
/// platform advertises.
pub const DEFAULT_BACKLOG: i32 = sys::SOMAXCONN;

/// State shared by every clone of a lineage.
struct Shared {
    fd: sys::AtomicNativeSocket,
    family: AtomicU8,
    blocking: AtomicBool,
}
impl Default for Shared {
    fn default() -> Self {
        Self {
            fd: sys::AtomicNativeSocket::new(sys::INVALID_SOCKET),
            family: AtomicU8::new(AddressFamily::Unspecified as u8),
            blocking: AtomicBool::new(true),
        }
    }
}
impl Drop for Shared {
    fn drop(&mut self) {
        let fd = *self.fd.get_mut();
        if fd != sys::INVALID_SOCKET {
            if let Err(e) = sys::close(fd) {
                tracing::warn!(fd, "failed to close socket on drop: {e}");
            }
        }
    }
}

/// A reference-counted native socket.
///
/// See the [module-level documentation](self) for the sharing model.
#[derive(Clone, Default)]
pub struct SocketHandle {
    shared: Arc<Shared>,
}

/// Creation and lifecycle.
impl SocketHandle {
    /// Creates an unopened handle on a lineage of its own.
    #[inline]
    pub fn new() -> Self { Self::default() }

    /// Creates a handle and [opens](Self::open) it right away.
    pub fn open_new(family: AddressFamily, ty: SocketType, protocol: i32) -> io::Result<Self> {
        let slf = Self::new();
        slf.open(family, ty, protocol)?;
        Ok(slf)
    }

    /// Like [`open_new`](Self::open_new), with the default protocol of `ty`.
    pub(crate) fn open_typed(family: AddressFamily, ty: SocketType) -> io::Result<Self> {
        Self::open_new(family, ty, ty.default_protocol())
    }

    /// Opens a native socket of the given family and type for this lineage.
    ///
    /// A `protocol` of 0 selects the default protocol for the type. Every socket is opened with
    /// `SO_REUSEADDR` set and is not inherited by child processes.
    ///
    /// # Panics
    /// If `family` is [`Unspecified`](AddressFamily::Unspecified), or if the lineage is already
    /// open.
    pub fn open(&self, family: AddressFamily, ty: SocketType, protocol: i32) -> io::Result<()> {
        assert!(
            family.is_specified(),
            "sockets can only be opened as IPv4 or IPv6"
        );
        assert!(!self.is_open(), "attempt to open a socket that is already open");

        let fd = sys::socket(family.native(), ty.native(), protocol)?;
        if let Err(e) = sys::set_reuseaddr(fd) {
            let _ = sys::close(fd);
            return Err(e);
        }
        if self
            .shared
            .fd
            .compare_exchange(sys::INVALID_SOCKET, fd, AcqRel, Acquire)
            .is_err()
        {
            let _ = sys::close(fd);
            panic!("socket was opened concurrently through another handle");
        }
        self.shared.family.store(family as u8, Release);
        self.shared.blocking.store(true, Release);
        Ok(())
    }

    /// Closes the native socket for every handle of the lineage.
    ///
    /// # Panics
    /// If the lineage is not open.
    pub fn close(&self) -> io::Result<()> {
        let fd = self.shared.fd.swap(sys::INVALID_SOCKET, AcqRel);
        assert!(fd != sys::INVALID_SOCKET, "attempt to close a socket that is not open");
        self.shared.family.store(AddressFamily::Unspecified as u8, Release);
        sys::close(fd)
    }

    /// Shuts down one or both directions of the connection.
    ///
    /// # Panics
    /// If the lineage is not open.
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> {
        sys::shutdown(self.opened_fd(), how)
    }

    /// Moves the lineage out of `self`, leaving `self` on a brand new unopened one.
    #[inline]
    #[must_use = "dropping the taken handle closes the socket if nothing else refers to it"]
    pub fn take(&mut self) -> Self { std::mem::take(self) }
}

/// Addressing.
impl SocketHandle {
    /// Binds the socket to a local address. Port 0 lets the OS pick one.
    ///
    /// # Panics
    /// If the lineage is not open, or if `addr` is of a different family than the socket.
    pub fn bind(&self, addr: SocketAddr) -> io::Result<()> {
        let fd = self.opened_fd();
        self.assert_family(&addr);
        sys::bind(fd, &addr)
    }
    /// Like [`bind`](Self::bind), but takes an [`Endpoint`]. An empty host binds the wildcard
    /// address of the socket's family.
    pub fn bind_endpoint(&self, endpoint: &Endpoint) -> io::Result<()> {
        self.bind(self.resolve(endpoint)?)
    }

    /// Connects the socket to a remote address.
    ///
    /// Returns `Ok(false)` if the attempt did not finish in time, which is either because of a
    /// [timeout](Self::set_timeout) or because the socket is in nonblocking mode.
    ///
    /// # Panics
    /// If the lineage is not open, or if `addr` is of a different family than the socket.
    pub fn connect(&self, addr: SocketAddr) -> io::Result<bool> {
        let fd = self.opened_fd();
        self.assert_family(&addr);
        Ok(sys::connect(fd, &addr).none_on_timeout()?.is_some())
    }
    /// Like [`connect`](Self::connect), but takes an [`Endpoint`].
    pub fn connect_endpoint(&self, endpoint: &Endpoint) -> io::Result<bool> {
        self.connect(self.resolve(endpoint)?)
    }

    /// Marks the socket as listening for connections.
    ///
    /// # Panics
    /// If the lineage is not open.
    pub fn listen(&self, backlog: i32) -> io::Result<()> { sys::listen(self.opened_fd(), backlog) }

    /// Accepts a connection, returning a handle on a new lineage along with the address of the
    /// peer, or `Ok(None)` on timeout.
    ///
    /// The new handle has the same address family as the listener.
    ///
    /// # Panics
    /// If the lineage is not open.
    pub fn accept_addr(&self) -> io::Result<Option<(SocketHandle, SocketAddr)>> {
        let Some((fd, peer)) = sys::accept(self.opened_fd()).none_on_timeout()? else {
            return Ok(None);
        };
        let conn = SocketHandle::new();
        conn.shared.fd.store(fd, Release);
        conn.shared.family.store(self.family() as u8, Release);
        Ok(Some((conn, peer)))
    }
    /// Like [`accept_addr`](Self::accept_addr), but returns the peer as an [`Endpoint`].
    pub fn accept(&self) -> io::Result<Option<(SocketHandle, Endpoint)>> {
        Ok(self.accept_addr()?.map(|(conn, peer)| (conn, peer.into())))
    }

    /// Returns the address the socket is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> { sys::local_addr(self.opened_fd()) }
    /// Like [`local_addr`](Self::local_addr), but returns an [`Endpoint`].
    pub fn local_endpoint(&self) -> io::Result<Endpoint> { self.local_addr().map(Into::into) }
}

/// Configuration.
impl SocketHandle {
    /// Switches between blocking and nonblocking mode. Nothing is done if the socket is already in
    /// the requested mode.
    ///
    /// # Panics
    /// If the lineage is not open.
    pub fn set_blocking(&self, blocking: bool) -> io::Result<()> {
        let fd = self.opened_fd();
        if self.shared.blocking.load(Acquire) == blocking {
            return Ok(());
        }
        sys::set_nonblocking(fd, !blocking)?;
        self.shared.blocking.store(blocking, Release);
        Ok(())
    }

    /// Sets both the send and the receive timeout to `timeout`.
    ///
    /// A zero duration is handed to the OS as-is, which most platforms read as "no timeout", but
    /// this should not be relied on to undo an earlier timeout.
    ///
    /// # Panics
    /// If the lineage is not open.
    pub fn set_timeout(&self, timeout: Duration) -> io::Result<()> {
        sys::set_timeout(self.opened_fd(), timeout)
    }
}

/// Inspection.
impl SocketHandle {
    /// The native descriptor, or the platform's invalid socket value if the lineage is not open.
    #[inline]
    pub fn file_no(&self) -> NativeSocket { self.shared.fd.load(Acquire) }
    /// The address family, [`Unspecified`](AddressFamily::Unspecified) if not open.
    #[inline]
    pub fn family(&self) -> AddressFamily {
        AddressFamily::from_u8(self.shared.family.load(Acquire))
    }
    /// Whether the socket is in blocking mode, which is the default.
    #[inline]
    pub fn is_blocking(&self) -> bool { self.shared.blocking.load(Acquire) }
    /// Whether the lineage currently has a native socket.
    #[inline]
    pub fn is_open(&self) -> bool { self.file_no() != sys::INVALID_SOCKET }
    /// Whether the socket has been [marked as listening](Self::listen).
    ///
    /// # Panics
    /// If the lineage is not open.
    pub fn is_listening(&self) -> io::Result<bool> { sys::is_listening(self.opened_fd()) }
    /// How many handles refer to this lineage, `self` included.
    #[inline]
    pub fn share_count(&self) -> usize { Arc::strong_count(&self.shared) }
    /// Whether the two handles belong to the same lineage.
    #[inline]
    pub fn same_lineage(&self, other: &Self) -> bool { Arc::ptr_eq(&self.shared, &other.shared) }
}

/// Factories.
impl SocketHandle {
    /// Opens a TCP socket, binds it to `local`, applies `timeout` unless it is zero, and connects
    /// it to `endpoint`.
    ///
    /// The socket is returned even if connecting timed out; the flag next to it says whether the
    /// connection was established.
    pub fn create_connection(
        family: AddressFamily,
        endpoint: &Endpoint,
        timeout: Duration,
        local: &Endpoint,
    ) -> io::Result<(SocketHandle, bool)> {
        let slf = Self::open_typed(family, SocketType::Stream)?;
        slf.bind_endpoint(local)?;
        if !timeout.is_zero() {
            slf.set_timeout(timeout)?;
        }
        let connected = slf.connect_endpoint(endpoint)?;
        Ok((slf, connected))
    }

    /// Opens a TCP socket, binds it to `endpoint` and starts listening.
    pub fn create_server(
        family: AddressFamily,
        endpoint: &Endpoint,
        backlog: i32,
    ) -> io::Result<SocketHandle> {
        let slf = Self::open_typed(family, SocketType::Stream)?;
        slf.bind_endpoint(endpoint)?;
        slf.listen(backlog)?;
        Ok(slf)
    }
}

impl SocketHandle {
    #[track_caller]
    fn opened_fd(&self) -> NativeSocket {
        let fd = self.file_no();
        assert!(fd != sys::INVALID_SOCKET, "socket is not open");
        fd
    }
    #[track_caller]
    fn assert_family(&self, addr: &SocketAddr) {
        let (own, theirs) = (self.family(), AddressFamily::of(addr));
        assert!(
            own == theirs,
            "address {addr} is {theirs}, but the socket is {own}"
        );
    }
    fn resolve(&self, endpoint: &Endpoint) -> io::Result<SocketAddr> {
        Ok(endpoint.to_socket_addr(self.family())?)
    }
}

impl Debug for SocketHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHandle")
            .field("fd", &self.file_no())
            .field("family", &self.family())
            .field("blocking", &self.is_blocking())
            .field("share_count", &self.share_count())
            .finish()
    }
}

#[cfg(unix)]
impl std::os::unix::io::AsRawFd for SocketHandle {
    #[inline]
    fn as_raw_fd(&self) -> std::os::unix::io::RawFd { self.file_no() }
}
#[cfg(windows)]
impl std::os::windows::io::AsRawSocket for SocketHandle {
    #[inline]
    fn as_raw_socket(&self) -> std::os::windows::io::RawSocket { self.file_no() }
}
