//! UDP clients.

use {
    crate::{AddressFamily, BasicClient, Endpoint, SocketHandle, SocketType},
    std::{
        io,
        net::SocketAddr,
        ops::{Deref, DerefMut},
    },
};

/// A datagram socket with an optional worker thread.
///
/// Derefs to [`BasicClient`] for the thread management and the generic socket operations.
#[derive(Clone, Debug, Default)]
pub struct Client(BasicClient);

/// Creation.
impl Client {
    /// Opens an unbound datagram socket of the given family.
    pub fn new(family: AddressFamily) -> io::Result<Self> {
        SocketHandle::open_typed(family, SocketType::Datagram).map(Self::from_socket)
    }
    /// Opens a datagram socket of the given family and binds it to `endpoint`.
    pub fn bound(family: AddressFamily, endpoint: &Endpoint) -> io::Result<Self> {
        let slf = Self::new(family)?;
        slf.bind_endpoint(endpoint)?;
        Ok(slf)
    }
    /// Opens a datagram socket of the family of `addr` and binds it to `addr`.
    pub fn bound_to(addr: SocketAddr) -> io::Result<Self> {
        let slf = Self::new(AddressFamily::of(&addr))?;
        slf.bind(addr)?;
        Ok(slf)
    }
    /// Wraps an existing datagram socket.
    #[inline]
    pub fn from_socket(socket: SocketHandle) -> Self { Self(BasicClient::from_socket(socket)) }

    /// Moves the client out of `self`, leaving a client with an unopened socket in its place.
    #[inline]
    #[must_use]
    pub fn take(&mut self) -> Self { Self(self.0.take()) }
}

/// Data transfer.
impl Client {
    /// See [`SocketHandle::send_to`].
    #[inline]
    #[track_caller]
    pub fn send_to(
        &self,
        buf: &[u8],
        length: usize,
        offset: usize,
        addr: SocketAddr,
    ) -> io::Result<Option<usize>> {
        self.socket().send_to(buf, length, offset, addr)
    }
    /// See [`SocketHandle::send_to_endpoint`].
    #[inline]
    #[track_caller]
    pub fn send_to_endpoint(
        &self,
        buf: &[u8],
        length: usize,
        offset: usize,
        endpoint: &Endpoint,
    ) -> io::Result<Option<usize>> {
        self.socket().send_to_endpoint(buf, length, offset, endpoint)
    }
    /// See [`SocketHandle::receive_from`].
    #[inline]
    #[track_caller]
    pub fn receive_from(
        &self,
        buf: &mut [u8],
        length: usize,
        offset: usize,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        self.socket().receive_from(buf, length, offset)
    }
    /// See [`SocketHandle::receive_from_endpoint`].
    #[inline]
    #[track_caller]
    pub fn receive_from_endpoint(
        &self,
        buf: &mut [u8],
        length: usize,
        offset: usize,
    ) -> io::Result<Option<(usize, Endpoint)>> {
        self.socket().receive_from_endpoint(buf, length, offset)
    }
    /// See [`SocketHandle::local_addr`].
    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.socket().local_addr() }
}

impl Deref for Client {
    type Target = BasicClient;
    #[inline]
    fn deref(&self) -> &BasicClient { &self.0 }
}
impl DerefMut for Client {
    #[inline]
    fn deref_mut(&mut self) -> &mut BasicClient { &mut self.0 }
}
impl From<BasicClient> for Client {
    #[inline]
    fn from(c: BasicClient) -> Self { Self(c) }
}

forward_as_raw_socket!(Client, 0);
