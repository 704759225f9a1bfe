use {
    crate::{AddressFamily, BasicClient, Endpoint, SocketHandle, SocketType},
    std::{
        io,
        net::{Shutdown, SocketAddr},
        ops::{Deref, DerefMut},
    },
};

/// A TCP connection with an optional worker thread.
///
/// Derefs to [`BasicClient`] for the thread management and the generic socket operations.
#[derive(Clone, Debug, Default)]
pub struct Client(BasicClient);

/// Creation.
impl Client {
    /// Opens a stream socket of the given family without connecting it.
    pub fn new(family: AddressFamily) -> io::Result<Self> {
        SocketHandle::open_typed(family, SocketType::Stream).map(Self::from_socket)
    }
    /// Wraps a socket that is already connected, such as one returned by
    /// [`SocketHandle::accept`].
    #[inline]
    pub fn from_socket(socket: SocketHandle) -> Self { Self(BasicClient::from_socket(socket)) }

    /// Opens a socket of the family of `addr` and connects it to `addr`.
    pub fn connect_to(addr: SocketAddr) -> io::Result<Self> {
        let slf = Self::new(AddressFamily::of(&addr))?;
        if !slf.connect(addr)? {
            return Err(timed_out(addr));
        }
        Ok(slf)
    }
    /// Opens a socket of the given family and connects it to `endpoint`.
    pub fn connect_endpoint_to(family: AddressFamily, endpoint: &Endpoint) -> io::Result<Self> {
        let slf = Self::new(family)?;
        if !slf.connect_endpoint(endpoint)? {
            return Err(timed_out(endpoint));
        }
        Ok(slf)
    }

    /// Moves the client out of `self`, leaving a client with an unopened socket in its place.
    #[inline]
    #[must_use]
    pub fn take(&mut self) -> Self { Self(self.0.take()) }
}

/// Connection.
impl Client {
    /// See [`SocketHandle::connect`].
    #[inline]
    pub fn connect(&self, addr: SocketAddr) -> io::Result<bool> { self.socket().connect(addr) }
    /// See [`SocketHandle::connect_endpoint`].
    #[inline]
    pub fn connect_endpoint(&self, endpoint: &Endpoint) -> io::Result<bool> {
        self.socket().connect_endpoint(endpoint)
    }

    /// Shuts down the sending half of the connection, then closes the socket.
    ///
    /// The socket is closed even if the shutdown fails. A peer that has already gone away is not
    /// an error.
    pub fn disconnect(&self) -> io::Result<()> {
        let shut = match self.shutdown(Shutdown::Write) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            els => els,
        };
        self.close()?;
        shut
    }
}

/// Data transfer.
impl Client {
    /// See [`SocketHandle::send`].
    #[inline]
    #[track_caller]
    pub fn send(&self, buf: &[u8], length: usize, offset: usize) -> io::Result<Option<usize>> {
        self.socket().send(buf, length, offset)
    }
    /// See [`SocketHandle::receive`].
    #[inline]
    #[track_caller]
    pub fn receive(
        &self,
        buf: &mut [u8],
        length: usize,
        offset: usize,
    ) -> io::Result<Option<usize>> {
        self.socket().receive(buf, length, offset)
    }
}

fn timed_out(to: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, format!("connecting to {to} timed out"))
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
