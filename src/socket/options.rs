use {
    super::SocketHandle,
    crate::{AddressFamily, Endpoint},
    std::{io, time::Duration},
};

/// Client-side builder for outgoing TCP connections, the table form of
/// [`SocketHandle::create_connection`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectOptions {
    pub(crate) family: AddressFamily,
    pub(crate) endpoint: Endpoint,
    pub(crate) timeout: Duration,
    pub(crate) local_endpoint: Endpoint,
}

/// Creation.
impl ConnectOptions {
    /// Creates an options table with default values.
    #[inline]
    pub fn new() -> Self {
        Self {
            family: AddressFamily::IPv4,
            endpoint: Endpoint::default(),
            timeout: Duration::ZERO,
            local_endpoint: Endpoint::any(0),
        }
    }
}

/// Option setters.
impl ConnectOptions {
    builder_setters! {
        /// Sets the address family of the socket.
        ///
        /// The default is IPv4.
        family: AddressFamily,
        /// Sets the remote endpoint to connect to.
        endpoint: Endpoint,
        /// Sets the send and receive timeout of the socket, which also bounds the connection
        /// attempt.
        ///
        /// Zero, the default, leaves the socket's timeouts untouched.
        timeout: Duration,
        /// Sets the local endpoint to bind to before connecting.
        ///
        /// The default is the wildcard address with an OS-assigned port.
        local_endpoint: Endpoint,
    }
}

/// Socket constructors.
impl ConnectOptions {
    /// Opens a socket and attempts to connect it, returning it together with whether the
    /// connection was established in time.
    #[inline]
    pub fn connect(&self) -> io::Result<(SocketHandle, bool)> {
        SocketHandle::create_connection(
            self.family,
            &self.endpoint,
            self.timeout,
            &self.local_endpoint,
        )
    }
    /// Like [`connect`](Self::connect), but returns a [TCP client](crate::tcp::Client) and
    /// reports a timed out attempt as an error of kind [`TimedOut`](io::ErrorKind::TimedOut).
    pub fn connect_client(&self) -> io::Result<crate::tcp::Client> {
        let (socket, connected) = self.connect()?;
        if !connected {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connecting to {} timed out", self.endpoint),
            ));
        }
        Ok(crate::tcp::Client::from_socket(socket))
    }
}

impl Default for ConnectOptions {
    #[inline]
    fn default() -> Self { Self::new() }
}
