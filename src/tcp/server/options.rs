use {
    super::{Server, DEFAULT_POLL_INTERVAL},
    crate::{AddressFamily, Endpoint, DEFAULT_BACKLOG},
    std::{io, time::Duration},
};

/// A builder for [`Server`]s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerOptions {
    pub(crate) family: AddressFamily,
    pub(crate) endpoint: Endpoint,
    pub(crate) backlog: i32,
    pub(crate) poll_interval: Duration,
}

/// Creation.
impl ServerOptions {
    /// Creates an options table with default values.
    #[inline]
    pub fn new() -> Self {
        Self {
            family: AddressFamily::IPv4,
            endpoint: Endpoint::any(0),
            backlog: DEFAULT_BACKLOG,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Option setters.
impl ServerOptions {
    builder_setters! {
        /// Sets the address family of the listening socket.
        ///
        /// The default is IPv4.
        family: AddressFamily,
        /// Sets the local endpoint to listen on.
        ///
        /// The default is the wildcard address with an OS-assigned port.
        endpoint: Endpoint,
        /// Sets the length of the queue of connections the OS holds for the server.
        ///
        /// The default is [`DEFAULT_BACKLOG`].
        backlog: i32,
        /// Sets how long the acceptor waits for a connection before rechecking whether the server
        /// has been stopped. This is also about how long [`Server::join`] can take after
        /// [`Server::stop`].
        ///
        /// The default is one second.
        poll_interval: Duration,
    }
}

/// Server constructors.
impl ServerOptions {
    /// Creates a listening [`Server`]. It is not started yet.
    pub fn create(&self) -> io::Result<Server> {
        let mut server = Server::bind_to(self.family, &self.endpoint, self.backlog)?;
        server.set_poll_interval(self.poll_interval);
        Ok(server)
    }
}

impl Default for ServerOptions {
    #[inline]
    fn default() -> Self { Self::new() }
}
