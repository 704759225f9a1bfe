use {
    super::super::Client,
    crate::{NativeSocket, SocketHandle},
    std::{
        fmt::{self, Debug, Formatter},
        sync::Arc,
    },
};

/// The callback a [`Server`](super::Server) runs for every accepted connection.
///
/// Which of the three kinds is used decides what the callback is handed: the connection wrapped in
/// a [`Client`], its [`SocketHandle`], or only its native descriptor. In every case the connection
/// stays open for at least as long as the callback runs and is closed afterwards unless the
/// callback kept a clone of it.
#[derive(Clone)]
pub enum ConnectionHandler {
    /// Receives the connection as a TCP client.
    Client(Arc<dyn Fn(Client) + Send + Sync + 'static>),
    /// Receives the socket of the connection.
    Socket(Arc<dyn Fn(SocketHandle) + Send + Sync + 'static>),
    /// Receives the native descriptor of the connection.
    Descriptor(Arc<dyn Fn(NativeSocket) + Send + Sync + 'static>),
}
impl ConnectionHandler {
    /// Wraps a closure that takes a [`Client`].
    #[inline]
    pub fn client(f: impl Fn(Client) + Send + Sync + 'static) -> Self { Self::Client(Arc::new(f)) }
    /// Wraps a closure that takes a [`SocketHandle`].
    #[inline]
    pub fn socket(f: impl Fn(SocketHandle) + Send + Sync + 'static) -> Self {
        Self::Socket(Arc::new(f))
    }
    /// Wraps a closure that takes a native descriptor.
    #[inline]
    pub fn descriptor(f: impl Fn(NativeSocket) + Send + Sync + 'static) -> Self {
        Self::Descriptor(Arc::new(f))
    }

    pub(crate) fn handle(&self, client: Client) {
        match self {
            Self::Client(f) => f(client),
            Self::Socket(f) => f(client.socket().clone()),
            Self::Descriptor(f) => {
                f(client.file_no());
                drop(client);
            }
        }
    }
}
impl Debug for ConnectionHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client(..) => "ConnectionHandler::Client",
            Self::Socket(..) => "ConnectionHandler::Socket",
            Self::Descriptor(..) => "ConnectionHandler::Descriptor",
        })
    }
}
