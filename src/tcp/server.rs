//! The dual-mode TCP server.
//!
//! A [`Server`] owns a listening socket and, once started, an acceptor thread. What happens to
//! accepted connections depends on how the server was started:
//!
//! - [`start`](Server::start) hands every connection to a brand new detached thread, so there is
//!   no limit on how many connections are served at once;
//! - [`start_pool`](Server::start_pool) spawns a fixed number of worker threads up front, and the
//!   acceptor appends connections to a queue the workers take them from in arrival order.
//!
//! In both modes, [`stop`](Server::stop) only asks the server to wind down. The acceptor notices
//! within one [poll interval](ServerOptions::poll_interval), and [`join`](Server::join) waits
//! for that to happen. Idle pool workers exit immediately; busy ones exit once their current
//! handler returns. Connections that were accepted but not yet picked up by a worker are closed.

mod acceptor;
mod component;
mod handler;
mod options;

pub use {handler::*, options::*};

use {
    self::component::ServerComponent,
    crate::{AddressFamily, Endpoint, NativeSocket, SocketHandle, SocketType, DEFAULT_BACKLOG},
    std::{
        fmt::{self, Debug, Formatter},
        io,
        net::SocketAddr,
        sync::Arc,
        thread,
        time::Duration,
    },
};

/// How long the acceptor waits for a connection before rechecking whether it should stop, unless
/// configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A TCP server. See the [module-level documentation](self).
///
/// Clones share the listening socket and the running state: any clone can stop or join the
/// server started through another.
#[derive(Clone)]
pub struct Server {
    socket: SocketHandle,
    component: Arc<ServerComponent>,
    poll_interval: Duration,
}

/// Creation.
impl Server {
    /// Opens a stream socket of the given family, neither bound nor listening.
    pub fn new(family: AddressFamily) -> io::Result<Self> {
        SocketHandle::open_typed(family, SocketType::Stream).map(Self::from_socket)
    }
    /// Opens a socket, binds it to `endpoint` and starts listening with the given backlog.
    pub fn bind_to(family: AddressFamily, endpoint: &Endpoint, backlog: i32) -> io::Result<Self> {
        Ok(Self::from_socket(SocketHandle::create_server(family, endpoint, backlog)?))
    }
    /// Like [`bind_to`](Self::bind_to), but takes a socket address.
    pub fn bind_addr(addr: SocketAddr, backlog: i32) -> io::Result<Self> {
        let slf = Self::new(AddressFamily::of(&addr))?;
        slf.bind(addr)?;
        slf.listen(backlog)?;
        Ok(slf)
    }
    /// Wraps an existing socket, which must be listening by the time the server is started.
    pub fn from_socket(socket: SocketHandle) -> Self {
        Self {
            socket,
            component: Arc::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Moves the server out of `self`. `self` is left with an unopened socket and a fresh state
    /// that has never been started.
    #[inline]
    #[must_use]
    pub fn take(&mut self) -> Self { std::mem::take(self) }
}

/// Socket operations.
impl Server {
    /// Opens a stream socket of the given family. See [`SocketHandle::open`].
    #[inline]
    pub fn open(&self, family: AddressFamily) -> io::Result<()> {
        self.socket.open(family, SocketType::Stream, SocketType::Stream.default_protocol())
    }
    /// See [`SocketHandle::bind`].
    #[inline]
    pub fn bind(&self, addr: SocketAddr) -> io::Result<()> { self.socket.bind(addr) }
    /// See [`SocketHandle::bind_endpoint`].
    #[inline]
    pub fn bind_endpoint(&self, endpoint: &Endpoint) -> io::Result<()> {
        self.socket.bind_endpoint(endpoint)
    }
    /// See [`SocketHandle::listen`].
    #[inline]
    pub fn listen(&self, backlog: i32) -> io::Result<()> { self.socket.listen(backlog) }
    /// Like [`listen`](Self::listen), with [`DEFAULT_BACKLOG`].
    #[inline]
    pub fn listen_default(&self) -> io::Result<()> { self.listen(DEFAULT_BACKLOG) }
    /// See [`SocketHandle::close`].
    #[inline]
    pub fn close(&self) -> io::Result<()> { self.socket.close() }

    /// The listening socket.
    #[inline]
    pub fn socket(&self) -> &SocketHandle { &self.socket }
    /// See [`SocketHandle::file_no`].
    #[inline]
    pub fn file_no(&self) -> NativeSocket { self.socket.file_no() }
    /// See [`SocketHandle::local_addr`].
    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.socket.local_addr() }

    /// Sets how long the acceptor waits for a connection before rechecking whether it should stop.
    /// Takes effect the next time the server is started.
    #[inline]
    pub fn set_poll_interval(&mut self, poll_interval: Duration) {
        self.poll_interval = poll_interval;
    }
    /// See [`set_poll_interval`](Self::set_poll_interval).
    #[inline]
    pub fn poll_interval(&self) -> Duration { self.poll_interval }
}

/// Running.
impl Server {
    /// Starts the acceptor, which runs `handler` for every connection on a thread of its own.
    ///
    /// Returns once the acceptor thread has been spawned. If the acceptor of an earlier run is
    /// still winding down, it is waited for first, which takes at most one poll interval.
    ///
    /// Fails with [`InvalidInput`](io::ErrorKind::InvalidInput) if the socket is not listening.
    ///
    /// # Panics
    /// If the socket is not open, or if the server is already running.
    pub fn start(&self, handler: ConnectionHandler) -> io::Result<()> {
        self.check_listening()?;
        let generation = self.component.begin();
        tracing::debug!(
            fd = self.file_no(),
            ?handler,
            generation,
            "starting server, one thread per connection"
        );

        let listener = self.socket.clone();
        let poll_interval = self.poll_interval;
        let spawned =
            acceptor::spawn_named("socklib-acceptor".to_owned(), &self.component, move |c| {
                acceptor::accept_loop(&listener, c, generation, poll_interval, |client| {
                    acceptor::spawn_handler(&handler, client)
                })
            });
        match spawned {
            Ok(handle) => {
                self.component.set_acceptor(handle);
                Ok(())
            }
            Err(e) => {
                self.component.stop();
                Err(e)
            }
        }
    }

    /// Starts `pool_size` worker threads and the acceptor. Workers run `handler` for queued
    /// connections one at a time, oldest first.
    ///
    /// Returns once every worker and the acceptor are up. Workers left over from an earlier run
    /// finish their current connection and exit without taking any of the new ones.
    ///
    /// Fails with [`InvalidInput`](io::ErrorKind::InvalidInput) if the socket is not listening.
    ///
    /// # Panics
    /// If `pool_size` is zero, if the socket is not open, or if the server is already running.
    pub fn start_pool(&self, handler: ConnectionHandler, pool_size: usize) -> io::Result<()> {
        assert!(pool_size > 0, "a server pool needs at least one worker");
        self.check_listening()?;
        let generation = self.component.begin();
        tracing::debug!(
            fd = self.file_no(),
            ?handler,
            pool_size,
            generation,
            "starting server with a worker pool"
        );

        for id in 0..pool_size {
            let handler = handler.clone();
            let name = format!("socklib-worker-{id}");
            let spawned = acceptor::spawn_named(name, &self.component, move |c| {
                acceptor::worker_loop(&handler, c, generation, id)
            });
            if let Err(e) = spawned {
                self.component.stop();
                return Err(e);
            }
        }

        let listener = self.socket.clone();
        let poll_interval = self.poll_interval;
        let spawned =
            acceptor::spawn_named("socklib-acceptor".to_owned(), &self.component, move |c| {
                c.check_in(generation);
                acceptor::accept_loop(&listener, c, generation, poll_interval, |client| {
                    if !c.push(generation, client) {
                        tracing::trace!("server stopped before the connection could be queued");
                    }
                })
            });
        match spawned {
            Ok(handle) => self.component.set_acceptor(handle),
            Err(e) => {
                self.component.stop();
                return Err(e);
            }
        }

        self.component.wait_started(generation, pool_size.saturating_add(1));
        Ok(())
    }

    /// Asks the server to stop and closes every connection still waiting in the queue. Does not
    /// wait for the acceptor; use [`join`](Self::join) for that.
    pub fn stop(&self) {
        let discarded = self.component.stop();
        if !discarded.is_empty() {
            tracing::warn!(count = discarded.len(), "closing queued connections no worker got to");
        }
        tracing::debug!(fd = self.file_no(), "server stopping");
    }

    /// Waits for the acceptor thread to exit. Returns immediately if the server has never been
    /// started or has already been joined. Pool workers and per-connection threads are detached
    /// and are not waited for.
    ///
    /// The error is the panic payload of the acceptor thread.
    pub fn join(&self) -> thread::Result<()> {
        let rslt = self.component.join_acceptor();
        tracing::debug!(fd = self.file_no(), "server joined");
        rslt
    }

    #[track_caller]
    fn check_listening(&self) -> io::Result<()> {
        assert!(self.socket.is_open(), "cannot start a server whose socket is not open");
        if self.socket.is_listening()? {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot start a server whose socket is not listening",
            ))
        }
    }

    /// Whether the server has been started and not stopped. A server also stops by itself when
    /// its listening socket can no longer accept connections.
    #[inline]
    pub fn is_running(&self) -> bool { self.component.is_running() }
}

impl Default for Server {
    #[inline]
    fn default() -> Self { Self::from_socket(SocketHandle::new()) }
}

impl Debug for Server {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("socket", &self.socket)
            .field("running", &self.is_running())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

forward_as_raw_socket!(Server, socket);

#[cfg(test)]
impl Server {
    pub(crate) fn queued_connections(&self) -> usize { self.component.queue_len() }
}
