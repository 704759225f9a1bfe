//! A socket with an optional worker thread.
//!
//! A [`BasicClient`] pairs one [`SocketHandle`] with at most one thread running a user-supplied
//! [`ClientTask`] against it. The [TCP](crate::tcp::Client) and [UDP](crate::udp::Client)
//! clients add the transport-specific operations on top.

use {
    crate::{AddressFamily, Endpoint, NativeSocket, SocketHandle, SocketType},
    std::{
        fmt::{self, Debug, Formatter},
        io,
        net::{Shutdown, SocketAddr},
        thread::{self, JoinHandle},
    },
};

/// A unit of work to run on a client's thread.
///
/// The two kinds differ in what they are handed: a clone of the client's socket, or just its
/// native descriptor. In the latter case, the thread keeps the socket alive until the task
/// returns, so the descriptor stays valid for as long as the task can observe it.
pub enum ClientTask {
    /// Receives a clone of the client's socket.
    Socket(Box<dyn FnOnce(SocketHandle) + Send + 'static>),
    /// Receives the native descriptor of the client's socket.
    Descriptor(Box<dyn FnOnce(NativeSocket) + Send + 'static>),
}
impl ClientTask {
    /// Wraps a closure that takes the socket.
    #[inline]
    pub fn socket(f: impl FnOnce(SocketHandle) + Send + 'static) -> Self {
        Self::Socket(Box::new(f))
    }
    /// Wraps a closure that takes the native descriptor.
    #[inline]
    pub fn descriptor(f: impl FnOnce(NativeSocket) + Send + 'static) -> Self {
        Self::Descriptor(Box::new(f))
    }

    pub(crate) fn run(self, socket: SocketHandle) {
        match self {
            Self::Socket(f) => f(socket),
            Self::Descriptor(f) => {
                let fd = socket.file_no();
                f(fd);
                drop(socket);
            }
        }
    }
}
impl Debug for ClientTask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Socket(..) => "ClientTask::Socket",
            Self::Descriptor(..) => "ClientTask::Descriptor",
        })
    }
}

/// What a client's thread is up to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ThreadState {
    /// No thread has been started, or the last one has been joined.
    #[default]
    None,
    /// A thread is running and is to be [joined](BasicClient::join).
    Running,
    /// A thread was started detached. The client has given its socket to the thread and cannot
    /// start another one.
    Detached,
}

/// A socket with an optional worker thread. See the [module-level documentation](self).
///
/// Cloning a client shares its socket but not its thread. Dropping a client whose thread is still
/// [running](ThreadState::Running) detaches the thread.
#[derive(Default)]
pub struct BasicClient {
    socket: SocketHandle,
    thread: Option<JoinHandle<()>>,
    state: ThreadState,
}

/// Creation.
impl BasicClient {
    /// Creates a client with an unopened socket.
    #[inline]
    pub fn new() -> Self { Self::default() }
    /// Creates a client with a freshly opened socket.
    pub fn open_new(family: AddressFamily, ty: SocketType, protocol: i32) -> io::Result<Self> {
        Ok(Self::from_socket(SocketHandle::open_new(family, ty, protocol)?))
    }
    /// Wraps an existing socket.
    #[inline]
    pub fn from_socket(socket: SocketHandle) -> Self {
        Self {
            socket,
            thread: None,
            state: ThreadState::None,
        }
    }
    /// Moves the client, thread included, out of `self`, leaving a client with an unopened socket
    /// in its place.
    #[inline]
    #[must_use]
    pub fn take(&mut self) -> Self { std::mem::take(self) }
}

/// Socket operations.
impl BasicClient {
    /// See [`SocketHandle::open`].
    #[inline]
    pub fn open(&self, family: AddressFamily, ty: SocketType, protocol: i32) -> io::Result<()> {
        self.socket.open(family, ty, protocol)
    }
    /// See [`SocketHandle::bind`].
    #[inline]
    pub fn bind(&self, addr: SocketAddr) -> io::Result<()> { self.socket.bind(addr) }
    /// See [`SocketHandle::bind_endpoint`].
    #[inline]
    pub fn bind_endpoint(&self, endpoint: &Endpoint) -> io::Result<()> {
        self.socket.bind_endpoint(endpoint)
    }
    /// See [`SocketHandle::shutdown`].
    #[inline]
    pub fn shutdown(&self, how: Shutdown) -> io::Result<()> { self.socket.shutdown(how) }
    /// See [`SocketHandle::close`].
    #[inline]
    pub fn close(&self) -> io::Result<()> { self.socket.close() }

    /// The socket of the client.
    #[inline]
    pub fn socket(&self) -> &SocketHandle { &self.socket }
    /// Mutable access to the socket, such as for [taking](SocketHandle::take) it.
    #[inline]
    pub fn socket_mut(&mut self) -> &mut SocketHandle { &mut self.socket }
    /// See [`SocketHandle::file_no`].
    #[inline]
    pub fn file_no(&self) -> NativeSocket { self.socket.file_no() }
    /// What the client's thread is up to.
    #[inline]
    pub fn thread_state(&self) -> ThreadState { self.state }
}

/// Threading.
impl BasicClient {
    /// Starts a thread running `task` against this client's socket.
    ///
    /// With `detached` set, the thread is detached and becomes the socket's only user as far as
    /// this client is concerned: the client moves onto a fresh unopened socket and its state
    /// becomes [`Detached`](ThreadState::Detached) for good. Otherwise, the state becomes
    /// [`Running`](ThreadState::Running) until [`join`](Self::join) is called.
    ///
    /// # Panics
    /// If the socket is not open, or if a thread has already been started and not joined.
    pub fn start(&mut self, task: ClientTask, detached: bool) -> io::Result<()> {
        assert!(
            self.socket.is_open(),
            "cannot start a client thread with a socket that is not open"
        );
        assert!(
            self.state == ThreadState::None,
            "client already has a thread (state: {:?})",
            self.state
        );

        let socket = self.socket.clone();
        let handle = thread::Builder::new()
            .name("socklib-client".to_owned())
            .spawn(move || task.run(socket))?;
        if detached {
            drop(handle);
            drop(self.socket.take());
            self.state = ThreadState::Detached;
        } else {
            self.thread = Some(handle);
            self.state = ThreadState::Running;
        }
        Ok(())
    }

    /// Waits for the thread started by [`start`](Self::start) to finish. A panic in the task is
    /// returned as the error.
    ///
    /// # Panics
    /// If there is no running thread to join, including when it was started detached.
    pub fn join(&mut self) -> thread::Result<()> {
        assert!(
            self.state == ThreadState::Running,
            "there is no joinable client thread (state: {:?})",
            self.state
        );
        self.state = ThreadState::None;
        match self.thread.take() {
            Some(handle) => handle.join(),
            None => Ok(()),
        }
    }
}

impl Clone for BasicClient {
    fn clone(&self) -> Self {
        let state = match self.state {
            ThreadState::Running => {
                tracing::warn!(
                    fd = self.socket.file_no(),
                    "cloning a client with a running thread; the clone shares the socket with it"
                );
                ThreadState::None
            }
            other => other,
        };
        Self {
            socket: self.socket.clone(),
            thread: None,
            state,
        }
    }
}

impl Drop for BasicClient {
    fn drop(&mut self) {
        if self.state == ThreadState::Running {
            tracing::warn!(
                fd = self.socket.file_no(),
                "client dropped without joining its thread, which is now detached"
            );
        }
    }
}

impl Debug for BasicClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicClient")
            .field("socket", &self.socket)
            .field("state", &self.state)
            .finish()
    }
}

forward_as_raw_socket!(BasicClient, socket);
