use {
    super::{component::ServerComponent, ConnectionHandler},
    crate::{sys, tcp::Client, SocketHandle},
    std::{
        io,
        panic::{self, AssertUnwindSafe},
        sync::Arc,
        thread,
        time::Duration,
    },
};

/// Runs the accept loop until `generation` of the server stops or the listener becomes unusable,
/// handing every accepted connection to `dispatch`.
///
/// The loop never blocks in `accept` itself: it waits for the listener to become readable for at
/// most `poll_interval` at a time and rechecks the run state in between. A listener that can no
/// longer accept anything stops the server.
pub(super) fn accept_loop(
    listener: &SocketHandle,
    component: &ServerComponent,
    generation: u64,
    poll_interval: Duration,
    mut dispatch: impl FnMut(Client),
) {
    while component.is_current(generation) {
        if !listener.is_open() {
            tracing::warn!("listening socket was closed under a running server");
            component.abandon(generation);
            break;
        }
        match sys::poll_readable(listener.file_no(), poll_interval) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                tracing::error!("waiting for connections failed: {e}");
                component.abandon(generation);
                break;
            }
        }
        if !component.is_current(generation) {
            break;
        }
        match listener.accept() {
            Ok(Some((conn, peer))) => {
                tracing::trace!(%peer, fd = conn.file_no(), "accepted connection");
                dispatch(Client::from_socket(conn));
            }
            Ok(None) => {}
            Err(e) if sys::is_fatal_accept(&e) => {
                tracing::error!("listening socket cannot accept connections: {e}");
                component.abandon(generation);
                break;
            }
            Err(e) => {
                tracing::warn!("accepting a connection failed, retrying in {poll_interval:?}: {e}");
                component.pause(generation, poll_interval);
            }
        }
    }
    tracing::debug!(fd = listener.file_no(), generation, "acceptor exiting");
}

/// Runs `handler` on its own detached thread.
pub(super) fn spawn_handler(handler: &ConnectionHandler, client: Client) {
    let handler = handler.clone();
    let spawned = thread::Builder::new()
        .name("socklib-conn".to_owned())
        .spawn(move || handler.handle(client));
    if let Err(e) = spawned {
        tracing::warn!("could not start a thread for an accepted connection, dropping it: {e}");
    }
}

/// Body of a pool worker: take connections off the queue in order until `generation` of the
/// server stops.
pub(super) fn worker_loop(
    handler: &ConnectionHandler,
    component: &ServerComponent,
    generation: u64,
    id: usize,
) {
    component.check_in(generation);
    while let Some(client) = component.next(generation) {
        let fd = client.file_no();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(client))) {
            let msg = panic_message(&*payload);
            tracing::error!(worker = id, fd, "connection handler panicked: {msg}");
        }
    }
    tracing::trace!(worker = id, generation, "pool worker exiting");
}

pub(super) fn spawn_named(
    name: String,
    component: &Arc<ServerComponent>,
    f: impl FnOnce(&ServerComponent) + Send + 'static,
) -> io::Result<thread::JoinHandle<()>> {
    let component = Arc::clone(component);
    thread::Builder::new().name(name).spawn(move || f(&component))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string payload>"
    }
}
