//! The platform capability layer: one set of names for the socket primitives of whichever
//! backend is compiled in.

#[cfg(unix)]
pub(crate) use crate::os::unix::*;
#[cfg(windows)]
pub(crate) use crate::os::windows::*;

impmod! {c_wrappers,
    socket, set_reuseaddr, close, bind, connect, listen, accept,
    send, send_to, recv, recv_from, shutdown,
    set_nonblocking, set_timeout, local_addr, poll_readable, is_listening,
}
