//! Test utilities for setting up loopback servers and connections on OS-assigned ports.
#![allow(dead_code, unused_macros)]

#[macro_use]
mod eyre;

pub use eyre::*;

use {
    crate::{AddressFamily, Endpoint, SocketHandle, SocketType, DEFAULT_BACKLOG},
    color_eyre::eyre::{bail, WrapErr},
    std::{
        fmt::Debug,
        io,
        net::{Ipv4Addr, SocketAddr},
        thread,
        time::{Duration, Instant},
    },
};

pub fn testinit() { eyre::install(); }

pub const LOCALHOST: &str = "127.0.0.1";

/// Attaches the name of the failed operation to an I/O error.
pub trait OpnameExt<T> {
    fn opname(self, opname: &'static str) -> TestResult<T>;
}
impl<T> OpnameExt<T> for io::Result<T> {
    fn opname(self, opname: &'static str) -> TestResult<T> {
        self.wrap_err_with(|| format!("{opname} failed"))
    }
}

/// Like [`OpnameExt`], but for results where `None` means the operation timed out.
pub trait CompletedExt<T> {
    fn completed(self, opname: &'static str) -> TestResult<T>;
}
impl<T> CompletedExt<T> for io::Result<Option<T>> {
    fn completed(self, opname: &'static str) -> TestResult<T> {
        match self.opname(opname)? {
            Some(v) => Ok(v),
            None => bail!("{opname} timed out"),
        }
    }
}

pub fn loopback_addr() -> SocketAddr { (Ipv4Addr::LOCALHOST, 0).into() }

/// A listening IPv4 stream socket on an OS-assigned loopback port.
pub fn listener() -> TestResult<(SocketHandle, SocketAddr)> {
    let listener = SocketHandle::create_server(
        AddressFamily::IPv4,
        &Endpoint::new(LOCALHOST, 0),
        DEFAULT_BACKLOG,
    )
    .opname("create_server")?;
    let addr = listener.local_addr().opname("local_addr")?;
    Ok((listener, addr))
}

/// Connects a fresh IPv4 stream socket to `addr`.
pub fn connect(addr: SocketAddr) -> TestResult<SocketHandle> {
    let conn = SocketHandle::open_new(AddressFamily::IPv4, SocketType::Stream, 0).opname("open")?;
    if !conn.connect(addr).opname("connect")? {
        bail!("connect to {addr} timed out");
    }
    Ok(conn)
}

/// A connected pair of stream sockets: the client side and the accepted side.
pub fn connected_pair() -> TestResult<(SocketHandle, SocketHandle)> {
    let (listener, addr) = listener()?;
    let client = connect(addr)?;
    let (accepted, _) = listener.accept().completed("accept")?;
    Ok((client, accepted))
}

/// Writes the whole message, looping over partial sends.
pub fn send_all(socket: &SocketHandle, msg: &[u8]) -> TestResult {
    let mut offset = 0;
    while offset < msg.len() {
        offset += socket.send(msg, msg.len() - offset, offset).completed("send")?;
    }
    Ok(())
}

/// Reads exactly `len` bytes.
pub fn receive_exact(socket: &SocketHandle, len: usize) -> TestResult<Vec<u8>> {
    let mut buf = vec![0; len];
    let mut offset = 0;
    while offset < len {
        let n = socket.receive(&mut buf, len - offset, offset).completed("receive")?;
        if n == 0 {
            bail!("peer hung up after {offset} of {len} bytes");
        }
        offset += n;
    }
    Ok(buf)
}

/// Polls `cond` until it holds or `timeout` runs out.
pub fn wait_until(
    what: &str,
    timeout: Duration,
    mut cond: impl FnMut() -> bool,
) -> TestResult {
    let deadline = Instant::now() + timeout;
    while !cond() {
        if Instant::now() > deadline {
            bail!("timed out waiting for {what}");
        }
        thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}

pub fn ensure_timeout<T: Debug>(opname: &str, r: io::Result<Option<T>>) -> TestResult {
    match r {
        Ok(None) => Ok(()),
        Ok(Some(val)) => bail!("{opname}: expected timeout, got {val:#?}"),
        Err(e) => Err(e).wrap_err_with(|| format!("{opname}: expected timeout")),
    }
}
