use {
    super::SocketHandle,
    crate::{
        misc::{io_slice, io_slice_mut, TimeoutExt},
        sys, Endpoint,
    },
    std::{io, net::SocketAddr},
};

/// Data transfer.
///
/// Every method transfers at most `length` bytes starting at `buf[offset]` and returns how many
/// were transferred, or `Ok(None)` if the operation timed out or would have blocked.
///
/// # Panics
/// If the lineage is not open, or if `offset + length` is past the end of `buf`.
impl SocketHandle {
    /// Sends data on a connected socket.
    #[track_caller]
    pub fn send(&self, buf: &[u8], length: usize, offset: usize) -> io::Result<Option<usize>> {
        let fd = self.opened_fd();
        sys::send(fd, io_slice(buf, length, offset)).none_on_timeout()
    }

    /// Sends a datagram to `addr`.
    ///
    /// # Panics
    /// Additionally, if `addr` is of a different family than the socket.
    #[track_caller]
    pub fn send_to(
        &self,
        buf: &[u8],
        length: usize,
        offset: usize,
        addr: SocketAddr,
    ) -> io::Result<Option<usize>> {
        let fd = self.opened_fd();
        self.assert_family(&addr);
        sys::send_to(fd, io_slice(buf, length, offset), &addr).none_on_timeout()
    }
    /// Like [`send_to`](Self::send_to), but takes an [`Endpoint`].
    #[track_caller]
    pub fn send_to_endpoint(
        &self,
        buf: &[u8],
        length: usize,
        offset: usize,
        endpoint: &Endpoint,
    ) -> io::Result<Option<usize>> {
        let addr = self.resolve(endpoint)?;
        self.send_to(buf, length, offset, addr)
    }

    /// Receives data from a connected socket. `Ok(Some(0))` means the peer closed the connection.
    #[track_caller]
    pub fn receive(
        &self,
        buf: &mut [u8],
        length: usize,
        offset: usize,
    ) -> io::Result<Option<usize>> {
        let fd = self.opened_fd();
        sys::recv(fd, io_slice_mut(buf, length, offset)).none_on_timeout()
    }

    /// Receives a datagram along with the address of its sender.
    #[track_caller]
    pub fn receive_from(
        &self,
        buf: &mut [u8],
        length: usize,
        offset: usize,
    ) -> io::Result<Option<(usize, SocketAddr)>> {
        let fd = self.opened_fd();
        let rslt = sys::recv_from(fd, io_slice_mut(buf, length, offset)).none_on_timeout()?;
        if let Some((_, from)) = &rslt {
            self.assert_family(from);
        }
        Ok(rslt)
    }
    /// Like [`receive_from`](Self::receive_from), but returns the sender as an [`Endpoint`].
    #[track_caller]
    pub fn receive_from_endpoint(
        &self,
        buf: &mut [u8],
        length: usize,
        offset: usize,
    ) -> io::Result<Option<(usize, Endpoint)>> {
        Ok(self
            .receive_from(buf, length, offset)?
            .map(|(n, from)| (n, from.into())))
    }
}
