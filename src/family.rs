use {
    crate::sys,
    std::{
        fmt::{self, Display, Formatter},
        net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    },
};

/// Address family of a socket.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AddressFamily {
    /// The family of a socket that has not been opened, or has been closed.
    #[default]
    Unspecified = 0,
    /// IPv4.
    IPv4 = 1,
    /// IPv6.
    IPv6 = 2,
}
impl AddressFamily {
    /// Returns the family of the given address.
    #[inline]
    pub const fn of(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(..) => Self::IPv4,
            SocketAddr::V6(..) => Self::IPv6,
        }
    }
    /// Returns `true` for [`IPv4`](Self::IPv4) and [`IPv6`](Self::IPv6).
    #[inline]
    pub const fn is_specified(self) -> bool { !matches!(self, Self::Unspecified) }

    /// The wildcard address of the family, or `None` for [`Unspecified`](Self::Unspecified).
    pub const fn wildcard(self) -> Option<IpAddr> {
        match self {
            Self::Unspecified => None,
            Self::IPv4 => Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            Self::IPv6 => Some(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
        }
    }

    pub(crate) const fn native(self) -> i32 {
        match self {
            Self::Unspecified => sys::AF_UNSPEC,
            Self::IPv4 => sys::AF_INET,
            Self::IPv6 => sys::AF_INET6,
        }
    }

    pub(crate) const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::IPv4,
            2 => Self::IPv6,
            _ => Self::Unspecified,
        }
    }
}
impl Display for AddressFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unspecified => "unspecified",
            Self::IPv4 => "IPv4",
            Self::IPv6 => "IPv6",
        })
    }
}

/// Transport type of a socket.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SocketType {
    /// Connection-oriented byte stream (TCP).
    Stream,
    /// Connectionless datagrams (UDP).
    Datagram,
}
impl SocketType {
    pub(crate) const fn native(self) -> i32 {
        match self {
            Self::Stream => sys::SOCK_STREAM,
            Self::Datagram => sys::SOCK_DGRAM,
        }
    }
    /// The protocol number this type uses by default.
    pub(crate) const fn default_protocol(self) -> i32 {
        match self {
            Self::Stream => sys::IPPROTO_TCP,
            Self::Datagram => sys::IPPROTO_UDP,
        }
    }
}
