use {
    crate::AddressFamily,
    std::{
        fmt::{self, Display, Formatter},
        io,
        net::{AddrParseError, IpAddr, SocketAddr},
    },
};

/// A host and port pair.
///
/// The host is a numeric IPv4 or IPv6 literal. An empty host stands for the wildcard address of
/// whatever family the socket it is used with has, which is what binding to "any interface"
/// looks like.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Numeric host address, or an empty string for the wildcard address.
    pub host: String,
    /// Port number. Zero asks the OS to pick one when binding.
    pub port: u16,
}
impl Endpoint {
    /// Creates an endpoint from a host string and a port.
    #[inline]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
    /// Creates a wildcard endpoint with the given port.
    #[inline]
    pub fn any(port: u16) -> Self { Self::new(String::new(), port) }

    /// Whether the host is empty.
    #[inline]
    pub fn is_wildcard(&self) -> bool { self.host.is_empty() }

    /// Resolves the endpoint to a socket address, using `family` to pick the wildcard address when
    /// the host is empty.
    ///
    /// The family of a non-empty host is whatever the literal is; checking it against a socket is
    /// left to the socket.
    pub fn to_socket_addr(&self, family: AddressFamily) -> Result<SocketAddr, EndpointError> {
        let ip = if self.host.is_empty() {
            family.wildcard().ok_or(EndpointError::UnspecifiedFamily)?
        } else {
            let host = self.host.trim_start_matches('[').trim_end_matches(']');
            host.parse::<IpAddr>()
                .map_err(|source| EndpointError::InvalidHost {
                    host: self.host.clone(),
                    source,
                })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}
impl From<SocketAddr> for Endpoint {
    #[inline]
    fn from(addr: SocketAddr) -> Self { Self::new(addr.ip().to_string(), addr.port()) }
}
impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Error produced when an [`Endpoint`] cannot be turned into a socket address.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EndpointError {
    /// The host is not a numeric IP address.
    #[error("`{host}` is not a numeric IP address")]
    InvalidHost {
        /// The offending host string.
        host: String,
        /// The parser's complaint.
        #[source]
        source: AddrParseError,
    },
    /// The host is empty and there is no address family to take the wildcard address of.
    #[error("cannot pick a wildcard address without an address family")]
    UnspecifiedFamily,
}
impl From<EndpointError> for io::Error {
    #[inline]
    fn from(e: EndpointError) -> Self { io::Error::new(io::ErrorKind::InvalidInput, e) }
}
