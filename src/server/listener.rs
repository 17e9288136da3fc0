//! TCP listener construction
//!
//! Builds the listening socket step by step so socket options can be applied
//! before `listen(2)`:
//! resolve -> socket -> IPV6_V6ONLY off (wildcard only) -> SO_REUSEADDR
//! -> IP_TRANSPARENT (optional) -> bind -> listen
//!
//! The first failing step is reported and nothing after it runs.

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, ToSocketAddrs};
use thiserror::Error;
use tracing::debug;

/// Pending connection queue length passed to `listen(2)`
const LISTEN_BACKLOG: i32 = 1024;

/// Options applied to the socket before it starts listening
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Set IP_TRANSPARENT so connections to non-local addresses are accepted
    pub transparent: bool,
}

/// Listener creation failures
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid listen address {addr:?}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("listen address {0:?} resolved to no addresses")]
    NoAddress(String),

    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),

    #[error("failed to set socket option {option}: {source}")]
    SocketOption {
        option: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("socket option {0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Resolve a `host:port` address
///
/// An empty host (`:5678`) means the IPv6 wildcard, which
/// [`create_listener`] opens dual-stack.
pub fn resolve_addr(addr: &str) -> Result<SocketAddr, ListenerError> {
    if let Some(port) = addr.strip_prefix(':') {
        let port = port
            .parse::<u16>()
            .map_err(|e| ListenerError::Resolve {
                addr: addr.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, e),
            })?;
        return Ok(SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)));
    }

    addr.to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            addr: addr.to_string(),
            source,
        })?
        .next()
        .ok_or_else(|| ListenerError::NoAddress(addr.to_string()))
}

/// Create a non-blocking TCP listener bound to `addr`
///
/// The returned listener is ready to be handed to
/// `tokio::net::TcpListener::from_std`.
pub fn create_listener(addr: &str, opts: ListenerOptions) -> Result<TcpListener, ListenerError> {
    let (socket, addr) = open_socket(resolve_addr(addr)?)?;

    if is_ipv6_wildcard(addr) {
        // Accept IPv4 too, as v4-mapped addresses
        socket
            .set_only_v6(false)
            .map_err(|source| ListenerError::SocketOption {
                option: "IPV6_V6ONLY",
                source,
            })?;
    }

    socket
        .set_reuse_address(true)
        .map_err(|source| ListenerError::SocketOption {
            option: "SO_REUSEADDR",
            source,
        })?;

    if opts.transparent {
        set_transparent(&socket)?;
        debug!(%addr, "IP_TRANSPARENT enabled on listener");
    }

    socket
        .set_nonblocking(true)
        .map_err(|source| ListenerError::SocketOption {
            option: "O_NONBLOCK",
            source,
        })?;

    socket
        .bind(&SockAddr::from(addr))
        .map_err(|source| ListenerError::Bind { addr, source })?;

    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|source| ListenerError::Listen { addr, source })?;

    Ok(socket.into())
}

/// Create the socket for `addr`, returning the address it should bind
///
/// The IPv6 wildcard falls back to the IPv4 wildcard when the host has no
/// IPv6 support (EAFNOSUPPORT); any other failure is reported as is.
fn open_socket(addr: SocketAddr) -> Result<(Socket, SocketAddr), ListenerError> {
    match Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP)) {
        Ok(socket) => Ok((socket, addr)),
        Err(e) if is_ipv6_wildcard(addr) && is_family_unsupported(&e) => {
            let fallback = SocketAddr::from((Ipv4Addr::UNSPECIFIED, addr.port()));
            debug!(%fallback, "IPv6 unavailable, listening on IPv4 only");

            let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
                .map_err(ListenerError::Socket)?;
            Ok((socket, fallback))
        }
        Err(e) => Err(ListenerError::Socket(e)),
    }
}

fn is_ipv6_wildcard(addr: SocketAddr) -> bool {
    addr.is_ipv6() && addr.ip().is_unspecified()
}

#[cfg(unix)]
fn is_family_unsupported(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EAFNOSUPPORT)
}

#[cfg(not(unix))]
fn is_family_unsupported(_err: &io::Error) -> bool {
    false
}

#[cfg(any(target_os = "android", target_os = "fuchsia", target_os = "linux"))]
fn set_transparent(socket: &Socket) -> Result<(), ListenerError> {
    // SOL_IP / IP_TRANSPARENT; needs CAP_NET_ADMIN
    socket
        .set_ip_transparent(true)
        .map_err(|source| ListenerError::SocketOption {
            option: "IP_TRANSPARENT",
            source,
        })
}

#[cfg(not(any(target_os = "android", target_os = "fuchsia", target_os = "linux")))]
fn set_transparent(_socket: &Socket) -> Result<(), ListenerError> {
    Err(ListenerError::Unsupported("IP_TRANSPARENT"))
}
