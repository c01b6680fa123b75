//! # Transport Primitives
//!
//! Timed connect, timed full-length read/write loops and a liveness probe
//! over Unix-domain or TCP stream sockets.
//!
//! Connects are issued on a non-blocking socket and bounded by a readiness
//! poll; the socket is switched back to blocking mode once connected. Each
//! read or write first waits for readiness, then loops partial transfers
//! until the full length has moved.

use crate::errors::TransportError;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::socket::{
    connect, socket, AddressFamily, SockFlag, SockType, SockaddrIn, SockaddrIn6, SockaddrLike,
    UnixAddr,
};
use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::debug;

/// Well-known local socket path.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/telematics-client.sock";

/// Where to connect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Endpoint {
    /// The well-known local socket path.
    #[default]
    DefaultLocal,
    /// An explicit Unix-domain socket path.
    Local(PathBuf),
    /// A TCP peer; the host is resolved synchronously.
    Remote { host: String, port: u16 },
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultLocal => write!(f, "{}", DEFAULT_SOCKET_PATH),
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

impl FromStr for Endpoint {
    type Err = std::convert::Infallible;

    /// `host:port` parses as `Remote`, an empty string or `default` as
    /// `DefaultLocal`, anything else as a socket path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("default") {
            return Ok(Self::DefaultLocal);
        }
        if !s.contains('/') {
            if let Some((host, port)) = s.rsplit_once(':') {
                if let Ok(port) = port.parse::<u16>() {
                    let host = host.trim_start_matches('[').trim_end_matches(']');
                    return Ok(Self::Remote {
                        host: host.to_string(),
                        port,
                    });
                }
            }
        }
        Ok(Self::Local(PathBuf::from(s)))
    }
}

/// Transfer direction of a timed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug)]
enum Stream {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Stream {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Unix(s) => Read::read(&mut &*s, buf),
            Self::Tcp(s) => Read::read(&mut &*s, buf),
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Unix(s) => Write::write(&mut &*s, buf),
            Self::Tcp(s) => Write::write(&mut &*s, buf),
        }
    }

    fn set_timeout(&self, direction: Direction, timeout: Duration) -> io::Result<()> {
        match (self, direction) {
            (Self::Unix(s), Direction::Read) => s.set_read_timeout(Some(timeout)),
            (Self::Unix(s), Direction::Write) => s.set_write_timeout(Some(timeout)),
            (Self::Tcp(s), Direction::Read) => s.set_read_timeout(Some(timeout)),
            (Self::Tcp(s), Direction::Write) => s.set_write_timeout(Some(timeout)),
        }
    }

    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            Self::Unix(s) => s.as_fd(),
            Self::Tcp(s) => s.as_fd(),
        }
    }
}

/// An open stream socket. Owned by whoever opened it; closed on drop.
#[derive(Debug)]
pub struct Connection {
    stream: Stream,
    peer: String,
}

impl Connection {
    /// Adopt a connected Unix-domain stream.
    #[must_use]
    pub fn from_unix(stream: UnixStream) -> Self {
        let peer = stream
            .peer_addr()
            .ok()
            .and_then(|addr| addr.as_pathname().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "unix:unnamed".to_string());
        Self {
            stream: Stream::Unix(stream),
            peer,
        }
    }

    /// Adopt a connected TCP stream.
    #[must_use]
    pub fn from_tcp(stream: TcpStream) -> Self {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "tcp:unknown".to_string());
        Self {
            stream: Stream::Tcp(stream),
            peer,
        }
    }

    /// Printable peer address.
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Zero-timeout readiness check. Reports false once the socket has a
    /// pending error or the peer has hung up. Nothing is read or written and
    /// the pending error is left in place, so repeated calls agree.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        match poll_events(self.stream.as_fd(), PollFlags::POLLOUT, Duration::ZERO) {
            Ok(Some(events)) => !events.intersects(PollFlags::POLLERR | PollFlags::POLLHUP),
            Ok(None) => true,
            Err(_) => false,
        }
    }

    /// Wait until the socket is readable. Returns false on timeout.
    pub fn wait_readable(&self, timeout: Duration) -> Result<bool, TransportError> {
        Ok(poll_ready(self.stream.as_fd(), PollFlags::POLLIN, timeout)?)
    }

    /// Read exactly `buf.len()` bytes.
    pub fn read_timed(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        let expected = buf.len();
        self.operate_timed(Direction::Read, expected, timeout, |done| {
            self.stream.read(&mut buf[done..])
        })
    }

    /// Write all of `buf`.
    pub fn write_timed(&self, buf: &[u8], timeout: Duration) -> Result<usize, TransportError> {
        self.operate_timed(Direction::Write, buf.len(), timeout, |done| {
            self.stream.write(&buf[done..])
        })
    }

    fn operate_timed(
        &self,
        direction: Direction,
        expected: usize,
        timeout: Duration,
        mut step: impl FnMut(usize) -> io::Result<usize>,
    ) -> Result<usize, TransportError> {
        if expected == 0 {
            return Ok(0);
        }

        let flags = match direction {
            Direction::Read => PollFlags::POLLIN,
            Direction::Write => PollFlags::POLLOUT,
        };
        if !poll_ready(self.stream.as_fd(), flags, timeout)? {
            return Err(TransportError::Timeout { direction, timeout });
        }
        // Bounds each partial call once the socket has become ready. Socket
        // timeouts reject a zero duration.
        if !timeout.is_zero() {
            self.stream.set_timeout(direction, timeout)?;
        }

        let mut transferred = 0;
        while transferred < expected {
            match step(transferred) {
                Ok(0) => break,
                Ok(n) => transferred += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(TransportError::Timeout { direction, timeout });
                }
                Err(e) => return Err(e.into()),
            }
        }

        if transferred < expected {
            return Err(TransportError::ShortTransfer {
                direction,
                transferred,
                expected,
            });
        }
        Ok(transferred)
    }
}

/// Wait for `flags` on `fd`, retrying on EINTR until `timeout` elapses.
pub(crate) fn poll_ready(
    fd: BorrowedFd<'_>,
    flags: PollFlags,
    timeout: Duration,
) -> io::Result<bool> {
    Ok(poll_events(fd, flags, timeout)?.is_some())
}

/// Like `poll_ready`, but hands back the returned events. `None` on timeout.
fn poll_events(
    fd: BorrowedFd<'_>,
    flags: PollFlags,
    timeout: Duration,
) -> io::Result<Option<PollFlags>> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let poll_timeout = PollTimeout::try_from(remaining).unwrap_or(PollTimeout::MAX);
        let mut fds = [PollFd::new(fd, flags)];
        match poll(&mut fds, poll_timeout) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(fds[0].revents().unwrap_or(flags))),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Connect to `endpoint` within `timeout`.
pub fn connect_timed(endpoint: &Endpoint, timeout: Duration) -> Result<Connection, TransportError> {
    let connection = match endpoint {
        Endpoint::DefaultLocal => connect_unix(Path::new(DEFAULT_SOCKET_PATH), timeout)?,
        Endpoint::Local(path) => connect_unix(path, timeout)?,
        Endpoint::Remote { host, port } => connect_tcp(host, *port, timeout)?,
    };
    debug!("[Transport] Connected to {}", endpoint);
    Ok(connection)
}

fn connect_unix(path: &Path, timeout: Duration) -> Result<Connection, TransportError> {
    let endpoint = path.display().to_string();
    let addr = UnixAddr::new(path).map_err(|e| connect_error(&endpoint, e.into()))?;
    let fd = connect_nonblocking(AddressFamily::Unix, &addr, timeout, &endpoint)?;

    let stream = UnixStream::from(fd);
    verify_connected(&endpoint, stream.take_error(), stream.peer_addr().map(drop))?;
    stream.set_nonblocking(false)?;
    Ok(Connection {
        stream: Stream::Unix(stream),
        peer: endpoint,
    })
}

fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<Connection, TransportError> {
    let endpoint = format!("{}:{}", host, port);
    let resolve_error = || TransportError::Resolve {
        host: host.to_string(),
        port,
    };
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|_| resolve_error())?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        let attempt = match addr {
            SocketAddr::V4(v4) => connect_nonblocking(
                AddressFamily::Inet,
                &SockaddrIn::from(v4),
                timeout,
                &endpoint,
            ),
            SocketAddr::V6(v6) => connect_nonblocking(
                AddressFamily::Inet6,
                &SockaddrIn6::from(v6),
                timeout,
                &endpoint,
            ),
        };
        let fd = match attempt {
            Ok(fd) => fd,
            Err(e) => {
                debug!("[Transport] {} via {} failed: {}", endpoint, addr, e);
                last_error = Some(e);
                continue;
            }
        };

        let stream = TcpStream::from(fd);
        let peer = stream.peer_addr().map(drop);
        if let Err(e) = verify_connected(&endpoint, stream.take_error(), peer) {
            last_error = Some(e);
            continue;
        }
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        return Ok(Connection {
            stream: Stream::Tcp(stream),
            peer: endpoint,
        });
    }

    Err(last_error.unwrap_or_else(resolve_error))
}

/// Issue a non-blocking connect and wait for writability. The descriptor is
/// closed on every error path by dropping it.
fn connect_nonblocking(
    family: AddressFamily,
    addr: &dyn SockaddrLike,
    timeout: Duration,
    endpoint: &str,
) -> Result<OwnedFd, TransportError> {
    let fd = socket(
        family,
        SockType::Stream,
        SockFlag::SOCK_NONBLOCK | SockFlag::SOCK_CLOEXEC,
        None,
    )
    .map_err(|e| connect_error(endpoint, e.into()))?;

    // A Unix-domain connect reports EAGAIN when the listener's backlog is
    // full; it is a failure, not a pending connect.
    match connect(fd.as_raw_fd(), addr) {
        Ok(()) => return Ok(fd),
        Err(Errno::EINPROGRESS | Errno::EINTR) => {}
        Err(e) => return Err(connect_error(endpoint, e.into())),
    }

    if !poll_ready(fd.as_fd(), PollFlags::POLLOUT, timeout)? {
        return Err(TransportError::ConnectTimeout {
            endpoint: endpoint.to_string(),
            timeout,
        });
    }
    Ok(fd)
}

/// Writability alone does not prove the handshake finished: surface any
/// pending socket error, then require a peer address.
fn verify_connected(
    endpoint: &str,
    pending: io::Result<Option<io::Error>>,
    peer: io::Result<()>,
) -> Result<(), TransportError> {
    if let Some(err) = pending? {
        return Err(connect_error(endpoint, err));
    }
    peer.map_err(|e| connect_error(endpoint, e))
}

fn connect_error(endpoint: &str, source: io::Error) -> TransportError {
    TransportError::Connect {
        endpoint: endpoint.to_string(),
        source,
    }
}
