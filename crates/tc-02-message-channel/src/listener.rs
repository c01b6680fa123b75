//! # Message Listener
//!
//! Accepts inbound connections on a Unix path or TCP address and serves each
//! one on its own thread, handing every decoded message to a
//! [`MessageHandler`]. The accept loop polls with a short timeout so that
//! [`MessageListener::stop`] is observed promptly.

use crate::channel::MessageChannel;
use crate::errors::{ChannelError, TransportError};
use crate::message::Message;
use crate::transport::{poll_ready, Connection, Endpoint};
use nix::poll::PollFlags;
use parking_lot::Mutex;
use shared_types::{ManagedThread, ThreadContext};
use std::fs;
use std::io::{self, ErrorKind};
use std::net::TcpListener;
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SESSION_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Receives every message that arrives on an accepted connection.
pub trait MessageHandler: Send + Sync + 'static {
    fn on_message(&self, channel: &MessageChannel, message: Message);
}

impl<F> MessageHandler for F
where
    F: Fn(&MessageChannel, Message) + Send + Sync + 'static,
{
    fn on_message(&self, channel: &MessageChannel, message: Message) {
        self(channel, message)
    }
}

enum Acceptor {
    Unix(UnixListener),
    Tcp(TcpListener),
}

impl Acceptor {
    fn fd(&self) -> BorrowedFd<'_> {
        match self {
            Self::Unix(l) => l.as_fd(),
            Self::Tcp(l) => l.as_fd(),
        }
    }

    fn accept(&self) -> io::Result<Connection> {
        match self {
            Self::Unix(l) => l.accept().map(|(stream, _)| Connection::from_unix(stream)),
            Self::Tcp(l) => l.accept().map(|(stream, _)| {
                // Best effort; Nagle only affects latency.
                let _ = stream.set_nodelay(true);
                Connection::from_tcp(stream)
            }),
        }
    }
}

struct Shared {
    channel: Arc<MessageChannel>,
    handler: Arc<dyn MessageHandler>,
    sessions: Mutex<Vec<ManagedThread>>,
    next_session: AtomicU64,
}

/// A bound listener with its accept thread.
pub struct MessageListener {
    endpoint: Endpoint,
    socket_path: Option<PathBuf>,
    accept_thread: ManagedThread,
    shared: Arc<Shared>,
    stopped: AtomicBool,
}

impl MessageListener {
    /// Bind `endpoint` and start accepting.
    ///
    /// `DefaultLocal` resolves through the channel's configuration. A stale
    /// socket file left at a Unix path is removed first.
    pub fn bind(
        endpoint: &Endpoint,
        channel: Arc<MessageChannel>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Self, TransportError> {
        let (acceptor, endpoint, socket_path) = match channel.config().resolve(endpoint) {
            Endpoint::Local(path) => bind_unix(path)?,
            Endpoint::DefaultLocal => bind_unix(channel.config().default_socket_path.clone())?,
            Endpoint::Remote { host, port } => {
                let listener = TcpListener::bind((host.as_str(), port))?;
                let local = listener.local_addr()?;
                (
                    Acceptor::Tcp(listener),
                    Endpoint::Remote {
                        host: local.ip().to_string(),
                        port: local.port(),
                    },
                    None,
                )
            }
        };

        let shared = Arc::new(Shared {
            channel,
            handler,
            sessions: Mutex::new(Vec::new()),
            next_session: AtomicU64::new(1),
        });

        let accept_thread = {
            let shared = Arc::clone(&shared);
            ManagedThread::start("message-listener", move |ctx| {
                accept_loop(&ctx, &acceptor, &shared)
            })?
        };

        info!("[Listener] Listening on {}", endpoint);
        Ok(Self {
            endpoint,
            socket_path,
            accept_thread,
            shared,
            stopped: AtomicBool::new(false),
        })
    }

    /// The bound address. For TCP this carries the actual port.
    #[must_use]
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Number of sessions whose threads are still running.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.shared
            .sessions
            .lock()
            .iter()
            .filter(|s| s.is_running())
            .count()
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop accepting, wind down every session and remove the socket file.
    /// Safe to call more than once.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.accept_thread.stop();
        self.accept_thread.join();

        let sessions: Vec<ManagedThread> = self.shared.sessions.lock().drain(..).collect();
        for session in &sessions {
            session.stop();
        }
        for session in &sessions {
            session.join();
        }

        if let Some(path) = &self.socket_path {
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!("[Listener] Failed to remove {}: {}", path.display(), e);
                }
            }
        }
        info!("[Listener] Stopped listening on {}", self.endpoint);
    }
}

impl Drop for MessageListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn bind_unix(path: PathBuf) -> io::Result<(Acceptor, Endpoint, Option<PathBuf>)> {
    remove_stale_socket(&path)?;
    let listener = UnixListener::bind(&path)?;
    Ok((
        Acceptor::Unix(listener),
        Endpoint::Local(path.clone()),
        Some(path),
    ))
}

fn remove_stale_socket(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            debug!("[Listener] Removing stale socket {}", path.display());
            fs::remove_file(path)
        }
        Ok(_) => Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} exists and is not a socket", path.display()),
        )),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn accept_loop(ctx: &ThreadContext, acceptor: &Acceptor, shared: &Arc<Shared>) {
    while !ctx.is_stop_requested() {
        match poll_ready(acceptor.fd(), PollFlags::POLLIN, ACCEPT_POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("[Listener] Poll failed: {}", e);
                ctx.sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
        }

        let connection = match acceptor.accept() {
            Ok(connection) => Arc::new(connection),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("[Listener] Accept failed: {}", e);
                continue;
            }
        };

        let id = shared.next_session.fetch_add(1, Ordering::Relaxed);
        debug!("[Listener] Session {} opened from {}", id, connection.peer());

        let session = {
            let shared = Arc::clone(shared);
            ManagedThread::start(format!("message-session-{}", id), move |ctx| {
                serve(&ctx, &connection, &shared)
            })
        };
        match session {
            Ok(session) => {
                let mut sessions = shared.sessions.lock();
                sessions.retain(ManagedThread::is_running);
                sessions.push(session);
            }
            Err(e) => warn!("[Listener] Failed to start session {}: {}", id, e),
        }
    }
}

fn serve(ctx: &ThreadContext, connection: &Arc<Connection>, shared: &Shared) {
    while !ctx.is_stop_requested() {
        match connection.wait_readable(SESSION_POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("[Listener] {}: {}", ctx.name(), e);
                break;
            }
        }

        match shared.channel.receive(connection) {
            Ok(message) => shared.handler.on_message(&shared.channel, message),
            Err(ChannelError::Transport(e)) if e.is_peer_closed() => break,
            Err(e) => {
                warn!("[Listener] {} dropped: {}", ctx.name(), e);
                break;
            }
        }
    }
    debug!("[Listener] {} closed", ctx.name());
}
