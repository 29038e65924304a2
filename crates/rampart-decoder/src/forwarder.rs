//! Client for the dump-request forwarder socket.
//!
//! Dump requests ask an agent to re-send its full set of check results so
//! the local store can resynchronize. The sink is a connectionful Unix
//! datagram socket; the client connects on demand and tears the connection
//! down after a send error so the next request redials. Forwarder failures
//! are never fatal to the event being decoded.

use tracing::warn;

use camino::{Utf8Path, Utf8PathBuf};

#[cfg(unix)]
use std::os::unix::net::UnixDatagram;

/// Tracing target for forwarder operations.
pub(crate) const FORWARD_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::forward");

/// Largest datagram payload the sink accepts.
const MAX_MESSAGE_LEN: usize = 65536;

/// Outcome of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The message was handed to the socket.
    Success,
    /// The message exceeds the datagram payload ceiling.
    SizeTooLong,
    /// The socket rejected the send.
    SocketError,
}

/// Write access to the dump-request sink.
///
/// The decoder reaches the sink exclusively through this seam so behaviour
/// tests can substitute a recording implementation.
pub trait DumpSink {
    /// Returns true while a connection is established.
    fn is_connected(&self) -> bool;

    /// Establishes the connection.
    fn connect(&mut self) -> std::io::Result<()>;

    /// Sends one message over the established connection.
    fn send(&mut self, message: &str) -> SendStatus;

    /// Drops the connection so the next [`DumpSink::connect`] redials.
    fn disconnect(&mut self);
}

/// Unix-datagram client for the dump-request sink.
#[derive(Debug)]
pub struct DumpForwarder {
    path: Utf8PathBuf,
    #[cfg(unix)]
    socket: Option<UnixDatagram>,
}

impl DumpForwarder {
    /// Creates a client for the given socket path without connecting yet.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            #[cfg(unix)]
            socket: None,
        }
    }

    /// Returns the sink's socket path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[cfg(unix)]
impl DumpSink for DumpForwarder {
    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn connect(&mut self) -> std::io::Result<()> {
        let socket = UnixDatagram::unbound()?;
        socket.connect(self.path.as_std_path())?;
        self.socket = Some(socket);
        Ok(())
    }

    fn send(&mut self, message: &str) -> SendStatus {
        if message.len() > MAX_MESSAGE_LEN {
            return SendStatus::SizeTooLong;
        }
        let Some(socket) = &self.socket else {
            return SendStatus::SocketError;
        };
        match socket.send(message.as_bytes()) {
            Ok(_) => SendStatus::Success,
            Err(error) if error.raw_os_error() == Some(libc::EMSGSIZE) => SendStatus::SizeTooLong,
            Err(_) => SendStatus::SocketError,
        }
    }

    fn disconnect(&mut self) {
        self.socket = None;
    }
}

#[cfg(not(unix))]
impl DumpSink for DumpForwarder {
    fn is_connected(&self) -> bool {
        false
    }

    fn connect(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "datagram forwarding requires unix domain sockets",
        ))
    }

    fn send(&mut self, _message: &str) -> SendStatus {
        SendStatus::SocketError
    }

    fn disconnect(&mut self) {}
}

/// Requests a database dump for one policy from the reporting agent.
///
/// Connects on demand; a connect failure logs and gives up without failing
/// the event. An oversized message logs and is dropped. A socket error logs
/// and tears the connection down so the next request redials. Successful
/// sends are silent.
pub fn push_dump_request<F: DumpSink + ?Sized>(
    sink: &mut F,
    agent_id: &str,
    policy_id: &str,
    first_scan: bool,
) {
    if !sink.is_connected() {
        if let Err(error) = sink.connect() {
            warn!(
                target: FORWARD_TARGET,
                agent_id,
                error = %error,
                "cannot connect to dump-request sink"
            );
            return;
        }
    }

    let flag = if first_scan { "1" } else { "0" };
    let message = format!("{agent_id}:sca-dump:{policy_id}:{flag}");

    match sink.send(&message) {
        SendStatus::Success => {}
        SendStatus::SizeTooLong => {
            warn!(
                target: FORWARD_TARGET,
                agent_id,
                message = %message,
                "dump request exceeds the datagram ceiling"
            );
        }
        SendStatus::SocketError => {
            warn!(
                target: FORWARD_TARGET,
                agent_id,
                policy_id,
                "dump request send failed"
            );
            // Force a redial on the next request.
            sink.disconnect();
        }
    }
}
