//! Client for the policy-monitoring store.
//!
//! The store speaks a newline-framed text protocol: each query is one line
//! of the form `agent {id} sca {verb} {args}` and each reply is one line
//! whose leading token carries the response code (`ok`, `err`, `due`,
//! `ign`). [`StoreClient`] owns the stream socket, reconnects transparently,
//! and never surfaces transport errors to handlers; a failed round trip
//! after one reconnect attempt reports [`ResponseCode::Error`].

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, warn};

use rampart_config::SocketEndpoint;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

#[cfg(unix)]
use socket2::{Domain, SockAddr, Socket, Type};

/// Tracing target for store client operations.
pub(crate) const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

/// Deadline for establishing the store connection.
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for one reply; queries may scan large per-agent result sets.
const REPLY_TIMEOUT: Duration = Duration::from_secs(10);
const ROUND_TRIP_ATTEMPTS: usize = 2;

/// Response codes of the store protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    /// Query executed.
    Ok,
    /// Query accepted, more payload pending.
    Due,
    /// Query rejected by the store.
    Error,
    /// Query ignored by the store.
    Ignore,
    /// Reply could not be classified (including transport failures).
    Unknown,
}

/// Outcome of a `found …` / `not found` search query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    /// The store holds a matching entry.
    Found,
    /// The store holds no matching entry.
    NotFound,
    /// The query failed or the reply was unparseable.
    Error,
}

/// Query access to the policy-monitoring store.
///
/// The decoder reaches the store exclusively through this seam so behaviour
/// tests can substitute a scripted implementation.
pub trait PolicyStore {
    /// Executes one text query and returns the classified reply.
    ///
    /// The payload excludes the response-code token and its separator.
    fn query(&mut self, query: &str) -> (ResponseCode, Option<String>);
}

/// Stream carrying the newline-framed store dialogue.
///
/// Boxing behind one trait keeps the client free of per-transport plumbing;
/// the transport is decided once at dial time.
trait StoreStream: Read + Write {}

impl<T: Read + Write> StoreStream for T {}

/// Newline-framed text client for the policy-monitoring store.
pub struct StoreClient {
    endpoint: SocketEndpoint,
    connection: Option<BufReader<Box<dyn StoreStream>>>,
}

impl StoreClient {
    /// Creates a client for the given endpoint without connecting yet.
    #[must_use]
    pub fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            connection: None,
        }
    }

    /// Dials the configured endpoint with connect and reply deadlines.
    fn dial(&self) -> io::Result<Box<dyn StoreStream>> {
        match &self.endpoint {
            SocketEndpoint::Tcp { host, port } => {
                let address = (host.as_str(), *port).to_socket_addrs()?.next().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::AddrNotAvailable, "store host did not resolve")
                })?;
                let stream = TcpStream::connect_timeout(&address, DIAL_TIMEOUT)?;
                stream.set_read_timeout(Some(REPLY_TIMEOUT))?;
                stream.set_write_timeout(Some(REPLY_TIMEOUT))?;
                Ok(Box::new(stream))
            }
            SocketEndpoint::Unix { path } => {
                #[cfg(unix)]
                {
                    // std's UnixStream cannot dial with a deadline, so go
                    // through socket2 and convert.
                    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
                    socket.connect_timeout(&SockAddr::unix(path.as_str())?, DIAL_TIMEOUT)?;
                    let stream = UnixStream::from(std::os::fd::OwnedFd::from(socket));
                    stream.set_read_timeout(Some(REPLY_TIMEOUT))?;
                    stream.set_write_timeout(Some(REPLY_TIMEOUT))?;
                    Ok(Box::new(stream))
                }

                #[cfg(not(unix))]
                {
                    Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("unix endpoint '{path}' unsupported on this platform"),
                    ))
                }
            }
        }
    }

    fn ensure_connected(&mut self) -> io::Result<&mut BufReader<Box<dyn StoreStream>>> {
        if self.connection.is_none() {
            let stream = self.dial()?;
            debug!(
                target: STORE_TARGET,
                endpoint = %self.endpoint,
                "connected to policy-monitoring store"
            );
            self.connection = Some(BufReader::new(stream));
        }
        Ok(self
            .connection
            .as_mut()
            .unwrap_or_else(|| unreachable!("connection populated above")))
    }

    fn round_trip(&mut self, query: &str) -> io::Result<String> {
        let connection = self.ensure_connected()?;
        let stream = connection.get_mut();
        stream.write_all(query.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;

        let mut line = String::new();
        let read = connection.read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "store closed the connection",
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl PolicyStore for StoreClient {
    fn query(&mut self, query: &str) -> (ResponseCode, Option<String>) {
        for attempt in 1..=ROUND_TRIP_ATTEMPTS {
            match self.round_trip(query) {
                Ok(reply) => return parse_reply(&reply),
                Err(error) => {
                    // Drop the connection so the next attempt redials.
                    self.connection = None;
                    warn!(
                        target: STORE_TARGET,
                        endpoint = %self.endpoint,
                        attempt,
                        error = %error,
                        "store round trip failed"
                    );
                }
            }
        }
        (ResponseCode::Unknown, None)
    }
}

/// Classifies one reply line into a response code and its payload.
fn parse_reply(reply: &str) -> (ResponseCode, Option<String>) {
    let (token, payload) = match reply.split_once(' ') {
        Some((token, payload)) => (token, payload),
        None => (reply, ""),
    };
    let code = match token {
        "ok" => ResponseCode::Ok,
        "due" => ResponseCode::Due,
        "err" => ResponseCode::Error,
        "ign" => ResponseCode::Ignore,
        _ => return (ResponseCode::Unknown, None),
    };
    (code, Some(payload.to_string()))
}

/// Runs a search query and classifies its `found …` / `not found` payload.
///
/// With `parse_tail` the payload after the 6-character `found ` prefix is
/// returned; without it the tail is discarded. A reply that begins with
/// `found` but is too short to strip the prefix is reported as an error.
pub fn search<S: PolicyStore + ?Sized>(
    store: &mut S,
    query: &str,
    parse_tail: bool,
) -> (SearchResult, String) {
    let (code, payload) = store.query(query);
    let Some(payload) = payload else {
        return (SearchResult::Error, String::new());
    };
    if code != ResponseCode::Ok {
        return (SearchResult::Error, String::new());
    }

    if payload.starts_with("found") {
        match payload.get("found ".len()..) {
            Some(tail) if parse_tail => (SearchResult::Found, tail.to_string()),
            Some(_) => (SearchResult::Found, String::new()),
            None => {
                warn!(
                    target: STORE_TARGET,
                    payload = %payload,
                    query,
                    "truncated 'found' reply"
                );
                (SearchResult::Error, String::new())
            }
        }
    } else if payload.starts_with("not found") {
        (SearchResult::NotFound, String::new())
    } else {
        (SearchResult::Error, String::new())
    }
}
