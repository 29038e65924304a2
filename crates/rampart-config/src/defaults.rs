use camino::Utf8PathBuf;

#[cfg(unix)]
use std::env;

#[cfg(unix)]
use dirs::runtime_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::socket::SocketEndpoint;

/// Default TCP port for the store when Unix domain sockets are unavailable.
pub const DEFAULT_STORE_TCP_PORT: u16 = 7410;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default JSON-pointer prefix under which agent events arrive.
pub const DEFAULT_EVENT_PREFIX: &str = "/event/original";

/// Default JSON-pointer path holding the reporting agent's identifier.
pub const DEFAULT_AGENT_ID_PATH: &str = "/agent/id";

/// Default JSON-pointer path receiving the decode verdict.
pub const DEFAULT_DECODED_FLAG_PATH: &str = "/rampart/sca_decoded";

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default logging format.
pub fn default_log_format() -> crate::LogFormat {
    crate::LogFormat::Json
}

/// Computes the default endpoint of the policy-monitoring store.
pub fn default_store_endpoint() -> SocketEndpoint {
    #[cfg(unix)]
    {
        SocketEndpoint::unix(runtime_base().join("store.sock"))
    }

    #[cfg(not(unix))]
    {
        SocketEndpoint::tcp("127.0.0.1", DEFAULT_STORE_TCP_PORT)
    }
}

/// Computes the default path of the dump-request forwarder socket.
#[cfg(unix)]
pub fn default_dump_socket() -> Utf8PathBuf {
    runtime_base().join("dump.sock")
}

/// Datagram forwarding requires Unix domain sockets; other platforms must
/// configure the path explicitly.
#[cfg(not(unix))]
pub fn default_dump_socket() -> Utf8PathBuf {
    Utf8PathBuf::from("dump.sock")
}

/// Resolves the directory both default sockets live under.
///
/// The user's runtime directory is preferred; without one, a uid-scoped
/// subtree of the system temp directory keeps concurrent users from
/// sharing sockets.
#[cfg(unix)]
fn runtime_base() -> Utf8PathBuf {
    if let Some(dir) = runtime_dir().and_then(|path| Utf8PathBuf::from_path_buf(path).ok()) {
        return dir.join("rampart");
    }

    let tmp = Utf8PathBuf::from_path_buf(env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"));
    let uid = unsafe { geteuid() };
    tmp.join(format!("rampart-{uid}"))
}
