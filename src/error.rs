//! Errors returned by `enip-motion` operations.

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers.
///
/// Transient transport errors inside the cyclic sender are deliberately
/// *not* represented here: per the driver's propagation policy they never
/// reach the caller, they drive the reconnect loop and are only logged.
/// Likewise a command-engine timeout is not an error, it is reported as
/// `false` from the operation that observed it.
#[derive(Debug)]
pub enum Error {
    /// RegisterSession or ForwardOpen failed: non-zero status, unparseable
    /// reply, or a zero session handle / connection id.
    Handshake(String),
    /// A send was attempted without a valid session and connection id.
    NotConnected,
    /// Invalid configuration: a malformed `keep` argument, a payload of the
    /// wrong length, an out-of-range RPI, etc.
    Config(String),
    /// I/O failure at an API boundary (`connect`, `close`, a one-shot send).
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Handshake(msg) => write!(f, "ENIP handshake failed: {msg}"),
            Error::NotConnected => write!(f, "not connected to drive"),
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
