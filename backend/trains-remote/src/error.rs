use trains::participant::PlayerFault;

use std::{fmt, io};

/// Everything that can go wrong while talking over a connection.
#[derive(Debug)]
pub enum ProtocolError {
    Io(io::Error),
    /// The peer sent something that is not JSON.
    Json(serde_json::Error),
    /// The peer did not send anything in time.
    TimedOut,
    /// The connection was closed, possibly in the middle of a value.
    UnexpectedEof,
    /// A call to a method nobody knows about.
    UnknownMethod(String),
    /// A call, or an answer to one, that does not have the expected shape.
    BadArguments(String),
    /// The local player could not answer a call.
    Player(PlayerFault),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Io(error) => write!(f, "connection error: {}", error),
            ProtocolError::Json(error) => write!(f, "invalid JSON: {}", error),
            ProtocolError::TimedOut => write!(f, "timed out"),
            ProtocolError::UnexpectedEof => write!(f, "connection closed unexpectedly"),
            ProtocolError::UnknownMethod(method) => write!(f, "unknown method {}", method),
            ProtocolError::BadArguments(reason) => write!(f, "bad arguments: {}", reason),
            ProtocolError::Player(fault) => write!(f, "{}", fault),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Io(error) => Some(error),
            ProtocolError::Json(error) => Some(error),
            ProtocolError::Player(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<io::Error> for ProtocolError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            // Depending on the platform, a read timeout shows up as either of these.
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ProtocolError::TimedOut,
            io::ErrorKind::UnexpectedEof => ProtocolError::UnexpectedEof,
            _ => ProtocolError::Io(error),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(error: serde_json::Error) -> Self {
        if error.is_io() {
            return ProtocolError::Io(error.into());
        }
        ProtocolError::Json(error)
    }
}

impl From<ProtocolError> for PlayerFault {
    fn from(error: ProtocolError) -> Self {
        match error {
            ProtocolError::TimedOut => PlayerFault::TimedOut,
            ProtocolError::Io(_) | ProtocolError::UnexpectedEof => {
                PlayerFault::Disconnected(error.to_string())
            }
            ProtocolError::Player(fault) => fault,
            _ => PlayerFault::Malformed(error.to_string()),
        }
    }
}
