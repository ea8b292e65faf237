/// Category of a collaborator error. Lets the pipeline decide what is
/// fatal (config at startup) and what is only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid configuration — permanent, fail at startup.
    Config,
    /// I/O or network error — transient, the client may reconnect.
    Io,
    /// Peer answered with something we could not accept (bad status, bad body).
    Format,
    /// Client already closed.
    Closed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => f.write_str("config"),
            ErrorKind::Io => f.write_str("io"),
            ErrorKind::Format => f.write_str("format"),
            ErrorKind::Closed => f.write_str("closed"),
        }
    }
}

/// Unified error type for transport and sink clients.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientError {
    kind: ErrorKind,
    message: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    /// Configuration error — permanent, fail at startup.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    /// I/O error — transient.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, msg)
    }

    pub fn format_err(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format, msg)
    }

    pub fn closed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Closed, msg)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}
