use std::fmt;

/// Lifecycle of one bridged session.
///
/// `Closed` and `Errored` are terminal: a bridge reaches each at most once
/// and never leaves it. Recovery means building a new bridge over a new
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No connection has been opened yet.
    Unopened,
    /// The connection is established and bytes flow both ways.
    Open,
    /// The remote side closed the connection with the given code.
    Closed(u16),
    /// The transport failed (handshake refused, mid-session error).
    Errored(String),
}

impl SessionState {
    /// Whether input may be forwarded and output applied.
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open)
    }

    /// Whether the session has ended. Terminal states are sticky.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed(_) | SessionState::Errored(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unopened => write!(f, "unopened"),
            SessionState::Open => write!(f, "open"),
            SessionState::Closed(code) => write!(f, "closed (code {code})"),
            SessionState::Errored(reason) => write!(f, "errored: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_neither_unopened_nor_terminal() {
        assert!(SessionState::Open.is_open());
        assert!(!SessionState::Open.is_terminal());
        assert!(!SessionState::Unopened.is_open());
        assert!(!SessionState::Unopened.is_terminal());
    }

    #[test]
    fn closed_and_errored_are_terminal() {
        assert!(SessionState::Closed(1000).is_terminal());
        assert!(SessionState::Errored("refused".into()).is_terminal());
        assert!(!SessionState::Closed(1000).is_open());
    }

    #[test]
    fn display_includes_close_code() {
        assert_eq!(SessionState::Closed(1006).to_string(), "closed (code 1006)");
        assert_eq!(SessionState::Unopened.to_string(), "unopened");
        assert_eq!(
            SessionState::Errored("boom".into()).to_string(),
            "errored: boom"
        );
    }
}
