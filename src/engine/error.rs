use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Identifier does not resolve to a reservation.
    NotFound(Ulid),
    /// The requested period is unavailable for the room.
    Conflict,
    /// One or more rules violated; carries every violated-rule message, in
    /// rule order, never just the first.
    Validation(Vec<String>),
    /// A modification tried to change who placed the reservation.
    GuestMismatch,
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => {
                write!(f, "no reservation found for this identifier: {id}")
            }
            EngineError::Conflict => write!(f, "The selected period is not available."),
            EngineError::Validation(errors) => write!(f, "{}", errors.join("; ")),
            EngineError::GuestMismatch => {
                write!(f, "Changing the placer of the reservation is not allowed.")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
