use thiserror::Error;

/// Structured classification of a remote API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An entity with the same unique key already exists.
    Conflict,
    NotFound,
    Unauthorized,
    RateLimited,
    /// 5xx response from the remote service.
    Server,
    /// Transport-level failure (connect, timeout, DNS).
    Network,
    /// Response body could not be decoded.
    Decode,
    Other,
}

/// Error returned by the ledger API client.
#[derive(Debug, Clone, Error)]
#[error("ledger api error ({kind:?}{}): {message}", status.map(|s| format!(", status {s}")).unwrap_or_default())]
pub struct ClientError {
    pub kind: ErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, None, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, None, message)
    }

    /// Classify an HTTP status plus response body into a structured error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            409 => ErrorKind::Conflict,
            404 => ErrorKind::NotFound,
            401 | 403 => ErrorKind::Unauthorized,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Other,
        };
        Self::new(kind, Some(status), message)
    }

    /// Whether this error means "the entity already exists".
    ///
    /// The structured kind is authoritative; the status/substring checks are
    /// kept as a fallback for remote services that only signal conflicts in
    /// the message text. The exact substrings are a compatibility contract
    /// with the remote API's wording.
    pub fn is_conflict(&self) -> bool {
        if self.kind == ErrorKind::Conflict || self.status == Some(409) {
            return true;
        }
        let message = self.message.to_lowercase();
        message.contains("already exists") || message.contains("conflict")
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::decode(err.to_string())
        } else {
            ClientError::network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_409_is_conflict() {
        let err = ClientError::from_status(409, "duplicate alias");
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.is_conflict());
    }

    #[test]
    fn message_substring_fallback() {
        let err = ClientError::new(ErrorKind::Other, Some(422), "Entity already exists");
        assert!(err.is_conflict());
        let err = ClientError::new(ErrorKind::Other, Some(400), "version CONFLICT detected");
        assert!(err.is_conflict());
    }

    #[test]
    fn unrelated_error_is_not_conflict() {
        let err = ClientError::from_status(500, "internal error");
        assert!(!err.is_conflict());
    }
}
