//! Session identifiers.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session identifier must not be empty")]
    Empty,
}

/// Opaque, non-empty name of a shared whiteboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Result<Self, SessionError> {
        let id = id.into();
        if id.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rejected() {
        assert_eq!(SessionId::new(""), Err(SessionError::Empty));
    }

    #[test]
    fn test_opaque_value_kept() {
        let id: SessionId = "room 42/é".parse().unwrap();
        assert_eq!(id.as_str(), "room 42/é");
        assert_eq!(id.to_string(), "room 42/é");
    }
}
