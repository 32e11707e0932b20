use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use hush_types::SessionMode;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password. Please try again.")]
    InvalidCredentials,
}

/// Proof that a user passed the credential gate, and the mode their chat
/// session must run in. Only `CredentialTable::authenticate` creates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    participant: String,
    mode: SessionMode,
}

impl Grant {
    pub fn participant(&self) -> &str {
        &self.participant
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }
}

/// Fixed username -> password table. No registration, no hashing.
///
/// Regular users get live sessions. The single reviewer credential gets a
/// simulated session that never touches the relay.
#[derive(Debug, Clone)]
pub struct CredentialTable {
    users: HashMap<String, String>,
    reviewer: Option<(String, String)>,
}

impl Default for CredentialTable {
    fn default() -> Self {
        Self::new()
            .with_user("Kunal", "Lanuk")
            .with_user("friend", "Dhanera")
            .with_reviewer("reviewer", "calc-review")
    }
}

impl CredentialTable {
    /// An empty table that rejects everyone.
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            reviewer: None,
        }
    }

    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(username.into(), password.into());
        self
    }

    pub fn with_reviewer(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.reviewer = Some((username.into(), password.into()));
        self
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<Grant, AuthError> {
        if let Some((reviewer, reviewer_password)) = &self.reviewer {
            if username == reviewer && password == reviewer_password {
                info!("{} authenticated (simulated session)", username);
                return Ok(Grant {
                    participant: username.to_string(),
                    mode: SessionMode::Simulated,
                });
            }
        }

        match self.users.get(username) {
            Some(expected) if expected == password => {
                info!("{} authenticated (live session)", username);
                Ok(Grant {
                    participant: username.to_string(),
                    mode: SessionMode::Live,
                })
            }
            _ => {
                warn!("Rejected login for '{}'", username);
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_users_get_live_sessions() {
        let table = CredentialTable::default();

        let grant = table.authenticate("Kunal", "Lanuk").unwrap();
        assert_eq!(grant.participant(), "Kunal");
        assert_eq!(grant.mode(), SessionMode::Live);

        let grant = table.authenticate("friend", "Dhanera").unwrap();
        assert_eq!(grant.mode(), SessionMode::Live);
    }

    #[test]
    fn reviewer_gets_simulated_session() {
        let grant = CredentialTable::default()
            .authenticate("reviewer", "calc-review")
            .unwrap();
        assert_eq!(grant.participant(), "reviewer");
        assert_eq!(grant.mode(), SessionMode::Simulated);
    }

    #[test]
    fn wrong_password_and_unknown_user_are_rejected() {
        let table = CredentialTable::default();
        assert_eq!(
            table.authenticate("Kunal", "lanuk"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            table.authenticate("kunal", "Lanuk"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            table.authenticate("reviewer", "Lanuk"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(table.authenticate("", ""), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn failure_message_is_user_facing() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid username or password. Please try again."
        );
    }

    #[test]
    fn empty_table_rejects_everyone() {
        assert!(CredentialTable::new().authenticate("Kunal", "Lanuk").is_err());
    }
}
