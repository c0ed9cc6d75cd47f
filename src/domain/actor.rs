use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Acting User - explicit caller identity for every core operation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Support,
    Technician,
}

/// The user on whose behalf an operation runs, supplied by the auth collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActingUser {
    pub email: String,
    pub role: Role,
}

impl ActingUser {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into().trim().to_lowercase(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Who is acting, and the instant the operation is considered to happen at
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub actor: ActingUser,
    pub at: DateTime<Utc>,
}

impl OperationContext {
    pub fn new(actor: ActingUser) -> Self {
        Self { actor, at: Utc::now() }
    }

    /// Pin the operation time (tests, replays)
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}
