/// Per-request visitor session
///
/// Resolved once from the request (bearer token, device header) and passed
/// explicitly to the passport and unlock operations.
use crate::error::DistimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of an anonymous browser, generated client-side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for DeviceId {
    type Err = DistimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(DeviceId)
            .map_err(|_| DistimError::Validation(format!("Invalid device id: {}", s)))
    }
}

/// Visitor role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Visitor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Visitor => "visitor",
            Role::Admin => "admin",
        }
    }

    /// Map a role claim to a role; only "admin" (any case) grants Admin
    pub fn from_claim(claim: Option<&str>) -> Self {
        match claim {
            Some(value) if value.trim().eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Visitor,
        }
    }

    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: Role) -> bool {
        self >= &required
    }
}

/// Who is making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthSession {
    Anonymous { device: Option<DeviceId> },
    Authenticated { user_id: String, role: Role },
}

impl AuthSession {
    pub fn anonymous(device: Option<DeviceId>) -> Self {
        AuthSession::Anonymous { device }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthSession::Authenticated { user_id, .. } => Some(user_id),
            AuthSession::Anonymous { .. } => None,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            AuthSession::Authenticated { role, .. } => *role,
            AuthSession::Anonymous { .. } => Role::Visitor,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role().can_act_as(Role::Admin)
    }
}
