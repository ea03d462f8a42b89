//! # Profiles
//!
//! Back-office accounts, stored as rows of the `profiles` table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Back-office role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Profile as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Profile row including the Argon2id hash
#[derive(Debug, Clone, Deserialize)]
pub struct StoredProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub password_hash: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl StoredProfile {
    /// Drop the hash
    pub fn into_profile(self) -> Profile {
        Profile {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// User login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_roundtrip() {
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), json!("admin"));
        assert_eq!("staff".parse::<Role>().unwrap(), Role::Staff);
        assert!("root".parse::<Role>().is_err());
        assert!(Role::Admin.is_admin());
        assert!(!Role::Staff.is_admin());
    }

    #[test]
    fn test_public_profile_has_no_hash() {
        let stored: StoredProfile = serde_json::from_value(json!({
            "id": "u1",
            "email": "admin@clinic.org",
            "role": "admin",
            "password_hash": "$argon2id$secret",
        }))
        .unwrap();

        let value = serde_json::to_value(stored.into_profile()).unwrap();
        assert_eq!(value["role"], "admin");
        assert!(value.get("password_hash").is_none());
    }
}
