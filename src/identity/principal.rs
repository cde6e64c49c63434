use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Closed set of account roles. Serialized upper case (`"VET"`, `"OWNER"`, `"ADMIN"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Vet,
    Owner,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Vet, Role::Owner, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Vet => "VET",
            Role::Owner => "OWNER",
            Role::Admin => "ADMIN",
        }
    }

    /// Vets and admins can see every horse; owners only their own.
    pub fn sees_all_records(&self) -> bool {
        match self {
            Role::Vet | Role::Admin => true,
            Role::Owner => false,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VET" => Ok(Role::Vet),
            "OWNER" => Ok(Role::Owner),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Verified identity for the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(subject_id: impl Into<String>, role: Role) -> Self {
        Self { subject_id: subject_id.into(), role }
    }

    /// True when this identity may read a record owned by `owner_id`.
    pub fn can_access_owned(&self, owner_id: &str) -> bool {
        self.role.sees_all_records() || self.subject_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("vet".parse::<Role>().unwrap(), Role::Vet);
        assert_eq!(" Owner ".parse::<Role>().unwrap(), Role::Owner);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("groom".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"OWNER\"");
        let r: Role = serde_json::from_str("\"VET\"").unwrap();
        assert_eq!(r, Role::Vet);
    }

    #[test]
    fn owners_only_reach_their_own_records() {
        let owner = Identity::new("u-1", Role::Owner);
        assert!(owner.can_access_owned("u-1"));
        assert!(!owner.can_access_owned("u-2"));
        assert!(Identity::new("v", Role::Vet).can_access_owned("u-2"));
        assert!(Identity::new("a", Role::Admin).can_access_owned("u-2"));
    }
}
