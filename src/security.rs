use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use crate::storage::{SharedStore, User};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

/// Look up the user by email and check the password. `Ok(None)` for unknown
/// users and wrong passwords alike.
pub fn authenticate(store: &SharedStore, email: &str, password: &str) -> Result<Option<User>> {
    let user = {
        let guard = store.0.lock();
        guard.find_user_by_email(email).cloned()
    };
    let Some(user) = user else { return Ok(None); };
    // Verify outside the lock: argon2 is deliberately slow
    if verify_password(&user.password_hash, password) { Ok(Some(user)) } else { Ok(None) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use crate::storage::NewUser;
    use tempfile::tempdir;

    #[test]
    fn hash_then_verify() {
        let phc = hash_password("correct horse").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password(&phc, "correct horse"));
        assert!(!verify_password(&phc, "battery staple"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "anything"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn authenticate_by_email() {
        let tmp = tempdir().unwrap();
        let store = SharedStore::open(tmp.path()).unwrap();
        store.0.lock().create_user(NewUser {
            email: "vet@example.com".into(),
            name: "Dr Vet".into(),
            password_hash: hash_password("stethoscope").unwrap(),
            role: Role::Vet,
        }).unwrap();

        let ok = authenticate(&store, "VET@example.com", "stethoscope").unwrap();
        assert_eq!(ok.map(|u| u.role), Some(Role::Vet));
        assert!(authenticate(&store, "vet@example.com", "wrong").unwrap().is_none());
        assert!(authenticate(&store, "nobody@example.com", "stethoscope").unwrap().is_none());
    }
}
