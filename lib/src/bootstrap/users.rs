use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::content::ContentDir;
use crate::error::{Result, Chainable};
use crate::store::{User, UserStore};
use crate::value::{Format, Yaml};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub created: usize,
    /// Usernames that were already taken.
    pub skipped: usize,
}

/// `sha256$<salt>$<hex digest of salt and password>`.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("sha256${}${}", salt, hex::encode(hasher.finalize()))
}

/// Whether `password` hashes to `encoded`, as produced by [`hash_password()`].
pub fn verify_password(password: &str, encoded: &str) -> bool {
    match encoded.split('$').collect::<Vec<_>>()[..] {
        ["sha256", salt, _] => hash_password(password, salt) == encoded,
        _ => false,
    }
}

/// Sixteen random bytes from the operating system, hex encoded.
fn new_salt() -> Result<String> {
    let mut salt = [0u8; 16];
    OsRng.try_fill_bytes(&mut salt)
        .map_err(Box::new)
        .chain_with(|| error!("failed to generate a password salt"))?;

    Ok(hex::encode(salt))
}

/// Creates the users listed in `users.yml`. Passwords are stored salted and
/// hashed; usernames that already exist are logged and skipped.
pub fn users<S: UserStore + ?Sized>(store: &mut S, dir: &ContentDir) -> Result<UserSummary> {
    let file = dir.users_file();
    if !file.is_file() {
        return err! {
            "users file does not exist",
            "path" => file.display(),
        };
    }

    let mut summary = UserSummary::default();
    let users: Vec<User> = Yaml::read_or_default(&file)?;
    for mut user in users {
        if store.find_user(&user.username).is_some() {
            tracing::warn!(username = %user.username, "user already exists; skipping");
            summary.skipped += 1;
            continue;
        }

        user.password = hash_password(&user.password, &new_salt()?);
        store.create_user(user)?;
        summary.created += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::store::MemoryStore;

    fn salt(encoded: &str) -> &str {
        encoded.split('$').nth(1).unwrap()
    }

    #[test]
    fn users_are_created_once() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("users.yml"), concat!(
            "- username: ada\n",
            "  email: ada@example.com\n",
            "  first_name: Ada\n",
            "  is_superuser: true\n",
            "  is_staff: true\n",
            "  password: engine\n",
            "- username: ada\n",
            "  password: again\n",
            "- username: grace\n",
        )).unwrap();

        let dir = ContentDir::new(tmp.path()).unwrap();
        let mut store = MemoryStore::new();
        let summary = users(&mut store, &dir).unwrap();
        assert_eq!(summary, UserSummary { created: 2, skipped: 1 });

        let ada = &store.users()[0];
        assert!(ada.is_superuser && ada.is_staff);
        assert!(ada.password.starts_with("sha256$"));
        assert!(verify_password("engine", &ada.password));
        assert!(!verify_password("again", &ada.password));

        let grace = &store.users()[1];
        assert_ne!(salt(&ada.password), salt(&grace.password));
        assert_eq!(salt(&ada.password).len(), 32);

        let summary = users(&mut store, &dir).unwrap();
        assert_eq!(summary, UserSummary { created: 0, skipped: 3 });
    }

    #[test]
    fn a_missing_users_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ContentDir::new(tmp.path()).unwrap();
        assert!(users(&mut MemoryStore::new(), &dir).is_err());
    }
}
