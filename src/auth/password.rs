use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use super::AuthError;

/// Hashes a password into a salted PHC string
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::InternalError(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored PHC string. Unparseable hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_and_verifiable() {
        let first = hash_password("hunter22").unwrap();
        let second = hash_password("hunter22").unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("$argon2"));
        assert!(verify_password("hunter22", &first));
        assert!(verify_password("hunter22", &second));
        assert!(!verify_password("hunter23", &first));
    }

    #[test]
    fn garbage_hash_does_not_verify() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
