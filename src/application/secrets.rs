//! Credential generation.
//!
//! Secrets come from the OS CSPRNG. Values already present in an existing
//! env file win, so re-rendering never rotates live credentials.

use std::collections::HashMap;

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;

use crate::domain::input::{
    Credentials, DATABASE_JWT_SECRET, DATABASE_PASSWORD, FLOW_BUILDER_SECRET_KEY,
    WORKFLOW_ENGINE_ENCRYPTION_KEY,
};

const PASSWORD_LEN: usize = 32;
const SECRET_LEN: usize = 64;

/// Random alphanumeric string of `len` characters.
#[must_use]
pub fn generate_secret(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Reuse credentials from `existing` and generate the rest.
#[must_use]
pub fn resolve_credentials(existing: &HashMap<String, String>) -> Credentials {
    let reuse = |key: &str, len: usize| {
        existing
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| generate_secret(len))
    };

    Credentials {
        database_password: reuse(DATABASE_PASSWORD, PASSWORD_LEN),
        jwt_secret: reuse(DATABASE_JWT_SECRET, SECRET_LEN),
        workflow_encryption_key: reuse(WORKFLOW_ENGINE_ENCRYPTION_KEY, SECRET_LEN),
        flow_builder_secret_key: reuse(FLOW_BUILDER_SECRET_KEY, SECRET_LEN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_alphanumeric_and_sized() {
        let secret = generate_secret(48);
        assert_eq!(secret.len(), 48);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_secret(48), secret);
    }

    #[test]
    fn existing_values_are_reused() {
        let mut existing = HashMap::new();
        existing.insert(DATABASE_PASSWORD.to_string(), "keep-me".to_string());
        existing.insert(DATABASE_JWT_SECRET.to_string(), "  ".to_string());

        let credentials = resolve_credentials(&existing);
        assert_eq!(credentials.database_password, "keep-me");
        assert_eq!(credentials.jwt_secret.len(), SECRET_LEN);
        assert_eq!(credentials.flow_builder_secret_key.len(), SECRET_LEN);
    }
}
