//! Password hashing for `password` predicates.

/// Failure reported by a [`PasswordHasher`].
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(pub String);

/// One-way hash applied to password values before they are written.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, HashError>;
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(4)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        bcrypt::hash(plain, self.cost).map_err(|e| HashError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcrypt_hash_verifies() {
        let hasher = BcryptHasher::new(4);
        let hashed = hasher.hash("hunter2").unwrap();
        assert!(hashed.starts_with("$2"));
        assert!(bcrypt::verify("hunter2", &hashed).unwrap());
    }

    #[test]
    fn out_of_range_cost_fails() {
        let hasher = BcryptHasher::new(2);
        assert!(hasher.hash("x").is_err());
    }
}
