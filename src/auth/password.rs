use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AppError, ValidationError};

/// Exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::BadPinFormat)
    }
}

/// Argon2id hashing for kiosk PINs. Cost parameters come from config so
/// tests can run with cheap ones.
#[derive(Clone)]
pub struct PinHasher {
    argon2: Argon2<'static>,
}

impl PinHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AppError::Internal(format!("argon2 params: {e}")))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, pin: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(pin.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(format!("argon2 hash: {e}")))
    }

    /// False for a wrong PIN and for an unparseable stored hash.
    pub fn verify(&self, pin: &str, hashed: &str) -> bool {
        match PasswordHash::new(hashed) {
            Ok(parsed) => self.argon2.verify_password(pin.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::error!(error = %e, "Stored PIN hash is malformed");
                false
            }
        }
    }
}
