//! Argon2 password and recovery-code hashing.

use argon2::{Algorithm, Argon2, Params, Version};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::config::SecurityConfig;
use crate::world::WorldError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
const RECOVERY_CODE_LENGTH: usize = 12;

pub struct Credentials {
    argon2: Argon2<'static>,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl Credentials {
    /// Build the hasher from optional config overrides; invalid params fall back to defaults.
    pub fn from_config(security: &SecurityConfig) -> Self {
        let Some(a) = &security.argon2 else {
            return Self::default();
        };
        let defaults = Params::DEFAULT;
        let mem = a.memory_kib.unwrap_or(defaults.m_cost());
        let time = a.time_cost.unwrap_or(defaults.t_cost());
        let para = a.parallelism.unwrap_or(defaults.p_cost());
        match Params::new(mem, time, para, None) {
            Ok(params) => Self {
                argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            },
            Err(e) => {
                log::warn!("Invalid argon2 parameters ({}); using defaults", e);
                Self::default()
            }
        }
    }

    pub fn hash(&self, secret: &str) -> Result<String, WorldError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self.argon2.hash_password(secret.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// False for a wrong secret as well as for an empty or corrupt stored hash.
    pub fn verify(&self, stored: &str, secret: &str) -> bool {
        if stored.is_empty() {
            return false;
        }
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon2
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                log::error!("Corrupt password hash: {}", e);
                false
            }
        }
    }
}

/// Argon2 results worked out before the world lock is taken, keyed by their
/// inputs. A handler whose inputs no longer match simply hashes inline.
#[derive(Default)]
pub struct PreparedSecrets {
    hashes: Vec<(String, String)>,
    verdicts: Vec<(String, String, bool)>,
    recovery_code: Option<String>,
}

impl PreparedSecrets {
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty() && self.verdicts.is_empty() && self.recovery_code.is_none()
    }

    fn hash_of(&self, secret: &str) -> Option<&str> {
        self.hashes
            .iter()
            .find(|(s, _)| s == secret)
            .map(|(_, h)| h.as_str())
    }

    fn verdict(&self, stored: &str, secret: &str) -> Option<bool> {
        self.verdicts
            .iter()
            .find(|(h, s, _)| h == stored && s == secret)
            .map(|(_, _, ok)| *ok)
    }
}

impl Credentials {
    pub fn prehash(&self, prepared: &mut PreparedSecrets, secret: &str) -> Result<(), WorldError> {
        let hash = self.hash(secret)?;
        prepared.hashes.push((secret.to_string(), hash));
        Ok(())
    }

    /// Verify now and remember the outcome. Returns it as well.
    pub fn preverify(&self, prepared: &mut PreparedSecrets, stored: &str, secret: &str) -> bool {
        let ok = self.verify(stored, secret);
        prepared
            .verdicts
            .push((stored.to_string(), secret.to_string(), ok));
        ok
    }

    /// Pick the next recovery code and hash it ahead of time.
    pub fn prepare_recovery_code(&self, prepared: &mut PreparedSecrets) -> Result<(), WorldError> {
        let code = generate_recovery_code();
        self.prehash(prepared, &code)?;
        prepared.recovery_code = Some(code);
        Ok(())
    }

    pub fn hash_with(&self, prepared: &PreparedSecrets, secret: &str) -> Result<String, WorldError> {
        match prepared.hash_of(secret) {
            Some(hash) => Ok(hash.to_string()),
            None => self.hash(secret),
        }
    }

    pub fn verify_with(&self, prepared: &PreparedSecrets, stored: &str, secret: &str) -> bool {
        prepared
            .verdict(stored, secret)
            .unwrap_or_else(|| self.verify(stored, secret))
    }

    /// A fresh recovery code and its hash, using the prepared one when there is one.
    pub fn recovery_code_with(
        &self,
        prepared: &mut PreparedSecrets,
    ) -> Result<(String, String), WorldError> {
        let code = prepared
            .recovery_code
            .take()
            .unwrap_or_else(generate_recovery_code);
        let hash = self.hash_with(prepared, &code)?;
        Ok((code, hash))
    }
}

/// Reason a new password is refused, if any.
pub fn password_problem(password: &str) -> Option<String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Some(format!(
            "Password too short (minimum {} characters).",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Some("Password too long.".to_string());
    }
    None
}

pub fn generate_recovery_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RECOVERY_CODE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Argon2Config;

    fn cheap() -> Credentials {
        Credentials::from_config(&SecurityConfig {
            login_cooldown_ms: 0,
            argon2: Some(Argon2Config {
                memory_kib: Some(64),
                time_cost: Some(1),
                parallelism: Some(1),
            }),
        })
    }

    #[test]
    fn hash_and_verify() {
        let creds = cheap();
        let hash = creds.hash("correct horse").unwrap();
        assert!(creds.verify(&hash, "correct horse"));
        assert!(!creds.verify(&hash, "wrong horse"));
        assert!(!creds.verify("", "anything"));
        assert!(!creds.verify("not-a-hash", "anything"));
    }

    #[test]
    fn prepared_results_are_reused() {
        let creds = cheap();
        let mut prepared = PreparedSecrets::default();
        assert!(prepared.is_empty());

        // A planted verdict wins over what verification would say.
        prepared
            .verdicts
            .push(("not-a-hash".to_string(), "open sesame".to_string(), true));
        assert!(creds.verify_with(&prepared, "not-a-hash", "open sesame"));
        assert!(!creds.verify_with(&prepared, "not-a-hash", "other"));

        creds.prehash(&mut prepared, "new secret").unwrap();
        let hash = creds.hash_with(&prepared, "new secret").unwrap();
        assert_eq!(Some(hash.as_str()), prepared.hash_of("new secret"));
        assert!(creds.verify(&hash, "new secret"));
        assert!(creds.preverify(&mut prepared, &hash, "new secret"));

        creds.prepare_recovery_code(&mut prepared).unwrap();
        let (code, code_hash) = creds.recovery_code_with(&mut prepared).unwrap();
        assert_eq!(Some(code_hash.as_str()), prepared.hash_of(&code));
        let (other, _) = creds.recovery_code_with(&mut prepared).unwrap();
        assert_ne!(code, other);
    }

    #[test]
    fn recovery_codes_are_alphanumeric() {
        let code = generate_recovery_code();
        assert_eq!(code.len(), RECOVERY_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(password_problem("short").is_some());
        assert!(password_problem("long enough").is_none());
    }
}
