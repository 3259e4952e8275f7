use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use tracing::{debug, error};

use crate::shared::AppError;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// PBKDF2-HMAC-SHA256 password hashing.
///
/// Hashes are self-describing (`pbkdf2-sha256$<iterations>$<salt>$<hash>`, hex
/// encoded) so verification keeps working after the iteration count changes.
#[derive(Clone, Debug)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn hash(&self, password: &str) -> String {
        let salt: [u8; SALT_LEN] = rand::random();
        let digest = derive(password, &salt, self.iterations);

        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            hex::encode(salt),
            hex::encode(digest)
        )
    }

    /// Checks a password against a stored hash; malformed hashes never verify
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let mut parts = stored.split('$');
        let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            debug!("Stored password hash has an unknown format");
            return false;
        };

        let (Ok(iterations), Ok(salt), Ok(expected)) = (
            iterations.parse::<u32>(),
            hex::decode(salt),
            hex::decode(expected),
        ) else {
            debug!("Stored password hash could not be decoded");
            return false;
        };

        constant_time_eq(&derive(password, &salt, iterations), &expected)
    }
}

impl PasswordHasher {
    /// `hash` on the blocking pool so request workers stay free
    pub async fn spawn_hash(&self, password: String) -> Result<String, AppError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                error!(error = %e, "Password hashing task failed");
                AppError::Internal
            })
    }

    /// `verify` on the blocking pool
    pub async fn spawn_verify(&self, password: String, stored: String) -> Result<bool, AppError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| {
                error!(error = %e, "Password verification task failed");
                AppError::Internal
            })
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
