//! PIN utilities
//!
//! The PIN is a shared secret gating the hidden section of the notes
//! collection. It is compared for exact equality, nothing is hashed.

use rand_core::OsRng;
use rand_core::TryRngCore;

/// Runtime PIN configuration
#[derive(Clone)]
pub struct PinConfig {
    /// The configured PIN
    pin: String,

    /// Mark the credential cookie `Secure`
    secure_cookies: bool,
}

impl PinConfig {
    /// Create a new PIN configuration
    pub fn new(pin: String, secure_cookies: bool) -> Self {
        Self {
            pin,
            secure_cookies,
        }
    }

    /// Does the presented credential match the configured PIN?
    pub fn verify(&self, credential: &str) -> bool {
        credential == self.pin
    }

    /// Should the credential cookie be marked `Secure`?
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

/// Generate a new six digit PIN
pub fn generate() -> String {
    let value = OsRng.try_next_u32().expect("Valid random number");

    format!("{:06}", value % 1_000_000)
}
