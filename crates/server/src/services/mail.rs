//! Delivery of e-mail verification codes.

use onandhome_core::Email;

/// How long a mailed code stays valid.
pub const CODE_TTL_SECONDS: i64 = 300;

/// Sends verification codes to their owners.
pub trait CodeSender: Send + Sync {
    /// Deliver a password-reset code to `to`.
    fn send_password_reset_code(&self, to: &Email, code: &str);
}

/// Writes codes to the log instead of mailing them.
///
/// Stands in for an SMTP relay; operators read the code from the server log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCodeSender;

impl CodeSender for LogCodeSender {
    fn send_password_reset_code(&self, to: &Email, code: &str) {
        tracing::info!(
            to = %to.masked(),
            code = %code,
            ttl_seconds = CODE_TTL_SECONDS,
            "Password reset code issued"
        );
    }
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_verification_code_format() {
        for _ in 0..100 {
            let code = generate_verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
