//! Account number generation and parsing.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fixed prefix of every account number.
pub const ACCOUNT_NUMBER_PREFIX: &str = "TB";

/// Digest bytes kept in an account number (128 bits).
const DIGEST_BYTES: usize = 16;

/// Random bytes mixed into each generated number.
const NONCE_BYTES: usize = 32;

/// Total length of an account number.
pub const ACCOUNT_NUMBER_LEN: usize = ACCOUNT_NUMBER_PREFIX.len() + DIGEST_BYTES * 2;

/// Opaque, immutable account identifier: `TB` followed by 32 uppercase hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Generates a fresh account number for `external_id`.
    ///
    /// The number is the first 128 bits of `SHA-256(external_id || nonce)`,
    /// where the nonce comes from a cryptographically secure generator.
    #[must_use]
    pub fn generate(external_id: &str) -> Self {
        let mut nonce = [0u8; NONCE_BYTES];
        rand::rng().fill_bytes(&mut nonce);
        Self::derive(external_id, &nonce)
    }

    /// Derives the account number for an identity and a given nonce.
    #[must_use]
    pub fn derive(external_id: &str, nonce: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(external_id.as_bytes());
        hasher.update(nonce);
        let digest = hasher.finalize();

        Self(format!(
            "{ACCOUNT_NUMBER_PREFIX}{}",
            hex::encode_upper(&digest[..DIGEST_BYTES])
        ))
    }

    /// Parses a user-supplied token, accepting any letter case.
    ///
    /// Returns `None` when the token does not have the account number shape.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let candidate = token.trim().to_ascii_uppercase();
        let digits = candidate.strip_prefix(ACCOUNT_NUMBER_PREFIX)?;

        if digits.len() == DIGEST_BYTES * 2 && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(candidate))
        } else {
            None
        }
    }

    /// Wraps a value read back from storage.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the account number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for AccountNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_generated_shape() {
        let number = AccountNumber::generate("123456789");
        assert_eq!(number.as_str().len(), ACCOUNT_NUMBER_LEN);
        assert_eq!(ACCOUNT_NUMBER_LEN, 34);
        assert!(number.as_str().starts_with("TB"));
        assert!(
            number.as_str()[2..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn test_generation_uses_fresh_nonce() {
        let first = AccountNumber::generate("42");
        let second = AccountNumber::generate("42");
        assert_ne!(first, second);
    }

    #[test]
    fn test_derive_is_deterministic() {
        let nonce = [7u8; 32];
        assert_eq!(
            AccountNumber::derive("42", &nonce),
            AccountNumber::derive("42", &nonce)
        );
        assert_ne!(
            AccountNumber::derive("42", &nonce),
            AccountNumber::derive("43", &nonce)
        );
    }

    #[test]
    fn test_parse_normalizes_case() {
        let number = AccountNumber::generate("42");
        let lower = number.as_str().to_lowercase();
        assert_eq!(AccountNumber::parse(&lower), Some(number.clone()));
        assert_eq!(AccountNumber::parse(&format!("  {number} ")), Some(number));
    }

    #[rstest]
    #[case("")]
    #[case("TB")]
    #[case("123456789")]
    #[case("XX0123456789ABCDEF0123456789ABCDEF")]
    #[case("TB0123456789ABCDEF0123456789ABCDEG")]
    #[case("TB0123456789ABCDEF0123456789ABCDEF00")]
    fn test_parse_rejects_other_tokens(#[case] token: &str) {
        assert_eq!(AccountNumber::parse(token), None);
    }
}
