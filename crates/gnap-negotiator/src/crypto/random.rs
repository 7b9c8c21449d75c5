//! Random token generation.
//!
//! Every token is `len` bytes from the OS entropy source, base32 encoded
//! (RFC 4648 alphabet). All protocol lengths are multiples of five bytes, so
//! tokens never carry padding.

use data_encoding::BASE32;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::config::protocol;
use crate::error::GrantResult;

/// Generate a token from `len` bytes of OS randomness.
///
/// A failing entropy source is an error for the request; there is no fallback.
pub fn generate(len: usize) -> GrantResult<String> {
    generate_with(&mut OsRng, len)
}

/// Generate a token from an explicit random source.
pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R, len: usize) -> GrantResult<String> {
    let mut seed = vec![0u8; len];
    // try_fill_bytes only returns once the whole buffer is filled
    rng.try_fill_bytes(&mut seed)?;
    Ok(BASE32.encode(&seed))
}

/// Continuation handle.
pub fn handle() -> GrantResult<String> {
    generate(protocol::HANDLE_LEN)
}

/// Redirect interaction key.
pub fn interaction_key() -> GrantResult<String> {
    generate(protocol::INTERACTION_KEY_LEN)
}

/// Interaction reference returned on a callback.
pub fn interaction_ref() -> GrantResult<String> {
    generate(protocol::INTERACTION_REF_LEN)
}

/// Server nonce.
pub fn nonce() -> GrantResult<String> {
    generate(protocol::NONCE_LEN)
}

/// Bearer access token.
pub fn access_token() -> GrantResult<String> {
    generate(protocol::ACCESS_TOKEN_LEN)
}

/// Short, human-typeable user code.
pub fn user_code() -> GrantResult<String> {
    generate(protocol::USER_CODE_LEN)
}

/// Canonical form of a user code typed by a person: upper case, no separators.
#[must_use]
pub fn normalize_user_code(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Source that refuses to produce bytes.
    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {}
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::other("entropy exhausted")))
        }
    }

    #[test]
    fn test_token_lengths() {
        // 5 bytes -> 8 chars, no padding for multiples of 5
        assert_eq!(handle().unwrap().len(), 24);
        assert_eq!(interaction_key().unwrap().len(), 24);
        assert_eq!(nonce().unwrap().len(), 32);
        assert_eq!(access_token().unwrap().len(), 40);
        assert_eq!(user_code().unwrap().len(), 8);
    }

    #[test]
    fn test_tokens_use_base32_alphabet() {
        let token = access_token().unwrap();
        assert!(token.chars().all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
        assert!(!token.contains('='));
    }

    #[test]
    fn test_tokens_differ() {
        assert_ne!(handle().unwrap(), handle().unwrap());
    }

    #[test]
    fn test_seeded_source_is_deterministic() {
        let a = generate_with(&mut StdRng::seed_from_u64(7), 15).unwrap();
        let b = generate_with(&mut StdRng::seed_from_u64(7), 15).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_entropy_failure_is_an_error() {
        let result = generate_with(&mut BrokenRng, 15);
        assert!(matches!(result, Err(crate::error::GrantError::Entropy(_))));
    }

    #[test]
    fn test_normalize_user_code() {
        assert_eq!(normalize_user_code("abcd-efgh"), "ABCDEFGH");
        assert_eq!(normalize_user_code(" ab cd ef gh "), "ABCDEFGH");
    }
}
