//! Cryptographic building blocks of the negotiation protocol.
//!
//! - [`random`]: base32 tokens for handles, nonces, user codes and access tokens
//! - [`binding`]: interaction binding digest over the two nonces and the reference
//! - [`jwk`]: client public keys and RFC 7638 thumbprints
//! - [`jws`]: detached JWS proof of possession over the raw request body

pub mod binding;
pub mod jwk;
pub mod jws;
pub mod random;

pub use binding::{HashAlgorithm, bind};
pub use jwk::{Jwk, same_key};
pub use jws::verify_possession;
