//! Fuzzing library for gnap-negotiator.
//!
//! Targets cover everything parsed from untrusted input before proof of
//! possession is checked: request bodies, detached JWS values and client keys.
//!
//! # Usage
//!
//! ```bash
//! cd crates/gnap-fuzz
//! cargo +nightly fuzz run fuzz_detached_jws -- -max_total_time=60
//! ```

pub use gnap_negotiator::{crypto, models};
