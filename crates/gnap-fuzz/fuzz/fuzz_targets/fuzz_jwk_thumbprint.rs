#![no_main]

use gnap_negotiator::crypto::{Jwk, same_key};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(jwk) = serde_json::from_slice::<Jwk>(data) {
        let _ = jwk.thumbprint();
        let _ = jwk.verifying_key();
        // A key always matches itself unless it cannot be thumbprinted
        if jwk.thumbprint().is_ok() {
            assert!(same_key(&jwk, &jwk));
        }
    }
});
