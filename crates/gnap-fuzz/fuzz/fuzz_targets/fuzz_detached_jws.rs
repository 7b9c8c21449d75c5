#![no_main]

use gnap_negotiator::crypto::Jwk;
use gnap_negotiator::crypto::jws::DetachedJws;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Split the input into a signature and a body so both sides get mutated
    let (signature, body) = text.split_once('\n').unwrap_or((text, ""));
    if let Ok(jws) = DetachedJws::parse(signature) {
        let _ = jws.header();
        let _ = jws.verify(body.as_bytes(), &Jwk::ed25519(&[7; 32]));
    }
});
