#![no_main]

use gnap_negotiator::models::TransactionRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(request) = serde_json::from_slice::<TransactionRequest>(data) {
        let _ = request.continuation_handle();
        let _ = request.client_key();
        let _ = request.interaction_ref();
    }
});
