//! Fuzz target: `/submit` body parsing and payload decoding.

#![no_main]

use base64::Engine as _;
use gpuhost_gateway::routes::SubmitBody;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = serde_json::from_slice::<SubmitBody>(data) else {
        return;
    };
    if let Some(payload) = body.payload {
        let _ = base64::engine::general_purpose::STANDARD.decode(payload.as_bytes());
    }
});
