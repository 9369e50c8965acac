//! Fuzz target: clan join body and the compatibility predicate.
//!
//! Any descriptor a worker can send must be checked against the host without
//! panicking, including extreme memory figures.

#![no_main]

use gpuhost_core::{check_compatibility, HardwareDescriptor};
use gpuhost_gateway::routes::JoinBody;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = serde_json::from_slice::<JoinBody>(data) else {
        return;
    };
    let host = HardwareDescriptor::fallback();
    let _ = check_compatibility(&host, &body.hardware);
    // Reversed roles exercise the zero-memory host path.
    let _ = check_compatibility(&body.hardware, &host);
});
