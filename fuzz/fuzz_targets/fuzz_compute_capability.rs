//! Fuzz target: compute capability parsing.
//!
//! Parsing never panics, and a parsed value displays back to a string that
//! parses to the same value.

#![no_main]

use gpuhost_core::ComputeCapability;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(cap) = text.parse::<ComputeCapability>() else {
        return;
    };
    let reparsed: ComputeCapability = cap.to_string().parse().expect("displayed capability must parse");
    assert_eq!(reparsed, cap);
});
