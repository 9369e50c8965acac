//! Fuzz target: callable payload decoding.
//!
//! Arbitrary bytes handed to the runner must decode or fail cleanly, and
//! anything that decodes must re-encode to an equal call. Calls are never
//! invoked here.

#![no_main]

use gpuhost_executor::RemoteCall;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(call) = RemoteCall::from_bytes(data) else {
        return;
    };
    let bytes = call.to_bytes().expect("decoded call must re-encode");
    let again = RemoteCall::from_bytes(&bytes).expect("re-encoded call must decode");
    assert_eq!(again, call);
});
