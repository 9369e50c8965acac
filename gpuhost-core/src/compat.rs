//! Hardware compatibility predicate for clan admission.
//!
//! A clan is presented to clients as one logical device, so workers must match
//! the host closely: same architecture family, same compute capability, and
//! total memory within ±10% of the host's.

use crate::error::Incompatibility;
use crate::hardware::HardwareDescriptor;

/// Checks `worker` against `host`, reporting the first failed check.
///
/// Checks run in order (architecture, capability, memory) and short-circuit.
/// A host reporting zero memory accepts any worker memory; this only occurs
/// for descriptors that omit the memory figure.
///
/// # Errors
/// Returns the [`Incompatibility`] describing the first failed check.
pub fn check_compatibility(
    host: &HardwareDescriptor,
    worker: &HardwareDescriptor,
) -> Result<(), Incompatibility> {
    if host.arch != worker.arch {
        return Err(Incompatibility::Architecture {
            host: host.arch.clone(),
            worker: worker.arch.clone(),
        });
    }

    if host.cuda_capability != worker.cuda_capability {
        return Err(Incompatibility::Capability {
            host: host.cuda_capability.clone(),
            worker: worker.cuda_capability.clone(),
        });
    }

    if !memory_balanced(host.memory_total, worker.memory_total) {
        return Err(Incompatibility::Memory {
            host: host.memory_total,
            worker: worker.memory_total,
        });
    }

    Ok(())
}

/// `0.9 <= worker / host <= 1.1`, evaluated exactly in integers.
fn memory_balanced(host: u64, worker: u64) -> bool {
    if host == 0 {
        return true;
    }
    let (host, worker) = (u128::from(host), u128::from(worker));
    worker * 10 >= host * 9 && worker * 10 <= host * 11
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    fn gpu(arch: &str, cap: &str, mem: u64) -> HardwareDescriptor {
        let mut hw = HardwareDescriptor::fallback();
        hw.arch = arch.to_owned();
        hw.cuda_capability = cap.to_owned();
        hw.memory_total = mem;
        hw
    }

    #[test]
    fn identical_hardware_is_compatible() {
        let host = gpu("Ampere", "8.6", 8 * GIB);
        assert_eq!(check_compatibility(&host, &gpu("Ampere", "8.6", 8 * GIB)), Ok(()));
    }

    #[test]
    fn architecture_mismatch_is_reported_first() {
        let host = gpu("Ampere", "8.6", 8 * GIB);
        let worker = gpu("Pascal", "6.1", 8 * GIB);
        assert_eq!(
            check_compatibility(&host, &worker),
            Err(Incompatibility::Architecture {
                host: "Ampere".to_owned(),
                worker: "Pascal".to_owned(),
            })
        );
    }

    #[test]
    fn capability_mismatch_rejected() {
        let host = gpu("Ampere", "8.6", 8 * GIB);
        let worker = gpu("Ampere", "8.0", 8 * GIB);
        assert!(matches!(
            check_compatibility(&host, &worker),
            Err(Incompatibility::Capability { .. })
        ));
    }

    #[test]
    fn memory_boundaries_are_inclusive() {
        let host = gpu("Ampere", "8.6", 1000);
        assert_eq!(check_compatibility(&host, &gpu("Ampere", "8.6", 900)), Ok(()));
        assert_eq!(check_compatibility(&host, &gpu("Ampere", "8.6", 1100)), Ok(()));
        assert!(check_compatibility(&host, &gpu("Ampere", "8.6", 899)).is_err());
        assert!(check_compatibility(&host, &gpu("Ampere", "8.6", 1101)).is_err());
    }

    #[test]
    fn zero_memory_host_admits_any_memory() {
        let host = gpu("Ampere", "8.6", 0);
        assert_eq!(check_compatibility(&host, &gpu("Ampere", "8.6", 0)), Ok(()));
        assert_eq!(check_compatibility(&host, &gpu("Ampere", "8.6", 80 * GIB)), Ok(()));
    }

    #[test]
    fn zero_memory_host_still_checks_architecture() {
        let host = gpu("Ampere", "8.6", 0);
        assert!(check_compatibility(&host, &gpu("Turing", "7.5", 0)).is_err());
    }

    proptest::proptest! {
        #[test]
        fn proptest_within_five_percent_is_admitted(
            host in 20u64..(1 << 40),
            pct in 0u64..=5,
            up in proptest::bool::ANY,
        ) {
            let delta = host * pct / 100;
            let worker = if up { host + delta } else { host - delta };
            let result = check_compatibility(&gpu("Ampere", "8.6", host), &gpu("Ampere", "8.6", worker));
            proptest::prop_assert_eq!(result, Ok(()));
        }

        #[test]
        fn proptest_beyond_twenty_percent_is_rejected(
            host in 20u64..(1 << 40),
            pct in 20u64..=90,
            up in proptest::bool::ANY,
        ) {
            let delta = host * pct / 100;
            let worker = if up { host + delta } else { host - delta };
            let result = check_compatibility(&gpu("Ampere", "8.6", host), &gpu("Ampere", "8.6", worker));
            let is_memory_rejection = matches!(result, Err(Incompatibility::Memory { .. }));
            proptest::prop_assert!(is_memory_rejection, "got {:?}", result);
        }

        #[test]
        fn proptest_equal_descriptors_always_compatible(mem in proptest::prelude::any::<u64>()) {
            let hw = gpu("Ampere", "8.6", mem);
            proptest::prop_assert_eq!(check_compatibility(&hw, &hw.clone()), Ok(()));
        }
    }
}
