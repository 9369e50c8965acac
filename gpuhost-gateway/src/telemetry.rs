//! Local hardware telemetry.
//!
//! [`MockTelemetry`] always reports the simulated fallback device. With the
//! `nvml` feature, [`NvmlTelemetry`] reads device 0 through NVML and falls
//! back to the same simulated device when the driver is unavailable.

use gpuhost_core::HardwareDescriptor;

/// Produces a fresh [`HardwareDescriptor`] for the local accelerator.
pub trait TelemetrySource: Send + Sync {
    /// Queries the device. Never fails; unavailable hardware yields the
    /// fallback descriptor.
    fn query(&self) -> HardwareDescriptor;
}

/// Reports [`HardwareDescriptor::fallback`] on every query.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTelemetry;

impl TelemetrySource for MockTelemetry {
    fn query(&self) -> HardwareDescriptor {
        HardwareDescriptor::fallback()
    }
}

#[cfg(feature = "nvml")]
pub use nvml::NvmlTelemetry;

#[cfg(feature = "nvml")]
mod nvml {
    use gpuhost_core::{ComputeCapability, HardwareDescriptor, MemoryFigures};
    use nvml_wrapper::{error::NvmlError, Nvml};
    use tracing::warn;

    use super::TelemetrySource;

    /// Reads device 0 through NVML.
    pub struct NvmlTelemetry {
        nvml: Option<Nvml>,
    }

    impl std::fmt::Debug for NvmlTelemetry {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("NvmlTelemetry").field("initialized", &self.nvml.is_some()).finish()
        }
    }

    impl NvmlTelemetry {
        /// Initializes NVML once. A failed init is logged and every later
        /// query reports the fallback device.
        #[must_use]
        pub fn new() -> Self {
            let nvml = match Nvml::init() {
                Ok(nvml) => Some(nvml),
                Err(e) => {
                    warn!(error = %e, "NVML unavailable, reporting simulated device");
                    None
                }
            };
            Self { nvml }
        }

        fn read(nvml: &Nvml) -> Result<HardwareDescriptor, NvmlError> {
            let device = nvml.device_by_index(0)?;
            let capability = device.cuda_compute_capability()?;
            let memory = device.memory_info()?;
            Ok(HardwareDescriptor::from_device(
                device.name()?,
                ComputeCapability::new(
                    u32::try_from(capability.major).unwrap_or_default(),
                    u32::try_from(capability.minor).unwrap_or_default(),
                ),
                MemoryFigures { total: memory.total, free: memory.free, used: memory.used },
                nvml.sys_driver_version()?,
            ))
        }
    }

    impl Default for NvmlTelemetry {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TelemetrySource for NvmlTelemetry {
        fn query(&self) -> HardwareDescriptor {
            let Some(nvml) = self.nvml.as_ref() else {
                return HardwareDescriptor::fallback();
            };
            match Self::read(nvml) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!(error = %e, "NVML query failed, reporting simulated device");
                    HardwareDescriptor::fallback()
                }
            }
        }
    }
}
