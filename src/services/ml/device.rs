//! Device selection

use crate::config::DeviceConfig;
use candle_core::{Device, Result};

pub struct DeviceManager;

impl DeviceManager {
    /// Resolve the configured device, falling back to CPU when the
    /// requested accelerator is not available in this build.
    pub fn resolve(config: &DeviceConfig) -> Result<Device> {
        match config {
            DeviceConfig::Auto => Self::detect_optimal_device(),
            DeviceConfig::Cpu => Ok(Device::Cpu),
            DeviceConfig::Cuda(idx) => Ok(Device::new_cuda(*idx).unwrap_or_else(|e| {
                tracing::warn!("CUDA device {} unavailable ({}), using CPU", idx, e);
                Device::Cpu
            })),
            DeviceConfig::Metal => Ok(Device::new_metal(0).unwrap_or_else(|e| {
                tracing::warn!("Metal device unavailable ({}), using CPU", e);
                Device::Cpu
            })),
        }
    }

    /// Detect optimal device based on availability
    pub fn detect_optimal_device() -> Result<Device> {
        if let Ok(device) = Device::new_cuda(0) {
            tracing::info!("🎮 Using CUDA device");
            return Ok(device);
        }

        #[cfg(target_os = "macos")]
        if let Ok(device) = Device::new_metal(0) {
            tracing::info!("🎮 Using Metal device");
            return Ok(device);
        }

        tracing::info!("💻 Using CPU device");
        Ok(Device::Cpu)
    }

    pub fn device_info(device: &Device) -> &'static str {
        match device {
            Device::Cpu => "CPU",
            Device::Cuda(_) => "CUDA GPU",
            Device::Metal(_) => "Metal GPU",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_config_resolves_to_cpu() -> Result<()> {
        let device = DeviceManager::resolve(&DeviceConfig::Cpu)?;
        assert_eq!(DeviceManager::device_info(&device), "CPU");
        Ok(())
    }
}
