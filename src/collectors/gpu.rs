use log::{info, warn};
use nvml_wrapper::enums::device::UsedGpuMemory;
use nvml_wrapper::{Device, Nvml};
use crate::errors::SampleError;
use crate::metrics::ProcessGpuInfo;

/// An accelerator that can list the processes running compute work on it.
pub trait ComputeDevice {
    fn compute_processes(&self) -> Result<Vec<ProcessGpuInfo>, SampleError>;
}

impl ComputeDevice for Device<'_> {
    fn compute_processes(&self) -> Result<Vec<ProcessGpuInfo>, SampleError> {
        let processes = self.running_compute_processes()?;

        Ok(processes
            .into_iter()
            .map(|proc_info| ProcessGpuInfo {
                pid: proc_info.pid,
                gpu_memory: match proc_info.used_gpu_memory {
                    UsedGpuMemory::Used(bytes) => bytes,
                    UsedGpuMemory::Unavailable => 0,
                },
            })
            .collect())
    }
}

/// Initializes NVML once. `None` disables GPU sampling for the whole run.
pub fn init_nvml() -> Option<Nvml> {
    match Nvml::init() {
        Ok(nvml) => Some(nvml),
        Err(e) => {
            warn!("Failed to initialize NVML: {}", e);
            warn!("GPU monitoring will not be available");
            None
        }
    }
}

/// Acquires device 0. Never retried after a failure.
pub fn acquire_device(nvml: Option<&Nvml>) -> Option<Device<'_>> {
    let nvml = nvml?;

    match nvml.device_by_index(0) {
        Ok(device) => {
            match device.name() {
                Ok(name) => info!("GPU monitoring enabled on device 0 ({})", name),
                Err(_) => info!("GPU monitoring enabled on device 0"),
            }
            Some(device)
        }
        Err(e) => {
            warn!("Failed to acquire GPU device 0: {}", e);
            warn!("GPU monitoring will not be available");
            None
        }
    }
}

/// Per-process device memory, or `None` when the sampler is disabled.
pub fn take_gpu_snapshot(
    device: Option<&dyn ComputeDevice>,
) -> Result<Option<Vec<ProcessGpuInfo>>, SampleError> {
    match device {
        Some(device) => Ok(Some(device.compute_processes()?)),
        None => Ok(None),
    }
}
