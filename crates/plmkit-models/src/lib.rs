//! plmkit-models
//!
//! Protein language models implementing [`plmkit_core::ProteinModel`].
//!
//! ```shell
//! cargo test -p plmkit-models -- --ignored
//! cargo test -p plmkit-models --features metal -- --ignored
//! ```
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Result};
use tracing::info;

pub mod esm2;

pub use esm2::{ESM2Config, ESM2Files, ESM2Models, ESM2Runner, EsmVocab, ESM2};

/// Pick CUDA, then Metal, then CPU unless `cpu` forces the CPU.
pub fn device(cpu: bool) -> Result<Device> {
    if cpu {
        Ok(Device::Cpu)
    } else if cuda_is_available() {
        Ok(Device::new_cuda(0)?)
    } else if metal_is_available() {
        Ok(Device::new_metal(0)?)
    } else {
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            info!("Running on CPU, to run on GPU(metal), build with `--features metal`");
        }
        #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
        {
            info!("Running on CPU, to run on GPU, build with `--features cuda`");
        }
        Ok(Device::Cpu)
    }
}
