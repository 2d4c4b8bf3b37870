//! Compute backend selection

use crate::error::SpeechError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Backend the model runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    /// Apple Metal Performance Shaders
    Mps,
    /// NVIDIA CUDA
    Cuda,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Cpu => "cpu",
            DeviceKind::Mps => "mps",
            DeviceKind::Cuda => "cuda",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Availability queries for accelerated backends
pub trait BackendProbe: Send + Sync {
    fn mps_available(&self) -> Result<bool, SpeechError>;

    fn cuda_available(&self) -> Result<bool, SpeechError>;
}

/// Probe for the host machine
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl BackendProbe for SystemProbe {
    fn mps_available(&self) -> Result<bool, SpeechError> {
        Ok(cfg!(all(target_os = "macos", target_arch = "aarch64")))
    }

    fn cuda_available(&self) -> Result<bool, SpeechError> {
        if Path::new("/proc/driver/nvidia/version").exists() {
            return Ok(true);
        }

        let status = Command::new("nvidia-smi")
            .arg("-L")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => Ok(status.success()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SpeechError::Io(e)),
        }
    }
}

/// Chooses the device the model is loaded on
pub struct DeviceSelector<P = SystemProbe> {
    probe: P,
}

impl DeviceSelector<SystemProbe> {
    pub fn system() -> Self {
        Self { probe: SystemProbe }
    }
}

impl<P: BackendProbe> DeviceSelector<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }

    /// MPS when allowed and present, otherwise CUDA when present, otherwise CPU
    ///
    /// A failing probe counts as "not available".
    pub fn select(&self, use_accelerated: bool) -> DeviceKind {
        if use_accelerated && available("mps", self.probe.mps_available()) {
            return DeviceKind::Mps;
        }
        if available("cuda", self.probe.cuda_available()) {
            return DeviceKind::Cuda;
        }
        DeviceKind::Cpu
    }
}

fn available(backend: &str, probed: Result<bool, SpeechError>) -> bool {
    match probed {
        Ok(found) => {
            debug!("Backend {} available: {}", backend, found);
            found
        }
        Err(e) => {
            warn!("Could not query {} availability, assuming absent: {}", backend, e);
            false
        }
    }
}

impl<P: BackendProbe + ?Sized> BackendProbe for Box<P> {
    fn mps_available(&self) -> Result<bool, SpeechError> {
        (**self).mps_available()
    }

    fn cuda_available(&self) -> Result<bool, SpeechError> {
        (**self).cuda_available()
    }
}
