//! Tests for compute device selection

use sounds_spk::device::{BackendProbe, DeviceKind, DeviceSelector};
use sounds_spk::error::SpeechError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct FakeProbe {
    mps: Result<bool, ()>,
    cuda: Result<bool, ()>,
    mps_queries: Arc<AtomicUsize>,
}

impl FakeProbe {
    fn new(mps: bool, cuda: bool) -> Self {
        Self {
            mps: Ok(mps),
            cuda: Ok(cuda),
            mps_queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        Self {
            mps: Err(()),
            cuda: Err(()),
            mps_queries: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl BackendProbe for FakeProbe {
    fn mps_available(&self) -> Result<bool, SpeechError> {
        self.mps_queries.fetch_add(1, Ordering::SeqCst);
        self.mps
            .map_err(|_| SpeechError::Model("mps runtime crashed".to_string()))
    }

    fn cuda_available(&self) -> Result<bool, SpeechError> {
        self.cuda
            .map_err(|_| SpeechError::Model("driver query failed".to_string()))
    }
}

#[test]
fn test_mps_preferred_when_allowed() {
    let selector = DeviceSelector::new(FakeProbe::new(true, true));
    assert_eq!(selector.select(true), DeviceKind::Mps);
}

#[test]
fn test_mps_skipped_when_disallowed() {
    let selector = DeviceSelector::new(FakeProbe::new(true, true));
    assert_eq!(selector.select(false), DeviceKind::Cuda);

    let selector = DeviceSelector::new(FakeProbe::new(true, false));
    assert_eq!(selector.select(false), DeviceKind::Cpu);
}

#[test]
fn test_mps_not_queried_when_disallowed() {
    let probe = FakeProbe::new(true, false);
    let queries = probe.mps_queries.clone();
    let selector = DeviceSelector::new(probe);

    selector.select(false);
    assert_eq!(queries.load(Ordering::SeqCst), 0);

    selector.select(true);
    assert_eq!(queries.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cuda_when_mps_absent() {
    let selector = DeviceSelector::new(FakeProbe::new(false, true));
    assert_eq!(selector.select(true), DeviceKind::Cuda);
    assert_eq!(selector.select(false), DeviceKind::Cuda);
}

#[test]
fn test_cpu_when_nothing_available() {
    let selector = DeviceSelector::new(FakeProbe::new(false, false));
    assert_eq!(selector.select(true), DeviceKind::Cpu);
    assert_eq!(selector.select(false), DeviceKind::Cpu);
}

#[test]
fn test_probe_errors_count_as_absent() {
    let selector = DeviceSelector::new(FakeProbe::failing());
    assert_eq!(selector.select(true), DeviceKind::Cpu);

    let probe = FakeProbe {
        mps: Err(()),
        cuda: Ok(true),
        mps_queries: Arc::new(AtomicUsize::new(0)),
    };
    assert_eq!(DeviceSelector::new(probe).select(true), DeviceKind::Cuda);
}

#[test]
fn test_boxed_probe() {
    let probe: Box<dyn BackendProbe> = Box::new(FakeProbe::new(false, true));
    let selector = DeviceSelector::new(probe);
    assert_eq!(selector.select(true), DeviceKind::Cuda);
}

#[test]
fn test_system_selector_always_selects() {
    // Whatever the host has, selection succeeds
    let device = DeviceSelector::system().select(false);
    assert_ne!(device, DeviceKind::Mps);
}

#[test]
fn test_device_kind_names() {
    assert_eq!(DeviceKind::Cpu.to_string(), "cpu");
    assert_eq!(DeviceKind::Mps.as_str(), "mps");
    assert_eq!(DeviceKind::Cuda.as_str(), "cuda");
    assert_eq!(serde_json::to_string(&DeviceKind::Cuda).unwrap(), "\"cuda\"");
}
