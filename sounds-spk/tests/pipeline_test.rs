//! End-to-end tests for the speech pipeline

use async_trait::async_trait;
use ndarray::Array1;
use sounds_spk::engines::custom::CustomTtsModel;
use sounds_spk::{
    BackendProbe, DeviceKind, ModelFactory, ModelOutput, PlaybackOutcome, Player, ReportOnlyPlayer, SpeakSource,
    SpeechConfig, SpeechError, SpeechPipeline, Strategy, TtsModel, VoiceConditioning,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct CpuOnly;

impl BackendProbe for CpuOnly {
    fn mps_available(&self) -> Result<bool, SpeechError> {
        Ok(false)
    }

    fn cuda_available(&self) -> Result<bool, SpeechError> {
        Ok(false)
    }
}

struct CudaBox;

impl BackendProbe for CudaBox {
    fn mps_available(&self) -> Result<bool, SpeechError> {
        Ok(false)
    }

    fn cuda_available(&self) -> Result<bool, SpeechError> {
        Ok(true)
    }
}

#[derive(Default)]
struct RecordingPlayer {
    played: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Player for RecordingPlayer {
    async fn play(&self, path: &Path) -> Result<PlaybackOutcome, SpeechError> {
        self.played.lock().unwrap().push(path.to_path_buf());
        Ok(PlaybackOutcome::Played)
    }
}

struct BrokenPlayer;

#[async_trait]
impl Player for BrokenPlayer {
    async fn play(&self, _path: &Path) -> Result<PlaybackOutcome, SpeechError> {
        Err(SpeechError::Audio("no output device".to_string()))
    }
}

/// Counts model builds and calls; records the devices models were built for
struct Fixture {
    builds: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    devices: Arc<Mutex<Vec<DeviceKind>>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            builds: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
            devices: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn factory(&self, named_voice: bool, amplitude: f32) -> ModelFactory {
        let builds = self.builds.clone();
        let calls = self.calls.clone();
        let devices = self.devices.clone();
        Arc::new(move |device: DeviceKind| -> Result<Arc<dyn TtsModel>, SpeechError> {
            builds.fetch_add(1, Ordering::SeqCst);
            devices.lock().unwrap().push(device);
            let calls = calls.clone();
            let model = CustomTtsModel::new("fixture", move |_text, conditioning, _preset| {
                calls.fetch_add(1, Ordering::SeqCst);
                match conditioning {
                    VoiceConditioning::NamedVoice(_) if !named_voice => {
                        Err(SpeechError::Model("voice not registered".to_string()))
                    }
                    _ => Ok(ModelOutput::Single(
                        Array1::from_iter((0..2_205).map(|i| if i % 2 == 0 { amplitude } else { -amplitude }))
                            .into_dyn(),
                    )),
                }
            });
            Ok(Arc::new(model))
        })
    }
}

fn write_clip(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..4_410 {
        writer.write_sample(((i % 100) * 100) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn config(root: &TempDir, with_voices: bool) -> SpeechConfig {
    let voice_dir = root.path().join("voices");
    if with_voices {
        std::fs::create_dir_all(&voice_dir).unwrap();
        for name in ["a.wav", "b.wav", "c.wav", "d.wav"] {
            write_clip(&voice_dir.join(name));
        }
    }
    SpeechConfig {
        voice_dir,
        cache_dir: root.path().join("cache"),
        ..SpeechConfig::default()
    }
}

fn cache_entries(root: &TempDir) -> usize {
    std::fs::read_dir(root.path().join("cache")).unwrap().count()
}

#[tokio::test]
async fn test_speak_twice_uses_cache() {
    let root = TempDir::new().unwrap();
    let fixture = Fixture::new();
    let player = Arc::new(RecordingPlayer::default());

    let pipeline = SpeechPipeline::builder(config(&root, false), fixture.factory(true, 0.5))
        .probe(CpuOnly)
        .player(player.clone())
        .build()
        .unwrap();

    let first = pipeline.speak("Ciao").await.unwrap();
    assert_eq!(
        first.source,
        SpeakSource::Synthesized {
            device: DeviceKind::Cpu,
            strategy: Strategy::NamedVoice
        }
    );
    assert_eq!(first.playback, Some(PlaybackOutcome::Played));
    assert!(first.path.is_file());

    let second = pipeline.speak("Ciao").await.unwrap();
    assert!(second.from_cache());
    assert_eq!(second.path, first.path);

    assert_eq!(fixture.builds.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*player.played.lock().unwrap(), vec![first.path.clone(), first.path]);
    assert_eq!(cache_entries(&root), 1);
}

#[tokio::test]
async fn test_cache_hit_never_builds_model() {
    let root = TempDir::new().unwrap();
    let config = config(&root, false);
    std::fs::create_dir_all(&config.cache_dir).unwrap();

    let fixture = Fixture::new();
    let pipeline = SpeechPipeline::builder(config, fixture.factory(true, 0.5))
        .probe(CpuOnly)
        .player(Arc::new(ReportOnlyPlayer))
        .build()
        .unwrap();

    // Any file at the cache path is trusted
    std::fs::write(pipeline.cache().path_for("Buongiorno"), b"prepared").unwrap();

    let outcome = pipeline.speak("Buongiorno").await.unwrap();
    assert!(outcome.from_cache());
    assert_eq!(outcome.playback, Some(PlaybackOutcome::Reported));
    assert_eq!(fixture.builds.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read(&outcome.path).unwrap(), b"prepared");
}

#[tokio::test]
async fn test_distinct_texts_get_distinct_entries() {
    let root = TempDir::new().unwrap();
    let fixture = Fixture::new();
    let pipeline = SpeechPipeline::builder(config(&root, false), fixture.factory(true, 0.5))
        .probe(CpuOnly)
        .player(Arc::new(ReportOnlyPlayer))
        .build()
        .unwrap();

    let a = pipeline.speak("Ciao").await.unwrap();
    let b = pipeline.speak("Arrivederci").await.unwrap();
    assert_ne!(a.path, b.path);
    assert_eq!(cache_entries(&root), 2);
}

#[tokio::test]
async fn test_cached_file_is_mono_at_playback_rate() {
    let root = TempDir::new().unwrap();
    let fixture = Fixture::new();
    let pipeline = SpeechPipeline::builder(config(&root, false), fixture.factory(true, 1.8))
        .probe(CpuOnly)
        .player(Arc::new(ReportOnlyPlayer))
        .build()
        .unwrap();

    let outcome = pipeline.speak("Ciao").await.unwrap();

    let reader = hound::WavReader::open(&outcome.path).unwrap();
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.spec().sample_rate, 44_100);
    let samples: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), 4_410);
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!(peak <= 0.99 + 1e-6);
}

#[tokio::test]
async fn test_fallback_through_pipeline() {
    let root = TempDir::new().unwrap();
    let fixture = Fixture::new();
    let pipeline = SpeechPipeline::builder(config(&root, true), fixture.factory(false, 0.5))
        .probe(CudaBox)
        .player(Arc::new(ReportOnlyPlayer))
        .build()
        .unwrap();

    let outcome = pipeline.speak("Ciao").await.unwrap();
    assert_eq!(
        outcome.source,
        SpeakSource::Synthesized {
            device: DeviceKind::Cuda,
            strategy: Strategy::VoiceSamples
        }
    );
    assert_eq!(*fixture.devices.lock().unwrap(), vec![DeviceKind::Cuda]);
    assert_eq!(fixture.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_voice_dir_fails_without_cache_entry() {
    let root = TempDir::new().unwrap();
    let fixture = Fixture::new();
    let pipeline = SpeechPipeline::builder(config(&root, false), fixture.factory(false, 0.5))
        .probe(CpuOnly)
        .player(Arc::new(ReportOnlyPlayer))
        .build()
        .unwrap();

    let err = pipeline.speak("Ciao").await.unwrap_err();
    assert!(matches!(err, SpeechError::SynthesisFailed(_)));
    assert!(matches!(err.root_cause(), SpeechError::VoiceDirectoryMissing(_)));
    assert!(pipeline.cache().lookup("Ciao").is_none());
    assert_eq!(cache_entries(&root), 0);
}

#[tokio::test]
async fn test_failed_synthesis_leaves_no_cache_entry() {
    let root = TempDir::new().unwrap();
    let factory: ModelFactory = Arc::new(|_device: DeviceKind| -> Result<Arc<dyn TtsModel>, SpeechError> {
        Ok(Arc::new(CustomTtsModel::new("broken", |_text, _conditioning, _preset| {
            Err(SpeechError::Model("CUDA out of memory".to_string()))
        })))
    });

    let pipeline = SpeechPipeline::builder(config(&root, true), factory)
        .probe(CpuOnly)
        .player(Arc::new(ReportOnlyPlayer))
        .build()
        .unwrap();

    let err = pipeline.speak("Ciao").await.unwrap_err();
    assert!(matches!(err.root_cause(), SpeechError::Model(_)));
    assert_eq!(cache_entries(&root), 0);
}

#[tokio::test]
async fn test_playback_failure_still_returns_file() {
    let root = TempDir::new().unwrap();
    let fixture = Fixture::new();
    let pipeline = SpeechPipeline::builder(config(&root, false), fixture.factory(true, 0.5))
        .probe(CpuOnly)
        .player(Arc::new(BrokenPlayer))
        .build()
        .unwrap();

    let outcome = pipeline.speak("Ciao").await.unwrap();
    assert_eq!(outcome.playback, None);
    assert!(outcome.path.is_file());
}

#[tokio::test]
async fn test_empty_text_is_rejected() {
    let root = TempDir::new().unwrap();
    let fixture = Fixture::new();
    let pipeline = SpeechPipeline::builder(config(&root, false), fixture.factory(true, 0.5))
        .probe(CpuOnly)
        .player(Arc::new(ReportOnlyPlayer))
        .build()
        .unwrap();

    assert!(matches!(pipeline.speak("").await, Err(SpeechError::Config(_))));
    assert_eq!(fixture.builds.load(Ordering::SeqCst), 0);
}

#[test]
fn test_build_rejects_invalid_config() {
    let root = TempDir::new().unwrap();
    let mut config = config(&root, false);
    config.peak_ceiling = 2.0;

    let result = SpeechPipeline::builder(config, Fixture::new().factory(true, 0.5)).build();
    assert!(matches!(result, Err(SpeechError::Config(_))));
}

#[test]
fn test_build_creates_cache_dir() {
    let root = TempDir::new().unwrap();
    let config = config(&root, false);
    let cache_dir = config.cache_dir.clone();

    let pipeline = SpeechPipeline::builder(config, Fixture::new().factory(true, 0.5))
        .build()
        .unwrap();
    assert!(cache_dir.is_dir());
    assert_eq!(pipeline.cache().dir(), cache_dir.as_path());
    assert_eq!(pipeline.config().preset, "ultra_fast");
}
