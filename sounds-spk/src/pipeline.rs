//! End-to-end text-to-speech: cache, synthesis, post-processing, playback

use crate::audio::{AudioIo, AudioPostProcessor, VoiceConditioningLoader, WavAudioIo};
use crate::cache::CacheStore;
use crate::config::SpeechConfig;
use crate::device::{BackendProbe, DeviceKind, DeviceSelector, SystemProbe};
use crate::error::SpeechError;
use crate::player::{PlaybackOutcome, Player, SystemPlayer};
use crate::synthesizer::{ModelFactory, Strategy, SynthesisOrchestrator, SynthesisRequest};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Where the spoken file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakSource {
    Cache,
    Synthesized { device: DeviceKind, strategy: Strategy },
}

/// Result of one `speak` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakOutcome {
    pub path: PathBuf,
    pub source: SpeakSource,
    /// `None` when playback failed; the file is still valid
    pub playback: Option<PlaybackOutcome>,
}

impl SpeakOutcome {
    pub fn from_cache(&self) -> bool {
        self.source == SpeakSource::Cache
    }
}

/// Speaks one text per call
///
/// On a cache hit the file is played and nothing else runs: the model is not
/// even built. On a miss the device is chosen, the model synthesizes, the
/// audio is post-processed, committed to the cache and played.
pub struct SpeechPipeline {
    config: Arc<SpeechConfig>,
    cache: CacheStore,
    selector: DeviceSelector<Box<dyn BackendProbe>>,
    orchestrator: SynthesisOrchestrator,
    post: AudioPostProcessor,
    player: Arc<dyn Player>,
}

impl SpeechPipeline {
    pub fn builder(config: SpeechConfig, factory: ModelFactory) -> SpeechPipelineBuilder {
        SpeechPipelineBuilder {
            config,
            factory,
            probe: Box::new(SystemProbe),
            io: Arc::new(WavAudioIo),
            player: Arc::new(SystemPlayer),
        }
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Speak `text`, from the cache when possible
    pub async fn speak(&self, text: &str) -> Result<SpeakOutcome, SpeechError> {
        let request = SynthesisRequest::new(text, self.config.preset.as_str(), self.config.voice.as_str())?;

        if let Some(path) = self.cache.lookup(request.text()) {
            info!("Speaking from cache: {}", path.display());
            let playback = self.play(&path).await;
            return Ok(SpeakOutcome {
                path,
                source: SpeakSource::Cache,
                playback,
            });
        }

        let device = self.selector.select(self.config.use_accelerated);
        info!(
            "Generating audio (device={}) preset={}",
            device,
            request.preset()
        );

        let synthesis = self
            .orchestrator
            .synthesize(&request, device, &self.config.voice_dir)
            .await?;

        let processed = self.post.process(
            synthesis.waveform,
            self.config.model_sample_rate,
            self.config.output_sample_rate,
        );

        let path = self
            .cache
            .persist(request.text(), |scratch| self.post.save(scratch, &processed))?;
        info!(
            "Audio saved to cache: {} ({:.2}s @ {} Hz)",
            path.display(),
            processed.duration_secs(),
            processed.sample_rate
        );

        let playback = self.play(&path).await;
        Ok(SpeakOutcome {
            path,
            source: SpeakSource::Synthesized {
                device,
                strategy: synthesis.strategy,
            },
            playback,
        })
    }

    async fn play(&self, path: &Path) -> Option<PlaybackOutcome> {
        match self.player.play(path).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("Playback failed for {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Assembles a [`SpeechPipeline`], replacing host-specific parts when needed
pub struct SpeechPipelineBuilder {
    config: SpeechConfig,
    factory: ModelFactory,
    probe: Box<dyn BackendProbe>,
    io: Arc<dyn AudioIo>,
    player: Arc<dyn Player>,
}

impl SpeechPipelineBuilder {
    pub fn probe(mut self, probe: impl BackendProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn audio_io(mut self, io: Arc<dyn AudioIo>) -> Self {
        self.io = io;
        self
    }

    pub fn player(mut self, player: Arc<dyn Player>) -> Self {
        self.player = player;
        self
    }

    /// Validate the configuration and open the cache directory
    pub fn build(self) -> Result<SpeechPipeline, SpeechError> {
        self.config.validate().map_err(SpeechError::Config)?;

        let cache = CacheStore::open(&self.config.cache_dir)?;
        let loader = VoiceConditioningLoader::with_rate(self.io.clone(), self.config.conditioning_sample_rate);
        let orchestrator = SynthesisOrchestrator::new(self.factory, loader)
            .with_max_voice_samples(self.config.max_voice_samples)
            .with_model_sample_rate(self.config.model_sample_rate);
        let post = AudioPostProcessor::with_ceiling(self.io, self.config.peak_ceiling);

        Ok(SpeechPipeline {
            config: Arc::new(self.config),
            cache,
            selector: DeviceSelector::new(self.probe),
            orchestrator,
            post,
            player: self.player,
        })
    }
}
