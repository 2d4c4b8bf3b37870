//! Basic speech synthesis example
//!
//! Uses a tone generator in place of a neural model so it runs anywhere.

use ndarray::Array1;
use sounds_spk::engines::custom::CustomTtsModel;
use sounds_spk::{
    DeviceKind, ModelFactory, ModelOutput, ReportOnlyPlayer, SpeechConfig, SpeechError, SpeechPipeline, TtsModel,
};
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut config = SpeechConfig::default();
    config.cache_dir = std::env::temp_dir().join("sounds-spk-example");

    let factory: ModelFactory = Arc::new(|_device: DeviceKind| -> Result<Arc<dyn TtsModel>, SpeechError> {
        let model = CustomTtsModel::new("tone", |text, _conditioning, _preset| {
            // A tenth of a second of 440 Hz per character, at the nominal 22050 Hz
            let frames = 2_205 * text.chars().count();
            let tone = Array1::from_iter(
                (0..frames).map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 22_050.0).sin()),
            );
            Ok(ModelOutput::Single(tone.into_dyn()))
        });
        Ok(Arc::new(model))
    });

    let pipeline = SpeechPipeline::builder(config, factory)
        .player(Arc::new(ReportOnlyPlayer))
        .build()?;

    let text = "Hello from the sounds pipeline";
    for round in 1..=2 {
        let outcome = pipeline.speak(text).await?;
        println!(
            "round {}: {} (from cache: {})",
            round,
            outcome.path.display(),
            outcome.from_cache()
        );
    }

    Ok(())
}
