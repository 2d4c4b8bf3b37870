// Sounds text-to-speech command line
// Speaks a phrase with a neural model, reusing cached audio when the phrase was spoken before

use anyhow::Context;
use clap::Parser;
use sounds_spk::config::DEFAULT_PHRASE;
use sounds_spk::engines::command::command_model_factory;
use sounds_spk::{Player, ReportOnlyPlayer, SpeakSource, SpeechConfig, SpeechPipeline, SystemPlayer, WavAudioIo};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sounds-speak")]
#[command(about = "Speak text with a neural TTS model, caching every phrase", long_about = None)]
#[command(version)]
struct Cli {
    /// Words to speak (joined with spaces)
    words: Vec<String>,

    /// Model preset (overrides TTS_PRESET)
    #[arg(long)]
    preset: Option<String>,

    /// Voice sample directory (overrides VOICE_DIR)
    #[arg(long)]
    voice_dir: Option<PathBuf>,

    /// Cache directory (overrides TTS_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Model program (overrides TTS_MODEL_CMD)
    #[arg(long)]
    model_cmd: Option<PathBuf>,

    /// Never try the MPS backend
    #[arg(long)]
    no_accel: bool,

    /// Only print the path of the audio file
    #[arg(long)]
    no_play: bool,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    show_config: bool,

    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn text(&self) -> String {
        if self.words.is_empty() {
            DEFAULT_PHRASE.to_string()
        } else {
            self.words.join(" ")
        }
    }

    fn apply(&self, config: &mut SpeechConfig) {
        if let Some(preset) = &self.preset {
            config.preset = preset.clone();
        }
        if let Some(dir) = &self.voice_dir {
            config.voice_dir = dir.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(cmd) = &self.model_cmd {
            config.model_command = cmd.clone();
        }
        if self.no_accel {
            config.use_accelerated = false;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    let mut config = SpeechConfig::from_env();
    cli.apply(&mut config);

    if cli.show_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let text = cli.text();
    debug!("Text to speak: {}", text);

    let io = Arc::new(WavAudioIo);
    let factory = command_model_factory(config.model_command.clone(), io.clone());
    let player: Arc<dyn Player> = if cli.no_play {
        Arc::new(ReportOnlyPlayer)
    } else {
        Arc::new(SystemPlayer)
    };

    let pipeline = SpeechPipeline::builder(config, factory)
        .audio_io(io)
        .player(player)
        .build()
        .context("Failed to set up speech pipeline")?;

    let outcome = pipeline
        .speak(&text)
        .await
        .context("Speech generation failed")?;

    match outcome.source {
        SpeakSource::Cache => info!("Served from cache"),
        SpeakSource::Synthesized { device, strategy } => {
            info!("Synthesized on {} using {}", device, strategy)
        }
    }
    println!("{}", outcome.path.display());

    Ok(())
}
