//! Playback of the final audio file

use crate::engines::command::find_executable;
use crate::error::SpeechError;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// What happened to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Sent to an audio player
    Played,
    /// No player: the file was only announced
    Reported,
}

#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self, path: &Path) -> Result<PlaybackOutcome, SpeechError>;
}

/// `afplay` on macOS, announcement elsewhere
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPlayer;

#[async_trait]
impl Player for SystemPlayer {
    async fn play(&self, path: &Path) -> Result<PlaybackOutcome, SpeechError> {
        if cfg!(target_os = "macos") {
            if let Some(afplay) = find_executable(Path::new("afplay")) {
                let status = Command::new(afplay).arg(path).status().await?;
                if !status.success() {
                    return Err(SpeechError::Audio(format!("afplay exited with {}", status)));
                }
                return Ok(PlaybackOutcome::Played);
            }
        }

        info!("File ready: {}", path.display());
        Ok(PlaybackOutcome::Reported)
    }
}

/// Never plays, only announces
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportOnlyPlayer;

#[async_trait]
impl Player for ReportOnlyPlayer {
    async fn play(&self, path: &Path) -> Result<PlaybackOutcome, SpeechError> {
        info!("File ready: {}", path.display());
        Ok(PlaybackOutcome::Reported)
    }
}
