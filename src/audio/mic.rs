use super::capability::{CaptureDevice, CaptureHandle, SessionOptions};
use super::capture::AudioCapture;
use super::format::QualityPreset;
use super::wav_sink::WavSink;
use crate::locator::Locator;
use crate::messages::GrantState;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Microphone capture backed by the default cpal input device
///
/// Every capture lands in its own `recording-*.wav` under `recordings_dir`.
pub struct MicCapture {
    recordings_dir: PathBuf,
    session: Option<SessionOptions>,
}

impl MicCapture {
    pub fn new(recordings_dir: PathBuf) -> Self {
        Self {
            recordings_dir,
            session: None,
        }
    }
}

#[async_trait(?Send)]
impl CaptureDevice for MicCapture {
    async fn request_permission(&mut self) -> Result<GrantState> {
        // Desktop hosts have no prompt; an input device is the grant
        let grant = tokio::task::spawn_blocking(AudioCapture::input_available)
            .await
            .context("Permission probe failed")?;

        Ok(if grant {
            GrantState::Granted
        } else {
            GrantState::Denied
        })
    }

    fn configure_session(&mut self, options: SessionOptions) -> Result<()> {
        tracing::debug!("Audio session configured: {:?}", options);
        self.session = Some(options);
        Ok(())
    }

    async fn begin_capture(&mut self, preset: QualityPreset) -> Result<Box<dyn CaptureHandle>> {
        if !self.session.is_some_and(|s| s.allows_recording) {
            anyhow::bail!("Audio session is not configured for recording");
        }

        tokio::fs::create_dir_all(&self.recordings_dir)
            .await
            .with_context(|| {
                format!("Failed to create recordings directory: {:?}", self.recordings_dir)
            })?;

        let (_file, path) = tempfile::Builder::new()
            .prefix("recording-")
            .suffix(".wav")
            .tempfile_in(&self.recordings_dir)
            .context("Failed to create recording file")?
            .keep()
            .context("Failed to keep recording file")?;

        match start_pipeline(&path, preset) {
            Ok((stream, writer)) => Ok(Box::new(MicCaptureHandle {
                path,
                stream,
                writer,
            })),
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }
}

fn start_pipeline(
    path: &std::path::Path,
    preset: QualityPreset,
) -> Result<(AudioCapture, JoinHandle<Result<WavSink>>)> {
    let format = preset.format();
    let sink = WavSink::create(path, format)?;

    let (audio_tx, audio_rx) = mpsc::channel(100);
    let stream = AudioCapture::start(format, audio_tx)?;
    let writer = tokio::task::spawn_local(write_chunks(audio_rx, sink));

    Ok((stream, writer))
}

/// Stream chunks into the sink until the capture closes the channel
async fn write_chunks(mut audio_rx: mpsc::Receiver<Vec<f32>>, mut sink: WavSink) -> Result<WavSink> {
    while let Some(chunk) = audio_rx.recv().await {
        sink.write_chunk(chunk)?;
    }
    Ok(sink)
}

struct MicCaptureHandle {
    path: PathBuf,
    stream: AudioCapture,
    writer: JoinHandle<Result<WavSink>>,
}

impl MicCaptureHandle {
    async fn drain(self) -> (PathBuf, Result<()>) {
        self.stream.stop().await;

        let result = match self.writer.await {
            Ok(Ok(sink)) => sink.finalize().await,
            Ok(Err(e)) => Err(e),
            Err(e) => Err(anyhow::anyhow!("Capture writer task failed: {}", e)),
        };
        (self.path, result)
    }
}

/// Locator for a drained capture; an unfinished file is removed since no slot
/// or index entry will ever reach it
async fn settle(path: PathBuf, result: Result<()>) -> Result<Locator> {
    if let Err(e) = result {
        if let Err(remove) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove unfinished recording {:?}: {}", path, remove);
        }
        return Err(e);
    }
    Ok(Locator::from_path(&path))
}

#[async_trait(?Send)]
impl CaptureHandle for MicCaptureHandle {
    async fn finalize(self: Box<Self>) -> Result<Locator> {
        let (path, result) = (*self).drain().await;
        settle(path, result).await
    }

    async fn discard(self: Box<Self>) -> Result<()> {
        let (path, result) = (*self).drain().await;
        if let Err(e) = result {
            tracing::debug!("Ignoring writer error on discard: {}", e);
        }
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to remove discarded recording: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_finalize_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording-broken.wav");
        std::fs::write(&path, b"partial").unwrap();

        let result = settle(path.clone(), Err(anyhow::anyhow!("writer failed"))).await;
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_finalized_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recording-ok.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let locator = settle(path.clone(), Ok(())).await.unwrap();
        assert_eq!(locator.to_path(), Some(path.clone()));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_begin_capture_requires_recording_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut mic = MicCapture::new(dir.path().join("recordings"));
        mic.configure_session(SessionOptions {
            allows_recording: false,
            plays_in_silent_mode: true,
        })
        .unwrap();

        assert!(mic.begin_capture(QualityPreset::Low).await.is_err());
        assert!(!dir.path().join("recordings").exists());
    }
}
