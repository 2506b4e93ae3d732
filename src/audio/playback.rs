use super::capability::{PlaybackDevice, PlaybackHandle};
use crate::locator::Locator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::io::Cursor;

/// Speaker output over rodio
///
/// Local locators are read from disk, remote ones are downloaded in full
/// before decoding.
pub struct SpeakerPlayback {
    client: reqwest::Client,
}

impl Default for SpeakerPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeakerPlayback {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>> {
        if locator.is_remote() {
            let bytes = self
                .client
                .get(locator.as_str())
                .send()
                .await
                .with_context(|| format!("Failed to fetch {}", locator))?
                .error_for_status()
                .with_context(|| format!("Server rejected {}", locator))?
                .bytes()
                .await
                .with_context(|| format!("Failed to read body of {}", locator))?;
            return Ok(bytes.to_vec());
        }

        let path = locator
            .to_path()
            .with_context(|| format!("Unsupported locator: {}", locator))?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read sound file: {:?}", path))
    }
}

#[async_trait(?Send)]
impl PlaybackDevice for SpeakerPlayback {
    async fn load_and_prepare(&mut self, locator: &Locator) -> Result<Box<dyn PlaybackHandle>> {
        let data = self.fetch(locator).await?;

        let mut stream =
            OutputStreamBuilder::open_default_stream().context("Failed to open audio output")?;
        stream.log_on_drop(false);

        let source = Decoder::new(Cursor::new(data))
            .with_context(|| format!("Failed to decode {}", locator))?;

        // Prepared paused; play() starts it
        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        sink.append(source);

        tracing::debug!("Loaded {}", locator);
        Ok(Box::new(SpeakerHandle {
            _stream: stream,
            sink,
            locator: locator.clone(),
        }))
    }
}

struct SpeakerHandle {
    // Output stays open for as long as the handle lives
    _stream: OutputStream,
    sink: Sink,
    locator: Locator,
}

#[async_trait(?Send)]
impl PlaybackHandle for SpeakerHandle {
    async fn play(&mut self) -> Result<()> {
        self.sink.play();
        tracing::info!("Playing {}", self.locator);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.sink.stop();
        Ok(())
    }

    fn release(self: Box<Self>) {
        tracing::debug!("Released {}", self.locator);
    }
}
