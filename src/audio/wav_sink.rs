use super::format::AudioFormat;
use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tokio::sync::{mpsc, oneshot};

enum WavCommand {
    WriteChunk(Vec<f32>),
    Finalize { reply: oneshot::Sender<Result<()>> },
}

/// WAV encoder using a dedicated blocking thread for I/O
///
/// Chunks are queued to the thread and written in order. A write error is
/// remembered and reported when the sink is finalized.
pub struct WavSink {
    tx: mpsc::UnboundedSender<WavCommand>,
}

impl WavSink {
    pub fn create(path: &Path, format: AudioFormat) -> Result<Self> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV writer: {:?}", path))?;

        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || write_loop(writer, rx));

        Ok(Self { tx })
    }

    /// Queue samples for writing. The Vec is moved to avoid copying.
    pub fn write_chunk(&mut self, samples: Vec<f32>) -> Result<()> {
        self.tx
            .send(WavCommand::WriteChunk(samples))
            .map_err(|_| anyhow::anyhow!("WAV writer thread has exited"))
    }

    pub async fn finalize(self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WavCommand::Finalize { reply })
            .map_err(|_| anyhow::anyhow!("WAV writer thread has exited"))?;

        rx.await.context("Failed to receive finalize response")?
    }
}

fn write_loop(
    mut writer: WavWriter<BufWriter<File>>,
    mut rx: mpsc::UnboundedReceiver<WavCommand>,
) {
    let mut failure: Option<hound::Error> = None;

    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            WavCommand::WriteChunk(samples) => {
                if failure.is_some() {
                    continue;
                }
                for sample in samples {
                    // f32 (-1.0 to 1.0) to i16
                    let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    if let Err(e) = writer.write_sample(amplitude) {
                        tracing::warn!("Failed to write sample: {}", e);
                        failure = Some(e);
                        break;
                    }
                }
            }
            WavCommand::Finalize { reply } => {
                let result = match failure.take() {
                    Some(e) => Err(anyhow::anyhow!("Failed to write WAV data: {}", e)),
                    None => writer.finalize().context("Failed to finalize WAV"),
                };
                let _ = reply.send(result);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_finalize_writes_all_queued_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let format = AudioFormat {
            sample_rate: 16000,
            channels: 1,
        };

        let mut sink = WavSink::create(&path, format).unwrap();
        sink.write_chunk(vec![0.0, 0.5, -0.5]).unwrap();
        sink.write_chunk(vec![1.0, 2.0]).unwrap();
        sink.finalize().await.unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[3], i16::MAX);
        // Out-of-range input is clamped
        assert_eq!(samples[4], i16::MAX);
    }
}
