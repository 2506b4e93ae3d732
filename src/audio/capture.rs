use super::format::AudioFormat;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, StreamConfig};
use ringbuf::{HeapRb, traits::*};
use std::sync::Arc;
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Live microphone stream feeding chunks into a channel
///
/// Holds a `cpal::Stream`, which is `!Send`; the bridge task runs on the
/// current `LocalSet`.
pub struct AudioCapture {
    stream: cpal::Stream,
    stop_tx: oneshot::Sender<()>,
    bridge: JoinHandle<()>,
}

impl AudioCapture {
    /// Whether the host exposes a default input device at all
    pub fn input_available() -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    /// Start audio capture
    ///
    /// Audio chunks are sent via chunk_tx until `stop` is called.
    pub fn start(format: AudioFormat, chunk_tx: mpsc::Sender<Vec<f32>>) -> Result<Self> {
        let ring = HeapRb::<f32>::new(format.samples_for_duration(60.0));
        let (mut producer, consumer) = ring.split();

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No input audio device available")?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: BufferSize::Default,
        };

        let notify = Arc::new(Notify::new());
        let notify_callback = notify.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    producer.push_slice(data);
                    notify_callback.notify_one();
                },
                move |err| {
                    tracing::warn!("Audio stream error: {}", err);
                },
                None,
            )
            .context("Failed to build input stream")?;

        stream.play().context("Failed to start audio stream")?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let chunk_size = format.samples_for_duration(0.5);
        let bridge = tokio::task::spawn_local(Self::bridge_task(
            consumer, chunk_tx, chunk_size, notify, stop_rx,
        ));

        tracing::info!("Audio capture started");
        Ok(Self {
            stream,
            stop_tx,
            bridge,
        })
    }

    /// Stop the device and wait until every captured sample has been forwarded.
    /// The chunk channel is closed once this returns.
    pub async fn stop(self) {
        drop(self.stream);
        let _ = self.stop_tx.send(());
        if let Err(e) = self.bridge.await {
            tracing::warn!("Capture bridge task failed: {}", e);
        }
        tracing::info!("Audio capture stopped");
    }

    async fn bridge_task(
        mut consumer: impl Consumer<Item = f32>,
        tx: mpsc::Sender<Vec<f32>>,
        chunk_size: usize,
        notify: Arc<Notify>,
        mut stop_rx: oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = notify.notified() => {
                    while consumer.occupied_len() >= chunk_size {
                        let mut chunk = vec![0.0f32; chunk_size];
                        let n = consumer.pop_slice(&mut chunk);
                        chunk.truncate(n);

                        if tx.send(chunk).await.is_err() {
                            return;
                        }
                    }
                }
                _ = &mut stop_rx => break,
            }
        }

        // Flush the tail that never filled a whole chunk
        let remaining = consumer.occupied_len();
        if remaining > 0 {
            let mut chunk = vec![0.0f32; remaining];
            let n = consumer.pop_slice(&mut chunk);
            chunk.truncate(n);
            let _ = tx.send(chunk).await;
        }
    }
}
