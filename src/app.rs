use crate::audio::{MicCapture, SpeakerPlayback};
use crate::config::Config;
use crate::index::{RecordingIndex, SqliteBackend};
use crate::input;
use crate::messages::{Intent, Snapshot};
use crate::services::{Controller, Toggled};
use crate::view;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub struct App {
    controller: Controller,
    intent_rx: mpsc::Receiver<Intent>,
    state_tx: watch::Sender<Snapshot>,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let index = Self::open_index(config).await;
        let controller = Controller::new(
            config.controller_options(),
            Box::new(MicCapture::new(config.recordings_dir.clone())),
            Box::new(SpeakerPlayback::new()),
            index,
        );

        let intent_rx = Self::setup_input();

        tracing::info!(
            "Ready with {} slot(s). Commands: record [n], play [n], preloaded, stop, discard [n], list, quit",
            config.slot_count
        );

        Ok(Self::with_controller(controller, intent_rx))
    }

    pub fn with_controller(controller: Controller, intent_rx: mpsc::Receiver<Intent>) -> Self {
        let (state_tx, _state_rx) = watch::channel(controller.snapshot());
        Self {
            controller,
            intent_rx,
            state_tx,
        }
    }

    /// Observe controller state as intents are handled
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state_tx.subscribe()
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            tracing::debug!("Main loop: waiting for intent");
            tokio::select! {
                intent = self.intent_rx.recv() => {
                    let Some(intent) = intent else { break };
                    if intent == Intent::Quit {
                        break;
                    }
                    self.handle_intent(intent).await;
                    self.publish();
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        self.controller.shutdown().await;
        self.publish();

        tracing::info!("Soundboard shutdown complete");
        Ok(())
    }

    /// Failures are already logged by the controller; the board just stays as it was
    async fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::ToggleCapture(slot) => {
                if let Ok(Toggled::Stopped(outcome)) = self.controller.toggle_capture(slot).await {
                    tracing::debug!("Slot {} now holds {}", slot, outcome.locator);
                }
            }
            Intent::DiscardCapture(slot) => {
                let _ = self.controller.discard_capture(slot).await;
            }
            Intent::PlaySlot(slot) => {
                let _ = self.controller.play_slot(slot).await;
            }
            Intent::PlayPreloaded => {
                let _ = self.controller.play_preloaded().await;
            }
            Intent::Stop => self.controller.stop(),
            Intent::ListRecordings => {
                if let Ok(records) = self.controller.list_recordings().await {
                    print!("{}", view::render_recordings(&records));
                }
            }
            Intent::Quit => {}
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.controller.snapshot());
    }

    async fn open_index(config: &Config) -> RecordingIndex {
        let path = config.database_path.clone();
        let opened = tokio::task::spawn_blocking(move || SqliteBackend::open(&path)).await;

        match opened {
            Ok(Ok(backend)) => RecordingIndex::open(Arc::new(backend), config.index_mode).await,
            Ok(Err(e)) => {
                tracing::warn!("Recording history unavailable, continuing without it: {:#}", e);
                RecordingIndex::disabled()
            }
            Err(e) => {
                tracing::warn!("Recording history unavailable, continuing without it: {}", e);
                RecordingIndex::disabled()
            }
        }
    }

    fn setup_input() -> mpsc::Receiver<Intent> {
        let (intent_tx, intent_rx) = mpsc::channel(10);
        tokio::spawn(async move {
            if let Err(e) = input::read_intents(intent_tx).await {
                tracing::error!("Input reader stopped: {}", e);
            }
        });
        intent_rx
    }
}
