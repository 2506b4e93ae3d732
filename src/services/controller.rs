use crate::audio::{
    CaptureDevice, CaptureHandle, PlaybackDevice, PlaybackHandle, QualityPreset, SessionOptions,
};
use crate::error::{SoundboardError, SoundboardResult};
use crate::index::{IndexRecord, PersistTask, RecordingIndex};
use crate::locator::Locator;
use crate::messages::{CaptureState, GrantState, PlayState, SlotId, SlotSnapshot, Snapshot};

/// Fixed settings for a controller instance
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub slot_count: usize,
    pub preloaded: Locator,
    pub quality: QualityPreset,
    pub session: SessionOptions,
}

#[derive(Default)]
struct Slot {
    // Some while capturing
    capture: Option<Box<dyn CaptureHandle>>,
    locator: Option<Locator>,
}

impl Slot {
    fn state(&self) -> CaptureState {
        if self.capture.is_some() {
            CaptureState::Capturing
        } else {
            CaptureState::Idle
        }
    }
}

#[derive(Default)]
struct PlaybackChannel {
    handle: Option<Box<dyn PlaybackHandle>>,
    active_locator: Option<Locator>,
    play_state: PlayState,
}

/// Result of a completed capture
pub struct CaptureOutcome {
    pub locator: Locator,
    /// Index write issued for this capture
    pub persisted: PersistTask,
}

pub enum Toggled {
    Started,
    Stopped(CaptureOutcome),
}

/// Owns the recording slots and the single playback channel
///
/// This service:
/// - Requests microphone permission lazily on the first capture
/// - Drives each slot between Idle and Capturing
/// - Keeps at most one sound loaded, releasing the old one before loading the next
/// - Hands finished captures to the recording index
///
/// Every failure is logged here once and also returned to the caller.
pub struct Controller {
    slots: Vec<Slot>,
    playback: PlaybackChannel,
    grant: GrantState,
    session: Option<SessionOptions>,
    options: ControllerOptions,
    capture: Box<dyn CaptureDevice>,
    player: Box<dyn PlaybackDevice>,
    index: RecordingIndex,
}

impl Controller {
    pub fn new(
        options: ControllerOptions,
        capture: Box<dyn CaptureDevice>,
        player: Box<dyn PlaybackDevice>,
        index: RecordingIndex,
    ) -> Self {
        let slots = (0..options.slot_count).map(|_| Slot::default()).collect();
        Self {
            slots,
            playback: PlaybackChannel::default(),
            grant: GrantState::Unknown,
            session: None,
            options,
            capture,
            player,
            index,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            slots: self
                .slots
                .iter()
                .enumerate()
                .map(|(id, slot)| SlotSnapshot {
                    id,
                    capture_state: slot.state(),
                    locator: slot.locator.clone(),
                })
                .collect(),
            play_state: self.playback.play_state,
            active_locator: self.playback.active_locator.clone(),
            grant: self.grant,
            session: self.session,
        }
    }

    pub async fn start_capture(&mut self, slot: SlotId) -> SoundboardResult<()> {
        let result = self.try_start_capture(slot).await;
        logged("Start capture", result)
    }

    pub async fn stop_capture(&mut self, slot: SlotId) -> SoundboardResult<CaptureOutcome> {
        let result = self.try_stop_capture(slot).await;
        logged("Stop capture", result)
    }

    /// Stop if the slot is capturing, otherwise start
    pub async fn toggle_capture(&mut self, slot: SlotId) -> SoundboardResult<Toggled> {
        match self.slot(slot).map(Slot::state) {
            Ok(CaptureState::Capturing) => self.stop_capture(slot).await.map(Toggled::Stopped),
            _ => self.start_capture(slot).await.map(|()| Toggled::Started),
        }
    }

    /// Abandon an in-progress capture without touching the slot's locator or the index
    pub async fn discard_capture(&mut self, slot: SlotId) -> SoundboardResult<()> {
        let result = self.try_discard_capture(slot).await;
        logged("Discard capture", result)
    }

    pub async fn play(&mut self, locator: Locator) -> SoundboardResult<()> {
        let result = self.try_play(locator).await;
        logged("Play", result)
    }

    pub async fn play_slot(&mut self, slot: SlotId) -> SoundboardResult<()> {
        let locator = match self.slot(slot) {
            Ok(s) => s.locator.clone().ok_or(SoundboardError::NoRecording(slot)),
            Err(e) => Err(e),
        };
        match locator {
            Ok(locator) => self.play(locator).await,
            Err(e) => logged("Play", Err(e)),
        }
    }

    pub async fn play_preloaded(&mut self) -> SoundboardResult<()> {
        let locator = self.options.preloaded.clone();
        self.play(locator).await
    }

    /// Stop and release the loaded sound. No-op when nothing is loaded.
    pub fn stop(&mut self) {
        if self.release_playback() {
            tracing::info!("Playback stopped");
        }
    }

    pub async fn list_recordings(&self) -> SoundboardResult<Vec<IndexRecord>> {
        let result = self.index.list_recordings().await;
        logged("List recordings", result)
    }

    /// Finalize open captures, release the playback handle and close the index
    pub async fn shutdown(&mut self) {
        for slot in 0..self.slots.len() {
            if self.slots[slot].capture.is_none() {
                continue;
            }
            if let Ok(outcome) = self.stop_capture(slot).await {
                // Logged by the write task on failure
                let _ = outcome.persisted.wait().await;
            }
        }

        self.stop();

        if let Err(e) = self.index.close().await {
            tracing::warn!("Failed to close recording index: {}", e);
        }
    }

    async fn try_start_capture(&mut self, slot: SlotId) -> SoundboardResult<()> {
        if self.slot(slot)?.capture.is_some() {
            return Err(SoundboardError::AlreadyCapturing(slot));
        }

        self.ensure_permission().await?;

        let session = self.options.session;
        self.capture
            .configure_session(session)
            .map_err(SoundboardError::CaptureAcquisition)?;
        self.session = Some(session);

        let handle = self
            .capture
            .begin_capture(self.options.quality)
            .await
            .map_err(SoundboardError::CaptureAcquisition)?;
        self.slots[slot].capture = Some(handle);

        tracing::info!("Slot {} recording", slot);
        Ok(())
    }

    async fn try_stop_capture(&mut self, slot: SlotId) -> SoundboardResult<CaptureOutcome> {
        let handle = self
            .slot_mut(slot)?
            .capture
            .take()
            .ok_or(SoundboardError::NoActiveCapture(slot))?;

        let locator = handle
            .finalize()
            .await
            .map_err(SoundboardError::CaptureFinalization)?;

        tracing::info!("Recording stopped and stored at {}", locator);
        self.slots[slot].locator = Some(locator.clone());

        let persisted = self.index.record_completion(slot, locator.clone());
        Ok(CaptureOutcome { locator, persisted })
    }

    async fn try_discard_capture(&mut self, slot: SlotId) -> SoundboardResult<()> {
        let handle = self
            .slot_mut(slot)?
            .capture
            .take()
            .ok_or(SoundboardError::NoActiveCapture(slot))?;

        handle
            .discard()
            .await
            .map_err(SoundboardError::CaptureFinalization)?;

        tracing::info!("Slot {} capture discarded", slot);
        Ok(())
    }

    async fn try_play(&mut self, locator: Locator) -> SoundboardResult<()> {
        // The previous handle is gone before the next one is acquired
        self.release_playback();

        let mut handle = self
            .player
            .load_and_prepare(&locator)
            .await
            .map_err(SoundboardError::PlaybackAcquisition)?;

        if let Err(e) = handle.play().await {
            handle.release();
            return Err(SoundboardError::PlaybackAcquisition(e));
        }

        self.playback = PlaybackChannel {
            handle: Some(handle),
            active_locator: Some(locator),
            play_state: PlayState::Playing,
        };
        Ok(())
    }

    async fn ensure_permission(&mut self) -> SoundboardResult<()> {
        if self.grant == GrantState::Granted {
            return Ok(());
        }

        self.grant = match self.capture.request_permission().await {
            Ok(grant) => grant,
            Err(e) => {
                tracing::debug!("Permission request failed: {:#}", e);
                GrantState::Denied
            }
        };

        match self.grant {
            GrantState::Granted => Ok(()),
            _ => Err(SoundboardError::PermissionDenied),
        }
    }

    /// Returns whether a handle was held
    fn release_playback(&mut self) -> bool {
        let Some(mut handle) = self.playback.handle.take() else {
            return false;
        };

        if let Err(e) = handle.stop() {
            tracing::warn!("Failed to stop playback: {}", e);
        }
        handle.release();

        self.playback.active_locator = None;
        self.playback.play_state = PlayState::Stopped;
        true
    }

    fn slot(&self, slot: SlotId) -> SoundboardResult<&Slot> {
        self.slots.get(slot).ok_or(SoundboardError::UnknownSlot(slot))
    }

    fn slot_mut(&mut self, slot: SlotId) -> SoundboardResult<&mut Slot> {
        self.slots
            .get_mut(slot)
            .ok_or(SoundboardError::UnknownSlot(slot))
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.release_playback();
    }
}

fn logged<T>(operation: &str, result: SoundboardResult<T>) -> SoundboardResult<T> {
    if let Err(e) = &result {
        tracing::error!("{} failed: {}", operation, e);
    }
    result
}
