//! Error types surfaced by the controller
//!
//! Platform seams report `anyhow::Error`; the controller wraps them in the
//! variant naming the step that failed.

use crate::messages::SlotId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoundboardError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Failed to start capture: {0:#}")]
    CaptureAcquisition(#[source] anyhow::Error),

    #[error("Failed to finalize capture: {0:#}")]
    CaptureFinalization(#[source] anyhow::Error),

    #[error("Failed to load sound: {0:#}")]
    PlaybackAcquisition(#[source] anyhow::Error),

    #[error("Persistence error: {0:#}")]
    Persistence(#[source] anyhow::Error),

    #[error("Slot {0} is not capturing")]
    NoActiveCapture(SlotId),

    #[error("Slot {0} is already capturing")]
    AlreadyCapturing(SlotId),

    #[error("Slot {0} does not exist")]
    UnknownSlot(SlotId),

    #[error("Slot {0} has no recording")]
    NoRecording(SlotId),
}

pub type SoundboardResult<T> = Result<T, SoundboardError>;
