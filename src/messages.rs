use crate::audio::SessionOptions;
use crate::locator::Locator;

/// Index of a recording slot, stable for the lifetime of the process
pub type SlotId = usize;

/// Capture state of a single slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
}

/// State of the shared playback channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
}

/// Microphone permission, process-wide
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GrantState {
    #[default]
    Unknown,
    Denied,
    Granted,
}

/// Commands dispatched by the view layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    ToggleCapture(SlotId),
    DiscardCapture(SlotId),
    PlaySlot(SlotId),
    PlayPreloaded,
    Stop,
    ListRecordings,
    Quit,
}

/// Read-only view of one slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub id: SlotId,
    pub capture_state: CaptureState,
    pub locator: Option<Locator>,
}

/// Read-only view of the controller (observable via watch channel)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub slots: Vec<SlotSnapshot>,
    pub play_state: PlayState,
    pub active_locator: Option<Locator>,
    pub grant: GrantState,
    /// Last session configuration applied for capture
    pub session: Option<SessionOptions>,
}
