pub mod capability;
pub mod capture;
#[cfg(test)]
pub mod fake;
pub mod format;
pub mod mic;
pub mod playback;
pub mod wav_sink;

pub use capability::{CaptureDevice, CaptureHandle, PlaybackDevice, PlaybackHandle, SessionOptions};
pub use format::QualityPreset;
pub use mic::MicCapture;
pub use playback::SpeakerPlayback;
