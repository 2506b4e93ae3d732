//! Platform audio capabilities
//!
//! The controller only talks to the microphone and the speaker through these
//! traits. Handles are `!Send` (native streams live on the local task set),
//! so every trait is declared `?Send` and driven from a `LocalSet`.

use super::format::QualityPreset;
use crate::locator::Locator;
use crate::messages::GrantState;
use anyhow::Result;
use async_trait::async_trait;

/// Audio session configuration applied before a capture begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub allows_recording: bool,
    pub plays_in_silent_mode: bool,
}

#[async_trait(?Send)]
pub trait CaptureDevice {
    /// Ask the platform for microphone access
    async fn request_permission(&mut self) -> Result<GrantState>;

    fn configure_session(&mut self, options: SessionOptions) -> Result<()>;

    /// Acquire a native capture handle; audio flows until it is finalized
    async fn begin_capture(&mut self, preset: QualityPreset) -> Result<Box<dyn CaptureHandle>>;
}

/// An in-progress capture. Consumed by either `finalize` or `discard`.
#[async_trait(?Send)]
pub trait CaptureHandle {
    /// Stop capturing, flush everything to storage and return where it lives
    async fn finalize(self: Box<Self>) -> Result<Locator>;

    /// Stop capturing and throw the audio away
    async fn discard(self: Box<Self>) -> Result<()>;
}

#[async_trait(?Send)]
pub trait PlaybackDevice {
    /// Fetch and decode `locator`, returning a handle that is ready but silent
    async fn load_and_prepare(&mut self, locator: &Locator) -> Result<Box<dyn PlaybackHandle>>;
}

/// A loaded sound. `release` consumes the handle so it can only happen once.
#[async_trait(?Send)]
pub trait PlaybackHandle {
    async fn play(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn release(self: Box<Self>);
}
