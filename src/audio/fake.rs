//! Scripted capture and playback devices that record every call

use super::capability::{
    CaptureDevice, CaptureHandle, PlaybackDevice, PlaybackHandle, SessionOptions,
};
use super::format::QualityPreset;
use crate::locator::Locator;
use crate::messages::GrantState;
use anyhow::Result;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    PermissionRequested,
    SessionConfigured(SessionOptions),
    CaptureStarted(QualityPreset),
    CaptureFinalized(Locator),
    CaptureDiscarded,
    Acquired(Locator),
    Played(Locator),
    Stopped(Locator),
    Released(Locator),
}

#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<DeviceEvent>>>);

impl EventLog {
    fn push(&self, event: DeviceEvent) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.0.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&DeviceEvent) -> bool) -> usize {
        self.0.borrow().iter().filter(|e| matches(e)).count()
    }
}

pub struct FakeCapture {
    log: EventLog,
    grant: GrantState,
    fail_begin: bool,
    fail_finalize: bool,
    locators: VecDeque<Locator>,
    started: usize,
}

impl FakeCapture {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            grant: GrantState::Granted,
            fail_begin: false,
            fail_finalize: false,
            locators: VecDeque::new(),
            started: 0,
        }
    }

    pub fn with_grant(mut self, grant: GrantState) -> Self {
        self.grant = grant;
        self
    }

    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }

    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    /// Locators handed out by successive finalize calls
    pub fn finalizing<I, S>(mut self, locators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locators = locators.into_iter().map(Locator::new).collect();
        self
    }
}

#[async_trait(?Send)]
impl CaptureDevice for FakeCapture {
    async fn request_permission(&mut self) -> Result<GrantState> {
        self.log.push(DeviceEvent::PermissionRequested);
        Ok(self.grant)
    }

    fn configure_session(&mut self, options: SessionOptions) -> Result<()> {
        self.log.push(DeviceEvent::SessionConfigured(options));
        Ok(())
    }

    async fn begin_capture(&mut self, preset: QualityPreset) -> Result<Box<dyn CaptureHandle>> {
        if self.fail_begin {
            anyhow::bail!("microphone busy");
        }
        self.started += 1;
        self.log.push(DeviceEvent::CaptureStarted(preset));

        let locator = self
            .locators
            .pop_front()
            .unwrap_or_else(|| Locator::new(format!("file:///fake/{}.wav", self.started)));
        Ok(Box::new(FakeCaptureHandle {
            log: self.log.clone(),
            locator,
            fail: self.fail_finalize,
        }))
    }
}

struct FakeCaptureHandle {
    log: EventLog,
    locator: Locator,
    fail: bool,
}

#[async_trait(?Send)]
impl CaptureHandle for FakeCaptureHandle {
    async fn finalize(self: Box<Self>) -> Result<Locator> {
        if self.fail {
            anyhow::bail!("encoder crashed");
        }
        self.log.push(DeviceEvent::CaptureFinalized(self.locator.clone()));
        Ok(self.locator)
    }

    async fn discard(self: Box<Self>) -> Result<()> {
        self.log.push(DeviceEvent::CaptureDiscarded);
        Ok(())
    }
}

pub struct FakePlayback {
    log: EventLog,
    unreachable: Vec<Locator>,
}

impl FakePlayback {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            unreachable: Vec::new(),
        }
    }

    /// Loading this locator fails
    pub fn unreachable(mut self, locator: impl Into<String>) -> Self {
        self.unreachable.push(Locator::new(locator));
        self
    }
}

#[async_trait(?Send)]
impl PlaybackDevice for FakePlayback {
    async fn load_and_prepare(&mut self, locator: &Locator) -> Result<Box<dyn PlaybackHandle>> {
        if self.unreachable.contains(locator) {
            anyhow::bail!("404 for {}", locator);
        }
        self.log.push(DeviceEvent::Acquired(locator.clone()));
        Ok(Box::new(FakePlaybackHandle {
            log: self.log.clone(),
            locator: locator.clone(),
        }))
    }
}

struct FakePlaybackHandle {
    log: EventLog,
    locator: Locator,
}

#[async_trait(?Send)]
impl PlaybackHandle for FakePlaybackHandle {
    async fn play(&mut self) -> Result<()> {
        self.log.push(DeviceEvent::Played(self.locator.clone()));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.log.push(DeviceEvent::Stopped(self.locator.clone()));
        Ok(())
    }

    fn release(self: Box<Self>) {
        self.log.push(DeviceEvent::Released(self.locator.clone()));
    }
}
