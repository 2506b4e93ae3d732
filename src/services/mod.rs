pub mod controller;

pub use controller::{CaptureOutcome, Controller, ControllerOptions, Toggled};
