// NOTE: Captures are always written as 16-bit signed integer PCM.
// The preset only chooses sample rate and channel count.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Calculate number of interleaved samples for a given duration in seconds
    pub fn samples_for_duration(&self, seconds: f32) -> usize {
        (self.sample_rate as f32 * seconds) as usize * self.channels as usize
    }
}

/// Capture quality requested from the capture capability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    #[default]
    High,
    Low,
}

impl QualityPreset {
    pub fn format(self) -> AudioFormat {
        match self {
            QualityPreset::High => AudioFormat {
                sample_rate: 44100,
                channels: 2,
            },
            QualityPreset::Low => AudioFormat {
                sample_rate: 16000,
                channels: 1,
            },
        }
    }
}
