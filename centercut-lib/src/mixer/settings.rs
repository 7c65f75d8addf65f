use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_SIZE, FADE_IN_OUT_MS, MIXER_MEMORY_LIMIT};
use crate::error::CenterCutError;

/// Mixer fade timing and memory budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    /// Default fade duration for adds and removals.
    pub fade_in_out_ms: f32,
    /// Total samples the mixer may pull across all channels per pass.
    pub memory_limit: usize,
    pub chunk_size: usize,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            fade_in_out_ms: FADE_IN_OUT_MS,
            memory_limit: MIXER_MEMORY_LIMIT,
            chunk_size: CHUNK_SIZE,
        }
    }
}

impl MixerSettings {
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] for a zero chunk size or a
    /// negative fade.
    pub fn validate(&self) -> Result<(), CenterCutError> {
        if self.chunk_size == 0 {
            return Err(CenterCutError::InvalidConfig(
                "mixer chunk size must be non-zero".to_string(),
            ));
        }
        if !(self.fade_in_out_ms >= 0.0) {
            return Err(CenterCutError::InvalidConfig(format!(
                "fade duration {} ms must be >= 0",
                self.fade_in_out_ms
            )));
        }
        Ok(())
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_secs_f32(self.fade_in_out_ms.max(0.0) / 1000.0)
    }

    /// Whole chunks the memory budget allows, at least one.
    pub fn chunks_memory_limit(&self) -> usize {
        (self.memory_limit / self.chunk_size.max(1)).max(1)
    }

    /// Samples each channel may contribute when `active` channels share the
    /// budget.
    pub fn per_channel_limit(&self, active: usize) -> usize {
        (self.chunks_memory_limit() / active.max(1)).max(1) * self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_split_between_active_channels() {
        let settings = MixerSettings::default();
        assert_eq!(settings.chunks_memory_limit(), 512);
        assert_eq!(settings.per_channel_limit(1), 512 * 2048);
        assert_eq!(settings.per_channel_limit(4), 128 * 2048);
        assert_eq!(settings.per_channel_limit(10_000), 2048);
    }

    #[test]
    fn validates_fields() {
        assert!(MixerSettings::default().validate().is_ok());
        let settings = MixerSettings {
            chunk_size: 0,
            ..MixerSettings::default()
        };
        assert!(settings.validate().is_err());
        let settings = MixerSettings {
            fade_in_out_ms: -1.0,
            ..MixerSettings::default()
        };
        assert!(settings.validate().is_err());
        assert_eq!(MixerSettings::default().fade_duration(), Duration::from_millis(250));
    }
}
