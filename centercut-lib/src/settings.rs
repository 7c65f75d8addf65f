//! Top-level engine settings loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::dsp::center_cut::CenterCutSettings;
use crate::error::CenterCutError;
use crate::live::LiveStorageSettings;
use crate::mixer::MixerSettings;

/// Everything a front end configures: separator, live storage and mixer.
///
/// Missing fields fall back to their defaults, so `{}` is a valid payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub center_cut: CenterCutSettings,
    pub storage: LiveStorageSettings,
    pub mixer: MixerSettings,
}

impl EngineSettings {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    /// Returns [`CenterCutError::InvalidConfig`] for malformed JSON or
    /// values any component rejects.
    pub fn from_json(json: &str) -> Result<Self, CenterCutError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, CenterCutError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    /// Returns the first component's validation error.
    pub fn validate(&self) -> Result<(), CenterCutError> {
        self.center_cut.validate()?;
        self.storage.validate()?;
        self.mixer.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::center_cut::OutputMode;

    #[test]
    fn empty_object_yields_defaults() {
        let settings = EngineSettings::from_json("{}").expect("settings");
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.center_cut.window_size, 8192);
        assert_eq!(settings.mixer.fade_in_out_ms, 250.0);
    }

    #[test]
    fn partial_documents_override_named_fields() {
        let json = r#"{ "center_cut": { "output": "Center", "bass_to_sides": true } }"#;
        let settings = EngineSettings::from_json(json).expect("settings");
        assert_eq!(settings.center_cut.output, OutputMode::Center);
        assert!(settings.center_cut.bass_to_sides);
        assert_eq!(settings.center_cut.overlap_count, 4);
    }

    #[test]
    fn json_survives_a_round_trip() {
        let mut settings = EngineSettings::default();
        settings.storage.amplitude_factor = 0.5;
        let json = settings.to_json().expect("json");
        assert_eq!(EngineSettings::from_json(&json).expect("settings"), settings);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(EngineSettings::from_json(r#"{ "center_cut": { "window_size": 1000 } }"#).is_err());
        assert!(EngineSettings::from_json("not json").is_err());
    }
}
