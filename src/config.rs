/*
    Copyright (C) 2020-2024  Rafal Michalski

    This file is part of PICOSPEC, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Machine configuration.
#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use picospec_core::model::ComputerModel;

/// The initial settings of a [ZxSpectrum][crate::ZxSpectrum].
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "snapshot", serde(default, rename_all = "camelCase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpectrumConfig {
    /// The model the machine is reset to on creation.
    pub model: ComputerModel,
    /// Synchronize the emulation with real time.
    pub moderate: bool,
    pub muted: bool,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        SpectrumConfig {
            model: ComputerModel::Spectrum48,
            moderate: true,
            muted: false
        }
    }
}

impl SpectrumConfig {
    pub fn with_model(mut self, model: ComputerModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_moderate(mut self, moderate: bool) -> Self {
        self.moderate = moderate;
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }
}

#[cfg(all(test, feature = "snapshot"))]
mod tests {
    use super::*;

    #[test]
    fn config_serde_works() {
        let config = SpectrumConfig::default().with_model(ComputerModel::Spectrum128).with_muted(true);
        let json = serde_json::to_string(&config).unwrap();
        let config2: SpectrumConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, config2);
        let config: SpectrumConfig = serde_json::from_str(r#"{"model":"128"}"#).unwrap();
        assert_eq!(config, SpectrumConfig::default().with_model(ComputerModel::Spectrum128));
        let config: SpectrumConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SpectrumConfig::default());
        assert!(serde_json::from_str::<SpectrumConfig>(r#"{"model":"+3"}"#).is_err());
    }
}
