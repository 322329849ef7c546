//! Run profiles: key material and pipeline shape as data.
//!
//! A [`Profile`] is what lives in a TOML file or on the command line;
//! validation happens when it is turned into a
//! [`KeySchedule`](crate::schedule::KeySchedule).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schedule::{ConfigError, KeySchedule};
use crate::timing::DEFAULT_CLOCK_HZ;

/// Run parameters, plain data until validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    /// Public exponent e.
    pub exponent: u64,
    /// Modulus n.
    pub modulus: u64,
    /// Pipeline depth.
    pub stages: u32,
    /// Exponent register width in bits.
    pub width: u32,
    /// Target clock for latency projection.
    pub clock_hz: u64,
}

impl Default for Profile {
    /// The reference bench shape: the sample key pair in a 64-bit register,
    /// eight stages, 150 MHz target clock.
    fn default() -> Self {
        Self {
            exponent: 8954,
            modulus: 25_553,
            stages: 8,
            width: 64,
            clock_hz: DEFAULT_CLOCK_HZ,
        }
    }
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse profile {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

impl Profile {
    /// Load a profile from TOML. Missing keys fall back to the defaults;
    /// unknown keys are rejected.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ProfileError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Validate the profile into a runnable key schedule.
    pub fn schedule(&self) -> Result<KeySchedule, ConfigError> {
        KeySchedule::new(self.exponent, self.modulus, self.width, self.stages)
    }
}
