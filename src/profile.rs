//! Fan profile table.
//!
//! The set of fans is fixed at compile time. Each profile carries the base
//! frequency and noise color the engine derives every other parameter from;
//! see [`crate::voicing`] for the derived values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Identifier of a fan model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileId {
    Table,
    Ceiling,
    Rusty,
    Modern,
}

impl ProfileId {
    /// Every profile id, in table order.
    pub const ALL: [ProfileId; 4] = [
        ProfileId::Table,
        ProfileId::Ceiling,
        ProfileId::Rusty,
        ProfileId::Modern,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileId::Table => "table",
            ProfileId::Ceiling => "ceiling",
            ProfileId::Rusty => "rusty",
            ProfileId::Modern => "modern",
        }
    }

    /// The static profile for this id. Infallible: every id has a row.
    pub fn profile(self) -> &'static FanProfile {
        match self {
            ProfileId::Table => &PROFILES[0],
            ProfileId::Ceiling => &PROFILES[1],
            ProfileId::Rusty => &PROFILES[2],
            ProfileId::Modern => &PROFILES[3],
        }
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProfileId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| EngineError::ProfileNotFound(s.to_string()))
    }
}

/// Spectral tilt of the texture noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

impl FromStr for NoiseColor {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(NoiseColor::White),
            "pink" => Ok(NoiseColor::Pink),
            "brown" => Ok(NoiseColor::Brown),
            other => Err(EngineError::UnknownNoiseColor(other.to_string())),
        }
    }
}

/// Fan speed setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    Slow,
    #[default]
    Medium,
    High,
}

impl Speed {
    /// Frequency multiplier applied to the active base frequency.
    pub fn multiplier(self) -> f64 {
        match self {
            Speed::Slow => 0.6,
            Speed::Medium => 1.0,
            Speed::High => 1.6,
        }
    }
}

impl FromStr for Speed {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slow" => Ok(Speed::Slow),
            "medium" => Ok(Speed::Medium),
            "high" => Ok(Speed::High),
            other => Err(EngineError::UnknownSpeed(other.to_string())),
        }
    }
}

/// One fan model's static description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanProfile {
    pub id: ProfileId,
    /// Display name (e.g. "Table Fan").
    pub name: &'static str,
    pub description: &'static str,
    /// Reference frequency in Hz; all oscillator and filter frequencies derive from it.
    pub base_frequency: f64,
    pub noise_color: NoiseColor,
    /// Presentation hint for a visual shake. Not read by the audio code.
    pub has_vibration: bool,
}

/// The profile table, in chooser order.
pub static PROFILES: [FanProfile; 4] = [
    FanProfile {
        id: ProfileId::Table,
        name: "Table Fan",
        description: "Classic desktop companion",
        base_frequency: 280.0,
        noise_color: NoiseColor::White,
        has_vibration: false,
    },
    FanProfile {
        id: ProfileId::Ceiling,
        name: "Ceiling Fan",
        description: "Overhead cooling power",
        base_frequency: 160.0,
        noise_color: NoiseColor::Brown,
        has_vibration: false,
    },
    FanProfile {
        id: ProfileId::Rusty,
        name: "Old Rusty Fan",
        description: "Vintage charm with character",
        base_frequency: 140.0,
        noise_color: NoiseColor::Brown,
        has_vibration: true,
    },
    FanProfile {
        id: ProfileId::Modern,
        name: "Modern Designer Fan",
        description: "Sleek and whisper quiet",
        base_frequency: 320.0,
        noise_color: NoiseColor::Pink,
        has_vibration: false,
    },
];

/// All profiles in stable insertion order.
pub fn list_profiles() -> &'static [FanProfile] {
    &PROFILES
}

/// Look up a profile by its lowercase id.
pub fn get_profile(id: &str) -> Result<&'static FanProfile, EngineError> {
    id.parse::<ProfileId>().map(ProfileId::profile)
}
