//! Per-profile derived parameters.
//!
//! Frequencies are stored as ratios of the base frequency handed to
//! `start_fan_sound`; the same ratios are reused when the speed changes.
//! Adding a fan model means adding a row here and one in the profile table.

use crate::dsp::filter::FilterType;
use crate::dsp::noise::{NoiseTexture, RattleBurst};
use crate::dsp::oscillator::Waveform;
use crate::profile::ProfileId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voicing {
    pub tone_waveform: Waveform,
    /// Tone oscillator frequency as a fraction of the base frequency.
    pub tone_ratio: f64,
    pub filter_type: FilterType,
    pub cutoff_ratio: f64,
    pub filter_q: f64,
    pub motor_waveform: Waveform,
    pub motor_ratio: f64,
    pub noise: NoiseTexture,
    /// Tone gain at full volume; noise follows at 70%.
    pub volume_scale: f64,
    /// Tone gain reached by a fade-in; noise follows at 60%.
    pub fade_in_level: f64,
    /// Motor gain reached by a fade-in.
    pub motor_fade_level: f64,
    /// Motor gain per unit of speed multiplier.
    pub motor_speed_gain: f64,
}

impl Voicing {
    /// Noise gain relative to tone gain after `set_volume`.
    pub const NOISE_VOLUME_SHARE: f64 = 0.7;
    /// Noise gain relative to tone gain after `fade_in`.
    pub const NOISE_FADE_SHARE: f64 = 0.6;
}

static TABLE: Voicing = Voicing {
    tone_waveform: Waveform::Sawtooth,
    tone_ratio: 0.40,
    filter_type: FilterType::Lowpass,
    cutoff_ratio: 3.0,
    filter_q: 1.2,
    motor_waveform: Waveform::Sine,
    motor_ratio: 0.15,
    noise: NoiseTexture::PLAIN,
    volume_scale: 0.6,
    fade_in_level: 0.5,
    motor_fade_level: 0.06,
    motor_speed_gain: 0.08,
};

static CEILING: Voicing = Voicing {
    tone_waveform: Waveform::Triangle,
    tone_ratio: 0.25,
    filter_type: FilterType::Lowpass,
    cutoff_ratio: 1.8,
    filter_q: 0.8,
    motor_waveform: Waveform::Sine,
    motor_ratio: 0.10,
    noise: NoiseTexture {
        scale: 0.7,
        ..NoiseTexture::PLAIN
    },
    volume_scale: 0.5,
    fade_in_level: 0.4,
    motor_fade_level: 0.06,
    motor_speed_gain: 0.08,
};

static RUSTY: Voicing = Voicing {
    tone_waveform: Waveform::Square,
    tone_ratio: 0.30,
    filter_type: FilterType::Bandpass,
    cutoff_ratio: 1.5,
    filter_q: 2.5,
    motor_waveform: Waveform::Sawtooth,
    motor_ratio: 0.12,
    noise: NoiseTexture {
        scale: 1.3,
        spike_chance: 0.001,
        spike_depth: 0.4,
        rattle: Some(RattleBurst {
            period: 1000,
            length: 50,
            gain: 1.5,
        }),
    },
    volume_scale: 0.8,
    fade_in_level: 0.7,
    motor_fade_level: 0.12,
    motor_speed_gain: 0.15,
};

static MODERN: Voicing = Voicing {
    tone_waveform: Waveform::Sine,
    tone_ratio: 0.50,
    filter_type: FilterType::Lowpass,
    cutoff_ratio: 4.0,
    filter_q: 0.3,
    motor_waveform: Waveform::Sine,
    motor_ratio: 0.08,
    noise: NoiseTexture {
        scale: 0.4,
        ..NoiseTexture::PLAIN
    },
    volume_scale: 0.3,
    fade_in_level: 0.25,
    motor_fade_level: 0.06,
    motor_speed_gain: 0.08,
};

/// The voicing row for a profile.
pub fn voicing(id: ProfileId) -> &'static Voicing {
    match id {
        ProfileId::Table => &TABLE,
        ProfileId::Ceiling => &CEILING,
        ProfileId::Rusty => &RUSTY,
        ProfileId::Modern => &MODERN,
    }
}
