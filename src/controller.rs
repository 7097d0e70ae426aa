//! Fan session controller.
//!
//! Sequences engine commands the way the control panel does: announce the
//! change, drive the engine, and only mark the fan off once the fade-out has
//! finished. Holds the UI-side [`FanState`]; the engine never reads it.

use serde::{Deserialize, Serialize};

use crate::engine::SignalEngine;
use crate::narration::Narrator;
use crate::profile::{ProfileId, Speed};

/// Fade used when powering on or off.
pub const POWER_FADE_SECONDS: f64 = 0.8;
/// Fade used when switching fans while running.
pub const SWITCH_FADE_SECONDS: f64 = 0.5;

/// Control-panel state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FanState {
    pub is_on: bool,
    pub speed: Speed,
    pub selected_fan: ProfileId,
    /// Volume in [0, 1].
    pub volume: f64,
}

impl Default for FanState {
    fn default() -> Self {
        FanState {
            is_on: false,
            speed: Speed::Medium,
            selected_fan: ProfileId::Table,
            volume: 0.7,
        }
    }
}

pub struct FanController {
    engine: SignalEngine,
    narrator: Narrator,
    state: FanState,
}

impl FanController {
    /// Take ownership of an engine and open its audio context.
    pub fn new(mut engine: SignalEngine, narrator: Narrator) -> Self {
        engine.initialize();
        FanController {
            engine,
            narrator,
            state: FanState::default(),
        }
    }

    pub fn state(&self) -> &FanState {
        &self.state
    }

    pub fn engine(&self) -> &SignalEngine {
        &self.engine
    }

    pub fn power_on(&mut self) {
        if self.state.is_on {
            return;
        }
        self.narrator.speak("Turning fan on");
        self.state.is_on = true;
        self.play_selected(POWER_FADE_SECONDS);
    }

    /// Fade out, then mark the fan off.
    pub async fn power_off(&mut self) {
        if !self.state.is_on {
            return;
        }
        self.narrator.speak("Turning fan off");
        self.engine.fade_out(POWER_FADE_SECONDS).await;
        self.state.is_on = false;
    }

    pub fn set_speed(&mut self, speed: Speed) {
        self.state.speed = speed;
        if self.state.is_on {
            self.engine.update_speed(speed);
        }
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.state.volume = volume.clamp(0.0, 1.0);
        if self.state.is_on {
            self.engine.set_volume(self.state.volume);
        }
    }

    /// Switch fan model; a running fan restarts with the new sound.
    pub fn select_fan(&mut self, id: ProfileId) {
        self.state.selected_fan = id;
        if self.state.is_on {
            self.play_selected(SWITCH_FADE_SECONDS);
        }
    }

    /// Release the audio context.
    pub fn shutdown(&mut self) {
        self.engine.cleanup();
        self.state.is_on = false;
    }

    fn play_selected(&mut self, fade: f64) {
        let profile = self.state.selected_fan.profile();
        self.engine
            .start_fan_sound(profile.base_frequency, profile.noise_color, profile.id);
        self.engine.fade_in(fade);
        self.engine.update_speed(self.state.speed);
        // Supersedes the fade-in ramp: gains settle at the volume level, not the fade level.
        self.engine.set_volume(self.state.volume);
    }
}
