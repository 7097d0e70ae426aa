//! Signal Engine: owns the fan sound graph and its lifecycle.
//!
//! ```text
//! Uninitialized --initialize--> Ready --start_fan_sound--> SoundActive
//!       ^                         ^  <------stop_fan_sound------'
//!       '---- (initialize) --- Closed <------- cleanup (any state)
//! ```
//!
//! Commands never return errors. When the host has no audio capability, or a
//! command arrives in a state where it has nothing to act on, the command
//! logs and does nothing.

use std::time::Duration;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::config::EngineConfig;
use crate::context::{AudioContext, ContextProvider, OfflineProvider};
use crate::dsp::graph::{FanGraph, ParamSnapshot};
use crate::dsp::noise::NoiseBuffer;
use crate::dsp::param::AudioParam;
use crate::profile::{NoiseColor, ProfileId, Speed};
use crate::voicing::{Voicing, voicing};

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    SoundActive,
    Closed,
}

/// What a playing fan remembers between commands.
#[derive(Debug, Clone, Copy)]
struct ActiveSound {
    profile: ProfileId,
    base_frequency: f64,
    voicing: &'static Voicing,
}

enum Lifecycle {
    Uninitialized,
    Ready(AudioContext),
    SoundActive(AudioContext, ActiveSound),
    Closed,
}

pub struct SignalEngine {
    lifecycle: Lifecycle,
    provider: Box<dyn ContextProvider>,
    config: EngineConfig,
    rng: Pcg32,
}

impl SignalEngine {
    pub fn new(config: EngineConfig, provider: Box<dyn ContextProvider>) -> Self {
        let rng = match config.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_entropy(),
        };
        SignalEngine {
            lifecycle: Lifecycle::Uninitialized,
            provider,
            config,
            rng,
        }
    }

    /// An engine backed by offline contexts.
    pub fn offline(config: EngineConfig) -> Self {
        SignalEngine::new(config, Box::new(OfflineProvider))
    }

    pub fn state(&self) -> LifecycleState {
        match self.lifecycle {
            Lifecycle::Uninitialized => LifecycleState::Uninitialized,
            Lifecycle::Ready(_) => LifecycleState::Ready,
            Lifecycle::SoundActive(..) => LifecycleState::SoundActive,
            Lifecycle::Closed => LifecycleState::Closed,
        }
    }

    pub fn active_profile(&self) -> Option<ProfileId> {
        self.active().map(|(_, sound)| sound.profile)
    }

    /// Reference frequency of the playing sound, used for speed scaling.
    pub fn current_base_frequency(&self) -> Option<f64> {
        self.active().map(|(_, sound)| sound.base_frequency)
    }

    pub fn context(&self) -> Option<&AudioContext> {
        match &self.lifecycle {
            Lifecycle::Ready(ctx) | Lifecycle::SoundActive(ctx, _) => Some(ctx),
            Lifecycle::Uninitialized | Lifecycle::Closed => None,
        }
    }

    pub fn live_generators(&self) -> usize {
        self.context().map_or(0, AudioContext::live_generators)
    }

    /// Scheduled targets of the active graph, for diagnostics and tests.
    pub fn param_snapshot(&self) -> Option<ParamSnapshot> {
        let (ctx, _) = self.active()?;
        ctx.with_graph(|graph, _| graph.snapshot())
    }

    /// Pull `frames` mono samples from the context. Silence without one.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        self.context()
            .map_or_else(|| vec![0.0; frames], |ctx| ctx.render(frames))
    }

    /// Open an audio context. A no-op while one is already open.
    pub fn initialize(&mut self) {
        match self.lifecycle {
            Lifecycle::Ready(_) | Lifecycle::SoundActive(..) => {}
            Lifecycle::Uninitialized | Lifecycle::Closed => {
                match self.provider.create_context(&self.config) {
                    Ok(ctx) => {
                        log::info!("audio context ready at {} Hz", ctx.sample_rate());
                        self.lifecycle = Lifecycle::Ready(ctx);
                    }
                    Err(e) => log::error!("audio context initialization failed: {e}"),
                }
            }
        }
    }

    /// Build and start the tone, motor, and texture chains for a profile.
    ///
    /// Any previous sound is torn down first. All gains start at zero, so the
    /// fan stays silent until a fade-in or volume command.
    pub fn start_fan_sound(&mut self, base_frequency: f64, noise_color: NoiseColor, profile: ProfileId) {
        if !(base_frequency.is_finite() && base_frequency > 0.0) {
            log::warn!("ignoring start with invalid base frequency {base_frequency}");
            return;
        }

        if self.context().is_none() {
            self.initialize();
        }
        self.stop_fan_sound();

        let ctx = match std::mem::replace(&mut self.lifecycle, Lifecycle::Uninitialized) {
            Lifecycle::Ready(ctx) => ctx,
            other => {
                self.lifecycle = other;
                log::warn!("no audio context; fan sound not started");
                return;
            }
        };

        let voicing = voicing(profile);
        let sample_rate = ctx.sample_rate();
        let noise = NoiseBuffer::generate(
            &mut self.rng,
            sample_rate,
            self.config.noise_seconds,
            noise_color,
            &voicing.noise,
        );
        let mut graph = FanGraph::build(voicing, base_frequency, noise, sample_rate, ctx.current_time());
        let failed = graph.start();
        if failed > 0 {
            log::warn!("{failed} generator(s) did not start");
        }
        ctx.install_graph(graph);

        log::debug!("fan sound started: {profile} @ {base_frequency} Hz, {noise_color:?} noise");
        self.lifecycle = Lifecycle::SoundActive(
            ctx,
            ActiveSound {
                profile,
                base_frequency,
                voicing,
            },
        );
    }

    /// Ramp tone, filter, and motor toward the frequencies for `speed`.
    pub fn update_speed(&mut self, speed: Speed) {
        let Some((ctx, sound)) = self.active() else {
            log::debug!("update_speed({speed:?}) ignored: no active sound");
            return;
        };

        let multiplier = speed.multiplier();
        let new_frequency = sound.base_frequency * multiplier;
        let v = sound.voicing;
        let floor = self.config.gain_floor;
        let ramp = self.config.speed_ramp_seconds;

        ctx.with_graph(|graph, now| {
            let end = now + ramp;
            ramp_param(&mut graph.tone.frequency, new_frequency * v.tone_ratio, floor, end, now);
            ramp_param(&mut graph.tone.cutoff, new_frequency * v.cutoff_ratio, floor, end, now);
            ramp_param(&mut graph.motor.frequency, new_frequency * v.motor_ratio, floor, end, now);
            ramp_param(&mut graph.motor.gain, multiplier * v.motor_speed_gain, floor, end, now);
        });
    }

    /// Ramp tone and noise gains to `volume` scaled for the active profile.
    /// Motor gain is left alone.
    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_finite() {
            log::warn!("ignoring non-finite volume {volume}");
            return;
        }
        let Some((ctx, sound)) = self.active() else {
            log::debug!("set_volume({volume}) ignored: no active sound");
            return;
        };

        let floor = self.config.gain_floor;
        let level = (volume.clamp(0.0, 1.0) * sound.voicing.volume_scale).max(floor);
        let ramp = self.config.volume_ramp_seconds;

        ctx.with_graph(|graph, now| {
            let end = now + ramp;
            ramp_param(&mut graph.tone.gain, level, floor, end, now);
            ramp_param(&mut graph.texture.gain, level * Voicing::NOISE_VOLUME_SHARE, floor, end, now);
        });
    }

    /// Drop all gains to the floor, then ramp them up to the profile's fade levels.
    pub fn fade_in(&mut self, duration: f64) {
        let Some((ctx, sound)) = self.active() else {
            log::debug!("fade_in ignored: no active sound");
            return;
        };

        let Some(length) = fade_length(duration) else {
            return;
        };
        let floor = self.config.gain_floor;
        let v = sound.voicing;
        let duration = length.as_secs_f64();

        ctx.with_graph(|graph, now| {
            let end = now + duration;
            for (param, target) in [
                (&mut graph.tone.gain, v.fade_in_level),
                (&mut graph.texture.gain, v.fade_in_level * Voicing::NOISE_FADE_SHARE),
                (&mut graph.motor.gain, v.motor_fade_level),
            ] {
                param.set_value_at_time(floor, now);
                ramp_param(param, target, floor, end, now);
            }
        });
    }

    /// Ramp all gains to the floor over `duration` seconds, wait it out, then stop.
    ///
    /// Resolves immediately when nothing is playing. Dropping the future before
    /// it resolves abandons the stop; the next command supersedes the ramps.
    pub async fn fade_out(&mut self, duration: f64) {
        let Some((ctx, _)) = self.active() else {
            log::debug!("fade_out ignored: no active sound");
            return;
        };

        let Some(wait) = fade_length(duration) else {
            return;
        };

        let floor = self.config.gain_floor;
        let duration = wait.as_secs_f64();
        ctx.with_graph(|graph, now| {
            let end = now + duration;
            ramp_param(&mut graph.tone.gain, floor, floor, end, now);
            ramp_param(&mut graph.texture.gain, floor, floor, end, now);
            ramp_param(&mut graph.motor.gain, floor, floor, end, now);
        });

        tokio::time::sleep(wait).await;
        self.stop_fan_sound();
    }

    /// Stop every generator and release the graph.
    ///
    /// SoundActive becomes Ready; every other state is left as it is.
    pub fn stop_fan_sound(&mut self) {
        self.lifecycle = match std::mem::replace(&mut self.lifecycle, Lifecycle::Uninitialized) {
            Lifecycle::SoundActive(ctx, sound) => {
                if let Some(mut graph) = ctx.take_graph() {
                    graph.stop();
                }
                log::debug!("fan sound stopped: {}", sound.profile);
                Lifecycle::Ready(ctx)
            }
            other => other,
        };
    }

    /// Stop sound and close the context. Safe from every state; ends in Closed.
    pub fn cleanup(&mut self) {
        self.stop_fan_sound();
        if let Lifecycle::Ready(mut ctx) = std::mem::replace(&mut self.lifecycle, Lifecycle::Closed) {
            ctx.close();
        }
    }

    fn active(&self) -> Option<(&AudioContext, ActiveSound)> {
        match &self.lifecycle {
            Lifecycle::SoundActive(ctx, sound) => Some((ctx, *sound)),
            _ => None,
        }
    }
}

impl Drop for SignalEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Fade length as a timer duration. Negative lengths become zero; NaN and
/// lengths too large for a timer are rejected.
fn fade_length(duration: f64) -> Option<Duration> {
    let secs = if duration < 0.0 { 0.0 } else { duration };
    match Duration::try_from_secs_f64(secs) {
        Ok(length) => Some(length),
        Err(e) => {
            log::warn!("ignoring fade of {duration}s: {e}");
            None
        }
    }
}

/// Exponential ramp with the target floored to a positive value.
fn ramp_param(param: &mut AudioParam, target: f64, floor: f64, end: f64, now: f64) {
    if let Err(e) = param.exponential_ramp_to_value_at_time(target.max(floor), end, now) {
        log::warn!("ramp skipped: {e}");
    }
}
