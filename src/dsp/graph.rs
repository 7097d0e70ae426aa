//! Fan signal graph: tone, motor-hum, and texture chains.
//!
//! All three chains are built and torn down together. Each chain owns its
//! generator and the automatable parameters that shape it; the graph is
//! rendered sample by sample against the context clock.

use super::Generator;
use super::filter::{BiquadFilter, FilterType};
use super::noise::{BufferSource, NoiseBuffer};
use super::oscillator::{Oscillator, Waveform};
use super::param::AudioParam;
use crate::voicing::Voicing;

/// Primary oscillator → band-shaping filter → tone gain.
#[derive(Debug, Clone)]
pub struct ToneChain {
    pub oscillator: Oscillator,
    pub frequency: AudioParam,
    pub filter: BiquadFilter,
    pub cutoff: AudioParam,
    pub gain: AudioParam,
}

/// Low-frequency oscillator → motor gain.
#[derive(Debug, Clone)]
pub struct MotorChain {
    pub oscillator: Oscillator,
    pub frequency: AudioParam,
    pub gain: AudioParam,
}

/// Looping colored noise → noise gain.
#[derive(Debug, Clone)]
pub struct TextureChain {
    pub source: BufferSource,
    pub gain: AudioParam,
}

/// Scheduled targets of every graph parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSnapshot {
    pub tone_waveform: Waveform,
    pub tone_frequency: f64,
    pub filter_type: FilterType,
    pub filter_cutoff: f64,
    pub filter_q: f64,
    pub motor_waveform: Waveform,
    pub motor_frequency: f64,
    pub tone_gain: f64,
    pub noise_gain: f64,
    pub motor_gain: f64,
}

#[derive(Debug, Clone)]
pub struct FanGraph {
    pub tone: ToneChain,
    pub motor: MotorChain,
    pub texture: TextureChain,
}

impl FanGraph {
    /// Build a silent graph voiced for `base_frequency`. Nothing runs until [`FanGraph::start`].
    pub fn build(
        voicing: &Voicing,
        base_frequency: f64,
        noise: NoiseBuffer,
        sample_rate: f64,
        now: f64,
    ) -> Self {
        let mut tone_osc = Oscillator::new(voicing.tone_waveform, sample_rate);
        let mut tone_frequency = AudioParam::new(440.0);
        tone_frequency.set_value_at_time(base_frequency * voicing.tone_ratio, now);
        tone_osc.frequency = tone_frequency.value_at(now);

        let mut filter = BiquadFilter::new(voicing.filter_type, sample_rate);
        let mut cutoff = AudioParam::new(350.0);
        cutoff.set_value_at_time(base_frequency * voicing.cutoff_ratio, now);
        filter.set_frequency(cutoff.value_at(now));
        filter.set_q(voicing.filter_q);

        let mut motor_osc = Oscillator::new(voicing.motor_waveform, sample_rate);
        let mut motor_frequency = AudioParam::new(440.0);
        motor_frequency.set_value_at_time(base_frequency * voicing.motor_ratio, now);
        motor_osc.frequency = motor_frequency.value_at(now);

        let mut source = BufferSource::new(noise);
        source.looping = true;

        FanGraph {
            tone: ToneChain {
                oscillator: tone_osc,
                frequency: tone_frequency,
                filter,
                cutoff,
                gain: silent_gain(now),
            },
            motor: MotorChain {
                oscillator: motor_osc,
                frequency: motor_frequency,
                gain: silent_gain(now),
            },
            texture: TextureChain {
                source,
                gain: silent_gain(now),
            },
        }
    }

    /// Start every generator. Returns how many failed to start.
    pub fn start(&mut self) -> usize {
        self.generators_mut()
            .into_iter()
            .filter_map(|g| g.start().err())
            .inspect(|e| log::warn!("generator failed to start: {e}"))
            .count()
    }

    /// Stop every generator. Already-stopped generators are skipped silently.
    pub fn stop(&mut self) {
        for generator in self.generators_mut() {
            if let Err(e) = generator.stop() {
                log::trace!("ignoring redundant stop: {e}");
            }
        }
    }

    /// Number of generators currently producing sound.
    pub fn live_generators(&self) -> usize {
        [
            self.tone.oscillator.is_running(),
            self.motor.oscillator.is_running(),
            self.texture.source.is_running(),
        ]
        .into_iter()
        .filter(|&running| running)
        .count()
    }

    /// Render one mono sample at context time `t`.
    pub fn next_sample(&mut self, t: f64) -> f64 {
        let tone = &mut self.tone;
        tone.oscillator.frequency = tone.frequency.value_at(t);
        tone.filter.set_frequency(tone.cutoff.value_at(t));
        let tone_out = tone.filter.process(tone.oscillator.next_sample()) * tone.gain.value_at(t);

        let motor = &mut self.motor;
        motor.oscillator.frequency = motor.frequency.value_at(t);
        let motor_out = motor.oscillator.next_sample() * motor.gain.value_at(t);

        let texture = &mut self.texture;
        let noise_out = texture.source.next_sample() * texture.gain.value_at(t);

        tone_out + motor_out + noise_out
    }

    /// Forget automation that finished before `t`.
    pub fn prune(&mut self, t: f64) {
        for param in [
            &mut self.tone.frequency,
            &mut self.tone.cutoff,
            &mut self.tone.gain,
            &mut self.motor.frequency,
            &mut self.motor.gain,
            &mut self.texture.gain,
        ] {
            param.prune(t);
        }
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            tone_waveform: self.tone.oscillator.waveform,
            tone_frequency: self.tone.frequency.target(),
            filter_type: self.tone.filter.filter_type,
            filter_cutoff: self.tone.cutoff.target(),
            filter_q: self.tone.filter.q,
            motor_waveform: self.motor.oscillator.waveform,
            motor_frequency: self.motor.frequency.target(),
            tone_gain: self.tone.gain.target(),
            noise_gain: self.texture.gain.target(),
            motor_gain: self.motor.gain.target(),
        }
    }

    fn generators_mut(&mut self) -> [&mut dyn Generator; 3] {
        [
            &mut self.tone.oscillator,
            &mut self.motor.oscillator,
            &mut self.texture.source,
        ]
    }
}

fn silent_gain(now: f64) -> AudioParam {
    let mut gain = AudioParam::new(1.0);
    gain.set_value_at_time(0.0, now);
    gain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileId;
    use crate::voicing::voicing;

    fn flat_noise() -> NoiseBuffer {
        NoiseBuffer {
            samples: vec![0.25; 300],
            sample_rate: 100.0,
        }
    }

    #[test]
    fn build_applies_voicing() {
        let graph = FanGraph::build(voicing(ProfileId::Rusty), 140.0, flat_noise(), 48000.0, 0.0);
        let snap = graph.snapshot();
        assert_eq!(snap.tone_waveform, Waveform::Square);
        assert!((snap.tone_frequency - 42.0).abs() < 1e-9);
        assert_eq!(snap.filter_type, FilterType::Bandpass);
        assert!((snap.filter_cutoff - 210.0).abs() < 1e-9);
        assert_eq!(snap.filter_q, 2.5);
        assert_eq!(snap.motor_waveform, Waveform::Sawtooth);
        assert!((snap.motor_frequency - 16.8).abs() < 1e-9);
        assert_eq!(snap.tone_gain, 0.0);
        assert_eq!(snap.noise_gain, 0.0);
        assert_eq!(snap.motor_gain, 0.0);
    }

    #[test]
    fn silent_until_gain_raised() {
        let mut graph = FanGraph::build(voicing(ProfileId::Table), 280.0, flat_noise(), 48000.0, 0.0);
        assert_eq!(graph.start(), 0);
        assert_eq!(graph.live_generators(), 3);
        for i in 0..480 {
            assert_eq!(graph.next_sample(i as f64 / 48000.0), 0.0);
        }

        graph.texture.gain.set_value_at_time(1.0, 0.01);
        let s = graph.next_sample(0.01);
        assert!((s - 0.25).abs() < 1e-6, "noise should pass at unity gain, got {s}");
    }

    #[test]
    fn stop_is_idempotent() {
        let mut graph = FanGraph::build(voicing(ProfileId::Modern), 320.0, flat_noise(), 48000.0, 0.0);
        graph.start();
        graph.stop();
        assert_eq!(graph.live_generators(), 0);
        graph.stop();
        assert_eq!(graph.live_generators(), 0);
    }

    #[test]
    fn second_start_reports_failures() {
        let mut graph = FanGraph::build(voicing(ProfileId::Ceiling), 160.0, flat_noise(), 48000.0, 0.0);
        assert_eq!(graph.start(), 0);
        assert_eq!(graph.start(), 3);
    }
}
