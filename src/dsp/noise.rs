//! Colored-noise synthesis and the looping buffer source that plays it.
//!
//! The buffer is built in three passes: uniform white samples (with optional
//! random spikes), a fixed recursive coloring filter, then per-profile texture
//! scaling. Coloring is a pure function of its white input, so a seeded RNG
//! gives reproducible buffers.

use rand::Rng;

use crate::error::NodeError;
use crate::profile::NoiseColor;

use super::Generator;

/// Hard bound applied after all scaling. The brown recursion times the rusty
/// rattle gain can occasionally peak just above it.
pub const PEAK_LIMIT: f64 = 2.0;

/// Periodic amplitude burst: samples with `index % period < length` get `gain`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RattleBurst {
    pub period: usize,
    pub length: usize,
    pub gain: f64,
}

/// Fan-specific irregularities layered on top of the colored noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseTexture {
    /// Overall post-coloring gain.
    pub scale: f64,
    /// Per-sample probability of an extra random spike in the white input.
    pub spike_chance: f64,
    /// Spikes are uniform in `[-spike_depth, spike_depth]`.
    pub spike_depth: f64,
    pub rattle: Option<RattleBurst>,
}

impl NoiseTexture {
    /// Unscaled, regular noise.
    pub const PLAIN: NoiseTexture = NoiseTexture {
        scale: 1.0,
        spike_chance: 0.0,
        spike_depth: 0.0,
        rattle: None,
    };
}

/// Paul Kellet's economy brown-ish recursion: six one-pole sections plus a
/// one-sample delayed tap.
#[derive(Debug, Clone, Default)]
pub struct BrownFilter {
    b: [f64; 7],
}

impl BrownFilter {
    pub fn process(&mut self, white: f64) -> f64 {
        let b = &mut self.b;
        b[0] = 0.99886 * b[0] + white * 0.0555179;
        b[1] = 0.99332 * b[1] + white * 0.0750759;
        b[2] = 0.96900 * b[2] + white * 0.1538520;
        b[3] = 0.86650 * b[3] + white * 0.3104856;
        b[4] = 0.55000 * b[4] + white * 0.5329522;
        b[5] = -0.7616 * b[5] - white * 0.0168980;
        let out = (b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362) * 0.15;
        b[6] = white * 0.115926;
        out
    }
}

/// Three-pole pink approximation.
#[derive(Debug, Clone, Default)]
pub struct PinkFilter {
    b: [f64; 3],
}

impl PinkFilter {
    pub fn process(&mut self, white: f64) -> f64 {
        let b = &mut self.b;
        b[0] = 0.99765 * b[0] + white * 0.0990460;
        b[1] = 0.96300 * b[1] + white * 0.2965164;
        b[2] = 0.57000 * b[2] + white * 1.0526913;
        (b[0] + b[1] + b[2] + white * 0.1848) * 0.08
    }
}

/// Uniform white samples in [-1, 1], with the texture's random spikes mixed in.
pub fn white_noise<R: Rng>(rng: &mut R, len: usize, texture: &NoiseTexture) -> Vec<f64> {
    (0..len)
        .map(|_| {
            let mut white = rng.gen_range(-1.0..=1.0);
            if texture.spike_chance > 0.0 && rng.gen_bool(texture.spike_chance) {
                white += rng.gen_range(-texture.spike_depth..=texture.spike_depth);
            }
            white
        })
        .collect()
}

/// Run white input through the coloring filter for `color`.
pub fn color_noise(white: &[f64], color: NoiseColor) -> Vec<f64> {
    match color {
        NoiseColor::Brown => {
            let mut filter = BrownFilter::default();
            white.iter().map(|&w| filter.process(w)).collect()
        }
        NoiseColor::Pink => {
            let mut filter = PinkFilter::default();
            white.iter().map(|&w| filter.process(w)).collect()
        }
        NoiseColor::White => white.iter().map(|&w| w * 0.12).collect(),
    }
}

/// Apply texture scaling and rattle bursts in place, then the peak limit.
pub fn apply_texture(samples: &mut [f64], texture: &NoiseTexture) {
    for (i, s) in samples.iter_mut().enumerate() {
        *s *= texture.scale;
        if let Some(rattle) = texture.rattle {
            if i % rattle.period < rattle.length {
                *s *= rattle.gain;
            }
        }
        *s = s.clamp(-PEAK_LIMIT, PEAK_LIMIT);
    }
}

/// A mono sample buffer.
#[derive(Debug, Clone)]
pub struct NoiseBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: f64,
}

impl NoiseBuffer {
    /// Synthesize `seconds` of textured colored noise.
    pub fn generate<R: Rng>(
        rng: &mut R,
        sample_rate: f64,
        seconds: f64,
        color: NoiseColor,
        texture: &NoiseTexture,
    ) -> Self {
        let len = (sample_rate * seconds) as usize;
        let white = white_noise(rng, len, texture);
        let mut colored = color_noise(&white, color);
        apply_texture(&mut colored, texture);

        NoiseBuffer {
            samples: colored.iter().map(|&s| s as f32).collect(),
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Plays a [`NoiseBuffer`], optionally looping.
#[derive(Debug, Clone)]
pub struct BufferSource {
    buffer: NoiseBuffer,
    pub looping: bool,
    position: usize,
    running: bool,
    started: bool,
}

impl BufferSource {
    pub fn new(buffer: NoiseBuffer) -> Self {
        BufferSource {
            buffer,
            looping: false,
            position: 0,
            running: false,
            started: false,
        }
    }

    pub fn next_sample(&mut self) -> f64 {
        if !self.running || self.buffer.is_empty() {
            return 0.0;
        }

        let sample = self.buffer.samples[self.position] as f64;
        self.position += 1;
        if self.position >= self.buffer.len() {
            if self.looping {
                self.position = 0;
            } else {
                self.running = false;
            }
        }
        sample
    }
}

impl Generator for BufferSource {
    fn start(&mut self) -> Result<(), NodeError> {
        if self.started {
            return Err(NodeError::AlreadyStarted);
        }
        self.started = true;
        self.running = true;
        self.position = 0;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), NodeError> {
        if !self.running {
            return Err(NodeError::NotRunning);
        }
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const RUSTY: NoiseTexture = NoiseTexture {
        scale: 1.3,
        spike_chance: 0.001,
        spike_depth: 0.4,
        rattle: Some(RattleBurst {
            period: 1000,
            length: 50,
            gain: 1.5,
        }),
    };

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < 1e-9, "sample {i}: {a} != {e}");
        }
    }

    #[test]
    fn brown_golden_impulse() {
        let out = color_noise(&[1.0, 0.0, 0.0, -0.5], NoiseColor::Brown);
        assert_close(
            &out,
            &[
                0.24707783999999997,
                0.14550998846729998,
                0.09876971526654343,
                -0.03848515220948477,
            ],
        );
    }

    #[test]
    fn pink_golden_impulse() {
        let out = color_noise(&[1.0, 0.0, 0.0, -0.5], NoiseColor::Pink);
        assert_close(
            &out,
            &[
                0.130644296,
                0.07875140608799999,
                0.057246444120250796,
                -0.02067364573682487,
            ],
        );
    }

    #[test]
    fn white_is_scaled_passthrough() {
        let out = color_noise(&[1.0, -0.5, 0.25], NoiseColor::White);
        assert_close(&out, &[0.12, -0.06, 0.03]);
    }

    #[test]
    fn rusty_spikes_push_white_input_past_unit_range() {
        let mut rng = Pcg32::seed_from_u64(3);
        let white = white_noise(&mut rng, 144_000, &RUSTY);
        assert!(white.iter().any(|w| w.abs() > 1.0), "no spike left [-1, 1]");
        assert!(white.iter().all(|w| w.abs() <= 1.4 + 1e-12));
    }

    #[test]
    fn coloring_is_deterministic() {
        let mut rng = Pcg32::seed_from_u64(7);
        let white = white_noise(&mut rng, 4096, &NoiseTexture::PLAIN);
        for color in [NoiseColor::Brown, NoiseColor::Pink, NoiseColor::White] {
            assert_eq!(color_noise(&white, color), color_noise(&white, color));
        }
    }

    #[test]
    fn same_seed_same_buffer() {
        let a = NoiseBuffer::generate(&mut Pcg32::seed_from_u64(42), 8000.0, 3.0, NoiseColor::Brown, &RUSTY);
        let b = NoiseBuffer::generate(&mut Pcg32::seed_from_u64(42), 8000.0, 3.0, NoiseColor::Brown, &RUSTY);
        assert_eq!(a.samples, b.samples);

        let c = NoiseBuffer::generate(&mut Pcg32::seed_from_u64(43), 8000.0, 3.0, NoiseColor::Brown, &RUSTY);
        assert_ne!(a.samples, c.samples);
    }

    #[test]
    fn buffer_length_is_three_seconds() {
        let buf = NoiseBuffer::generate(
            &mut Pcg32::seed_from_u64(1),
            8000.0,
            3.0,
            NoiseColor::Pink,
            &NoiseTexture::PLAIN,
        );
        assert_eq!(buf.len(), 24000);
    }

    #[test]
    fn buffers_bounded_for_all_colors() {
        for seed in 0..4 {
            for color in [NoiseColor::White, NoiseColor::Pink, NoiseColor::Brown] {
                for texture in [NoiseTexture::PLAIN, RUSTY] {
                    let buf = NoiseBuffer::generate(
                        &mut Pcg32::seed_from_u64(seed),
                        8000.0,
                        3.0,
                        color,
                        &texture,
                    );
                    assert!(
                        buf.samples.iter().all(|s| s.abs() <= 2.0),
                        "{color:?} noise escaped [-2, 2] (seed {seed})"
                    );
                }
            }
        }
    }

    #[test]
    fn white_input_within_unit_range_without_spikes() {
        let mut rng = Pcg32::seed_from_u64(3);
        let white = white_noise(&mut rng, 10000, &NoiseTexture::PLAIN);
        assert!(white.iter().all(|w| (-1.0..=1.0).contains(w)));
    }

    #[test]
    fn rattle_boosts_burst_window() {
        let texture = NoiseTexture {
            scale: 1.0,
            spike_chance: 0.0,
            spike_depth: 0.0,
            rattle: Some(RattleBurst {
                period: 10,
                length: 2,
                gain: 1.5,
            }),
        };
        let mut samples = vec![0.1; 12];
        apply_texture(&mut samples, &texture);
        assert!((samples[0] - 0.15).abs() < 1e-12);
        assert!((samples[1] - 0.15).abs() < 1e-12);
        assert!((samples[2] - 0.1).abs() < 1e-12);
        assert!((samples[10] - 0.15).abs() < 1e-12);
    }

    #[test]
    fn source_loops_until_stopped() {
        let buffer = NoiseBuffer {
            samples: vec![0.1, 0.2, 0.3],
            sample_rate: 3.0,
        };
        let mut src = BufferSource::new(buffer);
        src.looping = true;
        assert_eq!(src.next_sample(), 0.0, "silent before start");

        src.start().unwrap();
        let played: Vec<f64> = (0..7).map(|_| src.next_sample()).collect();
        let expected = [0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1];
        for (p, e) in played.iter().zip(expected) {
            assert!((p - e).abs() < 1e-6);
        }

        src.stop().unwrap();
        assert_eq!(src.next_sample(), 0.0);
        assert_eq!(src.stop(), Err(NodeError::NotRunning));
    }

    #[test]
    fn one_shot_source_ends() {
        let buffer = NoiseBuffer {
            samples: vec![0.5, 0.5],
            sample_rate: 2.0,
        };
        let mut src = BufferSource::new(buffer);
        src.start().unwrap();
        src.next_sample();
        src.next_sample();
        assert!(!src.is_running());
        assert_eq!(src.next_sample(), 0.0);
    }
}
