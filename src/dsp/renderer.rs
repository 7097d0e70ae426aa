//! Offline renderer: renders a fan profile to samples or WAV bytes.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::engine::SignalEngine;
use crate::error::EngineError;
use crate::profile::{ProfileId, Speed};

/// Fade-in applied at the head of every offline render.
const RENDER_FADE_IN_SECONDS: f64 = 0.5;

/// What to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub profile: ProfileId,
    pub speed: Speed,
    /// Volume in [0, 1].
    pub volume: f64,
    pub seconds: f64,
    pub sample_rate: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl RenderRequest {
    pub fn new(profile: ProfileId, seconds: f64, sample_rate: u32) -> Self {
        RenderRequest {
            profile,
            speed: Speed::Medium,
            volume: 0.7,
            seconds,
            sample_rate,
            seed: None,
        }
    }
}

/// Render the request to mono f32 samples.
pub fn render_samples(request: &RenderRequest) -> Result<Vec<f32>, EngineError> {
    if !(request.seconds.is_finite() && request.seconds >= 0.0) {
        return Err(EngineError::InvalidConfig(format!(
            "render length must be non-negative, got {}",
            request.seconds
        )));
    }

    let config = EngineConfig {
        sample_rate: request.sample_rate as f64,
        seed: request.seed,
        ..EngineConfig::default()
    };
    config.validate()?;

    let mut engine = SignalEngine::offline(config);
    engine.initialize();

    let profile = request.profile.profile();
    engine.start_fan_sound(profile.base_frequency, profile.noise_color, profile.id);
    engine.fade_in(RENDER_FADE_IN_SECONDS);
    engine.update_speed(request.speed);
    engine.set_volume(request.volume);

    let frames = (request.seconds * request.sample_rate as f64) as usize;
    let samples = engine.render(frames);
    engine.cleanup();
    Ok(samples)
}

/// Render the request to a WAV file as bytes (16-bit stereo PCM).
pub fn render_wav(request: &RenderRequest) -> Result<Vec<u8>, EngineError> {
    let mono = render_samples(request)?;
    let mut pcm = Vec::with_capacity(mono.len() * 2);
    for &s in &mono {
        let sample = (s as f64 * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
        pcm.push(sample); // L
        pcm.push(sample); // R
    }
    Ok(encode_wav(&pcm, request.sample_rate, 2))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(profile: ProfileId) -> RenderRequest {
        RenderRequest {
            seed: Some(9),
            ..RenderRequest::new(profile, 1.0, 8000)
        }
    }

    #[test]
    fn wav_header_valid() {
        let wav = render_wav(&request(ProfileId::Table)).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");

        let sr = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(sr, 8000);
        let ch = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(ch, 2);
    }

    #[test]
    fn wav_size_correct() {
        let wav = render_wav(&request(ProfileId::Ceiling)).unwrap();
        // 1s at 8kHz = 8000 frames * 2 channels * 2 bytes
        let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_size, 32000);
        assert_eq!(wav.len(), 44 + 32000);
    }

    #[test]
    fn every_profile_renders_audible_bounded_audio() {
        for id in ProfileId::ALL {
            let samples = render_samples(&request(id)).unwrap();
            assert_eq!(samples.len(), 8000);
            assert!(samples.iter().all(|s| s.is_finite() && s.abs() <= 1.0), "{id}");
            assert!(samples.iter().any(|s| s.abs() > 0.001), "{id} rendered silence");
        }
    }

    #[test]
    fn seeded_renders_repeat() {
        let a = render_samples(&request(ProfileId::Rusty)).unwrap();
        let b = render_samples(&request(ProfileId::Rusty)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_requests() {
        let mut bad = request(ProfileId::Table);
        bad.seconds = -1.0;
        assert!(render_samples(&bad).is_err());

        let mut bad = request(ProfileId::Table);
        bad.sample_rate = 0;
        assert!(render_samples(&bad).is_err());
    }
}
