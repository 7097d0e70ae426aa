//! Live output through the default cpal device.
//!
//! The output callback locks the shared [`RenderState`] and renders exactly
//! as many frames as the device asks for, writing the mono signal to every
//! channel. The device's own sample rate overrides `EngineConfig::sample_rate`.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::config::EngineConfig;
use crate::context::{AudioContext, ContextProvider, RenderState, lock};
use crate::error::EngineError;

/// Initial scratch size; covers the buffer sizes common devices request.
const SCRATCH_FRAMES: usize = 4096;

/// Opens contexts on the host's default output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceProvider;

impl ContextProvider for DeviceProvider {
    fn create_context(&self, config: &EngineConfig) -> Result<AudioContext, EngineError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| unavailable("no audio output device available"))?;
        let supported = device
            .default_output_config()
            .map_err(|e| unavailable(format!("failed to get default output config: {e}")))?;

        let sample_rate = supported.sample_rate().0 as f64;
        let channels = supported.channels().max(1) as usize;
        let shared = Arc::new(Mutex::new(RenderState::new(sample_rate, config.master_gain)));

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                let render = Arc::clone(&shared);
                let mut mono = vec![0.0_f32; SCRATCH_FRAMES];
                device.build_output_stream(
                    &supported.into(),
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        fill(&render, &mut mono, data, channels, |s| s);
                    },
                    |err| log::error!("audio stream error: {err}"),
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let render = Arc::clone(&shared);
                let mut mono = vec![0.0_f32; SCRATCH_FRAMES];
                device.build_output_stream(
                    &supported.into(),
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        fill(&render, &mut mono, data, channels, |s| {
                            (s * 32767.0).clamp(-32768.0, 32767.0) as i16
                        });
                    },
                    |err| log::error!("audio stream error: {err}"),
                    None,
                )
            }
            other => {
                return Err(unavailable(format!("unsupported sample format: {other:?}")));
            }
        }
        .map_err(|e| unavailable(format!("failed to build audio stream: {e}")))?;

        stream
            .play()
            .map_err(|e| unavailable(format!("failed to play audio stream: {e}")))?;
        log::debug!("audio stream started: {sample_rate} Hz, {channels} channel(s)");

        Ok(AudioContext::from_shared(sample_rate, config.block_size, shared).with_stream(stream))
    }
}

/// Render one device buffer of interleaved frames through the `mono` scratch
/// buffer. The scratch only grows when the device asks for a larger buffer.
fn fill<T: Copy>(
    shared: &Mutex<RenderState>,
    mono: &mut Vec<f32>,
    data: &mut [T],
    channels: usize,
    convert: impl Fn(f32) -> T,
) {
    let frames = data.len() / channels;
    if mono.len() < frames {
        mono.resize(frames, 0.0);
    }
    let block = &mut mono[..frames];
    lock(shared).render_into(block);
    for (frame, &sample) in data.chunks_mut(channels).zip(block.iter()) {
        frame.fill(convert(sample));
    }
}

fn unavailable(message: impl Into<String>) -> EngineError {
    EngineError::CapabilityUnavailable(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_duplicates_mono_to_every_channel() {
        let shared = Mutex::new(RenderState::new(8000.0, 0.8));
        let mut mono = Vec::new();
        let mut data = [1.0_f32; 8];
        fill(&shared, &mut mono, &mut data, 2, |s| s);
        assert!(data.iter().all(|&s| s == 0.0), "no graph renders silence");
        assert!((lock(&shared).current_time() - 4.0 / 8000.0).abs() < 1e-12);
        assert_eq!(mono.len(), 4);
    }

    #[test]
    fn scratch_is_reused_across_callbacks() {
        let shared = Mutex::new(RenderState::new(8000.0, 0.8));
        let mut mono = vec![0.0_f32; SCRATCH_FRAMES];
        let mut data = [0_i16; 256];
        for _ in 0..3 {
            fill(&shared, &mut mono, &mut data, 2, |s| (s * 32767.0) as i16);
        }
        assert_eq!(mono.len(), SCRATCH_FRAMES);
        assert!((lock(&shared).current_time() - 384.0 / 8000.0).abs() < 1e-12);
    }
}
