pub mod config;
pub mod context;
pub mod controller;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod narration;
#[cfg(feature = "playback")]
pub mod playback;
pub mod profile;
pub mod voicing;

pub use config::EngineConfig;
pub use controller::{FanController, FanState};
pub use engine::{LifecycleState, SignalEngine};
pub use error::EngineError;
pub use profile::{FanProfile, NoiseColor, ProfileId, Speed};

use crate::dsp::renderer::{self, RenderRequest};
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the aerovoid-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: the fan catalog as an array of profile objects.
#[wasm_bindgen]
pub fn list_fan_profiles() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(profile::list_profiles())
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

fn request(
    profile: &str,
    speed: &str,
    volume: f64,
    seconds: f64,
    sample_rate: u32,
) -> Result<RenderRequest, EngineError> {
    Ok(RenderRequest {
        speed: speed.parse()?,
        volume,
        ..RenderRequest::new(profile.parse()?, seconds, sample_rate)
    })
}

/// WASM-exposed: render a fan to mono f32 samples for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_fan_samples(
    profile: &str,
    speed: &str,
    volume: f64,
    seconds: f64,
    sample_rate: u32,
) -> Result<Vec<f32>, JsValue> {
    request(profile, speed, volume, seconds, sample_rate)
        .and_then(|req| renderer::render_samples(&req))
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render a fan to a 16-bit stereo WAV byte array.
#[wasm_bindgen]
pub fn render_fan_wav(
    profile: &str,
    speed: &str,
    volume: f64,
    seconds: f64,
    sample_rate: u32,
) -> Result<Vec<u8>, JsValue> {
    request(profile, speed, volume, seconds, sample_rate)
        .and_then(|req| renderer::render_wav(&req))
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}
