//! Audio context: the render clock and the state shared with the render side.
//!
//! The control thread schedules automation into the [`FanGraph`] held by the
//! context; whoever pulls samples (the offline renderer, or the output
//! callback of a live device) advances the clock. Both sides meet at one
//! mutex-guarded [`RenderState`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::EngineConfig;
use crate::dsp::graph::FanGraph;
use crate::error::EngineError;

/// Everything the render side touches.
#[derive(Debug)]
pub struct RenderState {
    sample_rate: f64,
    frames: u64,
    graph: Option<FanGraph>,
    master_gain: f64,
}

impl RenderState {
    pub fn new(sample_rate: f64, master_gain: f64) -> Self {
        RenderState {
            sample_rate,
            frames: 0,
            graph: None,
            master_gain,
        }
    }

    /// Seconds of audio rendered so far.
    pub fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate
    }

    /// Fill `out` with mono samples and advance the clock by its length.
    ///
    /// Writes in place so the output callback never allocates.
    pub fn render_into(&mut self, out: &mut [f32]) {
        match self.graph.as_mut() {
            Some(graph) => {
                for (i, slot) in out.iter_mut().enumerate() {
                    let t = (self.frames + i as u64) as f64 / self.sample_rate;
                    *slot = soft_clip(graph.next_sample(t) * self.master_gain) as f32;
                }
            }
            None => out.fill(0.0),
        }
        self.frames += out.len() as u64;

        let now = self.current_time();
        if let Some(graph) = self.graph.as_mut() {
            graph.prune(now);
        }
    }
}

/// tanh soft clip, keeps the summed chains inside [-1, 1].
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

pub(crate) fn lock(shared: &Mutex<RenderState>) -> MutexGuard<'_, RenderState> {
    // The render state holds plain numbers; a panic mid-block leaves nothing to repair.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An open audio processing context.
pub struct AudioContext {
    sample_rate: f64,
    block_size: usize,
    shared: Arc<Mutex<RenderState>>,
    closed: bool,
    #[cfg(feature = "playback")]
    stream: Option<cpal::Stream>,
}

impl AudioContext {
    /// A context that only advances when [`AudioContext::render`] is called.
    pub fn offline(config: &EngineConfig) -> Self {
        let shared = Arc::new(Mutex::new(RenderState::new(
            config.sample_rate,
            config.master_gain,
        )));
        AudioContext::from_shared(config.sample_rate, config.block_size, shared)
    }

    pub(crate) fn from_shared(
        sample_rate: f64,
        block_size: usize,
        shared: Arc<Mutex<RenderState>>,
    ) -> Self {
        AudioContext {
            sample_rate,
            block_size: block_size.max(1),
            shared,
            closed: false,
            #[cfg(feature = "playback")]
            stream: None,
        }
    }

    #[cfg(feature = "playback")]
    pub(crate) fn with_stream(mut self, stream: cpal::Stream) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Monotonic context clock in seconds.
    pub fn current_time(&self) -> f64 {
        lock(&self.shared).current_time()
    }

    /// Pull `frames` mono samples, rendering in blocks. Silent once closed.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        if self.closed {
            return out;
        }

        let mut state = lock(&self.shared);
        for block in out.chunks_mut(self.block_size) {
            state.render_into(block);
        }
        out
    }

    /// Run `f` against the installed graph with the current time.
    pub(crate) fn with_graph<R>(&self, f: impl FnOnce(&mut FanGraph, f64) -> R) -> Option<R> {
        let mut state = lock(&self.shared);
        let now = state.current_time();
        state.graph.as_mut().map(|graph| f(graph, now))
    }

    pub(crate) fn install_graph(&self, graph: FanGraph) {
        lock(&self.shared).graph = Some(graph);
    }

    pub(crate) fn take_graph(&self) -> Option<FanGraph> {
        lock(&self.shared).graph.take()
    }

    /// Generators currently running in this context.
    pub fn live_generators(&self) -> usize {
        lock(&self.shared)
            .graph
            .as_ref()
            .map_or(0, FanGraph::live_generators)
    }

    /// Release the output and drop any graph. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        #[cfg(feature = "playback")]
        {
            self.stream = None;
        }
        lock(&self.shared).graph = None;
        self.closed = true;
        log::debug!("audio context closed");
    }
}

/// Source of audio contexts: the host's audio capability.
pub trait ContextProvider {
    fn create_context(&self, config: &EngineConfig) -> Result<AudioContext, EngineError>;
}

/// Always-available provider of offline contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

impl ContextProvider for OfflineProvider {
    fn create_context(&self, config: &EngineConfig) -> Result<AudioContext, EngineError> {
        Ok(AudioContext::offline(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::noise::NoiseBuffer;
    use crate::profile::ProfileId;
    use crate::voicing::voicing;

    fn config() -> EngineConfig {
        EngineConfig {
            sample_rate: 8000.0,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn clock_advances_with_rendering() {
        let ctx = AudioContext::offline(&config());
        assert_eq!(ctx.current_time(), 0.0);
        let out = ctx.render(4000);
        assert_eq!(out.len(), 4000);
        assert!((ctx.current_time() - 0.5).abs() < 1e-12);
        assert!(out.iter().all(|&s| s == 0.0), "no graph, no sound");
    }

    #[test]
    fn graph_install_and_take() {
        let ctx = AudioContext::offline(&config());
        let noise = NoiseBuffer {
            samples: vec![0.1; 10],
            sample_rate: 8000.0,
        };
        let mut graph = FanGraph::build(voicing(ProfileId::Table), 280.0, noise, 8000.0, 0.0);
        graph.start();
        ctx.install_graph(graph);
        assert_eq!(ctx.live_generators(), 3);
        assert_eq!(ctx.with_graph(|_, now| now), Some(0.0));

        let taken = ctx.take_graph();
        assert!(taken.is_some());
        assert_eq!(ctx.live_generators(), 0);
        assert_eq!(ctx.with_graph(|_, now| now), None);
    }

    #[test]
    fn master_gain_and_soft_clip_applied() {
        let ctx = AudioContext::offline(&config());
        for level in [0.25_f32, 10.0] {
            let noise = NoiseBuffer {
                samples: vec![level; 10],
                sample_rate: 8000.0,
            };
            let mut graph = FanGraph::build(voicing(ProfileId::Table), 280.0, noise, 8000.0, 0.0);
            graph.start();
            graph.texture.gain.set_value_at_time(1.0, 0.0);
            ctx.install_graph(graph);

            let out = ctx.render(4);
            let expected = (level as f64 * 0.8).tanh() as f32;
            assert!(out.iter().all(|&s| (s - expected).abs() < 1e-6), "{out:?}");
            assert!(out.iter().all(|s| s.abs() < 1.0));
        }
    }

    #[test]
    fn closed_context_is_silent_and_close_is_idempotent() {
        let mut ctx = AudioContext::offline(&config());
        ctx.close();
        ctx.close();
        assert_eq!(ctx.render(16), vec![0.0; 16]);
        assert_eq!(ctx.current_time(), 0.0);
    }
}
