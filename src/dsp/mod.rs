//! DSP: pure Rust signal generation for the fan sound.
//!
//! Everything here is deterministic given its inputs: the same graph and the
//! same automation produce the same samples, whether pulled by the offline
//! renderer or by a live output stream.

pub mod filter;
pub mod graph;
pub mod noise;
pub mod oscillator;
pub mod param;
pub mod renderer;

use crate::error::NodeError;

/// A source node with a one-shot start/stop lifecycle.
///
/// A generator can be started once. Stopping one that is not running returns
/// [`NodeError::NotRunning`]; callers tearing a graph down treat that as a no-op.
pub trait Generator {
    fn start(&mut self) -> Result<(), NodeError>;
    fn stop(&mut self) -> Result<(), NodeError>;
    fn is_running(&self) -> bool;
}
