//! Automatable parameter with an event timeline.
//!
//! Mirrors the subset of WebAudio `AudioParam` the engine needs: immediate
//! value changes and exponential ramps. A new automation issued at time `t`
//! supersedes everything scheduled at or after `t`, and ramps start from the
//! value the parameter has at `t`, so back-to-back commands never jump.

use crate::error::NodeError;

/// Smallest start value an exponential ramp may begin from.
pub const MIN_RAMP_VALUE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamEvent {
    Set {
        time: f64,
        value: f64,
    },
    ExponentialRamp {
        start_time: f64,
        start_value: f64,
        end_time: f64,
        end_value: f64,
    },
}

impl ParamEvent {
    fn start_time(&self) -> f64 {
        match *self {
            ParamEvent::Set { time, .. } => time,
            ParamEvent::ExponentialRamp { start_time, .. } => start_time,
        }
    }

    fn final_value(&self) -> f64 {
        match *self {
            ParamEvent::Set { value, .. } => value,
            ParamEvent::ExponentialRamp { end_value, .. } => end_value,
        }
    }

    fn value_at(&self, t: f64) -> f64 {
        match *self {
            ParamEvent::Set { value, .. } => value,
            ParamEvent::ExponentialRamp {
                start_time,
                start_value,
                end_time,
                end_value,
            } => {
                if t >= end_time {
                    end_value
                } else {
                    let progress = (t - start_time) / (end_time - start_time);
                    start_value * (end_value / start_value).powf(progress)
                }
            }
        }
    }
}

/// A single automatable value (gain, frequency, ...).
#[derive(Debug, Clone)]
pub struct AudioParam {
    default_value: f64,
    events: Vec<ParamEvent>,
}

impl AudioParam {
    pub fn new(default_value: f64) -> Self {
        AudioParam {
            default_value,
            events: Vec::new(),
        }
    }

    /// Value of the parameter at `t` seconds on the context clock.
    pub fn value_at(&self, t: f64) -> f64 {
        self.events
            .iter()
            .rev()
            .find(|e| e.start_time() <= t)
            .map_or(self.default_value, |e| e.value_at(t))
    }

    /// The value the timeline settles on once every scheduled event has run.
    pub fn target(&self) -> f64 {
        self.events
            .last()
            .map_or(self.default_value, ParamEvent::final_value)
    }

    /// Jump to `value` at `time`.
    pub fn set_value_at_time(&mut self, value: f64, time: f64) {
        self.cancel_from(time);
        self.events.push(ParamEvent::Set { time, value });
    }

    /// Ramp exponentially from the current value at `now` to `target` at `end_time`.
    ///
    /// Exponential curves are undefined through zero, so `target` must be
    /// strictly positive and finite.
    pub fn exponential_ramp_to_value_at_time(
        &mut self,
        target: f64,
        end_time: f64,
        now: f64,
    ) -> Result<(), NodeError> {
        if !(target.is_finite() && target > 0.0) {
            return Err(NodeError::NonPositiveRampTarget(target));
        }

        let start_value = self.value_at(now).max(MIN_RAMP_VALUE);
        self.cancel_from(now);
        if end_time <= now {
            self.events.push(ParamEvent::Set {
                time: now,
                value: target,
            });
        } else {
            self.events.push(ParamEvent::ExponentialRamp {
                start_time: now,
                start_value,
                end_time,
                end_value: target,
            });
        }
        Ok(())
    }

    /// Drop events that can no longer affect values at or after `t`.
    pub fn prune(&mut self, t: f64) {
        let active = self.events.iter().rposition(|e| e.start_time() <= t);
        if let Some(idx) = active {
            if idx > 0 {
                self.events.drain(..idx);
            }
        }
    }

    fn cancel_from(&mut self, time: f64) {
        self.events.retain(|e| e.start_time() < time);
    }
}
