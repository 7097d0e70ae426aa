//! Narration sink: fire-and-forget spoken status messages.
//!
//! Speech is a side channel next to the audio graph. Nothing here can fail
//! the caller: a missing backend or a rejected utterance is logged and dropped.

use crate::error::NarrationError;

/// Name fragments of voices the narrator prefers, matched case-insensitively.
pub const PREFERRED_VOICE_NAMES: [&str; 3] = ["samantha", "karen", "female"];
/// Fallback locale when no preferred name is installed.
pub const PREFERRED_LOCALE: &str = "en-US";

/// A voice offered by the speech backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    /// BCP 47 tag, e.g. "en-US".
    pub lang: String,
}

/// One speech request.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// `None` leaves the choice to the platform.
    pub voice: Option<VoiceInfo>,
}

/// The host's speech capability.
pub trait SpeechSynthesizer {
    fn voices(&self) -> Vec<VoiceInfo>;
    /// Abort whatever is being spoken.
    fn cancel(&mut self);
    fn speak(&mut self, utterance: Utterance) -> Result<(), NarrationError>;
}

/// Pick a voice: a preferred name first, then the preferred locale.
pub fn select_voice(voices: &[VoiceInfo]) -> Option<&VoiceInfo> {
    voices
        .iter()
        .find(|v| {
            let name = v.name.to_lowercase();
            PREFERRED_VOICE_NAMES.iter().any(|p| name.contains(p))
        })
        .or_else(|| voices.iter().find(|v| v.lang.contains(PREFERRED_LOCALE)))
}

/// Speaks short status lines through an optional backend.
pub struct Narrator {
    synth: Option<Box<dyn SpeechSynthesizer>>,
}

impl Narrator {
    pub const RATE: f32 = 0.85;
    pub const PITCH: f32 = 0.9;
    pub const VOLUME: f32 = 0.9;

    pub fn new(synth: Box<dyn SpeechSynthesizer>) -> Self {
        Narrator { synth: Some(synth) }
    }

    /// A narrator for hosts without speech output.
    pub fn unavailable() -> Self {
        Narrator { synth: None }
    }

    /// Interrupt any current utterance and speak `text`.
    pub fn speak(&mut self, text: &str) {
        let Some(synth) = self.synth.as_mut() else {
            log::debug!("{}; dropped {text:?}", NarrationError::Unavailable);
            return;
        };

        synth.cancel();
        let voices = synth.voices();
        let utterance = Utterance {
            text: text.to_string(),
            rate: Self::RATE,
            pitch: Self::PITCH,
            volume: Self::VOLUME,
            voice: select_voice(&voices).cloned(),
        };
        if let Err(e) = synth.speak(utterance) {
            log::warn!("narration failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn voice(name: &str, lang: &str) -> VoiceInfo {
        VoiceInfo {
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }

    #[derive(Default)]
    struct Log {
        cancels: usize,
        spoken: Vec<Utterance>,
    }

    struct Recorder {
        voices: Vec<VoiceInfo>,
        log: Arc<Mutex<Log>>,
        reject: bool,
    }

    impl SpeechSynthesizer for Recorder {
        fn voices(&self) -> Vec<VoiceInfo> {
            self.voices.clone()
        }

        fn cancel(&mut self) {
            self.log.lock().unwrap().cancels += 1;
        }

        fn speak(&mut self, utterance: Utterance) -> Result<(), NarrationError> {
            if self.reject {
                return Err(NarrationError::Rejected("busy".into()));
            }
            self.log.lock().unwrap().spoken.push(utterance);
            Ok(())
        }
    }

    #[test]
    fn prefers_named_voice_over_locale() {
        let voices = vec![
            voice("Alex", "en-US"),
            voice("Daniel", "en-GB"),
            voice("Karen", "en-AU"),
        ];
        assert_eq!(select_voice(&voices).unwrap().name, "Karen");
    }

    #[test]
    fn name_match_is_case_insensitive() {
        let voices = vec![voice("Google UK English Female", "en-GB")];
        assert!(select_voice(&voices).is_some());
    }

    #[test]
    fn falls_back_to_locale_then_default() {
        let voices = vec![voice("Thomas", "fr-FR"), voice("Alex", "en-US")];
        assert_eq!(select_voice(&voices).unwrap().name, "Alex");

        let voices = vec![voice("Thomas", "fr-FR")];
        assert!(select_voice(&voices).is_none());
    }

    #[test]
    fn speak_cancels_then_speaks_with_fixed_prosody() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut narrator = Narrator::new(Box::new(Recorder {
            voices: vec![voice("Samantha", "en-US")],
            log: Arc::clone(&log),
            reject: false,
        }));

        narrator.speak("Turning fan on");
        narrator.speak("Turning fan off");

        let log = log.lock().unwrap();
        assert_eq!(log.cancels, 2);
        assert_eq!(log.spoken.len(), 2);
        let first = &log.spoken[0];
        assert_eq!(first.text, "Turning fan on");
        assert_eq!((first.rate, first.pitch, first.volume), (0.85, 0.9, 0.9));
        assert_eq!(first.voice.as_ref().unwrap().name, "Samantha");
    }

    #[test]
    fn failures_are_swallowed() {
        let log = Arc::new(Mutex::new(Log::default()));
        let mut narrator = Narrator::new(Box::new(Recorder {
            voices: Vec::new(),
            log: Arc::clone(&log),
            reject: true,
        }));
        narrator.speak("hello");
        assert!(log.lock().unwrap().spoken.is_empty());

        let mut silent = Narrator::unavailable();
        silent.speak("hello");
    }
}
