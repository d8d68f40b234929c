//! Haptic intents. The vibration API itself belongs to the host.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticIntensity {
    Light,
    Medium,
    Success,
}

/// Points in a session where the classifier asks for a pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    SessionStart,
    DragCommit,
    TapCommit,
    FlickCommit,
}

impl Milestone {
    pub fn intensity(self) -> HapticIntensity {
        match self {
            Milestone::SessionStart => HapticIntensity::Light,
            Milestone::DragCommit | Milestone::TapCommit => HapticIntensity::Medium,
            // distinct from a tap so a stack jump feels different from open/close
            Milestone::FlickCommit => HapticIntensity::Success,
        }
    }
}

pub trait HapticSink {
    fn on_haptic(&mut self, intensity: HapticIntensity);
}

impl HapticSink for () {
    fn on_haptic(&mut self, _intensity: HapticIntensity) {}
}

impl HapticSink for Vec<HapticIntensity> {
    fn on_haptic(&mut self, intensity: HapticIntensity) {
        self.push(intensity);
    }
}

pub fn emit<H: HapticSink + ?Sized>(sink: &mut H, milestone: Milestone) {
    sink.on_haptic(milestone.intensity());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flick_pulse_differs_from_tap() {
        assert_eq!(Milestone::SessionStart.intensity(), HapticIntensity::Light);
        assert_eq!(Milestone::TapCommit.intensity(), HapticIntensity::Medium);
        assert_ne!(
            Milestone::FlickCommit.intensity(),
            Milestone::TapCommit.intensity()
        );
    }

    #[test]
    fn emit_forwards_to_sink() {
        let mut pulses = Vec::new();
        emit(&mut pulses, Milestone::DragCommit);
        emit(&mut pulses, Milestone::FlickCommit);
        assert_eq!(pulses, vec![HapticIntensity::Medium, HapticIntensity::Success]);
    }
}
