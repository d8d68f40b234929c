//! Offline replay of recorded contact traces.
//!
//! A trace is newline-delimited JSON, one [`ContactEvent`] per line. Blank
//! lines and lines starting with `#` are skipped.

use serde::Serialize;
use std::io::{self, BufRead};
use thiserror::Error;

use crate::engine::{CardStackEngine, ContactEvent, RecordingListener, StackEvent};
use crate::gestures::Gesture;
use crate::router::Region;
use crate::session::PointerId;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<ContactEvent>, TraceError> {
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let ev = serde_json::from_str(trimmed).map_err(|source| TraceError::Parse {
            line: i + 1,
            source,
        })?;
        out.push(ev);
    }
    Ok(out)
}

/// What one contact event led to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayLine {
    pub t: u64,
    pub pointer: PointerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gesture: Option<Gesture>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub callbacks: Vec<StackEvent>,
}

/// Feeds `trace` through `engine`. Only contacts that produced a gesture or a
/// callback are reported.
pub fn replay(engine: &mut CardStackEngine, trace: &[ContactEvent]) -> Vec<ReplayLine> {
    let mut listener = RecordingListener::default();
    let mut out = Vec::new();
    for ev in trace {
        let resp = engine.handle(ev, &mut listener);
        let callbacks = listener.drain();
        if resp.gesture.is_none() && callbacks.is_empty() {
            continue;
        }
        out.push(ReplayLine {
            t: ev.t,
            pointer: ev.pointer,
            region: resp.region,
            gesture: resp.gesture,
            callbacks,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;
    use crate::haptics::HapticIntensity;
    use crate::stack::{FlickDirection, SlotId};

    const TRACE: &str = r#"
# open d1 by its hint, then flick down to d2
{"kind":"start","pointer":1,"x":100,"y":100,"t":0,"region":{"tab":"d1"}}
{"kind":"end","pointer":1,"x":102,"y":101,"t":90}

{"kind":"start","pointer":2,"x":100,"y":100,"t":1000,"region":{"tab":"d1"}}
{"kind":"move","pointer":2,"x":100,"y":130,"t":1060}
{"kind":"end","pointer":2,"x":100,"y":170,"t":1150}
"#;

    #[test]
    fn parses_and_replays_a_trace() {
        let trace = parse_trace(TRACE.as_bytes()).unwrap();
        assert_eq!(trace.len(), 5);

        let slots = ["d0", "d1", "d2"].into_iter().map(SlotId::from).collect();
        let mut engine = CardStackEngine::new(Profile::default(), slots);
        let lines = replay(&mut engine, &trace);

        // start haptics also surface
        assert_eq!(lines[0].callbacks, vec![StackEvent::Haptic { intensity: HapticIntensity::Light }]);
        assert_eq!(lines[1].gesture, Some(Gesture::Tap));
        assert!(lines[1].callbacks.contains(&StackEvent::TabOpen { slot: SlotId::from("d1") }));

        let last = lines.last().unwrap();
        assert_eq!(last.gesture, Some(Gesture::FlickDown));
        assert!(last.callbacks.contains(&StackEvent::FlickNavigate {
            slot: SlotId::from("d2"),
            direction: FlickDirection::Down
        }));
        assert_eq!(engine.stack().active_index(), Some(2));

        let json = serde_json::to_string(last).unwrap();
        assert!(json.contains(r#""event":"flick_navigate""#));
        assert!(json.contains(r#""gesture":{"kind":"flick_down"}"#));
    }

    #[test]
    fn reports_the_failing_line() {
        let err = parse_trace("{\"kind\":\"start\",\"pointer\":1}\nnot json\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TraceError::Parse { line: 2, .. }));
    }
}
