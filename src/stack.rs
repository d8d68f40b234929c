//! Stack navigation: which slot of the pile is expanded.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gestures::Gesture;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub String);

impl From<&str> for SlotId {
    fn from(s: &str) -> Self {
        SlotId(s.to_string())
    }
}

impl From<String> for SlotId {
    fn from(s: String) -> Self {
        SlotId(s)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlickDirection {
    Up,
    Down,
}

/// A committed change of the active slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackTransition {
    Opened {
        slot: SlotId,
        /// Slot that was expanded before and got collapsed by this open.
        replaced: Option<SlotId>,
    },
    Closed {
        slot: SlotId,
    },
    Flicked {
        from: SlotId,
        to: SlotId,
        direction: FlickDirection,
    },
}

/// Index 0 is the back of the pile, the last slot the front.
#[derive(Debug, Clone, Default)]
pub struct StackState {
    pub slots: Vec<SlotId>,
    pub active_index: Option<usize>,
    pub last_transition_ms: Option<u64>,
}

#[derive(Debug)]
pub struct StackNavigationController {
    state: StackState,
    debounce_ms: u64,
}

impl StackNavigationController {
    pub fn new(slots: Vec<SlotId>, debounce_ms: u64) -> Self {
        Self {
            state: StackState {
                slots,
                ..StackState::default()
            },
            debounce_ms,
        }
    }

    pub fn state(&self) -> &StackState {
        &self.state
    }

    pub fn slots(&self) -> &[SlotId] {
        &self.state.slots
    }

    pub fn active_index(&self) -> Option<usize> {
        self.state.active_index
    }

    pub fn active_slot(&self) -> Option<&SlotId> {
        self.state.active_index.map(|i| &self.state.slots[i])
    }

    pub fn index_of(&self, slot: &SlotId) -> Option<usize> {
        self.state.slots.iter().position(|s| s == slot)
    }

    pub fn set_debounce_ms(&mut self, debounce_ms: u64) {
        self.debounce_ms = debounce_ms;
    }

    /// Replaces the slot list. The active slot survives if its id is still
    /// present.
    pub fn set_slots(&mut self, slots: Vec<SlotId>) {
        let keep = self.active_slot().cloned();
        self.state.slots = slots;
        self.state.active_index = keep.and_then(|id| self.index_of(&id));
    }

    pub fn handle_tab_gesture(
        &mut self,
        slot: &SlotId,
        gesture: Gesture,
        now_ms: u64,
    ) -> Option<StackTransition> {
        let Some(i) = self.index_of(slot) else {
            debug!("gesture on unknown slot {slot}");
            return None;
        };
        match gesture {
            Gesture::Tap => Some(self.toggle(i)),
            Gesture::FlickDown => self.flick(i, FlickDirection::Down, now_ms),
            Gesture::FlickUp => self.flick(i, FlickDirection::Up, now_ms),
            _ => None,
        }
    }

    fn toggle(&mut self, i: usize) -> StackTransition {
        let slot = self.state.slots[i].clone();
        if self.state.active_index == Some(i) {
            self.state.active_index = None;
            return StackTransition::Closed { slot };
        }
        let replaced = self.active_slot().cloned();
        self.state.active_index = Some(i);
        StackTransition::Opened { slot, replaced }
    }

    // Debounce check and timestamp update stay in this one call.
    fn flick(&mut self, i: usize, direction: FlickDirection, now_ms: u64) -> Option<StackTransition> {
        if let Some(last) = self.state.last_transition_ms {
            if now_ms.saturating_sub(last) < self.debounce_ms {
                debug!("flick dropped: {} ms since last transition", now_ms.saturating_sub(last));
                return None;
            }
        }
        let target = match direction {
            FlickDirection::Down => Some(i + 1).filter(|t| *t < self.state.slots.len()),
            FlickDirection::Up => i.checked_sub(1),
        };
        let Some(t) = target else {
            debug!("flick {direction:?} from slot {i} is past the end of the stack");
            return None;
        };
        self.state.active_index = Some(t);
        self.state.last_transition_ms = Some(now_ms);
        Some(StackTransition::Flicked {
            from: self.state.slots[i].clone(),
            to: self.state.slots[t].clone(),
            direction,
        })
    }
}
