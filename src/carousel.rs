//! Horizontal cycling between items that share one stack slot.

use log::debug;
use std::collections::HashMap;

use crate::gestures::Gesture;
use crate::stack::SlotId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselState {
    pub items: Vec<String>,
    pub current_index: usize,
}

impl CarouselState {
    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            current_index: 0,
        }
    }

    pub fn current_item(&self) -> Option<&str> {
        self.items.get(self.current_index).map(String::as_str)
    }

    /// Steps one item, wrapping at both ends.
    fn step(&mut self, forward: bool) -> usize {
        let len = self.items.len();
        self.current_index = if forward {
            (self.current_index + 1) % len
        } else {
            (self.current_index + len - 1) % len
        };
        self.current_index
    }
}

/// Only slots holding two or more items get a carousel.
#[derive(Debug, Default)]
pub struct CarouselSubController {
    carousels: HashMap<SlotId, CarouselState>,
}

impl CarouselSubController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a slot's items. The current index is kept when still in range.
    pub fn set_items(&mut self, slot: SlotId, items: Vec<String>) {
        if items.len() < 2 {
            self.remove(&slot);
            return;
        }
        let len = items.len();
        let state = self
            .carousels
            .entry(slot)
            .or_insert_with(|| CarouselState::new(Vec::new()));
        state.items = items;
        if state.current_index >= len {
            state.current_index = 0;
        }
    }

    pub fn remove(&mut self, slot: &SlotId) {
        self.carousels.remove(slot);
    }

    pub fn retain_slots(&mut self, slots: &[SlotId]) {
        self.carousels.retain(|id, _| slots.contains(id));
    }

    pub fn get(&self, slot: &SlotId) -> Option<&CarouselState> {
        self.carousels.get(slot)
    }

    pub fn has_carousel(&self, slot: &SlotId) -> bool {
        self.carousels.contains_key(slot)
    }

    pub fn current_index(&self, slot: &SlotId) -> Option<usize> {
        self.carousels.get(slot).map(|c| c.current_index)
    }

    /// Applies a swipe. Returns the new item index, or `None` when the slot has
    /// no carousel or the outcome is not a swipe.
    pub fn handle_swipe(&mut self, slot: &SlotId, gesture: Gesture) -> Option<usize> {
        let forward = match gesture {
            Gesture::SwipeLeft => true,
            Gesture::SwipeRight => false,
            _ => return None,
        };
        let Some(state) = self.carousels.get_mut(slot) else {
            debug!("swipe on slot {slot} without a carousel");
            return None;
        };
        Some(state.step(forward))
    }
}
