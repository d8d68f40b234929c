//! Vertical placement of the slots in the pile.
//!
//! Offsets are measured upward from the bottom of the viewport. The front slot
//! (last index) sits at offset 0 and each slot behind it peeks out one
//! collapsed height further up. Expanding a slot opens `expanded_height` of
//! room directly under its tab by pushing it, and every slot behind it, up.

use serde::Serialize;

use crate::config::LayoutSettings;

pub const DEFAULT_EXPANDED_HEIGHT: f32 = 320.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotLayout {
    pub offset_y: f32,
    /// Extra upward translation applied by the view to the active slot.
    pub shift_y: f32,
    pub z_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutComputer {
    pub slot_height: f32,
    pub expanded_height: f32,
}

impl LayoutComputer {
    pub fn new(slot_height: f32, expanded_height: f32) -> Self {
        Self {
            slot_height,
            expanded_height,
        }
    }

    pub fn from_settings(settings: &LayoutSettings) -> Self {
        Self::new(settings.slot_height, settings.expanded_height)
    }

    /// An `active` index out of range lays the pile out fully collapsed.
    pub fn compute(&self, slot_count: usize, active: Option<usize>) -> Vec<SlotLayout> {
        let active = active.filter(|a| *a < slot_count);
        (0..slot_count)
            .map(|i| {
                let mut offset_y = (slot_count - 1 - i) as f32 * self.slot_height;
                let mut shift_y = 0.0;
                let mut z_index = i;
                if let Some(a) = active {
                    if i <= a {
                        offset_y += self.expanded_height;
                    }
                    if i == a {
                        shift_y = -self.expanded_height;
                        z_index = slot_count;
                    }
                }
                SlotLayout {
                    offset_y,
                    shift_y,
                    z_index,
                }
            })
            .collect()
    }
}

pub fn compute_offsets(slot_count: usize, slot_height: f32, active: Option<usize>) -> Vec<f32> {
    LayoutComputer::new(slot_height, DEFAULT_EXPANDED_HEIGHT)
        .compute(slot_count, active)
        .into_iter()
        .map(|l| l.offset_y)
        .collect()
}

/// Holds the newest layout until the next frame boundary. A later write in
/// the same frame replaces an earlier one.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: Option<Vec<SlotLayout>>,
    superseded: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, layout: Vec<SlotLayout>) {
        if self.pending.replace(layout).is_some() {
            self.superseded += 1;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Called once per frame.
    pub fn take(&mut self) -> Option<Vec<SlotLayout>> {
        self.pending.take()
    }

    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}
