//! Multitouch slot decoding into per-pointer contact events.
//!
//! Follows the kernel's type-B protocol: `ABS_MT_SLOT` selects a slot,
//! `ABS_MT_TRACKING_ID` opens (>= 0) or closes (-1) the contact in it, and
//! positions accumulate until `SYN_REPORT` flushes the frame.

use std::time::Instant;

use crate::engine::{ContactEvent, ContactPhase};

const MAX_SLOTS: usize = 10;

#[derive(Debug, Clone, Default)]
struct SlotState {
    tracking_id: Option<i32>,
    x_norm: f32,
    y_norm: f32,
    // contact opened this frame
    started: bool,
    // position changed this frame
    dirty: bool,
    // contact closed this frame, with the id it had
    ended: Option<i32>,
}

#[derive(Debug)]
pub struct Tracker {
    slots: Vec<SlotState>,
    cur_slot: usize,
    // normalization
    x_min: i32,
    x_max: i32,
    y_min: i32,
    y_max: i32,
    // output space
    width: f32,
    height: f32,
    start_instant: Instant,
}

impl Tracker {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            slots: vec![SlotState::default(); MAX_SLOTS],
            cur_slot: 0,
            x_min: 0,
            x_max: 4096,
            y_min: 0,
            y_max: 4096,
            width,
            height,
            start_instant: Instant::now(),
        }
    }

    pub fn set_norm_ranges(&mut self, x_min: i32, x_max: i32, y_min: i32, y_max: i32) {
        self.x_min = x_min;
        self.x_max = x_max.max(x_min + 1);
        self.y_min = y_min;
        self.y_max = y_max.max(y_min + 1);
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn now_ms(&self) -> u64 {
        self.start_instant.elapsed().as_millis() as u64
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.tracking_id.is_some()).count()
    }

    pub fn on_slot(&mut self, slot: i32) {
        self.cur_slot = slot.clamp(0, MAX_SLOTS as i32 - 1) as usize;
    }

    pub fn on_tracking_id(&mut self, tracking_id: i32) {
        let s = &mut self.slots[self.cur_slot];
        if tracking_id < 0 {
            if let Some(id) = s.tracking_id.take() {
                // opened and closed inside one frame: nothing to report
                if s.started {
                    s.started = false;
                } else {
                    s.ended = Some(id);
                }
            }
            s.dirty = false;
        } else {
            if let Some(prev) = s.tracking_id {
                if !s.started {
                    s.ended = Some(prev);
                }
            }
            s.tracking_id = Some(tracking_id);
            s.started = true;
            s.dirty = false;
        }
    }

    pub fn on_pos_x(&mut self, raw: i32) {
        let nx = ((raw - self.x_min) as f32 / (self.x_max - self.x_min) as f32).clamp(0.0, 1.0);
        let s = &mut self.slots[self.cur_slot];
        s.dirty |= s.x_norm != nx;
        s.x_norm = nx;
    }

    pub fn on_pos_y(&mut self, raw: i32) {
        let ny = ((raw - self.y_min) as f32 / (self.y_max - self.y_min) as f32).clamp(0.0, 1.0);
        let s = &mut self.slots[self.cur_slot];
        s.dirty |= s.y_norm != ny;
        s.y_norm = ny;
    }

    pub fn on_syn_report(&mut self) -> Vec<ContactEvent> {
        let now = self.now_ms();
        self.on_syn_report_at(now)
    }

    /// Flushes the frame in slot order. A slot that closed and reopened in
    /// the same frame reports the end before the new start.
    pub fn on_syn_report_at(&mut self, t_ms: u64) -> Vec<ContactEvent> {
        let (w, h) = (self.width, self.height);
        let mut out = Vec::new();
        for s in &mut self.slots {
            let (x, y) = (s.x_norm * w, s.y_norm * h);
            if let Some(id) = s.ended.take() {
                out.push(ContactEvent::new(ContactPhase::End, id, x, y, t_ms));
            }
            match s.tracking_id {
                Some(id) if s.started => {
                    out.push(ContactEvent::new(ContactPhase::Start, id, x, y, t_ms));
                }
                Some(id) if s.dirty => {
                    out.push(ContactEvent::new(ContactPhase::Move, id, x, y, t_ms));
                }
                _ => {}
            }
            s.started = false;
            s.dirty = false;
        }
        out
    }

    /// The kernel dropped events (`SYN_DROPPED`): every open contact is
    /// cancelled and the slots reset.
    pub fn on_dropped(&mut self, t_ms: u64) -> Vec<ContactEvent> {
        let mut out = Vec::new();
        for s in &mut self.slots {
            if let Some(id) = s.tracking_id.take() {
                out.push(ContactEvent::new(ContactPhase::Cancel, id, 0.0, 0.0, t_ms));
            }
            *s = SlotState::default();
        }
        out
    }
}
