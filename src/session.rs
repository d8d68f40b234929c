//! Per-pointer motion record, created on contact and dropped on release or cancel.

/// Platform contact identifier (the kernel tracking id on Linux).
pub type PointerId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone)]
pub struct GestureSession {
    pub pointer_id: PointerId,
    pub start_x: f32,
    pub start_y: f32,
    pub current_x: f32,
    pub current_y: f32,
    pub start_ms: u64,
    pub is_tracking: bool,
    pub is_dragging: bool,
    pub has_moved_significantly: bool,
    pub drag_offset_x: f32,
    pub drag_offset_y: f32,
    /// Dominant axis, fixed the first time motion leaves the noise band.
    pub axis: Option<Axis>,
    /// Whether the owning slot was expanded at contact.
    pub started_expanded: bool,
}

impl GestureSession {
    pub fn new(pointer_id: PointerId, x: f32, y: f32, t_ms: u64, expanded: bool) -> Self {
        Self {
            pointer_id,
            start_x: x,
            start_y: y,
            current_x: x,
            current_y: y,
            start_ms: t_ms,
            is_tracking: true,
            is_dragging: false,
            has_moved_significantly: false,
            drag_offset_x: 0.0,
            drag_offset_y: 0.0,
            axis: None,
            started_expanded: expanded,
        }
    }

    pub fn delta(&self) -> (f32, f32) {
        (self.current_x - self.start_x, self.current_y - self.start_y)
    }

    /// Out-of-order timestamps count as zero elapsed time.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms)
    }
}
