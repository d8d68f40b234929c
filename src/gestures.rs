//! Single-pointer gesture classification.
//!
//! A [`GestureClassifier`] owns at most one live [`GestureSession`]. While the
//! pointer is down it reports [`DragFeedback`] for the view; on release it
//! resolves the session into exactly one [`Gesture`].

use log::{debug, trace};
use serde::Serialize;

use crate::config::Thresholds;
use crate::haptics::{self, HapticSink, Milestone};
use crate::session::{Axis, GestureSession, PointerId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Gesture {
    Tap,
    /// Sustained motion on an expanded slot; feedback only, no navigation.
    Drag { dx: f32, dy: f32 },
    FlickUp,
    FlickDown,
    SwipeLeft,
    SwipeRight,
    /// Nothing crossed a commit threshold.
    None,
}

impl Gesture {
    pub fn is_flick(&self) -> bool {
        matches!(self, Gesture::FlickUp | Gesture::FlickDown)
    }

    pub fn is_swipe(&self) -> bool {
        matches!(self, Gesture::SwipeLeft | Gesture::SwipeRight)
    }
}

/// In-progress visual state for the slot under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DragFeedback {
    pub offset_x: f32,
    pub offset_y: f32,
    pub scale: f32,
    pub brightness: f32,
}

impl DragFeedback {
    pub const REST: DragFeedback = DragFeedback {
        offset_x: 0.0,
        offset_y: 0.0,
        scale: 1.0,
        brightness: 1.0,
    };
}

impl Default for DragFeedback {
    fn default() -> Self {
        Self::REST
    }
}

#[derive(Debug)]
pub struct GestureClassifier {
    th: Thresholds,
    session: Option<GestureSession>,
}

impl GestureClassifier {
    pub fn new(th: Thresholds) -> Self {
        Self { th, session: None }
    }

    /// New thresholds apply from the next session on.
    pub fn set_thresholds(&mut self, th: Thresholds) {
        self.th = th;
    }

    pub fn session(&self) -> Option<&GestureSession> {
        self.session.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_tracking)
    }

    /// Opens a session. Returns false, leaving the live session untouched,
    /// when one is already in progress.
    pub fn on_start<H: HapticSink + ?Sized>(
        &mut self,
        pointer_id: PointerId,
        x: f32,
        y: f32,
        t_ms: u64,
        expanded: bool,
        haptics: &mut H,
    ) -> bool {
        if let Some(live) = &self.session {
            debug!(
                "pointer {pointer_id} ignored: pointer {} already owns this region",
                live.pointer_id
            );
            return false;
        }
        self.session = Some(GestureSession::new(pointer_id, x, y, t_ms, expanded));
        haptics::emit(haptics, Milestone::SessionStart);
        true
    }

    pub fn on_move<H: HapticSink + ?Sized>(
        &mut self,
        x: f32,
        y: f32,
        _t_ms: u64,
        haptics: &mut H,
    ) -> Option<DragFeedback> {
        let Some(s) = self.session.as_mut() else {
            trace!("move without a live session");
            return None;
        };
        if advance(&self.th, s, x, y) {
            haptics::emit(haptics, Milestone::DragCommit);
        }
        Some(feedback(&self.th, s))
    }

    /// Closes the session and resolves it. `None` means there was no live
    /// session to close.
    pub fn on_end<H: HapticSink + ?Sized>(
        &mut self,
        x: f32,
        y: f32,
        t_ms: u64,
        haptics: &mut H,
    ) -> Option<Gesture> {
        let Some(mut s) = self.session.take() else {
            trace!("end without a live session");
            return None;
        };
        advance(&self.th, &mut s, x, y);
        s.is_tracking = false;

        let gesture = classify(&self.th, &s, t_ms);
        match gesture {
            Gesture::FlickUp | Gesture::FlickDown => {
                haptics::emit(haptics, Milestone::FlickCommit)
            }
            Gesture::Tap => haptics::emit(haptics, Milestone::TapCommit),
            _ => {}
        }
        debug!(
            "pointer {} resolved as {:?} after {} ms",
            s.pointer_id,
            gesture,
            s.elapsed_ms(t_ms)
        );
        Some(gesture)
    }

    /// Drops the session without an outcome. Returns whether one was live.
    pub fn on_cancel(&mut self) -> bool {
        match self.session.take() {
            Some(s) => {
                debug!("pointer {} cancelled", s.pointer_id);
                true
            }
            None => false,
        }
    }
}

/// Moves the session to `(x, y)`. Returns true when this step crossed the
/// drag-commit threshold.
fn advance(th: &Thresholds, s: &mut GestureSession, x: f32, y: f32) -> bool {
    s.current_x = x;
    s.current_y = y;
    let (dx, dy) = s.delta();
    let (ax, ay) = (dx.abs(), dy.abs());

    if !s.has_moved_significantly && (ax > th.noise_px || ay > th.noise_px) {
        s.has_moved_significantly = true;
        s.axis = Some(if ax > ay { Axis::Horizontal } else { Axis::Vertical });
    }

    s.drag_offset_x = (dx * th.drag_damping).clamp(-th.drag_clamp_px, th.drag_clamp_px);
    s.drag_offset_y = (dy * th.drag_damping).clamp(-th.drag_clamp_px, th.drag_clamp_px);

    if !s.is_dragging && (ax > th.drag_commit_px || ay > th.drag_commit_px) {
        s.is_dragging = true;
        return true;
    }
    false
}

fn feedback(th: &Thresholds, s: &GestureSession) -> DragFeedback {
    if !s.is_dragging {
        return DragFeedback::REST;
    }
    DragFeedback {
        offset_x: s.drag_offset_x,
        offset_y: s.drag_offset_y,
        scale: th.drag_scale,
        brightness: th.drag_brightness,
    }
}

/// Resolves a finished session. First match wins: flick, drag release, tap,
/// horizontal swipe.
pub fn classify(th: &Thresholds, s: &GestureSession, end_ms: u64) -> Gesture {
    let (dx, dy) = s.delta();
    let (ax, ay) = (dx.abs(), dy.abs());
    let dt = s.elapsed_ms(end_ms);
    let expanded = s.started_expanded;

    if ay > th.flick_distance_px(expanded) && dt < th.flick_window_ms(expanded) {
        return if dy < 0.0 {
            Gesture::FlickUp
        } else {
            Gesture::FlickDown
        };
    }

    if s.has_moved_significantly && ay > th.drag_release_px {
        // a slow pull on a collapsed tab still opens it
        return if expanded {
            Gesture::Drag { dx, dy }
        } else {
            Gesture::Tap
        };
    }

    if !s.has_moved_significantly && dt < th.tap_ms {
        return Gesture::Tap;
    }

    if ax > th.swipe_min_px && ax > th.swipe_dominance * ay {
        return if dx < 0.0 {
            Gesture::SwipeLeft
        } else {
            Gesture::SwipeRight
        };
    }

    Gesture::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haptics::HapticIntensity;

    fn run(path: &[(f32, f32, u64)], expanded: bool) -> (Gesture, Vec<HapticIntensity>) {
        let mut c = GestureClassifier::new(Thresholds::default());
        let mut pulses = Vec::new();
        let (x0, y0, t0) = path[0];
        assert!(c.on_start(1, x0, y0, t0, expanded, &mut pulses));
        for &(x, y, t) in &path[1..path.len() - 1] {
            c.on_move(x, y, t, &mut pulses);
        }
        let (x, y, t) = path[path.len() - 1];
        let g = c.on_end(x, y, t, &mut pulses).unwrap();
        assert!(!c.is_live());
        (g, pulses)
    }

    #[test]
    fn small_quick_contact_is_a_tap() {
        let (g, pulses) = run(&[(100.0, 100.0, 0), (103.0, 104.0, 80), (105.0, 100.0, 150)], false);
        assert_eq!(g, Gesture::Tap);
        assert_eq!(pulses, vec![HapticIntensity::Light, HapticIntensity::Medium]);
    }

    #[test]
    fn long_still_press_is_nothing() {
        let (g, pulses) = run(&[(100.0, 100.0, 0), (100.0, 100.0, 450)], false);
        assert_eq!(g, Gesture::None);
        assert_eq!(pulses, vec![HapticIntensity::Light]);
    }

    #[test]
    fn fast_vertical_motion_on_collapsed_slot_flicks() {
        let (g, pulses) = run(&[(100.0, 100.0, 0), (100.0, 125.0, 200), (100.0, 150.0, 400)], false);
        assert_eq!(g, Gesture::FlickDown);
        assert_eq!(
            pulses,
            vec![
                HapticIntensity::Light,
                HapticIntensity::Medium,
                HapticIntensity::Success
            ]
        );

        let (g, _) = run(&[(100.0, 300.0, 0), (100.0, 250.0, 300)], false);
        assert_eq!(g, Gesture::FlickUp);
    }

    #[test]
    fn flick_window_depends_on_expansion() {
        // 35 px in 700 ms: too short for collapsed, a flick when expanded
        let path = [(0.0, 0.0, 0), (0.0, -35.0, 700)];
        assert_eq!(run(&path, false).0, Gesture::Tap);
        assert_eq!(run(&path, true).0, Gesture::FlickUp);
    }

    #[test]
    fn slow_drag_on_expanded_slot_does_not_navigate() {
        let (g, pulses) = run(&[(0.0, 0.0, 0), (0.0, 20.0, 400), (0.0, 35.0, 850)], true);
        assert_eq!(g, Gesture::Drag { dx: 0.0, dy: 35.0 });
        assert!(!pulses.contains(&HapticIntensity::Success));
    }

    #[test]
    fn slow_drag_on_collapsed_slot_opens_it() {
        let (g, _) = run(&[(0.0, 0.0, 0), (0.0, 30.0, 900)], false);
        assert_eq!(g, Gesture::Tap);
    }

    #[test]
    fn horizontal_motion_swipes() {
        let (g, pulses) = run(&[(200.0, 100.0, 0), (170.0, 102.0, 100), (140.0, 105.0, 250)], false);
        assert_eq!(g, Gesture::SwipeLeft);
        assert!(!pulses.contains(&HapticIntensity::Success));

        let (g, _) = run(&[(100.0, 100.0, 0), (160.0, 90.0, 250)], true);
        assert_eq!(g, Gesture::SwipeRight);
    }

    #[test]
    fn swipe_needs_horizontal_dominance() {
        assert_eq!(run(&[(0.0, 0.0, 0), (50.0, 12.0, 900)], false).0, Gesture::SwipeRight);

        let th = Thresholds {
            drag_release_px: 50.0,
            ..Thresholds::default()
        };
        let mut s = GestureSession::new(1, 0.0, 0.0, 0, false);
        s.current_x = 45.0;
        s.current_y = 35.0;
        s.has_moved_significantly = true;
        assert_eq!(classify(&th, &s, 900), Gesture::None);
        s.current_x = 60.0;
        assert_eq!(classify(&th, &s, 900), Gesture::SwipeRight);
    }

    #[test]
    fn vertical_flick_wins_over_swipe() {
        let (g, _) = run(&[(0.0, 0.0, 0), (80.0, 45.0, 200)], false);
        assert_eq!(g, Gesture::FlickDown);
    }

    #[test]
    fn feedback_is_damped_and_clamped() {
        let mut c = GestureClassifier::new(Thresholds::default());
        let mut pulses = Vec::new();
        c.on_start(7, 0.0, 0.0, 0, false, &mut pulses);

        let fb = c.on_move(0.0, 9.0, 10, &mut pulses).unwrap();
        assert_eq!(fb, DragFeedback::REST);
        assert!(c.session().unwrap().has_moved_significantly);
        assert!(!c.session().unwrap().is_dragging);

        let fb = c.on_move(5.0, 50.0, 20, &mut pulses).unwrap();
        assert_eq!(fb.offset_y, 20.0);
        assert_eq!(fb.offset_x, 2.0);
        assert_eq!(fb.scale, 1.02);
        assert_eq!(fb.brightness, 1.1);

        let fb = c.on_move(-600.0, 400.0, 30, &mut pulses).unwrap();
        assert_eq!(fb.offset_x, -100.0);
        assert_eq!(fb.offset_y, 100.0);

        // only one drag pulse per session
        assert_eq!(pulses, vec![HapticIntensity::Light, HapticIntensity::Medium]);
        assert_eq!(c.session().unwrap().axis, Some(Axis::Vertical));
    }

    #[test]
    fn second_contact_is_ignored() {
        let mut c = GestureClassifier::new(Thresholds::default());
        assert!(c.on_start(1, 0.0, 0.0, 0, false, &mut ()));
        assert!(!c.on_start(2, 50.0, 50.0, 10, false, &mut ()));
        assert_eq!(c.session().unwrap().pointer_id, 1);
        assert_eq!(c.session().unwrap().start_x, 0.0);
    }

    #[test]
    fn cancel_discards_silently() {
        let mut c = GestureClassifier::new(Thresholds::default());
        let mut pulses = Vec::new();
        c.on_start(1, 0.0, 0.0, 0, false, &mut pulses);
        c.on_move(0.0, 60.0, 50, &mut pulses);
        pulses.clear();

        assert!(c.on_cancel());
        assert!(!c.is_live());
        assert!(pulses.is_empty());
        assert_eq!(c.on_end(0.0, 60.0, 100, &mut pulses), None);
        assert_eq!(c.on_move(0.0, 60.0, 100, &mut pulses), None);
        assert!(!c.on_cancel());
        assert!(pulses.is_empty());
    }

    fn moved_session(dx: f32, dy: f32, expanded: bool) -> GestureSession {
        let mut s = GestureSession::new(1, 0.0, 0.0, 0, expanded);
        s.current_x = dx;
        s.current_y = dy;
        s.has_moved_significantly = true;
        s
    }

    #[test]
    fn flick_distance_is_exclusive() {
        let th = Thresholds::default();
        assert_eq!(classify(&th, &moved_session(0.0, 40.0, false), 300), Gesture::Tap);
        assert_eq!(classify(&th, &moved_session(0.0, 41.0, false), 300), Gesture::FlickDown);
        assert_eq!(
            classify(&th, &moved_session(0.0, 30.0, true), 300),
            Gesture::Drag { dx: 0.0, dy: 30.0 }
        );
        assert_eq!(classify(&th, &moved_session(0.0, 31.0, true), 300), Gesture::FlickDown);
    }

    #[test]
    fn flick_window_is_exclusive() {
        let th = Thresholds::default();
        let collapsed = moved_session(0.0, -50.0, false);
        assert_eq!(classify(&th, &collapsed, 599), Gesture::FlickUp);
        assert_eq!(classify(&th, &collapsed, 600), Gesture::Tap);

        let expanded = moved_session(0.0, -50.0, true);
        assert_eq!(classify(&th, &expanded, 799), Gesture::FlickUp);
        assert_eq!(classify(&th, &expanded, 800), Gesture::Drag { dx: 0.0, dy: -50.0 });
    }

    #[test]
    fn tap_window_is_exclusive() {
        let th = Thresholds::default();
        let s = GestureSession::new(1, 10.0, 10.0, 0, false);
        assert_eq!(classify(&th, &s, 299), Gesture::Tap);
        assert_eq!(classify(&th, &s, 300), Gesture::None);
    }

    #[test]
    fn noise_band_is_inclusive() {
        let mut c = GestureClassifier::new(Thresholds::default());
        c.on_start(1, 0.0, 0.0, 0, false, &mut ());
        c.on_move(8.0, 0.0, 10, &mut ());
        assert!(!c.session().unwrap().has_moved_significantly);
        assert_eq!(c.session().unwrap().axis, None);
        c.on_move(9.0, 0.0, 20, &mut ());
        assert!(c.session().unwrap().has_moved_significantly);
        assert_eq!(c.session().unwrap().axis, Some(Axis::Horizontal));
    }

    #[test]
    fn drag_commits_past_ten_pixels() {
        let mut c = GestureClassifier::new(Thresholds::default());
        let mut pulses = Vec::new();
        c.on_start(1, 0.0, 0.0, 0, true, &mut pulses);
        assert_eq!(c.on_move(0.0, 10.0, 10, &mut pulses), Some(DragFeedback::REST));
        assert!(!c.session().unwrap().is_dragging);
        assert_eq!(pulses, vec![HapticIntensity::Light]);

        let fb = c.on_move(0.0, 11.0, 20, &mut pulses).unwrap();
        assert!(c.session().unwrap().is_dragging);
        assert_eq!(fb.scale, 1.02);
        assert_eq!(pulses, vec![HapticIntensity::Light, HapticIntensity::Medium]);
    }

    #[test]
    fn swipe_distance_and_dominance_are_exclusive() {
        let th = Thresholds::default();
        assert_eq!(classify(&th, &moved_session(40.0, 0.0, false), 900), Gesture::None);
        assert_eq!(classify(&th, &moved_session(-41.0, 0.0, false), 900), Gesture::SwipeLeft);

        // exactly 1.5x the vertical travel is not dominant
        let th = Thresholds {
            drag_release_px: 50.0,
            ..Thresholds::default()
        };
        assert_eq!(classify(&th, &moved_session(60.0, 40.0, false), 900), Gesture::None);
        assert_eq!(classify(&th, &moved_session(61.0, 40.0, false), 900), Gesture::SwipeRight);
    }

    #[test]
    fn thresholds_are_configurable() {
        let th = Thresholds {
            flick_distance_collapsed_px: 80.0,
            ..Thresholds::default()
        };
        let mut s = GestureSession::new(1, 0.0, 0.0, 0, false);
        s.current_y = 60.0;
        s.has_moved_significantly = true;
        assert_eq!(classify(&Thresholds::default(), &s, 300), Gesture::FlickDown);
        assert_eq!(classify(&th, &s, 300), Gesture::Tap);
    }
}
