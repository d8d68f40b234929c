//! Binding contacts to touch regions.
//!
//! A contact is bound to the region it first lands in and stays there until
//! release or cancel. Each region owns at most one live classifier.

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::{LayoutSettings, Thresholds};
use crate::gestures::{DragFeedback, Gesture, GestureClassifier};
use crate::haptics::HapticSink;
use crate::layout::SlotLayout;
use crate::session::{Axis, GestureSession, PointerId};
use crate::stack::SlotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarouselControl {
    Prev,
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Tab(SlotId),
    Content(SlotId),
    Control(SlotId, CarouselControl),
}

impl Region {
    pub fn slot(&self) -> &SlotId {
        match self {
            Region::Tab(s) | Region::Content(s) | Region::Control(s, _) => s,
        }
    }

    /// Hit-test precedence, lowest first.
    fn rank(&self) -> u8 {
        match self {
            Region::Control(..) => 0,
            Region::Tab(_) => 1,
            Region::Content(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    pub fn inflate(&self, pad: f32) -> Rect {
        Rect::new(self.x - pad, self.y - pad, self.w + 2.0 * pad, self.h + 2.0 * pad)
    }
}

#[derive(Debug, Clone)]
struct RegionEntry {
    region: Region,
    rect: Rect,
    z: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    entries: Vec<RegionEntry>,
    control_padding: f32,
}

impl RegionMap {
    pub fn new(control_padding: f32) -> Self {
        Self {
            entries: Vec::new(),
            control_padding,
        }
    }

    pub fn push(&mut self, region: Region, rect: Rect, z: usize) {
        self.entries.push(RegionEntry { region, rect, z });
    }

    pub fn contains_region(&self, region: &Region) -> bool {
        self.entries.iter().any(|e| &e.region == region)
    }

    pub fn rect_of(&self, region: &Region) -> Option<Rect> {
        self.entries.iter().find(|e| &e.region == region).map(|e| e.rect)
    }

    /// Carousel controls win over tabs, tabs over content. Within one kind the
    /// highest z wins.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<Region> {
        self.entries
            .iter()
            .filter(|e| {
                let rect = match e.region {
                    Region::Control(..) => e.rect.inflate(self.control_padding),
                    _ => e.rect,
                };
                rect.contains(x, y)
            })
            .min_by(|a, b| {
                a.region
                    .rank()
                    .cmp(&b.region.rank())
                    .then_with(|| b.z.cmp(&a.z))
            })
            .map(|e| e.region.clone())
    }

    /// Builds the hit geometry for a laid-out pile. Screen y grows downward;
    /// each tab sits `offset_y` above the bottom edge and the active slot's
    /// content fills the room under its tab.
    pub fn from_layout(
        slots: &[SlotId],
        layout: &[SlotLayout],
        active: Option<usize>,
        settings: &LayoutSettings,
        has_carousel: impl Fn(&SlotId) -> bool,
    ) -> Self {
        let mut map = RegionMap::new(settings.control_padding);
        let w = settings.viewport_width;
        let h = settings.slot_height;
        let c = settings.control_size;

        for (i, (slot, l)) in slots.iter().zip(layout).enumerate() {
            let tab_top = settings.viewport_height - h - l.offset_y;
            map.push(Region::Tab(slot.clone()), Rect::new(0.0, tab_top, w, h), l.z_index);

            if active == Some(i) {
                map.push(
                    Region::Content(slot.clone()),
                    Rect::new(0.0, tab_top + h, w, settings.expanded_height),
                    l.z_index,
                );
            }

            if has_carousel(slot) {
                let cy = tab_top + (h - c) / 2.0;
                map.push(
                    Region::Control(slot.clone(), CarouselControl::Prev),
                    Rect::new(0.0, cy, c, c),
                    l.z_index,
                );
                map.push(
                    Region::Control(slot.clone(), CarouselControl::Next),
                    Rect::new(w - c, cy, c, c),
                    l.z_index,
                );
            }
        }
        map
    }
}

/// Whether the platform's own scroll/click handling must be held back.
pub fn suppress_default(region: &Region, session: Option<&GestureSession>) -> bool {
    match region {
        Region::Tab(_) | Region::Control(..) => true,
        Region::Content(_) => session.is_some_and(|s| s.axis == Some(Axis::Horizontal)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRouting {
    pub feedback: DragFeedback,
    pub suppress_default: bool,
}

#[derive(Debug)]
pub struct TouchRegionRouter {
    th: Thresholds,
    regions: RegionMap,
    bindings: HashMap<PointerId, Region>,
    live: HashMap<Region, GestureClassifier>,
}

impl TouchRegionRouter {
    pub fn new(th: Thresholds, regions: RegionMap) -> Self {
        Self {
            th,
            regions,
            bindings: HashMap::new(),
            live: HashMap::new(),
        }
    }

    pub fn set_thresholds(&mut self, th: Thresholds) {
        self.th = th;
    }

    /// Live sessions keep their bound region even if it moved away.
    pub fn set_regions(&mut self, regions: RegionMap) {
        self.regions = regions;
    }

    pub fn regions(&self) -> &RegionMap {
        &self.regions
    }

    pub fn region_of(&self, pointer: PointerId) -> Option<&Region> {
        self.bindings.get(&pointer)
    }

    /// Picks the region for a new contact. A hint naming a known region is
    /// trusted over hit-testing.
    pub fn resolve(&self, x: f32, y: f32, hint: Option<&Region>) -> Option<Region> {
        match hint {
            Some(r) if self.regions.contains_region(r) => Some(r.clone()),
            _ => self.regions.hit_test(x, y),
        }
    }

    /// Starts a session for `pointer` in `region`. Returns whether default
    /// handling should be suppressed, or `None` when the contact is ignored.
    #[allow(clippy::too_many_arguments)]
    pub fn start<H: HapticSink + ?Sized>(
        &mut self,
        pointer: PointerId,
        region: Region,
        x: f32,
        y: f32,
        t_ms: u64,
        expanded: bool,
        haptics: &mut H,
    ) -> Option<bool> {
        if self.bindings.contains_key(&pointer) {
            debug!("pointer {pointer} already bound; duplicate start ignored");
            return None;
        }
        if self.live.contains_key(&region) {
            debug!("pointer {pointer} ignored: {region:?} already has a live session");
            return None;
        }
        let mut classifier = GestureClassifier::new(self.th.clone());
        classifier.on_start(pointer, x, y, t_ms, expanded, haptics);
        let suppress = suppress_default(&region, classifier.session());
        debug!("pointer {pointer} bound to {region:?}");
        self.live.insert(region.clone(), classifier);
        self.bindings.insert(pointer, region);
        Some(suppress)
    }

    pub fn route_move<H: HapticSink + ?Sized>(
        &mut self,
        pointer: PointerId,
        x: f32,
        y: f32,
        t_ms: u64,
        haptics: &mut H,
    ) -> Option<(Region, MoveRouting)> {
        let Some(region) = self.bindings.get(&pointer) else {
            trace!("move for unbound pointer {pointer}");
            return None;
        };
        let classifier = self.live.get_mut(region)?;
        let feedback = classifier.on_move(x, y, t_ms, haptics)?;
        let suppress = suppress_default(region, classifier.session());
        Some((
            region.clone(),
            MoveRouting {
                feedback,
                suppress_default: suppress,
            },
        ))
    }

    pub fn route_end<H: HapticSink + ?Sized>(
        &mut self,
        pointer: PointerId,
        x: f32,
        y: f32,
        t_ms: u64,
        haptics: &mut H,
    ) -> Option<(Region, Gesture)> {
        let Some(region) = self.bindings.remove(&pointer) else {
            trace!("end for unbound pointer {pointer}");
            return None;
        };
        let mut classifier = self.live.remove(&region)?;
        let gesture = classifier.on_end(x, y, t_ms, haptics)?;
        Some((region, gesture))
    }

    pub fn route_cancel(&mut self, pointer: PointerId) -> Option<Region> {
        let Some(region) = self.bindings.remove(&pointer) else {
            trace!("cancel for unbound pointer {pointer}");
            return None;
        };
        if let Some(mut classifier) = self.live.remove(&region) {
            classifier.on_cancel();
        }
        Some(region)
    }

    /// True while any live session wants default handling held back.
    pub fn any_suppressing(&self) -> bool {
        self.live
            .iter()
            .any(|(region, c)| suppress_default(region, c.session()))
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutComputer;

    fn settings() -> LayoutSettings {
        LayoutSettings {
            viewport_width: 400.0,
            viewport_height: 800.0,
            slot_height: 50.0,
            expanded_height: 200.0,
            control_size: 20.0,
            control_padding: 8.0,
        }
    }

    fn slots() -> Vec<SlotId> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    fn map(active: Option<usize>) -> RegionMap {
        let s = settings();
        let layout = LayoutComputer::from_settings(&s).compute(3, active);
        RegionMap::from_layout(&slots(), &layout, active, &s, |id| id.0 == "b")
    }

    #[test]
    fn geometry_follows_layout() {
        let m = map(None);
        // front slot c sits on the bottom edge
        assert_eq!(m.rect_of(&Region::Tab("c".into())), Some(Rect::new(0.0, 750.0, 400.0, 50.0)));
        assert_eq!(m.rect_of(&Region::Tab("a".into())), Some(Rect::new(0.0, 650.0, 400.0, 50.0)));
        assert!(!m.contains_region(&Region::Content("a".into())));

        let m = map(Some(1));
        assert_eq!(m.rect_of(&Region::Tab("b".into())), Some(Rect::new(0.0, 500.0, 400.0, 50.0)));
        assert_eq!(
            m.rect_of(&Region::Content("b".into())),
            Some(Rect::new(0.0, 550.0, 400.0, 200.0))
        );
    }

    #[test]
    fn hit_test_precedence() {
        let m = map(Some(1));
        assert_eq!(m.hit_test(200.0, 520.0), Some(Region::Tab("b".into())));
        assert_eq!(m.hit_test(200.0, 600.0), Some(Region::Content("b".into())));
        assert_eq!(
            m.hit_test(395.0, 525.0),
            Some(Region::Control("b".into(), CarouselControl::Next))
        );
        // padding keeps a near miss on the control
        assert_eq!(
            m.hit_test(25.0, 525.0),
            Some(Region::Control("b".into(), CarouselControl::Prev))
        );
        assert_eq!(m.hit_test(35.0, 525.0), Some(Region::Tab("b".into())));
        assert_eq!(m.hit_test(200.0, 10.0), None);
    }

    #[test]
    fn hint_is_used_only_for_known_regions() {
        let r = TouchRegionRouter::new(Thresholds::default(), map(None));
        let hint = Region::Tab("a".into());
        assert_eq!(r.resolve(200.0, 775.0, Some(&hint)), Some(hint));
        let bogus = Region::Content("a".into());
        assert_eq!(r.resolve(200.0, 775.0, Some(&bogus)), Some(Region::Tab("c".into())));
    }

    #[test]
    fn second_contact_on_same_region_is_ignored() {
        let mut r = TouchRegionRouter::new(Thresholds::default(), map(None));
        let tab = Region::Tab("c".into());
        assert_eq!(r.start(1, tab.clone(), 100.0, 770.0, 0, false, &mut ()), Some(true));
        assert_eq!(r.start(2, tab.clone(), 120.0, 770.0, 5, false, &mut ()), None);
        assert_eq!(r.region_of(2), None);
        // a different region is independent
        let other = Region::Tab("a".into());
        assert_eq!(r.start(2, other, 100.0, 670.0, 5, false, &mut ()), Some(true));
        assert_eq!(r.live_count(), 2);
        // duplicate start for a bound pointer
        assert_eq!(r.start(1, Region::Tab("b".into()), 0.0, 0.0, 6, false, &mut ()), None);
    }

    #[test]
    fn session_stays_with_its_region() {
        let mut r = TouchRegionRouter::new(Thresholds::default(), map(None));
        r.start(1, Region::Tab("c".into()), 100.0, 770.0, 0, false, &mut ());
        // moves far outside the tab are still routed to it
        let (region, _) = r.route_move(1, 100.0, 100.0, 50, &mut ()).unwrap();
        assert_eq!(region, Region::Tab("c".into()));
        let (region, g) = r.route_end(1, 100.0, 100.0, 100, &mut ()).unwrap();
        assert_eq!(region, Region::Tab("c".into()));
        assert_eq!(g, Gesture::FlickUp);
        assert_eq!(r.live_count(), 0);
    }

    #[test]
    fn content_suppresses_only_once_motion_is_horizontal() {
        let mut r = TouchRegionRouter::new(Thresholds::default(), map(Some(1)));
        let content = Region::Content("b".into());
        assert_eq!(r.start(1, content.clone(), 200.0, 600.0, 0, true, &mut ()), Some(false));
        let (_, m) = r.route_move(1, 203.0, 602.0, 10, &mut ()).unwrap();
        assert!(!m.suppress_default);
        let (_, m) = r.route_move(1, 230.0, 604.0, 20, &mut ()).unwrap();
        assert!(m.suppress_default);
        assert!(r.any_suppressing());

        assert_eq!(r.start(2, Region::Tab("a".into()), 0.0, 0.0, 0, false, &mut ()), Some(true));
        r.route_cancel(1);
        r.route_cancel(2);
        assert!(!r.any_suppressing());

        r.start(3, content, 200.0, 600.0, 100, true, &mut ());
        let (_, m) = r.route_move(3, 202.0, 640.0, 120, &mut ()).unwrap();
        assert!(!m.suppress_default);
        // axis stays vertical even if motion later turns sideways
        let (_, m) = r.route_move(3, 300.0, 640.0, 140, &mut ()).unwrap();
        assert!(!m.suppress_default);
    }

    #[test]
    fn stale_pointers_are_ignored() {
        let mut r = TouchRegionRouter::new(Thresholds::default(), map(None));
        assert!(r.route_move(9, 0.0, 0.0, 0, &mut ()).is_none());
        assert!(r.route_end(9, 0.0, 0.0, 0, &mut ()).is_none());
        assert!(r.route_cancel(9).is_none());
    }
}
