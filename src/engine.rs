//! Wires contacts through the router, the controllers and the layout.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::carousel::CarouselSubController;
use crate::config::Profile;
use crate::gestures::{DragFeedback, Gesture};
use crate::haptics::{HapticIntensity, HapticSink};
use crate::layout::{FrameScheduler, LayoutComputer, SlotLayout};
use crate::router::{CarouselControl, Region, RegionMap, TouchRegionRouter};
use crate::session::PointerId;
use crate::stack::{FlickDirection, SlotId, StackNavigationController, StackTransition};

/// Callbacks into the host screen. All methods default to doing nothing.
pub trait StackListener: HapticSink {
    fn on_tab_open(&mut self, _slot: &SlotId) {}
    fn on_tab_close(&mut self, _slot: &SlotId) {}
    fn on_flick_navigate(&mut self, _slot: &SlotId, _direction: FlickDirection) {}
    fn on_carousel_change(&mut self, _slot: &SlotId, _index: usize) {}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StackEvent {
    TabOpen { slot: SlotId },
    TabClose { slot: SlotId },
    FlickNavigate { slot: SlotId, direction: FlickDirection },
    CarouselChange { slot: SlotId, index: usize },
    Haptic { intensity: HapticIntensity },
}

/// Keeps every callback in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub events: Vec<StackEvent>,
}

impl RecordingListener {
    pub fn drain(&mut self) -> Vec<StackEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn without_haptics(&self) -> Vec<StackEvent> {
        self.events
            .iter()
            .filter(|e| !matches!(e, StackEvent::Haptic { .. }))
            .cloned()
            .collect()
    }
}

impl HapticSink for RecordingListener {
    fn on_haptic(&mut self, intensity: HapticIntensity) {
        self.events.push(StackEvent::Haptic { intensity });
    }
}

impl StackListener for RecordingListener {
    fn on_tab_open(&mut self, slot: &SlotId) {
        self.events.push(StackEvent::TabOpen { slot: slot.clone() });
    }
    fn on_tab_close(&mut self, slot: &SlotId) {
        self.events.push(StackEvent::TabClose { slot: slot.clone() });
    }
    fn on_flick_navigate(&mut self, slot: &SlotId, direction: FlickDirection) {
        self.events.push(StackEvent::FlickNavigate {
            slot: slot.clone(),
            direction,
        });
    }
    fn on_carousel_change(&mut self, slot: &SlotId, index: usize) {
        self.events.push(StackEvent::CarouselChange {
            slot: slot.clone(),
            index,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactPhase {
    Start,
    Move,
    End,
    Cancel,
}

/// One inbound contact sample from the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub kind: ContactPhase,
    pub pointer: PointerId,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub t: u64,
    /// Region the host already knows the contact landed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

impl ContactEvent {
    pub fn new(kind: ContactPhase, pointer: PointerId, x: f32, y: f32, t: u64) -> Self {
        Self {
            kind,
            pointer,
            x,
            y,
            t,
            region: None,
        }
    }
}

/// What the host should do with the platform event it just forwarded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactResponse {
    pub region: Option<Region>,
    pub suppress_default: bool,
    /// Visual state for `region`; `REST` after release or cancel.
    pub feedback: Option<DragFeedback>,
    pub gesture: Option<Gesture>,
}

#[derive(Debug)]
pub struct CardStackEngine {
    profile: Profile,
    router: TouchRegionRouter,
    stack: StackNavigationController,
    carousels: CarouselSubController,
    layout: LayoutComputer,
    frames: FrameScheduler,
}

impl CardStackEngine {
    pub fn new(profile: Profile, slots: Vec<SlotId>) -> Self {
        let router = TouchRegionRouter::new(
            profile.thresholds.clone(),
            RegionMap::new(profile.layout.control_padding),
        );
        let mut engine = Self {
            stack: StackNavigationController::new(slots, profile.stack.debounce_ms),
            layout: LayoutComputer::from_settings(&profile.layout),
            carousels: CarouselSubController::new(),
            frames: FrameScheduler::new(),
            router,
            profile,
        };
        engine.relayout();
        engine
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn stack(&self) -> &StackNavigationController {
        &self.stack
    }

    pub fn carousels(&self) -> &CarouselSubController {
        &self.carousels
    }

    pub fn router(&self) -> &TouchRegionRouter {
        &self.router
    }

    /// Live sessions keep running with the thresholds they started with.
    pub fn apply_profile(&mut self, profile: Profile) {
        self.router.set_thresholds(profile.thresholds.clone());
        self.stack.set_debounce_ms(profile.stack.debounce_ms);
        self.layout = LayoutComputer::from_settings(&profile.layout);
        self.profile = profile;
        self.relayout();
    }

    pub fn set_slots(&mut self, slots: Vec<SlotId>) {
        self.carousels.retain_slots(&slots);
        self.stack.set_slots(slots);
        self.relayout();
    }

    pub fn set_items(&mut self, slot: SlotId, items: Vec<String>) {
        self.carousels.set_items(slot, items);
        self.relayout();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.profile.layout.viewport_width = width;
        self.profile.layout.viewport_height = height;
        self.relayout();
    }

    pub fn current_layout(&self) -> Vec<SlotLayout> {
        self.layout
            .compute(self.stack.slots().len(), self.stack.active_index())
    }

    /// Frame boundary: the newest layout requested since the last frame.
    pub fn take_layout(&mut self) -> Option<Vec<SlotLayout>> {
        self.frames.take()
    }

    pub fn wants_suppression(&self) -> bool {
        self.router.any_suppressing()
    }

    fn relayout(&mut self) {
        let layout = self.current_layout();
        let carousels = &self.carousels;
        let regions = RegionMap::from_layout(
            self.stack.slots(),
            &layout,
            self.stack.active_index(),
            &self.profile.layout,
            |slot| carousels.has_carousel(slot),
        );
        self.router.set_regions(regions);
        self.frames.request(layout);
    }

    pub fn handle<L: StackListener>(&mut self, ev: &ContactEvent, listener: &mut L) -> ContactResponse {
        match ev.kind {
            ContactPhase::Start => self.pointer_down(ev, listener),
            ContactPhase::Move => self.pointer_move(ev, listener),
            ContactPhase::End => self.pointer_up(ev, listener),
            ContactPhase::Cancel => self.pointer_cancel(ev.pointer),
        }
    }

    fn pointer_down<L: StackListener>(&mut self, ev: &ContactEvent, listener: &mut L) -> ContactResponse {
        let Some(region) = self.router.resolve(ev.x, ev.y, ev.region.as_ref()) else {
            debug!("pointer {} at ({}, {}) hit no region", ev.pointer, ev.x, ev.y);
            return ContactResponse::default();
        };
        let expanded = self.stack.active_slot() == Some(region.slot());
        match self
            .router
            .start(ev.pointer, region.clone(), ev.x, ev.y, ev.t, expanded, listener)
        {
            Some(suppress) => ContactResponse {
                region: Some(region),
                suppress_default: suppress,
                feedback: Some(DragFeedback::REST),
                gesture: None,
            },
            None => ContactResponse::default(),
        }
    }

    fn pointer_move<L: StackListener>(&mut self, ev: &ContactEvent, listener: &mut L) -> ContactResponse {
        match self.router.route_move(ev.pointer, ev.x, ev.y, ev.t, listener) {
            Some((region, routing)) => ContactResponse {
                region: Some(region),
                suppress_default: routing.suppress_default,
                feedback: Some(routing.feedback),
                gesture: None,
            },
            None => ContactResponse::default(),
        }
    }

    fn pointer_up<L: StackListener>(&mut self, ev: &ContactEvent, listener: &mut L) -> ContactResponse {
        let Some((region, gesture)) = self.router.route_end(ev.pointer, ev.x, ev.y, ev.t, listener)
        else {
            return ContactResponse::default();
        };
        self.commit(&region, gesture, ev.t, listener);
        ContactResponse {
            region: Some(region),
            suppress_default: false,
            feedback: Some(DragFeedback::REST),
            gesture: Some(gesture),
        }
    }

    /// Drops the session; the region snaps back to its committed layout.
    fn pointer_cancel(&mut self, pointer: PointerId) -> ContactResponse {
        match self.router.route_cancel(pointer) {
            Some(region) => ContactResponse {
                region: Some(region),
                feedback: Some(DragFeedback::REST),
                ..ContactResponse::default()
            },
            None => ContactResponse::default(),
        }
    }

    fn commit<L: StackListener>(&mut self, region: &Region, gesture: Gesture, now_ms: u64, listener: &mut L) {
        match region {
            Region::Tab(slot) if gesture.is_swipe() => self.swipe(slot, gesture, listener),
            Region::Tab(slot) => {
                if let Some(t) = self.stack.handle_tab_gesture(slot, gesture, now_ms) {
                    notify_transition(&t, listener);
                    self.relayout();
                }
            }
            Region::Content(slot) if gesture.is_swipe() => self.swipe(slot, gesture, listener),
            Region::Content(_) => {}
            // vertical flicks on a control still belong to the stack
            Region::Control(slot, _) if gesture.is_flick() => {
                if let Some(t) = self.stack.handle_tab_gesture(slot, gesture, now_ms) {
                    notify_transition(&t, listener);
                    self.relayout();
                }
            }
            Region::Control(slot, control) => {
                if gesture == Gesture::Tap {
                    let step = match control {
                        CarouselControl::Next => Gesture::SwipeLeft,
                        CarouselControl::Prev => Gesture::SwipeRight,
                    };
                    self.swipe(slot, step, listener);
                }
            }
        }
    }

    fn swipe<L: StackListener>(&mut self, slot: &SlotId, gesture: Gesture, listener: &mut L) {
        if let Some(index) = self.carousels.handle_swipe(slot, gesture) {
            listener.on_carousel_change(slot, index);
        }
    }
}

fn notify_transition<L: StackListener>(t: &StackTransition, listener: &mut L) {
    match t {
        StackTransition::Opened { slot, replaced } => {
            if let Some(prev) = replaced {
                listener.on_tab_close(prev);
            }
            listener.on_tab_open(slot);
        }
        StackTransition::Closed { slot } => listener.on_tab_close(slot),
        StackTransition::Flicked { to, direction, .. } => listener.on_flick_navigate(to, *direction),
    }
}
