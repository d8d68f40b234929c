//! Live loop: touchscreen → tracker → engine.

use anyhow::{Context, Result, anyhow};
use evdev::{AbsoluteAxisCode, EventType, SynchronizationCode};
use log::{debug, info, warn};
use notify::{RecursiveMode, Watcher};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::{
    path::PathBuf,
    sync::{
        Arc, mpsc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crate::config::ProfileStore;
use crate::engine::{CardStackEngine, ContactEvent, StackListener};
use crate::haptics::{HapticIntensity, HapticSink};
use crate::input;
use crate::stack::{FlickDirection, SlotId};
use crate::tracker::Tracker;

pub struct LiveOptions {
    pub device: Option<PathBuf>,
    pub slots: Vec<SlotId>,
}

// A desktop touchscreen has no actuator, so haptic intents are only logged.
struct LogListener;

impl HapticSink for LogListener {
    fn on_haptic(&mut self, intensity: HapticIntensity) {
        debug!("haptic {intensity:?}");
    }
}

impl StackListener for LogListener {
    fn on_tab_open(&mut self, slot: &SlotId) {
        info!("open {slot}");
    }
    fn on_tab_close(&mut self, slot: &SlotId) {
        info!("close {slot}");
    }
    fn on_flick_navigate(&mut self, slot: &SlotId, direction: FlickDirection) {
        info!("flick {direction:?} -> {slot}");
    }
    fn on_carousel_change(&mut self, slot: &SlotId, index: usize) {
        info!("carousel {slot} -> item {index}");
    }
}

pub fn run_live(store: &mut ProfileStore, opts: LiveOptions) -> Result<()> {
    let path = match opts.device {
        Some(p) => p,
        None => input::discover_multitouch()
            .into_iter()
            .next()
            .map(|d| PathBuf::from(d.path))
            .ok_or_else(|| anyhow!("no multitouch devices detected"))?,
    };
    let (mut dev, ranges) = input::open_touchscreen(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    dev.set_nonblocking(true)?;
    info!(
        "reading {} ({})",
        dev.name().unwrap_or("unknown"),
        path.display()
    );

    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&stop))?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&stop))?;

    let (tx_fs, rx_fs) = mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(tx_fs)?;
    watcher.watch(&store.profiles_dir, RecursiveMode::NonRecursive)?;

    let layout = store.profile.layout.clone();
    let mut tracker = Tracker::new(layout.viewport_width, layout.viewport_height);
    tracker.set_norm_ranges(ranges.x_min, ranges.x_max, ranges.y_min, ranges.y_max);
    let mut engine = CardStackEngine::new(store.profile.clone(), opts.slots);
    let mut listener = LogListener;
    let mut grabbed = false;
    let mut failure: Option<std::io::Error> = None;

    while !stop.load(Ordering::Relaxed) {
        let mut contacts: Vec<ContactEvent> = Vec::new();
        match dev.fetch_events() {
            Ok(events) => {
                for ev in events {
                    if ev.event_type() == EventType::ABSOLUTE {
                        match ev.code() {
                            c if c == AbsoluteAxisCode::ABS_MT_SLOT.0 => tracker.on_slot(ev.value()),
                            c if c == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 => {
                                tracker.on_tracking_id(ev.value())
                            }
                            c if c == AbsoluteAxisCode::ABS_MT_POSITION_X.0 => {
                                tracker.on_pos_x(ev.value())
                            }
                            c if c == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 => {
                                tracker.on_pos_y(ev.value())
                            }
                            _ => {}
                        }
                    } else if ev.event_type() == EventType::SYNCHRONIZATION {
                        if ev.code() == SynchronizationCode::SYN_REPORT.0 {
                            contacts.extend(tracker.on_syn_report());
                        } else if ev.code() == SynchronizationCode::SYN_DROPPED.0 {
                            warn!("input events dropped; cancelling open contacts");
                            let now = tracker.now_ms();
                            contacts.extend(tracker.on_dropped(now));
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                failure = Some(e);
                break;
            }
        }

        let idle = contacts.is_empty();
        for c in &contacts {
            engine.handle(c, &mut listener);
        }

        // hold the device while a session suppresses default handling
        let want = engine.wants_suppression();
        if want && !grabbed {
            match dev.grab() {
                Ok(()) => {
                    grabbed = true;
                    debug!("grabbed touch device");
                }
                Err(e) => warn!("grab failed: {e}"),
            }
        } else if !want && grabbed {
            if let Err(e) = dev.ungrab() {
                warn!("ungrab failed: {e}");
            }
            grabbed = false;
            debug!("released touch device");
        }

        while let Ok(res) = rx_fs.try_recv() {
            match res {
                Ok(evt) if evt.paths.iter().any(|p| *p == store.active_path()) => {
                    if store.reload().is_ok() {
                        let l = &store.profile.layout;
                        tracker.set_viewport(l.viewport_width, l.viewport_height);
                        engine.apply_profile(store.profile.clone());
                        info!("profile '{}' reloaded", store.active_name);
                    }
                }
                Ok(_) => {}
                Err(e) => warn!("profile watch error: {e}"),
            }
        }

        // frame boundary
        if let Some(frame) = engine.take_layout() {
            debug!(
                "layout {}",
                serde_json::to_string(&frame).unwrap_or_default()
            );
        }

        if idle {
            thread::sleep(Duration::from_millis(4));
        }
    }

    if grabbed {
        let _ = dev.ungrab();
    }
    finish(failure)
}

/// Exit status of the live loop: a device read failure is an error.
fn finish(failure: Option<std::io::Error>) -> Result<()> {
    if let Some(e) = failure {
        return Err(e).context("device read failed");
    }
    info!("stopped");
    Ok(())
}
