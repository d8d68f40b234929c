//! Touchscreen discovery (evdev 0.13 compatible)

use evdev::{AbsoluteAxisCode, Device, EventType};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
}

/// Raw coordinate ranges of a touchscreen's position axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRanges {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

fn is_multitouch(dev: &Device) -> bool {
    let has_abs = dev.supported_events().contains(EventType::ABSOLUTE);
    let has_mt = dev.supported_absolute_axes().is_some_and(|a| {
        a.contains(AbsoluteAxisCode::ABS_MT_SLOT)
            && a.contains(AbsoluteAxisCode::ABS_MT_TRACKING_ID)
            && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_X)
            && a.contains(AbsoluteAxisCode::ABS_MT_POSITION_Y)
    });
    has_abs && has_mt
}

pub fn discover_multitouch() -> Vec<DeviceInfo> {
    let mut out = vec![];
    let Ok(rd) = std::fs::read_dir("/dev/input") else {
        return out;
    };
    for e in rd.flatten() {
        let p = e.path();
        let is_event_node = p
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.starts_with("event"));
        if !is_event_node {
            continue;
        }
        if let Ok(dev) = Device::open(&p) {
            if is_multitouch(&dev) {
                out.push(DeviceInfo {
                    path: p.display().to_string(),
                    name: dev.name().unwrap_or("unknown").to_string(),
                });
            }
        }
    }
    out.sort_by(|a, b| a.path.cmp(&b.path));
    out
}

/// Opens a multitouch device and reads its position ranges.
pub fn open_touchscreen(path: &Path) -> std::io::Result<(Device, AxisRanges)> {
    let dev = Device::open(path)?;
    if !is_multitouch(&dev) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a multitouch device", path.display()),
        ));
    }
    let mut ranges = AxisRanges {
        x_min: 0,
        x_max: 4096,
        y_min: 0,
        y_max: 4096,
    };
    for (code, info) in dev.get_absinfo()? {
        if code == AbsoluteAxisCode::ABS_MT_POSITION_X {
            ranges.x_min = info.minimum();
            ranges.x_max = info.maximum();
        } else if code == AbsoluteAxisCode::ABS_MT_POSITION_Y {
            ranges.y_min = info.minimum();
            ranges.y_max = info.maximum();
        }
    }
    Ok((dev, ranges))
}
