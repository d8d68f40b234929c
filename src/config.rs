use directories::UserDirs;
use log::{info, warn};
use serde::Deserialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no home directory for the current user")]
    NoHome,
    #[error("profile not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid profile: {0}")]
    Invalid(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    pub name: Option<String>,
}

/// Gesture discrimination thresholds. Pixel values are in viewport pixels,
/// durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Motion beyond this in either axis is no longer a clean tap.
    pub noise_px: f32,
    /// Motion beyond this in either axis starts drag feedback.
    pub drag_commit_px: f32,
    pub drag_damping: f32,
    pub drag_clamp_px: f32,
    pub drag_scale: f32,
    pub drag_brightness: f32,
    pub flick_window_collapsed_ms: u64,
    pub flick_window_expanded_ms: u64,
    pub flick_distance_collapsed_px: f32,
    pub flick_distance_expanded_px: f32,
    /// Vertical travel a non-flick release needs to count as a drag.
    pub drag_release_px: f32,
    pub tap_ms: u64,
    pub swipe_min_px: f32,
    /// Horizontal travel must exceed vertical travel by this factor.
    pub swipe_dominance: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            noise_px: 8.0,
            drag_commit_px: 10.0,
            drag_damping: 0.4,
            drag_clamp_px: 100.0,
            drag_scale: 1.02,
            drag_brightness: 1.1,
            flick_window_collapsed_ms: 600,
            flick_window_expanded_ms: 800,
            flick_distance_collapsed_px: 40.0,
            flick_distance_expanded_px: 30.0,
            drag_release_px: 15.0,
            tap_ms: 300,
            swipe_min_px: 40.0,
            swipe_dominance: 1.5,
        }
    }
}

impl Thresholds {
    pub fn flick_window_ms(&self, expanded: bool) -> u64 {
        if expanded {
            self.flick_window_expanded_ms
        } else {
            self.flick_window_collapsed_ms
        }
    }

    pub fn flick_distance_px(&self, expanded: bool) -> f32 {
        if expanded {
            self.flick_distance_expanded_px
        } else {
            self.flick_distance_collapsed_px
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StackSettings {
    pub debounce_ms: u64,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub slot_height: f32,
    /// Room opened under the active tab for its content.
    pub expanded_height: f32,
    pub control_size: f32,
    pub control_padding: f32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            viewport_width: 390.0,
            viewport_height: 844.0,
            slot_height: 56.0,
            expanded_height: 320.0,
            control_size: 32.0,
            control_padding: 8.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub stack: StackSettings,
    #[serde(default)]
    pub layout: LayoutSettings,
}

impl Profile {
    pub fn from_toml(txt: &str, path: &Path) -> Result<Self> {
        let profile: Profile = toml::from_str(txt).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        validate_profile(&profile)?;
        Ok(profile)
    }
}

#[derive(Debug, Clone)]
pub struct ProfileStore {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or(ConfigError::NoHome)?;
    Ok(dirs.home_dir().join(".config").join("stackctl"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ProfileStore {
    pub fn load_or_install_default() -> Result<Self> {
        Self::open(config_dir()?)
    }

    /// Opens a store rooted at `cfgdir`, installing the default profile and
    /// active pointer when missing.
    pub fn open(cfgdir: PathBuf) -> Result<Self> {
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = load_profile(&profdir, &active_name)?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn active_path(&self) -> PathBuf {
        self.profiles_dir.join(format!("{}.toml", self.active_name))
    }

    /// Reloads the active profile; the last good profile stays in place on error.
    pub fn reload(&mut self) -> Result<()> {
        match load_profile(&self.profiles_dir, &self.active_name) {
            Ok(p) => {
                self.profile = p;
                Ok(())
            }
            Err(e) => {
                warn!("keeping previous profile: {e}");
                Err(e)
            }
        }
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(ConfigError::NotFound(p));
        }
        self.profile = load_profile(&self.profiles_dir, name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn doctor_report(&self) -> serde_json::Value {
        let devices: Vec<String> = crate::input::discover_multitouch()
            .into_iter()
            .map(|d| format!("{} ({})", d.name, d.path))
            .collect();
        serde_json::json!({
            "input_group_member": check_in_input_group(),
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "devices": devices,
            "hints": {
                "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input"
            }
        })
    }
}

fn load_profile(dir: &Path, name: &str) -> Result<Profile> {
    let path = dir.join(format!("{name}.toml"));
    let txt = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    Profile::from_toml(&txt, &path)
}

fn validate_profile(p: &Profile) -> Result<()> {
    let th = &p.thresholds;
    if th.tap_ms == 0 || th.flick_window_collapsed_ms == 0 || th.flick_window_expanded_ms == 0 {
        return Err(ConfigError::Invalid(
            "thresholds must be positive durations".into(),
        ));
    }
    let distances = [
        ("noise_px", th.noise_px),
        ("drag_commit_px", th.drag_commit_px),
        ("flick_distance_collapsed_px", th.flick_distance_collapsed_px),
        ("flick_distance_expanded_px", th.flick_distance_expanded_px),
        ("drag_release_px", th.drag_release_px),
        ("swipe_min_px", th.swipe_min_px),
    ];
    for (name, v) in distances {
        if !(v > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "thresholds.{name} must be positive, got {v}"
            )));
        }
    }
    if !(th.drag_damping > 0.0 && th.drag_damping <= 1.0) {
        return Err(ConfigError::Invalid(
            "thresholds.drag_damping must be in (0,1]".into(),
        ));
    }
    if th.drag_clamp_px < 0.0 {
        return Err(ConfigError::Invalid(
            "thresholds.drag_clamp_px must not be negative".into(),
        ));
    }
    if th.swipe_dominance < 1.0 {
        return Err(ConfigError::Invalid(
            "thresholds.swipe_dominance must be at least 1.0".into(),
        ));
    }
    let l = &p.layout;
    if !(l.slot_height > 0.0) || l.expanded_height < 0.0 {
        return Err(ConfigError::Invalid(
            "layout.slot_height must be positive and expanded_height non-negative".into(),
        ));
    }
    Ok(())
}

fn check_in_input_group() -> bool {
    let Ok(s) = fs::read_to_string("/etc/group") else {
        return false;
    };
    let user = whoami::username();
    s.lines()
        .filter(|line| line.starts_with("input:"))
        .any(|line| {
            line.split(':')
                .nth(3)
                .unwrap_or("")
                .split(',')
                .any(|u| u == user)
        })
}
