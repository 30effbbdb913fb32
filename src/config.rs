//! On-disk configuration: the device list plus the per-device knob
//! overrides a client can set at runtime. Distinct from
//! `touchpad::config::TouchpadConfig`, which is the fully-resolved
//! struct a single `Touchpad` is constructed with (geometry included);
//! this is what the on-disk file is parsed *into*, merged with
//! geometry probed from the device node at watch time.

use touchpad_core::touchpad::config::{Dwt, LeftHanded, Quirks};
use touchpad_core::touchpad::types::{ScrollMethod, SendEventsMode};
#[allow(unused)]
use log::{debug, error, info, trace, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const PREFIX: Option<&'static str> = option_env!("PREFIX");

pub(crate) type Device = String;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;
type Result<T> = std::result::Result<T, BoxedError>;

pub(crate) struct Configuration {
    pub devices: BTreeMap<Device, DeviceOverrides>,
}

impl Configuration {
    pub fn new() -> Self {
        Self {
            devices: Default::default(),
        }
    }
}

/// Every field is optional: an absent key keeps
/// `touchpad::config::TouchpadConfig`'s default, only recording
/// entries a user actually configured.
#[derive(Deserialize, Default)]
pub(crate) struct DeviceOverrides {
    pub send_events_mode: Option<SendEventsMode>,
    pub scroll_method: Option<ScrollMethod>,
    pub dwt: Option<Dwt>,
    pub left_handed: Option<LeftHanded>,
    pub thumb_detect: Option<bool>,
    pub monitor_trackpoint: Option<bool>,
    pub palm_pressure_threshold: Option<i32>,
    pub palm_size_threshold: Option<i32>,
    pub thumb_pressure_threshold: Option<i32>,
    pub thumb_size_threshold: Option<i32>,
    pub synaptics_serial_touchpad: Option<bool>,
    pub lenovo_t450_touchpad_fw: Option<bool>,
    pub top_software_buttons: Option<bool>,
}

impl DeviceOverrides {
    /// Folds the on-disk overrides into quirk/geometry values probed
    /// from the live device. Fields left unset in the config keep
    /// whatever `quirks` already carries (the probed/default value).
    pub fn apply_quirks(&self, mut quirks: Quirks) -> Quirks {
        if let Some(v) = self.palm_pressure_threshold {
            quirks.palm_pressure_threshold = v;
        }
        if let Some(v) = self.palm_size_threshold {
            quirks.palm_size_threshold = Some(v);
        }
        if let Some(v) = self.thumb_pressure_threshold {
            quirks.thumb_pressure_threshold = Some(v);
        }
        if let Some(v) = self.thumb_size_threshold {
            quirks.thumb_size_threshold = Some(v);
        }
        if let Some(v) = self.synaptics_serial_touchpad {
            quirks.synaptics_serial_touchpad = v;
        }
        if let Some(v) = self.lenovo_t450_touchpad_fw {
            quirks.lenovo_t450_touchpad_fw = v;
        }
        if let Some(v) = self.top_software_buttons {
            quirks.top_software_buttons = v;
        }
        quirks
    }
}

fn get_prefix() -> PathBuf {
    PathBuf::from(PREFIX.unwrap_or("/usr/local"))
}

pub(crate) fn config_dirs() -> Vec<String> {
    let prefix = get_prefix();

    let mut paths = vec![
        "/etc/touchpad-core.toml".to_owned(),
        "/etc/touchpad-core.d/*.toml".to_owned(),
        format!("{}/etc/touchpad-core.toml", prefix.display()),
        format!("{}/etc/touchpad-core.d/*.toml", prefix.display()),
        "$XDG_HOME/touchpad-core.toml".to_owned(),
        "$XDG_HOME/touchpad-core.d/*.toml".to_owned(),
        "$HOME/.config/touchpad-core.toml".to_owned(),
        "$HOME/.config/touchpad-core.d/*.toml".to_owned(),
    ];

    // Deduplicate in case PREFIX is empty
    paths.dedup();
    paths
}

pub(crate) fn load() -> Configuration {
    let mut config = Configuration::new();

    let prefix = get_prefix();
    let global_config = prefix.join("etc/touchpad-core.toml");

    if global_config.exists() {
        try_load_config_file(&mut config, &global_config);
    }

    let global_config_dir = prefix.join("etc/touchpad-core.d");
    try_load_config_dir(&mut config, &global_config_dir);

    load_user_config(&mut config);

    if config.devices.is_empty() {
        error!("No configuration found!");
        eprintln!("Searched for configuration files in the following locations:");
        for dir in config_dirs() {
            eprintln!("* {dir}");
        }
    }

    config
}

/// Call `load_config_file()` and print errors that include the config file path.
fn try_load_config_file(config: &mut Configuration, path: &Path) {
    if let Err(e) = load_config_file(config, path) {
        error!(
            "Error loading configuration file at {}: {}",
            path.display(),
            e
        );
    }
}

/// Call `load_config_dir()` and print errors that include the dir path.
fn try_load_config_dir(config: &mut Configuration, dir: &Path) {
    if let Err(e) = load_config_dir(config, dir) {
        error!(
            "Error reading from configuration directory {}: {}",
            dir.display(),
            e
        );
    }
}

fn load_user_config(config: &mut Configuration) {
    let config_home = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(xdg_config_home) => PathBuf::from(xdg_config_home),
        None => match get_user_config_dir() {
            Ok(dir) => dir,
            Err(e) => {
                error!("{e}");
                return;
            }
        },
    };

    let user_config_file = config_home.join("touchpad-core.toml");
    if user_config_file.exists() {
        try_load_config_file(config, &user_config_file);
    }

    let user_config_dir = config_home.join("touchpad-core.d");
    try_load_config_dir(config, &user_config_dir);
}

fn get_user_config_dir() -> Result<PathBuf> {
    #[allow(deprecated)]
    let home = std::env::home_dir();

    if home.is_none() || home.as_ref().unwrap() == &PathBuf::new() {
        return Err("Could not determine user home directory!".into());
    }

    let config_home = home.unwrap().join(".config/");
    Ok(config_home)
}

/// This function is only to be called through [`try_load_config_dir()`] which will log both the
/// error and the directory we were enumerating when it was encountered.
fn load_config_dir(config: &mut Configuration, dir: &Path) -> Result<()> {
    use std::fs::DirEntry;

    if !dir.exists() || !dir.is_dir() {
        return Ok(());
    }

    let toml = OsStr::new("toml");
    for item in dir.read_dir()? {
        let item = match item {
            Ok(item) => item,
            Err(e) => {
                error!(
                    "Error reading file from configuration directory {}: {e}",
                    dir.display()
                );
                continue;
            }
        };

        // in lieu of try_block...
        let mut process_item = |item: &DirEntry| -> Result<()> {
            if item.file_type()?.is_dir() {
                return Ok(());
            }

            let item = item.path();
            if item.extension() != Some(toml) {
                return Ok(());
            }

            try_load_config_file(config, &item);
            Ok(())
        };

        if let Err(e) = process_item(&item) {
            error!("Error loading {}: {e}", item.path().display());
        }
    }

    Ok(())
}

/// This function is only to be called through [`try_load_config_file()`] which will log both the
/// error and the config file we were loading when it was encountered.
fn load_config_file(config: &mut Configuration, path: &Path) -> Result<()> {
    #[derive(Deserialize)]
    struct ConfigDevice {
        pub path: Device,
        #[serde(flatten)]
        pub overrides: DeviceOverrides,
    }

    #[derive(Deserialize)]
    struct ConfigFile {
        #[serde(alias = "device")]
        pub devices: Vec<ConfigDevice>,
    }

    let bytes = std::fs::read(path)?;
    let toml_str =
        std::str::from_utf8(&bytes).map_err(|_| "Invalid bytes in configuration file")?;
    let config_file: ConfigFile = toml::from_str(toml_str)?;

    for device_config in config_file.devices {
        config.devices.insert(device_config.path, device_config.overrides);
    }

    Ok(())
}
