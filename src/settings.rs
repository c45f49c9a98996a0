use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
pub const APP_NAME: &str = "formrenamer";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Zoom applied to freshly loaded documents
    #[serde(default = "default_scale")]
    pub default_scale: f32,

    /// Upload ceiling in MiB
    #[serde(default = "default_max_upload_mib")]
    pub max_upload_mib: u64,

    #[serde(default = "default_render_workers")]
    pub render_workers: usize,

    #[serde(default = "default_page_cache_size")]
    pub page_cache_size: usize,

    /// Where saved documents, guides and snapshots go; current directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub show_overlay: bool,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_scale() -> f32 {
    1.0
}

fn default_max_upload_mib() -> u64 {
    50
}

fn default_render_workers() -> usize {
    crate::pdf::DEFAULT_WORKERS
}

fn default_page_cache_size() -> usize {
    crate::pdf::DEFAULT_CACHE_SIZE
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            default_scale: default_scale(),
            max_upload_mib: default_max_upload_mib(),
            render_workers: default_render_workers(),
            page_cache_size: default_page_cache_size(),
            output_dir: None,
            show_overlay: true,
        }
    }
}

impl Settings {
    /// Upload ceiling in bytes
    #[must_use]
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mib.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

pub fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    match serde_yaml::to_string(settings) {
        Ok(content) => match fs::write(path, content) {
            Ok(()) => debug!("Saved settings to {path:?}"),
            Err(e) => error!("Failed to save settings to {path:?}: {e}"),
        },
        Err(e) => error!("Failed to serialize settings: {e}"),
    }
}

// Public API for accessing/modifying settings

/// Snapshot of the current settings
pub fn current() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

/// Replace settings wholesale (CLI overrides, tests)
pub fn replace(settings: Settings) {
    if let Ok(mut global) = SETTINGS.write() {
        *global = settings;
    }
}

pub fn get_default_scale() -> f32 {
    SETTINGS
        .read()
        .map(|s| s.default_scale)
        .unwrap_or_else(|_| default_scale())
}

pub fn set_default_scale(scale: f32) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.default_scale = scale;
    }
}

pub fn get_max_upload_bytes() -> usize {
    SETTINGS
        .read()
        .map(|s| s.max_upload_bytes())
        .unwrap_or_else(|_| Settings::default().max_upload_bytes())
}

pub fn get_render_workers() -> usize {
    SETTINGS
        .read()
        .map(|s| s.render_workers)
        .unwrap_or_else(|_| default_render_workers())
}

pub fn set_render_workers(workers: usize) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.render_workers = workers.max(1);
    }
}

pub fn get_page_cache_size() -> usize {
    SETTINGS
        .read()
        .map(|s| s.page_cache_size)
        .unwrap_or_else(|_| default_page_cache_size())
}

pub fn get_output_dir() -> PathBuf {
    SETTINGS
        .read()
        .ok()
        .and_then(|s| s.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn set_output_dir(dir: PathBuf) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.output_dir = Some(dir);
    }
}

pub fn is_overlay_shown() -> bool {
    SETTINGS.read().map(|s| s.show_overlay).unwrap_or(true)
}
