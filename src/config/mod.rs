//! Settings loading for rest-flow projects.
//!
//! Settings are read from `rest-flow.yaml` at the project root, merged over
//! the defaults and validated. The resulting [`Settings`] value is handed to
//! whoever needs it; there is no process-wide configuration state.

pub mod schema;

pub use schema::Settings;

use crate::error::{Error, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the settings file at the project root.
pub const SETTINGS_FILE_NAME: &str = "rest-flow.yaml";

/// Returns the settings file path for a project root.
pub fn settings_path(project_root: &Path) -> PathBuf {
    project_root.join(SETTINGS_FILE_NAME)
}

/// Loads settings for a project.
///
/// A missing settings file yields the defaults. A file that fails to parse
/// or validate is reported as [`Error::MalformedConfig`].
///
/// # Example
///
/// ```no_run
/// use rest_flow::config::load_settings;
/// use std::path::Path;
///
/// let settings = load_settings(Path::new("/path/to/project")).unwrap();
/// println!("Timeout: {}ms", settings.timeout);
/// ```
pub fn load_settings(project_root: &Path) -> Result<Settings> {
    let path = settings_path(project_root);
    if !path.is_file() {
        debug!("no settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&path)?;
    parse_settings(&content).map_err(|message| Error::malformed(&path, message))
}

/// Parses settings text, merging it over the defaults.
pub fn parse_settings(content: &str) -> std::result::Result<Settings, String> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    let user: Settings = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let settings = Settings::default().merge(&user);
    settings
        .validate()
        .map_err(|e| format!("Invalid settings: {}", e))?;
    Ok(settings)
}
