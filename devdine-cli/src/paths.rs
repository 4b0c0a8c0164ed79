//! Operating-system-specific file locations

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// The directories devdine keeps its files in
pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "devdine")
        .ok_or_else(|| anyhow!("Couldn't find operating-system-specific configuration paths"))
}

/// The optional settings file
pub fn config_file() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Where the session is stored unless configured otherwise
pub fn default_session_file() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("session.json"))
}
