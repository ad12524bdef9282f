//! Initialization of the `.stagesync/` directory for a project.
//!
//! ```text
//! .stagesync/
//! ├── stagesync.toml   # Configuration (defaults written on init)
//! └── sessions.json    # Session registry (created on first save)
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{CONFIG_FILE, StagesyncToml};

/// The name of the stagesync configuration directory.
pub const STAGESYNC_DIR: &str = ".stagesync";

/// Result of initializing a project.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the .stagesync directory
    pub stagesync_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
    /// Whether a default stagesync.toml was written
    pub wrote_config: bool,
}

/// Initialize stagesync in `project_dir`.
///
/// Existing configuration is never overwritten; re-running only fills in
/// what is missing.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let stagesync_dir = get_stagesync_dir(project_dir);
    let created = !stagesync_dir.exists();

    std::fs::create_dir_all(&stagesync_dir).with_context(|| {
        format!(
            "Failed to create directory: {}",
            stagesync_dir.display()
        )
    })?;

    let config_path = stagesync_dir.join(CONFIG_FILE);
    let wrote_config = if config_path.exists() {
        false
    } else {
        StagesyncToml::default().save(&config_path)?;
        true
    };

    Ok(InitResult {
        stagesync_dir,
        created,
        wrote_config,
    })
}

/// Check if a project is already initialized.
pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(STAGESYNC_DIR).exists()
}

/// Get the path to the .stagesync directory for a project.
pub fn get_stagesync_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(STAGESYNC_DIR)
}
