//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                              |
//! |------------|-----------------------------------------------|
//! | `project`  | `Init`                                        |
//! | `session`  | `New`, `Status`, `List`, `Resume`, `Abandon`  |
//! | `pipeline` | `Advance`, `Set`, `Complete`                  |
//! | `config`   | `Config`                                      |
//!
//! `session` commands edit the registry file directly. `pipeline` commands
//! run through a [`SyncDriver`](stagesync::reconcile::SyncDriver), the same
//! path a stage view takes.

pub mod config;
pub mod pipeline;
pub mod project;
pub mod session;

pub use config::cmd_config;
pub use pipeline::{cmd_advance, cmd_complete, cmd_set};
pub use project::cmd_init;
pub use session::{cmd_abandon, cmd_list, cmd_new, cmd_resume, cmd_status};

use anyhow::{Result, bail};
use stagesync::config::StagesyncConfig;
use stagesync::init::is_initialized;
use stagesync::store::JsonFileSessionStore;

/// Open the session registry, failing if the project was never initialized.
fn open_store(config: &StagesyncConfig) -> Result<JsonFileSessionStore> {
    if !is_initialized(&config.project_dir) {
        bail!("Project is not initialized. Run 'stagesync init' first.");
    }
    Ok(JsonFileSessionStore::open(config.sessions_file())?)
}
