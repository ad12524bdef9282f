//! Project setup command: `stagesync init`.

use anyhow::Result;
use std::path::Path;

pub fn cmd_init(project_dir: &Path) -> Result<()> {
    use stagesync::init::init_project;

    let result = init_project(project_dir)?;

    println!();
    if result.created {
        println!(
            "{} Initialized stagesync in {}",
            console::style("✓").green(),
            result.stagesync_dir.display()
        );
    } else {
        println!(
            "stagesync already initialized at {}",
            result.stagesync_dir.display()
        );
    }
    if result.wrote_config {
        println!("  Wrote default stagesync.toml");
    }
    println!();
    println!("Next: run 'stagesync new' to start a session.");
    println!();
    Ok(())
}
