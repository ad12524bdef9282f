//! Pipeline commands: advance, set, complete.
//!
//! Each command attaches a view through a [`SyncDriver`], performs its action
//! and detaches, so it goes through the same hydrate/flush path as an
//! interactive stage view.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use stagesync::config::StagesyncConfig;
use stagesync::reconcile::{
    FlushOutcome, LifecycleController, ReconciliationEngine, SyncDriver,
};
use stagesync::store::JsonFileSessionStore;
use stagesync::workflow::InMemoryWorkflowStore;
use stagesync::{FieldUpdate, Session, Stage};

use super::open_store;

type Driver = SyncDriver<JsonFileSessionStore, InMemoryWorkflowStore>;

fn spawn_driver(config: &StagesyncConfig) -> Result<Driver> {
    let store = open_store(config)?;
    let engine = ReconciliationEngine::with_options(
        store,
        InMemoryWorkflowStore::new(),
        config.reconcile_options(),
    );
    Ok(SyncDriver::spawn(
        LifecycleController::new(engine),
        config.sync_interval(),
    ))
}

fn no_active_session() -> anyhow::Error {
    anyhow::anyhow!("No active session. Run 'stagesync new' or 'stagesync resume <id>' first.")
}

pub async fn cmd_advance(config: &StagesyncConfig, stage: Stage) -> Result<()> {
    let driver = spawn_driver(config)?;
    let handle = driver.handle();

    let view = handle.attach(stage).await?;
    let Some(before) = view.active_session.clone() else {
        driver.shutdown().await?;
        return Err(no_active_session());
    };
    // Any deferred advance has run once the attach reply is out
    let after = handle.active_session().await?.ok_or_else(no_active_session)?;
    view.detach().await?;
    driver.shutdown().await?;

    println!();
    if after.current_stage != before.current_stage {
        println!(
            "{} Advanced session {} from {} to {}",
            console::style("✓").green(),
            after.id,
            before.current_stage,
            console::style(after.current_stage).cyan()
        );
        println!("  Marked {} completed", before.current_stage);
    } else if before.current_stage == stage {
        println!("Session {} is already at {}", after.id, stage);
    } else {
        println!(
            "Session {} is at {}; not moving back to {}",
            after.id, after.current_stage, stage
        );
    }
    println!();
    Ok(())
}

pub async fn cmd_set(config: &StagesyncConfig, field: &str, value: &str) -> Result<()> {
    let update = parse_field_update(field, value)?;

    let driver = spawn_driver(config)?;
    let handle = driver.handle();

    let Some(session) = handle.active_session().await? else {
        driver.shutdown().await?;
        return Err(no_active_session());
    };

    let view = handle.attach(session.current_stage).await?;
    handle.edit(update).await?;
    let outcome = view.manual_sync().await?;
    view.detach().await?;
    driver.shutdown().await?;

    println!();
    print_outcome(&outcome);
    println!();
    Ok(())
}

pub async fn cmd_complete(config: &StagesyncConfig) -> Result<()> {
    let driver = spawn_driver(config)?;
    let handle = driver.handle();

    let Some(session) = handle.active_session().await? else {
        driver.shutdown().await?;
        return Err(no_active_session());
    };
    let view = handle.attach(session.current_stage).await?;
    let completed = handle.complete_pipeline().await?;
    drop(view);

    driver.shutdown().await?;

    println!();
    match completed {
        Some(id) => {
            println!("{} Completed session {}", console::style("✓").green(), id);
            print_completed(&session);
        }
        None => println!("Session {} could not be completed; see log output.", session.id),
    }
    println!();
    Ok(())
}

/// Parse `<stage>.<field>` and a JSON (or bare string) value into an update.
pub fn parse_field_update(field: &str, value: &str) -> Result<FieldUpdate> {
    let (stage, key) = field
        .split_once('.')
        .with_context(|| format!("Expected <stage>.<field>, got '{}'", field))?;
    let stage: Stage = stage.parse()?;
    let value: Value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    match FieldUpdate::decode(stage, key, &value) {
        Ok(Some(update)) => Ok(update),
        Ok(None) => bail!("Unknown field '{}' for stage {}", key, stage),
        Err(err) => bail!("Invalid value for {}.{}: {}", stage, key, err),
    }
}

fn print_outcome(outcome: &FlushOutcome) {
    match outcome {
        FlushOutcome::Applied(report) if report.changed() => {
            println!("{} Synced session {}", console::style("✓").green(), report.session_id);
            if let Some(stage) = report.advanced_to {
                println!("  Advanced to {}", stage);
            }
            if report.metadata_updated {
                println!("  Updated metadata");
            }
            for stage in &report.stages_written {
                println!("  Wrote {} data", stage);
            }
        }
        FlushOutcome::Applied(report) => {
            println!("Session {} already up to date", report.session_id);
        }
        FlushOutcome::Skipped(reason) => {
            println!("{} Sync skipped: {}", console::style("!").yellow(), reason);
        }
    }
}

fn print_completed(session: &Session) {
    if !session.metadata.title.is_empty() {
        println!("  Title: {}", session.metadata.title);
    }
    println!("  Final stage: {}", session.current_stage);
}
