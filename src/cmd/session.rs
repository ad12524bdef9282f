//! Session registry commands: new, status, list, resume, abandon.

use anyhow::Result;
use stagesync::config::StagesyncConfig;
use stagesync::store::SessionStore;
use stagesync::{ContentType, Session, SessionId, Stage};

use super::open_store;

pub fn cmd_new(config: &StagesyncConfig, content_type: Option<ContentType>) -> Result<()> {
    let mut store = open_store(config)?;
    let id = store.create_session(content_type);
    store.save()?;

    println!();
    println!("{} Started session {}", console::style("✓").green(), id);
    println!("  Stage: {}", Stage::default());
    println!();
    Ok(())
}

pub fn cmd_status(config: &StagesyncConfig) -> Result<()> {
    let store = open_store(config)?;

    println!();
    let Some(session) = store.active() else {
        println!("No active session. Run 'stagesync new' or 'stagesync resume <id>'.");
        println!();
        return Ok(());
    };

    print_session(session);
    println!();
    Ok(())
}

pub fn cmd_list(config: &StagesyncConfig) -> Result<()> {
    let store = open_store(config)?;
    let sessions = store.sessions();

    println!();
    if sessions.is_empty() {
        println!("No sessions found. Run 'stagesync new' to start one.");
        println!();
        return Ok(());
    }

    let active = store.active_id();
    println!(
        "  {:<36} {:<8} {:<16} {:<24} Title",
        "Session", "Stage", "Updated", "Type"
    );
    println!(
        "  {:<36} {:<8} {:<16} {:<24} -----",
        "-".repeat(36),
        "-----",
        "-------",
        "----"
    );
    for session in sessions {
        let marker = if Some(session.id) == active { "*" } else { " " };
        println!(
            "{} {:<36} {:<8} {:<16} {:<24} {}",
            console::style(marker).green(),
            session.id,
            session.current_stage.as_str(),
            session.updated_at.format("%Y-%m-%d %H:%M"),
            content_type_label(session),
            title_label(session)
        );
    }
    println!();
    Ok(())
}

pub fn cmd_resume(config: &StagesyncConfig, id: SessionId) -> Result<()> {
    let mut store = open_store(config)?;
    store.resume(id)?;
    store.save()?;

    println!();
    println!("{} Resumed session {}", console::style("✓").green(), id);
    if let Some(session) = store.active() {
        println!("  Stage: {}", session.current_stage);
    }
    println!();
    Ok(())
}

pub fn cmd_abandon(config: &StagesyncConfig) -> Result<()> {
    let mut store = open_store(config)?;

    println!();
    match store.active_id() {
        Some(id) => {
            store.clear_active();
            store.save()?;
            println!("Abandoned session {}", id);
            println!("  It is still listed and can be resumed.");
        }
        None => println!("No active session."),
    }
    println!();
    Ok(())
}

fn print_session(session: &Session) {
    println!("Session:   {}", console::style(session.id).bold());
    println!("Title:     {}", title_label(session));
    println!("Type:      {}", content_type_label(session));
    println!("Stage:     {}", console::style(session.current_stage).cyan());

    let completed: Vec<&str> = session
        .completed_stages
        .iter()
        .map(|stage| stage.as_str())
        .collect();
    if completed.is_empty() {
        println!("Completed: -");
    } else {
        println!("Completed: {}", completed.join(", "));
    }
    println!("Created:   {}", session.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Updated:   {}", session.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if !session.stage_data.is_empty() {
        println!();
        println!("Stage data:");
        for (stage, block) in &session.stage_data {
            let fields = match block.as_object() {
                Some(fields) => fields.keys().cloned().collect::<Vec<_>>().join(", "),
                None => console::style("(malformed)").red().to_string(),
            };
            println!("  {:<8} {}", stage.as_str(), fields);
        }
    }
}

fn title_label(session: &Session) -> String {
    if session.metadata.title.is_empty() {
        console::style("(untitled)").dim().to_string()
    } else {
        session.metadata.title.clone()
    }
}

fn content_type_label(session: &Session) -> String {
    session
        .metadata
        .content_type
        .map(|ct| ct.to_string())
        .unwrap_or_else(|| "-".to_string())
}
